//! Render one template file for one instance and parse the result.

use std::error::Error as StdError;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::context::RenderContext;
use super::functions::{Environment, PartialError, PartialSource};
use super::partials::base_tera;
use crate::document::Entry;
use crate::error::{GenerateError, GenerateResult};
use crate::metadata::TemplateMeta;

/// A rendered template file after YAML parsing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderedInstance {
    #[serde(default)]
    pub meta: TemplateMeta,
    #[serde(default)]
    pub data: Option<Mapping>,
}

impl RenderedInstance {
    /// Convert into an [`Entry`].
    ///
    /// Singleton templates are named by `meta.name`; instanced templates by
    /// the rendered `meta.name_template`.
    pub fn into_entry(self, singleton: bool) -> Entry {
        let name = if singleton {
            self.meta.name
        } else {
            self.meta.name_template
        };
        Entry::new(Value::String(name), self.data.unwrap_or_default())
    }
}

/// Renders the instances of one template file.
#[derive(Debug)]
pub struct InstanceRenderer<'a> {
    path: &'a Path,
    source: &'a str,
    meta: &'a TemplateMeta,
    pipeline: &'a str,
    partials: &'a Arc<dyn PartialSource>,
}

impl<'a> InstanceRenderer<'a> {
    /// `source` is the whole file, header included; `meta` is its parsed header.
    pub fn new(
        path: &'a Path,
        source: &'a str,
        meta: &'a TemplateMeta,
        pipeline: &'a str,
        partials: &'a Arc<dyn PartialSource>,
    ) -> Self {
        Self {
            path,
            source,
            meta,
            pipeline,
            partials,
        }
    }

    /// Render and parse the file for `instance`.
    pub fn render(&self, instance: &str) -> GenerateResult<RenderedInstance> {
        let output = self.render_text(instance)?;
        serde_yaml::from_str(&output).map_err(|e| {
            tracing::error!(
                path = %self.path.display(),
                instance,
                output = %output,
                "Rendered instance is not valid YAML"
            );
            GenerateError::ResultParse {
                path: self.path.to_path_buf(),
                instance: instance.to_string(),
                source: e,
            }
        })
    }

    /// Render and convert to an entry named according to the template mode.
    pub fn render_entry(&self, instance: &str) -> GenerateResult<Entry> {
        Ok(self.render(instance)?.into_entry(self.meta.is_singleton()))
    }

    /// Expand the template for `instance` without parsing the output.
    pub fn render_text(&self, instance: &str) -> GenerateResult<String> {
        let params = self.meta.params_for(instance);
        tracing::debug!(instance, ?params, "Params");

        let context = RenderContext::new(instance, params, self.pipeline);
        let env = Environment::new(context, Arc::clone(self.partials));

        let template_name = self.path.to_string_lossy();
        let mut tera = base_tera();
        tera.add_raw_template(&template_name, self.source)
            .map_err(|e| {
                tracing::error!(path = %self.path.display(), "{}", self.source);
                GenerateError::TemplateCompile {
                    path: self.path.to_path_buf(),
                    source: e,
                }
            })?;
        env.install(&mut tera);

        tera.render(&template_name, &env.tera_context())
            .map_err(|e| self.classify(instance, e))
    }

    fn classify(&self, instance: &str, err: tera::Error) -> GenerateError {
        let path = self.path.to_path_buf();
        let instance = instance.to_string();
        if caused_by_partial(&err) {
            GenerateError::PartialResolution {
                path,
                instance,
                source: err,
            }
        } else {
            GenerateError::TemplateExecution {
                path,
                instance,
                source: err,
            }
        }
    }
}

fn caused_by_partial(err: &tera::Error) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<PartialError>() {
            return true;
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::find_header;
    use crate::template_engine::PartialRegistry;
    use crate::metadata::TemplateHeader;
    use std::fs;

    const BUILD_TEMPLATE: &str = r#"meta:
  name_template: "build-{{ Instance }}"
  instances: [a, b]
  params:
    a:
      - name: param
        value: a
    b:
      - name: param
        value: b
data:
  plan:
    - task: compile
      param: {{ getParam(name="param", default="<nil>") }}
"#;

    fn meta_of(source: &str) -> TemplateMeta {
        let path = Path::new("jobs/build.yml");
        TemplateHeader::parse(find_header(source, path).unwrap(), path)
            .unwrap()
            .meta
    }

    #[test]
    fn test_render_instances() {
        let meta = meta_of(BUILD_TEMPLATE);
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::empty());
        let renderer = InstanceRenderer::new(
            Path::new("jobs/build.yml"),
            BUILD_TEMPLATE,
            &meta,
            "",
            &partials,
        );

        let entries: Vec<Entry> = meta
            .all_instances()
            .iter()
            .map(|i| renderer.render_entry(i).unwrap())
            .collect();

        assert_eq!(entries[0].name(), Some("build-a"));
        assert_eq!(entries[1].name(), Some("build-b"));
        let param = |e: &Entry| e.get("plan").unwrap()[0]["param"].as_str().unwrap().to_string();
        assert_eq!(param(&entries[0]), "a");
        assert_eq!(param(&entries[1]), "b");
    }

    #[test]
    fn test_singleton_uses_literal_name() {
        let source = "meta:\n  name: build\ndata:\n  serial: true\n";
        let meta = meta_of(source);
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::empty());
        let renderer =
            InstanceRenderer::new(Path::new("jobs/build.yml"), source, &meta, "", &partials);

        let entry = renderer.render_entry("build").unwrap();
        assert_eq!(entry.name(), Some("build"));
        assert_eq!(entry.get("serial"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_pipeline_visible() {
        let source = "meta:\n  name: build\n  pipelines: [release]\ndata:\n  target: {{ Pipeline }}\n";
        let meta = meta_of(source);
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::empty());
        let renderer = InstanceRenderer::new(
            Path::new("jobs/build.yml"),
            source,
            &meta,
            "release",
            &partials,
        );
        let entry = renderer.render_entry("build").unwrap();
        assert_eq!(entry.get("target").and_then(Value::as_str), Some("release"));
    }

    #[test]
    fn test_empty_data_gives_name_only() {
        let source = "meta:\n  name: lonely\ndata:\n";
        let meta = meta_of(source);
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::empty());
        let renderer =
            InstanceRenderer::new(Path::new("groups/g.yml"), source, &meta, "", &partials);
        let entry = renderer.render_entry("lonely").unwrap();
        assert_eq!(entry.keys().count(), 1);
        assert_eq!(entry.to_string(), "lonely");
    }

    #[test]
    fn test_partial_splice_with_indentation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("get.yml"),
            "get: {{ Args.resource }}\ntrigger: true",
        )
        .unwrap();
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::load(dir.path()).unwrap());

        let source = r#"meta:
  name: deploy
data:
  plan:
    - {{ partial(name="get.yml", columns=6, resource="repo") }}
"#;
        let meta = meta_of(source);
        let renderer =
            InstanceRenderer::new(Path::new("jobs/deploy.yml"), source, &meta, "", &partials);
        let entry = renderer.render_entry("deploy").unwrap();
        let step = &entry.get("plan").unwrap()[0];
        assert_eq!(step["get"].as_str(), Some("repo"));
        assert_eq!(step["trigger"].as_bool(), Some(true));
    }

    #[test]
    fn test_compile_error() {
        let source = "meta:\n  name: x\ndata:\n  a: {{ broken\n";
        let meta = meta_of(source);
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::empty());
        let renderer = InstanceRenderer::new(Path::new("jobs/x.yml"), source, &meta, "", &partials);
        let err = renderer.render("x").unwrap_err();
        assert!(matches!(err, GenerateError::TemplateCompile { .. }));
    }

    #[test]
    fn test_execution_error() {
        let source = "meta:\n  name: x\ndata:\n  a: {{ undefined_variable }}\n";
        let meta = meta_of(source);
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::empty());
        let renderer = InstanceRenderer::new(Path::new("jobs/x.yml"), source, &meta, "", &partials);
        let err = renderer.render("x").unwrap_err();
        assert!(matches!(err, GenerateError::TemplateExecution { .. }));
    }

    #[test]
    fn test_include_cannot_reach_partials() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), "{% include \"a.yml\" %}").unwrap();
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::load(dir.path()).unwrap());

        let source = "meta:\n  name: x\ndata:\n  v: {% include \"a.yml\" %}\n";
        let meta = meta_of(source);
        let renderer = InstanceRenderer::new(Path::new("jobs/x.yml"), source, &meta, "", &partials);
        let err = renderer.render("x").unwrap_err();
        assert!(matches!(err, GenerateError::TemplateExecution { .. }), "{err}");
    }

    #[test]
    fn test_missing_partial_is_partial_resolution_error() {
        let source = "meta:\n  name: x\ndata:\n  a: {{ partial(name=\"nope.yml\") }}\n";
        let meta = meta_of(source);
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::empty());
        let renderer = InstanceRenderer::new(Path::new("jobs/x.yml"), source, &meta, "", &partials);
        let err = renderer.render("x").unwrap_err();
        assert!(matches!(err, GenerateError::PartialResolution { .. }));
        assert!(err.to_string().contains("partial `nope.yml` not found"));
    }

    #[test]
    fn test_result_parse_error() {
        let source = "meta:\n  name: x\ndata:\n  a: [unclosed\n";
        let meta = meta_of(source);
        let partials: Arc<dyn PartialSource> = Arc::new(PartialRegistry::empty());
        let renderer = InstanceRenderer::new(Path::new("jobs/x.yml"), source, &meta, "", &partials);
        let err = renderer.render("x").unwrap_err();
        assert!(matches!(err, GenerateError::ResultParse { .. }));
    }
}
