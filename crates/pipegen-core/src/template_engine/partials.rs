//! Load partial templates from the `partials` folder.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use tera::Tera;

use super::functions::{Environment, PartialError, PartialSource};
use crate::error::{GenerateError, GenerateResult};

/// Partial templates addressable by file name.
///
/// Built once per run and shared read-only between every category loader and
/// every render. Each partial is compiled into its own Tera instance, so
/// partials only reach each other through `partial(...)`.
#[derive(Debug, Clone, Default)]
pub struct PartialRegistry {
    templates: BTreeMap<String, Tera>,
}

impl PartialRegistry {
    /// A registry without partials. Any `partial(...)` call fails with "not found".
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile every file directly inside `dir`, registered by its file name.
    ///
    /// Subdirectories are not scanned. A missing directory gives an empty registry.
    pub fn load(dir: &Path) -> GenerateResult<Self> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(?dir, "No partials directory, using an empty registry");
                return Ok(Self::empty());
            }
            Err(e) => {
                return Err(GenerateError::Filesystem {
                    path: dir.to_path_buf(),
                    source: e,
                })
            }
        };

        let mut templates = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| GenerateError::Filesystem {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|e| GenerateError::Filesystem {
                path: path.clone(),
                source: e,
            })?;

            let name = entry.file_name().to_string_lossy().into_owned();
            let mut tera = base_tera();
            tera.add_raw_template(&name, &content)
                .map_err(|e| GenerateError::PartialRegistry {
                    dir: dir.to_path_buf(),
                    source: e,
                })?;
            templates.insert(name, tera);
        }

        let registry = Self { templates };
        tracing::debug!(?dir, partials = ?registry.names(), "Loaded partial templates");
        Ok(registry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Registered partial names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl PartialSource for PartialRegistry {
    fn render_partial(&self, name: &str, env: &Environment) -> Result<String, PartialError> {
        let Some(template) = self.templates.get(name) else {
            return Err(PartialError::NotFound {
                name: name.to_string(),
            });
        };

        let mut tera = template.clone();
        env.install(&mut tera);
        tera.render(name, &env.tera_context())
            .map_err(|e| PartialError::Render {
                name: name.to_string(),
                source: e,
            })
    }
}

/// A Tera instance for pipeline templates.
///
/// Pipeline templates are YAML; never HTML-escape, whatever the file suffix.
pub(crate) fn base_tera() -> Tera {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Parameter;
    use crate::template_engine::RenderContext;
    use std::fs;
    use std::sync::Arc;

    fn render(registry: PartialRegistry, name: &str) -> Result<String, PartialError> {
        let registry = Arc::new(registry);
        let env = Environment::new(
            RenderContext::new("dev", Vec::<Parameter>::new(), ""),
            Arc::clone(&registry) as Arc<dyn PartialSource>,
        );
        env.render_partial(name, 0, serde_json::Map::new())
    }

    #[test]
    fn test_load_partials() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("task.yml"), "task: {{ Instance }}").unwrap();
        fs::write(dir.path().join("get.yml"), "get: repo").unwrap();

        let registry = PartialRegistry::load(dir.path()).unwrap();
        assert_eq!(registry.names(), vec!["get.yml", "task.yml"]);
        assert_eq!(render(registry, "task.yml").unwrap(), "task: dev");
    }

    #[test]
    fn test_load_is_flat() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.yml"), "deep").unwrap();
        fs::write(dir.path().join("top.yml"), "top").unwrap();

        let registry = PartialRegistry::load(dir.path()).unwrap();
        assert_eq!(registry.names(), vec!["top.yml"]);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PartialRegistry::load(&dir.path().join("partials")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_registry_fails_at_call_time() {
        let err = render(PartialRegistry::empty(), "anything").unwrap_err();
        assert!(matches!(err, PartialError::NotFound { .. }));
    }

    #[test]
    fn test_invalid_partial_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.yml"), "{{ unclosed").unwrap();
        let err = PartialRegistry::load(dir.path()).unwrap_err();
        assert!(matches!(err, GenerateError::PartialRegistry { .. }));
    }

    #[test]
    fn test_partials_are_not_includable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), "{% include \"b.yml\" %}").unwrap();
        fs::write(dir.path().join("b.yml"), "{% include \"a.yml\" %}").unwrap();

        let registry = PartialRegistry::load(dir.path()).unwrap();
        let err = render(registry, "a.yml").unwrap_err();
        assert!(matches!(err, PartialError::Render { ref name, .. } if name == "a.yml"));
    }

    #[test]
    fn test_html_named_partial_is_not_escaped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("snippet.html"), "{{ Args.v }}").unwrap();
        let registry = Arc::new(PartialRegistry::load(dir.path()).unwrap());
        let env = Environment::new(RenderContext::new("dev", Vec::<Parameter>::new(), ""), registry);
        let mut args = serde_json::Map::new();
        args.insert("v".to_string(), serde_json::Value::from("<a & b>"));
        assert_eq!(env.render_partial("snippet.html", 0, args).unwrap(), "<a & b>");
    }
}
