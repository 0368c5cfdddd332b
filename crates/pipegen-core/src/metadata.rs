//! Template header parsing (`meta:` section).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{GenerateError, GenerateResult};

/// A named value applied to one instance during template execution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Parameter {
    /// Parameter name, looked up by `getParam`.
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,

    /// Parameter value. Any YAML scalar is accepted and kept as text.
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: String,

    /// Free-form grouping label; carried through but not interpreted.
    #[serde(default, deserialize_with = "scalar_string")]
    pub section: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            section: String::new(),
        }
    }
}

/// Declares how a template file expands into entries.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TemplateMeta {
    /// Entry name in singleton mode.
    #[serde(default)]
    pub name: String,

    /// Entry name when instances are declared. Rendered like the body, so it
    /// usually references `Instance`.
    #[serde(default)]
    pub name_template: String,

    /// Instance identifiers in declaration order.
    #[serde(default)]
    pub instances: Vec<String>,

    /// Pipelines this template belongs to. Empty means the default pipeline.
    #[serde(default)]
    pub pipelines: Vec<String>,

    /// Parameters per instance identifier.
    #[serde(default)]
    pub params: HashMap<String, Vec<Parameter>>,
}

impl TemplateMeta {
    /// Singleton templates declare no instances and expand once under `name`.
    pub fn is_singleton(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances to render, or `[name]` in singleton mode.
    pub fn all_instances(&self) -> Vec<String> {
        if self.is_singleton() {
            vec![self.name.clone()]
        } else {
            self.instances.clone()
        }
    }

    /// Whether the template applies to the selected pipeline.
    ///
    /// Templates without `pipelines` only match the default (empty) pipeline.
    pub fn is_relevant_for_pipeline(&self, pipeline: &str) -> bool {
        if self.pipelines.is_empty() {
            return pipeline.is_empty();
        }
        self.pipelines.iter().any(|p| p == pipeline)
    }

    /// Parameters declared for `instance`, empty when none are.
    pub fn params_for(&self, instance: &str) -> &[Parameter] {
        self.params.get(instance).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The header of a template file, containing just the `meta` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateHeader {
    #[serde(default)]
    pub meta: TemplateMeta,
}

impl TemplateHeader {
    /// Parse raw (unrendered) header text.
    pub fn parse(header: &str, path: &Path) -> GenerateResult<Self> {
        // An empty document deserializes as null, which is not a mapping.
        if header.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(header).map_err(|e| GenerateError::MetadataParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn is_relevant_for_pipeline(&self, pipeline: &str) -> bool {
        self.meta.is_relevant_for_pipeline(pipeline)
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::String(s) => Ok(s),
        other => Err(D::Error::custom(format!(
            "expected a scalar value, found {other:?}"
        ))),
    }
}
