//! Per-render variables visible to templates.

use std::sync::Arc;

use serde_json::{Map, Value};
use tera::Context;

use crate::metadata::Parameter;

/// Variables available while rendering one instance or one partial.
///
/// Exposed to templates as `Instance`, `Params`, `Pipeline` and `Args`.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub instance: String,
    pub params: Arc<[Parameter]>,
    pub pipeline: String,
    /// Keyword arguments of the enclosing `partial` call; empty otherwise.
    pub args: Map<String, Value>,
}

impl RenderContext {
    pub fn new(
        instance: impl Into<String>,
        params: impl Into<Arc<[Parameter]>>,
        pipeline: impl Into<String>,
    ) -> Self {
        Self {
            instance: instance.into(),
            params: params.into(),
            pipeline: pipeline.into(),
            args: Map::new(),
        }
    }

    /// Same instance, parameters and pipeline with `args` replaced.
    pub fn with_args(&self, args: Map<String, Value>) -> Self {
        Self {
            instance: self.instance.clone(),
            params: Arc::clone(&self.params),
            pipeline: self.pipeline.clone(),
            args,
        }
    }

    pub(crate) fn to_tera(&self) -> Context {
        let mut context = Context::new();
        context.insert("Instance", &self.instance);
        context.insert("Params", &*self.params);
        context.insert("Pipeline", &self.pipeline);
        context.insert("Args", &self.args);
        context
    }
}
