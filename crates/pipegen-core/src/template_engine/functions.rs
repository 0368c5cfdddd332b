//! Functions available inside template bodies.
//!
//! Tera passes function arguments by name, so the calls look like
//! `{{ getParam(name="region", default="eu") }}` or
//! `{{ partial(name="task.yml", columns=6, repo="main") }}`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tera::{Function, Tera};

use super::context::RenderContext;
use crate::metadata::Parameter;

/// Arguments of `partial` that are not forwarded as `Args`.
const PARTIAL_NAME_ARG: &str = "name";
const PARTIAL_COLUMNS_ARG: &str = "columns";
const PARTIAL_PAIRS_ARG: &str = "pairs";

/// Failure to resolve or render a partial.
#[derive(Debug, thiserror::Error)]
pub enum PartialError {
    #[error("partial `{name}` not found")]
    NotFound { name: String },
    #[error("cyclic partial reference: {chain}")]
    Cycle { chain: String },
    #[error("failed to render partial `{name}`")]
    Render { name: String, source: tera::Error },
}

/// Somewhere partials can be rendered from.
pub trait PartialSource: fmt::Debug + Send + Sync {
    /// Render partial `name` with the functions and variables of `env`.
    fn render_partial(&self, name: &str, env: &Environment) -> Result<String, PartialError>;
}

/// The function set bound to one render.
///
/// Holds the render context, the partial source and the names of the
/// partials currently being expanded, which is how cycles are detected.
#[derive(Debug, Clone)]
pub struct Environment {
    context: RenderContext,
    partials: Arc<dyn PartialSource>,
    stack: Vec<String>,
}

impl Environment {
    pub fn new(context: RenderContext, partials: Arc<dyn PartialSource>) -> Self {
        Self {
            context,
            partials,
            stack: Vec::new(),
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Variables for [`Tera::render`].
    pub fn tera_context(&self) -> tera::Context {
        self.context.to_tera()
    }

    /// Register the template functions on `tera`, replacing earlier bindings.
    pub fn install(&self, tera: &mut Tera) {
        tera.register_function(
            "getParam",
            GetParam {
                params: Arc::clone(&self.context.params),
            },
        );
        tera.register_function("ite", ite);
        tera.register_function("indent", indent_fn);
        tera.register_function("partial", PartialCall { env: self.clone() });
        tera.register_filter("indent_lines", indent_filter);
    }

    /// Render partial `name` with `args` and indent the result by `columns`.
    pub fn render_partial(
        &self,
        name: &str,
        columns: usize,
        args: Map<String, Value>,
    ) -> Result<String, PartialError> {
        if self.stack.iter().any(|active| active == name) {
            let mut chain = self.stack.clone();
            chain.push(name.to_string());
            return Err(PartialError::Cycle {
                chain: chain.join(" -> "),
            });
        }

        let mut stack = self.stack.clone();
        stack.push(name.to_string());
        let child = Self {
            context: self.context.with_args(args),
            partials: Arc::clone(&self.partials),
            stack,
        };

        let rendered = self.partials.render_partial(name, &child)?;
        Ok(indent(&rendered, columns))
    }
}

/// Prefix every line but the first with `columns` spaces.
pub fn indent(text: &str, columns: usize) -> String {
    let padding = " ".repeat(columns);
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            if idx == 0 {
                line.to_string()
            } else {
                format!("{padding}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct GetParam {
    params: Arc<[Parameter]>,
}

impl Function for GetParam {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = required_str(args, "getParam", "name")?;
        let found = self.params.iter().find(|p| p.name == name);
        Ok(match found {
            Some(param) => Value::String(param.value.clone()),
            None => args
                .get("default")
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
        })
    }
}

fn ite(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let condition = args.get("condition").map(is_truthy).unwrap_or(false);
    let key = if condition { "when_true" } else { "when_false" };
    Ok(args.get(key).cloned().unwrap_or(Value::Null))
}

fn indent_fn(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = args
        .get("text")
        .ok_or_else(|| tera::Error::msg("indent requires a `text` argument"))?;
    let columns = columns_arg(args, "indent")?;
    Ok(Value::String(indent(&value_to_text(text)?, columns)))
}

fn indent_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let columns = columns_arg(args, "indent_lines")?;
    Ok(Value::String(indent(&value_to_text(value)?, columns)))
}

struct PartialCall {
    env: Environment,
}

impl Function for PartialCall {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = required_str(args, "partial", PARTIAL_NAME_ARG)?;
        let columns = columns_arg(args, "partial")?;
        let partial_args = keyword_args(args)?;

        self.env
            .render_partial(name, columns, partial_args)
            .map(Value::String)
            .map_err(|e| tera::Error::chain(format!("partial `{name}` failed"), e))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Collect the `Args` of a partial call from its named and `pairs` arguments.
fn keyword_args(args: &HashMap<String, Value>) -> tera::Result<Map<String, Value>> {
    let mut collected = Map::new();
    for (key, value) in args {
        if key != PARTIAL_NAME_ARG && key != PARTIAL_COLUMNS_ARG && key != PARTIAL_PAIRS_ARG {
            collected.insert(key.clone(), value.clone());
        }
    }

    let Some(pairs) = args.get(PARTIAL_PAIRS_ARG) else {
        return Ok(collected);
    };
    let items = pairs
        .as_array()
        .ok_or_else(|| tera::Error::msg("partial `pairs` must be a list"))?;
    if items.len() % 2 != 0 {
        return Err(tera::Error::msg(format!(
            "partial `pairs` must alternate keys and values, got {} items",
            items.len()
        )));
    }
    for pair in items.chunks(2) {
        let key = pair[0].as_str().ok_or_else(|| {
            tera::Error::msg(format!("partial `pairs` key must be a string, got {}", pair[0]))
        })?;
        collected.insert(key.to_string(), pair[1].clone());
    }
    Ok(collected)
}

fn required_str<'a>(
    args: &'a HashMap<String, Value>,
    function: &str,
    arg: &str,
) -> tera::Result<&'a str> {
    match args.get(arg) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(tera::Error::msg(format!(
            "{function} expects `{arg}` to be a string, got {other}"
        ))),
        None => Err(tera::Error::msg(format!(
            "{function} requires a `{arg}` argument"
        ))),
    }
}

fn columns_arg(args: &HashMap<String, Value>, function: &str) -> tera::Result<usize> {
    match args.get(PARTIAL_COLUMNS_ARG) {
        None => Ok(0),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                tera::Error::msg(format!(
                    "{function} expects `columns` to be a non-negative integer, got {value}"
                ))
            }),
    }
}

fn value_to_text(value: &Value) -> tera::Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(tera::Error::msg(format!("expected text, got {other}"))),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
