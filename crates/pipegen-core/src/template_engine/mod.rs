//! Runtime template engine for pipeline templates.
//!
//! Uses Tera for rendering. Each instance render gets a fresh [`Environment`]
//! exposing `getParam`, `ite`, `indent` and `partial`, bound to that
//! instance's parameters. Partials are reusable fragments loaded once per run
//! into a read-only [`PartialRegistry`].

mod context;
mod functions;
mod partials;
mod renderer;

pub use context::RenderContext;
pub use functions::{indent, Environment, PartialError, PartialSource};
pub use partials::PartialRegistry;
pub use renderer::{InstanceRenderer, RenderedInstance};
