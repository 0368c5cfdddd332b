//! Template expansion and merge engine for pipeline documents.
//!
//! Every template file under a category folder (`jobs`, `resources`,
//! `resource_types`, `groups`) carries a `meta:` header declaring its
//! instances, the pipelines it applies to and per-instance parameters. The
//! engine renders each file once per instance with Tera, parses the output as
//! YAML and merges all categories into one [`Document`].
//!
//! # Modules
//!
//! - [`header`]: splits the raw `meta:` header from the `data:` body
//! - [`metadata`]: typed header model and pipeline applicability
//! - [`template_engine`]: execution environment, partial registry and instance renderer
//! - [`loader`]: walks one category folder and collects its entries
//! - [`assembler`]: runs the four category loaders concurrently and merges their output
//! - [`document`]: structured entries, the merged document and the world group
//! - [`error`]: error kinds shared by every stage

pub mod assembler;
pub mod document;
pub mod error;
pub mod header;
pub mod loader;
pub mod metadata;
pub mod template_engine;

pub use assembler::{AssemblyOptions, AssemblyPhase, PipelineAssembler};
pub use document::{world_group, Document, Entry};
pub use error::{GenerateError, GenerateResult};
pub use loader::Category;
pub use metadata::{Parameter, TemplateHeader, TemplateMeta};
pub use template_engine::{PartialError, PartialRegistry};
