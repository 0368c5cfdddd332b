//! # Generation Error Types
//!
//! Every stage of the engine reports through [`GenerateError`]. All variants
//! are terminal for a run; the assembler surfaces the first one it receives.

use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

use crate::loader::Category;

/// Generation result type
pub type GenerateResult<T> = Result<T, GenerateError>;

/// Error kinds produced while expanding and merging templates
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("could not find a data: section in {}", path.display())]
    MissingDataMarker { path: PathBuf },

    #[error("failed to parse header of {}: {source}", path.display())]
    MetadataParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error(
        "failed to resolve partial for instance {instance} of {}: {}",
        path.display(),
        error_chain(source)
    )]
    PartialResolution {
        path: PathBuf,
        instance: String,
        source: tera::Error,
    },

    #[error("failed to parse template {}: {}", path.display(), error_chain(source))]
    TemplateCompile { path: PathBuf, source: tera::Error },

    #[error(
        "failed to render instance {instance} of {}: {}",
        path.display(),
        error_chain(source)
    )]
    TemplateExecution {
        path: PathBuf,
        instance: String,
        source: tera::Error,
    },

    #[error(
        "failed to unmarshal final instance config of {instance} ({}): {source}",
        path.display()
    )]
    ResultParse {
        path: PathBuf,
        instance: String,
        source: serde_yaml::Error,
    },

    #[error("failed to process path {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse partial templates in {}: {}", dir.display(), error_chain(source))]
    PartialRegistry { dir: PathBuf, source: tera::Error },

    #[error("loading {category} was cancelled")]
    Cancelled { category: Category },

    #[error("failed to load {category}: {source}")]
    Category {
        category: Category,
        source: Box<GenerateError>,
    },

    #[error("{category} worker terminated abnormally: {reason}")]
    Worker { category: Category, reason: String },
}

impl GenerateError {
    /// Wrap an error with the category whose loader produced it
    pub fn in_category(self, category: Category) -> Self {
        Self::Category {
            category,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping category wrapping
    pub fn root(&self) -> &GenerateError {
        match self {
            Self::Category { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error only records a cooperative stop
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled { .. })
    }
}

/// Render an error and all of its sources as `outer: inner: innermost`.
///
/// Tera nests the useful message several levels deep, so the top-level
/// `Display` alone rarely says what went wrong.
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        current = cause.source();
    }
    message
}
