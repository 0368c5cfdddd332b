//! Walk one category folder and collect its rendered entries.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::document::Entry;
use crate::error::{GenerateError, GenerateResult};
use crate::header::find_header;
use crate::metadata::TemplateHeader;
use crate::template_engine::{InstanceRenderer, PartialSource};

/// Suffix of template files; anything else in a category folder is ignored.
pub const TEMPLATE_SUFFIX: &str = ".yml";

/// The four top-level groupings of generated entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Groups,
    ResourceTypes,
    Resources,
    Jobs,
}

impl Category {
    /// All categories in document order.
    pub const ALL: [Category; 4] = [
        Category::Groups,
        Category::ResourceTypes,
        Category::Resources,
        Category::Jobs,
    ];

    /// Folder name under the root, also the document key.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::ResourceTypes => "resource_types",
            Self::Resources => "resources",
            Self::Jobs => "jobs",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Loads every template of one category.
#[derive(Debug, Clone)]
pub struct CategoryLoader {
    category: Category,
    root: PathBuf,
    pipeline: String,
    partials: Arc<dyn PartialSource>,
    cancel: CancellationToken,
}

impl CategoryLoader {
    pub fn new(
        category: Category,
        root: impl Into<PathBuf>,
        pipeline: impl Into<String>,
        partials: Arc<dyn PartialSource>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            category,
            root: root.into(),
            pipeline: pipeline.into(),
            partials,
            cancel,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render every relevant template under the root folder.
    ///
    /// Entries keep file discovery order, then instance declaration order. A
    /// missing root folder yields no entries. Cancellation is checked before
    /// each file; a file already being rendered is finished first.
    pub fn load(&self) -> GenerateResult<Vec<Entry>> {
        let mut entries = Vec::new();

        for item in WalkDir::new(&self.root).sort_by_file_name() {
            let item = match item {
                Ok(item) => item,
                Err(e) if e.depth() == 0 && is_not_found(&e) => {
                    tracing::debug!(category = %self.category, root = ?self.root, "Category folder does not exist");
                    return Ok(entries);
                }
                Err(e) => {
                    let path = e.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                    return Err(GenerateError::Filesystem {
                        path,
                        source: e.into(),
                    });
                }
            };

            if self.cancel.is_cancelled() {
                tracing::debug!(category = %self.category, "Loading cancelled");
                return Err(GenerateError::Cancelled {
                    category: self.category,
                });
            }

            let path = item.path();
            if !item.file_type().is_file() || !path.to_string_lossy().ends_with(TEMPLATE_SUFFIX) {
                continue;
            }

            self.load_file(path, &mut entries)?;
        }

        Ok(entries)
    }

    fn load_file(&self, path: &Path, entries: &mut Vec<Entry>) -> GenerateResult<()> {
        tracing::info!("Processing {}", path.display());

        let source = std::fs::read_to_string(path).map_err(|e| GenerateError::Filesystem {
            path: path.to_path_buf(),
            source: e,
        })?;
        let header = TemplateHeader::parse(find_header(&source, path)?, path)?;
        if !header.is_relevant_for_pipeline(&self.pipeline) {
            tracing::debug!(path = %path.display(), pipeline = %self.pipeline, "Skipping template for other pipelines");
            return Ok(());
        }

        let renderer = InstanceRenderer::new(path, &source, &header.meta, &self.pipeline, &self.partials);
        for instance in header.meta.all_instances() {
            entries.push(renderer.render_entry(&instance)?);
        }
        Ok(())
    }
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error().is_some_and(|e| e.kind() == ErrorKind::NotFound)
}
