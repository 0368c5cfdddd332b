//! # Pipeline Assembler
//!
//! Runs the four category loaders concurrently and merges their output into a
//! [`Document`].
//!
//! ## Flow
//!
//! 1. **Initializing**: load the partial registry from `<root>/partials`.
//!    Failure here ends the run before any loader starts.
//! 2. **Loading**: one blocking worker per category, all sharing the
//!    registry, the selected pipeline and a [`CancellationToken`]. Workers
//!    report failures through an mpsc channel.
//! 3. A collector task takes the first error, cancels the token and stops
//!    listening. Later errors are dropped, and loaders that stop on the token
//!    never report. A panicking worker also cancels the token.
//! 4. **Merging**: once every worker has terminated, each worker's entries
//!    are moved into its document field (groups, resource types, resources,
//!    jobs) and the optional world group is prepended.
//! 5. **Done** returns the document; **Failed** returns the first error.
//!
//! Workers never share a result container. Each one returns its own entries
//! through its join handle.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::document::{world_group, Document, Entry};
use crate::error::{GenerateError, GenerateResult};
use crate::loader::{Category, CategoryLoader};
use crate::template_engine::{PartialRegistry, PartialSource};

/// Folder under the root holding partial templates.
pub const PARTIALS_DIR: &str = "partials";

/// Inputs of one assembly run.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// Folder containing the category folders and `partials`.
    pub root: PathBuf,
    /// Selected pipeline; empty selects the default pipeline.
    pub pipeline: String,
    /// Name of the world group to prepend, if one is wanted.
    pub world_group: Option<String>,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            pipeline: String::new(),
            world_group: None,
        }
    }
}

impl AssemblyOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_pipeline(mut self, pipeline: impl Into<String>) -> Self {
        self.pipeline = pipeline.into();
        self
    }

    pub fn with_world_group(mut self, name: impl Into<String>) -> Self {
        self.world_group = Some(name.into());
        self
    }
}

/// Where an assembly run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyPhase {
    Initializing,
    Loading,
    Merging,
    Done,
    Failed,
}

impl fmt::Display for AssemblyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Loading => "loading",
            Self::Merging => "merging",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Top-level orchestrator of one generation run.
#[derive(Debug)]
pub struct PipelineAssembler {
    options: AssemblyOptions,
    phase: watch::Sender<AssemblyPhase>,
}

impl PipelineAssembler {
    pub fn new(options: AssemblyOptions) -> Self {
        let (phase, _) = watch::channel(AssemblyPhase::Initializing);
        Self { options, phase }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Current phase of the most recent run.
    pub fn phase(&self) -> AssemblyPhase {
        *self.phase.borrow()
    }

    /// Observe phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<AssemblyPhase> {
        self.phase.subscribe()
    }

    pub fn partials_dir(&self) -> PathBuf {
        self.options.root.join(PARTIALS_DIR)
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.options.root.join(category.dir_name())
    }

    /// Run every category loader and merge the results.
    ///
    /// Always waits for all four loaders to terminate before returning. On
    /// failure only the first error is reported and no document is produced.
    pub async fn assemble(&self) -> GenerateResult<Document> {
        self.enter(AssemblyPhase::Initializing);
        let partials = match PartialRegistry::load(&self.partials_dir()) {
            Ok(registry) => Arc::new(registry) as Arc<dyn PartialSource>,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(AssemblyPhase::Loading);
        let cancel = CancellationToken::new();
        let (error_tx, error_rx) = mpsc::channel(Category::ALL.len());
        let collector = tokio::spawn(collect_first_error(error_rx, cancel.clone()));

        let workers: Vec<(Category, WorkerHandle)> = Category::ALL
            .into_iter()
            .map(|category| {
                let loader = CategoryLoader::new(
                    category,
                    self.category_dir(category),
                    self.options.pipeline.clone(),
                    Arc::clone(&partials),
                    cancel.clone(),
                );
                let handle = spawn_worker(category, move || loader.load(), error_tx.clone());
                (category, handle)
            })
            .collect();
        drop(error_tx);

        let loaded = match join_workers(workers, collector, &cancel).await {
            Ok(loaded) => loaded,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(AssemblyPhase::Merging);
        let mut document = Document::default();
        for (category, entries) in loaded {
            match category {
                Category::Groups => document.groups = entries,
                Category::ResourceTypes => document.resource_types = entries,
                Category::Resources => document.resources = entries,
                Category::Jobs => document.jobs = entries,
            }
        }

        if let Some(name) = &self.options.world_group {
            let group = world_group(name, &document);
            document.groups.insert(0, group);
        }

        self.enter(AssemblyPhase::Done);
        tracing::debug!(
            groups = document.groups.len(),
            resource_types = document.resource_types.len(),
            resources = document.resources.len(),
            jobs = document.jobs.len(),
            "Assembled pipeline document"
        );
        Ok(document)
    }

    fn enter(&self, phase: AssemblyPhase) {
        tracing::debug!(%phase, root = %self.options.root.display(), "Assembly phase");
        self.phase.send_replace(phase);
    }

    fn fail(&self, err: GenerateError) -> GenerateError {
        self.enter(AssemblyPhase::Failed);
        err
    }
}

type WorkerHandle = JoinHandle<WorkerOutcome>;

/// How one category worker ended.
#[derive(Debug)]
enum WorkerOutcome {
    Loaded(Vec<Entry>),
    /// Failed; the error went to the collector.
    Reported,
    /// Stopped early because another worker failed.
    Stopped(GenerateError),
}

/// Run `work` on the blocking pool; failures go to `errors` tagged with the category.
///
/// Cancellations are kept out of the channel, they only ever follow another
/// worker's failure.
fn spawn_worker<F>(
    category: Category,
    work: F,
    errors: mpsc::Sender<GenerateError>,
) -> WorkerHandle
where
    F: FnOnce() -> GenerateResult<Vec<Entry>> + Send + 'static,
{
    tokio::task::spawn_blocking(move || match work() {
        Ok(entries) => WorkerOutcome::Loaded(entries),
        Err(e) if e.is_cancelled() => {
            tracing::debug!(%category, "Loader stopped after cancellation");
            WorkerOutcome::Stopped(e.in_category(category))
        }
        Err(e) => {
            tracing::debug!(%category, error = %e, "Loader failed");
            // The collector only keeps the first error and may be gone already.
            let _ = errors.blocking_send(e.in_category(category));
            WorkerOutcome::Reported
        }
    })
}

/// Wait for every worker and the collector, then pick what to report.
///
/// The first collected failure wins, then a crashed worker, then a cancellation.
async fn join_workers(
    workers: Vec<(Category, WorkerHandle)>,
    collector: JoinHandle<Option<GenerateError>>,
    cancel: &CancellationToken,
) -> GenerateResult<Vec<(Category, Vec<Entry>)>> {
    let mut loaded = Vec::with_capacity(workers.len());
    let mut crashed = None;
    let mut stopped = None;
    for (category, handle) in workers {
        match handle.await {
            Ok(WorkerOutcome::Loaded(entries)) => loaded.push((category, entries)),
            Ok(WorkerOutcome::Reported) => {}
            Ok(WorkerOutcome::Stopped(e)) => {
                if stopped.is_none() {
                    stopped = Some(e);
                }
            }
            Err(e) => {
                tracing::error!(%category, error = %e, "Category worker did not finish");
                cancel.cancel();
                if crashed.is_none() {
                    crashed = Some(GenerateError::Worker {
                        category,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    let first_error = match collector.await {
        Ok(first) => first,
        Err(e) => {
            tracing::error!(error = %e, "Error collector did not finish");
            None
        }
    };
    match first_error.or(crashed).or(stopped) {
        Some(err) => Err(err),
        None => Ok(loaded),
    }
}

/// Wait for the first reported error and cancel the remaining loaders.
///
/// Returns `None` once every sender is dropped without an error.
async fn collect_first_error(
    mut errors: mpsc::Receiver<GenerateError>,
    cancel: CancellationToken,
) -> Option<GenerateError> {
    let first = errors.recv().await?;
    tracing::error!(error = %first, "Pipeline generation failed, cancelling remaining loaders");
    cancel.cancel();
    Some(first)
}
