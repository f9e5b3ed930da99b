//! Import job control
//!
//! One import runs at a time. [`ImportManager`] owns the single job slot:
//! it admits a run after validating the source file and the available disk
//! space, spawns the pipeline onto the runtime, and keeps a shared
//! [`JobSnapshot`] that status requests read while the run makes progress.
//! A supervisor task watches the pipeline to its end and stamps the terminal
//! state, including the case where the task itself panics.
//!
//! The snapshot of the most recent job stays readable until the next run
//! replaces it, so a poller that misses the live run still sees its outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::importer::{ImportRunner, RunnerParams};
use crate::media::MediaPipeline;
use crate::store::ContentStore;
use crate::types::{Event, ImportStats, JobSnapshot, JobState, PreviewCounts};
use crate::utils::get_available_space;
use crate::wxr;
use crate::wxr::extract::ExtractedDocument;

/// The one job slot plus the means to stop and observe it
struct ActiveJob {
    snapshot: Arc<RwLock<JobSnapshot>>,
    cancel: CancellationToken,
    supervisor: JoinHandle<()>,
}

/// Admits, supervises and reports on import jobs
///
/// The manager is shared between the HTTP handlers; all methods take `&self`
/// and serialize through the internal job slot lock.
pub struct ImportManager {
    store: Arc<dyn ContentStore>,
    media: Arc<MediaPipeline>,
    config: Config,
    events: broadcast::Sender<Event>,
    active: RwLock<Option<ActiveJob>>,
}

impl ImportManager {
    /// Create a manager over a content store
    ///
    /// # Errors
    /// Returns an error if the media pipeline's HTTP client cannot be built.
    pub fn new(store: Arc<dyn ContentStore>, config: Config) -> Result<Self> {
        let media = Arc::new(MediaPipeline::new(
            config.upload.clone(),
            config.media.clone(),
        )?);
        let (events, _) = broadcast::channel(1000);
        Ok(Self {
            store,
            media,
            config,
            events,
            active: RwLock::new(None),
        })
    }

    /// Admit and start an import job
    ///
    /// Validates that the source file exists and that the disk holding the
    /// upload root has room for the estimated media footprint, then spawns
    /// the pipeline and returns the initial snapshot. The source file is
    /// consumed: it is removed when the run ends, however it ends.
    ///
    /// # Arguments
    ///
    /// * `initiator` - Who asked for the import; recorded on the snapshot
    ///   and used to derive the operator user
    /// * `source_path` - Path of the WXR export file to import
    ///
    /// # Errors
    ///
    /// - [`Error::ImportInProgress`] if a job is already running
    /// - [`Error::SourceMissing`] if `source_path` is not a readable file
    /// - [`Error::InsufficientSpace`] if the admission check fails
    pub async fn begin(&self, initiator: &str, source_path: PathBuf) -> Result<JobSnapshot> {
        // Hold the slot lock across admission so two concurrent triggers
        // cannot both pass the conflict check
        let mut active = self.active.write().await;
        if let Some(job) = active.as_ref() {
            let snapshot = job.snapshot.read().await;
            if snapshot.state == JobState::Running {
                return Err(Error::ImportInProgress {
                    initiator: snapshot.initiator.clone(),
                });
            }
        }

        let metadata = match tokio::fs::metadata(&source_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                return Err(Error::SourceMissing { path: source_path });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SourceMissing { path: source_path });
            }
            Err(e) => return Err(e.into()),
        };

        // The upload root must exist before its free space can be measured
        self.media.ensure_import_dir().await?;
        self.check_disk_space(metadata.len())?;

        let snapshot = JobSnapshot {
            state: JobState::Running,
            initiator: initiator.to_string(),
            source_path: source_path.clone(),
            started_at: Utc::now(),
            ended_at: None,
            stats: ImportStats::default(),
            error: None,
        };
        let admitted = snapshot.clone();
        let snapshot = Arc::new(RwLock::new(snapshot));
        let cancel = CancellationToken::new();

        info!(
            initiator = %initiator,
            source_path = %source_path.display(),
            source_bytes = metadata.len(),
            "Import admitted"
        );

        let runner = ImportRunner::new(RunnerParams {
            store: self.store.clone(),
            media: self.media.clone(),
            initiator: initiator.to_string(),
            source_path,
            max_concurrent_downloads: self.config.media.max_concurrent_downloads,
            cancel: cancel.clone(),
            events: self.events.clone(),
            snapshot: snapshot.clone(),
        });
        let run = tokio::spawn(runner.run());
        let supervisor = tokio::spawn(supervise_run(SuperviseContext {
            run,
            snapshot: snapshot.clone(),
            events: self.events.clone(),
        }));

        *active = Some(ActiveJob {
            snapshot,
            cancel,
            supervisor,
        });
        Ok(admitted)
    }

    /// Request cancellation of the running job
    ///
    /// Cancellation is cooperative: the pipeline stops at the next record
    /// boundary, so the snapshot may keep moving briefly after this returns.
    /// The job is marked [`JobState::Cancelled`] immediately.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no job is running.
    pub async fn cancel(&self, initiator: &str) -> Result<JobSnapshot> {
        let active = self.active.read().await;
        let job = active
            .as_ref()
            .ok_or_else(|| Error::NotFound("no import job to cancel".to_string()))?;

        let mut snapshot = job.snapshot.write().await;
        if snapshot.state.is_terminal() {
            return Err(Error::NotFound("no running import job".to_string()));
        }

        job.cancel.cancel();
        snapshot.state = JobState::Cancelled;
        snapshot.ended_at = Some(Utc::now());
        snapshot.error = Some(format!("cancelled by {initiator}"));
        warn!(initiator = %initiator, "Import cancellation requested");
        self.events
            .send(Event::ImportCancelled {
                initiator: initiator.to_string(),
            })
            .ok();
        Ok(snapshot.clone())
    }

    /// Snapshot of the current or most recent job
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no import has been started since the
    /// process came up.
    pub async fn status(&self) -> Result<JobSnapshot> {
        let active = self.active.read().await;
        match active.as_ref() {
            Some(job) => Ok(job.snapshot.read().await.clone()),
            None => Err(Error::NotFound("no import has been started".to_string())),
        }
    }

    /// Parse a source file and report what an import would process
    ///
    /// Creates nothing, downloads nothing and leaves the file in place, so
    /// a preview can be re-run and followed by a real import of the same
    /// file.
    ///
    /// # Errors
    ///
    /// - [`Error::SourceMissing`] if the file does not exist
    /// - [`Error::Parse`] if the document is not usable WXR
    pub async fn preview(&self, source_path: &Path) -> Result<PreviewCounts> {
        let xml = match tokio::fs::read_to_string(source_path).await {
            Ok(xml) => xml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SourceMissing {
                    path: source_path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let root = wxr::parse(&xml)?;
        let doc = ExtractedDocument::from_root(&root)?;
        let counts = doc.preview_counts();
        info!(
            source_path = %source_path.display(),
            authors = counts.authors,
            posts = counts.posts,
            pages = counts.pages,
            comments = counts.comments,
            "Preview parsed"
        );
        Ok(counts)
    }

    /// Subscribe to the lifecycle event stream
    ///
    /// Events are broadcast; a receiver that falls behind loses the oldest
    /// events rather than blocking the pipeline.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Cancel any running job and wait for its supervisor to finish
    ///
    /// Called on process shutdown so the source file guard and partial
    /// download cleanup run before the runtime goes away.
    pub async fn shutdown(&self) {
        let job = self.active.write().await.take();
        if let Some(job) = job {
            job.cancel.cancel();
            if let Err(e) = job.supervisor.await {
                warn!(error = %e, "Import supervisor did not shut down cleanly");
            }
        }
    }

    /// Free-space admission check against the upload root
    fn check_disk_space(&self, source_bytes: u64) -> Result<()> {
        let policy = &self.config.media.disk_space;
        if !policy.enabled {
            return Ok(());
        }

        let estimated = (source_bytes as f64 * policy.size_multiplier) as u64;
        let required = estimated.saturating_add(policy.min_free_space);
        let available = get_available_space(&self.config.upload.root_dir)
            .map_err(|e| Error::DiskSpaceCheckFailed(e.to_string()))?;
        if available < required {
            return Err(Error::InsufficientSpace {
                required,
                available,
            });
        }
        Ok(())
    }
}

/// Everything the supervisor needs once the pipeline task is spawned
struct SuperviseContext {
    run: JoinHandle<Result<()>>,
    snapshot: Arc<RwLock<JobSnapshot>>,
    events: broadcast::Sender<Event>,
}

/// Watch a pipeline task to its end and stamp the terminal state
async fn supervise_run(ctx: SuperviseContext) {
    let outcome = ctx.run.await;

    let mut snapshot = ctx.snapshot.write().await;
    if snapshot.ended_at.is_none() {
        snapshot.ended_at = Some(Utc::now());
    }
    match outcome {
        Ok(Ok(())) => {
            // A cancel that landed after the last record leaves the state
            // Cancelled; the run is only Completed if nothing interfered
            if snapshot.state == JobState::Running {
                snapshot.state = JobState::Completed;
                let combined = snapshot.stats.combined();
                info!(
                    imported = combined.imported,
                    skipped = combined.skipped,
                    failed = combined.failed,
                    "Import completed"
                );
                ctx.events
                    .send(Event::ImportCompleted {
                        stats: snapshot.stats,
                    })
                    .ok();
            }
        }
        Ok(Err(Error::Cancelled { initiator })) => {
            // The ImportCancelled event went out when the cancel was requested
            snapshot.state = JobState::Cancelled;
            if snapshot.error.is_none() {
                snapshot.error = Some(format!("cancelled by {initiator}"));
            }
            info!(initiator = %initiator, "Import stopped after cancel request");
        }
        Ok(Err(e)) => {
            snapshot.state = JobState::Failed;
            snapshot.error = Some(e.to_string());
            error!(error = %e, "Import failed");
            ctx.events
                .send(Event::ImportFailed {
                    error: e.to_string(),
                })
                .ok();
        }
        Err(e) => {
            // The task was aborted or panicked; the snapshot is the only
            // witness left
            snapshot.state = JobState::Failed;
            snapshot.error = Some("import task panicked".to_string());
            error!(error = %e, "Import task did not run to completion");
            ctx.events
                .send(Event::ImportFailed {
                    error: "import task panicked".to_string(),
                })
                .ok();
        }
    }
}
