//! Import pipeline
//!
//! An [`ImportRunner`] executes one import run end to end: it parses the
//! source document, then drives the phases in dependency order (authors,
//! categories, tags, media, posts, pages, comment creation, comment
//! linking). Later phases resolve source identifiers through the
//! [`Resolver`] maps that earlier phases filled in.
//!
//! Failure handling is two-tier. Problems with the run itself (unreadable
//! source file, malformed XML) abort the whole job. Problems with a single
//! record are caught per record: the record counts as failed, an
//! [`Event::RecordFailed`] goes out and the run moves on to the next record.
//! Cancellation is cooperative and checked between records, so the store is
//! never left with a half-written entity.

mod authors;
mod comments;
mod content;
mod media;
mod taxonomy;


use crate::error::{Error, Result};
use crate::media::MediaPipeline;
use crate::resolver::Resolver;
use crate::store::{ContentStore, NewUser};
use crate::types::{Event, ImportPhase, ImportStats, JobSnapshot, RecordKind, TargetId};
use crate::utils::slugify;
use crate::wxr::{self, ExtractedDocument, TagRecord};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shared handles passed down to [`Importable`] implementations
pub(crate) struct PhaseContext<'a> {
    /// Target content store
    pub store: &'a dyn ContentStore,
    /// Run-scoped identifier maps
    pub resolver: &'a Resolver,
    /// Fallback author for content whose creator cannot be resolved
    pub operator_id: TargetId,
    /// Category every page links to, created on first use and cached
    pub page_category: &'a Mutex<Option<TargetId>>,
}

/// One kind of record the generic phase driver can import
///
/// Implementations supply the natural key, the existence probe and the
/// creation call. [`ImportRunner::run_phase`] owns the counting, the
/// per-record failure isolation and the cancellation checks.
#[async_trait]
pub(crate) trait Importable: Sync {
    /// Record kind reported in stats and events
    const KIND: RecordKind;

    /// Deduplication key of this record in the target store
    fn natural_key(&self) -> String;

    /// Short identifier used in logs and failure events
    fn describe(&self) -> &str;

    /// Look up an entity already stored under `key`
    async fn find_existing(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<Option<TargetId>>;

    /// Create the entity under `key` and return its target id
    async fn create(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<TargetId>;

    /// Record the source-to-target mapping for later phases
    async fn record_mapping(&self, ctx: &PhaseContext<'_>, key: &str, id: TargetId);
}

/// Everything an [`ImportRunner`] needs to execute one run
pub(crate) struct RunnerParams {
    /// Target content store
    pub store: Arc<dyn ContentStore>,
    /// Download and derivative pipeline for the media phase
    pub media: Arc<MediaPipeline>,
    /// Who triggered the import
    pub initiator: String,
    /// Path of the WXR source file
    pub source_path: PathBuf,
    /// Concurrency limit for the media phase
    pub max_concurrent_downloads: usize,
    /// Cooperative cancellation signal
    pub cancel: CancellationToken,
    /// Lifecycle event channel
    pub events: broadcast::Sender<Event>,
    /// Job snapshot the runner publishes progress into
    pub snapshot: Arc<RwLock<JobSnapshot>>,
}

/// Executes one import run
pub(crate) struct ImportRunner {
    store: Arc<dyn ContentStore>,
    media: Arc<MediaPipeline>,
    resolver: Resolver,
    initiator: String,
    source_path: PathBuf,
    max_concurrent_downloads: usize,
    cancel: CancellationToken,
    events: broadcast::Sender<Event>,
    snapshot: Arc<RwLock<JobSnapshot>>,
    stats: ImportStats,
    page_category: Mutex<Option<TargetId>>,
}

impl ImportRunner {
    pub(crate) fn new(params: RunnerParams) -> Self {
        Self {
            store: params.store,
            media: params.media,
            resolver: Resolver::new(),
            initiator: params.initiator,
            source_path: params.source_path,
            max_concurrent_downloads: params.max_concurrent_downloads,
            cancel: params.cancel,
            events: params.events,
            snapshot: params.snapshot,
            stats: ImportStats::default(),
            page_category: Mutex::new(None),
        }
    }

    /// Run the import to completion
    ///
    /// The source file is removed when this returns, whatever the outcome.
    /// An error returned here is fatal for the run; per-record failures are
    /// absorbed into the stats instead of propagating.
    pub(crate) async fn run(mut self) -> Result<()> {
        let _source = SourceFileGuard {
            path: self.source_path.clone(),
        };
        self.emit_event(Event::ImportStarted {
            initiator: self.initiator.clone(),
            source_path: self.source_path.clone(),
        });
        info!(
            initiator = %self.initiator,
            source = %self.source_path.display(),
            "Import started"
        );

        let xml = tokio::fs::read_to_string(&self.source_path).await?;
        let root = wxr::parse(&xml)?;
        let doc = ExtractedDocument::from_root(&root)?;
        let counts = doc.preview_counts();
        info!(
            authors = counts.authors,
            categories = counts.categories,
            tags = counts.tags,
            attachments = counts.attachments,
            posts = counts.posts,
            pages = counts.pages,
            comments = counts.comments,
            "Parsed WXR document"
        );

        self.media.ensure_import_dir().await?;
        let operator_id = self.ensure_operator().await?;

        self.run_phase(ImportPhase::Authors, &doc.authors, operator_id)
            .await?;
        self.run_phase(ImportPhase::Categories, &doc.categories, operator_id)
            .await?;
        self.run_tags_phase(&doc.tags).await?;
        self.run_media_phase(&doc.attachments).await?;

        let posts: Vec<content::PostItem<'_>> = doc.posts.iter().map(content::PostItem).collect();
        self.run_phase(ImportPhase::Posts, &posts, operator_id)
            .await?;

        let pages: Vec<content::PageItem<'_>> = doc.pages.iter().map(content::PageItem).collect();
        self.run_phase(ImportPhase::Pages, &pages, operator_id)
            .await?;

        self.run_comments_phase(&doc.comments).await?;
        self.run_linking_phase(&doc.comments).await?;

        info!(totals = ?self.stats.combined(), "Import finished");
        Ok(())
    }

    /// Drive one phase over its records
    ///
    /// Each record is keyed, probed and either skipped (already present) or
    /// created. The source mapping is recorded in both cases so later phases
    /// can resolve references to records that predate this run.
    async fn run_phase<R: Importable>(
        &mut self,
        phase: ImportPhase,
        records: &[R],
        operator_id: TargetId,
    ) -> Result<()> {
        self.emit_event(Event::PhaseStarted { phase });
        info!(phase = %phase, records = records.len(), "Phase started");
        self.stats.for_kind_mut(R::KIND).total = records.len() as u64;
        self.publish_stats().await;

        for record in records {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    initiator: self.initiator.clone(),
                });
            }

            let ctx = PhaseContext {
                store: self.store.as_ref(),
                resolver: &self.resolver,
                operator_id,
                page_category: &self.page_category,
            };
            let key = record.natural_key();
            match record.find_existing(&ctx, &key).await {
                Ok(Some(existing)) => {
                    record.record_mapping(&ctx, &key, existing).await;
                    self.stats.for_kind_mut(R::KIND).skipped += 1;
                    debug!(kind = %R::KIND, key = %key, id = %existing, "Already present, skipping");
                }
                Ok(None) => match record.create(&ctx, &key).await {
                    Ok(id) => {
                        record.record_mapping(&ctx, &key, id).await;
                        self.stats.for_kind_mut(R::KIND).imported += 1;
                        debug!(kind = %R::KIND, key = %key, id = %id, "Imported");
                    }
                    Err(e) => self.record_failure(R::KIND, record.describe(), &e),
                },
                Err(e) => self.record_failure(R::KIND, record.describe(), &e),
            }
            self.publish_stats().await;
        }

        self.emit_event(Event::PhaseCompleted { phase });
        info!(phase = %phase, "Phase completed");
        Ok(())
    }

    /// Register tag slugs in the resolver name table
    ///
    /// Tags are not store entities of their own; they become plain strings
    /// on the posts that carry them. A registered slug counts as imported.
    async fn run_tags_phase(&mut self, tags: &[TagRecord]) -> Result<()> {
        self.emit_event(Event::PhaseStarted {
            phase: ImportPhase::Tags,
        });
        info!(phase = %ImportPhase::Tags, records = tags.len(), "Phase started");
        self.stats.tags.total = tags.len() as u64;
        self.publish_stats().await;

        for tag in tags {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    initiator: self.initiator.clone(),
                });
            }
            let slug = if tag.slug.is_empty() {
                slugify(&tag.name)
            } else {
                tag.slug.clone()
            };
            if slug.is_empty() {
                self.stats.tags.skipped += 1;
                debug!(name = %tag.name, "Tag has no usable slug, skipping");
            } else {
                let display = if tag.name.is_empty() {
                    slug.clone()
                } else {
                    tag.name.clone()
                };
                self.resolver.record_tag(slug, display).await;
                self.stats.tags.imported += 1;
            }
            self.publish_stats().await;
        }

        self.emit_event(Event::PhaseCompleted {
            phase: ImportPhase::Tags,
        });
        info!(phase = %ImportPhase::Tags, "Phase completed");
        Ok(())
    }

    /// Get or create the fallback user that unattributable content is owned by
    ///
    /// Keyed by a placeholder email derived from the initiator name; repeated
    /// runs by the same initiator reuse one user. Not counted in the author
    /// stats.
    async fn ensure_operator(&self) -> Result<TargetId> {
        let slug = slugify(&self.initiator);
        let login = if slug.is_empty() {
            "operator".to_string()
        } else {
            slug
        };
        let email = authors::placeholder_email(&login);

        if let Some(user) = self.store.get_user_by_email(&email).await? {
            debug!(user_id = user.id, email = %email, "Operator user already present");
            return Ok(TargetId::new(user.id));
        }

        let id = self
            .store
            .insert_user(&NewUser {
                email: email.clone(),
                login,
                display_name: self.initiator.clone(),
                password: authors::random_password(),
                role: "editor".to_string(),
                email_verified: true,
            })
            .await?;
        info!(user_id = %id, email = %email, "Created operator user");
        Ok(id)
    }

    /// Count a record as failed and surface it without stopping the run
    fn record_failure(&mut self, kind: RecordKind, key: &str, error: &Error) {
        warn!(kind = %kind, key = %key, error = %error, "Record failed, continuing");
        self.stats.for_kind_mut(kind).failed += 1;
        self.emit_event(Event::RecordFailed {
            kind,
            key: key.to_string(),
            error: error.to_string(),
        });
    }

    fn emit_event(&self, event: Event) {
        // Send only fails when nobody is subscribed
        self.events.send(event).ok();
    }

    async fn publish_stats(&self) {
        self.snapshot.write().await.stats = self.stats;
    }
}

/// Removes the uploaded source file when the run ends
///
/// Held for the whole of [`ImportRunner::run`], so the file is gone on
/// completion, fatal error, cancellation and panic of the surrounding task
/// alike.
struct SourceFileGuard {
    path: PathBuf,
}

impl Drop for SourceFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "Removed source file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Source file already gone");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove source file");
            }
        }
    }
}
