//! Media phase
//!
//! Attachments are downloaded concurrently, bounded by the configured
//! download limit. Each attachment resolves to one of three outcomes:
//! imported (downloaded, derivatives generated, stored), skipped (already
//! present, or not an importable image type) or failed. Outcomes are folded
//! into the stats as they complete, in whatever order the downloads finish.

use super::ImportRunner;
use crate::error::{Error, MediaError, Result};
use crate::media::{MediaPipeline, mime_for_extension};
use crate::resolver::{MapKind, Resolver};
use crate::store::ContentStore;
use crate::types::{Event, ImportPhase, RecordKind, TargetId};
use crate::utils::{file_extension, file_name_from_url};
use crate::wxr::AttachmentRecord;
use futures::StreamExt;
use futures::stream;
use tracing::{debug, info, warn};

/// Terminal outcome of one attachment
enum MediaOutcome {
    Imported,
    Skipped,
    Failed { key: String, error: Error },
}

impl ImportRunner {
    /// Download attachments and store them with their derivatives
    ///
    /// Attachments without a source URL are excluded before counting; there
    /// is nothing to download and nothing to report for them. The phase
    /// total covers everything else, including non-image attachments, which
    /// count as skipped.
    pub(super) async fn run_media_phase(&mut self, attachments: &[AttachmentRecord]) -> Result<()> {
        self.emit_event(Event::PhaseStarted {
            phase: ImportPhase::Media,
        });

        let downloadable: Vec<&AttachmentRecord> =
            attachments.iter().filter(|a| !a.url.is_empty()).collect();
        if downloadable.len() < attachments.len() {
            debug!(
                excluded = attachments.len() - downloadable.len(),
                "Attachments without a source URL excluded"
            );
        }
        info!(
            phase = %ImportPhase::Media,
            records = downloadable.len(),
            concurrency = self.max_concurrent_downloads,
            "Phase started"
        );
        self.stats.media.total = downloadable.len() as u64;
        self.publish_stats().await;

        let store = self.store.as_ref();
        let resolver = &self.resolver;
        let pipeline = self.media.as_ref();
        let futures: Vec<_> = downloadable
            .into_iter()
            .map(move |attachment| process_attachment(store, resolver, pipeline, attachment))
            .collect();
        let mut outcomes =
            stream::iter(futures).buffer_unordered(self.max_concurrent_downloads.max(1));

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                MediaOutcome::Imported => self.stats.media.imported += 1,
                MediaOutcome::Skipped => self.stats.media.skipped += 1,
                MediaOutcome::Failed { key, error } => {
                    warn!(
                        kind = %RecordKind::Media,
                        key = %key,
                        error = %error,
                        "Record failed, continuing"
                    );
                    self.stats.media.failed += 1;
                    self.emit_event(Event::RecordFailed {
                        kind: RecordKind::Media,
                        key,
                        error: error.to_string(),
                    });
                }
            }
            self.publish_stats().await;

            // Dropping the stream aborts in-flight downloads; their partial
            // files are removed by the pipeline's cleanup guards
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    initiator: self.initiator.clone(),
                });
            }
        }

        self.emit_event(Event::PhaseCompleted {
            phase: ImportPhase::Media,
        });
        info!(phase = %ImportPhase::Media, "Phase completed");
        Ok(())
    }
}

/// Classify one attachment and import it if it is a new image
async fn process_attachment(
    store: &dyn ContentStore,
    resolver: &Resolver,
    pipeline: &MediaPipeline,
    attachment: &AttachmentRecord,
) -> MediaOutcome {
    let Some(file_name) = file_name_from_url(&attachment.url) else {
        return MediaOutcome::Failed {
            key: attachment.url.clone(),
            error: MediaError::MissingUrl {
                source_id: attachment.source_id.clone(),
            }
            .into(),
        };
    };

    let extension = file_extension(&file_name).unwrap_or_default();
    if mime_for_extension(&extension).is_none() {
        debug!(file_name = %file_name, "Not an importable image type, skipping");
        return MediaOutcome::Skipped;
    }

    match import_attachment(store, resolver, pipeline, attachment, &file_name).await {
        Ok(Created::Imported) => MediaOutcome::Imported,
        Ok(Created::AlreadyPresent) => MediaOutcome::Skipped,
        Err(error) => MediaOutcome::Failed {
            key: file_name,
            error,
        },
    }
}

enum Created {
    Imported,
    AlreadyPresent,
}

async fn import_attachment(
    store: &dyn ContentStore,
    resolver: &Resolver,
    pipeline: &MediaPipeline,
    attachment: &AttachmentRecord,
    file_name: &str,
) -> Result<Created> {
    if let Some(existing) = store.get_media_by_file_name(file_name).await? {
        resolver
            .record(
                MapKind::Media,
                attachment.source_id.clone(),
                TargetId::new(existing.id),
            )
            .await;
        debug!(file_name = %file_name, "Media asset already present, skipping download");
        return Ok(Created::AlreadyPresent);
    }

    let asset = pipeline.fetch_asset(&attachment.url, file_name).await?;
    let id = store.insert_media(&asset).await?;
    resolver
        .record(MapKind::Media, attachment.source_id.clone(), id)
        .await;
    debug!(file_name = %file_name, id = %id, "Media asset imported");
    Ok(Created::Imported)
}
