//! Comment phases
//!
//! Comments import in two passes. The creation pass inserts every comment
//! top-level under its resolved parent item; a reply cannot link to its
//! parent comment yet because source documents order comments arbitrarily
//! and a reply may precede the comment it answers. The linking pass rewires
//! parent references once every comment that can exist does.

use super::ImportRunner;
use crate::error::{Error, Result};
use crate::resolver::MapKind;
use crate::store::NewComment;
use crate::types::{Event, ImportPhase, RecordKind};
use crate::wxr::CommentRecord;
use tracing::{debug, info, warn};

impl ImportRunner {
    /// Create comments under their parent posts and pages
    ///
    /// A comment whose parent item was never imported is skipped; without
    /// the item there is nothing to attach it to.
    pub(super) async fn run_comments_phase(&mut self, comments: &[CommentRecord]) -> Result<()> {
        self.emit_event(Event::PhaseStarted {
            phase: ImportPhase::Comments,
        });
        info!(phase = %ImportPhase::Comments, records = comments.len(), "Phase started");
        self.stats.comments.total = comments.len() as u64;
        self.publish_stats().await;

        for comment in comments {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    initiator: self.initiator.clone(),
                });
            }

            let Some(post_id) = self.resolver.resolve_content(&comment.post_source_id).await
            else {
                self.stats.comments.skipped += 1;
                debug!(
                    comment = %comment.source_id,
                    item = %comment.post_source_id,
                    "Parent item was never imported, skipping comment"
                );
                self.publish_stats().await;
                continue;
            };

            let payload = NewComment {
                post_id,
                author_name: comment.author_name.clone(),
                author_email: comment.author_email.clone(),
                content: comment.content.clone(),
                approved: comment.approved,
                created_at: comment.created_at,
            };
            match self.store.insert_comment(&payload).await {
                Ok(id) => {
                    self.resolver
                        .record(MapKind::Comments, comment.source_id.clone(), id)
                        .await;
                    self.stats.comments.imported += 1;
                }
                Err(e) => self.record_failure(RecordKind::Comment, &comment.source_id, &e),
            }
            self.publish_stats().await;
        }

        self.emit_event(Event::PhaseCompleted {
            phase: ImportPhase::Comments,
        });
        info!(phase = %ImportPhase::Comments, "Phase completed");
        Ok(())
    }

    /// Rewire replies to their parent comments
    ///
    /// Replies whose parent never made it into the store (skipped item,
    /// failed insert, self-reference) stay top-level rather than being
    /// dropped. Failures here adjust no counters; every comment was already
    /// accounted for in the creation pass.
    pub(super) async fn run_linking_phase(&mut self, comments: &[CommentRecord]) -> Result<()> {
        self.emit_event(Event::PhaseStarted {
            phase: ImportPhase::Linking,
        });
        let replies = comments
            .iter()
            .filter(|c| c.parent_source_id.is_some())
            .count();
        info!(phase = %ImportPhase::Linking, records = replies, "Phase started");

        for comment in comments {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    initiator: self.initiator.clone(),
                });
            }
            let Some(parent_source) = &comment.parent_source_id else {
                continue;
            };
            if *parent_source == comment.source_id {
                debug!(
                    comment = %comment.source_id,
                    "Comment replies to itself, leaving top-level"
                );
                continue;
            }
            let Some(child_id) = self
                .resolver
                .resolve(MapKind::Comments, &comment.source_id)
                .await
            else {
                // The reply itself was skipped or failed in the creation pass
                continue;
            };

            match self.resolver.resolve(MapKind::Comments, parent_source).await {
                Some(parent_id) => {
                    if let Err(e) = self.store.set_comment_parent(child_id, parent_id).await {
                        warn!(
                            comment = %comment.source_id,
                            parent = %parent_source,
                            error = %e,
                            "Failed to link reply, leaving top-level"
                        );
                        self.emit_event(Event::RecordFailed {
                            kind: RecordKind::Comment,
                            key: comment.source_id.clone(),
                            error: e.to_string(),
                        });
                    } else {
                        debug!(comment = %child_id, parent = %parent_id, "Reply linked");
                    }
                }
                None => {
                    debug!(
                        comment = %comment.source_id,
                        parent = %parent_source,
                        "Parent comment not imported, reply stays top-level"
                    );
                }
            }
        }

        self.emit_event(Event::PhaseCompleted {
            phase: ImportPhase::Linking,
        });
        info!(phase = %ImportPhase::Linking, "Phase completed");
        Ok(())
    }
}
