//! Post and page phases
//!
//! Posts and pages share a payload builder; the target store holds both in
//! one content table. Pages additionally land in a dedicated "Page" category
//! and carry marker tags, so a site theme can list them separately.
//!
//! Slugs get a random numeric suffix. Source titles repeat freely (and some
//! are empty), so the suffix keeps every created slug unique; the price is
//! that re-importing the same document creates fresh copies of posts and
//! pages instead of skipping them.

use super::{Importable, PhaseContext};
use crate::error::Result;
use crate::resolver::MapKind;
use crate::store::{NewCategory, NewPost};
use crate::types::{PostStatus, RecordKind, TargetId};
use crate::utils::slugify;
use crate::wxr::PostRecord;
use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

/// Category every imported page is linked to
const PAGE_CATEGORY_NAME: &str = "Page";
const PAGE_CATEGORY_SLUG: &str = "page";

/// Marker tags carried by every imported page
const PAGE_MARKER_TAGS: [&str; 2] = ["page", "imported"];

/// Post item wrapper for the generic phase driver
pub(super) struct PostItem<'a>(pub &'a PostRecord);

/// Page item wrapper; creation adds the page category and marker tags
pub(super) struct PageItem<'a>(pub &'a PostRecord);

/// Slug for a new content entity: slugified title plus a random suffix
fn content_slug(title: &str) -> String {
    let base = slugify(title);
    let base = if base.is_empty() { "untitled" } else { &base };
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("{base}-{suffix}")
}

/// Resolve every source reference on the record into a store payload
///
/// Unresolvable references degrade instead of failing: an unknown author
/// becomes the operator, unknown categories are dropped, a missing featured
/// image leaves the post without one.
async fn build_payload(ctx: &PhaseContext<'_>, record: &PostRecord, slug: &str) -> NewPost {
    let author_id = match ctx.resolver.resolve(MapKind::Users, &record.author_login).await {
        Some(id) => id,
        None => {
            debug!(
                login = %record.author_login,
                "Author not resolved, attributing to operator"
            );
            ctx.operator_id
        }
    };

    let mut category_ids = Vec::new();
    for reference in &record.categories {
        match ctx.resolver.resolve(MapKind::Categories, &reference.slug).await {
            Some(id) => {
                if !category_ids.contains(&id) {
                    category_ids.push(id);
                }
            }
            None => debug!(slug = %reference.slug, "Category reference not resolved, dropping"),
        }
    }

    let mut tags = Vec::new();
    for reference in &record.tags {
        // Prefer the display name registered in the tag phase; an inline
        // name on the item itself is the fallback
        let name = match ctx.resolver.tag_name(&reference.slug).await {
            Some(name) => name,
            None if !reference.name.is_empty() => reference.name.clone(),
            None => continue,
        };
        if !tags.contains(&name) {
            tags.push(name);
        }
    }

    let featured_media_id = match &record.thumbnail_source_id {
        Some(source_id) => {
            let resolved = ctx.resolver.resolve(MapKind::Media, source_id).await;
            if resolved.is_none() {
                debug!(
                    source_id = %source_id,
                    "Featured image not imported, content goes in without it"
                );
            }
            resolved
        }
        None => None,
    };

    NewPost {
        title: record.title.clone(),
        slug: slug.to_string(),
        content: record.content.clone(),
        excerpt: if record.excerpt.is_empty() {
            None
        } else {
            Some(record.excerpt.clone())
        },
        status: PostStatus::from_source(&record.status),
        author_id,
        featured_media_id,
        published_at: record.published_at,
        category_ids,
        tags,
    }
}

/// Get or create the shared "Page" category, cached for the run
pub(super) async fn ensure_page_category(ctx: &PhaseContext<'_>) -> Result<TargetId> {
    let mut cache = ctx.page_category.lock().await;
    if let Some(id) = *cache {
        return Ok(id);
    }
    let id = match ctx.store.get_category_by_slug(PAGE_CATEGORY_SLUG).await? {
        Some(existing) => TargetId::new(existing.id),
        None => {
            ctx.store
                .insert_category(&NewCategory {
                    name: PAGE_CATEGORY_NAME.to_string(),
                    slug: PAGE_CATEGORY_SLUG.to_string(),
                })
                .await?
        }
    };
    *cache = Some(id);
    Ok(id)
}

#[async_trait]
impl Importable for PostItem<'_> {
    const KIND: RecordKind = RecordKind::Post;

    fn natural_key(&self) -> String {
        content_slug(&self.0.title)
    }

    fn describe(&self) -> &str {
        &self.0.title
    }

    async fn find_existing(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<Option<TargetId>> {
        let post = ctx.store.get_post_by_slug(key).await?;
        Ok(post.map(|p| TargetId::new(p.id)))
    }

    async fn create(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<TargetId> {
        let payload = build_payload(ctx, self.0, key).await;
        ctx.store.insert_post(&payload).await
    }

    async fn record_mapping(&self, ctx: &PhaseContext<'_>, _key: &str, id: TargetId) {
        // Comments reference their parent item by source post id
        ctx.resolver
            .record(MapKind::Posts, self.0.source_id.clone(), id)
            .await;
    }
}

#[async_trait]
impl Importable for PageItem<'_> {
    const KIND: RecordKind = RecordKind::Page;

    fn natural_key(&self) -> String {
        content_slug(&self.0.title)
    }

    fn describe(&self) -> &str {
        &self.0.title
    }

    async fn find_existing(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<Option<TargetId>> {
        let post = ctx.store.get_post_by_slug(key).await?;
        Ok(post.map(|p| TargetId::new(p.id)))
    }

    async fn create(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<TargetId> {
        let mut payload = build_payload(ctx, self.0, key).await;

        let page_category = ensure_page_category(ctx).await?;
        if !payload.category_ids.contains(&page_category) {
            payload.category_ids.push(page_category);
        }
        for marker in PAGE_MARKER_TAGS {
            if !payload.tags.iter().any(|t| t == marker) {
                payload.tags.push(marker.to_string());
            }
        }

        ctx.store.insert_post(&payload).await
    }

    async fn record_mapping(&self, ctx: &PhaseContext<'_>, _key: &str, id: TargetId) {
        ctx.resolver
            .record(MapKind::Pages, self.0.source_id.clone(), id)
            .await;
    }
}
