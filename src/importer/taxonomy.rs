//! Category phase
//!
//! Channel-level `wp:category` declarations become categories in the target
//! store, deduplicated by a slug derived from the display name. The source
//! nicename is only a fallback for names that slugify to nothing (emoji-only
//! names, punctuation-only names).

use super::{Importable, PhaseContext};
use crate::error::Result;
use crate::resolver::MapKind;
use crate::store::NewCategory;
use crate::types::{RecordKind, TargetId};
use crate::utils::slugify;
use crate::wxr::CategoryRecord;
use async_trait::async_trait;

#[async_trait]
impl Importable for CategoryRecord {
    const KIND: RecordKind = RecordKind::Category;

    fn natural_key(&self) -> String {
        let slug = slugify(&self.name);
        if !slug.is_empty() {
            slug
        } else if !self.nicename.is_empty() {
            self.nicename.clone()
        } else {
            "uncategorized".to_string()
        }
    }

    fn describe(&self) -> &str {
        &self.name
    }

    async fn find_existing(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<Option<TargetId>> {
        let category = ctx.store.get_category_by_slug(key).await?;
        Ok(category.map(|c| TargetId::new(c.id)))
    }

    async fn create(&self, ctx: &PhaseContext<'_>, key: &str) -> Result<TargetId> {
        let name = if !self.name.is_empty() {
            self.name.clone()
        } else if !self.nicename.is_empty() {
            self.nicename.clone()
        } else {
            "Uncategorized".to_string()
        };
        ctx.store
            .insert_category(&NewCategory {
                name,
                slug: key.to_string(),
            })
            .await
    }

    async fn record_mapping(&self, ctx: &PhaseContext<'_>, key: &str, id: TargetId) {
        // Item taxonomy references are matched against the same derived slug
        ctx.resolver
            .record(MapKind::Categories, key.to_string(), id)
            .await;
    }
}
