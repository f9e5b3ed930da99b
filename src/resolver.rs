//! Run-scoped identifier maps
//!
//! Source-side identifiers (logins, slugs, post ids, comment ids) mean nothing
//! to the target store, so every phase records the target id it produced under
//! the record's source key, and later phases resolve references through these
//! maps. The maps live for one import run and are never persisted.
//!
//! A missing entry is an expected condition, not an error: it means the
//! referenced record failed to import or was never in the file, and the caller
//! decides how to degrade (skip the comment, drop the featured image, fall
//! back to the operator as author).

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::types::TargetId;

/// Which identifier map a key belongs to
///
/// Tags are absent here on purpose: they resolve through a separate
/// slug-to-display-name table rather than to target ids.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MapKind {
    /// Keyed by author login
    Users,
    /// Keyed by slugified category display name
    Categories,
    /// Keyed by source-side attachment post id
    Media,
    /// Keyed by source-side post id
    Posts,
    /// Keyed by source-side page post id
    Pages,
    /// Keyed by source-side comment id
    Comments,
}

#[derive(Debug, Default)]
struct ResolverState {
    users: HashMap<String, TargetId>,
    categories: HashMap<String, TargetId>,
    media: HashMap<String, TargetId>,
    posts: HashMap<String, TargetId>,
    pages: HashMap<String, TargetId>,
    comments: HashMap<String, TargetId>,
    /// Tag slug to display name, denormalized onto posts at creation time
    tag_names: HashMap<String, String>,
}

impl ResolverState {
    fn map(&self, kind: MapKind) -> &HashMap<String, TargetId> {
        match kind {
            MapKind::Users => &self.users,
            MapKind::Categories => &self.categories,
            MapKind::Media => &self.media,
            MapKind::Posts => &self.posts,
            MapKind::Pages => &self.pages,
            MapKind::Comments => &self.comments,
        }
    }

    fn map_mut(&mut self, kind: MapKind) -> &mut HashMap<String, TargetId> {
        match kind {
            MapKind::Users => &mut self.users,
            MapKind::Categories => &mut self.categories,
            MapKind::Media => &mut self.media,
            MapKind::Posts => &mut self.posts,
            MapKind::Pages => &mut self.pages,
            MapKind::Comments => &mut self.comments,
        }
    }
}

/// Identifier maps for one import run
#[derive(Debug, Default)]
pub struct Resolver {
    state: RwLock<ResolverState>,
}

impl Resolver {
    /// Create an empty resolver for a new run
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a source-to-target mapping
    ///
    /// Recording the same key twice keeps the latest id; duplicate natural
    /// keys within one file collapse onto a single target record anyway.
    pub async fn record(&self, kind: MapKind, source_key: impl Into<String>, id: TargetId) {
        let mut state = self.state.write().await;
        state.map_mut(kind).insert(source_key.into(), id);
    }

    /// Resolve a source key to the target id recorded for it, if any
    pub async fn resolve(&self, kind: MapKind, source_key: &str) -> Option<TargetId> {
        let state = self.state.read().await;
        state.map(kind).get(source_key).copied()
    }

    /// Resolve a source item id against the Posts map, then the Pages map
    ///
    /// Comments reference their parent item only by source id, without saying
    /// whether it was a post or a page.
    pub async fn resolve_content(&self, source_id: &str) -> Option<TargetId> {
        let state = self.state.read().await;
        state
            .posts
            .get(source_id)
            .or_else(|| state.pages.get(source_id))
            .copied()
    }

    /// Register a tag's display name under its slug
    pub async fn record_tag(&self, slug: impl Into<String>, display_name: impl Into<String>) {
        let mut state = self.state.write().await;
        state.tag_names.insert(slug.into(), display_name.into());
    }

    /// Display name registered for a tag slug, if any
    pub async fn tag_name(&self, slug: &str) -> Option<String> {
        let state = self.state.read().await;
        state.tag_names.get(slug).cloned()
    }
}
