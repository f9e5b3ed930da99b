//! In-memory content store backend
//!
//! Mirrors the SQLite backend's behavior, including natural-key uniqueness,
//! without touching disk. Used by unit tests and useful for dry runs where
//! imported content should not outlive the process.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    COMMENT_APPROVED, COMMENT_PENDING, Category, Comment, ContentStore, MediaAsset, NewCategory,
    NewComment, NewMediaAsset, NewPost, NewUser, Post, User,
};
use crate::error::{Result, StoreError};
use crate::types::TargetId;

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<User>,
    categories: Vec<Category>,
    media: Vec<MediaAsset>,
    posts: Vec<Post>,
    post_categories: Vec<(i64, i64)>,
    post_tags: Vec<(i64, String)>,
    comments: Vec<Comment>,
    next_id: i64,
    /// Natural-key substrings whose inserts fail, for failure-path tests
    poisoned_keys: Vec<String>,
}

impl MemoryState {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_poisoned(&self, key: &str) -> Result<()> {
        for needle in &self.poisoned_keys {
            if key.contains(needle.as_str()) {
                return Err(StoreError::QueryFailed(format!(
                    "injected failure for key containing {:?}",
                    needle
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Content store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later insert whose natural key contains `needle` fail
    ///
    /// Lets tests exercise the per-record failure handling without a real
    /// storage fault.
    pub async fn poison_key(&self, needle: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.poisoned_keys.push(needle.into());
    }

    /// Every user row, ordered by id
    ///
    /// There is no lookup this answers in production; tests use it to assert
    /// on the whole table at once.
    pub async fn list_users(&self) -> Vec<User> {
        let state = self.state.lock().await;
        let mut users = state.users.clone();
        users.sort_by_key(|u| u.id);
        users
    }

    /// Every content row (posts and pages alike), ordered by id
    pub async fn list_posts(&self) -> Vec<Post> {
        let state = self.state.lock().await;
        let mut posts = state.posts.clone();
        posts.sort_by_key(|p| p.id);
        posts
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: TargetId) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id.get()).cloned())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<TargetId> {
        let mut state = self.state.lock().await;
        state.check_poisoned(&user.email)?;
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(
                StoreError::ConstraintViolation(format!("user already exists: {}", user.email))
                    .into(),
            );
        }
        let id = state.alloc_id();
        state.users.push(User {
            id,
            email: user.email.clone(),
            login: user.login.clone(),
            display_name: user.display_name.clone(),
            role: user.role.clone(),
            email_verified: i32::from(user.email_verified),
        });
        Ok(TargetId(id))
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let state = self.state.lock().await;
        Ok(state.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn insert_category(&self, category: &NewCategory) -> Result<TargetId> {
        let mut state = self.state.lock().await;
        state.check_poisoned(&category.slug)?;
        if state.categories.iter().any(|c| c.slug == category.slug) {
            return Err(StoreError::ConstraintViolation(format!(
                "category already exists: {}",
                category.slug
            ))
            .into());
        }
        let id = state.alloc_id();
        state.categories.push(Category {
            id,
            name: category.name.clone(),
            slug: category.slug.clone(),
        });
        Ok(TargetId(id))
    }

    async fn get_media_by_file_name(&self, file_name: &str) -> Result<Option<MediaAsset>> {
        let state = self.state.lock().await;
        Ok(state
            .media
            .iter()
            .find(|m| m.file_name == file_name)
            .cloned())
    }

    async fn get_media(&self, id: TargetId) -> Result<Option<MediaAsset>> {
        let state = self.state.lock().await;
        Ok(state.media.iter().find(|m| m.id == id.get()).cloned())
    }

    async fn insert_media(&self, asset: &NewMediaAsset) -> Result<TargetId> {
        let mut state = self.state.lock().await;
        state.check_poisoned(&asset.file_name)?;
        if state.media.iter().any(|m| m.file_name == asset.file_name) {
            return Err(StoreError::ConstraintViolation(format!(
                "media asset already exists: {}",
                asset.file_name
            ))
            .into());
        }
        let id = state.alloc_id();
        state.media.push(MediaAsset {
            id,
            file_name: asset.file_name.clone(),
            original_name: asset.original_name.clone(),
            mime_type: asset.mime_type.clone(),
            size_bytes: asset.size_bytes,
            url: asset.url.clone(),
            small_url: asset.small_url.clone(),
            medium_url: asset.medium_url.clone(),
            large_url: asset.large_url.clone(),
            width: asset.width,
            height: asset.height,
        });
        Ok(TargetId(id))
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let state = self.state.lock().await;
        Ok(state.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn get_post(&self, id: TargetId) -> Result<Option<Post>> {
        let state = self.state.lock().await;
        Ok(state.posts.iter().find(|p| p.id == id.get()).cloned())
    }

    async fn insert_post(&self, post: &NewPost) -> Result<TargetId> {
        let mut state = self.state.lock().await;
        state.check_poisoned(&post.slug)?;
        if state.posts.iter().any(|p| p.slug == post.slug) {
            return Err(
                StoreError::ConstraintViolation(format!("post already exists: {}", post.slug))
                    .into(),
            );
        }
        let id = state.alloc_id();
        state.posts.push(Post {
            id,
            title: post.title.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone(),
            status: post.status.as_str().to_string(),
            author_id: post.author_id.get(),
            featured_media_id: post.featured_media_id.map(|id| id.get()),
            published_at: post.published_at.map(|at| at.timestamp()),
            created_at: chrono::Utc::now().timestamp(),
        });
        for category_id in &post.category_ids {
            let link = (id, category_id.get());
            if !state.post_categories.contains(&link) {
                state.post_categories.push(link);
            }
        }
        for tag in &post.tags {
            let link = (id, tag.clone());
            if !state.post_tags.contains(&link) {
                state.post_tags.push(link);
            }
        }
        Ok(TargetId(id))
    }

    async fn list_post_categories(&self, post_id: TargetId) -> Result<Vec<i64>> {
        let state = self.state.lock().await;
        let mut ids: Vec<i64> = state
            .post_categories
            .iter()
            .filter(|(post, _)| *post == post_id.get())
            .map(|(_, category)| *category)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn list_post_tags(&self, post_id: TargetId) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let mut tags: Vec<String> = state
            .post_tags
            .iter()
            .filter(|(post, _)| *post == post_id.get())
            .map(|(_, name)| name.clone())
            .collect();
        tags.sort();
        Ok(tags)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<TargetId> {
        let mut state = self.state.lock().await;
        state.check_poisoned(&comment.author_email)?;
        let id = state.alloc_id();
        let status = if comment.approved {
            COMMENT_APPROVED
        } else {
            COMMENT_PENDING
        };
        state.comments.push(Comment {
            id,
            post_id: comment.post_id.get(),
            parent_id: None,
            author_name: comment.author_name.clone(),
            author_email: comment.author_email.clone(),
            content: comment.content.clone(),
            status: status.to_string(),
            created_at: comment
                .created_at
                .map(|at| at.timestamp())
                .unwrap_or_else(|| chrono::Utc::now().timestamp()),
        });
        Ok(TargetId(id))
    }

    async fn get_comment(&self, id: TargetId) -> Result<Option<Comment>> {
        let state = self.state.lock().await;
        Ok(state.comments.iter().find(|c| c.id == id.get()).cloned())
    }

    async fn list_comments_for_post(&self, post_id: TargetId) -> Result<Vec<Comment>> {
        let state = self.state.lock().await;
        let mut comments: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id.get())
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn set_comment_parent(&self, comment_id: TargetId, parent_id: TargetId) -> Result<()> {
        let mut state = self.state.lock().await;
        let comment = state
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id.get())
            .ok_or_else(|| StoreError::NotFound(format!("comment {} not found", comment_id)))?;
        comment.parent_id = Some(parent_id.get());
        Ok(())
    }
}
