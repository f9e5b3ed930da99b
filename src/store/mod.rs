//! Target content store
//!
//! The import pipeline writes users, categories, media assets, posts and
//! comments into a content store. [`ContentStore`] is the seam between the
//! phase logic and the storage backend:
//!
//! - [`sqlite::SqliteStore`] — the production backend
//! - [`memory::MemoryStore`] — an in-memory backend for tests and dry runs
//!
//! Lookups by natural key (email, slug, file name) exist so the importer can
//! skip records that already have a counterpart instead of duplicating them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::error::Result;
use crate::types::{PostStatus, TargetId};

pub mod memory;
pub mod sqlite;

/// New user to be inserted into the store
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address, unique across users
    pub email: String,
    /// Login name
    pub login: String,
    /// Human-readable name
    pub display_name: String,
    /// Placeholder credential; imported users never authenticate with it
    pub password: String,
    /// Role label (imported users get "author")
    pub role: String,
    /// Whether the email address counts as verified
    pub email_verified: bool,
}

/// User record from the store
#[derive(Debug, Clone, FromRow)]
pub struct User {
    /// Unique store ID
    pub id: i64,
    /// Email address
    pub email: String,
    /// Login name
    pub login: String,
    /// Human-readable name
    pub display_name: String,
    /// Role label
    pub role: String,
    /// Whether the email is verified (0 = no, 1 = yes)
    pub email_verified: i32,
}

/// New category to be inserted into the store
#[derive(Debug, Clone)]
pub struct NewCategory {
    /// Display name
    pub name: String,
    /// URL-safe name, unique across categories
    pub slug: String,
}

/// Category record from the store
#[derive(Debug, Clone, FromRow)]
pub struct Category {
    /// Unique store ID
    pub id: i64,
    /// Display name
    pub name: String,
    /// URL-safe name
    pub slug: String,
}

/// New media asset to be inserted into the store
#[derive(Debug, Clone)]
pub struct NewMediaAsset {
    /// File name on disk, unique across assets
    pub file_name: String,
    /// File name as it appeared in the source URL, before decoding
    pub original_name: String,
    /// MIME type of the original file
    pub mime_type: String,
    /// Size of the original file in bytes
    pub size_bytes: i64,
    /// Public URL of the original file
    pub url: String,
    /// Public URL of the small derivative, if one was generated
    pub small_url: Option<String>,
    /// Public URL of the medium derivative, if one was generated
    pub medium_url: Option<String>,
    /// Public URL of the large derivative, if one was generated
    pub large_url: Option<String>,
    /// Pixel width of the original image
    pub width: Option<i64>,
    /// Pixel height of the original image
    pub height: Option<i64>,
}

/// Media asset record from the store
#[derive(Debug, Clone, FromRow)]
pub struct MediaAsset {
    /// Unique store ID
    pub id: i64,
    /// File name on disk
    pub file_name: String,
    /// File name as it appeared in the source URL
    pub original_name: String,
    /// MIME type of the original file
    pub mime_type: String,
    /// Size of the original file in bytes
    pub size_bytes: i64,
    /// Public URL of the original file
    pub url: String,
    /// Public URL of the small derivative
    pub small_url: Option<String>,
    /// Public URL of the medium derivative
    pub medium_url: Option<String>,
    /// Public URL of the large derivative
    pub large_url: Option<String>,
    /// Pixel width of the original image
    pub width: Option<i64>,
    /// Pixel height of the original image
    pub height: Option<i64>,
}

/// New post or page to be inserted into the store
///
/// Pages go through the same pathway as posts; what makes them pages is the
/// synthetic category and marker tags the importer attaches.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Display title
    pub title: String,
    /// URL-safe name, unique across posts
    pub slug: String,
    /// Body HTML
    pub content: String,
    /// Summary HTML
    pub excerpt: Option<String>,
    /// Publication status
    pub status: PostStatus,
    /// User the post belongs to
    pub author_id: TargetId,
    /// Featured image asset, if one resolved
    pub featured_media_id: Option<TargetId>,
    /// Publication instant
    pub published_at: Option<DateTime<Utc>>,
    /// Categories to link, already resolved to store ids
    pub category_ids: Vec<TargetId>,
    /// Tag display names, denormalized onto the post
    pub tags: Vec<String>,
}

/// Post record from the store
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    /// Unique store ID
    pub id: i64,
    /// Display title
    pub title: String,
    /// URL-safe name
    pub slug: String,
    /// Body HTML
    pub content: String,
    /// Summary HTML
    pub excerpt: Option<String>,
    /// Publication status (`draft`, `scheduled`, `published`)
    pub status: String,
    /// User the post belongs to
    pub author_id: i64,
    /// Featured image asset
    pub featured_media_id: Option<i64>,
    /// Publication instant as a unix timestamp
    pub published_at: Option<i64>,
    /// Unix timestamp when the record was created
    pub created_at: i64,
}

/// New comment to be inserted into the store
///
/// Comments are always created top-level; reply threading is restored
/// afterwards via [`ContentStore::set_comment_parent`] once every comment
/// in the batch has an id.
#[derive(Debug, Clone)]
pub struct NewComment {
    /// Post the comment belongs to
    pub post_id: TargetId,
    /// Commenter display name
    pub author_name: String,
    /// Commenter email address
    pub author_email: String,
    /// Comment body
    pub content: String,
    /// Whether the comment was approved in the source
    pub approved: bool,
    /// Original comment instant
    pub created_at: Option<DateTime<Utc>>,
}

/// Comment record from the store
#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    /// Unique store ID
    pub id: i64,
    /// Post the comment belongs to
    pub post_id: i64,
    /// Parent comment for replies, NULL for top-level comments
    pub parent_id: Option<i64>,
    /// Commenter display name
    pub author_name: String,
    /// Commenter email address
    pub author_email: String,
    /// Comment body
    pub content: String,
    /// Moderation status (`approved` or `pending`)
    pub status: String,
    /// Unix timestamp of the original comment instant
    pub created_at: i64,
}

/// Comment moderation status written for approved source comments
pub const COMMENT_APPROVED: &str = "approved";
/// Comment moderation status written for everything else
pub const COMMENT_PENDING: &str = "pending";

/// Storage backend for imported content
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Look up a user by email address
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get a user by ID
    async fn get_user(&self, id: TargetId) -> Result<Option<User>>;

    /// Insert a new user record
    async fn insert_user(&self, user: &NewUser) -> Result<TargetId>;

    /// Look up a category by slug
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// Insert a new category record
    async fn insert_category(&self, category: &NewCategory) -> Result<TargetId>;

    /// Look up a media asset by file name
    async fn get_media_by_file_name(&self, file_name: &str) -> Result<Option<MediaAsset>>;

    /// Get a media asset by ID
    async fn get_media(&self, id: TargetId) -> Result<Option<MediaAsset>>;

    /// Insert a new media asset record
    async fn insert_media(&self, asset: &NewMediaAsset) -> Result<TargetId>;

    /// Look up a post by slug
    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Get a post by ID
    async fn get_post(&self, id: TargetId) -> Result<Option<Post>>;

    /// Insert a new post with its category links and tags
    async fn insert_post(&self, post: &NewPost) -> Result<TargetId>;

    /// Category ids linked to a post
    async fn list_post_categories(&self, post_id: TargetId) -> Result<Vec<i64>>;

    /// Tag display names attached to a post
    async fn list_post_tags(&self, post_id: TargetId) -> Result<Vec<String>>;

    /// Insert a new comment record
    async fn insert_comment(&self, comment: &NewComment) -> Result<TargetId>;

    /// Get a comment by ID
    async fn get_comment(&self, id: TargetId) -> Result<Option<Comment>>;

    /// All comments on a post, oldest first
    async fn list_comments_for_post(&self, post_id: TargetId) -> Result<Vec<Comment>>;

    /// Re-parent a comment under another comment
    async fn set_comment_parent(&self, comment_id: TargetId, parent_id: TargetId) -> Result<()>;
}
