//! SQLite content store backend.

use std::path::Path;

use async_trait::async_trait;
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;

use super::{
    COMMENT_APPROVED, COMMENT_PENDING, Category, Comment, ContentStore, MediaAsset, NewCategory,
    NewComment, NewMediaAsset, NewPost, NewUser, Post, User,
};
use crate::error::{Result, StoreError};
use crate::types::TargetId;

/// Content store backed by SQLite
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a content store at the given path
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create database directory: {}", e))
            })?;
        }

        // Connect with foreign key enforcement and WAL mode
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to parse database path: {}", e))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to connect to database: {}", e))
        })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Every post row, ordered by id
    ///
    /// Content slugs carry a per-run suffix, so tests locate posts by
    /// scanning the table instead of guessing slugs.
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, slug, content, excerpt, status, author_id,
                   featured_media_id, published_at, created_at
            FROM posts
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to list posts: {}", e)))?;

        Ok(rows)
    }

    /// Run schema migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to acquire connection: {}", e))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create schema_version table: {}", e))
        })?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    StoreError::QueryFailed(format!("Failed to query schema version: {}", e))
                })?;

        if current_version.unwrap_or(0) < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: Create initial schema
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying content store migration v1");

        // Wrap migration in a transaction so partial failures don't leave the
        // store in a broken state
        sqlx::query("BEGIN").execute(&mut *conn).await.map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to begin transaction: {}", e))
        })?;

        let result = async {
            Self::create_users_schema(conn).await?;
            Self::create_categories_schema(conn).await?;
            Self::create_media_schema(conn).await?;
            Self::create_posts_schema(conn).await?;
            Self::create_comments_schema(conn).await?;
            Self::record_migration(conn, 1).await?;
            Ok::<(), crate::error::Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await.map_err(|e| {
                    StoreError::MigrationFailed(format!("Failed to commit migration v1: {}", e))
                })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!("Content store migration v1 complete");
        Ok(())
    }

    async fn create_users_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                login TEXT NOT NULL,
                display_name TEXT NOT NULL,
                password TEXT NOT NULL,
                role TEXT NOT NULL,
                email_verified INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create users table: {}", e))
        })?;

        Ok(())
    }

    async fn create_categories_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create categories table: {}", e))
        })?;

        Ok(())
    }

    async fn create_media_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE media_assets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_name TEXT NOT NULL UNIQUE,
                original_name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                url TEXT NOT NULL,
                small_url TEXT,
                medium_url TEXT,
                large_url TEXT,
                width INTEGER,
                height INTEGER,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create media_assets table: {}", e))
        })?;

        Ok(())
    }

    async fn create_posts_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                excerpt TEXT,
                status TEXT NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users(id),
                featured_media_id INTEGER REFERENCES media_assets(id),
                published_at INTEGER,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create posts table: {}", e))
        })?;

        sqlx::query("CREATE INDEX idx_posts_status ON posts(status)")
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("Failed to create index: {}", e)))?;

        sqlx::query("CREATE INDEX idx_posts_author ON posts(author_id)")
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("Failed to create index: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE post_categories (
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, category_id)
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create post_categories table: {}", e))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE post_tags (
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                PRIMARY KEY (post_id, name)
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create post_tags table: {}", e))
        })?;

        Ok(())
    }

    async fn create_comments_schema(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                parent_id INTEGER REFERENCES comments(id),
                author_name TEXT NOT NULL,
                author_email TEXT NOT NULL,
                content TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to create comments table: {}", e))
        })?;

        sqlx::query("CREATE INDEX idx_comments_post ON comments(post_id)")
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("Failed to create index: {}", e)))?;

        Ok(())
    }

    async fn record_migration(conn: &mut SqliteConnection, version: i64) -> Result<()> {
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                StoreError::MigrationFailed(format!("Failed to record migration: {}", e))
            })?;

        Ok(())
    }
}

/// Map an insert error, distinguishing natural-key collisions
fn insert_error(what: &str, e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::ConstraintViolation(format!("{} already exists: {}", what, e))
        }
        _ => StoreError::QueryFailed(format!("Failed to insert {}: {}", what, e)),
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, login, display_name, role, email_verified
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to get user by email: {}", e)))?;

        Ok(row)
    }

    async fn get_user(&self, id: TargetId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, login, display_name, role, email_verified
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to get user: {}", e)))?;

        Ok(row)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<TargetId> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, login, display_name, password, role, email_verified, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.display_name)
        .bind(&user.password)
        .bind(&user.role)
        .bind(user.email_verified)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error("user", e))?;

        Ok(TargetId(result.last_insert_rowid()))
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM categories WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to get category by slug: {}", e)))?;

        Ok(row)
    }

    async fn insert_category(&self, category: &NewCategory) -> Result<TargetId> {
        let result = sqlx::query(
            "INSERT INTO categories (name, slug, created_at) VALUES (?, ?, ?)",
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error("category", e))?;

        Ok(TargetId(result.last_insert_rowid()))
    }

    async fn get_media_by_file_name(&self, file_name: &str) -> Result<Option<MediaAsset>> {
        let row = sqlx::query_as::<_, MediaAsset>(
            r#"
            SELECT id, file_name, original_name, mime_type, size_bytes,
                   url, small_url, medium_url, large_url, width, height
            FROM media_assets
            WHERE file_name = ?
            "#,
        )
        .bind(file_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            StoreError::QueryFailed(format!("Failed to get media by file name: {}", e))
        })?;

        Ok(row)
    }

    async fn get_media(&self, id: TargetId) -> Result<Option<MediaAsset>> {
        let row = sqlx::query_as::<_, MediaAsset>(
            r#"
            SELECT id, file_name, original_name, mime_type, size_bytes,
                   url, small_url, medium_url, large_url, width, height
            FROM media_assets
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to get media: {}", e)))?;

        Ok(row)
    }

    async fn insert_media(&self, asset: &NewMediaAsset) -> Result<TargetId> {
        let result = sqlx::query(
            r#"
            INSERT INTO media_assets (
                file_name, original_name, mime_type, size_bytes, url,
                small_url, medium_url, large_url, width, height, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&asset.file_name)
        .bind(&asset.original_name)
        .bind(&asset.mime_type)
        .bind(asset.size_bytes)
        .bind(&asset.url)
        .bind(&asset.small_url)
        .bind(&asset.medium_url)
        .bind(&asset.large_url)
        .bind(asset.width)
        .bind(asset.height)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error("media asset", e))?;

        Ok(TargetId(result.last_insert_rowid()))
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, slug, content, excerpt, status, author_id,
                   featured_media_id, published_at, created_at
            FROM posts
            WHERE slug = ?
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to get post by slug: {}", e)))?;

        Ok(row)
    }

    async fn get_post(&self, id: TargetId) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, slug, content, excerpt, status, author_id,
                   featured_media_id, published_at, created_at
            FROM posts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to get post: {}", e)))?;

        Ok(row)
    }

    async fn insert_post(&self, post: &NewPost) -> Result<TargetId> {
        // Post row, category links and tags land together or not at all
        let mut tx = self.pool.begin().await.map_err(|e| {
            StoreError::QueryFailed(format!("Failed to begin transaction: {}", e))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO posts (
                title, slug, content, excerpt, status, author_id,
                featured_media_id, published_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(post.status.as_str())
        .bind(post.author_id)
        .bind(post.featured_media_id)
        .bind(post.published_at.map(|at| at.timestamp()))
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_error("post", e))?;

        let post_id = result.last_insert_rowid();

        for category_id in &post.category_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?, ?)",
            )
            .bind(post_id)
            .bind(*category_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                StoreError::QueryFailed(format!("Failed to link post category: {}", e))
            })?;
        }

        for tag in &post.tags {
            sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, name) VALUES (?, ?)")
                .bind(post_id)
                .bind(tag)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("Failed to attach tag: {}", e)))?;
        }

        tx.commit().await.map_err(|e| {
            StoreError::QueryFailed(format!("Failed to commit post insert: {}", e))
        })?;

        Ok(TargetId(post_id))
    }

    async fn list_post_categories(&self, post_id: TargetId) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT category_id FROM post_categories WHERE post_id = ? ORDER BY category_id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to list post categories: {}", e)))?;

        Ok(ids)
    }

    async fn list_post_tags(&self, post_id: TargetId) -> Result<Vec<String>> {
        let tags: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM post_tags WHERE post_id = ? ORDER BY name",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to list post tags: {}", e)))?;

        Ok(tags)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<TargetId> {
        let status = if comment.approved {
            COMMENT_APPROVED
        } else {
            COMMENT_PENDING
        };
        let created_at = comment
            .created_at
            .map(|at| at.timestamp())
            .unwrap_or_else(|| chrono::Utc::now().timestamp());

        let result = sqlx::query(
            r#"
            INSERT INTO comments (post_id, parent_id, author_name, author_email, content, status, created_at)
            VALUES (?, NULL, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.post_id)
        .bind(&comment.author_name)
        .bind(&comment.author_email)
        .bind(&comment.content)
        .bind(status)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error("comment", e))?;

        Ok(TargetId(result.last_insert_rowid()))
    }

    async fn get_comment(&self, id: TargetId) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, parent_id, author_name, author_email, content, status, created_at
            FROM comments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Failed to get comment: {}", e)))?;

        Ok(row)
    }

    async fn list_comments_for_post(&self, post_id: TargetId) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, parent_id, author_name, author_email, content, status, created_at
            FROM comments
            WHERE post_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            StoreError::QueryFailed(format!("Failed to list comments for post: {}", e))
        })?;

        Ok(rows)
    }

    async fn set_comment_parent(&self, comment_id: TargetId, parent_id: TargetId) -> Result<()> {
        let result = sqlx::query("UPDATE comments SET parent_id = ? WHERE id = ?")
            .bind(parent_id)
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                StoreError::QueryFailed(format!("Failed to set comment parent: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("comment {} not found", comment_id)).into());
        }

        Ok(())
    }
}
