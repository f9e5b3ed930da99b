//! Core types for wxr-import

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Identifier of an entity in the target content store
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TargetId(pub i64);

impl TargetId {
    /// Create a new TargetId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TargetId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TargetId> for i64 {
    fn from(id: TargetId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for TargetId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl PartialEq<TargetId> for i64 {
    fn eq(&self, other: &TargetId) -> bool {
        *self == other.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TargetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for TargetId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TargetId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TargetId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Lifecycle state of an import job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Import is currently running
    Running,
    /// Import finished and every phase ran to the end
    Completed,
    /// Import aborted with a fatal error
    Failed,
    /// Import was stopped by a cancel request
    Cancelled,
}

impl JobState {
    /// Stable string form used in logs and API payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    /// Whether the job has reached a final state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sequential phases of an import run
///
/// The order matters: later phases resolve references against entities
/// created by earlier ones (posts need authors, categories and media;
/// comments need posts and pages; linking needs comments).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    /// Create users from channel-level author declarations
    Authors,
    /// Create categories from channel-level taxonomy
    Categories,
    /// Register tag slug to display-name mappings
    Tags,
    /// Download attachments and generate derivatives
    Media,
    /// Create posts
    Posts,
    /// Create pages
    Pages,
    /// Create comments, parents unresolved
    Comments,
    /// Rewire comment parent references
    Linking,
}

impl ImportPhase {
    /// Stable string form used in logs and events
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportPhase::Authors => "authors",
            ImportPhase::Categories => "categories",
            ImportPhase::Tags => "tags",
            ImportPhase::Media => "media",
            ImportPhase::Posts => "posts",
            ImportPhase::Pages => "pages",
            ImportPhase::Comments => "comments",
            ImportPhase::Linking => "linking",
        }
    }
}

impl std::fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publication status of a post in the target store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Not yet published
    #[default]
    Draft,
    /// Publication scheduled for a future date
    Scheduled,
    /// Publicly visible
    Published,
}

impl PostStatus {
    /// Map a WordPress status string onto the target vocabulary
    ///
    /// Unknown statuses (e.g. "pending", "trash") degrade to [`PostStatus::Draft`]
    /// so the record is preserved rather than rejected.
    pub fn from_source(status: &str) -> Self {
        match status {
            "draft" => PostStatus::Draft,
            "future" => PostStatus::Scheduled,
            "publish" | "private" => PostStatus::Published,
            _ => PostStatus::Draft,
        }
    }

    /// Stable string form stored in the content store
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Scheduled => "scheduled",
            PostStatus::Published => "published",
        }
    }
}

/// The kind of record being imported, used in events and per-record logs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Channel-level author declaration
    Author,
    /// Channel-level category declaration
    Category,
    /// Channel-level tag declaration
    Tag,
    /// Attachment item
    Media,
    /// Post item
    Post,
    /// Page item
    Page,
    /// Comment nested under an item
    Comment,
}

impl RecordKind {
    /// Stable string form used in logs and events
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Author => "author",
            RecordKind::Category => "category",
            RecordKind::Tag => "tag",
            RecordKind::Media => "media",
            RecordKind::Post => "post",
            RecordKind::Page => "page",
            RecordKind::Comment => "comment",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-kind outcome counters for one import run
///
/// `imported + skipped + failed` never exceeds `total`; records the run
/// never reached (cancellation, fatal abort) stay unaccounted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportCounts {
    /// Number of records of this kind found in the source document
    pub total: u64,
    /// Records newly created in the target store
    pub imported: u64,
    /// Records skipped because they already existed or are not importable
    pub skipped: u64,
    /// Records whose creation failed
    pub failed: u64,
}

impl ImportCounts {
    /// Sum of records that reached a per-record outcome
    pub fn accounted(&self) -> u64 {
        self.imported + self.skipped + self.failed
    }
}

/// Outcome counters for every record kind in one import run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportStats {
    /// Author records
    pub authors: ImportCounts,
    /// Category records
    pub categories: ImportCounts,
    /// Tag records
    pub tags: ImportCounts,
    /// Attachment records
    pub media: ImportCounts,
    /// Post records
    pub posts: ImportCounts,
    /// Page records
    pub pages: ImportCounts,
    /// Comment records
    pub comments: ImportCounts,
}

impl ImportStats {
    /// Borrow the counters for one record kind
    pub fn for_kind(&self, kind: RecordKind) -> &ImportCounts {
        match kind {
            RecordKind::Author => &self.authors,
            RecordKind::Category => &self.categories,
            RecordKind::Tag => &self.tags,
            RecordKind::Media => &self.media,
            RecordKind::Post => &self.posts,
            RecordKind::Page => &self.pages,
            RecordKind::Comment => &self.comments,
        }
    }

    /// Mutably borrow the counters for one record kind
    pub fn for_kind_mut(&mut self, kind: RecordKind) -> &mut ImportCounts {
        match kind {
            RecordKind::Author => &mut self.authors,
            RecordKind::Category => &mut self.categories,
            RecordKind::Tag => &mut self.tags,
            RecordKind::Media => &mut self.media,
            RecordKind::Post => &mut self.posts,
            RecordKind::Page => &mut self.pages,
            RecordKind::Comment => &mut self.comments,
        }
    }

    /// Aggregate counters across every record kind
    pub fn combined(&self) -> ImportCounts {
        let mut combined = ImportCounts::default();
        for kind in [
            RecordKind::Author,
            RecordKind::Category,
            RecordKind::Tag,
            RecordKind::Media,
            RecordKind::Post,
            RecordKind::Page,
            RecordKind::Comment,
        ] {
            let counts = self.for_kind(kind);
            combined.total += counts.total;
            combined.imported += counts.imported;
            combined.skipped += counts.skipped;
            combined.failed += counts.failed;
        }
        combined
    }
}

/// Snapshot of the current or most recent import job
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
    /// Current lifecycle state
    pub state: JobState,

    /// Who triggered the import
    pub initiator: String,

    /// Path of the WXR source file the job was started with
    pub source_path: PathBuf,

    /// When the job was admitted
    pub started_at: DateTime<Utc>,

    /// When the job reached a terminal state (None while running)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    /// Outcome counters observed so far
    pub stats: ImportStats,

    /// Terminal error message (set for Failed and Cancelled jobs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Record counts produced by a preview run
///
/// A preview parses the document and counts what an import would process.
/// It creates nothing, downloads nothing and leaves the source file in place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PreviewCounts {
    /// Channel-level author declarations
    pub authors: u64,
    /// Channel-level category declarations
    pub categories: u64,
    /// Channel-level tag declarations
    pub tags: u64,
    /// Attachment items (all types, importable or not)
    pub attachments: u64,
    /// Post items
    pub posts: u64,
    /// Page items
    pub pages: u64,
    /// Comments across all items
    pub comments: u64,
}

/// Event emitted during the import lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// An import job was admitted and its run started
    ImportStarted {
        /// Who triggered the import
        initiator: String,
        /// Path of the WXR source file
        source_path: PathBuf,
    },

    /// A phase began processing its records
    PhaseStarted {
        /// Which phase
        phase: ImportPhase,
    },

    /// A phase finished processing its records
    PhaseCompleted {
        /// Which phase
        phase: ImportPhase,
    },

    /// A single record failed; the run continues
    RecordFailed {
        /// Kind of the failing record
        kind: RecordKind,
        /// Natural key or source identifier of the record
        key: String,
        /// Error message
        error: String,
    },

    /// The run finished with every phase complete
    ImportCompleted {
        /// Final outcome counters
        stats: ImportStats,
    },

    /// The run aborted with a fatal error
    ImportFailed {
        /// Error message
        error: String,
    },

    /// The run stopped in response to a cancel request
    ImportCancelled {
        /// Who requested the cancellation
        initiator: String,
    },
}
