//! Configuration types for wxr-import

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Filesystem layout for imported media
///
/// Imported assets land under `<root_dir>/<import_subdir>/` on disk and are
/// served under `<public_base>/<import_subdir>/` by the host application.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadConfig {
    /// Root of the upload tree on disk (default: "uploads")
    #[serde(default = "default_upload_root")]
    pub root_dir: PathBuf,

    /// Subdirectory of the upload root reserved for imported assets (default: "imported")
    #[serde(default = "default_import_subdir")]
    pub import_subdir: String,

    /// Public URL prefix the host serves the upload root under (default: "/uploads")
    #[serde(default = "default_public_base")]
    pub public_base: String,
}

impl UploadConfig {
    /// Directory imported assets are written to
    pub fn import_dir(&self) -> PathBuf {
        self.root_dir.join(&self.import_subdir)
    }

    /// Public URL for a file stored in the import directory
    pub fn public_url(&self, file_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base.trim_end_matches('/'),
            self.import_subdir,
            file_name
        )
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root_dir: default_upload_root(),
            import_subdir: default_import_subdir(),
            public_base: default_public_base(),
        }
    }
}

/// Media pipeline configuration (downloads, derivatives, disk space)
///
/// Groups settings for fetching remote attachments and generating resized
/// derivatives. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct MediaConfig {
    /// Maximum concurrent attachment downloads (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Per-request timeout for attachment downloads (default: 30 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// Maximum width of the small derivative in pixels (default: 320)
    #[serde(default = "default_small_max_width")]
    pub small_max_width: u32,

    /// Maximum width of the medium derivative in pixels (default: 768)
    #[serde(default = "default_medium_max_width")]
    pub medium_max_width: u32,

    /// Maximum width of the large derivative in pixels (default: 1280)
    #[serde(default = "default_large_max_width")]
    pub large_max_width: u32,

    /// Retry behavior for transient download failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Disk space admission check
    #[serde(default)]
    pub disk_space: DiskSpaceConfig,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent(),
            download_timeout: default_download_timeout(),
            small_max_width: default_small_max_width(),
            medium_max_width: default_medium_max_width(),
            large_max_width: default_large_max_width(),
            retry: RetryConfig::default(),
            disk_space: DiskSpaceConfig::default(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Disk space admission check configuration
///
/// Before a run is admitted the free space under the upload root is compared
/// against `size_multiplier` times the source file size plus `min_free_space`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DiskSpaceConfig {
    /// Enable the admission check (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum free space to always keep available in bytes (default: 1 GB)
    #[serde(default = "default_min_free_space")]
    pub min_free_space: u64,

    /// Estimated media footprint as a multiple of the source file size (default: 2.5)
    #[serde(default = "default_size_multiplier")]
    pub size_multiplier: f64,
}

impl Default for DiskSpaceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_free_space: default_min_free_space(),
            size_multiplier: default_size_multiplier(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./wxr-import.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration configuration
///
/// Groups settings for external access and control interfaces.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8055)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for the import pipeline
///
/// Fields are organized into logical sub-configs:
/// - [`upload`](UploadConfig): filesystem layout for imported media
/// - [`media`](MediaConfig): download concurrency, timeouts, derivative sizes
/// - [`persistence`](PersistenceConfig): content store database path
/// - [`server`](ServerIntegrationConfig): REST API settings
///
/// Sub-config fields are flattened for serialization so the JSON/TOML format
/// stays flat apart from the explicitly nested groups (retry, disk_space, api).
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Filesystem layout for imported media
    #[serde(flatten)]
    pub upload: UploadConfig,

    /// Media pipeline settings
    #[serde(flatten)]
    pub media: MediaConfig,

    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

// Convenience accessors that delegate to the sub-config structs so call
// sites stay short.
impl Config {
    /// Directory imported assets are written to
    pub fn import_dir(&self) -> PathBuf {
        self.upload.import_dir()
    }

    /// Content store database path
    pub fn database_path(&self) -> &PathBuf {
        &self.persistence.database_path
    }
}

// Default value functions
fn default_upload_root() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_import_subdir() -> String {
    "imported".to_string()
}

fn default_public_base() -> String {
    "/uploads".to_string()
}

fn default_max_concurrent() -> usize {
    4
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_small_max_width() -> u32 {
    320
}

fn default_medium_max_width() -> u32 {
    768
}

fn default_large_max_width() -> u32 {
    1280
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_min_free_space() -> u64 {
    1024 * 1024 * 1024 // 1 GB
}

fn default_size_multiplier() -> f64 {
    2.5
}

fn default_database_path() -> PathBuf {
    PathBuf::from("wxr-import.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8055))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_survives_json_round_trip() {
        let config = Config::default();

        let json = serde_json::to_string(&config).expect("serialize failed");
        let deserialized: Config = serde_json::from_str(&json).expect("deserialize failed");

        assert_eq!(deserialized.upload.root_dir, config.upload.root_dir);
        assert_eq!(
            deserialized.media.max_concurrent_downloads,
            config.media.max_concurrent_downloads
        );
        assert_eq!(
            deserialized.media.download_timeout,
            config.media.download_timeout
        );
        assert_eq!(
            deserialized.persistence.database_path,
            config.persistence.database_path
        );
        assert_eq!(
            deserialized.server.api.bind_address,
            config.server.api.bind_address
        );
    }

    #[test]
    fn empty_json_object_yields_full_defaults() {
        let config: Config = serde_json::from_str("{}").expect("empty object should deserialize");

        assert_eq!(config.upload.root_dir, PathBuf::from("uploads"));
        assert_eq!(config.upload.import_subdir, "imported");
        assert_eq!(config.media.max_concurrent_downloads, 4);
        assert_eq!(config.media.retry.max_attempts, 5);
        assert!(config.media.disk_space.enabled);
        assert_eq!(
            config.persistence.database_path,
            PathBuf::from("wxr-import.db")
        );
        assert!(config.server.api.swagger_ui);
    }

    // --- UploadConfig path building ---

    #[test]
    fn import_dir_joins_root_and_subdir() {
        let upload = UploadConfig::default();
        assert_eq!(upload.import_dir(), PathBuf::from("uploads/imported"));
    }

    #[test]
    fn public_url_joins_base_subdir_and_file() {
        let upload = UploadConfig::default();
        assert_eq!(
            upload.public_url("photo.jpg"),
            "/uploads/imported/photo.jpg"
        );
    }

    #[test]
    fn public_url_tolerates_trailing_slash_on_base() {
        let upload = UploadConfig {
            public_base: "https://cdn.example.com/uploads/".into(),
            ..UploadConfig::default()
        };
        assert_eq!(
            upload.public_url("photo.jpg"),
            "https://cdn.example.com/uploads/imported/photo.jpg"
        );
    }

    // --- Duration fields serialize as integer seconds ---

    #[test]
    fn duration_fields_serialize_as_integer_seconds() {
        let media = MediaConfig::default();
        let json: serde_json::Value = serde_json::to_value(&media).unwrap();

        assert_eq!(
            json["download_timeout"], 30,
            "download_timeout should serialize as plain seconds"
        );
        assert_eq!(json["retry"]["initial_delay"], 1);
        assert_eq!(json["retry"]["max_delay"], 60);
    }

    #[test]
    fn duration_fields_deserialize_from_integer_seconds() {
        let media: MediaConfig =
            serde_json::from_str(r#"{"download_timeout": 5}"#).expect("deserialize failed");
        assert_eq!(media.download_timeout, Duration::from_secs(5));
    }

    #[test]
    fn duration_field_rejects_string_value() {
        let result = serde_json::from_str::<MediaConfig>(r#"{"download_timeout": "5s"}"#);
        assert!(
            result.is_err(),
            "string durations are not accepted; values are integer seconds"
        );
    }

    #[test]
    fn duration_field_rejects_negative_value() {
        let result = serde_json::from_str::<MediaConfig>(r#"{"download_timeout": -5}"#);
        assert!(result.is_err(), "negative seconds must be rejected");
    }

    // --- Sub-config defaults ---

    #[test]
    fn retry_config_defaults_match_documented_values() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_delay, Duration::from_secs(1));
        assert_eq!(retry.max_delay, Duration::from_secs(60));
        assert!((retry.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert!(retry.jitter);
    }

    #[test]
    fn disk_space_defaults_match_documented_values() {
        let disk = DiskSpaceConfig::default();
        assert!(disk.enabled);
        assert_eq!(disk.min_free_space, 1024 * 1024 * 1024);
        assert!((disk.size_multiplier - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn api_config_defaults_match_documented_values() {
        let api = ApiConfig::default();
        assert_eq!(api.bind_address, SocketAddr::from(([127, 0, 0, 1], 8055)));
        assert!(api.cors_enabled);
        assert_eq!(api.cors_origins, vec!["*".to_string()]);
        assert!(api.swagger_ui);
    }

    #[test]
    fn derivative_widths_are_strictly_increasing_by_default() {
        let media = MediaConfig::default();
        assert!(media.small_max_width < media.medium_max_width);
        assert!(media.medium_max_width < media.large_max_width);
    }
}
