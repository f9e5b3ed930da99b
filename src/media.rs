//! Media download and derivative generation
//!
//! Attachments import in three steps: stream the original file from its
//! source URL into the upload directory, decode it to probe dimensions, and
//! generate up to three resized derivatives (small, medium, large). An image
//! narrower than a derivative's target width does not get that derivative;
//! nothing is ever upscaled past the source resolution.
//!
//! Downloads retry per the configured retry policy. Whatever the failure,
//! files written so far are removed, so a failed attachment leaves no
//! partial files behind.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::{MediaConfig, UploadConfig};
use crate::error::{Error, MediaError, Result};
use crate::retry::fetch_with_retry;
use crate::store::NewMediaAsset;
use crate::utils::file_extension;

/// Derivative sizes generated for imported images
const DERIVATIVE_LABELS: [&str; 3] = ["small", "medium", "large"];

/// MIME type for an importable image extension, `None` for everything else
///
/// This doubles as the import filter: attachments whose extension is not
/// listed here are skipped by the media phase.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Downloads attachment originals and produces stored assets with derivatives
pub struct MediaPipeline {
    client: reqwest::Client,
    upload: UploadConfig,
    media: MediaConfig,
}

impl MediaPipeline {
    /// Create a pipeline with its own HTTP client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new(upload: UploadConfig, media: MediaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(media.download_timeout)
            .user_agent(concat!("wxr-import/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            upload,
            media,
        })
    }

    /// Create the import upload directory if it doesn't exist
    pub async fn ensure_import_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.upload.import_dir()).await?;
        Ok(())
    }

    /// Fetch one attachment and build the asset record to persist
    ///
    /// `file_name` is the basename the caller derived from the URL; it is the
    /// asset's natural key and its name on disk. The returned record carries
    /// public URLs for the original and each generated derivative.
    pub async fn fetch_asset(&self, url: &str, file_name: &str) -> Result<NewMediaAsset> {
        let extension = file_extension(file_name).unwrap_or_default();
        let mime_type = mime_for_extension(&extension).ok_or_else(|| MediaError::UnsupportedType {
            url: url.to_string(),
            mime: extension.clone(),
        })?;

        let original_path = self.upload.import_dir().join(file_name);
        let mut cleanup = PartialCleanup::new();
        cleanup.track(&original_path);

        let size_bytes = fetch_with_retry(&self.media.retry, || {
            self.download_to(url, &original_path)
        })
        .await?;

        let image = image::open(&original_path).map_err(|e| MediaError::Decode {
            path: original_path.clone(),
            reason: e.to_string(),
        })?;
        let (width, height) = (image.width(), image.height());
        debug!(file_name = %file_name, width = %width, height = %height, "Decoded original image");

        let mut derivative_urls: [Option<String>; 3] = [None, None, None];
        let targets = [
            self.media.small_max_width,
            self.media.medium_max_width,
            self.media.large_max_width,
        ];
        for (index, (label, target_width)) in
            DERIVATIVE_LABELS.iter().zip(targets).enumerate()
        {
            if width <= target_width {
                debug!(
                    file_name = %file_name,
                    label = %label,
                    "Source narrower than derivative target, not generating"
                );
                continue;
            }
            let derivative_name = derivative_file_name(file_name, label);
            let derivative_path = self.upload.import_dir().join(&derivative_name);
            cleanup.track(&derivative_path);

            let resized = image.resize(target_width, u32::MAX, image::imageops::FilterType::Lanczos3);
            resized.save(&derivative_path).map_err(|e| MediaError::WriteFailed {
                path: derivative_path.clone(),
                reason: e.to_string(),
            })?;

            derivative_urls[index] = Some(self.upload.public_url(&derivative_name));
        }

        cleanup.disarm();
        let [small_url, medium_url, large_url] = derivative_urls;

        Ok(NewMediaAsset {
            file_name: file_name.to_string(),
            original_name: raw_url_basename(url).unwrap_or_else(|| file_name.to_string()),
            mime_type: mime_type.to_string(),
            size_bytes: i64::try_from(size_bytes).unwrap_or(i64::MAX),
            url: self.upload.public_url(file_name),
            small_url,
            medium_url,
            large_url,
            width: Some(i64::from(width)),
            height: Some(i64::from(height)),
        })
    }

    /// One download attempt: stream the response body to disk
    ///
    /// Returns the number of bytes written.
    async fn download_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut cleanup = PartialCleanup::new();
        cleanup.track(dest);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(MediaError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status().as_u16()),
            }
            .into());
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| MediaError::WriteFailed {
                path: dest.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::Fetch {
                url: url.to_string(),
                reason: format!("transfer interrupted: {}", e),
            })?;
            written += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| MediaError::WriteFailed {
                    path: dest.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }

        file.flush().await.map_err(|e| MediaError::WriteFailed {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;

        cleanup.disarm();
        Ok(written)
    }
}

/// Undecoded final path segment of a source URL
///
/// The asset keeps the name exactly as the export referenced it, while
/// `file_name` is the decoded form used on disk.
fn raw_url_basename(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}

/// Derivative file name: `header.jpg` + `small` -> `header-small.jpg`
fn derivative_file_name(file_name: &str, label: &str) -> String {
    let path = Path::new(file_name);
    match (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) {
        (Some(stem), Some(ext)) => format!("{}-{}.{}", stem, label, ext),
        _ => format!("{}-{}", file_name, label),
    }
}

/// Removes tracked files on drop unless disarmed
///
/// Armed for the whole of a fetch, including across await points, so a
/// failure or a cancellation mid-transfer never leaves partial files behind.
struct PartialCleanup {
    files: Vec<PathBuf>,
    armed: bool,
}

impl PartialCleanup {
    fn new() -> Self {
        Self {
            files: Vec::new(),
            armed: true,
        }
    }

    fn track(&mut self, path: &Path) {
        self.files.push(path.to_path_buf());
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialCleanup {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for path in &self.files {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove partial file");
                } else {
                    debug!(path = %path.display(), "Removed partial file");
                }
            }
        }
    }
}
