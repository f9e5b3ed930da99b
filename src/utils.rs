//! Utility functions for slugs, URL handling and disk space checks

use std::path::Path;

/// Build a URL-safe slug from arbitrary text
///
/// Lowercases ASCII alphanumerics and collapses every other run of
/// characters (whitespace, punctuation, non-ASCII) into a single hyphen.
/// Leading and trailing hyphens are trimmed. May return an empty string
/// when the input contains no ASCII alphanumerics; callers that need a
/// non-empty key must supply their own fallback.
///
/// # Arguments
///
/// * `input` - The text to slugify (e.g., a category name or post title)
///
/// # Returns
///
/// Returns the slug, possibly empty.
///
/// # Examples
///
/// ```
/// use wxr_import::utils::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  Tech & Gadgets  "), "tech-gadgets");
/// assert_eq!(slugify("Café au lait"), "caf-au-lait");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    // Starts true so leading separators produce no hyphen
    let mut pending_separator = true;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            pending_separator = false;
        } else if !pending_separator {
            slug.push('-');
            pending_separator = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Extract the decoded file name from a URL's final path segment
///
/// Used to derive the natural key of a media asset from its source URL.
/// Query strings and fragments are ignored; percent-encoding is decoded.
///
/// # Arguments
///
/// * `url` - The absolute source URL of the asset
///
/// # Returns
///
/// Returns the file name, or `None` if the URL is unparseable or has no
/// non-empty final path segment.
///
/// # Examples
///
/// ```
/// use wxr_import::utils::file_name_from_url;
///
/// assert_eq!(
///     file_name_from_url("https://old.example.com/uploads/2021/03/photo.jpg?w=300"),
///     Some("photo.jpg".to_string())
/// );
/// assert_eq!(file_name_from_url("https://old.example.com/"), None);
/// ```
#[must_use]
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    let last = segments.next_back()?;
    if last.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(last).ok()?;
    let name = decoded.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Lowercased extension of a file name, without the dot
///
/// # Examples
///
/// ```
/// use wxr_import::utils::file_extension;
///
/// assert_eq!(file_extension("Photo.JPG"), Some("jpg".to_string()));
/// assert_eq!(file_extension("README"), None);
/// ```
#[must_use]
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Get available disk space for a given path
///
/// Uses platform-specific APIs to query filesystem statistics:
/// - Linux: statvfs
/// - macOS: statvfs
/// - Windows: GetDiskFreeSpaceExW
///
/// # Arguments
///
/// * `path` - The path to check (typically the upload root)
///
/// # Returns
///
/// Returns the available disk space in bytes, or an IO error if the check fails.
///
/// # Examples
///
/// ```ignore
/// let available = get_available_space(Path::new("uploads"))?;
/// println!("Available space: {} GB", available / (1024 * 1024 * 1024));
/// ```
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        // Convert path to C string for statvfs call
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        // SAFETY: This is safe because:
        // 1. c_path is a valid, null-terminated C string created from the input path
        // 2. stat is properly initialized with zeroed memory before the call
        // 3. We check the return value and propagate any OS errors
        // 4. The statvfs struct is only read after a successful call
        unsafe {
            let mut stat: libc::statvfs = std::mem::zeroed();
            if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            // Available space = available blocks * block size
            // f_bavail is available blocks for unprivileged users
            // f_frsize is the fragment size (preferred over f_bsize)
            let available_bytes = stat.f_bavail.saturating_mul(stat.f_frsize);
            Ok(available_bytes)
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDiskFreeSpaceExW;

        // Convert path to wide string for Windows API
        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0)) // null terminator
            .collect();

        // SAFETY: This is safe because:
        // 1. wide_path is a valid, null-terminated wide string
        // 2. All output pointers point to valid, properly aligned u64 variables
        // 3. We check the return value and propagate any OS errors
        // 4. The output variables are only read after a successful call
        unsafe {
            let mut free_bytes_available: u64 = 0;
            let mut _total_bytes: u64 = 0;
            let mut _total_free_bytes: u64 = 0;

            if GetDiskFreeSpaceExW(
                wide_path.as_ptr(),
                &mut free_bytes_available as *mut u64 as *mut _,
                &mut _total_bytes as *mut u64 as *mut _,
                &mut _total_free_bytes as *mut u64 as *mut _,
            ) == 0
            {
                return Err(std::io::Error::last_os_error());
            }

            Ok(free_bytes_available)
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        // Unsupported platform - return an error
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Disk space checking is not supported on this platform",
        ))
    }
}
