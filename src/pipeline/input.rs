//! Input resolution: turn a user-supplied path or URL into an in-memory file.
//!
//! Images are small enough to hold in memory, and the decoder works on byte
//! slices, so a download goes straight into a `Vec<u8>`.

use crate::error::ImgConvError;
use std::path::Path;
use tracing::{debug, info};

/// One input image: its file name and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// The file name with its last extension removed.
    ///
    /// A name without a dot (or a dot-file such as `.png`) is kept whole.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

/// Strip the last `.ext` from a file name.
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory source file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceFile, ImgConvError> {
    if input.trim().is_empty() {
        return Err(ImgConvError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local file.
async fn read_local(path: &Path) -> Result<SourceFile, ImgConvError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ImgConvError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ImgConvError::PermissionDenied {
            path: path.to_path_buf(),
        },
        // Directories and other unreadable entries.
        _ => ImgConvError::InvalidInput {
            input: path.display().to_string(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read local image {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceFile { name, bytes })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceFile, ImgConvError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ImgConvError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ImgConvError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ImgConvError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ImgConvError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ImgConvError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes from {}", bytes.len(), url);

    Ok(SourceFile {
        name: filename_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Extract a file name from the last URL path segment.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "image".to_string()
}

/// Resolve every input, in order. The first failure aborts.
pub async fn resolve_inputs<I, S>(inputs: I, timeout_secs: u64) -> Result<Vec<SourceFile>, ImgConvError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut files = Vec::new();
    for input in inputs {
        files.push(resolve_input(input.as_ref(), timeout_secs).await?);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/cat.png"));
        assert!(is_url("http://example.com/cat.png"));
        assert!(!is_url("/tmp/cat.png"));
        assert!(!is_url("cat.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn base_name_strips_last_extension_only() {
        assert_eq!(base_name("photo.png"), "photo");
        assert_eq!(base_name("archive.tar.gz"), "archive.tar");
        assert_eq!(base_name("noext"), "noext");
        assert_eq!(base_name(".png"), ".png");
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://example.com/a/b/icon.webp"), "icon.webp");
        assert_eq!(filename_from_url("https://example.com/"), "image");
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = resolve_input("/definitely/not/a/real/image.png", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ImgConvError::FileNotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn directory_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_input(dir.path().to_str().unwrap(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ImgConvError::InvalidInput { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let file = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(file.name, "pixel.png");
        assert_eq!(file.base_name(), "pixel");
        assert_eq!(file.bytes, b"not really a png");
    }
}
