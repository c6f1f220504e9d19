//! Profile image storage on the local filesystem.
//!
//! All files live flat in one directory and are named `<employeeId>_<sanitized>`.
//! Reads are confined to that directory: a name is rejected before it touches
//! the filesystem if it could address anything else, and the resolved path is
//! checked again after canonicalization.

pub mod handlers;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("invalid image name '{0}'")]
    InvalidName(String),

    #[error("image '{0}' not found")]
    NotFound(String),

    #[error("image I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written by [`ImageStorage::save`].
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub filename: String,
    pub path: PathBuf,
}

/// Diagnostic view of how a requested name resolves.
#[derive(Debug, Serialize)]
pub struct ImagePathReport {
    pub requested_file: String,
    pub full_path: String,
    pub file_exists: bool,
    pub upload_folder: String,
    pub directory_contents: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ImageStorage {
    dir: PathBuf,
    public_base_url: String,
}

impl ImageStorage {
    /// Creates the upload directory if needed and pins its canonical path.
    pub fn new(dir: &Path, public_base_url: impl Into<String>) -> Result<Self, ImageError> {
        std::fs::create_dir_all(dir)?;
        let dir = dir.canonicalize()?;
        info!("Image storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_base_url: public_base_url.into(),
        })
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/images/{}", self.public_base_url, filename)
    }

    /// Writes `bytes` as `<employee_id>_<sanitized original name>`, replacing any
    /// earlier upload with the same name.
    pub async fn save(
        &self,
        employee_id: i64,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredImage, ImageError> {
        let sanitized = sanitize_filename(original_name)
            .ok_or_else(|| ImageError::InvalidName(original_name.to_string()))?;
        let filename = format!("{employee_id}_{sanitized}");
        let path = self.dir.join(&filename);

        tokio::fs::write(&path, bytes).await?;
        info!("Stored image {} ({} bytes)", path.display(), bytes.len());

        Ok(StoredImage { filename, path })
    }

    /// Best-effort removal of a stored image.
    pub async fn remove(&self, filename: &str) {
        if let Ok(path) = self.lexical_path(filename) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Could not remove {}: {e}", path.display());
            }
        }
    }

    /// Resolves `filename` to an existing file inside the storage directory.
    pub async fn resolve(&self, filename: &str) -> Result<PathBuf, ImageError> {
        let candidate = self.lexical_path(filename)?;
        let canonical = match tokio::fs::canonicalize(&candidate).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImageError::NotFound(filename.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        // Symlinks may still point outside.
        if !canonical.starts_with(&self.dir) {
            return Err(ImageError::InvalidName(filename.to_string()));
        }
        if !tokio::fs::metadata(&canonical).await?.is_file() {
            return Err(ImageError::NotFound(filename.to_string()));
        }
        Ok(canonical)
    }

    /// Reads an image and derives its content type from the extension.
    pub async fn read(&self, filename: &str) -> Result<(Vec<u8>, &'static str), ImageError> {
        let path = self.resolve(filename).await?;
        debug!("Serving image {}", path.display());
        let bytes = tokio::fs::read(&path).await?;
        Ok((bytes, content_type_for(filename)))
    }

    pub async fn inspect(&self, filename: &str) -> Result<ImagePathReport, ImageError> {
        let full_path = self.lexical_path(filename)?;
        let file_exists = tokio::fs::metadata(&full_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);

        let directory_contents = if file_exists {
            let mut names = Vec::new();
            let mut entries = tokio::fs::read_dir(&self.dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            names.sort();
            Some(names)
        } else {
            None
        };

        Ok(ImagePathReport {
            requested_file: filename.to_string(),
            full_path: full_path.display().to_string(),
            file_exists,
            upload_folder: self.dir.display().to_string(),
            directory_contents,
        })
    }

    fn lexical_path(&self, filename: &str) -> Result<PathBuf, ImageError> {
        if !is_plain_filename(filename) {
            return Err(ImageError::InvalidName(filename.to_string()));
        }
        Ok(self.dir.join(filename))
    }
}

/// A single path component that cannot climb or address another directory.
/// Inner dots (`a..b.png`) are fine; escapes via symlinks are caught by `resolve`.
fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0', ':'])
}

/// Reduces an uploaded filename to a safe ASCII name, the way werkzeug's
/// `secure_filename` does. Returns `None` if nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let spaced: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("etc_passwd")
        );
        assert_eq!(
            sanitize_filename("My cool photo.png").as_deref(),
            Some("My_cool_photo.png")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\x\\face.jpg").as_deref(),
            Some("C_Users_x_face.jpg")
        );
        assert_eq!(sanitize_filename("résumé.png").as_deref(), Some("rsum.png"));
        assert_eq!(sanitize_filename("../.."), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[test]
    fn test_plain_filename_rules() {
        assert!(is_plain_filename("7_face.png"));
        assert!(!is_plain_filename("../secret"));
        assert!(!is_plain_filename("a/b.png"));
        assert!(!is_plain_filename("..\\b.png"));
        assert!(!is_plain_filename(""));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename("."));
        assert!(is_plain_filename("7_my..photo.png"));
    }

    #[tokio::test]
    async fn test_inner_double_dot_name_round_trips_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ImageStorage::new(dir.path(), "http://x").unwrap();

        let stored = storage.save(7, "my..photo.png", b"img").await.unwrap();
        assert_eq!(stored.filename, "7_my..photo.png");

        let (bytes, content_type) = storage.read(&stored.filename).await.unwrap();
        assert_eq!(bytes, b"img");
        assert_eq!(content_type, "image/png");

        storage.remove(&stored.filename).await;
        assert!(!stored.path.exists());
    }

    #[tokio::test]
    async fn test_save_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ImageStorage::new(dir.path(), "http://localhost:5000").unwrap();

        let stored = storage.save(42, "face photo.PNG", b"\x89PNG").await.unwrap();
        assert_eq!(stored.filename, "42_face_photo.PNG");
        assert_eq!(
            storage.url_for(&stored.filename),
            "http://localhost:5000/images/42_face_photo.PNG"
        );

        let (bytes, content_type) = storage.read(&stored.filename).await.unwrap();
        assert_eq!(bytes, b"\x89PNG");
        assert_eq!(content_type, "image/png");
    }

    #[tokio::test]
    async fn test_read_rejects_escape_and_missing() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "nope").unwrap();
        let storage = ImageStorage::new(&outer.path().join("uploads"), "http://x").unwrap();

        assert!(matches!(
            storage.read("../secret.txt").await,
            Err(ImageError::InvalidName(_))
        ));
        assert!(matches!(
            storage.read("../../etc/passwd").await,
            Err(ImageError::InvalidName(_))
        ));
        assert!(matches!(
            storage.read("missing.png").await,
            Err(ImageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ImageStorage::new(dir.path(), "http://x").unwrap();
        let stored = storage.save(1, "a.png", b"x").await.unwrap();
        storage.remove(&stored.filename).await;
        assert!(!stored.path.exists());
    }

    #[tokio::test]
    async fn test_inspect_lists_directory_when_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ImageStorage::new(dir.path(), "http://x").unwrap();
        storage.save(1, "a.png", b"x").await.unwrap();

        let report = storage.inspect("1_a.png").await.unwrap();
        assert!(report.file_exists);
        assert_eq!(report.directory_contents, Some(vec!["1_a.png".to_string()]));

        let report = storage.inspect("2_b.png").await.unwrap();
        assert!(!report.file_exists);
        assert!(report.directory_contents.is_none());
    }
}
