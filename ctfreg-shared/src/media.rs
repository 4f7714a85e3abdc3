/// Storage for uploaded team images
///
/// Uploads are checked by content (not by file name or declared content
/// type) and written below the media root under a generated name. The team
/// record only stores the path relative to the media root.

use bytes::Bytes;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Directory below the media root holding team images
pub const TEAM_IMAGE_DIR: &str = "team-images";

/// Default upload limit (2 MiB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Media error types
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Failed to write media file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove media file {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file as received from the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// File name claimed by the client, informational only
    pub file_name: Option<String>,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name,
            data: data.into(),
        }
    }
}

/// Why an upload was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageRejection {
    #[error("The submitted file is empty.")]
    Empty,

    #[error("Ensure this file has at most {max} bytes (it has {actual}).")]
    TooLarge { max: usize, actual: usize },

    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    NotAnImage,
}

/// Sniffs the image format and returns the file extension to store it under
///
/// Accepts PNG, JPEG, GIF and WebP.
pub fn check_image(upload: &ImageUpload, max_bytes: usize) -> Result<&'static str, ImageRejection> {
    if upload.data.is_empty() {
        return Err(ImageRejection::Empty);
    }
    if upload.data.len() > max_bytes {
        return Err(ImageRejection::TooLarge {
            max: max_bytes,
            actual: upload.data.len(),
        });
    }

    match image::guess_format(&upload.data) {
        Ok(ImageFormat::Png) => Ok("png"),
        Ok(ImageFormat::Jpeg) => Ok("jpg"),
        Ok(ImageFormat::Gif) => Ok("gif"),
        Ok(ImageFormat::WebP) => Ok("webp"),
        _ => Err(ImageRejection::NotAnImage),
    }
}

/// Relative path of a team image below the media root
pub fn team_image_path(id: Uuid, extension: &str) -> String {
    format!("{}/{}.{}", TEAM_IMAGE_DIR, id, extension)
}

/// Media files on the local filesystem
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    max_image_bytes: usize,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, max_image_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_image_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Absolute location of a stored relative path
    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Writes `data` to `relative` below the media root
    pub async fn store(&self, relative: &str, data: &[u8]) -> Result<(), MediaError> {
        let path = self.path_of(relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| MediaError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|source| MediaError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), bytes = data.len(), "Stored media file");
        Ok(())
    }

    /// Deletes `relative` below the media root; a missing file is not an error
    pub async fn remove(&self, relative: &str) -> Result<(), MediaError> {
        let path = self.path_of(relative);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed media file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MediaError::Remove { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_check_image_formats() {
        let png = ImageUpload::new(Some("logo.png".to_string()), PNG_HEADER.to_vec());
        assert_eq!(check_image(&png, 1024), Ok("png"));

        let jpeg = ImageUpload::new(None, b"\xFF\xD8\xFF\xE0\0\x10JFIF".to_vec());
        assert_eq!(check_image(&jpeg, 1024), Ok("jpg"));

        let gif = ImageUpload::new(None, b"GIF89a\x01\0\x01\0".to_vec());
        assert_eq!(check_image(&gif, 1024), Ok("gif"));
    }

    #[test]
    fn test_check_image_rejections() {
        let text = ImageUpload::new(Some("logo.png".to_string()), b"not an image".to_vec());
        assert_eq!(check_image(&text, 1024), Err(ImageRejection::NotAnImage));

        let empty = ImageUpload::new(None, Vec::new());
        assert_eq!(check_image(&empty, 1024), Err(ImageRejection::Empty));

        let big = ImageUpload::new(None, PNG_HEADER.to_vec());
        assert_eq!(
            check_image(&big, 4),
            Err(ImageRejection::TooLarge {
                max: 4,
                actual: PNG_HEADER.len()
            })
        );
    }

    #[test]
    fn test_team_image_path() {
        let id = Uuid::new_v4();
        assert_eq!(team_image_path(id, "png"), format!("team-images/{}.png", id));
    }

    #[tokio::test]
    async fn test_store_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(dir.path(), DEFAULT_MAX_IMAGE_BYTES);

        media.store("team-images/a.png", PNG_HEADER).await.unwrap();

        let written = std::fs::read(dir.path().join("team-images/a.png")).unwrap();
        assert_eq!(written, PNG_HEADER);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStorage::new(dir.path(), DEFAULT_MAX_IMAGE_BYTES);
        media.store("team-images/a.png", PNG_HEADER).await.unwrap();

        media.remove("team-images/a.png").await.unwrap();
        assert!(!dir.path().join("team-images/a.png").exists());

        media.remove("team-images/a.png").await.unwrap();
    }
}
