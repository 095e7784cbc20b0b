//! Filesystem storage for post images.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use slug::slugify;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file is not a recognized image")]
    NotAnImage,
}

/// Filesystem-backed image storage rooted at the configured media directory.
#[derive(Debug)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Initialise storage rooted at the provided directory, creating it if
    /// necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store an uploaded image and return its path relative to the media
    /// root. The payload is sniffed; anything that is not an image is
    /// rejected before touching the disk.
    pub async fn store(&self, original_name: &str, data: Bytes) -> Result<String, ImageStoreError> {
        if data.is_empty() {
            return Err(ImageStoreError::EmptyPayload);
        }
        if imagesize::blob_size(&data).is_err() {
            return Err(ImageStoreError::NotAnImage);
        }

        let stored_path = build_stored_path(original_name);
        let absolute = self.resolve(&stored_path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&absolute, &data).await?;
        Ok(stored_path)
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, ImageStoreError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Reject absolute paths and any traversal outside the media root.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, ImageStoreError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ImageStoreError::InvalidPath);
        }
        Ok(self.root.join(relative))
    }
}

fn build_stored_path(original_name: &str) -> String {
    let (year, month, day) = time::OffsetDateTime::now_utc().to_calendar_date();
    let directory = format!("{year}/{:02}/{:02}", month as u8, day);
    let identifier = Uuid::new_v4();
    let filename = sanitize_filename(original_name);
    format!("{directory}/{identifier}-{filename}")
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
