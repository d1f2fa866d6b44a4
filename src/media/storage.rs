use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("invalid path segment: {0}")]
    InvalidSegment(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Upload storage rooted at `{data_dir}/uploads`.
///
/// Writes follow a stage-then-promote saga: bytes land in a staging
/// directory first, the database row committing the final relative path
/// comes second, and the staged file is renamed into place only after
/// the commit. A database failure just discards the staged file, so no
/// half-written upload is ever visible under `uploads/`.
pub struct MediaStorage {
    base_path: PathBuf,
    staging_path: PathBuf,
}

/// A staged upload awaiting promotion or discard.
pub struct StagedFile {
    path: PathBuf,
}

impl MediaStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("uploads"),
            staging_path: data_dir.join("staging"),
        }
    }

    /// Review photos: `{brewery}/{beer}/{review_id}-{position}.webp`.
    pub fn review_photo_path(
        brewery: &str,
        beer: &str,
        review_id: &str,
        position: i64,
    ) -> Result<String, MediaStorageError> {
        let brewery = sanitize_segment(brewery)?;
        let beer = sanitize_segment(beer)?;
        Ok(format!("{brewery}/{beer}/{review_id}-{position}.webp"))
    }

    /// Beer covers: `{brewery}/{beer}/{beer}-CoverImage-{timestamp}.{ext}`.
    pub fn beer_cover_path(
        brewery: &str,
        beer: &str,
        timestamp_millis: i64,
        ext: &str,
    ) -> Result<String, MediaStorageError> {
        let brewery = sanitize_segment(brewery)?;
        let beer = sanitize_segment(beer)?;
        Ok(format!(
            "{brewery}/{beer}/{beer}-CoverImage-{timestamp_millis}.{ext}"
        ))
    }

    /// Brewery covers and avatars use a flat `{timestamp}.{ext}` name.
    #[must_use]
    pub fn flat_path(timestamp_millis: i64, ext: &str) -> String {
        format!("{timestamp_millis}.{ext}")
    }

    #[must_use]
    pub fn absolute(&self, rel_path: &str) -> PathBuf {
        self.base_path.join(rel_path)
    }

    /// Writes bytes to a staging file. Nothing under `uploads/` changes.
    pub async fn stage(&self, data: &[u8]) -> Result<StagedFile, MediaStorageError> {
        fs::create_dir_all(&self.staging_path).await?;

        let path = self.staging_path.join(Uuid::new_v4().to_string());
        let mut file = File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        Ok(StagedFile { path })
    }

    /// Moves a staged file to its final relative path under `uploads/`.
    pub async fn promote(
        &self,
        staged: StagedFile,
        rel_path: &str,
    ) -> Result<(), MediaStorageError> {
        let final_path = self.base_path.join(rel_path);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&staged.path, &final_path).await?;
        Ok(())
    }

    /// Removes a staged file that will not be promoted. Failures are
    /// logged; there is nothing useful a caller could do with them.
    pub async fn discard(&self, staged: StagedFile) {
        if let Err(e) = fs::remove_file(&staged.path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("Failed to discard staged file {}: {e}", staged.path.display());
            }
        }
    }

    pub async fn delete(&self, rel_path: &str) -> Result<bool, MediaStorageError> {
        let path = self.base_path.join(rel_path);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MediaStorageError::Io(e)),
        }
    }

    pub async fn exists(&self, rel_path: &str) -> bool {
        fs::metadata(self.base_path.join(rel_path)).await.is_ok()
    }
}

/// Entity names become directory segments; keep them free of traversal
/// and control characters.
fn sanitize_segment(name: &str) -> Result<String, MediaStorageError> {
    let name = name.trim();

    if name.is_empty() || name.len() > 255 || name == "." || name == ".." {
        return Err(MediaStorageError::InvalidSegment(name.to_string()));
    }

    const INVALID_CHARS: &[char] = &['\0', '\n', '\r'];
    if name.chars().any(|c| INVALID_CHARS.contains(&c)) {
        return Err(MediaStorageError::InvalidSegment(name.to_string()));
    }

    Ok(name.replace(['/', '\\'], "-"))
}
