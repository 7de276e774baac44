//! Uploaded file storage.
//!
//! Files land under the configured media root and are referenced by their
//! media-relative path (e.g. `book_pdfs/3f2c..._interior.pdf`).

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use thiserror::Error;
use uuid::Uuid;

/// Directory for interior PDFs.
pub const BOOK_PDFS: &str = "book_pdfs";

/// Directory for cover files.
pub const BOOK_COVERS: &str = "book_covers";

/// A file part of a multipart request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Errors from writing uploads.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to write upload {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes uploads below a root directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `upload` in `dir` and return its media-relative path.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Write` if the directory or file cannot be written.
    pub async fn save(&self, dir: &str, upload: &Upload) -> Result<String, MediaError> {
        let name = format!("{}_{}", Uuid::new_v4().simple(), sanitize(&upload.file_name));
        let relative = format!("{dir}/{name}");

        let target_dir = self.root.join(dir);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|source| MediaError::Write {
                path: target_dir.clone(),
                source,
            })?;

        let path = target_dir.join(&name);
        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|source| MediaError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %relative, bytes = upload.bytes.len(), "Stored upload");
        Ok(relative)
    }

    /// Remove a stored file. Missing files are not an error.
    pub async fn remove(&self, relative: &str) {
        let path = self.root.join(relative);
        if let Err(e) = tokio::fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload");
        }
    }
}

/// Keep only the final path component and a conservative character set.
fn sanitize(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_owned()
    } else {
        cleaned.to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_paths() {
        assert_eq!(sanitize("../../etc/passwd"), "passwd");
        assert_eq!(sanitize(r"C:\books\My Novel.pdf"), "My_Novel.pdf");
        assert_eq!(sanitize(".."), "upload");
        assert_eq!(sanitize(""), "upload");
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let upload = Upload {
            file_name: "interior.pdf".to_owned(),
            bytes: Bytes::from_static(b"%PDF-1.7"),
        };

        let relative = store.save(BOOK_PDFS, &upload).await.unwrap();
        assert!(relative.starts_with("book_pdfs/"));
        assert!(relative.ends_with("_interior.pdf"));

        let on_disk = tokio::fs::read(dir.path().join(&relative)).await.unwrap();
        assert_eq!(on_disk, b"%PDF-1.7");

        store.remove(&relative).await;
        assert!(!dir.path().join(&relative).exists());
        store.remove(&relative).await;
    }
}
