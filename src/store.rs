//! Object storage for uploaded PDFs and their previews.
//!
//! The pipeline only needs "put a named blob in a bucket, get back a stored
//! path". [`LocalDirStore`] implements that on the filesystem; hosted
//! backends implement [`ObjectStore`] the same way.

use crate::error::IngestError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Bucket holding original PDFs.
pub const RESUMES_BUCKET: &str = "resumes";
/// Bucket holding preview images.
pub const IMAGES_BUCKET: &str = "images";

/// A named-blob store partitioned into buckets.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` as `name` in `bucket` and return the stored path.
    async fn put(
        &self,
        bucket: &str,
        name: &str,
        media_type: &str,
        bytes: Arc<[u8]>,
    ) -> Result<String, IngestError>;
}

/// Stores objects under `<root>/<bucket>/<uuid>-<name>`.
#[derive(Debug)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of a path returned by [`ObjectStore::put`].
    pub fn resolve(&self, stored: &str) -> PathBuf {
        self.root.join(stored)
    }

    fn unique_prefix(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn put(
        &self,
        bucket: &str,
        name: &str,
        media_type: &str,
        bytes: Arc<[u8]>,
    ) -> Result<String, IngestError> {
        let fail = |detail: String| IngestError::StorageFailed {
            bucket: bucket.to_string(),
            name: name.to_string(),
            detail,
        };

        let bucket_name = sanitize(bucket);
        let object_name = format!("{}-{}", self.unique_prefix(), sanitize(name));
        let dir = self.root.join(&bucket_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| fail(format!("create {}: {}", dir.display(), e)))?;

        // Atomic write: temp file, then rename.
        let final_path = dir.join(&object_name);
        let tmp_path = dir.join(format!(".{}.tmp", object_name));
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| fail(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(fail(e.to_string()));
        }

        debug!(
            "Stored {} ({} bytes, {}) at {}",
            name,
            bytes.len(),
            media_type,
            final_path.display()
        );
        Ok(format!("{}/{}", bucket_name, object_name))
    }
}

/// Keep object names inside their bucket directory.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.trim_start_matches('.') {
        "" => "object".to_string(),
        rest => rest.to_string(),
    }
}
