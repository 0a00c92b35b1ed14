use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use baja_core::domain::document::{BlobRef, MimeCategory};
use baja_core::ports::{BlobMetadata, DocumentStore, PortError};

const BLOB_SCHEME: &str = "fs://";

#[derive(Debug, Serialize, Deserialize)]
struct SidecarMetadata {
    filename: String,
    size_bytes: u64,
}

/// Stores each blob as `<root>/<uuid>.bin` next to a `<uuid>.json` sidecar with the
/// original filename. References have the form `fs://<uuid>`.
#[derive(Clone, Debug)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn paths(&self, blob_ref: &BlobRef) -> Option<(PathBuf, PathBuf)> {
        let key = blob_ref.0.strip_prefix(BLOB_SCHEME)?;
        let key = Uuid::parse_str(key).ok()?.to_string();
        Some((self.root.join(format!("{key}.bin")), self.root.join(format!("{key}.json"))))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<BlobRef, PortError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(unavailable)?;

        let blob_ref = BlobRef(format!("{BLOB_SCHEME}{}", Uuid::new_v4()));
        let Some((content_path, metadata_path)) = self.paths(&blob_ref) else {
            return Err(PortError::Backend(format!("unusable blob reference `{}`", blob_ref.0)));
        };
        let metadata = SidecarMetadata {
            filename: filename.to_string(),
            size_bytes: content.len() as u64,
        };
        let metadata = serde_json::to_vec(&metadata)
            .map_err(|error| PortError::Backend(format!("cannot encode metadata: {error}")))?;

        tokio::fs::write(&content_path, &content).await.map_err(unavailable)?;
        if let Err(error) = tokio::fs::write(&metadata_path, metadata).await {
            let _ = tokio::fs::remove_file(&content_path).await;
            return Err(unavailable(error));
        }

        debug!(
            event_name = "decommission.document.uploaded",
            blob_ref = %blob_ref.0,
            size_bytes = content.len(),
            "document stored on disk"
        );
        Ok(blob_ref)
    }

    async fn describe(&self, blob_ref: &BlobRef) -> Result<BlobMetadata, PortError> {
        let (_, metadata_path) = self.paths(blob_ref).ok_or(PortError::NotFound)?;
        let raw = tokio::fs::read(&metadata_path).await.map_err(|error| match error.kind() {
            ErrorKind::NotFound => PortError::NotFound,
            _ => unavailable(error),
        })?;
        let metadata: SidecarMetadata = serde_json::from_slice(&raw).map_err(|error| {
            PortError::Backend(format!("corrupt metadata for `{}`: {error}", blob_ref.0))
        })?;

        Ok(BlobMetadata {
            mime_category: MimeCategory::from_filename(&metadata.filename),
            filename: metadata.filename,
            size_bytes: metadata.size_bytes,
        })
    }
}

fn unavailable(error: std::io::Error) -> PortError {
    PortError::Unavailable(format!("document storage: {error}"))
}
