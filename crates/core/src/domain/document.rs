use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// Opaque handle returned by the document store. Only the reference is kept on the
/// aggregate; bytes never are.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeCategory {
    Pdf,
    Image,
    Spreadsheet,
    TextDocument,
    Other,
}

impl MimeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Spreadsheet => "spreadsheet",
            Self::TextDocument => "text_document",
            Self::Other => "other",
        }
    }

    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|value| value.to_str())
            .map(|value| value.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "tif" | "tiff") => Self::Image,
            Some("xls" | "xlsx" | "ods" | "csv") => Self::Spreadsheet,
            Some("doc" | "docx" | "odt" | "txt" | "rtf") => Self::TextDocument,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    pub mime_category: MimeCategory,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub blob_ref: BlobRef,
}

/// A document as supplied with a command: either raw content the workflow must
/// upload, or a blob that was stored earlier and only needs to be described.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentSource {
    Upload { filename: String, content: Vec<u8> },
    Stored { filename: String, blob_ref: BlobRef },
}

impl DocumentSource {
    pub fn filename(&self) -> &str {
        match self {
            Self::Upload { filename, .. } | Self::Stored { filename, .. } => filename,
        }
    }
}
