use async_trait::async_trait;
use thiserror::Error;

use crate::domain::document::{BlobRef, MimeCategory};
use crate::domain::equipment::{EquipmentCode, EquipmentSnapshot};
use crate::domain::request::{DecommissionRequest, RequestId};
use crate::listing::{OrderDirection, OrderField, PageSpec, RequestFilter};

/// Failure reported by a collaborator behind one of the ports below. The workflow
/// maps these onto its own error taxonomy; adapters never surface backend types.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("record was not found")]
    NotFound,
    #[error("stored version does not match the expected version")]
    VersionConflict,
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn get(&self, id: &RequestId) -> Result<DecommissionRequest, PortError>;

    /// Stores a brand-new request. Fails with `Duplicate` when the id or request code
    /// is already taken.
    async fn insert(&self, request: DecommissionRequest) -> Result<(), PortError>;

    /// Replaces the stored request only if its version still equals
    /// `expected_version`. `request.version` carries the new version.
    async fn save(
        &self,
        request: &DecommissionRequest,
        expected_version: u32,
    ) -> Result<(), PortError>;

    async fn find(
        &self,
        filter: &RequestFilter,
        page: PageSpec,
        order_by: OrderField,
        direction: OrderDirection,
    ) -> Result<(Vec<DecommissionRequest>, u64), PortError>;

    /// Allocates the next request-code sequence number for `year`. Numbers are never
    /// handed out twice, even when the request that claimed one is never stored.
    async fn next_code_sequence(&self, year: i32) -> Result<u32, PortError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobMetadata {
    pub filename: String,
    pub size_bytes: u64,
    pub mime_category: MimeCategory,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<BlobRef, PortError>;
    async fn describe(&self, blob_ref: &BlobRef) -> Result<BlobMetadata, PortError>;
}

#[async_trait]
pub trait EquipmentCatalog: Send + Sync {
    async fn lookup(&self, code: &EquipmentCode) -> Result<Option<EquipmentSnapshot>, PortError>;
}
