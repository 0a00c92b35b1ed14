use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use uuid::Uuid;

use baja_core::domain::document::{BlobRef, MimeCategory};
use baja_core::domain::equipment::{EquipmentCode, EquipmentSnapshot};
use baja_core::domain::request::{DecommissionRequest, RequestId};
use baja_core::listing::{compare_for_listing, OrderDirection, OrderField, PageSpec, RequestFilter};
use baja_core::ports::{BlobMetadata, DocumentStore, EquipmentCatalog, PortError, RequestRepository};

#[derive(Default)]
struct RequestStore {
    requests: HashMap<String, DecommissionRequest>,
    sequences: HashMap<i32, u32>,
}

/// Request repository for tests and local runs. Enforces the same id, code and
/// version rules as the SQL adapter.
#[derive(Default)]
pub struct InMemoryRequestRepository {
    store: RwLock<RequestStore>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn get(&self, id: &RequestId) -> Result<DecommissionRequest, PortError> {
        let store = self.store.read().await;
        store.requests.get(&id.0).cloned().ok_or(PortError::NotFound)
    }

    async fn insert(&self, request: DecommissionRequest) -> Result<(), PortError> {
        let mut store = self.store.write().await;
        if store.requests.contains_key(&request.id.0) {
            return Err(PortError::Duplicate(format!("request id `{}`", request.id)));
        }
        if store.requests.values().any(|stored| stored.request_code == request.request_code) {
            return Err(PortError::Duplicate(format!("request code `{}`", request.request_code)));
        }
        store.requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn save(
        &self,
        request: &DecommissionRequest,
        expected_version: u32,
    ) -> Result<(), PortError> {
        let mut store = self.store.write().await;
        let stored = store.requests.get_mut(&request.id.0).ok_or(PortError::NotFound)?;
        if stored.version != expected_version {
            return Err(PortError::VersionConflict);
        }
        *stored = request.clone();
        Ok(())
    }

    async fn find(
        &self,
        filter: &RequestFilter,
        page: PageSpec,
        order_by: OrderField,
        direction: OrderDirection,
    ) -> Result<(Vec<DecommissionRequest>, u64), PortError> {
        let store = self.store.read().await;
        let mut matching: Vec<&DecommissionRequest> =
            store.requests.values().filter(|request| filter.matches(request)).collect();
        matching.sort_by(|left, right| compare_for_listing(order_by, direction, left, right));

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn next_code_sequence(&self, year: i32) -> Result<u32, PortError> {
        let mut store = self.store.write().await;
        let last = store.sequences.entry(year).or_insert(0);
        *last += 1;
        Ok(*last)
    }
}

#[derive(Default)]
pub struct InMemoryEquipmentCatalog {
    equipment: RwLock<HashMap<String, EquipmentSnapshot>>,
}

impl InMemoryEquipmentCatalog {
    pub fn with_equipment(equipment: impl IntoIterator<Item = EquipmentSnapshot>) -> Self {
        let equipment =
            equipment.into_iter().map(|snapshot| (snapshot.code.0.clone(), snapshot)).collect();
        Self { equipment: RwLock::new(equipment) }
    }

    pub async fn register(&self, snapshot: EquipmentSnapshot) {
        let mut equipment = self.equipment.write().await;
        equipment.insert(snapshot.code.0.clone(), snapshot);
    }
}

#[async_trait::async_trait]
impl EquipmentCatalog for InMemoryEquipmentCatalog {
    async fn lookup(&self, code: &EquipmentCode) -> Result<Option<EquipmentSnapshot>, PortError> {
        let equipment = self.equipment.read().await;
        Ok(equipment.get(&code.0).cloned())
    }
}

#[derive(Clone)]
struct StoredBlob {
    filename: String,
    content: Vec<u8>,
}

/// Keeps blobs in memory under `mem://` references. Can be switched offline to
/// simulate an unreachable store.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
    unavailable: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn content(&self, blob_ref: &BlobRef) -> Option<Vec<u8>> {
        self.blobs.read().await.get(&blob_ref.0).map(|blob| blob.content.clone())
    }

    fn ensure_available(&self) -> Result<(), PortError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("document store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<BlobRef, PortError> {
        self.ensure_available()?;
        let blob_ref = BlobRef(format!("mem://{}", Uuid::new_v4()));
        let mut blobs = self.blobs.write().await;
        blobs.insert(blob_ref.0.clone(), StoredBlob { filename: filename.to_string(), content });
        Ok(blob_ref)
    }

    async fn describe(&self, blob_ref: &BlobRef) -> Result<BlobMetadata, PortError> {
        self.ensure_available()?;
        let blobs = self.blobs.read().await;
        let blob = blobs.get(&blob_ref.0).ok_or(PortError::NotFound)?;
        Ok(BlobMetadata {
            filename: blob.filename.clone(),
            size_bytes: blob.content.len() as u64,
            mime_category: MimeCategory::from_filename(&blob.filename),
        })
    }
}
