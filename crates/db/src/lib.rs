pub mod catalog;
pub mod connection;
pub mod documents;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use catalog::SqlEquipmentCatalog;
pub use connection::{connect, connect_with_settings, DbPool};
pub use documents::FsDocumentStore;
pub use fixtures::{DemoEquipmentDataset, EquipmentSeedInfo, SeedResult, VerificationResult};
pub use repositories::{
    InMemoryDocumentStore, InMemoryEquipmentCatalog, InMemoryRequestRepository, RepositoryError,
    SqlRequestRepository,
};
