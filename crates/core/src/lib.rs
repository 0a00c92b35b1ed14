pub mod audit;
pub mod authorization;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod listing;
pub mod ports;
pub mod workflow;

pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use authorization::{AuthorizationPolicy, RoleAuthorizationPolicy};
pub use domain::actor::{Actor, ActorRole};
pub use domain::request::{DecommissionRequest, RequestCode, RequestId, RequestState};
pub use errors::{DomainError, InterfaceError, WorkflowError};
pub use listing::{ListQuery, ListResult, ListingService};
pub use ports::{DocumentStore, EquipmentCatalog, PortError, RequestRepository};
pub use workflow::{CommandContext, DecommissionService};
