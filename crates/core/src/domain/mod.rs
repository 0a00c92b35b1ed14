pub mod actor;
pub mod document;
pub mod equipment;
pub mod request;
