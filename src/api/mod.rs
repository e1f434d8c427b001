//! Clients for the remote properties backend
//!
//! - `properties`: the `PropertiesService` trait with HTTP and in-memory
//!   implementations
//! - `error`: the shared `ServiceError` type

pub mod error;
pub mod properties;

pub use error::ServiceError;
pub use properties::{
    DraftCreated, DraftPayload, DraftUpdated, HttpPropertiesService, InMemoryPropertiesService,
    PropertiesService, PropertyRecord,
};
