//! Properties service trait and implementations
//!
//! The wizard persists drafts through this narrow contract: create an empty
//! draft, push partial updates, and load a record to resume a session.

mod http;
mod memory;

pub use http::HttpPropertiesService;
pub use memory::InMemoryPropertiesService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::error::ServiceError;
use crate::wizard::{Photo, Room};

/// Response of draft creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftCreated {
    pub id: String,
    pub etat: String,
    /// Set when the service creates the building row alongside the draft
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_id: Option<String>,
}

/// Response of a draft update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftUpdated {
    pub id: String,
}

/// Body of a draft update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPayload {
    /// Form fields, without `etat`
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_id: Option<String>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

/// A stored property as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: String,
    pub etat: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_id: Option<String>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    /// Remaining form fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Remote persistence of property drafts
#[async_trait]
pub trait PropertiesService: Send + Sync {
    /// Service name used in logs (e.g., "http", "memory")
    fn name(&self) -> &str;

    /// Create an empty draft record
    async fn create_draft(&self) -> Result<DraftCreated, ServiceError>;

    /// Persist incremental changes to an existing draft
    async fn update(&self, id: &str, payload: &DraftPayload) -> Result<DraftUpdated, ServiceError>;

    /// Load a property to resume editing
    async fn get_by_id(&self, id: &str) -> Result<PropertyRecord, ServiceError>;
}
