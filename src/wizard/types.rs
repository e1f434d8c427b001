//! Type definitions for the property wizard

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A step of the property creation wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    TypeBien,
    Address,
    Details,
    BuildingConfig,
    Rooms,
    Photos,
    Features,
    Publish,
    Recap,
}

impl WizardStep {
    pub fn all() -> &'static [WizardStep] {
        &[
            WizardStep::TypeBien,
            WizardStep::Address,
            WizardStep::Details,
            WizardStep::BuildingConfig,
            WizardStep::Rooms,
            WizardStep::Photos,
            WizardStep::Features,
            WizardStep::Publish,
            WizardStep::Recap,
        ]
    }

    /// Wire identifier (e.g. "type_bien")
    pub fn key(&self) -> &'static str {
        match self {
            WizardStep::TypeBien => "type_bien",
            WizardStep::Address => "address",
            WizardStep::Details => "details",
            WizardStep::BuildingConfig => "building_config",
            WizardStep::Rooms => "rooms",
            WizardStep::Photos => "photos",
            WizardStep::Features => "features",
            WizardStep::Publish => "publish",
            WizardStep::Recap => "recap",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WizardStep::TypeBien => "Type de bien",
            WizardStep::Address => "Adresse",
            WizardStep::Details => "Caractéristiques",
            WizardStep::BuildingConfig => "Configuration de l'immeuble",
            WizardStep::Rooms => "Pièces",
            WizardStep::Photos => "Photos",
            WizardStep::Features => "Équipements",
            WizardStep::Publish => "Annonce",
            WizardStep::Recap => "Récapitulatif",
        }
    }

    /// Whether the step is kept in fast mode
    pub fn in_fast_mode(&self) -> bool {
        matches!(
            self,
            WizardStep::TypeBien
                | WizardStep::Address
                | WizardStep::Details
                | WizardStep::BuildingConfig
                | WizardStep::Photos
                | WizardStep::Recap
        )
    }

    /// Parse a wire identifier
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.key() == key)
    }
}

impl std::str::FromStr for WizardStep {
    type Err = super::WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| super::WizardError::UnknownStep(s.to_string()))
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Wizard mode: reduced or complete step sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardMode {
    Fast,
    #[default]
    Full,
}

impl WizardMode {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "fast" => Some(WizardMode::Fast),
            "full" => Some(WizardMode::Full),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            WizardMode::Fast => "fast",
            WizardMode::Full => "full",
        }
    }
}

/// Property type selected on the first step.
///
/// Unknown values are preserved as `Other` so a draft created by a newer
/// client round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    Appartement,
    Maison,
    Studio,
    Colocation,
    Saisonnier,
    Parking,
    Box,
    LocalCommercial,
    Bureaux,
    Entrepot,
    FondsDeCommerce,
    Immeuble,
    Other(String),
}

/// Step graph family a property type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyFamily {
    Habitation,
    Parking,
    Commercial,
    Building,
}

impl PropertyType {
    pub fn as_str(&self) -> &str {
        match self {
            PropertyType::Appartement => "appartement",
            PropertyType::Maison => "maison",
            PropertyType::Studio => "studio",
            PropertyType::Colocation => "colocation",
            PropertyType::Saisonnier => "saisonnier",
            PropertyType::Parking => "parking",
            PropertyType::Box => "box",
            PropertyType::LocalCommercial => "local_commercial",
            PropertyType::Bureaux => "bureaux",
            PropertyType::Entrepot => "entrepot",
            PropertyType::FondsDeCommerce => "fonds_de_commerce",
            PropertyType::Immeuble => "immeuble",
            PropertyType::Other(s) => s,
        }
    }

    pub fn family(&self) -> PropertyFamily {
        match self {
            PropertyType::Immeuble => PropertyFamily::Building,
            PropertyType::Parking | PropertyType::Box => PropertyFamily::Parking,
            PropertyType::LocalCommercial
            | PropertyType::Bureaux
            | PropertyType::Entrepot
            | PropertyType::FondsDeCommerce => PropertyFamily::Commercial,
            PropertyType::Appartement
            | PropertyType::Maison
            | PropertyType::Studio
            | PropertyType::Colocation
            | PropertyType::Saisonnier
            | PropertyType::Other(_) => PropertyFamily::Habitation,
        }
    }

    pub fn is_building(&self) -> bool {
        self.family() == PropertyFamily::Building
    }
}

impl From<String> for PropertyType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "appartement" => PropertyType::Appartement,
            "maison" => PropertyType::Maison,
            "studio" => PropertyType::Studio,
            "colocation" => PropertyType::Colocation,
            "saisonnier" => PropertyType::Saisonnier,
            "parking" => PropertyType::Parking,
            "box" => PropertyType::Box,
            "local_commercial" => PropertyType::LocalCommercial,
            "bureaux" => PropertyType::Bureaux,
            "entrepot" => PropertyType::Entrepot,
            "fonds_de_commerce" => PropertyType::FondsDeCommerce,
            "immeuble" => PropertyType::Immeuble,
            _ => PropertyType::Other(value),
        }
    }
}

impl From<&str> for PropertyType {
    fn from(value: &str) -> Self {
        PropertyType::from(value.to_string())
    }
}

impl From<PropertyType> for String {
    fn from(value: PropertyType) -> Self {
        match value {
            PropertyType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Outcome of the most recent draft save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

impl SyncStatus {
    pub fn key(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Saving => "saving",
            SyncStatus::Saved => "saved",
            SyncStatus::Error => "error",
        }
    }
}

/// A room of the property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_piece: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_m2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Partial room fields used by `add_room` / `update_room`.
/// An explicit JSON `null` clears a field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoomPatch {
    #[serde(default, deserialize_with = "super::form::nullable")]
    pub type_piece: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::form::nullable")]
    pub surface_m2: Option<Option<f64>>,
    #[serde(default, deserialize_with = "super::form::nullable")]
    pub label: Option<Option<String>>,
}

impl Room {
    pub(crate) fn from_patch(patch: RoomPatch) -> Self {
        Self {
            id: Uuid::new_v4(),
            type_piece: patch.type_piece.flatten(),
            surface_m2: patch.surface_m2.flatten(),
            label: patch.label.flatten(),
        }
    }

    pub(crate) fn apply(&mut self, patch: RoomPatch) {
        if let Some(type_piece) = patch.type_piece {
            self.type_piece = type_piece;
        }
        if let Some(surface) = patch.surface_m2 {
            self.surface_m2 = surface;
        }
        if let Some(label) = patch.label {
            self.label = label;
        }
    }
}

/// Reference to an uploaded photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<Uuid>,
    #[serde(default)]
    pub is_main: bool,
}

impl Photo {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            room_id: None,
            is_main: false,
        }
    }
}

/// Progress of the asynchronous photo import queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoImportProgress {
    pub imported: usize,
    pub total: usize,
}

impl PhotoImportProgress {
    pub fn is_complete(&self) -> bool {
        self.imported >= self.total
    }
}
