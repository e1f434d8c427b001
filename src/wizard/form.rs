//! Draft form data: a typed base record plus an open extension map

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::types::PropertyType;

/// Default record status for a draft created by the wizard
pub const DRAFT_ETAT: &str = "draft";

/// Default number of floors proposed for a new building
pub const DEFAULT_BUILDING_FLOORS: u32 = 4;

/// Wire names of the typed fields. Extension keys may not shadow them.
pub const FORM_FIELDS: &[&str] = &[
    "etat",
    "type",
    "adresse_complete",
    "code_postal",
    "ville",
    "departement",
    "surface",
    "nb_pieces",
    "nb_chambres",
    "etage",
    "loyer_hc",
    "charges_mensuelles",
    "depot_garantie",
    "dpe_classe_energie",
    "dpe_classe_climat",
    "has_ascenseur",
    "has_balcon",
    "has_terrasse",
    "has_parking",
    "has_cave",
    "building_floors",
    "building_units",
];

/// DPE energy / climate class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DpeClass {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

/// One unit of a multi-unit building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingUnit {
    pub floor: i32,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_pieces: Option<u32>,
}

/// In-progress property form data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormData {
    /// Record status, owned by the remote draft record
    pub etat: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,

    // ─── Address ────────────────────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adresse_complete: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_postal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ville: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departement: Option<String>,

    // ─── Details ────────────────────────────────────────────────────────────
    /// Living area in m²
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb_pieces: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb_chambres: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etage: Option<i32>,

    // ─── Financials ─────────────────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loyer_hc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charges_mensuelles: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depot_garantie: Option<f64>,

    // ─── Energy diagnostics ─────────────────────────────────────────────────
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpe_classe_energie: Option<DpeClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpe_classe_climat: Option<DpeClass>,

    // ─── Amenities ──────────────────────────────────────────────────────────
    pub has_ascenseur: bool,
    pub has_balcon: bool,
    pub has_terrasse: bool,
    pub has_parking: bool,
    pub has_cave: bool,

    // ─── Building ───────────────────────────────────────────────────────────
    pub building_floors: u32,
    pub building_units: Vec<BuildingUnit>,

    /// Free-form, property-type-specific fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            etat: DRAFT_ETAT.to_string(),
            property_type: None,
            adresse_complete: None,
            code_postal: None,
            ville: None,
            departement: None,
            surface: None,
            nb_pieces: None,
            nb_chambres: None,
            etage: None,
            loyer_hc: None,
            charges_mensuelles: None,
            depot_garantie: None,
            dpe_classe_energie: None,
            dpe_classe_climat: None,
            has_ascenseur: false,
            has_balcon: false,
            has_terrasse: false,
            has_parking: false,
            has_cave: false,
            building_floors: DEFAULT_BUILDING_FLOORS,
            building_units: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// Partial form update. Present fields replace the stored value wholesale;
/// an explicit JSON `null` clears a nullable field.
///
/// Has no `etat` field: the record status only comes from the properties
/// service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormPatch {
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub property_type: Option<Option<PropertyType>>,
    #[serde(deserialize_with = "nullable")]
    pub adresse_complete: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub code_postal: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub ville: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub departement: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub surface: Option<Option<f64>>,
    #[serde(deserialize_with = "nullable")]
    pub nb_pieces: Option<Option<u32>>,
    #[serde(deserialize_with = "nullable")]
    pub nb_chambres: Option<Option<u32>>,
    #[serde(deserialize_with = "nullable")]
    pub etage: Option<Option<i32>>,
    #[serde(deserialize_with = "nullable")]
    pub loyer_hc: Option<Option<f64>>,
    #[serde(deserialize_with = "nullable")]
    pub charges_mensuelles: Option<Option<f64>>,
    #[serde(deserialize_with = "nullable")]
    pub depot_garantie: Option<Option<f64>>,
    #[serde(deserialize_with = "nullable")]
    pub dpe_classe_energie: Option<Option<DpeClass>>,
    #[serde(deserialize_with = "nullable")]
    pub dpe_classe_climat: Option<Option<DpeClass>>,
    pub has_ascenseur: Option<bool>,
    pub has_balcon: Option<bool>,
    pub has_terrasse: Option<bool>,
    pub has_parking: Option<bool>,
    pub has_cave: Option<bool>,
    pub building_floors: Option<u32>,
    pub building_units: Option<Vec<BuildingUnit>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Deserialize a present field as `Some`, keeping `null` as `Some(None)`.
/// Combined with `#[serde(default)]`, an absent field stays `None`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl FormPatch {
    /// Patch carrying a single extension field
    pub fn extra(key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut patch = Self::default();
        patch.extra.insert(key.into(), value);
        patch
    }

    /// Parse a patch from a JSON object
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

fn replace<T>(slot: &mut Option<T>, value: Option<Option<T>>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn replace_flag(slot: &mut bool, value: Option<bool>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl FormData {
    /// Shallow-merge a patch into the form, keeping every field it omits
    pub fn merge(&mut self, patch: FormPatch) {
        replace(&mut self.property_type, patch.property_type);
        replace(&mut self.adresse_complete, patch.adresse_complete);
        replace(&mut self.code_postal, patch.code_postal);
        replace(&mut self.ville, patch.ville);
        replace(&mut self.departement, patch.departement);
        replace(&mut self.surface, patch.surface);
        replace(&mut self.nb_pieces, patch.nb_pieces);
        replace(&mut self.nb_chambres, patch.nb_chambres);
        replace(&mut self.etage, patch.etage);
        replace(&mut self.loyer_hc, patch.loyer_hc);
        replace(&mut self.charges_mensuelles, patch.charges_mensuelles);
        replace(&mut self.depot_garantie, patch.depot_garantie);
        replace(&mut self.dpe_classe_energie, patch.dpe_classe_energie);
        replace(&mut self.dpe_classe_climat, patch.dpe_classe_climat);
        replace_flag(&mut self.has_ascenseur, patch.has_ascenseur);
        replace_flag(&mut self.has_balcon, patch.has_balcon);
        replace_flag(&mut self.has_terrasse, patch.has_terrasse);
        replace_flag(&mut self.has_parking, patch.has_parking);
        replace_flag(&mut self.has_cave, patch.has_cave);
        if let Some(floors) = patch.building_floors {
            self.building_floors = floors;
        }
        if let Some(units) = patch.building_units {
            self.building_units = units;
        }

        for (key, value) in patch.extra {
            if FORM_FIELDS.contains(&key.as_str()) {
                warn!(field = %key, "Ignoring extension field shadowing a typed form field");
                continue;
            }
            self.extra.insert(key, value);
        }
    }

    /// Whether the draft describes a multi-unit building
    pub fn is_building(&self) -> bool {
        self.property_type
            .as_ref()
            .is_some_and(PropertyType::is_building)
    }

    /// Serialized form fields sent to the properties service (without `etat`)
    pub fn to_payload(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        map.remove("etat");
        map
    }
}
