//! Per-step checks run before letting the user leave a step

use serde::Serialize;

use super::form::FormData;
use super::types::{PropertyFamily, Room, WizardStep};

/// Highest floor count accepted for a building
pub const MAX_BUILDING_FLOORS: u32 = 50;

/// A problem with one form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

impl FieldIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn is_blank(value: Option<&String>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Validate the fields owned by `step`. Empty means the step is complete.
pub fn validate_step(step: WizardStep, form: &FormData, rooms: &[Room]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    match step {
        WizardStep::TypeBien => {
            if form.property_type.is_none() {
                issues.push(FieldIssue::new("type", "Choisissez un type de bien"));
            }
        }
        WizardStep::Address => {
            if is_blank(form.adresse_complete.as_ref()) {
                issues.push(FieldIssue::new("adresse_complete", "Adresse requise"));
            }
            if let Some(code) = &form.code_postal {
                if code.len() != 5 || !code.chars().all(|c| c.is_ascii_digit()) {
                    issues.push(FieldIssue::new(
                        "code_postal",
                        "Le code postal doit contenir 5 chiffres",
                    ));
                }
            }
        }
        WizardStep::Details => {
            let needs_surface = form
                .property_type
                .as_ref()
                .map_or(true, |t| t.family() != PropertyFamily::Parking);
            match form.surface {
                Some(surface) if surface <= 0.0 => {
                    issues.push(FieldIssue::new("surface", "La surface doit être positive"));
                }
                None if needs_surface => {
                    issues.push(FieldIssue::new("surface", "Surface requise"));
                }
                _ => {}
            }
        }
        WizardStep::BuildingConfig => {
            if form.building_floors == 0 || form.building_floors > MAX_BUILDING_FLOORS {
                issues.push(FieldIssue::new(
                    "building_floors",
                    format!("Nombre d'étages entre 1 et {}", MAX_BUILDING_FLOORS),
                ));
            }
            let floors = i64::from(form.building_floors);
            if form
                .building_units
                .iter()
                .any(|u| i64::from(u.floor) < 0 || i64::from(u.floor) >= floors)
            {
                issues.push(FieldIssue::new(
                    "building_units",
                    "Un lot est placé à un étage inexistant",
                ));
            }
        }
        WizardStep::Rooms => {
            if rooms.is_empty() {
                issues.push(FieldIssue::new("rooms", "Ajoutez au moins une pièce"));
            }
        }
        WizardStep::Photos | WizardStep::Features | WizardStep::Publish | WizardStep::Recap => {}
    }

    issues
}
