//! Step ordering for the property wizard.
//!
//! The order is recomputed on every navigation call, so it must stay a pure
//! function of the property type and the mode.

use super::types::{PropertyFamily, PropertyType, WizardMode, WizardStep};

const HABITATION_STEPS: &[WizardStep] = &[
    WizardStep::TypeBien,
    WizardStep::Address,
    WizardStep::Details,
    WizardStep::Rooms,
    WizardStep::Photos,
    WizardStep::Features,
    WizardStep::Publish,
    WizardStep::Recap,
];

// building_config takes the slot details holds for single units
const BUILDING_STEPS: &[WizardStep] = &[
    WizardStep::TypeBien,
    WizardStep::Address,
    WizardStep::BuildingConfig,
    WizardStep::Photos,
    WizardStep::Features,
    WizardStep::Publish,
    WizardStep::Recap,
];

const PARKING_STEPS: &[WizardStep] = &[
    WizardStep::TypeBien,
    WizardStep::Address,
    WizardStep::Details,
    WizardStep::Photos,
    WizardStep::Publish,
    WizardStep::Recap,
];

const COMMERCIAL_STEPS: &[WizardStep] = &[
    WizardStep::TypeBien,
    WizardStep::Address,
    WizardStep::Details,
    WizardStep::Photos,
    WizardStep::Features,
    WizardStep::Publish,
    WizardStep::Recap,
];

/// First step of every order
pub const FIRST_STEP: WizardStep = WizardStep::TypeBien;

fn full_order(property_type: Option<&PropertyType>) -> &'static [WizardStep] {
    match property_type.map(PropertyType::family) {
        Some(PropertyFamily::Building) => BUILDING_STEPS,
        Some(PropertyFamily::Parking) => PARKING_STEPS,
        Some(PropertyFamily::Commercial) => COMMERCIAL_STEPS,
        Some(PropertyFamily::Habitation) | None => HABITATION_STEPS,
    }
}

/// Ordered steps for a property type and mode.
///
/// Types without a dedicated graph (including unknown ones) get the
/// habitation order. Fast mode keeps the fast-mode steps of the full order.
pub fn step_order(property_type: Option<&PropertyType>, mode: WizardMode) -> Vec<WizardStep> {
    let full = full_order(property_type);
    match mode {
        WizardMode::Full => full.to_vec(),
        WizardMode::Fast => full
            .iter()
            .copied()
            .filter(WizardStep::in_fast_mode)
            .collect(),
    }
}

/// Step following `current`, or `None` at the end of the order
pub fn next_in(order: &[WizardStep], current: WizardStep) -> Option<WizardStep> {
    match order.iter().position(|s| *s == current) {
        Some(index) => order.get(index + 1).copied(),
        None => order.first().copied(),
    }
}

/// Step preceding `current`, or `None` at the start of the order
pub fn prev_in(order: &[WizardStep], current: WizardStep) -> Option<WizardStep> {
    let index = order.iter().position(|s| *s == current)?;
    index.checked_sub(1).and_then(|i| order.get(i).copied())
}
