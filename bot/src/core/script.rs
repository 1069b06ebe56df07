//! Semantic checks on map scripts that the JSON Schema cannot express.

use crate::core::types::{MapScript, PlanAction, SetupAction};

/// Check semantic invariants of a decoded map script:
/// - pinch and swipe steps carry a spacing pair
/// - deploy steps carry node coordinates
/// - deploy counts fit the configured dummy/DPS slot lists
/// - planning opens with `start`/`start_no_resupply` before any other move
/// - at most one `retreat` move
pub fn validate_script(script: &MapScript, dummy_slots: usize, dps_slots: usize) -> Vec<String> {
    let mut errors = Vec::new();

    let mut dummies = 0usize;
    let mut echelons = 0usize;
    for (idx, step) in script.setup.iter().enumerate() {
        match step.action {
            SetupAction::PinchIn
            | SetupAction::PinchOut
            | SetupAction::SwipeUp
            | SetupAction::SwipeDown => {
                if step.spacing.is_none() {
                    errors.push(format!("setup[{idx}]: {:?} requires spacing", step.action));
                }
            }
            SetupAction::DeployDummy | SetupAction::DeployEchelon => {
                if step.coordinates.is_none() {
                    errors.push(format!("setup[{idx}]: {:?} requires coordinates", step.action));
                }
                if step.action == SetupAction::DeployDummy {
                    dummies += 1;
                } else {
                    echelons += 1;
                }
            }
        }
    }
    if dummies > dummy_slots {
        errors.push(format!(
            "setup deploys {dummies} dummies but only {dummy_slots} dummy echelons are configured"
        ));
    }
    if echelons > dps_slots {
        errors.push(format!(
            "setup deploys {echelons} echelons but only {dps_slots} dps echelons are configured"
        ));
    }

    match script.moves.first() {
        None => errors.push("moves: planning needs at least one move".to_string()),
        Some(first) if !is_start(first.action) => errors.push(format!(
            "moves[0]: expected start or start_no_resupply, found {:?}",
            first.action
        )),
        Some(_) => {}
    }

    let retreats = script
        .moves
        .iter()
        .filter(|m| m.action == PlanAction::Retreat)
        .count();
    if retreats > 1 {
        errors.push(format!("moves: at most one retreat allowed, found {retreats}"));
    }

    errors
}

fn is_start(action: PlanAction) -> bool {
    matches!(action, PlanAction::Start | PlanAction::StartNoResupply)
}
