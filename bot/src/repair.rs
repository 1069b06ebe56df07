//! Periodic repair of damaged T-Dolls with quick-repair tickets.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::labels;
use crate::core::state::RunState;
use crate::game::Game;
use crate::io::device::{Device, FindOptions};

/// Run the repair flow when `state` says one is due. Failures only warn.
#[instrument(skip_all, fields(runs = state.runs_completed))]
pub fn repair_if_due<D: Device>(game: &Game<'_, D>, state: &mut RunState) -> Result<bool> {
    let interval = game.config().repair.effective_interval();
    if !state.repair_due(interval) {
        return Ok(false);
    }
    let repaired = repair(game)?;
    if repaired {
        state.last_repair_run = state.runs_completed;
        info!("repair complete");
    } else {
        warn!("repair did not complete, continuing");
    }
    Ok(repaired)
}

/// Repair bay, quick repair, confirm tickets, back out.
pub fn repair<D: Device>(game: &Game<'_, D>) -> Result<bool> {
    if !game.find_and_press(labels::REPAIR, FindOptions::default())? {
        return Ok(false);
    }
    game.wait(game.timing().screen_transition());
    let repaired = game.find_and_press(labels::REPAIR_QUICK, FindOptions::default())?
        && game.find_and_press(labels::REPAIR_CONFIRM, FindOptions::default())?;
    game.go_back()?;
    Ok(repaired)
}
