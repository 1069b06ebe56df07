//! Session loop for `gfl-bot run`.
//!
//! Repeats navigate -> operate -> settle until the target run count is
//! reached. Every cycle that leaves `runs_completed` unchanged consumes one
//! unit of the failure budget; exhausting it stops the session.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::error::FatalError;
use crate::core::labels;
use crate::core::map_name::MapName;
use crate::core::state::RunState;
use crate::core::types::MapScript;
use crate::factory::clear_insufficient_slots;
use crate::game::Game;
use crate::io::device::{Device, FindOptions};
use crate::navigator::{enter_map, enter_map_after_retreat};
use crate::operation::{Operation, OperationEnd};
use crate::repair::repair_if_due;
use crate::reward;

/// Probes for the settlement screen after a completed operation.
pub const SETTLEMENT_PROBES: u32 = 5;
/// Dialogs dismissed after settlement before moving on.
pub const MAX_DIALOGS: u32 = 3;

/// Reason why `run_session` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStop {
    /// `runs_completed` reached the configured amount.
    TargetReached,
    /// A terminal error ended the session.
    Fatal(FatalError),
}

/// What a single cycle of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// An operation ran and the settlement screen was seen (or a planned retreat finished).
    Completed,
    /// An operation ran but its end could not be confirmed.
    Inconclusive,
    /// Inventory was full; the cycle went to the factory instead.
    Diverted { dismantled: bool },
}

/// Progress line emitted after every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub runs_completed: u32,
    pub target: u32,
    pub failure_budget: i32,
}

/// Run cycles until the target is reached or a terminal error occurs.
///
/// [`FatalError`]s become [`SessionStop::Fatal`]; any other error (a failing
/// device collaborator) is returned as `Err`. `state` stays with the caller
/// in both cases so it can be reported.
#[instrument(skip_all, fields(map = %map, target = game.config().game.amount))]
pub fn run_session<D: Device, F: FnMut(&CycleReport)>(
    game: &Game<'_, D>,
    script: &MapScript,
    map: &MapName,
    state: &mut RunState,
    mut on_cycle: F,
) -> Result<SessionStop> {
    match run_cycles(game, script, map, state, &mut on_cycle) {
        Ok(()) => Ok(SessionStop::TargetReached),
        Err(err) => match err.downcast_ref::<FatalError>() {
            Some(fatal) => {
                warn!(error = %fatal, "session stopped");
                Ok(SessionStop::Fatal(fatal.clone()))
            }
            None => Err(err),
        },
    }
}

fn run_cycles<D: Device, F: FnMut(&CycleReport)>(
    game: &Game<'_, D>,
    script: &MapScript,
    map: &MapName,
    state: &mut RunState,
    on_cycle: &mut F,
) -> Result<()> {
    let target = game.config().game.amount;
    while state.runs_completed < target {
        let before = state.runs_completed;
        let outcome = run_cycle(game, script, map, state)?;

        let progressed = state.runs_completed > before;
        let diverted_ok = outcome == CycleOutcome::Diverted { dismantled: true };
        if !progressed && !diverted_ok && state.failure_budget.consume() {
            return Err(FatalError::NoProgress {
                runs_completed: state.runs_completed,
            }
            .into());
        }

        info!(
            ?outcome,
            runs = state.runs_completed,
            target,
            budget = state.failure_budget.remaining(),
            "cycle finished"
        );
        on_cycle(&CycleReport {
            outcome,
            runs_completed: state.runs_completed,
            target,
            failure_budget: state.failure_budget.remaining(),
        });
    }
    Ok(())
}

fn run_cycle<D: Device>(
    game: &Game<'_, D>,
    script: &MapScript,
    map: &MapName,
    state: &mut RunState,
) -> Result<CycleOutcome> {
    if state.retreated {
        enter_map_after_retreat(game, map)?;
    } else {
        let combat_active = game.is_visible(labels::COMBAT_SCREEN, None)?;
        if !combat_active {
            if !game.is_visible(labels::HOME, None)? {
                return Err(FatalError::NotAtHome.into());
            }
            repair_if_due(game, state)?;
        }
        enter_map(game, map, combat_active)?;
    }

    if game.is_visible(labels::INSUFFICIENT_SLOTS, None)? {
        warn!("insufficient T-Doll slots, dismantling before the next run");
        state.retreated = false;
        let dismantled = clear_insufficient_slots(game)?;
        return Ok(CycleOutcome::Diverted { dismantled });
    }

    let end = Operation::new(game, script, map).run(state)?;
    if end == OperationEnd::Retreated {
        state.runs_completed += 1;
        return Ok(CycleOutcome::Completed);
    }
    settle(game, state)
}

fn settle<D: Device>(game: &Game<'_, D>, state: &mut RunState) -> Result<CycleOutcome> {
    let options = FindOptions::default().tries(SETTLEMENT_PROBES);
    let Some(settlement) = game.find(labels::SETTLEMENT, options)? else {
        warn!("settlement screen not detected, treating operation as inconclusive");
        dismiss_dialogs(game)?;
        return Ok(CycleOutcome::Inconclusive);
    };

    game.press(settlement, labels::SETTLEMENT)?;
    game.wait(game.timing().screen_transition());
    reward::detect(game, state)?;
    dismiss_dialogs(game)?;
    state.runs_completed += 1;
    info!(runs = state.runs_completed, "run completed");
    Ok(CycleOutcome::Completed)
}

fn dismiss_dialogs<D: Device>(game: &Game<'_, D>) -> Result<()> {
    for _ in 0..MAX_DIALOGS {
        if !game.find_and_press(labels::DIALOG_CLOSE, FindOptions::default().tries(1))? {
            break;
        }
    }
    Ok(())
}
