//! One combat operation: prepare the map, lay out the plan, execute it,
//! poll until it ends, then end the round or retreat.
//!
//! ```text
//! Preparing -> Started -> PlanningLayout -> Executing
//!     -> (CombatPolling <-> DetectingReward) -> Ended -> (Retreating | Resetting)
//! ```
//!
//! Expected misses (a resupply press, an OCR read) only log. Conditions the
//! bot cannot recover from surface as [`FatalError`].

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::budget::PollCountdown;
use crate::core::error::FatalError;
use crate::core::labels;
use crate::core::map_name::MapName;
use crate::core::state::RunState;
use crate::core::types::{MapScript, PlanAction, Point, SetupAction, SetupStep};
use crate::corpse_drag::swap_dragger;
use crate::game::Game;
use crate::io::device::{Device, FindOptions};
use crate::navigator::enter_map_after_retreat;
use crate::reward;
use crate::scroll_search::{ScrollList, scroll_to};

/// Probes for the map to finish loading.
pub const MAP_LOAD_PROBES: u32 = 30;
/// Probes for the planning-mode marker before laying out moves.
pub const PLANNING_PROBES: u32 = 30;
/// Resupply button presses attempted before moving on.
pub const RESUPPLY_ATTEMPTS: u32 = 5;
/// Consecutive polls with the end-round button still present that end an operation.
pub const END_ROUND_POLLS: u32 = 10;
/// Finger spacing of the zoom-reset pinch, fully apart to fully together.
pub const ZOOM_RESET_SPACING: (f64, f64) = (900.0, 100.0);

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationEnd {
    /// The round was ended normally.
    Completed,
    /// A planned retreat was carried out and the mission terminated.
    Retreated,
}

/// Drives one operation on an already entered map.
pub struct Operation<'g, 'a, D: Device> {
    game: &'g Game<'a, D>,
    script: &'g MapScript,
    map: &'g MapName,
}

impl<'g, 'a, D: Device> Operation<'g, 'a, D> {
    pub fn new(game: &'g Game<'a, D>, script: &'g MapScript, map: &'g MapName) -> Self {
        Self { game, script, map }
    }

    /// Run every phase of the operation.
    #[instrument(skip_all, fields(map = %self.map, runs = state.runs_completed))]
    pub fn run(&self, state: &mut RunState) -> Result<OperationEnd> {
        self.prepare(state)?;
        self.start()?;
        self.lay_out_plan(state)?;
        self.execute(state)?;
        self.end(state)
    }

    fn prepare(&self, state: &mut RunState) -> Result<()> {
        self.confirm_map_loaded()?;
        info!("starting preparation");
        state.reset_deploy_indices();
        if state.first_time {
            self.reset_zoom(None)?;
        }

        let first_deploy = self.script.setup.iter().position(|s| s.action.is_deploy());
        for (idx, step) in self.script.setup.iter().enumerate() {
            debug!(idx, action = ?step.action, "setup step");
            match step.action {
                SetupAction::PinchIn | SetupAction::PinchOut => self.pinch(step)?,
                SetupAction::SwipeUp | SetupAction::SwipeDown => self.pan(step)?,
                SetupAction::DeployDummy | SetupAction::DeployEchelon => {
                    let node = node_of(step)?;
                    if Some(idx) == first_deploy && state.swap_dragger_now {
                        self.swap_before_deploy(state, idx, node)?;
                    }
                    self.deploy(state, idx, step.action, node)?;
                }
            }
        }
        info!("finished preparation");
        Ok(())
    }

    fn confirm_map_loaded(&self) -> Result<()> {
        let options = FindOptions::default()
            .region(self.game.display().lower_half())
            .tries(MAP_LOAD_PROBES);
        if self.game.find(labels::START_OPERATION, options)?.is_none() {
            return Err(FatalError::MapNotLoaded {
                map: self.map.to_string(),
                tries: MAP_LOAD_PROBES,
            }
            .into());
        }
        Ok(())
    }

    fn pinch(&self, step: &SetupStep) -> Result<()> {
        let [start, end] = spacing_of(step)?;
        info!(start, end, "zooming map");
        self.game
            .device()
            .pinch(self.game.display().center(), start, end)?;
        self.game.wait(self.game.timing().zoom_settle());
        Ok(())
    }

    fn pan(&self, step: &SetupStep) -> Result<()> {
        let [distance, _] = spacing_of(step)?;
        let travel = if step.action == SetupAction::SwipeUp {
            -distance
        } else {
            distance
        };
        let from = self.game.display().center();
        info!(travel, "panning map");
        self.game.device().swipe(from, from.offset(0.0, travel))?;
        self.game.wait(self.game.timing().scroll_settle());
        Ok(())
    }

    /// Pinch back to the canonical zoom, then optionally replay the pan and
    /// zoom steps that come before setup step `replay_until`.
    fn reset_zoom(&self, replay_until: Option<usize>) -> Result<()> {
        info!("resetting map zoom");
        let center = self.game.display().center();
        let (start, end) = ZOOM_RESET_SPACING;
        for _ in 0..2 {
            self.game.device().pinch(center, start, end)?;
            self.game.wait(self.game.timing().zoom_settle());
        }
        let Some(until) = replay_until else {
            return Ok(());
        };
        for step in self.script.setup.iter().take(until) {
            match step.action {
                SetupAction::PinchIn | SetupAction::PinchOut => self.pinch(step)?,
                SetupAction::SwipeUp | SetupAction::SwipeDown => self.pan(step)?,
                SetupAction::DeployDummy | SetupAction::DeployEchelon => {}
            }
        }
        Ok(())
    }

    fn swap_before_deploy(&self, state: &mut RunState, idx: usize, node: Point) -> Result<()> {
        let config = self.game.config();
        if config.corpse_drag.enable {
            if let Some(&slot) = config.game.dps_echelons.first() {
                if !swap_dragger(self.game, state, node, slot)? {
                    warn!("corpse drag swap skipped");
                }
                self.reset_zoom(Some(idx))?;
            }
        }
        state.swap_dragger_now = false;
        Ok(())
    }

    /// Deploy the next echelon of `action`'s kind on `node`. The first failed
    /// deploy of the session re-enters the map and retries once; any later
    /// failure is fatal.
    fn deploy(
        &self,
        state: &mut RunState,
        idx: usize,
        action: SetupAction,
        node: Point,
    ) -> Result<()> {
        let game_config = &self.game.config().game;
        let (slots, index) = if action == SetupAction::DeployDummy {
            (&game_config.dummy_echelons, state.dummy_deploy_index)
        } else {
            (&game_config.dps_echelons, state.echelon_deploy_index)
        };
        let Some(&slot) = slots.get(index) else {
            return Err(FatalError::DeployFailed {
                slot: 0,
                reason: format!("no {action:?} slot configured at position {index}"),
            }
            .into());
        };

        info!(slot, x = node.x, y = node.y, "deploying echelon");
        if !self.try_deploy(node, slot)? {
            if state.deploy_recovery_used {
                return Err(FatalError::DeployFailed {
                    slot,
                    reason: "recovery already used this session".to_string(),
                }
                .into());
            }
            warn!(slot, "deploy failed, re-entering map to recover");
            state.deploy_recovery_used = true;
            self.game.go_back()?;
            enter_map_after_retreat(self.game, self.map)?;
            self.confirm_map_loaded()?;
            self.reset_zoom(Some(idx))?;
            if !self.try_deploy(node, slot)? {
                return Err(FatalError::DeployFailed {
                    slot,
                    reason: "failed again after recovery".to_string(),
                }
                .into());
            }
        }

        if action == SetupAction::DeployDummy {
            state.dummy_deploy_index += 1;
        } else {
            state.echelon_deploy_index += 1;
        }
        Ok(())
    }

    fn try_deploy(&self, node: Point, slot: u32) -> Result<bool> {
        self.game.tap(node, "node")?;
        self.game.wait(self.game.timing().after_tap());
        let Some(echelon) = scroll_to(self.game, &ScrollList::echelons(self.game), slot)? else {
            return Ok(false);
        };
        self.game.tap(echelon, &labels::echelon(slot))?;
        self.game
            .find_and_press(labels::CHOOSE_ECHELON_OK, FindOptions::default())
    }

    fn start(&self) -> Result<()> {
        if !self
            .game
            .find_and_press(labels::START_OPERATION, FindOptions::default())?
        {
            return Err(
                FatalError::PlanningUnavailable("start operation button not found".to_string())
                    .into(),
            );
        }
        Ok(())
    }

    fn lay_out_plan(&self, state: &mut RunState) -> Result<()> {
        self.game.wait(self.game.timing().screen_transition());
        let options = FindOptions::default().tries(PLANNING_PROBES);
        if self.game.find(labels::PLANNING_MODE, options)?.is_none() {
            return Err(
                FatalError::PlanningUnavailable("planning mode marker never appeared".to_string())
                    .into(),
            );
        }

        info!(moves = self.script.moves.len(), "laying out planning moves");
        let resupply_on_start = !self.game.config().corpse_drag.enable || state.first_time;
        for plan_move in &self.script.moves {
            let node = plan_move.coordinates;
            match plan_move.action {
                PlanAction::Start => {
                    if resupply_on_start {
                        self.resupply(node)?;
                    }
                    self.enter_planning_mode(node)?;
                }
                PlanAction::StartNoResupply => self.enter_planning_mode(node)?,
                PlanAction::Resupply => self.resupply(node)?,
                PlanAction::Move => {
                    self.game.tap(node, "node")?;
                    self.game.wait(self.game.timing().node_double_tap());
                }
                PlanAction::Retreat => {
                    debug!(x = node.x, y = node.y, "retreat recorded");
                    state.pending_retreat = Some(node);
                }
            }
        }
        Ok(())
    }

    fn resupply(&self, node: Point) -> Result<()> {
        self.game.tap(node, "node")?;
        self.game.wait(self.game.timing().node_double_tap());
        self.game.tap(node, "node")?;
        for attempt in 1..=RESUPPLY_ATTEMPTS {
            if self
                .game
                .find_and_press(labels::RESUPPLY, FindOptions::default().tries(1))?
            {
                return Ok(());
            }
            debug!(attempt, "resupply button not found");
            self.game.wait(self.game.timing().resupply_retry());
        }
        warn!(attempts = RESUPPLY_ATTEMPTS, "resupply skipped");
        Ok(())
    }

    fn enter_planning_mode(&self, node: Point) -> Result<()> {
        if !self
            .game
            .find_and_press(labels::PLANNING_MODE, FindOptions::default())?
        {
            return Err(FatalError::PlanningUnavailable(
                "planning mode button not found or obscured".to_string(),
            )
            .into());
        }
        self.game.tap(node, "node")
    }

    fn execute(&self, state: &mut RunState) -> Result<()> {
        if !self
            .game
            .find_and_press(labels::EXECUTE_PLAN, FindOptions::default())?
        {
            return Err(
                FatalError::PlanningUnavailable("execute plan button not found".to_string())
                    .into(),
            );
        }
        info!("plan executing, waiting for the operation to end");

        let region = self.game.display().lower_half();
        let mut countdown = PollCountdown::new(END_ROUND_POLLS);
        while !countdown.is_done() {
            self.check_resources()?;
            let vanished = self.game.device().wait_until_gone(
                labels::END_ROUND,
                Some(region),
                self.game.timing().end_round_vanish(),
            )?;
            if vanished || self.game.is_visible(labels::COMBAT_PAUSE, None)? {
                info!("end round button vanished, echelon in combat");
                countdown.reset();
                self.wait_for_combat(state)?;
            } else {
                countdown.tick();
                debug!(left = countdown.left(), "end round button still present");
            }
        }
        info!("operation considered ended");
        Ok(())
    }

    fn check_resources(&self) -> Result<()> {
        if self.game.is_visible(labels::RESOURCES_WARNING, None)? {
            return Err(FatalError::ResourcesExhausted.into());
        }
        Ok(())
    }

    fn wait_for_combat(&self, state: &mut RunState) -> Result<()> {
        let timing = self.game.timing();
        let mut ended = false;
        for _ in 0..timing.combat_max_polls {
            self.check_resources()?;
            if !self.game.is_visible(labels::COMBAT_PAUSE, None)? {
                ended = true;
                break;
            }
            self.game.wait(timing.combat_poll());
        }
        if !ended {
            warn!(polls = timing.combat_max_polls, "combat still running, resuming checks");
        }
        reward::detect(self.game, state)?;
        Ok(())
    }

    fn end(&self, state: &mut RunState) -> Result<OperationEnd> {
        let end = match state.pending_retreat.take() {
            Some(node) => {
                self.retreat(node)?;
                state.retreated = true;
                OperationEnd::Retreated
            }
            None => {
                if !self
                    .game
                    .find_and_press(labels::END_ROUND, FindOptions::default())?
                {
                    warn!("end round button not found");
                }
                self.game
                    .find_and_press(labels::END_ROUND_CONFIRM, FindOptions::default().tries(1))?;
                self.game.wait(self.game.timing().screen_transition());
                state.retreated = false;
                OperationEnd::Completed
            }
        };

        state.reset_deploy_indices();
        state.swap_dragger_now =
            self.game.config().corpse_drag.enable && end == OperationEnd::Completed;
        state.first_time = false;
        info!(?end, "operation ended");
        Ok(end)
    }

    fn retreat(&self, node: Point) -> Result<()> {
        info!(x = node.x, y = node.y, "retreating echelon");
        self.reset_zoom(Some(self.script.setup.len()))?;
        self.game.tap(node, "node")?;
        self.game.wait(self.game.timing().node_double_tap());
        self.game.tap(node, "node")?;
        self.game.wait(self.game.timing().after_tap());
        for label in [
            labels::RETREAT,
            labels::RETREAT_CONFIRM,
            labels::TERMINATE_MISSION,
            labels::TERMINATE_MISSION_CONFIRM,
        ] {
            if !self.game.find_and_press(label, FindOptions::default())? {
                warn!(label, "retreat button not found");
            }
        }
        self.game.wait(self.game.timing().screen_transition());
        Ok(())
    }
}

fn node_of(step: &SetupStep) -> Result<Point> {
    step.coordinates
        .ok_or_else(|| anyhow!("{:?} step has no coordinates", step.action))
}

fn spacing_of(step: &SetupStep) -> Result<[f64; 2]> {
    step.spacing
        .ok_or_else(|| anyhow!("{:?} step has no spacing", step.action))
}
