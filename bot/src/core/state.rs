//! Mutable bookkeeping for one bot session.

use crate::core::budget::FailureBudget;
use crate::core::types::Point;

/// Session state owned by the session loop and threaded into each operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub runs_completed: u32,
    pub failure_budget: FailureBudget,
    /// Next entry of the configured dummy echelon list to deploy.
    pub dummy_deploy_index: usize,
    /// Next entry of the configured DPS echelon list to deploy.
    pub echelon_deploy_index: usize,
    /// The map re-entry recovery after a failed deploy has been spent.
    pub deploy_recovery_used: bool,
    /// Corpse dragger currently sitting in the DPS echelon, once known.
    pub active_dragger: Option<String>,
    /// Corpse dragger waiting to be swapped in, once known.
    pub inactive_dragger: Option<String>,
    pub swap_dragger_now: bool,
    /// Node recorded by a `retreat` planning move, consumed when the operation ends.
    pub pending_retreat: Option<Point>,
    /// The previous operation ended by retreating, so the game still shows the map list.
    pub retreated: bool,
    /// No operation has completed yet this session.
    pub first_time: bool,
    /// Value of `runs_completed` at the last successful repair.
    pub last_repair_run: u32,
    pub acquired: AcquiredRoster,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            runs_completed: 0,
            failure_budget: FailureBudget::default(),
            dummy_deploy_index: 0,
            echelon_deploy_index: 0,
            deploy_recovery_used: false,
            active_dragger: None,
            inactive_dragger: None,
            swap_dragger_now: false,
            pending_retreat: None,
            retreated: false,
            first_time: true,
            last_repair_run: 0,
            acquired: AcquiredRoster::default(),
        }
    }
}

impl RunState {
    pub fn reset_deploy_indices(&mut self) {
        self.dummy_deploy_index = 0;
        self.echelon_deploy_index = 0;
    }

    /// Record which dragger is in the echelon and which one goes in next.
    pub fn set_draggers(&mut self, active: String, inactive: String) {
        self.active_dragger = Some(active);
        self.inactive_dragger = Some(inactive);
    }

    /// True when a repair is due under `interval` (0 disables repairs).
    pub fn repair_due(&self, interval: u32) -> bool {
        interval > 0 && self.runs_completed.saturating_sub(self.last_repair_run) >= interval
    }
}

/// Append-only record of T-Dolls detected during the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquiredRoster {
    names: Vec<String>,
}

impl AcquiredRoster {
    pub fn push(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
