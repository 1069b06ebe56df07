//! Terminal failures that end a bot session.
//!
//! Expected misses are modelled as `Option`/`bool` at the call site; only the
//! conditions below unwind to the session boundary. They travel inside
//! `anyhow::Error` and are recovered there with `downcast_ref`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("game failed to load into map {map} after {tries} probes")]
    MapNotLoaded { map: String, tries: u32 },
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("failed to deploy echelon {slot}: {reason}")]
    DeployFailed { slot: u32, reason: String },
    #[error("planning mode unavailable: {0}")]
    PlanningUnavailable(String),
    #[error("out of resources warning appeared during combat")]
    ResourcesExhausted,
    #[error("bot is not at the home screen and cannot relocate")]
    NotAtHome,
    #[error("no progress after exhausting the failure budget ({runs_completed} runs completed)")]
    NoProgress { runs_completed: u32 },
}
