//! Stable exit codes for gfl-bot CLI commands.

/// Command succeeded or the session reached its target run count.
pub const OK: i32 = 0;
/// Invalid config, map script, roster or other setup errors.
pub const INVALID: i32 = 1;
/// The session stopped on a terminal error (navigation, deploy, resources...).
pub const FATAL: i32 = 2;
/// The session stopped after exhausting its failure budget.
pub const NO_PROGRESS: i32 = 3;
