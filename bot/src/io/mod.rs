//! Side-effecting adapters: device bridge, config, script/roster files and reports.

pub mod bridge;
pub mod config;
pub mod device;
pub mod process;
pub mod report;
pub mod roster;
pub mod script;
