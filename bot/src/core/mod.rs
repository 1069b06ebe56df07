//! Deterministic, pure logic shared by the bot.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod budget;
pub mod error;
pub mod labels;
pub mod map_name;
pub mod resolver;
pub mod scroll;
pub mod script;
pub mod state;
pub mod types;
