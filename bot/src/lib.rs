//! Orchestration and decision engine for an automated Girls' Frontline session.
//!
//! The bot sees the game only through image matching, gestures and OCR, so
//! every decision is made by polling, scrolling and retrying. The crate keeps
//! a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (resolver, scroll direction,
//!   budgets, script invariants, session state). No I/O.
//! - **[`io`]**: Side-effecting adapters (device bridge, config, map script
//!   and roster files, session report). Device access goes through the
//!   traits in [`io::device`] so tests can script the screen.
//!
//! Orchestration modules ([`navigator`], [`scroll_search`], [`operation`],
//! [`corpse_drag`], [`reward`], [`factory`], [`repair`], [`session`]) combine
//! the two through a shared [`game::Game`] context.

pub mod core;
pub mod corpse_drag;
pub mod exit_codes;
pub mod factory;
pub mod game;
pub mod io;
pub mod logging;
pub mod navigator;
pub mod operation;
pub mod repair;
pub mod reward;
pub mod scroll_search;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
