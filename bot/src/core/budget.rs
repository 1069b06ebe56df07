//! Bounded retry counters shared by the session loop and the combat poller.

/// Session-wide allowance of operation cycles that make no forward progress.
///
/// Starts at [`FailureBudget::INITIAL`] and never resets. The session stops
/// once a consumption drives it below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureBudget {
    remaining: i32,
}

impl FailureBudget {
    pub const INITIAL: i32 = 5;

    pub fn new(initial: i32) -> Self {
        Self { remaining: initial }
    }

    pub fn remaining(&self) -> i32 {
        self.remaining
    }

    /// Record one no-progress cycle. Returns `true` once the budget is exhausted.
    pub fn consume(&mut self) -> bool {
        self.remaining -= 1;
        self.remaining < 0
    }
}

impl Default for FailureBudget {
    fn default() -> Self {
        Self::new(Self::INITIAL)
    }
}

/// Countdown used while polling for the end of an operation.
///
/// Each quiet poll ticks it down; observing combat resets it to full. The
/// operation is considered concluded when it reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCountdown {
    full: u32,
    left: u32,
}

impl PollCountdown {
    pub fn new(full: u32) -> Self {
        Self { full, left: full }
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn is_done(&self) -> bool {
        self.left == 0
    }

    pub fn tick(&mut self) {
        self.left = self.left.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.left = self.full;
    }
}
