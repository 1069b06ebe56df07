//! Direction decisions for scrolling an indexed, partially rendered list.

use std::cmp::Ordering;

/// Which way the list must move to bring the target into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Drag content upward so higher indices scroll into view.
    RevealHigher,
    /// Drag content downward so lower indices scroll into view.
    RevealLower,
}

impl ScrollDirection {
    /// Vertical finger travel for a swipe of `distance` pixels.
    ///
    /// Negative means the finger moves up the screen.
    pub fn finger_travel(self, distance: f64) -> f64 {
        match self {
            ScrollDirection::RevealHigher => -distance,
            ScrollDirection::RevealLower => distance,
        }
    }
}

/// Decide the scroll direction from the nearest visible index.
///
/// Returns `None` when the nearest visible item already is the target.
pub fn scroll_direction(target: u32, nearest: u32) -> Option<ScrollDirection> {
    match nearest.cmp(&target) {
        Ordering::Less => Some(ScrollDirection::RevealHigher),
        Ordering::Greater => Some(ScrollDirection::RevealLower),
        Ordering::Equal => None,
    }
}
