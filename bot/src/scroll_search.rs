//! Scroll-to-index search over the echelon and chapter lists.
//!
//! Both lists render only a window of their numbered entries. The search
//! probes for the exact entry first; when that misses it finds the nearest
//! visible entry, swipes toward the target, lets the list settle and
//! re-probes for the target at a stricter confidence.

use std::ops::Range;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::labels;
use crate::core::map_name::chapter_label;
use crate::core::scroll::scroll_direction;
use crate::core::types::{Point, Region};
use crate::game::Game;
use crate::io::device::{Device, FindOptions};

/// Vertical finger travel of one list swipe, in pixels.
pub const SCROLL_DISTANCE: f64 = 400.0;
/// Confidence required when re-probing for the target after a swipe.
pub const STRICT_CONFIDENCE: f64 = 0.95;
/// Scroll + re-probe cycles before giving up.
pub const MAX_SCROLL_CYCLES: u32 = 10;

/// A numbered, partially rendered list.
#[derive(Debug, Clone)]
pub struct ScrollList {
    pub name: &'static str,
    pub label: fn(u32) -> String,
    /// Indices scanned, in order, when looking for the nearest visible entry.
    pub indices: Range<u32>,
    /// Full scans of `indices` before concluding nothing is visible.
    pub scan_rounds: u32,
    pub region: Region,
}

impl ScrollList {
    /// Echelon slots 1 to 10 in the deployment picker.
    pub fn echelons<D: Device>(game: &Game<'_, D>) -> Self {
        Self {
            name: "echelon",
            label: labels::echelon,
            indices: 1..11,
            scan_rounds: 1,
            region: game.display().left_half(),
        }
    }

    /// Chapter buttons below `game.max_chapter` in the combat menu.
    pub fn chapters<D: Device>(game: &Game<'_, D>) -> Self {
        Self {
            name: "chapter",
            label: chapter_label,
            indices: 0..game.config().game.max_chapter,
            scan_rounds: 5,
            region: game.display().left_half(),
        }
    }
}

/// Bring entry `target` of `list` into view and return where it is.
///
/// Returns `Ok(None)` when no entry is visible at all or the target is still
/// missing after [`MAX_SCROLL_CYCLES`] swipes. The caller decides whether that
/// is fatal.
#[instrument(skip(game, list), fields(list = list.name))]
pub fn scroll_to<D: Device>(
    game: &Game<'_, D>,
    list: &ScrollList,
    target: u32,
) -> Result<Option<Point>> {
    let target_label = (list.label)(target);
    if let Some(point) = game.find(&target_label, FindOptions::default().region(list.region))? {
        debug!(target, "target already visible");
        return Ok(Some(point));
    }

    let center = game.display().center();
    for cycle in 1..=MAX_SCROLL_CYCLES {
        let Some((nearest, at)) = nearest_visible(game, list)? else {
            warn!(target, "no {} entries visible", list.name);
            return Ok(None);
        };
        let Some(direction) = scroll_direction(target, nearest) else {
            return Ok(Some(at));
        };
        info!(
            target,
            nearest,
            cycle,
            ?direction,
            "scrolling {} list",
            list.name
        );
        let from = Point::new(at.x, center.y);
        let to = from.offset(0.0, direction.finger_travel(SCROLL_DISTANCE));
        game.device().swipe(from, to)?;
        game.wait(game.timing().scroll_settle());

        let strict = FindOptions::default()
            .region(list.region)
            .confidence(STRICT_CONFIDENCE);
        if let Some(point) = game.find(&target_label, strict)? {
            return Ok(Some(point));
        }
    }

    warn!(
        target,
        cycles = MAX_SCROLL_CYCLES,
        "{} still not visible",
        list.name
    );
    Ok(None)
}

/// First visible entry when scanning `list.indices` in order.
fn nearest_visible<D: Device>(
    game: &Game<'_, D>,
    list: &ScrollList,
) -> Result<Option<(u32, Point)>> {
    let options = FindOptions::default().region(list.region).tries(1);
    for _ in 0..list.scan_rounds {
        for index in list.indices.clone() {
            if let Some(point) = game.find(&(list.label)(index), options)? {
                return Ok(Some((index, point)));
            }
        }
    }
    Ok(None)
}
