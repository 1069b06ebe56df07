//! Corpse-dragger swap between operations.
//!
//! The DPS echelon carries one of two configured draggers. Between
//! operations the bot opens that echelon's formation, works out which
//! dragger is present by OCR, and swaps in the other one through the
//! filtered T-Doll list.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::labels;
use crate::core::resolver::{Fallback, Resolution};
use crate::core::scroll::ScrollDirection;
use crate::core::state::RunState;
use crate::core::types::{Point, Region};
use crate::game::Game;
use crate::io::device::{Device, FindOptions};
use crate::scroll_search::{SCROLL_DISTANCE, ScrollList, scroll_to};

/// List scrolls while looking for the swap-in T-Doll.
pub const SWAP_SCROLLS: u32 = 5;

/// Name label relative to a formation HP bar: `(dx, dy, width, height)`.
const HP_NAME_LABEL: (i32, i32, i32, i32) = (-120, -70, 260, 50);
/// Name label relative to a captain marker in the swap list.
const CAPTAIN_NAME_LABEL: (i32, i32, i32, i32) = (-30, 40, 260, 50);

/// Swap the dragger in echelon `slot`, reached from the deploy node `node`.
///
/// Returns `false` when the swap was abandoned. Every exit path leaves the
/// formation screens.
#[instrument(skip(game, state))]
pub fn swap_dragger<D: Device>(
    game: &Game<'_, D>,
    state: &mut RunState,
    node: Point,
    slot: u32,
) -> Result<bool> {
    game.tap(node, "node")?;
    game.wait(game.timing().after_tap());
    let Some(echelon) = scroll_to(game, &ScrollList::echelons(game), slot)? else {
        warn!(slot, "dragger echelon not found, skipping swap");
        game.go_back()?;
        return Ok(false);
    };
    game.press(echelon, &labels::echelon(slot))?;
    if !game.find_and_press(labels::FORMATION, FindOptions::default())? {
        warn!("formation button not found, skipping swap");
        game.go_back()?;
        return Ok(false);
    }

    let swapped = swap_in_formation(game, state)?;
    game.go_back()?;
    game.go_back()?;
    Ok(swapped)
}

fn swap_in_formation<D: Device>(game: &Game<'_, D>, state: &mut RunState) -> Result<bool> {
    let drag = &game.config().corpse_drag;

    let Some((active, card)) = find_active_dragger(game)? else {
        warn!(
            dragger1 = %drag.dragger1,
            dragger2 = %drag.dragger2,
            "neither dragger found in formation"
        );
        return Ok(false);
    };
    let Some(target) = drag.partner_of(&active).map(str::to_string) else {
        return Ok(false);
    };
    let Some(entry) = game.resolver().entry(&target) else {
        warn!(target = %target, "swap-in dragger missing from roster");
        return Ok(false);
    };
    let rarity = entry.rarity + u8::from(drag.is_modded(&target));
    info!(active = %active, target = %target, rarity, "swapping draggers");

    game.press(card, &active)?;
    apply_filter(game, &entry.category, rarity)?;

    for attempt in 0..=SWAP_SCROLLS {
        if attempt > 0 {
            scroll_swap_list(game)?;
        }
        for captain in game.find_all(labels::FORMATION_CAPTAIN, None)? {
            let name = read_name(game, captain, CAPTAIN_NAME_LABEL)?;
            if name.as_ref().is_some_and(|r| r.name == target) {
                game.press(captain, &target)?;
                state.set_draggers(target, active);
                return Ok(true);
            }
        }
    }

    warn!(target = %target, scrolls = SWAP_SCROLLS, "swap-in dragger not found, abandoning swap");
    Ok(false)
}

/// Which configured dragger sits in the echelon, and its card position.
fn find_active_dragger<D: Device>(game: &Game<'_, D>) -> Result<Option<(String, Point)>> {
    let drag = &game.config().corpse_drag;
    for hp in game.find_all(labels::FORMATION_HP, None)? {
        let Some(resolution) = read_name(game, hp, HP_NAME_LABEL)? else {
            continue;
        };
        if resolution.name == drag.dragger1 || resolution.name == drag.dragger2 {
            return Ok(Some((resolution.name, hp)));
        }
    }
    Ok(None)
}

/// OCR a name label anchored at `origin`, thresholded first and plain as the
/// fallback.
fn read_name<D: Device>(
    game: &Game<'_, D>,
    origin: Point,
    label: (i32, i32, i32, i32),
) -> Result<Option<Resolution>> {
    let (dx, dy, width, height) = label;
    let region = Region::anchored(origin, dx, dy, width, height);
    let first = game.read_text(region, true)?;
    game.resolver()
        .resolve_two_pass(&first, || game.read_text(region, false), Fallback::Second)
}

fn apply_filter<D: Device>(game: &Game<'_, D>, category: &str, rarity: u8) -> Result<()> {
    let options = FindOptions::default();
    if !game.find_and_press(labels::FILTER, options)? {
        warn!("filter button not found, scanning unfiltered list");
        return Ok(());
    }
    game.find_and_press(&labels::filter_category(category), options)?;
    game.find_and_press(&labels::filter_rarity(rarity), options)?;
    game.find_and_press(labels::FILTER_CONFIRM, options)?;
    Ok(())
}

fn scroll_swap_list<D: Device>(game: &Game<'_, D>) -> Result<()> {
    let from = game.display().center();
    let to = from.offset(0.0, ScrollDirection::RevealHigher.finger_travel(SCROLL_DISTANCE));
    game.device().swipe(from, to)?;
    game.wait(game.timing().scroll_settle());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::{EntityResolver, RosterEntry};
    use crate::io::config::BotConfig;
    use crate::test_support::ScriptedDevice;

    fn resolver() -> EntityResolver {
        let entry = |id: &str, name: &str, category: &str, rarity: u8| RosterEntry {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            rarity,
        };
        EntityResolver::new(vec![
            entry("1", "M4A1", "AR", 4),
            entry("2", "Saiga-12", "SG", 5),
            entry("3", "Type 97S", "SG", 4),
        ])
    }

    fn drag_config() -> BotConfig {
        let mut config = BotConfig::default();
        config.corpse_drag.enable = true;
        config.corpse_drag.dragger1 = "Saiga-12".to_string();
        config.corpse_drag.dragger2 = "Type 97S".to_string();
        config.corpse_drag.dragger2_mod = true;
        config
    }

    fn formation_device() -> ScriptedDevice {
        let device = ScriptedDevice::new();
        for label in [
            "echelon2",
            labels::FORMATION,
            labels::FILTER,
            "filter_sg",
            "filter_5star",
            labels::FILTER_CONFIRM,
            labels::BACK,
        ] {
            device.present(label, Point::new(50.0, 50.0));
        }
        device
    }

    #[test]
    fn swaps_in_the_partner_with_modded_rarity() {
        let device = formation_device();
        device
            .find_all_default(labels::FORMATION_HP, vec![Point::new(400.0, 900.0)])
            .queue_find_all(
                labels::FORMATION_CAPTAIN,
                [vec![Point::new(300.0, 300.0), Point::new(700.0, 300.0)]],
            )
            .queue_reads(["Saiga-12", "M4A1", "Type 97S"]);
        let config = drag_config();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);
        let mut state = RunState::default();

        let swapped = swap_dragger(&game, &mut state, Point::new(900.0, 650.0), 2).expect("swap");
        assert!(swapped);
        assert_eq!(state.active_dragger.as_deref(), Some("Type 97S"));
        assert_eq!(state.inactive_dragger.as_deref(), Some("Saiga-12"));
        let taps = device.taps();
        assert!(taps.contains(&"filter_5star".to_string()), "{taps:?}");
        assert!(taps.contains(&"Type 97S".to_string()), "{taps:?}");
        assert_eq!(device.tap_count(labels::BACK), 2);
    }

    #[test]
    fn abandons_when_partner_never_appears() {
        let device = formation_device();
        device
            .find_all_default(labels::FORMATION_HP, vec![Point::new(400.0, 900.0)])
            .queue_reads(["Type 97S"]);
        let config = drag_config();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);
        let mut state = RunState::default();

        let swapped = swap_dragger(&game, &mut state, Point::new(900.0, 650.0), 2).expect("swap");
        assert!(!swapped);
        assert_eq!(state.active_dragger, None);
        assert_eq!(device.swipes().len(), SWAP_SCROLLS as usize);
        assert!(device.taps().contains(&"filter_5star".to_string()));
        assert_eq!(device.tap_count(labels::BACK), 2);
    }

    #[test]
    fn unknown_formation_skips_swap() {
        let device = formation_device();
        device
            .find_all_default(labels::FORMATION_HP, vec![Point::new(400.0, 900.0)])
            .queue_reads(["M4A1"]);
        let config = drag_config();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);
        let mut state = RunState::default();

        let swapped = swap_dragger(&game, &mut state, Point::new(900.0, 650.0), 2).expect("swap");
        assert!(!swapped);
        assert_eq!(device.tap_count(labels::FILTER), 0);
    }
}
