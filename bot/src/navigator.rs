//! Navigation from the home screen (or the combat screen) into a map.

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::error::FatalError;
use crate::core::labels;
use crate::core::map_name::{MapName, chapter_label};
use crate::core::scroll::ScrollDirection;
use crate::core::types::Point;
use crate::game::Game;
use crate::io::device::{Device, FindOptions};
use crate::scroll_search::{SCROLL_DISTANCE, ScrollList, scroll_to};

/// Map list swipes attempted before the map is declared missing.
pub const MAP_LIST_SCROLLS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStage {
    AtHome,
    EnteringCombatMenu,
    CheckingEpisode,
    ScrollingToEpisode,
    SelectingMap,
    ScrollingMapList,
    Done,
}

/// Enter `map` and press its normal-battle button.
///
/// With `combat_active` the combat menu is already open, so the walk starts
/// at the episode check.
#[instrument(skip(game), fields(map = %map))]
pub fn enter_map<D: Device>(game: &Game<'_, D>, map: &MapName, combat_active: bool) -> Result<()> {
    let start = if combat_active {
        NavStage::CheckingEpisode
    } else {
        NavStage::AtHome
    };
    navigate(game, map, start)
}

/// Re-enter `map` after a retreat.
///
/// The game keeps the episode selected, so only map selection (and its
/// list scrolling) runs.
#[instrument(skip(game), fields(map = %map))]
pub fn enter_map_after_retreat<D: Device>(game: &Game<'_, D>, map: &MapName) -> Result<()> {
    navigate(game, map, NavStage::SelectingMap)
}

fn navigate<D: Device>(game: &Game<'_, D>, map: &MapName, start: NavStage) -> Result<()> {
    let mut stage = start;
    let mut map_list_scrolls = 0u32;
    while stage != NavStage::Done {
        debug!(?stage, "navigation stage");
        stage = match stage {
            NavStage::AtHome => NavStage::EnteringCombatMenu,
            NavStage::EnteringCombatMenu => {
                if !game.find_and_press(labels::COMBAT_MENU, FindOptions::default())? {
                    return Err(
                        FatalError::Navigation("combat menu button not found".to_string()).into(),
                    );
                }
                game.wait(game.timing().screen_transition());
                NavStage::CheckingEpisode
            }
            NavStage::CheckingEpisode => {
                let episode = map.episode_label();
                let region = game.display().upper_half();
                if game.find(&episode, FindOptions::default().region(region))?.is_some() {
                    info!(episode = %episode, "already at the correct episode");
                    NavStage::SelectingMap
                } else {
                    info!(episode = %episode, "navigating to episode");
                    NavStage::ScrollingToEpisode
                }
            }
            NavStage::ScrollingToEpisode => {
                let chapter = map.chapter();
                let list = ScrollList::chapters(game);
                let Some(point) = scroll_to(game, &list, chapter)? else {
                    return Err(FatalError::Navigation(format!(
                        "chapter {chapter} not found in the chapter list"
                    ))
                    .into());
                };
                game.press(point, &chapter_label(chapter))?;
                NavStage::SelectingMap
            }
            NavStage::SelectingMap => {
                if game.find_and_press(&map.map_label(), FindOptions::default())? {
                    NavStage::Done
                } else {
                    NavStage::ScrollingMapList
                }
            }
            NavStage::ScrollingMapList => {
                if map_list_scrolls == MAP_LIST_SCROLLS {
                    return Err(FatalError::Navigation(format!(
                        "map {map} not found after {MAP_LIST_SCROLLS} map list scrolls"
                    ))
                    .into());
                }
                map_list_scrolls += 1;
                warn!(attempt = map_list_scrolls, "map not visible, scrolling map list");
                scroll_map_list(game)?;
                NavStage::SelectingMap
            }
            NavStage::Done => NavStage::Done,
        };
    }

    if !game.find_and_press(labels::NORMAL_BATTLE, FindOptions::default())? {
        return Err(
            FatalError::Navigation(format!("normal battle button for {map} not found")).into(),
        );
    }
    info!("entered map");
    Ok(())
}

fn scroll_map_list<D: Device>(game: &Game<'_, D>) -> Result<()> {
    let center = game.display().center();
    let from = Point::new(center.x * 1.5, center.y);
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
        EntityResolver::new(vec![RosterEntry {
            id: "1".to_string(),
            name: "M4A1".to_string(),
            category: "AR".to_string(),
            rarity: 4,
        }])
    }

    fn fatal(err: &anyhow::Error) -> &FatalError {
        err.downcast_ref::<FatalError>().expect("fatal error")
    }

    #[test]
    fn from_home_at_correct_episode() {
        let device = ScriptedDevice::new();
        device
            .present(labels::COMBAT_MENU, Point::new(1.0, 1.0))
            .present("ep00", Point::new(2.0, 2.0))
            .present("map0-2", Point::new(3.0, 3.0))
            .present(labels::NORMAL_BATTLE, Point::new(4.0, 4.0));
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        enter_map(&game, &MapName::parse("0-2").expect("map"), false).expect("enter");
        assert_eq!(
            device.taps(),
            vec!["combat_menu", "map0-2", "normal_battle"]
        );
    }

    #[test]
    fn combat_active_skips_combat_menu_and_scrolls_to_chapter() {
        let device = ScriptedDevice::new();
        device
            .present("ch04", Point::new(200.0, 500.0))
            .present("map4-3e", Point::new(3.0, 3.0))
            .present(labels::NORMAL_BATTLE, Point::new(4.0, 4.0));
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        enter_map(&game, &MapName::parse("4-3e").expect("map"), true).expect("enter");
        assert_eq!(device.tap_count(labels::COMBAT_MENU), 0);
        assert_eq!(device.taps(), vec!["ch04", "map4-3e", "normal_battle"]);
        assert!(device.swipes().is_empty());
    }

    #[test]
    fn scrolls_map_list_then_gives_up() {
        let device = ScriptedDevice::new();
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        let err = enter_map_after_retreat(&game, &MapName::parse("0-2").expect("map"))
            .expect_err("map never appears");
        assert!(matches!(fatal(&err), FatalError::Navigation(_)));
        assert_eq!(device.swipes().len(), MAP_LIST_SCROLLS as usize);
        assert!(device.probes("ep00").is_empty());
    }

    #[test]
    fn map_found_after_one_scroll() {
        let device = ScriptedDevice::new();
        device
            .queue_find("map0-2", [None])
            .present("map0-2", Point::new(3.0, 3.0))
            .present(labels::NORMAL_BATTLE, Point::new(4.0, 4.0));
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        enter_map_after_retreat(&game, &MapName::parse("0-2").expect("map")).expect("enter");
        let swipes = device.swipes();
        assert_eq!(swipes.len(), 1);
        assert!(swipes[0].1.y < swipes[0].0.y);
    }

    #[test]
    fn missing_chapter_list_is_fatal() {
        let device = ScriptedDevice::new();
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        let err = enter_map(&game, &MapName::parse("2-1").expect("map"), true)
            .expect_err("no chapters");
        match fatal(&err) {
            FatalError::Navigation(message) => assert!(message.contains("chapter 2")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
