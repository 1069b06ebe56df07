//! Factory screen: dismantling excess T-Dolls when inventory slots run out.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::labels;
use crate::game::Game;
use crate::io::device::{Device, FindOptions};

/// Probes for the factory screen after following the "move to" link.
pub const FACTORY_PROBES: u32 = 30;

/// Dismantle with smart select. Always backs out of the factory afterwards.
#[instrument(skip(game))]
pub fn dismantle<D: Device>(game: &Game<'_, D>) -> Result<bool> {
    let entered = game
        .find(labels::FACTORY, FindOptions::default().tries(FACTORY_PROBES))?
        .is_some()
        && game.find_and_press(labels::DISMANTLE_RETIREMENT, FindOptions::default())?;

    let dismantled = if entered {
        game.find_and_press(labels::DISMANTLE_SELECT_TDOLL, FindOptions::default())?;
        game.find_and_press(labels::DISMANTLE_SMART_SELECT, FindOptions::default())?;
        game.find_and_press(labels::DISMANTLE_OK, FindOptions::default())?;
        info!("factory entered, dismantling");
        game.find_and_press(labels::DISMANTLE, FindOptions::default())?
    } else {
        warn!("dismantle failed to start");
        false
    };

    game.go_back()?;
    Ok(dismantled)
}

/// Handle the "insufficient slots" dialog raised when entering a map:
/// follow its second "move to" link into the factory, dismantle, then head home.
#[instrument(skip(game))]
pub fn clear_insufficient_slots<D: Device>(game: &Game<'_, D>) -> Result<bool> {
    let links = game.find_all(labels::MOVE_TO, None)?;
    let Some(factory_link) = links.get(1).copied() else {
        warn!(found = links.len(), "factory link not found in slots dialog");
        game.find_and_press(labels::DIALOG_CLOSE, FindOptions::default().tries(1))?;
        return Ok(false);
    };
    game.press(factory_link, labels::MOVE_TO)?;
    game.find_and_press(labels::DIALOG_CLOSE, FindOptions::default().tries(1))?;

    let dismantled = dismantle(game)?;
    if !game.find_and_press(labels::RETURN_HOME, FindOptions::default())? {
        warn!("return home button not found after dismantling");
    }
    Ok(dismantled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::{EntityResolver, RosterEntry};
    use crate::core::types::Point;
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

    #[test]
    fn dismantle_presses_full_sequence_then_backs_out() {
        let device = ScriptedDevice::new();
        for label in [
            labels::FACTORY,
            labels::DISMANTLE_RETIREMENT,
            labels::DISMANTLE_SELECT_TDOLL,
            labels::DISMANTLE_SMART_SELECT,
            labels::DISMANTLE_OK,
            labels::DISMANTLE,
            labels::BACK,
        ] {
            device.present(label, Point::new(10.0, 10.0));
        }
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        assert!(dismantle(&game).expect("dismantle"));
        assert_eq!(
            device.taps(),
            vec![
                "dismantle_retirement",
                "dismantle_select_tdoll",
                "dismantle_smart_select",
                "dismantle_ok",
                "dismantle",
                "back"
            ]
        );
    }

    #[test]
    fn missing_factory_still_backs_out() {
        let device = ScriptedDevice::new();
        device.present(labels::BACK, Point::new(10.0, 10.0));
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        assert!(!dismantle(&game).expect("dismantle"));
        assert_eq!(device.taps(), vec!["back"]);
        assert_eq!(device.probes(labels::FACTORY)[0].tries, Some(FACTORY_PROBES));
    }

    #[test]
    fn slots_dialog_follows_second_link() {
        let device = ScriptedDevice::new();
        device.find_all_default(
            labels::MOVE_TO,
            vec![Point::new(100.0, 100.0), Point::new(200.0, 100.0)],
        );
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        assert!(!clear_insufficient_slots(&game).expect("clear"));
        assert_eq!(device.taps(), vec!["move_to"]);
        assert!(device.actions().contains(&crate::test_support::Action::Tap {
            point: Point::new(200.0, 100.0),
            label: "move_to".to_string(),
        }));
    }
}
