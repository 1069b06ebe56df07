//! Detection of the T-Doll awarded after combat or at settlement.

use anyhow::Result;
use tracing::{info, warn};

use crate::core::labels;
use crate::core::resolver::Fallback;
use crate::core::state::RunState;
use crate::core::types::Region;
use crate::game::Game;
use crate::io::device::{Device, FindOptions};

/// Probes for the share marker before concluding nothing dropped.
pub const SHARE_PROBES: u32 = 5;

/// Name strip relative to the share marker: `(dx, dy, width, height)`.
const NAME_STRIP: (i32, i32, i32, i32) = (-80, 90, 630, 90);

/// Look for a drop, resolve its name and record it in the acquired roster.
pub fn detect<D: Device>(game: &Game<'_, D>, state: &mut RunState) -> Result<Option<String>> {
    let options = FindOptions::default()
        .region(game.display().upper_third())
        .tries(SHARE_PROBES);
    let Some(share) = game.find(labels::TDOLL_SHARE, options)? else {
        return Ok(None);
    };

    let (dx, dy, width, height) = NAME_STRIP;
    let strip = Region::anchored(share, dx, dy, width, height);
    let mut text = game.read_text(strip, true)?;
    if text.is_empty() {
        game.wait(game.timing().ocr_retry());
        text = game.read_text(strip, true)?;
    }

    let resolution = game.resolver().resolve_two_pass(
        &text,
        || game.read_text(strip, false),
        Fallback::First,
    )?;
    let Some(resolution) = resolution else {
        warn!(text = %text, "drop text did not resolve");
        return Ok(None);
    };
    if !resolution.is_confident() {
        warn!(
            text = %text,
            name = %resolution.name,
            score = resolution.score,
            "low confidence drop"
        );
    }
    info!(name = %resolution.name, score = resolution.score, "detected drop");
    state.acquired.push(resolution.name.clone());
    Ok(Some(resolution.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::{EntityResolver, RosterEntry};
    use crate::core::types::Point;
    use crate::io::config::BotConfig;
    use crate::test_support::{Action, ScriptedDevice};

    fn resolver() -> EntityResolver {
        let entry = |id: &str, name: &str| RosterEntry {
            id: id.to_string(),
            name: name.to_string(),
            category: "AR".to_string(),
            rarity: 3,
        };
        EntityResolver::new(vec![entry("1", "M4A1"), entry("2", "Galil"), entry("3", "FNC")])
    }

    #[test]
    fn no_share_marker_means_no_drop() {
        let device = ScriptedDevice::new();
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);
        let mut state = RunState::default();

        assert_eq!(detect(&game, &mut state).expect("detect"), None);
        assert!(state.acquired.is_empty());
        assert_eq!(device.read_count(), 0);
        assert_eq!(device.probes(labels::TDOLL_SHARE)[0].tries, Some(SHARE_PROBES));
    }

    #[test]
    fn confident_first_read_skips_second_pass() {
        let device = ScriptedDevice::new();
        device
            .present(labels::TDOLL_SHARE, Point::new(1000.0, 200.0))
            .queue_reads(["Galil"]);
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);
        let mut state = RunState::default();

        let name = detect(&game, &mut state).expect("detect");
        assert_eq!(name.as_deref(), Some("Galil"));
        assert_eq!(state.acquired.names(), ["Galil".to_string()]);
        assert_eq!(
            device.actions(),
            vec![Action::Read {
                region: Region::new(920, 290, 630, 90),
                binarize: true
            }]
        );
    }

    #[test]
    fn empty_read_is_retried_before_resolving() {
        let device = ScriptedDevice::new();
        device
            .present(labels::TDOLL_SHARE, Point::new(1000.0, 200.0))
            .queue_reads(["", "M4A1"]);
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);
        let mut state = RunState::default();

        let name = detect(&game, &mut state).expect("detect");
        assert_eq!(name.as_deref(), Some("M4A1"));
        assert_eq!(device.read_count(), 2);
    }

    #[test]
    fn weak_first_read_uses_confident_unbinarized_read() {
        let device = ScriptedDevice::new();
        device
            .present(labels::TDOLL_SHARE, Point::new(1000.0, 200.0))
            .queue_reads(["Fxq", "FNC"]);
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);
        let mut state = RunState::default();

        let name = detect(&game, &mut state).expect("detect");
        assert_eq!(name.as_deref(), Some("FNC"));
        let reads: Vec<bool> = device
            .actions()
            .iter()
            .filter_map(|action| match action {
                Action::Read { binarize, .. } => Some(*binarize),
                _ => None,
            })
            .collect();
        assert_eq!(reads, vec![true, false]);
    }
}
