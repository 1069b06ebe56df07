//! Shared context for one session: device, config and roster, plus the
//! press/wait helpers every stage uses.

use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::debug;

use crate::core::labels;
use crate::core::resolver::EntityResolver;
use crate::core::types::{Display, Point, Region};
use crate::io::config::{BotConfig, TimingConfig};
use crate::io::device::{Device, FindOptions};

/// Spread applied around `device.delay_tap_ms` when tap delays are enabled.
const DELAY_TAP_JITTER_MS: u64 = 100;

pub struct Game<'a, D: Device> {
    device: &'a D,
    config: &'a BotConfig,
    resolver: &'a EntityResolver,
    display: Display,
}

impl<'a, D: Device> Game<'a, D> {
    pub fn new(device: &'a D, config: &'a BotConfig, resolver: &'a EntityResolver) -> Self {
        Self {
            device,
            config,
            resolver,
            display: config.device.display(),
        }
    }

    pub fn device(&self) -> &'a D {
        self.device
    }

    pub fn config(&self) -> &'a BotConfig {
        self.config
    }

    pub fn timing(&self) -> &'a TimingConfig {
        &self.config.timing
    }

    pub fn resolver(&self) -> &'a EntityResolver {
        self.resolver
    }

    pub fn display(&self) -> Display {
        self.display
    }

    pub fn wait(&self, duration: Duration) {
        self.device.sleep(duration);
    }

    /// Locate `label`, matching at `device.confidence` unless the caller
    /// asked for a specific threshold.
    pub fn find(&self, label: &str, mut options: FindOptions) -> Result<Option<Point>> {
        if options.confidence.is_none() {
            options.confidence = Some(self.config.device.confidence);
        }
        let found = self.device.find(label, &options)?;
        debug!(label, found = found.is_some(), "probe");
        Ok(found)
    }

    /// Every match of `label` at `device.confidence_all`.
    pub fn find_all(&self, label: &str, region: Option<Region>) -> Result<Vec<Point>> {
        let confidence = self.config.device.confidence_all;
        let found = self.device.find_all(label, region, Some(confidence))?;
        debug!(label, matches = found.len(), "probe all");
        Ok(found)
    }

    /// Single quick probe for a marker.
    pub fn is_visible(&self, label: &str, region: Option<Region>) -> Result<bool> {
        let mut options = FindOptions::default().tries(1);
        options.region = region;
        Ok(self.find(label, options)?.is_some())
    }

    /// Tap without the post-tap settle.
    pub fn tap(&self, point: Point, label: &str) -> Result<()> {
        self.device.tap(point, label)
    }

    /// Tap a located button: optional jittered delay, tap, then settle.
    pub fn press(&self, point: Point, label: &str) -> Result<()> {
        if self.config.device.enable_delay_tap {
            let base = self.config.device.delay_tap_ms;
            let low = base.saturating_sub(DELAY_TAP_JITTER_MS);
            let high = base.saturating_add(DELAY_TAP_JITTER_MS);
            let delay = rand::thread_rng().gen_range(low..=high);
            debug!(delay_ms = delay, "delaying tap");
            self.wait(Duration::from_millis(delay));
        }
        self.device.tap(point, label)?;
        self.wait(self.timing().after_tap());
        Ok(())
    }

    /// Find `label` and press it. Returns `false` when it never showed up.
    pub fn find_and_press(&self, label: &str, options: FindOptions) -> Result<bool> {
        match self.find(label, options)? {
            Some(point) => {
                self.press(point, label)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn go_back(&self) -> Result<bool> {
        self.find_and_press(labels::BACK, FindOptions::default())
    }

    pub fn read_text(&self, region: Region, binarize: bool) -> Result<String> {
        let text = self.device.read(region, binarize)?;
        debug!(?region, binarize, text = %text, "ocr");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::RosterEntry;
    use crate::test_support::{Action, ScriptedDevice};

    fn resolver() -> EntityResolver {
        EntityResolver::new(vec![RosterEntry {
            id: "1".to_string(),
            name: "M4A1".to_string(),
            category: "AR".to_string(),
            rarity: 4,
        }])
    }

    #[test]
    fn find_and_press_taps_then_settles() {
        let device = ScriptedDevice::new();
        device.present("resupply", Point::new(5.0, 6.0));
        let config = BotConfig::default();
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        assert!(game.find_and_press("resupply", FindOptions::default()).expect("press"));
        assert!(!game.find_and_press("planning_mode", FindOptions::default()).expect("press"));
        assert_eq!(
            device.actions(),
            vec![
                Action::Tap {
                    point: Point::new(5.0, 6.0),
                    label: "resupply".to_string()
                },
                Action::Sleep(Duration::from_millis(1000)),
            ]
        );
    }

    #[test]
    fn delayed_taps_wait_within_jitter() {
        let device = ScriptedDevice::new();
        let mut config = BotConfig::default();
        config.device.enable_delay_tap = true;
        config.device.delay_tap_ms = 500;
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        game.press(Point::new(1.0, 1.0), "node").expect("press");
        match device.actions().first() {
            Some(Action::Sleep(delay)) => {
                assert!((400..=600).contains(&delay.as_millis()), "{delay:?}");
            }
            other => panic!("expected jitter sleep first, got {other:?}"),
        }
        assert_eq!(device.tap_count("node"), 1);
    }

    #[test]
    fn jitter_saturates_at_the_top_of_the_range() {
        let device = ScriptedDevice::new();
        let mut config = BotConfig::default();
        config.device.enable_delay_tap = true;
        config.device.delay_tap_ms = u64::MAX;
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        game.press(Point::new(1.0, 1.0), "node").expect("press");
        match device.actions().first() {
            Some(Action::Sleep(delay)) => {
                assert!(*delay >= Duration::from_millis(u64::MAX - DELAY_TAP_JITTER_MS));
            }
            other => panic!("expected jitter sleep first, got {other:?}"),
        }
    }

    #[test]
    fn probes_default_to_configured_confidence() {
        let device = ScriptedDevice::new();
        device.present(labels::HOME, Point::new(1.0, 1.0));
        let mut config = BotConfig::default();
        config.device.confidence = 0.9;
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        game.find(labels::HOME, FindOptions::default()).expect("find");
        game.find(labels::HOME, FindOptions::default().confidence(0.95)).expect("find");
        game.is_visible(labels::HOME, None).expect("visible");

        let sent: Vec<Option<f64>> = device
            .probes(labels::HOME)
            .iter()
            .map(|options| options.confidence)
            .collect();
        assert_eq!(sent, [Some(0.9), Some(0.95), Some(0.9)]);
    }

    #[test]
    fn find_all_matches_at_confidence_all() {
        let device = ScriptedDevice::new();
        device.find_all_default(
            labels::FORMATION_HP,
            vec![Point::new(1.0, 1.0), Point::new(2.0, 1.0)],
        );
        let mut config = BotConfig::default();
        config.device.confidence_all = 0.7;
        let resolver = resolver();
        let game = Game::new(&device, &config, &resolver);

        let region = Region::new(0, 0, 100, 100);
        let found = game
            .find_all(labels::FORMATION_HP, Some(region))
            .expect("find all");
        assert_eq!(found.len(), 2);
        let probes = device.find_all_probes(labels::FORMATION_HP);
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].confidence, Some(0.7));
        assert_eq!(probes[0].region, Some(region));
    }
}
