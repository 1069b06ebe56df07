//! Bot configuration stored in `gfl-bot.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::map_name::MapName;
use crate::core::types::Display;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gfl-bot.toml";

/// Upper bound on `device.delay_tap_ms`.
pub const MAX_DELAY_TAP_MS: u64 = 60_000;

/// Bot configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// values that match a 2560x1440 device and the stock animation speeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub game: GameConfig,
    pub repair: RepairConfig,
    pub corpse_drag: CorpseDragConfig,
    pub device: DeviceConfig,
    pub timing: TimingConfig,
    pub bridge: BridgeConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    /// Map to farm, e.g. `0-2` or `4-3e`.
    pub map: String,
    /// Number of completed runs after which the session stops.
    pub amount: u32,
    /// Echelon slots (1..=10) deployed by `deploy_dummy` steps, in order.
    pub dummy_echelons: Vec<u32>,
    /// Echelon slots (1..=10) deployed by `deploy_echelon` steps, in order.
    pub dps_echelons: Vec<u32>,
    /// Chapter buttons `ch00` up to, but not including, this number are
    /// scanned when looking for the nearest visible chapter.
    pub max_chapter: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map: "0-2".to_string(),
            amount: 1,
            dummy_echelons: vec![1],
            dps_echelons: vec![2],
            max_chapter: 11,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepairConfig {
    pub enable: bool,
    /// Repair every this many completed runs. 0 disables repairs.
    pub interval: u32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            enable: false,
            interval: 5,
        }
    }
}

impl RepairConfig {
    /// Interval in effect, with `enable = false` folded into 0.
    pub fn effective_interval(&self) -> u32 {
        if self.enable { self.interval } else { 0 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CorpseDragConfig {
    pub enable: bool,
    pub dragger1: String,
    /// Dragger 1 has its digimind upgrade (one rarity above base).
    pub dragger1_mod: bool,
    pub dragger2: String,
    pub dragger2_mod: bool,
}

impl CorpseDragConfig {
    /// Whether the named dragger is configured as modded.
    pub fn is_modded(&self, name: &str) -> bool {
        (name == self.dragger1 && self.dragger1_mod) || (name == self.dragger2 && self.dragger2_mod)
    }

    /// The configured dragger that is not `name`.
    pub fn partner_of(&self, name: &str) -> Option<&str> {
        if name == self.dragger1 {
            Some(&self.dragger2)
        } else if name == self.dragger2 {
            Some(&self.dragger1)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub width: i32,
    pub height: i32,
    /// Default template match confidence.
    pub confidence: f64,
    /// Match confidence for lookups that collect every occurrence of a template.
    pub confidence_all: f64,
    /// Add a random delay before every press.
    pub enable_delay_tap: bool,
    /// Centre of the random press delay; jitter is ±100 ms.
    pub delay_tap_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            width: 2560,
            height: 1440,
            confidence: 0.8,
            confidence_all: 0.8,
            enable_delay_tap: false,
            delay_tap_ms: 1000,
        }
    }
}

impl DeviceConfig {
    pub fn display(&self) -> Display {
        Display {
            width: self.width,
            height: self.height,
        }
    }
}

/// Fixed waits, in milliseconds, tuned to the game's animation speed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub after_tap_ms: u64,
    pub scroll_settle_ms: u64,
    pub zoom_settle_ms: u64,
    pub node_double_tap_ms: u64,
    pub resupply_retry_ms: u64,
    pub combat_poll_ms: u64,
    /// Upper bound on combat-pause polls before giving up on one combat.
    pub combat_max_polls: u32,
    pub end_round_vanish_ms: u64,
    pub screen_transition_ms: u64,
    pub ocr_retry_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            after_tap_ms: 1000,
            scroll_settle_ms: 2000,
            zoom_settle_ms: 2000,
            node_double_tap_ms: 500,
            resupply_retry_ms: 1000,
            combat_poll_ms: 1000,
            combat_max_polls: 300,
            end_round_vanish_ms: 3000,
            screen_transition_ms: 3000,
            ocr_retry_ms: 500,
        }
    }
}

impl TimingConfig {
    pub fn after_tap(&self) -> Duration {
        Duration::from_millis(self.after_tap_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn zoom_settle(&self) -> Duration {
        Duration::from_millis(self.zoom_settle_ms)
    }

    pub fn node_double_tap(&self) -> Duration {
        Duration::from_millis(self.node_double_tap_ms)
    }

    pub fn resupply_retry(&self) -> Duration {
        Duration::from_millis(self.resupply_retry_ms)
    }

    pub fn combat_poll(&self) -> Duration {
        Duration::from_millis(self.combat_poll_ms)
    }

    pub fn end_round_vanish(&self) -> Duration {
        Duration::from_millis(self.end_round_vanish_ms)
    }

    pub fn screen_transition(&self) -> Duration {
        Duration::from_millis(self.screen_transition_ms)
    }

    pub fn ocr_retry(&self) -> Duration {
        Duration::from_millis(self.ocr_retry_ms)
    }
}

/// External helper that performs template matching, OCR and gestures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub program: String,
    /// Arguments inserted before the verb on every call.
    pub args: Vec<String>,
    /// Upper bound for a single helper call in seconds.
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: "gfl-device".to_string(),
            args: Vec::new(),
            timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub maps_dir: PathBuf,
    pub roster: PathBuf,
    pub report: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            maps_dir: PathBuf::from("data/maps"),
            roster: PathBuf::from("data/tdolls.json"),
            report: PathBuf::from("session_report.json"),
        }
    }
}

impl BotConfig {
    pub fn validate(&self) -> Result<()> {
        MapName::parse(&self.game.map)?;
        if self.game.amount == 0 {
            return Err(anyhow!("game.amount must be > 0"));
        }
        for (field, slots) in [
            ("game.dummy_echelons", &self.game.dummy_echelons),
            ("game.dps_echelons", &self.game.dps_echelons),
        ] {
            if let Some(bad) = slots.iter().find(|slot| !(1..=10).contains(*slot)) {
                return Err(anyhow!("{field} contains {bad}; echelon slots are 1..=10"));
            }
        }
        if self.device.width <= 0 || self.device.height <= 0 {
            return Err(anyhow!("device.width and device.height must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.device.confidence) {
            return Err(anyhow!("device.confidence must be within 0.0..=1.0"));
        }
        if !(0.0..=1.0).contains(&self.device.confidence_all) {
            return Err(anyhow!("device.confidence_all must be within 0.0..=1.0"));
        }
        if self.device.delay_tap_ms > MAX_DELAY_TAP_MS {
            return Err(anyhow!("device.delay_tap_ms must be <= {MAX_DELAY_TAP_MS}"));
        }
        if self.corpse_drag.enable {
            let drag = &self.corpse_drag;
            if drag.dragger1.trim().is_empty() || drag.dragger2.trim().is_empty() {
                return Err(anyhow!("corpse_drag.dragger1 and dragger2 must be set"));
            }
            if drag.dragger1 == drag.dragger2 {
                return Err(anyhow!("corpse_drag.dragger1 and dragger2 must differ"));
            }
        }
        if self.timing.combat_max_polls == 0 {
            return Err(anyhow!("timing.combat_max_polls must be > 0"));
        }
        if self.bridge.program.trim().is_empty() {
            return Err(anyhow!("bridge.program must be set"));
        }
        if self.bridge.timeout_secs == 0 {
            return Err(anyhow!("bridge.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BotConfig::default()`.
pub fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        let cfg = BotConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BotConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BotConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
