//! Parsing of map identifiers such as `0-2` or `4-3e`.

use std::fmt;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use regex::Regex;

static MAP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<chapter>\d{1,2})-(?<stage>\d{1,2})(?<suffix>[a-z]?)$")
        .expect("map name regex is valid")
});

/// A validated map identifier: chapter, stage and optional difficulty suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapName {
    raw: String,
    chapter: u32,
}

impl MapName {
    pub fn parse(raw: &str) -> Result<Self> {
        let caps = MAP_NAME
            .captures(raw.trim())
            .ok_or_else(|| anyhow!("invalid map name '{raw}' (expected e.g. 0-2 or 4-3e)"))?;
        let chapter = caps["chapter"]
            .parse::<u32>()
            .map_err(|err| anyhow!("invalid chapter in map name '{raw}': {err}"))?;
        Ok(Self {
            raw: raw.trim().to_string(),
            chapter,
        })
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Marker shown while the chapter's episode is the active one.
    pub fn episode_label(&self) -> String {
        format!("ep{:02}", self.chapter)
    }

    /// Button for this map in the map list.
    pub fn map_label(&self) -> String {
        format!("map{}", self.raw)
    }
}

impl fmt::Display for MapName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Chapter button label in the left-hand chapter list.
pub fn chapter_label(chapter: u32) -> String {
    format!("ch{chapter:02}")
}
