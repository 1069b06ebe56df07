//! Roster loading from the scraped T-Doll JSON list.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::resolver::{EntityResolver, RosterEntry};

/// One record as written by the roster scraper; every field is a string.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    category: String,
    #[serde(default)]
    rarity: String,
}

/// Load the roster file into a resolver.
pub fn load_roster(path: &Path) -> Result<EntityResolver> {
    debug!(path = %path.display(), "loading roster");
    let raw = fs::read_to_string(path).with_context(|| format!("read roster {}", path.display()))?;
    parse_roster(&raw).with_context(|| format!("invalid roster {}", path.display()))
}

pub fn parse_roster(raw: &str) -> Result<EntityResolver> {
    let records: Vec<RawEntry> = serde_json::from_str(raw).context("parse roster json")?;
    let mut entries = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        let name = record.name.trim();
        if name.is_empty() {
            warn!(idx, id = %record.id, "skipping roster entry without a name");
            continue;
        }
        let rarity = record
            .rarity
            .trim()
            .parse::<u8>()
            .map_err(|err| {
                anyhow!("roster[{idx}] {name}: invalid rarity '{}': {err}", record.rarity)
            })?;
        entries.push(RosterEntry {
            id: record.id,
            name: name.to_string(),
            category: record.category,
            rarity,
        });
    }
    if entries.is_empty() {
        bail!("roster has no named entries");
    }
    debug!(entries = entries.len(), "roster loaded");
    Ok(EntityResolver::new(entries))
}
