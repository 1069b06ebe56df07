//! Map script loading with schema + invariant validation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::Draft;
use serde_json::Value;
use tracing::debug;

use crate::core::map_name::MapName;
use crate::core::script::validate_script;
use crate::core::types::MapScript;

pub const MAP_SCRIPT_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/map_script/v1.schema.json"
));

/// Resolve the script file for `map`, preferring a per-resolution variant
/// (`<map>_<width>.json`) over the generic `<map>.json`.
pub fn script_path(maps_dir: &Path, map: &MapName, width: i32) -> PathBuf {
    let sized = maps_dir.join(format!("{}_{width}.json", map.as_str()));
    if sized.is_file() {
        return sized;
    }
    maps_dir.join(format!("{}.json", map.as_str()))
}

/// Load, schema-check and invariant-check a map script.
pub fn load_script(path: &Path, dummy_slots: usize, dps_slots: usize) -> Result<MapScript> {
    debug!(path = %path.display(), "loading map script");
    let raw =
        fs::read_to_string(path).with_context(|| format!("read map script {}", path.display()))?;
    parse_script(&raw, dummy_slots, dps_slots)
        .with_context(|| format!("invalid map script {}", path.display()))
}

/// Parse a map script from JSON text.
pub fn parse_script(raw: &str, dummy_slots: usize, dps_slots: usize) -> Result<MapScript> {
    let value: Value = serde_json::from_str(raw).context("parse map script json")?;
    validate_schema(&value)?;
    let script: MapScript =
        serde_json::from_value(value).context("deserialize map script as v1 struct")?;
    let errors = validate_script(&script, dummy_slots, dps_slots);
    if !errors.is_empty() {
        bail!("invariant violations:\n- {}", errors.join("\n- "));
    }
    debug!(
        setup_steps = script.setup.len(),
        moves = script.moves.len(),
        "map script loaded"
    );
    Ok(script)
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(MAP_SCRIPT_SCHEMA).context("parse embedded map script schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| anyhow!("compile map script schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PlanAction, SetupAction};

    const SCRIPT: &str = r#"{
        "setup": [
            {"action": "pinch_in", "spacing": [400, 100]},
            {"action": "deploy_dummy", "coordinates": {"x": 1200, "y": 800}},
            {"action": "deploy_echelon", "coordinates": {"x": 900, "y": 650}}
        ],
        "moves": [
            {"action": "start", "coordinates": {"x": 900, "y": 650}},
            {"action": "move", "coordinates": {"x": 1500, "y": 700}},
            {"action": "retreat", "coordinates": {"x": 900, "y": 650}}
        ]
    }"#;

    #[test]
    fn parses_valid_script() {
        let script = parse_script(SCRIPT, 1, 1).expect("parse");
        assert_eq!(script.setup[0].action, SetupAction::PinchIn);
        assert_eq!(script.moves[2].action, PlanAction::Retreat);
    }

    #[test]
    fn schema_rejects_unknown_action() {
        let raw = r#"{
            "setup": [{"action": "teleport"}],
            "moves": [{"action": "start", "coordinates": {"x": 1, "y": 1}}]
        }"#;
        let err = parse_script(raw, 1, 1).unwrap_err();
        assert!(err.to_string().contains("schema validation failed"));
    }

    #[test]
    fn invariants_run_after_schema() {
        let err = parse_script(SCRIPT, 0, 1).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("invariant violations"), "{message}");
        assert!(message.contains("dummies"), "{message}");
    }

    #[test]
    fn prefers_resolution_specific_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let map = MapName::parse("0-2").expect("map");
        assert_eq!(
            script_path(temp.path(), &map, 2560),
            temp.path().join("0-2.json")
        );

        fs::write(temp.path().join("0-2_2560.json"), SCRIPT).expect("write");
        let path = script_path(temp.path(), &map, 2560);
        assert_eq!(path, temp.path().join("0-2_2560.json"));
        let script = load_script(&path, 1, 1).expect("load");
        assert_eq!(script.moves.len(), 3);
    }
}
