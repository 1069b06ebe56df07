//! Device implementation backed by an external helper program.
//!
//! Each collaborator call spawns `<program> <args..> <verb> <verb-args..>`
//! and parses the helper's stdout as JSON:
//!
//! | verb        | arguments                                         | stdout          |
//! |-------------|---------------------------------------------------|-----------------|
//! | `find`      | `<label> [--region x,y,w,h] [--confidence c] [--tries n]` | point or `null` |
//! | `find-all`  | `<label> [--region x,y,w,h] [--confidence c]`     | array of points |
//! | `wait-gone` | `<label> --timeout-ms t [--region x,y,w,h]`       | `true`/`false`  |
//! | `tap`       | `<x> <y> <label>`                                 | ignored         |
//! | `swipe`     | `<x1> <y1> <x2> <y2>`                             | ignored         |
//! | `pinch`     | `<x> <y> <start-spacing> <end-spacing>`           | ignored         |
//! | `read`      | `x,y,w,h [--binarize]`                            | JSON string     |
//!
//! Points are `{"x": .., "y": ..}` objects.

use std::process::Command;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::core::types::{Point, Region};
use crate::io::config::BridgeConfig;
use crate::io::device::{Clock, FindOptions, Input, Locator, TextReader};
use crate::io::process::run_helper;

/// Spawns the configured helper for every collaborator call.
#[derive(Debug, Clone)]
pub struct CommandBridge {
    config: BridgeConfig,
}

impl CommandBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    fn command(&self, verb: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args).arg(verb).args(args);
        cmd
    }

    #[instrument(skip_all, fields(verb = %verb))]
    fn call(&self, verb: &str, args: Vec<String>) -> Result<Vec<u8>> {
        debug!(?args, "bridge call");
        let output = run_helper(
            self.command(verb, &args),
            Duration::from_secs(self.config.timeout_secs),
            self.config.output_limit_bytes,
        )
        .with_context(|| format!("run {} {verb}", self.config.program))?;

        if output.timed_out {
            return Err(anyhow!(
                "{} {verb} timed out after {}s",
                self.config.program,
                self.config.timeout_secs
            ));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "bridge call failed");
            return Err(anyhow!(
                "{} {verb} failed with status {:?}: {}",
                self.config.program,
                output.status.code(),
                output.stderr_lossy()
            ));
        }
        Ok(output.complete_stdout()?.to_vec())
    }

    fn call_json<T: DeserializeOwned>(&self, verb: &str, args: Vec<String>) -> Result<T> {
        let stdout = self.call(verb, args)?;
        serde_json::from_slice(&stdout).with_context(|| {
            format!(
                "parse {verb} output: {}",
                String::from_utf8_lossy(&stdout).trim()
            )
        })
    }
}

fn region_arg(region: Region) -> String {
    format!("{},{},{},{}", region.x, region.y, region.width, region.height)
}

fn push_region(args: &mut Vec<String>, region: Option<Region>) {
    if let Some(region) = region {
        args.push("--region".to_string());
        args.push(region_arg(region));
    }
}

fn push_confidence(args: &mut Vec<String>, confidence: Option<f64>) {
    if let Some(confidence) = confidence {
        args.push("--confidence".to_string());
        args.push(confidence.to_string());
    }
}

impl Locator for CommandBridge {
    fn find(&self, label: &str, options: &FindOptions) -> Result<Option<Point>> {
        let mut args = vec![label.to_string()];
        push_region(&mut args, options.region);
        push_confidence(&mut args, options.confidence);
        if let Some(tries) = options.tries {
            args.push("--tries".to_string());
            args.push(tries.to_string());
        }
        self.call_json("find", args)
    }

    fn find_all(
        &self,
        label: &str,
        region: Option<Region>,
        confidence: Option<f64>,
    ) -> Result<Vec<Point>> {
        let mut args = vec![label.to_string()];
        push_region(&mut args, region);
        push_confidence(&mut args, confidence);
        self.call_json("find-all", args)
    }

    fn wait_until_gone(
        &self,
        label: &str,
        region: Option<Region>,
        timeout: Duration,
    ) -> Result<bool> {
        let mut args = vec![
            label.to_string(),
            "--timeout-ms".to_string(),
            timeout.as_millis().to_string(),
        ];
        push_region(&mut args, region);
        self.call_json("wait-gone", args)
    }
}

impl Input for CommandBridge {
    fn tap(&self, point: Point, label: &str) -> Result<()> {
        self.call(
            "tap",
            vec![point.x.to_string(), point.y.to_string(), label.to_string()],
        )
        .map(|_| ())
    }

    fn swipe(&self, from: Point, to: Point) -> Result<()> {
        self.call(
            "swipe",
            vec![
                from.x.to_string(),
                from.y.to_string(),
                to.x.to_string(),
                to.y.to_string(),
            ],
        )
        .map(|_| ())
    }

    fn pinch(&self, center: Point, start_spacing: f64, end_spacing: f64) -> Result<()> {
        self.call(
            "pinch",
            vec![
                center.x.to_string(),
                center.y.to_string(),
                start_spacing.to_string(),
                end_spacing.to_string(),
            ],
        )
        .map(|_| ())
    }
}

impl TextReader for CommandBridge {
    fn read(&self, region: Region, binarize: bool) -> Result<String> {
        let mut args = vec![region_arg(region)];
        if binarize {
            args.push("--binarize".to_string());
        }
        let text: String = self.call_json("read", args)?;
        Ok(text.trim().to_string())
    }
}

impl Clock for CommandBridge {
    fn sleep(&self, duration: Duration) {
        SystemClock.sleep(duration);
    }
}

/// Wall-clock waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
