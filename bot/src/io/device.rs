//! Device collaborator seams.
//!
//! The [`Locator`], [`Input`], [`TextReader`] and [`Clock`] traits decouple
//! the decision engine from the template matcher, gesture injector, OCR and
//! wall clock. The CLI wires them to [`crate::io::bridge::CommandBridge`];
//! tests use `test_support::ScriptedDevice`, which answers from queues and
//! records every gesture without sleeping.
//!
//! A returned `Err` is a hard failure of the collaborator itself. A miss is
//! reported as `Ok(None)`, `Ok(false)` or an empty string.

use std::time::Duration;

use anyhow::Result;

use crate::core::types::{Point, Region};

/// Options for a single template lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FindOptions {
    /// Restrict matching to this rectangle.
    pub region: Option<Region>,
    /// Minimum match confidence; the locator default when `None`.
    pub confidence: Option<f64>,
    /// Attempts before reporting a miss; the locator default when `None`.
    pub tries: Option<u32>,
}

impl FindOptions {
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn tries(mut self, tries: u32) -> Self {
        self.tries = Some(tries);
        self
    }
}

/// Finds named UI elements on screen.
pub trait Locator {
    fn find(&self, label: &str, options: &FindOptions) -> Result<Option<Point>>;

    /// Every match of `label`; `confidence` falls back to the locator default.
    fn find_all(
        &self,
        label: &str,
        region: Option<Region>,
        confidence: Option<f64>,
    ) -> Result<Vec<Point>>;

    /// Wait up to `timeout` for `label` to disappear. Returns `true` if it vanished.
    fn wait_until_gone(&self, label: &str, region: Option<Region>, timeout: Duration)
    -> Result<bool>;
}

/// Injects gestures.
pub trait Input {
    /// Tap at `point`; `label` names the target for logs.
    fn tap(&self, point: Point, label: &str) -> Result<()>;

    fn swipe(&self, from: Point, to: Point) -> Result<()>;

    fn pinch(&self, center: Point, start_spacing: f64, end_spacing: f64) -> Result<()>;
}

/// Extracts text from a screen rectangle.
pub trait TextReader {
    /// Read text in `region`, optionally binarizing the crop first.
    fn read(&self, region: Region, binarize: bool) -> Result<String>;
}

/// Blocking waits between UI interactions.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Everything the decision engine needs from a device.
pub trait Device: Locator + Input + TextReader + Clock {}

impl<T: Locator + Input + TextReader + Clock> Device for T {}
