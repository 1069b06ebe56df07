//! Test-only scripted device for driving the decision engine without a phone.
//!
//! Every label answers from its own queue first and falls back to a sticky
//! default once the queue is drained. Unknown labels are absent. Gestures,
//! OCR reads and sleeps are recorded in order; nothing actually sleeps.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use anyhow::Result;

use crate::core::types::{Point, Region};
use crate::io::device::{Clock, FindOptions, Input, Locator, TextReader};

/// A recorded side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tap { point: Point, label: String },
    Swipe { from: Point, to: Point },
    Pinch { center: Point, start: f64, end: f64 },
    Read { region: Region, binarize: bool },
    Sleep(Duration),
}

#[derive(Debug, Default)]
struct Script {
    finds: HashMap<String, VecDeque<Option<Point>>>,
    find_defaults: HashMap<String, Option<Point>>,
    find_alls: HashMap<String, VecDeque<Vec<Point>>>,
    find_all_defaults: HashMap<String, Vec<Point>>,
    gone: HashMap<String, VecDeque<bool>>,
    gone_defaults: HashMap<String, bool>,
    reads: VecDeque<String>,
    probes: Vec<(String, FindOptions)>,
    all_probes: Vec<(String, FindOptions)>,
    actions: Vec<Action>,
}

/// Queue-driven [`crate::io::device::Device`] for tests.
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    script: RefCell<Script>,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `label` visible at `point` whenever its queue is empty.
    pub fn present(&self, label: &str, point: Point) -> &Self {
        self.script
            .borrow_mut()
            .find_defaults
            .insert(label.to_string(), Some(point));
        self
    }

    /// Make `label` missing whenever its queue is empty.
    pub fn absent(&self, label: &str) -> &Self {
        self.script
            .borrow_mut()
            .find_defaults
            .insert(label.to_string(), None);
        self
    }

    /// Queue one-shot `find` answers for `label`.
    pub fn queue_find<I>(&self, label: &str, results: I) -> &Self
    where
        I: IntoIterator<Item = Option<Point>>,
    {
        self.script
            .borrow_mut()
            .finds
            .entry(label.to_string())
            .or_default()
            .extend(results);
        self
    }

    pub fn queue_find_all<I>(&self, label: &str, results: I) -> &Self
    where
        I: IntoIterator<Item = Vec<Point>>,
    {
        self.script
            .borrow_mut()
            .find_alls
            .entry(label.to_string())
            .or_default()
            .extend(results);
        self
    }

    pub fn find_all_default(&self, label: &str, points: Vec<Point>) -> &Self {
        self.script
            .borrow_mut()
            .find_all_defaults
            .insert(label.to_string(), points);
        self
    }

    /// Queue one-shot `wait_until_gone` answers for `label`.
    pub fn queue_gone<I>(&self, label: &str, results: I) -> &Self
    where
        I: IntoIterator<Item = bool>,
    {
        self.script
            .borrow_mut()
            .gone
            .entry(label.to_string())
            .or_default()
            .extend(results);
        self
    }

    /// Sticky `wait_until_gone` answer for `label`. Unset labels report `true`.
    pub fn gone_default(&self, label: &str, gone: bool) -> &Self {
        self.script
            .borrow_mut()
            .gone_defaults
            .insert(label.to_string(), gone);
        self
    }

    /// Queue OCR results; reads past the end return an empty string.
    pub fn queue_reads<I, S>(&self, reads: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script
            .borrow_mut()
            .reads
            .extend(reads.into_iter().map(Into::into));
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.script.borrow().actions.clone()
    }

    /// Labels of every tap, in order.
    pub fn taps(&self) -> Vec<String> {
        self.script
            .borrow()
            .actions
            .iter()
            .filter_map(|action| match action {
                Action::Tap { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn tap_count(&self, label: &str) -> usize {
        self.taps().iter().filter(|tap| tap.as_str() == label).count()
    }

    pub fn swipes(&self) -> Vec<(Point, Point)> {
        self.script
            .borrow()
            .actions
            .iter()
            .filter_map(|action| match action {
                Action::Swipe { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn pinch_count(&self) -> usize {
        self.script
            .borrow()
            .actions
            .iter()
            .filter(|action| matches!(action, Action::Pinch { .. }))
            .count()
    }

    pub fn read_count(&self) -> usize {
        self.script
            .borrow()
            .actions
            .iter()
            .filter(|action| matches!(action, Action::Read { .. }))
            .count()
    }

    /// Every `find` call made for `label`, with its options.
    pub fn probes(&self, label: &str) -> Vec<FindOptions> {
        self.script
            .borrow()
            .probes
            .iter()
            .filter(|(probed, _)| probed == label)
            .map(|(_, options)| *options)
            .collect()
    }

    /// Every `find_all` call made for `label`; `tries` is always `None`.
    pub fn find_all_probes(&self, label: &str) -> Vec<FindOptions> {
        self.script
            .borrow()
            .all_probes
            .iter()
            .filter(|(probed, _)| probed == label)
            .map(|(_, options)| *options)
            .collect()
    }

    pub fn slept(&self) -> Duration {
        self.script
            .borrow()
            .actions
            .iter()
            .filter_map(|action| match action {
                Action::Sleep(duration) => Some(*duration),
                _ => None,
            })
            .sum()
    }
}

impl Locator for ScriptedDevice {
    fn find(&self, label: &str, options: &FindOptions) -> Result<Option<Point>> {
        let mut script = self.script.borrow_mut();
        script.probes.push((label.to_string(), *options));
        if let Some(next) = script.finds.get_mut(label).and_then(VecDeque::pop_front) {
            return Ok(next);
        }
        Ok(script.find_defaults.get(label).copied().flatten())
    }

    fn find_all(
        &self,
        label: &str,
        region: Option<Region>,
        confidence: Option<f64>,
    ) -> Result<Vec<Point>> {
        let mut script = self.script.borrow_mut();
        let options = FindOptions {
            region,
            confidence,
            tries: None,
        };
        script.all_probes.push((label.to_string(), options));
        if let Some(next) = script.find_alls.get_mut(label).and_then(VecDeque::pop_front) {
            return Ok(next);
        }
        Ok(script
            .find_all_defaults
            .get(label)
            .cloned()
            .unwrap_or_default())
    }

    fn wait_until_gone(
        &self,
        label: &str,
        _region: Option<Region>,
        _timeout: Duration,
    ) -> Result<bool> {
        let mut script = self.script.borrow_mut();
        if let Some(next) = script.gone.get_mut(label).and_then(VecDeque::pop_front) {
            return Ok(next);
        }
        Ok(script.gone_defaults.get(label).copied().unwrap_or(true))
    }
}

impl Input for ScriptedDevice {
    fn tap(&self, point: Point, label: &str) -> Result<()> {
        self.script.borrow_mut().actions.push(Action::Tap {
            point,
            label: label.to_string(),
        });
        Ok(())
    }

    fn swipe(&self, from: Point, to: Point) -> Result<()> {
        self.script
            .borrow_mut()
            .actions
            .push(Action::Swipe { from, to });
        Ok(())
    }

    fn pinch(&self, center: Point, start_spacing: f64, end_spacing: f64) -> Result<()> {
        self.script.borrow_mut().actions.push(Action::Pinch {
            center,
            start: start_spacing,
            end: end_spacing,
        });
        Ok(())
    }
}

impl TextReader for ScriptedDevice {
    fn read(&self, region: Region, binarize: bool) -> Result<String> {
        let mut script = self.script.borrow_mut();
        script.actions.push(Action::Read { region, binarize });
        Ok(script.reads.pop_front().unwrap_or_default())
    }
}

impl Clock for ScriptedDevice {
    fn sleep(&self, duration: Duration) {
        self.script.borrow_mut().actions.push(Action::Sleep(duration));
    }
}
