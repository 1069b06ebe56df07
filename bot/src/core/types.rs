//! Shared deterministic types for the bot's decision logic.
//!
//! Geometry values passed to and from the device collaborators, plus the
//! script vocabulary (setup steps and planning moves) that map files are
//! decoded into. Nothing here performs I/O.

use serde::{Deserialize, Serialize};

/// A screen coordinate in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Return this point shifted by `(dx, dy)`.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Axis-aligned screen rectangle used to bound probes and OCR reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of `width`x`height` whose top-left corner sits at `origin`
    /// shifted by `(dx, dy)`.
    pub fn anchored(origin: Point, dx: i32, dy: i32, width: i32, height: i32) -> Self {
        Self {
            x: origin.x as i32 + dx,
            y: origin.y as i32 + dy,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        let (x, y) = (point.x as i32, point.y as i32);
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Device screen dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    pub width: i32,
    pub height: i32,
}

impl Display {
    pub fn full(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    pub fn upper_half(&self) -> Region {
        Region::new(0, 0, self.width, self.height / 2)
    }

    pub fn lower_half(&self) -> Region {
        Region::new(0, self.height / 2, self.width, self.height / 2)
    }

    pub fn left_half(&self) -> Region {
        Region::new(0, 0, self.width / 2, self.height)
    }

    pub fn upper_third(&self) -> Region {
        Region::new(0, 0, self.width, self.height / 3)
    }

    pub fn center(&self) -> Point {
        Point::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

/// Preparation-phase action recorded in a map script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupAction {
    PinchIn,
    PinchOut,
    SwipeUp,
    SwipeDown,
    DeployDummy,
    DeployEchelon,
}

impl SetupAction {
    /// True for the two actions that place an echelon on a node.
    pub fn is_deploy(self) -> bool {
        matches!(self, SetupAction::DeployDummy | SetupAction::DeployEchelon)
    }
}

/// One ordered preparation step: zoom, pan or deploy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupStep {
    pub action: SetupAction,
    /// Start/end finger spacing for pinches. Swipes travel `spacing[0]` pixels.
    #[serde(default)]
    pub spacing: Option<[f64; 2]>,
    /// Node to tap for deploy actions; gesture anchor otherwise.
    #[serde(default)]
    pub coordinates: Option<Point>,
}

/// Planning-mode move recorded in a map script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Start,
    StartNoResupply,
    Resupply,
    Move,
    Retreat,
}

/// One ordered planning move on a map node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanMove {
    pub action: PlanAction,
    pub coordinates: Point,
}

/// Ordered setup and planning data for a single map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapScript {
    pub setup: Vec<SetupStep>,
    pub moves: Vec<PlanMove>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_regions_split_the_screen() {
        let display = Display {
            width: 2560,
            height: 1440,
        };
        assert_eq!(display.lower_half(), Region::new(0, 720, 2560, 720));
        assert_eq!(display.left_half(), Region::new(0, 0, 1280, 1440));
        assert_eq!(display.upper_third(), Region::new(0, 0, 2560, 480));
        assert_eq!(display.center(), Point::new(1280.0, 720.0));
    }

    #[test]
    fn anchored_region_offsets_from_point() {
        let region = Region::anchored(Point::new(500.0, 200.0), -80, 90, 630, 90);
        assert_eq!(region, Region::new(420, 290, 630, 90));
        assert!(region.contains(Point::new(420.0, 290.0)));
        assert!(!region.contains(Point::new(1050.0, 290.0)));
    }

    #[test]
    fn setup_actions_decode_from_snake_case() {
        let step: SetupStep = serde_json::from_str(
            r#"{"action":"deploy_dummy","coordinates":{"x":10.0,"y":20.0}}"#,
        )
        .expect("decode");
        assert_eq!(step.action, SetupAction::DeployDummy);
        assert!(step.action.is_deploy());
        assert_eq!(step.spacing, None);

        let err = serde_json::from_str::<SetupStep>(r#"{"action":"teleport"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown variant"));
    }
}
