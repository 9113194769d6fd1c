//! Corner solving from the eight fitted edges.

use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use gauge_targets_core::line_intersection;

use crate::error::DetectError;
use crate::swath::OctagonLines;

/// Octagon edge identity.
///
/// Cardinal edges face the image axes, diagonal edges sit between them.
/// The names describe the symbol in its nominal upright pose; small camera
/// rotations keep the assignment valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeTag {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BotLeft,
    BotRight,
}

impl EdgeTag {
    pub const ALL: [EdgeTag; 8] = [
        EdgeTag::Top,
        EdgeTag::Bottom,
        EdgeTag::Left,
        EdgeTag::Right,
        EdgeTag::TopLeft,
        EdgeTag::TopRight,
        EdgeTag::BotLeft,
        EdgeTag::BotRight,
    ];
}

impl fmt::Display for EdgeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EdgeTag::Top => "top",
            EdgeTag::Bottom => "bottom",
            EdgeTag::Left => "left",
            EdgeTag::Right => "right",
            EdgeTag::TopLeft => "top-left",
            EdgeTag::TopRight => "top-right",
            EdgeTag::BotLeft => "bot-left",
            EdgeTag::BotRight => "bot-right",
        })
    }
}

/// Adjacent edge pairs in corner order.
///
/// Corner `i` is the intersection of `CORNER_PAIRS[i]`. The walk starts at
/// the upper end of the left edge and proceeds clockwise, so corner order
/// is identical on every run of every stage.
pub const CORNER_PAIRS: [(EdgeTag, EdgeTag); 8] = [
    (EdgeTag::Left, EdgeTag::TopLeft),
    (EdgeTag::TopLeft, EdgeTag::Top),
    (EdgeTag::Top, EdgeTag::TopRight),
    (EdgeTag::TopRight, EdgeTag::Right),
    (EdgeTag::Right, EdgeTag::BotRight),
    (EdgeTag::BotRight, EdgeTag::Bottom),
    (EdgeTag::Bottom, EdgeTag::BotLeft),
    (EdgeTag::BotLeft, EdgeTag::Left),
];

/// The eight solved corner points, in [`CORNER_PAIRS`] order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OctagonCorners {
    pub points: [Point2<f64>; 8],
}

impl OctagonCorners {
    pub fn as_slice(&self) -> &[Point2<f64>] {
        &self.points
    }
}

/// Intersect the eight adjacent edge pairs.
///
/// A parallel pair is a hard failure naming both edges; no corner set is
/// returned unless all eight intersections exist.
pub fn solve_corners(lines: &OctagonLines) -> Result<OctagonCorners, DetectError> {
    let mut points = [Point2::origin(); 8];
    for (slot, (a, b)) in points.iter_mut().zip(CORNER_PAIRS) {
        let la = lines.get(a);
        let lb = lines.get(b);
        *slot =
            line_intersection(&la.line, &lb.line).ok_or(DetectError::ParallelEdges(a, b))?;
    }
    Ok(OctagonCorners { points })
}

/// World-plane octagon vertices matching [`CORNER_PAIRS`] order.
///
/// Regular octagon with side length `side`, centered on the origin of a
/// y-down world frame (the same orientation as pixel coordinates). The
/// first vertex is the upper end of the left edge; the walk is clockwise.
pub fn octagon_world_corners(side: f64) -> [Point2<f64>; 8] {
    // center-to-cardinal-edge distance and half side
    let a = 0.5 * (1.0 + std::f64::consts::SQRT_2) * side;
    let k = 0.5 * side;
    [
        Point2::new(-a, -k),
        Point2::new(-k, -a),
        Point2::new(k, -a),
        Point2::new(a, -k),
        Point2::new(a, k),
        Point2::new(k, a),
        Point2::new(-k, a),
        Point2::new(-a, k),
    ]
}
