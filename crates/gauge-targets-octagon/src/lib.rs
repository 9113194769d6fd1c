//! Red octagon fiducial detection.
//!
//! The gauge camera watches a staff with a red regular octagon painted on
//! it. This crate finds that symbol in an RGB frame and recovers its eight
//! corner points:
//!
//! 1. HSV segmentation into candidate regions ([`find_symbol_candidates`])
//! 2. per-edge line fitting in directional swaths ([`fit_octagon_lines`])
//! 3. corner solving from adjacent edge pairs ([`solve_corners`])
//!
//! [`OctagonDetector`] runs the whole pipeline on one frame; the stage
//! functions are public for callers that need the intermediates.

mod corners;
mod detector;
mod error;
mod params;
mod segment;
mod swath;

pub use corners::{octagon_world_corners, solve_corners, EdgeTag, OctagonCorners, CORNER_PAIRS};
pub use detector::{OctagonDetection, OctagonDetector};
pub use error::DetectError;
pub use params::{OctagonParams, SwathParams, SymbolParams};
pub use segment::{find_symbol_candidates, SymbolCandidate};
pub use swath::{fit_octagon_lines, FittedEdge, OctagonLines};
