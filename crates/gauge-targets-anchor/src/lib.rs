//! Anchor drift tracking for fixed-mount gauge cameras.
//!
//! An unattended camera sways with wind and temperature; the scene anchor
//! (any textured, immobile patch) lets later frames be registered back to
//! the calibration frame. The pipeline is:
//!
//! 1. [`AnchorTracker::set_ref`] blurs a reference image and builds a bank
//!    of pre-rotated templates around the reference rect,
//! 2. [`AnchorTracker::track`] correlates every template against a new
//!    frame (ZNCC) and reports the best rotation/translation hypothesis,
//! 3. [`adjust_search_segments`] translates the calibration-time scan
//!    segments by the observed drift for the downstream line finder.

mod blur;
mod error;
mod ncc;
mod rotate;
mod search_region;
mod tracker;

pub use blur::blur;
pub use error::TrackError;
pub use rotate::rotate_about_center;
pub use search_region::adjust_search_segments;
pub use tracker::{AnchorModel, AnchorParams, AnchorTracker, RotatedTemplate, TrackResult};
