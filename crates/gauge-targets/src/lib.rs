//! High-level facade crate for the `gauge-targets-*` workspace.
//!
//! A staff gauge camera photographs a water gauge with a red octagonal
//! fiducial mounted on it. This crate wires the workspace together:
//! detect the fiducial, calibrate a pixel <-> world plane mapping from its
//! eight corners, and track apparent camera drift between frames so the
//! downstream water-line reader can shift its scan segments.
//!
//! ## Quickstart
//!
//! ```no_run
//! use gauge_targets::{GaugeParams, SearchSegment};
//! use nalgebra::Point2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::ImageReader::open("frame.png")?.decode()?.to_rgb8();
//! let segments = [SearchSegment::new(
//!     Point2::new(412.0, 300.0),
//!     Point2::new(412.0, 1080.0),
//! )];
//!
//! let result = gauge_targets::io::calibrate_rgb(&img, &GaugeParams::default(), &segments)?;
//! println!(
//!     "calibrated, reprojection rms {:.3} px",
//!     result.model.reprojection_stats()?.rms
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `gauge_targets::core`: geometry, images, homographies, the calibrator.
//! - `gauge_targets::octagon`: red octagon segmentation, edge fitting, corners.
//! - `gauge_targets::anchor`: rotated-template drift tracking and segment adjustment.
//! - `gauge_targets::pipeline`: detection + calibration glued end to end.
//! - `gauge_targets::io` (feature `image`): adapters for the `image` crate.

pub use gauge_targets_anchor as anchor;
pub use gauge_targets_core as core;
pub use gauge_targets_octagon as octagon;

pub use gauge_targets_anchor::{adjust_search_segments, AnchorParams, AnchorTracker, TrackResult};
pub use gauge_targets_core::{CalibrationModel, Calibrator, CalibratorParams, SearchSegment};
pub use gauge_targets_octagon::{OctagonDetection, OctagonDetector, OctagonParams};

pub mod pipeline;
pub use pipeline::{calibrate_frame, GaugeCalibration, GaugeParams, PipelineError};

#[cfg(feature = "image")]
pub mod io;
