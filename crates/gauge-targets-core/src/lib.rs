//! Core types and utilities for gauge target detection.
//!
//! This crate is intentionally small and purely geometric: image containers,
//! line and rectangle primitives, homography estimation, and the plane
//! calibration state one camera pose produces. It does *not* depend on any
//! concrete detector, color model, or I/O stack.

mod calibration;
mod diagnostics;
mod geom;
mod homography;
mod image;
mod logger;

pub use calibration::{
    movement_search_roi, CalibrationError, CalibrationInput, CalibrationModel, Calibrator,
    CalibratorParams, PlaneMapping, ReprojectionStats, SearchSegment,
};
pub use diagnostics::{DiagnosticSink, NullSink};
pub use geom::{line_intersection, Line, RectI};
pub use homography::{fit_homography, Homography};
pub use image::{
    crop_gray, sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, RgbImage,
    RgbImageView,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init, init_with_level};
