//! Plane calibration from matched pixel/world point sets.
//!
//! One successful detection produces a [`CalibrationModel`]: both mapping
//! directions, the point pairs they were estimated from, the movement-search
//! rectangle for the anchor tracker, and the water-level search segments.
//! The model is replaced wholesale on every new calibration; there is no
//! incremental update.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::geom::RectI;
use crate::homography::{fit_homography, Homography};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("pixel and world point counts differ (pixel={pixel}, world={world})")]
    MismatchedPoints { pixel: usize, world: usize },

    #[error("at least 4 point pairs are required, got {got}")]
    TooFewPoints { got: usize },

    #[error("non-finite coordinate in {which} points")]
    NonFiniteInput { which: &'static str },

    #[error("{which} points are collinear, the mapping is underdetermined")]
    CollinearPoints { which: &'static str },

    #[error("homography estimation failed for the {direction} direction")]
    EstimationFailed { direction: &'static str },

    #[error("no corner points to derive a search region from")]
    EmptyCorners,

    #[error("movement search region {width}x{height} after clipping is below the {min_side} px minimum")]
    SearchRegionTooSmall {
        width: i32,
        height: i32,
        min_side: i32,
    },

    #[error("no calibration available, run calibrate first")]
    NotCalibrated,

    #[error("point maps to infinity under the current transform")]
    PointAtInfinity,
}

/// Water-level scan segment, endpoints in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchSegment {
    pub top: Point2<f64>,
    pub bot: Point2<f64>,
}

impl SearchSegment {
    pub fn new(top: Point2<f64>, bot: Point2<f64>) -> Self {
        Self { top, bot }
    }
}

/// Both directions of the pixel <-> world mapping, estimated independently.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneMapping {
    pub pixel_to_world: Homography,
    pub world_to_pixel: Homography,
}

/// Round-trip error of the calibration points through both transforms, in
/// pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReprojectionStats {
    pub rms_x: f64,
    pub rms_y: f64,
    pub rms: f64,
    pub max: f64,
}

/// Everything one camera pose needs to read world coordinates from pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    pub image_width: usize,
    pub image_height: usize,
    pub pixel_points: Vec<Point2<f64>>,
    pub world_points: Vec<Point2<f64>>,
    pub mapping: PlaneMapping,
    /// Region the anchor tracker searches for camera movement.
    pub movement_search: RectI,
    pub search_segments: Vec<SearchSegment>,
}

impl CalibrationModel {
    pub fn pixel_to_world(&self, p: Point2<f64>) -> Result<Point2<f64>, CalibrationError> {
        self.mapping
            .pixel_to_world
            .apply(p)
            .ok_or(CalibrationError::PointAtInfinity)
    }

    pub fn world_to_pixel(&self, p: Point2<f64>) -> Result<Point2<f64>, CalibrationError> {
        self.mapping
            .world_to_pixel
            .apply(p)
            .ok_or(CalibrationError::PointAtInfinity)
    }

    /// Reprojection error over the stored calibration points
    /// (pixel -> world -> pixel).
    pub fn reprojection_stats(&self) -> Result<ReprojectionStats, CalibrationError> {
        if self.pixel_points.is_empty() {
            return Err(CalibrationError::TooFewPoints { got: 0 });
        }

        let mut sum_x2 = 0.0;
        let mut sum_y2 = 0.0;
        let mut max = 0.0_f64;
        for &p in &self.pixel_points {
            let w = self.pixel_to_world(p)?;
            let back = self.world_to_pixel(w)?;
            let dx = back.x - p.x;
            let dy = back.y - p.y;
            sum_x2 += dx * dx;
            sum_y2 += dy * dy;
            max = max.max((dx * dx + dy * dy).sqrt());
        }

        let n = self.pixel_points.len() as f64;
        Ok(ReprojectionStats {
            rms_x: (sum_x2 / n).sqrt(),
            rms_y: (sum_y2 / n).sqrt(),
            rms: ((sum_x2 + sum_y2) / n).sqrt(),
            max,
        })
    }
}

/// Inputs for one calibration run.
#[derive(Clone, Copy, Debug)]
pub struct CalibrationInput<'a> {
    pub image_width: usize,
    pub image_height: usize,
    pub pixel_points: &'a [Point2<f64>],
    pub world_points: &'a [Point2<f64>],
    pub search_segments: &'a [SearchSegment],
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CalibratorParams {
    /// Growth applied to the corner bounding box on each side, as a fraction
    /// of the box dimension (0.5 doubles width and height before clipping).
    pub roi_growth: f64,
    /// Smallest accepted movement-search side after clipping, in pixels.
    pub roi_min_side: i32,
}

impl Default for CalibratorParams {
    fn default() -> Self {
        Self {
            roi_growth: 0.5,
            roi_min_side: 30,
        }
    }
}

/// Holds the current calibration for one camera, if any.
///
/// Transform queries fail with [`CalibrationError::NotCalibrated`] until a
/// `calibrate` call succeeds or a persisted model is restored with
/// `set_model`.
#[derive(Debug, Default)]
pub struct Calibrator {
    params: CalibratorParams,
    model: Option<CalibrationModel>,
}

impl Calibrator {
    pub fn new(params: CalibratorParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    pub fn model(&self) -> Option<&CalibrationModel> {
        self.model.as_ref()
    }

    /// Restore a previously persisted model.
    pub fn set_model(&mut self, model: CalibrationModel) {
        self.model = Some(model);
    }

    pub fn clear(&mut self) {
        self.model = None;
    }

    /// Estimate both mapping directions and assemble a fresh model.
    ///
    /// Requires equal-length, at least 4-point, non-collinear pixel and
    /// world sets. Either direction failing to produce a finite transform
    /// fails the whole call; a partial model is never stored.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, input), fields(points = input.pixel_points.len()))
    )]
    pub fn calibrate(
        &mut self,
        input: &CalibrationInput<'_>,
    ) -> Result<&CalibrationModel, CalibrationError> {
        let pixel = input.pixel_points;
        let world = input.world_points;

        if pixel.len() != world.len() {
            return Err(CalibrationError::MismatchedPoints {
                pixel: pixel.len(),
                world: world.len(),
            });
        }
        if pixel.len() < 4 {
            return Err(CalibrationError::TooFewPoints { got: pixel.len() });
        }
        if !points_finite(pixel) {
            return Err(CalibrationError::NonFiniteInput { which: "pixel" });
        }
        if !points_finite(world) {
            return Err(CalibrationError::NonFiniteInput { which: "world" });
        }
        if points_collinear(pixel) {
            return Err(CalibrationError::CollinearPoints { which: "pixel" });
        }
        if points_collinear(world) {
            return Err(CalibrationError::CollinearPoints { which: "world" });
        }

        let forward = fit_homography(pixel, world)
            .filter(Homography::is_finite)
            .ok_or(CalibrationError::EstimationFailed {
                direction: "pixel->world",
            })?;
        let inverse = fit_homography(world, pixel)
            .filter(Homography::is_finite)
            .ok_or(CalibrationError::EstimationFailed {
                direction: "world->pixel",
            })?;

        let movement_search = movement_search_roi(
            input.image_width,
            input.image_height,
            pixel,
            &self.params,
        )?;

        let model = CalibrationModel {
            image_width: input.image_width,
            image_height: input.image_height,
            pixel_points: pixel.to_vec(),
            world_points: world.to_vec(),
            mapping: PlaneMapping {
                pixel_to_world: forward,
                world_to_pixel: inverse,
            },
            movement_search,
            search_segments: input.search_segments.to_vec(),
        };

        if let Ok(stats) = model.reprojection_stats() {
            log::debug!(
                "calibrated from {} points, reprojection rms {:.4} px (max {:.4})",
                pixel.len(),
                stats.rms,
                stats.max
            );
        }

        Ok(self.model.insert(model))
    }

    pub fn pixel_to_world(&self, p: Point2<f64>) -> Result<Point2<f64>, CalibrationError> {
        self.require_model()?.pixel_to_world(p)
    }

    pub fn world_to_pixel(&self, p: Point2<f64>) -> Result<Point2<f64>, CalibrationError> {
        self.require_model()?.world_to_pixel(p)
    }

    pub fn reprojection_stats(&self) -> Result<ReprojectionStats, CalibrationError> {
        self.require_model()?.reprojection_stats()
    }

    fn require_model(&self) -> Result<&CalibrationModel, CalibrationError> {
        self.model.as_ref().ok_or(CalibrationError::NotCalibrated)
    }
}

/// Movement-search rectangle: the corner bounding box grown by
/// `params.roi_growth` of its size on every side, clipped to the image.
///
/// Fails when the clipped rectangle is smaller than `params.roi_min_side`
/// in either dimension.
pub fn movement_search_roi(
    image_width: usize,
    image_height: usize,
    corners: &[Point2<f64>],
    params: &CalibratorParams,
) -> Result<RectI, CalibrationError> {
    if corners.is_empty() {
        return Err(CalibrationError::EmptyCorners);
    }
    if !points_finite(corners) {
        return Err(CalibrationError::NonFiniteInput { which: "corner" });
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in corners {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    let grow_x = params.roi_growth * (max_x - min_x);
    let grow_y = params.roi_growth * (max_y - min_y);

    let x0 = (min_x - grow_x).max(0.0).floor() as i32;
    let y0 = (min_y - grow_y).max(0.0).floor() as i32;
    let x1 = (max_x + grow_x).min(image_width as f64).ceil() as i32;
    let y1 = (max_y + grow_y).min(image_height as f64).ceil() as i32;

    let width = x1 - x0;
    let height = y1 - y0;
    if width < params.roi_min_side || height < params.roi_min_side {
        return Err(CalibrationError::SearchRegionTooSmall {
            width,
            height,
            min_side: params.roi_min_side,
        });
    }

    Ok(RectI::new(x0, y0, width, height))
}

fn points_finite(pts: &[Point2<f64>]) -> bool {
    pts.iter().all(|p| p.x.is_finite() && p.y.is_finite())
}

/// All points within a hair of one line (or coincident).
fn points_collinear(pts: &[Point2<f64>]) -> bool {
    if pts.len() < 3 {
        return true;
    }

    let p0 = pts[0];
    let mut far = p0;
    let mut far_d = 0.0;
    for p in &pts[1..] {
        let d = (*p - p0).norm();
        if d > far_d {
            far_d = d;
            far = *p;
        }
    }
    if far_d < 1e-12 {
        return true;
    }

    let dir = (far - p0) / far_d;
    let tol = far_d * 1e-9;
    pts.iter().all(|p| {
        let d = *p - p0;
        (dir.x * d.y - dir.y * d.x).abs() <= tol
    })
}
