//! Detection and calibration glued end to end.

use crate::core::{
    CalibrationError, CalibrationInput, CalibrationModel, Calibrator, CalibratorParams,
    RgbImageView, SearchSegment,
};
use crate::octagon::{
    octagon_world_corners, DetectError, OctagonDetection, OctagonDetector, OctagonParams,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the end-to-end helpers.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// Settings for one calibration run.
#[derive(Clone, Copy, Debug)]
pub struct GaugeParams {
    pub octagon: OctagonParams,
    pub calibrator: CalibratorParams,
    /// Side length of the physical octagon in world units.
    pub world_side: f64,
}

impl Default for GaugeParams {
    fn default() -> Self {
        Self {
            octagon: OctagonParams::default(),
            calibrator: CalibratorParams::default(),
            world_side: 0.6, // the deployed gauge plates
        }
    }
}

/// Detection plus the calibration model derived from it.
#[derive(Clone, Debug)]
pub struct GaugeCalibration {
    pub detection: OctagonDetection,
    pub model: CalibrationModel,
}

/// Detect the octagon and calibrate the plane mapping in one call.
///
/// The eight detected pixel corners pair with the world octagon of
/// [`GaugeParams::world_side`] in matching order. `search_segments` are the
/// calibration-time water-level scan segments stored into the model; an
/// empty slice is fine when the caller manages segments elsewhere.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, params, search_segments),
        fields(width = img.width, height = img.height)
    )
)]
pub fn calibrate_frame(
    img: &RgbImageView<'_>,
    params: &GaugeParams,
    search_segments: &[SearchSegment],
) -> Result<GaugeCalibration, PipelineError> {
    let detector = OctagonDetector::new(params.octagon);
    let detection = detector.detect(img)?;

    let world = octagon_world_corners(params.world_side);
    let mut calibrator = Calibrator::new(params.calibrator);
    let input = CalibrationInput {
        image_width: img.width,
        image_height: img.height,
        pixel_points: detection.corners.as_slice(),
        world_points: &world,
        search_segments,
    };
    let model = calibrator.calibrate(&input)?.clone();

    Ok(GaugeCalibration { detection, model })
}
