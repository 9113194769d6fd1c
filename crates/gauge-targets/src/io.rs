//! Adapters between the `image` crate and the lightweight core view types.

use std::path::Path;

use crate::core;
use crate::pipeline::{calibrate_frame, GaugeCalibration, GaugeParams, PipelineError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Borrow an `image::RgbImage` as the core RGB view type.
pub fn rgb_view(img: &::image::RgbImage) -> core::RgbImageView<'_> {
    core::RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Borrow an `image::GrayImage` as the core grayscale view type.
pub fn gray_view(img: &::image::GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Load a file as 8-bit RGB.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<::image::RgbImage, ::image::ImageError> {
    let img = ::image::ImageReader::open(path)?.decode()?;
    Ok(img.to_rgb8())
}

/// [`calibrate_frame`] for an `image::RgbImage`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, params, search_segments),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn calibrate_rgb(
    img: &::image::RgbImage,
    params: &GaugeParams,
    search_segments: &[core::SearchSegment],
) -> Result<GaugeCalibration, PipelineError> {
    calibrate_frame(&rgb_view(img), params, search_segments)
}
