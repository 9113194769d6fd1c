//! Injectable sink for intermediate detector rasters.
//!
//! Detectors emit their intermediate stages (segmentation mask, edge raster,
//! per-swath masks) through this trait so that tooling can capture them
//! without the library writing files itself. The default [`NullSink`] drops
//! everything.

use crate::image::GrayImageView;

/// Receives intermediate rasters from a detector run.
///
/// Implementations take `&self`; a sink that records images should use
/// interior mutability. Stage names are stable lowercase identifiers
/// (`"mask"`, `"edges"`, `"swath-top"`, ...).
pub trait DiagnosticSink {
    fn gray(&self, stage: &str, image: &GrayImageView<'_>);
}

/// Sink that ignores every emission.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn gray(&self, _stage: &str, _image: &GrayImageView<'_>) {}
}
