use thiserror::Error;

use crate::corners::EdgeTag;

/// Errors produced by the octagon detection pipeline.
///
/// Every stage either fully succeeds or fails with one of these; there is
/// no partial detection and no internal retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("invalid rgb buffer length (expected {expected} bytes, got {got})")]
    InvalidRgbBuffer { expected: usize, got: usize },

    #[error("empty input image ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("no candidate region survived segmentation filtering")]
    NoCandidates,

    #[error("swath toward {0} contains no boundary pixels")]
    EmptySwath(EdgeTag),

    #[error("boundary pixels in the {0} swath have no spread, line fit is degenerate")]
    DegenerateFit(EdgeTag),

    #[error("edges {0} and {1} are parallel")]
    ParallelEdges(EdgeTag, EdgeTag),
}
