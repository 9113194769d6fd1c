use thiserror::Error;

/// Errors from reference setup, tracking, and segment adjustment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    #[error("empty image ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("reference rect ({x}, {y}) {width}x{height} does not fit the reference image")]
    InvalidRect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    #[error(
        "reference rect {rect_width}x{rect_height} must be at least {margin}px smaller \
         than the {image_width}x{image_height} reference in both dimensions"
    )]
    RectTooLarge {
        rect_width: i32,
        rect_height: i32,
        image_width: usize,
        image_height: usize,
        margin: i32,
    },

    #[error("frame {frame_width}x{frame_height} is smaller than the {template_width}x{template_height} template")]
    FrameTooSmall {
        frame_width: usize,
        frame_height: usize,
        template_width: usize,
        template_height: usize,
    },

    #[error("no reference defined")]
    NoReference,

    #[error("no search segments to adjust")]
    EmptySegments,
}
