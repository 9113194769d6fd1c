//! Rotation-tolerant anchor tracking against a pre-rotated template bank.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::instrument;

use gauge_targets_core::{crop_gray, GrayImage, GrayImageView, RectI};

use crate::blur::blur;
use crate::error::TrackError;
use crate::ncc::best_match;
use crate::rotate::rotate_about_center;

/// Tunables for reference preparation and matching.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AnchorParams {
    /// Minimum slack between reference rect and reference image, px per axis.
    pub margin: i32,
    /// Bank covers `[-max_steps, max_steps]` whole steps of `step_deg`.
    pub max_steps: i32,
    /// Angular resolution of the template bank, degrees.
    pub step_deg: f64,
    /// Correlation searches window origins within this distance of the
    /// reference rect origin, px per axis.
    pub search_margin: i32,
}

impl Default for AnchorParams {
    fn default() -> Self {
        Self {
            margin: 50,        // rect must leave this much of the image uncovered
            max_steps: 15,     // 31 templates
            step_deg: 0.5,     // sized for small camera sway
            search_margin: 30, // larger drifts need a wider window
        }
    }
}

/// One pre-rotated entry of the reference bank.
#[derive(Clone, Debug)]
pub struct RotatedTemplate {
    /// Bank angle in degrees.
    pub angle_deg: f64,
    /// Blurred, rotated, rect-cropped reference patch.
    pub patch: GrayImage,
    /// Correlation score this template reached on the latest frame.
    pub last_score: f64,
    /// Offset from the reference rect origin on the latest frame.
    pub last_offset: (i32, i32),
}

/// Reference bank built by a successful [`AnchorTracker::set_ref`].
///
/// Read-only after construction except for the per-frame score and offset
/// fields each [`AnchorTracker::track`] call refreshes.
#[derive(Clone, Debug)]
pub struct AnchorModel {
    /// Rect the templates were cropped from, in reference-image coordinates.
    pub reference_rect: RectI,
    /// Templates in scan order, most negative angle first.
    pub templates: Vec<RotatedTemplate>,
    /// Provenance of the reference image, when the caller knows it.
    pub source: Option<PathBuf>,
}

/// Winning rotation/translation hypothesis for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackResult {
    /// Bank angle of the winning template, degrees.
    pub angle_deg: f64,
    /// Winning location minus the reference rect origin, px.
    pub offset: (i32, i32),
    /// ZNCC score of the winner, in [-1, 1].
    pub score: f64,
    /// Top-left corner of the winning match in frame coordinates.
    pub location: (i32, i32),
}

/// Tracks apparent drift of a fixed scene anchor across frames.
///
/// [`set_ref`](Self::set_ref) prepares a bank of pre-rotated reference
/// patches; [`track`](Self::track) correlates every bank entry against a new
/// frame and reports the best rotation/translation hypothesis. Tracking
/// never changes the reference; [`clear`](Self::clear) drops it.
#[derive(Clone, Debug, Default)]
pub struct AnchorTracker {
    params: AnchorParams,
    model: Option<AnchorModel>,
}

impl AnchorTracker {
    pub fn new(params: AnchorParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    pub fn params(&self) -> &AnchorParams {
        &self.params
    }

    /// The current reference bank, if one is set.
    pub fn model(&self) -> Option<&AnchorModel> {
        self.model.as_ref()
    }

    /// Drop the reference; the tracker must be re-armed with `set_ref`.
    pub fn clear(&mut self) {
        self.model = None;
    }

    /// Build the rotated template bank from a reference image.
    ///
    /// The rect must lie inside the image and leave at least
    /// [`AnchorParams::margin`] pixels of slack in both dimensions so that
    /// rotated crops stay supported by real pixels. The reference is blurred
    /// once; each bank entry is the rect crop of the blurred image rotated
    /// about the image center by its bank angle.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, reference), fields(w = reference.width, h = reference.height))
    )]
    pub fn set_ref(
        &mut self,
        reference: &GrayImageView<'_>,
        rect: RectI,
    ) -> Result<&AnchorModel, TrackError> {
        if reference.width == 0 || reference.height == 0 {
            return Err(TrackError::EmptyImage {
                width: reference.width,
                height: reference.height,
            });
        }
        if rect.width <= 0
            || rect.height <= 0
            || rect.x < 0
            || rect.y < 0
            || rect.right() > reference.width as i32
            || rect.bottom() > reference.height as i32
        {
            return Err(TrackError::InvalidRect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            });
        }
        let margin = self.params.margin;
        if reference.width as i32 - rect.width < margin
            || reference.height as i32 - rect.height < margin
        {
            return Err(TrackError::RectTooLarge {
                rect_width: rect.width,
                rect_height: rect.height,
                image_width: reference.width,
                image_height: reference.height,
                margin,
            });
        }

        let blurred = blur(reference);
        let templates = (-self.params.max_steps..=self.params.max_steps)
            .map(|i| {
                let angle_deg = i as f64 * self.params.step_deg;
                let rotated = rotate_about_center(&blurred.view(), angle_deg);
                let patch = crop_gray(
                    &rotated.view(),
                    rect.x,
                    rect.y,
                    rect.width as usize,
                    rect.height as usize,
                );
                RotatedTemplate {
                    angle_deg,
                    patch,
                    last_score: 0.0,
                    last_offset: (0, 0),
                }
            })
            .collect();

        log::debug!(
            "anchor reference set: rect ({}, {}) {}x{}, {} templates",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            2 * self.params.max_steps + 1
        );
        Ok(self.model.insert(AnchorModel {
            reference_rect: rect,
            templates,
            source: None,
        }))
    }

    /// Record where the current reference image came from.
    ///
    /// Purely informational; `clear` drops it along with the bank. Fails
    /// when no reference is set.
    pub fn set_ref_source(&mut self, source: impl Into<PathBuf>) -> Result<(), TrackError> {
        let model = self.model.as_mut().ok_or(TrackError::NoReference)?;
        model.source = Some(source.into());
        Ok(())
    }

    /// Correlate the frame against every bank template.
    ///
    /// The frame gets the same blur as the reference did. Each template is
    /// correlated over the window origins within
    /// [`AnchorParams::search_margin`] of the reference rect origin (clipped
    /// to the frame), which bounds the per-frame cost to the drift range the
    /// camera can actually produce. Every template records its own best
    /// score and offset; the globally highest score picks the reported angle
    /// and offset. Score ties go to the smaller `|angle|`; an exact
    /// `±angle` tie keeps the earlier bank entry. The reference stays
    /// untouched, so tracking can repeat indefinitely.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(w = frame.width, h = frame.height))
    )]
    pub fn track(&mut self, frame: &GrayImageView<'_>) -> Result<TrackResult, TrackError> {
        let model = self.model.as_mut().ok_or(TrackError::NoReference)?;
        if frame.width == 0 || frame.height == 0 {
            return Err(TrackError::EmptyImage {
                width: frame.width,
                height: frame.height,
            });
        }
        let rect = model.reference_rect;
        let (tw, th) = (rect.width as usize, rect.height as usize);
        if frame.width < tw || frame.height < th {
            return Err(TrackError::FrameTooSmall {
                frame_width: frame.width,
                frame_height: frame.height,
                template_width: tw,
                template_height: th,
            });
        }

        let blurred = blur(frame);
        let view = blurred.view();

        let margin = self.params.search_margin.max(0);
        let max_ox = (frame.width - tw) as i32;
        let max_oy = (frame.height - th) as i32;
        let x_window = (
            (rect.x - margin).clamp(0, max_ox) as usize,
            (rect.x + margin).clamp(0, max_ox) as usize,
        );
        let y_window = (
            (rect.y - margin).clamp(0, max_oy) as usize,
            (rect.y + margin).clamp(0, max_oy) as usize,
        );

        let mut best: Option<(usize, f64, f64)> = None; // index, |angle|, score
        for (idx, tpl) in model.templates.iter_mut().enumerate() {
            let m = best_match(&view, &tpl.patch.view(), x_window, y_window);
            tpl.last_score = m.score;
            tpl.last_offset = (m.x as i32 - rect.x, m.y as i32 - rect.y);

            let abs_angle = tpl.angle_deg.abs();
            let take = match best {
                None => true,
                Some((_, best_abs, best_score)) => {
                    m.score > best_score || (m.score == best_score && abs_angle < best_abs)
                }
            };
            if take {
                best = Some((idx, abs_angle, m.score));
            }
        }

        // the bank always holds at least the zero-angle template
        let (idx, _, _) = best.ok_or(TrackError::NoReference)?;
        let tpl = &model.templates[idx];
        let result = TrackResult {
            angle_deg: tpl.angle_deg,
            offset: tpl.last_offset,
            score: tpl.last_score,
            location: (rect.x + tpl.last_offset.0, rect.y + tpl.last_offset.1),
        };
        log::debug!(
            "anchor track: angle {:+.1} deg, offset ({}, {}), score {:.4}",
            result.angle_deg,
            result.offset.0,
            result.offset.1,
            result.score
        );
        Ok(result)
    }
}
