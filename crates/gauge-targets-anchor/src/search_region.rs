//! Search segment adjustment from tracked anchor drift.

use nalgebra::{Point2, Vector2};

use gauge_targets_core::SearchSegment;

use crate::error::TrackError;

/// Translate calibration-time search segments by the observed anchor drift.
///
/// The displacement is `observed_center - reference_center`, rounded to
/// whole pixels per component. When the rounded displacement is zero the
/// input comes back unchanged. An empty segment list is a hard error: the
/// downstream line finder has nothing to scan.
pub fn adjust_search_segments(
    segments: &[SearchSegment],
    observed_center: Point2<f64>,
    reference_center: Point2<f64>,
) -> Result<Vec<SearchSegment>, TrackError> {
    if segments.is_empty() {
        return Err(TrackError::EmptySegments);
    }

    let dx = (observed_center.x - reference_center.x).round();
    let dy = (observed_center.y - reference_center.y).round();
    if dx == 0.0 && dy == 0.0 {
        return Ok(segments.to_vec());
    }

    let shift = Vector2::new(dx, dy);
    log::debug!("search segments shifted by ({dx}, {dy})");
    Ok(segments
        .iter()
        .map(|s| SearchSegment {
            top: s.top + shift,
            bot: s.bot + shift,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> Vec<SearchSegment> {
        vec![
            SearchSegment {
                top: Point2::new(100.0, 50.0),
                bot: Point2::new(100.0, 400.0),
            },
            SearchSegment {
                top: Point2::new(250.5, 60.0),
                bot: Point2::new(251.0, 380.0),
            },
        ]
    }

    #[test]
    fn zero_displacement_returns_input_unchanged() {
        let input = segments();
        let center = Point2::new(320.0, 240.0);
        let out = adjust_search_segments(&input, center, center).expect("segments adjusted");
        assert_eq!(out, input);
    }

    #[test]
    fn subpixel_displacement_rounds_away() {
        let input = segments();
        let out = adjust_search_segments(
            &input,
            Point2::new(320.4, 239.6),
            Point2::new(320.0, 240.0),
        )
        .expect("segments adjusted");
        assert_eq!(out, input);
    }

    #[test]
    fn integer_displacement_shifts_every_endpoint() {
        let input = segments();
        let out = adjust_search_segments(
            &input,
            Point2::new(323.0, 238.0),
            Point2::new(320.0, 240.0),
        )
        .expect("segments adjusted");

        for (o, i) in out.iter().zip(&input) {
            assert_eq!(o.top, Point2::new(i.top.x + 3.0, i.top.y - 2.0));
            assert_eq!(o.bot, Point2::new(i.bot.x + 3.0, i.bot.y - 2.0));
        }
    }

    #[test]
    fn fractional_displacement_rounds_per_component() {
        let input = segments();
        let out = adjust_search_segments(
            &input,
            Point2::new(322.6, 238.6),
            Point2::new(320.0, 240.0),
        )
        .expect("segments adjusted");

        // (2.6, -1.4) rounds to (3, -1)
        assert_eq!(out[0].top, Point2::new(103.0, 49.0));
    }

    #[test]
    fn empty_segment_list_is_a_hard_error() {
        let err = adjust_search_segments(
            &[],
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 0.0),
        )
        .unwrap_err();
        assert_eq!(err, TrackError::EmptySegments);
    }
}
