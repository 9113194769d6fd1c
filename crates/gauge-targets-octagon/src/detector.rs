//! Full octagon detection: segmentation, edge fitting, corner solve.

use gauge_targets_core::{DiagnosticSink, NullSink, RgbImageView};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::corners::{solve_corners, OctagonCorners};
use crate::error::DetectError;
use crate::params::OctagonParams;
use crate::segment::{find_symbol_candidates, SymbolCandidate};
use crate::swath::{fit_octagon_lines, OctagonLines};

/// Result of a successful detection.
#[derive(Clone, Debug)]
pub struct OctagonDetection {
    /// Segmented region the solution came from.
    pub candidate: SymbolCandidate,
    /// Robustly fitted edge lines.
    pub lines: OctagonLines,
    /// Corners solved from adjacent edge pairs, in [`crate::CORNER_PAIRS`] order.
    pub corners: OctagonCorners,
}

/// Detector for the red octagon symbol.
///
/// Intermediate rasters (segmentation mask, boundary, per-swath pixel sets)
/// go to the configured [`DiagnosticSink`]; the default sink drops them.
pub struct OctagonDetector {
    params: OctagonParams,
    sink: Box<dyn DiagnosticSink>,
}

impl Default for OctagonDetector {
    fn default() -> Self {
        Self::new(OctagonParams::default())
    }
}

impl OctagonDetector {
    pub fn new(params: OctagonParams) -> Self {
        Self {
            params,
            sink: Box::new(NullSink),
        }
    }

    /// Route intermediate rasters into `sink`.
    pub fn with_sink(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn params(&self) -> &OctagonParams {
        &self.params
    }

    /// Detect the symbol and solve its eight corners.
    ///
    /// Candidates are tried largest-first; a candidate that fails edge
    /// fitting or corner solving is skipped and the next one gets a turn.
    /// When every candidate fails, the error of the last attempt comes back.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(w = img.width, h = img.height))
    )]
    pub fn detect(&self, img: &RgbImageView<'_>) -> Result<OctagonDetection, DetectError> {
        let candidates = find_symbol_candidates(img, &self.params.symbol, self.sink.as_ref())?;
        let total = candidates.len();

        let mut last_err = DetectError::NoCandidates;
        for (i, candidate) in candidates.into_iter().enumerate() {
            match self.solve_candidate(img, candidate) {
                Ok(detection) => {
                    log::debug!(
                        "candidate {}/{} solved (area {}, elongation {:.3})",
                        i + 1,
                        total,
                        detection.candidate.area,
                        detection.candidate.elongation,
                    );
                    return Ok(detection);
                }
                Err(err) => {
                    log::debug!("candidate {}/{} rejected: {err}", i + 1, total);
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    fn solve_candidate(
        &self,
        img: &RgbImageView<'_>,
        candidate: SymbolCandidate,
    ) -> Result<OctagonDetection, DetectError> {
        let lines = fit_octagon_lines(
            &candidate,
            img.width,
            img.height,
            &self.params.swath,
            self.sink.as_ref(),
        )?;
        let corners = solve_corners(&lines)?;
        Ok(OctagonDetection {
            candidate,
            lines,
            corners,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corners::octagon_world_corners;
    use gauge_targets_core::{GrayImageView, RgbImage};
    use nalgebra::Point2;
    use std::cell::RefCell;
    use std::rc::Rc;

    const RED: [u8; 3] = [200, 30, 40];
    const WHITE: [u8; 3] = [255, 255, 255];

    fn inside_octagon(p: Point2<f64>, verts: &[Point2<f64>; 8]) -> bool {
        (0..8).all(|i| {
            let a = verts[i];
            let b = verts[(i + 1) % 8];
            let e = b - a;
            let d = p - a;
            e.x * d.y - e.y * d.x >= 0.0
        })
    }

    fn octagon_image(width: usize, height: usize, octagons: &[(f64, f64, f64)]) -> RgbImage {
        let shapes: Vec<[Point2<f64>; 8]> = octagons
            .iter()
            .map(|&(cx, cy, side)| {
                let mut verts = octagon_world_corners(side);
                for v in &mut verts {
                    v.x += cx;
                    v.y += cy;
                }
                verts
            })
            .collect();

        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let p = Point2::new(x as f64, y as f64);
                let red = shapes.iter().any(|verts| inside_octagon(p, verts));
                data.extend_from_slice(if red { &RED } else { &WHITE });
            }
        }
        RgbImage::from_raw(width, height, data).expect("consistent buffer")
    }

    #[test]
    fn corners_of_synthetic_octagon_are_accurate() {
        let (cx, cy, side) = (160.0, 120.0, 60.0);
        let img = octagon_image(320, 240, &[(cx, cy, side)]);

        let detection = OctagonDetector::default()
            .detect(&img.view())
            .expect("octagon detected");

        let expected = octagon_world_corners(side);
        for (got, want) in detection.corners.points.iter().zip(expected) {
            let dx = got.x - (want.x + cx);
            let dy = got.y - (want.y + cy);
            assert!(
                dx.abs() < 1.5 && dy.abs() < 1.5,
                "corner ({:.2}, {:.2}) too far from ({:.2}, {:.2})",
                got.x,
                got.y,
                want.x + cx,
                want.y + cy
            );
        }
        // every edge was supported by real boundary pixels
        for edge in detection.lines.iter() {
            assert!(edge.support >= 5, "{} edge support {}", edge.tag, edge.support);
        }
    }

    #[test]
    fn largest_candidate_wins() {
        let img = octagon_image(480, 240, &[(120.0, 120.0, 40.0), (340.0, 120.0, 60.0)]);

        let detection = OctagonDetector::default()
            .detect(&img.view())
            .expect("octagon detected");
        assert!((detection.candidate.centroid.x - 340.0).abs() < 1.0);
        assert!((detection.candidate.centroid.y - 120.0).abs() < 1.0);
    }

    #[test]
    fn blank_image_reports_no_candidates() {
        let img = octagon_image(64, 64, &[]);
        let err = OctagonDetector::default().detect(&img.view()).unwrap_err();
        assert_eq!(err, DetectError::NoCandidates);
    }

    struct RecordingSink {
        stages: Rc<RefCell<Vec<String>>>,
    }

    impl DiagnosticSink for RecordingSink {
        fn gray(&self, stage: &str, image: &GrayImageView<'_>) {
            assert!(image.width > 0 && image.height > 0);
            self.stages.borrow_mut().push(stage.to_string());
        }
    }

    #[test]
    fn sink_receives_every_stage() {
        let stages = Rc::new(RefCell::new(Vec::new()));
        let detector = OctagonDetector::default().with_sink(Box::new(RecordingSink {
            stages: Rc::clone(&stages),
        }));

        let img = octagon_image(320, 240, &[(160.0, 120.0, 60.0)]);
        detector.detect(&img.view()).expect("octagon detected");

        let got = stages.borrow();
        let want = [
            "mask",
            "edges",
            "swath-top",
            "swath-bottom",
            "swath-left",
            "swath-right",
            "swath-top-left",
            "swath-top-right",
            "swath-bot-left",
            "swath-bot-right",
        ];
        assert_eq!(got.as_slice(), want);
    }
}
