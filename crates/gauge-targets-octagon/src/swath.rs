//! Edge line fitting in directional swaths.
//!
//! The candidate's boundary chain is split into eight overlap-free pixel
//! sets, one per octagon edge, by casting rectangular swaths out of the
//! centroid:
//!
//! 1. cardinal pass: four swaths toward the image top, bottom, left and
//!    right borders, each catching one cardinal edge,
//! 2. diagonal pass: four swaths toward the intersections of adjacent
//!    cardinal lines, each catching one bevel edge.
//!
//! Swath width follows the candidate size (`bounding height / divisor`),
//! which keeps a single edge inside each swath over the symbol scales the
//! gauge cameras produce. Each pixel set gets a principal-axis line fit
//! with a few rounds of Tukey reweighting, and the fitted line is clipped
//! against the image along its less-steep axis.

use nalgebra::{Point2, Vector2};

use gauge_targets_core::{line_intersection, DiagnosticSink, GrayImage, Line, RectI};

use crate::corners::EdgeTag;
use crate::error::DetectError;
use crate::params::SwathParams;
use crate::segment::SymbolCandidate;

/// One fitted octagon edge: the infinite carrier line plus its
/// image-clipped span.
#[derive(Clone, Copy, Debug)]
pub struct FittedEdge {
    pub tag: EdgeTag,
    pub line: Line,
    /// Clipped span endpoints on the image border.
    pub p0: Point2<f64>,
    pub p1: Point2<f64>,
    /// Boundary pixels that supported the fit.
    pub support: usize,
}

/// All eight fitted edges, indexable by [`EdgeTag`].
#[derive(Clone, Debug)]
pub struct OctagonLines {
    edges: [FittedEdge; 8],
}

impl OctagonLines {
    /// Edges must arrive in `EdgeTag::ALL` order.
    pub fn new(edges: [FittedEdge; 8]) -> Self {
        debug_assert!(edges
            .iter()
            .zip(EdgeTag::ALL)
            .all(|(e, tag)| e.tag == tag));
        Self { edges }
    }

    #[inline]
    pub fn get(&self, tag: EdgeTag) -> &FittedEdge {
        &self.edges[tag as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FittedEdge> {
        self.edges.iter()
    }

    #[cfg(test)]
    pub(crate) fn set_for_test(&mut self, tag: EdgeTag, line: Line) {
        self.edges[tag as usize].line = line;
    }
}

struct SwathContext<'a> {
    boundary: &'a [Point2<f64>],
    center: Point2<f64>,
    bbox: RectI,
    image_width: usize,
    image_height: usize,
    swath_width: f64,
    params: &'a SwathParams,
    sink: &'a dyn DiagnosticSink,
}

/// Fit all eight octagon edges for one candidate.
///
/// An empty swath or a spread-free pixel set is a hard failure for this
/// candidate; the caller decides whether another candidate gets a turn.
pub fn fit_octagon_lines(
    candidate: &SymbolCandidate,
    image_width: usize,
    image_height: usize,
    params: &SwathParams,
    sink: &dyn DiagnosticSink,
) -> Result<OctagonLines, DetectError> {
    let c = candidate.centroid;
    let ctx = SwathContext {
        boundary: &candidate.boundary,
        center: c,
        bbox: candidate.bbox,
        image_width,
        image_height,
        swath_width: candidate.bbox.height as f64 / params.width_divisor,
        params,
        sink,
    };

    ctx.emit_points("edges", ctx.boundary);

    // cardinal pass: swaths run from the centroid to the image border
    let top = ctx.fit_edge(EdgeTag::Top, Vector2::new(0.0, -1.0), c.y)?;
    let bottom = ctx.fit_edge(EdgeTag::Bottom, Vector2::new(0.0, 1.0), image_height as f64 - c.y)?;
    let left = ctx.fit_edge(EdgeTag::Left, Vector2::new(-1.0, 0.0), c.x)?;
    let right = ctx.fit_edge(EdgeTag::Right, Vector2::new(1.0, 0.0), image_width as f64 - c.x)?;

    // diagonal pass: swaths aim at the adjacent cardinal intersections
    let diagonal = |tag: EdgeTag, a: &FittedEdge, b: &FittedEdge| {
        let target = line_intersection(&a.line, &b.line)
            .ok_or(DetectError::ParallelEdges(a.tag, b.tag))?;
        let v = target - c;
        let len = v.norm();
        if len < 1e-9 {
            return Err(DetectError::DegenerateFit(tag));
        }
        ctx.fit_edge(tag, v / len, len)
    };
    let top_left = diagonal(EdgeTag::TopLeft, &top, &left)?;
    let top_right = diagonal(EdgeTag::TopRight, &top, &right)?;
    let bot_left = diagonal(EdgeTag::BotLeft, &bottom, &left)?;
    let bot_right = diagonal(EdgeTag::BotRight, &bottom, &right)?;

    Ok(OctagonLines::new([
        top, bottom, left, right, top_left, top_right, bot_left, bot_right,
    ]))
}

impl SwathContext<'_> {
    fn fit_edge(
        &self,
        tag: EdgeTag,
        dir: Vector2<f64>,
        length: f64,
    ) -> Result<FittedEdge, DetectError> {
        let pts = collect_swath(self.boundary, self.center, dir, length, self.swath_width);
        self.emit_points(&format!("swath-{tag}"), &pts);

        if pts.is_empty() {
            return Err(DetectError::EmptySwath(tag));
        }
        let line = fit_line_robust(&pts, self.params).ok_or(DetectError::DegenerateFit(tag))?;
        let (p0, p1) = clipped_span(&line, self.image_width, self.image_height);

        Ok(FittedEdge {
            tag,
            line,
            p0,
            p1,
            support: pts.len(),
        })
    }

    /// Render a pixel set into a bbox-local raster for the sink.
    fn emit_points(&self, stage: &str, pts: &[Point2<f64>]) {
        let w = self.bbox.width.max(1) as usize;
        let h = self.bbox.height.max(1) as usize;
        let mut img = GrayImage::new(w, h);
        for p in pts {
            let x = p.x as i32 - self.bbox.x;
            let y = p.y as i32 - self.bbox.y;
            if x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h {
                img.data[y as usize * w + x as usize] = 255;
            }
        }
        self.sink.gray(stage, &img.view());
    }
}

/// Boundary pixels inside the rectangular swath: within `length` of
/// `center` along `dir` (unit) and within half the swath width of its axis.
fn collect_swath(
    boundary: &[Point2<f64>],
    center: Point2<f64>,
    dir: Vector2<f64>,
    length: f64,
    width: f64,
) -> Vec<Point2<f64>> {
    let normal = Vector2::new(-dir.y, dir.x);
    let half = 0.5 * width;
    boundary
        .iter()
        .copied()
        .filter(|p| {
            let d = *p - center;
            let along = d.dot(&dir);
            along >= 0.0 && along <= length && d.dot(&normal).abs() <= half
        })
        .collect()
}

/// Principal-axis fit through a weighted point set.
///
/// Direction is the dominant eigenvector of the position covariance; the
/// `(cxy, lambda - cxx)` form degenerates to zero for x-aligned spreads,
/// where the x axis itself is the answer. `None` when the points carry no
/// spread at all.
fn fit_line_weighted(pts: &[Point2<f64>], weights: &[f64]) -> Option<Line> {
    let mut sum_w = 0.0;
    let mut mx = 0.0;
    let mut my = 0.0;
    for (p, w) in pts.iter().zip(weights) {
        sum_w += w;
        mx += w * p.x;
        my += w * p.y;
    }
    if sum_w < 1e-12 {
        return None;
    }
    mx /= sum_w;
    my /= sum_w;

    let mut cxx = 0.0;
    let mut cxy = 0.0;
    let mut cyy = 0.0;
    for (p, w) in pts.iter().zip(weights) {
        let dx = p.x - mx;
        let dy = p.y - my;
        cxx += w * dx * dx;
        cxy += w * dx * dy;
        cyy += w * dy * dy;
    }
    cxx /= sum_w;
    cxy /= sum_w;
    cyy /= sum_w;

    let trace = cxx + cyy;
    if trace < 1e-9 {
        return None; // coincident points
    }

    let det_part = (cxx - cyy) * (cxx - cyy) + 4.0 * cxy * cxy;
    let lambda = 0.5 * (trace + det_part.max(0.0).sqrt());
    let mut dir = Vector2::new(cxy, lambda - cxx);
    let norm = dir.norm();
    if norm < 1e-12 {
        dir = Vector2::new(1.0, 0.0);
    } else {
        dir /= norm;
    }

    Some(Line::new(Point2::new(mx, my), dir))
}

/// Initial principal-axis fit plus Tukey-reweighted refits.
///
/// The residual scale comes from the median absolute residual; once it
/// collapses the fit is already exact and iteration stops.
fn fit_line_robust(pts: &[Point2<f64>], params: &SwathParams) -> Option<Line> {
    let mut weights = vec![1.0; pts.len()];
    let mut line = fit_line_weighted(pts, &weights)?;

    for _ in 0..params.refit_iterations {
        let residuals: Vec<f64> = pts.iter().map(|p| line.distance_to(p)).collect();
        let mut sorted = residuals.clone();
        sorted.sort_by(f64::total_cmp);
        let mad = sorted[sorted.len() / 2];
        if mad < 1e-9 {
            break;
        }

        let cutoff = params.tukey_c * 1.4826 * mad;
        for (w, r) in weights.iter_mut().zip(&residuals) {
            let t = r / cutoff;
            *w = if t < 1.0 {
                let u = 1.0 - t * t;
                u * u
            } else {
                0.0
            };
        }
        line = fit_line_weighted(pts, &weights)?;
    }

    Some(line)
}

/// Clip the line against the image span along its less-steep axis.
///
/// The fit direction is unit length, so the chosen component is at least
/// `1/sqrt(2)` and the division is safe.
fn clipped_span(
    line: &Line,
    image_width: usize,
    image_height: usize,
) -> (Point2<f64>, Point2<f64>) {
    let d = line.dir;
    if d.x.abs() >= d.y.abs() {
        let t0 = (0.0 - line.point.x) / d.x;
        let t1 = (image_width as f64 - line.point.x) / d.x;
        (line.point + d * t0, line.point + d * t1)
    } else {
        let t0 = (0.0 - line.point.y) / d.y;
        let t1 = (image_height as f64 - line.point.y) / d.y;
        (line.point + d * t0, line.point + d * t1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_targets_core::NullSink;

    fn default_params() -> SwathParams {
        SwathParams::default()
    }

    fn candidate_with_boundary(
        boundary: Vec<Point2<f64>>,
        centroid: Point2<f64>,
        bbox: RectI,
    ) -> SymbolCandidate {
        SymbolCandidate {
            area: boundary.len().max(1),
            centroid,
            bbox,
            boundary,
            elongation: 1.0,
        }
    }

    #[test]
    fn swath_keeps_points_in_band() {
        let boundary: Vec<Point2<f64>> = (0..30)
            .map(|i| Point2::new(i as f64, (i % 7) as f64 - 3.0))
            .collect();
        let kept = collect_swath(
            &boundary,
            Point2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            10.0,
            4.0,
        );
        assert!(!kept.is_empty());
        for p in &kept {
            assert!(p.x >= 0.0 && p.x <= 10.0);
            assert!(p.y.abs() <= 2.0);
        }
    }

    #[test]
    fn swath_width_follows_bounding_height() {
        // horizontal boundary line above the centroid; an upward swath
        // catches the stretch within half the width of its axis
        let boundary: Vec<Point2<f64>> =
            (0..40).map(|i| Point2::new(i as f64, 30.0)).collect();
        let up = Vector2::new(0.0, -1.0);
        let center = Point2::new(20.0, 50.0);

        let narrow = collect_swath(&boundary, center, up, 50.0, 100.0 / 5.0);
        assert_eq!(narrow.len(), 21); // |x - 20| <= 10

        let wide = collect_swath(&boundary, center, up, 50.0, 250.0 / 5.0);
        assert_eq!(wide.len(), 40); // the whole stretch fits
        assert!(narrow.len() < wide.len());
    }

    #[test]
    fn exact_horizontal_edge_is_recovered() {
        let boundary: Vec<Point2<f64>> =
            (10..50).map(|i| Point2::new(i as f64, 20.0)).collect();
        let bbox = RectI::new(10, 20, 40, 1);
        let cand = candidate_with_boundary(boundary, Point2::new(30.0, 60.0), bbox);

        // fit just the top edge through the swath machinery
        let pts = collect_swath(
            &cand.boundary,
            cand.centroid,
            Vector2::new(0.0, -1.0),
            60.0,
            80.0,
        );
        assert_eq!(pts.len(), 40);
        let line = fit_line_robust(&pts, &default_params()).expect("fits");
        for p in &pts {
            assert!(line.distance_to(p) < 1e-9);
        }
        let (p0, p1) = clipped_span(&line, 100, 100);
        assert!((p0.y - 20.0).abs() < 1e-9 && (p1.y - 20.0).abs() < 1e-9);
        assert!((p0.x - 0.0).abs() < 1e-9 || (p0.x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn robust_fit_suppresses_outlier() {
        let mut pts: Vec<Point2<f64>> =
            (0..=40).map(|i| Point2::new(i as f64, 5.0)).collect();
        pts.push(Point2::new(20.0, 15.0));

        let line = fit_line_robust(&pts, &default_params()).expect("fits");
        assert!(line.distance_to(&Point2::new(0.0, 5.0)) < 0.05);
        assert!(line.distance_to(&Point2::new(40.0, 5.0)) < 0.05);
    }

    #[test]
    fn vertical_spread_is_fit_along_y() {
        let pts: Vec<Point2<f64>> = (0..20).map(|i| Point2::new(7.0, i as f64)).collect();
        let line = fit_line_robust(&pts, &default_params()).expect("fits");
        assert!(line.dir.y.abs() > 0.99);
        let (p0, p1) = clipped_span(&line, 50, 80);
        assert!((p0.x - 7.0).abs() < 1e-9 && (p1.x - 7.0).abs() < 1e-9);
        assert!((p0.y.min(p1.y) - 0.0).abs() < 1e-9);
        assert!((p0.y.max(p1.y) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn empty_swath_is_hard_failure() {
        // all boundary pixels sit below the centroid: the top swath is empty
        let boundary: Vec<Point2<f64>> =
            (0..40).map(|i| Point2::new(i as f64, 90.0)).collect();
        let bbox = RectI::new(0, 90, 40, 1);
        let cand = candidate_with_boundary(boundary, Point2::new(20.0, 50.0), bbox);

        let err = fit_octagon_lines(&cand, 100, 100, &default_params(), &NullSink).unwrap_err();
        assert_eq!(err, DetectError::EmptySwath(EdgeTag::Top));
    }

    #[test]
    fn coincident_swath_pixels_are_degenerate() {
        // three identical pixels above the centroid, plenty elsewhere
        let mut boundary: Vec<Point2<f64>> = vec![Point2::new(20.0, 10.0); 3];
        boundary.extend((0..40).map(|i| Point2::new(i as f64, 90.0)));
        let bbox = RectI::new(0, 10, 40, 81);
        let cand = candidate_with_boundary(boundary, Point2::new(20.0, 50.0), bbox);

        let err = fit_octagon_lines(&cand, 100, 100, &default_params(), &NullSink).unwrap_err();
        assert_eq!(err, DetectError::DegenerateFit(EdgeTag::Top));
    }
}
