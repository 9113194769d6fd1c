//! Red symbol segmentation.
//!
//! Stages:
//! 1. per-pixel HSV thresholding into a binary mask; red wraps around the
//!    hue origin, so two bands are combined,
//! 2. 8-connected component labeling (stack flood fill),
//! 3. outer boundary tracing (Moore neighborhood),
//! 4. moment-based shape filtering: area, boundary length, elongation.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use gauge_targets_core::{DiagnosticSink, GrayImage, RectI, RgbImageView};

use crate::error::DetectError;
use crate::params::SymbolParams;

/// Connected red region that passed all shape filters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymbolCandidate {
    /// Component size in pixels.
    pub area: usize,
    /// Pixel-mass centroid.
    pub centroid: Point2<f64>,
    /// Tight bounding box.
    pub bbox: RectI,
    /// Outer boundary pixels in tracing order.
    pub boundary: Vec<Point2<f64>>,
    /// Balance of the second moments; 1.0 is perfectly round.
    pub elongation: f64,
}

/// Segment red regions and keep the ones shaped like the symbol.
///
/// Survivors come back sorted by area, largest first. An empty result is a
/// hard failure; the caller reports a calibration failure rather than
/// retrying with other thresholds.
pub fn find_symbol_candidates(
    img: &RgbImageView<'_>,
    params: &SymbolParams,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<SymbolCandidate>, DetectError> {
    if img.width == 0 || img.height == 0 {
        return Err(DetectError::EmptyImage {
            width: img.width,
            height: img.height,
        });
    }
    if !img.is_consistent() {
        return Err(DetectError::InvalidRgbBuffer {
            expected: img.width * img.height * 3,
            got: img.data.len(),
        });
    }

    let mask = red_mask(img, params);
    sink.gray("mask", &mask.view());

    let components = collect_components(&mask);
    let total = components.len();

    let mut out = Vec::new();
    let mut small = 0usize;
    let mut short_boundary = 0usize;
    let mut stretched = 0usize;
    for (start, pixels) in components {
        if pixels.len() < params.min_area {
            small += 1;
            continue;
        }

        let boundary = trace_boundary(&mask, start, 4 * pixels.len() + 8);
        if boundary.len() < params.min_boundary_len {
            short_boundary += 1;
            continue;
        }

        let stats = shape_stats(&pixels);
        let elongation = elongation(stats.mu20, stats.mu02, stats.mu11, params.elongation_eps);
        if elongation > params.max_elongation {
            stretched += 1;
            continue;
        }

        out.push(SymbolCandidate {
            area: pixels.len(),
            centroid: stats.centroid,
            bbox: stats.bbox,
            boundary: boundary
                .into_iter()
                .map(|(x, y)| Point2::new(x as f64, y as f64))
                .collect(),
            elongation,
        });
    }

    if out.is_empty() {
        log::debug!(
            "segmentation kept 0 of {total} components (area {small}, boundary {short_boundary}, elongation {stretched})"
        );
        return Err(DetectError::NoCandidates);
    }

    out.sort_by(|a, b| b.area.cmp(&a.area));
    Ok(out)
}

/// Hue in degrees [0, 360), saturation and value in [0, 1].
#[inline]
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    let h = if delta <= f64::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (h, s, v)
}

/// Binary mask of sufficiently saturated, bright red pixels.
pub(crate) fn red_mask(img: &RgbImageView<'_>, params: &SymbolParams) -> GrayImage {
    let mut mask = GrayImage::new(img.width, img.height);
    for y in 0..img.height {
        for x in 0..img.width {
            let [r, g, b] = img.pixel(x, y);
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let red_hue = h <= params.hue_low_max || h >= params.hue_high_min;
            if red_hue && s >= params.sat_min && v >= params.val_min {
                mask.data[y * img.width + x] = 255;
            }
        }
    }
    mask
}

// 8-neighborhood, clockwise in image coordinates starting east
const DIR_X: [i32; 8] = [1, 1, 0, -1, -1, -1, 0, 1];
const DIR_Y: [i32; 8] = [0, 1, 1, 1, 0, -1, -1, -1];

#[inline]
fn mask_at(mask: &GrayImage, x: i32, y: i32) -> bool {
    x >= 0
        && y >= 0
        && (x as usize) < mask.width
        && (y as usize) < mask.height
        && mask.data[y as usize * mask.width + x as usize] != 0
}

/// 8-connected components of the mask as `(start, pixels)` where `start`
/// is the topmost-leftmost pixel (the row-major scan guarantees it).
fn collect_components(mask: &GrayImage) -> Vec<((i32, i32), Vec<(i32, i32)>)> {
    let mut visited = vec![false; mask.data.len()];
    let mut components = Vec::new();
    let mut stack: Vec<(i32, i32)> = Vec::new();

    for idx in 0..mask.data.len() {
        if mask.data[idx] == 0 || visited[idx] {
            continue;
        }
        let start = ((idx % mask.width) as i32, (idx / mask.width) as i32);
        visited[idx] = true;
        stack.push(start);

        let mut pixels = Vec::new();
        while let Some((x, y)) = stack.pop() {
            pixels.push((x, y));
            for k in 0..8 {
                let nx = x + DIR_X[k];
                let ny = y + DIR_Y[k];
                if !mask_at(mask, nx, ny) {
                    continue;
                }
                let nidx = ny as usize * mask.width + nx as usize;
                if !visited[nidx] {
                    visited[nidx] = true;
                    stack.push((nx, ny));
                }
            }
        }
        components.push((start, pixels));
    }

    components
}

/// Moore-neighbor boundary trace from the topmost-leftmost pixel.
///
/// Stops when the walk re-enters the start pixel with the same first move
/// (Jacob's criterion) or hits the safety cap. A component that is a
/// single isolated pixel yields a one-entry chain.
fn trace_boundary(mask: &GrayImage, start: (i32, i32), cap: usize) -> Vec<(i32, i32)> {
    let mut boundary = vec![start];
    let mut cur = start;
    // entering the start as if arriving from the west; its west neighbor is
    // background because the scan found `start` first in its row
    let mut search_from = 5usize;
    let mut first_move: Option<usize> = None;

    loop {
        let mut advance = None;
        for step in 0..8 {
            let k = (search_from + step) % 8;
            let nx = cur.0 + DIR_X[k];
            let ny = cur.1 + DIR_Y[k];
            if mask_at(mask, nx, ny) {
                advance = Some((k, (nx, ny)));
                break;
            }
        }
        let Some((k, next)) = advance else {
            break; // isolated pixel
        };
        if cur == start && first_move == Some(k) {
            boundary.pop(); // drop the re-entered start
            break;
        }
        if first_move.is_none() {
            first_move = Some(k);
        }

        cur = next;
        boundary.push(cur);
        if boundary.len() > cap {
            break;
        }
        search_from = (k + 6) % 8;
    }

    boundary
}

struct ShapeStats {
    centroid: Point2<f64>,
    bbox: RectI,
    mu20: f64,
    mu02: f64,
    mu11: f64,
}

fn shape_stats(pixels: &[(i32, i32)]) -> ShapeStats {
    let n = pixels.len() as f64;

    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut min_x = i32::MAX;
    let mut min_y = i32::MAX;
    let mut max_x = i32::MIN;
    let mut max_y = i32::MIN;
    for &(x, y) in pixels {
        sx += x as f64;
        sy += y as f64;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let cx = sx / n;
    let cy = sy / n;

    let mut mu20 = 0.0;
    let mut mu02 = 0.0;
    let mut mu11 = 0.0;
    for &(x, y) in pixels {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        mu20 += dx * dx;
        mu02 += dy * dy;
        mu11 += dx * dy;
    }

    ShapeStats {
        centroid: Point2::new(cx, cy),
        bbox: RectI::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1),
        mu20,
        mu02,
        mu11,
    }
}

/// Elongation from central second moments.
///
/// `(mu20 + mu02 + r) / (mu20 + mu02 - r)` with
/// `r = sqrt(4*mu11^2 + (mu20 - mu02)^2)`; when the denominator magnitude
/// falls below `eps` the shape carries no anisotropy signal and the
/// elongation is defined as exactly 1.0.
pub fn elongation(mu20: f64, mu02: f64, mu11: f64, eps: f64) -> f64 {
    let r = (4.0 * mu11 * mu11 + (mu20 - mu02) * (mu20 - mu02)).sqrt();
    let denom = mu20 + mu02 - r;
    if denom.abs() < eps {
        return 1.0;
    }
    (mu20 + mu02 + r) / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauge_targets_core::{NullSink, RgbImage};

    const RED: [u8; 3] = [200, 30, 40];
    const WHITE: [u8; 3] = [255, 255, 255];

    fn image_of(width: usize, height: usize, f: impl Fn(usize, usize) -> [u8; 3]) -> RgbImage {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        RgbImage::from_raw(width, height, data).expect("consistent buffer")
    }

    fn disc_image(width: usize, height: usize, discs: &[(f64, f64, f64)]) -> RgbImage {
        image_of(width, height, |x, y| {
            let inside = discs.iter().any(|&(cx, cy, r)| {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                dx * dx + dy * dy <= r * r
            });
            if inside {
                RED
            } else {
                WHITE
            }
        })
    }

    #[test]
    fn hue_bands_wrap_around_zero() {
        // crimson (h ~ 356), orange-red (h ~ 13), green, washed-out pink
        let img = image_of(4, 1, |x, _| match x {
            0 => [200, 30, 40],
            1 => [220, 80, 40],
            2 => [30, 200, 40],
            _ => [200, 150, 150],
        });
        let mask = red_mask(&img.view(), &SymbolParams::default());
        assert_eq!(mask.data, vec![255, 255, 0, 0]);
    }

    #[test]
    fn dark_and_unsaturated_pixels_are_rejected() {
        let img = image_of(3, 1, |x, _| match x {
            0 => [40, 5, 8],       // red hue but too dark
            1 => [255, 255, 255],  // zero saturation
            _ => [200, 30, 40],
        });
        let mask = red_mask(&img.view(), &SymbolParams::default());
        assert_eq!(mask.data, vec![0, 0, 255]);
    }

    #[test]
    fn elongation_epsilon_branch_is_exact() {
        assert_eq!(elongation(0.0, 0.0, 0.0, 1e-9), 1.0);
    }

    #[test]
    fn elongation_increases_under_stretch() {
        // rectangles of roughly constant area, increasingly stretched
        let sizes = [(40i32, 40i32), (48, 33), (57, 28), (80, 20)];
        let mut last = 0.0;
        for (w, h) in sizes {
            let pixels: Vec<(i32, i32)> = (0..h)
                .flat_map(|y| (0..w).map(move |x| (x, y)))
                .collect();
            let stats = shape_stats(&pixels);
            let e = elongation(stats.mu20, stats.mu02, stats.mu11, 1e-9);
            assert!(e > last, "elongation {e} did not grow past {last}");
            last = e;
        }
        // the square itself is balanced
        let square: Vec<(i32, i32)> = (0..40)
            .flat_map(|y| (0..40).map(move |x| (x, y)))
            .collect();
        let stats = shape_stats(&square);
        let e = elongation(stats.mu20, stats.mu02, stats.mu11, 1e-9);
        assert!((e - 1.0).abs() < 1e-9);
    }

    #[test]
    fn detects_round_red_region() {
        let img = disc_image(100, 80, &[(50.0, 40.0, 25.0)]);
        let candidates =
            find_symbol_candidates(&img.view(), &SymbolParams::default(), &NullSink)
                .expect("one candidate");
        assert_eq!(candidates.len(), 1);

        let c = &candidates[0];
        assert!((c.centroid.x - 50.0).abs() < 0.5);
        assert!((c.centroid.y - 40.0).abs() < 0.5);
        assert!(c.elongation < 1.05);
        assert!(c.area > 1800 && c.area < 2100);
        assert!(c.bbox.x <= 26 && c.bbox.right() >= 75);
        assert!(c.boundary.len() > 100);
    }

    #[test]
    fn small_regions_are_filtered() {
        let img = disc_image(100, 80, &[(50.0, 40.0, 15.0)]); // ~700 px
        let err = find_symbol_candidates(&img.view(), &SymbolParams::default(), &NullSink)
            .unwrap_err();
        assert_eq!(err, DetectError::NoCandidates);
    }

    #[test]
    fn stretched_regions_are_filtered() {
        let img = image_of(200, 80, |x, y| {
            if (40..160).contains(&x) && (30..50).contains(&y) {
                RED
            } else {
                WHITE
            }
        });
        let err = find_symbol_candidates(&img.view(), &SymbolParams::default(), &NullSink)
            .unwrap_err();
        assert_eq!(err, DetectError::NoCandidates);
    }

    #[test]
    fn candidates_sorted_by_area_descending() {
        let img = disc_image(240, 100, &[(60.0, 50.0, 25.0), (170.0, 50.0, 32.0)]);
        let candidates =
            find_symbol_candidates(&img.view(), &SymbolParams::default(), &NullSink)
                .expect("two candidates");
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].area > candidates[1].area);
        assert!((candidates[0].centroid.x - 170.0).abs() < 0.5);
    }

    #[test]
    fn invalid_buffer_is_rejected() {
        let view = gauge_targets_core::RgbImageView {
            width: 10,
            height: 10,
            data: &[0; 50],
        };
        let err =
            find_symbol_candidates(&view, &SymbolParams::default(), &NullSink).unwrap_err();
        assert_eq!(
            err,
            DetectError::InvalidRgbBuffer {
                expected: 300,
                got: 50
            }
        );

        let empty = gauge_targets_core::RgbImageView {
            width: 0,
            height: 5,
            data: &[],
        };
        let err = find_symbol_candidates(&empty, &SymbolParams::default(), &NullSink).unwrap_err();
        assert!(matches!(err, DetectError::EmptyImage { .. }));
    }

    #[test]
    fn boundary_trace_walks_the_rim() {
        let img = disc_image(60, 60, &[(30.0, 30.0, 12.0)]);
        let mask = red_mask(&img.view(), &SymbolParams::default());
        let components = collect_components(&mask);
        assert_eq!(components.len(), 1);

        let (start, pixels) = &components[0];
        let boundary = trace_boundary(&mask, *start, 4 * pixels.len() + 8);
        // rim length is near the circumference, well below the area
        assert!(boundary.len() > 60 && boundary.len() < 120);
        // every boundary pixel is on the mask and has a background neighbor
        for &(x, y) in &boundary {
            assert!(mask_at(&mask, x, y));
            let open = (0..8).any(|k| !mask_at(&mask, x + DIR_X[k], y + DIR_Y[k]));
            assert!(open, "({x},{y}) is interior");
        }
    }
}
