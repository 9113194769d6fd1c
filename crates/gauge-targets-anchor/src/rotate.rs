//! Image rotation by inverse-mapped resampling.

use gauge_targets_core::{sample_bilinear_u8, GrayImage, GrayImageView};

/// Rotate `src` about its center into an equally sized image.
///
/// Positive angles turn the content clockwise on screen (y grows downward).
/// Output pixels whose source falls outside the image read 0, matching the
/// out-of-bounds convention of the sampler.
pub fn rotate_about_center(src: &GrayImageView<'_>, angle_deg: f64) -> GrayImage {
    let w = src.width;
    let h = src.height;
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }

    let cx = (w as f64 - 1.0) * 0.5;
    let cy = (h as f64 - 1.0) * 0.5;
    let (sin, cos) = angle_deg.to_radians().sin_cos();

    for y in 0..h {
        for x in 0..w {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            // inverse map: where this output pixel came from
            let sx = cx + cos * dx + sin * dy;
            let sy = cy - sin * dx + cos * dy;
            out.data[y * w + x] = sample_bilinear_u8(src, sx as f32, sy as f32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_angle_is_identity() {
        let data: Vec<u8> = (0..30).map(|i| (i * 8) as u8).collect();
        let img = GrayImage::from_raw(6, 5, data).unwrap();
        let r = rotate_about_center(&img.view(), 0.0);
        assert_eq!(r.data, img.data);
    }

    #[test]
    fn quarter_turn_moves_top_to_right() {
        let mut img = GrayImage::new(3, 3);
        img.data[1] = 255; // (1, 0), above the center
        let r = rotate_about_center(&img.view(), 90.0);
        assert_eq!(r.data[1 * 3 + 2], 255); // now at (2, 1)
        assert_eq!(r.data[1], 0);
    }

    #[test]
    fn uncovered_corners_read_zero() {
        let img = GrayImage::from_raw(10, 10, vec![255; 100]).unwrap();
        let r = rotate_about_center(&img.view(), 45.0);
        assert_eq!(r.data[0], 0);
        assert_eq!(r.data[9], 0);
        assert_eq!(r.data[4 * 10 + 4], 255);
    }
}
