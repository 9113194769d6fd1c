//! Separable Gaussian smoothing.

use gauge_targets_core::{GrayImage, GrayImageView};

/// Normalized taps of the binomial kernel `[1, 4, 6, 4, 1] / 16`.
const TAPS: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// 5x5 Gaussian blur as two 1D passes; border samples clamp to the image
/// extents so flat regions stay flat.
pub fn blur(src: &GrayImageView<'_>) -> GrayImage {
    let w = src.width;
    let h = src.height;
    if w == 0 || h == 0 {
        return GrayImage::new(w, h);
    }

    // horizontal pass
    let mut tmp = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        let dst = &mut tmp[y * w..(y + 1) * w];
        for (x, out) in dst.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, tap) in TAPS.iter().enumerate() {
                let sx = (x as i32 + k as i32 - 2).clamp(0, w as i32 - 1) as usize;
                acc += tap * row[sx] as f32;
            }
            *out = acc;
        }
    }

    // vertical pass with rounding back to u8
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, tap) in TAPS.iter().enumerate() {
                let sy = (y as i32 + k as i32 - 2).clamp(0, h as i32 - 1) as usize;
                acc += tap * tmp[sy * w + x];
            }
            out.data[y * w + x] = (acc + 0.5) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_stays_flat() {
        let img = GrayImage::from_raw(7, 5, vec![113; 35]).unwrap();
        let blurred = blur(&img.view());
        assert_eq!(blurred.data, vec![113; 35]);
    }

    #[test]
    fn impulse_spreads_symmetrically() {
        let mut img = GrayImage::new(5, 5);
        img.data[2 * 5 + 2] = 255;
        let b = blur(&img.view());

        // center keeps 255 * (6/16)^2, rounded
        assert_eq!(b.data[2 * 5 + 2], 36);
        assert_eq!(b.data[2 * 5 + 1], b.data[2 * 5 + 3]);
        assert_eq!(b.data[1 * 5 + 2], b.data[3 * 5 + 2]);
        assert_eq!(b.data[1 * 5 + 1], b.data[3 * 5 + 3]);
        assert!(b.data[0] < b.data[2 * 5 + 2]);
    }

    #[test]
    fn empty_image_is_passed_through() {
        let img = GrayImage::new(0, 3);
        let b = blur(&img.view());
        assert_eq!((b.width, b.height), (0, 3));
        assert!(b.data.is_empty());
    }
}
