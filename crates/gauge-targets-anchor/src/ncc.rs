//! Zero-mean normalized cross-correlation over a sliding window.

use gauge_targets_core::GrayImageView;

/// Best placement of one template in one frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MatchLocation {
    pub x: usize,
    pub y: usize,
    /// ZNCC score in [-1, 1]; 0 for windows or templates without contrast.
    pub score: f64,
}

/// Summed-area tables of pixel values and squared values, with a zero
/// top/left border row so window sums need no branching.
struct IntegralImage {
    width: usize,
    sum: Vec<f64>,
    sq: Vec<f64>,
}

impl IntegralImage {
    fn build(img: &GrayImageView<'_>) -> Self {
        let w = img.width + 1;
        let h = img.height + 1;
        let mut sum = vec![0.0; w * h];
        let mut sq = vec![0.0; w * h];
        for y in 0..img.height {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..img.width {
                let v = img.data[y * img.width + x] as f64;
                row_sum += v;
                row_sq += v * v;
                sum[(y + 1) * w + x + 1] = sum[y * w + x + 1] + row_sum;
                sq[(y + 1) * w + x + 1] = sq[y * w + x + 1] + row_sq;
            }
        }
        Self { width: w, sum, sq }
    }

    /// Sum and squared sum over the `tw x th` window at `(x, y)`.
    #[inline]
    fn window(&self, x: usize, y: usize, tw: usize, th: usize) -> (f64, f64) {
        let w = self.width;
        let (x1, y1) = (x + tw, y + th);
        let s = self.sum[y1 * w + x1] - self.sum[y * w + x1] - self.sum[y1 * w + x]
            + self.sum[y * w + x];
        let q =
            self.sq[y1 * w + x1] - self.sq[y * w + x1] - self.sq[y1 * w + x] + self.sq[y * w + x];
        (s, q)
    }
}

/// Slide `template` over the window origins `x0..=x1`, `y0..=y1` of `frame`
/// and return the highest-scoring placement.
///
/// Scores are ZNCC: invariant to affine brightness changes of the window.
/// Ties keep the first placement in row-major scan order. The caller
/// guarantees the origin range is non-empty and every window lies fully
/// inside the frame.
pub(crate) fn best_match(
    frame: &GrayImageView<'_>,
    template: &GrayImageView<'_>,
    (x0, x1): (usize, usize),
    (y0, y1): (usize, usize),
) -> MatchLocation {
    let (tw, th) = (template.width, template.height);
    let n = (tw * th) as f64;

    let t_sum: f64 = template.data.iter().map(|&v| v as f64).sum();
    let t_mean = t_sum / n;
    let centered: Vec<f64> = template.data.iter().map(|&v| v as f64 - t_mean).collect();
    let t_norm = centered.iter().map(|c| c * c).sum::<f64>().sqrt();
    if t_norm < 1e-9 {
        // a flat template correlates with nothing
        return MatchLocation {
            x: x0,
            y: y0,
            score: 0.0,
        };
    }

    let integral = IntegralImage::build(frame);

    let mut best = MatchLocation {
        x: x0,
        y: y0,
        score: f64::NEG_INFINITY,
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (w_sum, w_sq) = integral.window(x, y, tw, th);
            let w_var = w_sq - w_sum * w_sum / n;
            if w_var < 1e-9 {
                continue; // flat window, no signal
            }

            let mut dot = 0.0;
            for j in 0..th {
                let frame_row = &frame.data[(y + j) * frame.width + x..][..tw];
                let c_row = &centered[j * tw..][..tw];
                for (f, c) in frame_row.iter().zip(c_row) {
                    dot += *f as f64 * c;
                }
            }

            let score = dot / (w_var.sqrt() * t_norm);
            if score > best.score {
                best = MatchLocation { x, y, score };
            }
        }
    }

    if best.score.is_finite() {
        best
    } else {
        // every window was flat
        MatchLocation {
            x: x0,
            y: y0,
            score: 0.0,
        }
    }
}
