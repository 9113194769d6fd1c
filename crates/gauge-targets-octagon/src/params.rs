use serde::{Deserialize, Serialize};

/// Segmentation and candidate filtering parameters.
///
/// The target paint is red, so the accepted hue range wraps around 0: a
/// pixel passes when its hue falls in either band.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SymbolParams {
    /// Upper edge of the low red hue band, degrees (accepts h <= this).
    pub hue_low_max: f64,
    /// Lower edge of the high red hue band, degrees (accepts h >= this).
    pub hue_high_min: f64,
    /// Minimum saturation, 0..1.
    pub sat_min: f64,
    /// Minimum value (brightness), 0..1.
    pub val_min: f64,
    /// Minimum component area in pixels.
    pub min_area: usize,
    /// Minimum boundary chain length in pixels.
    pub min_boundary_len: usize,
    /// Maximum accepted elongation; 1.0 is a perfectly balanced shape.
    pub max_elongation: f64,
    /// Denominator guard for the elongation ratio.
    pub elongation_eps: f64,
}

impl Default for SymbolParams {
    fn default() -> Self {
        Self {
            hue_low_max: 20.0,
            hue_high_min: 340.0,
            sat_min: 0.5,
            val_min: 0.25,
            min_area: 1500,
            min_boundary_len: 7,
            max_elongation: 1.5,
            elongation_eps: 1e-9,
        }
    }
}

/// Swath line fitting parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SwathParams {
    /// Swath width = candidate bounding height / this divisor.
    pub width_divisor: f64,
    /// Robust reweighting iterations after the initial fit.
    pub refit_iterations: usize,
    /// Tukey cutoff in units of the residual scale.
    pub tukey_c: f64,
}

impl Default for SwathParams {
    fn default() -> Self {
        Self {
            width_divisor: 5.0,
            refit_iterations: 3,
            tukey_c: 4.685,
        }
    }
}

/// Full octagon detector configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct OctagonParams {
    pub symbol: SymbolParams,
    pub swath: SwathParams,
}
