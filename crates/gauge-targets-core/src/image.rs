//! Minimal 8-bit image containers.
//!
//! Detectors work on borrowed views so callers can keep pixel buffers in
//! whatever outer type they like (`image::RgbImage`, mmap, test vectors).
//! Out-of-bounds reads return 0, which doubles as the fill value for
//! resampling operations.

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Zero-filled image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Wrap an existing buffer; `None` when the length does not match.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

/// Interleaved RGB, 3 bytes per pixel.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major RGB, len = w*h*3
}

#[derive(Clone, Debug)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != width * height * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

impl RgbImageView<'_> {
    /// `true` when the buffer length matches `width * height * 3`.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.width * self.height * 3
    }

    /// Pixel at `(x, y)`; caller guarantees bounds.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Integer Rec.601 luma conversion.
    pub fn to_gray(&self) -> GrayImage {
        let mut out = Vec::with_capacity(self.width * self.height);
        for px in self.data.chunks_exact(3) {
            let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
            out.push(((77 * r + 150 * g + 29 * b + 128) >> 8) as u8);
        }
        GrayImage {
            width: self.width,
            height: self.height,
            data: out,
        }
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).clamp(0.0, 255.0) as u8
}

/// Copy a `w x h` window with top-left `(x0, y0)` into an owned image.
/// Out-of-bounds source pixels read as 0.
pub fn crop_gray(src: &GrayImageView<'_>, x0: i32, y0: i32, w: usize, h: usize) -> GrayImage {
    let mut data = Vec::with_capacity(w * h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            data.push(get_gray(src, x0 + x, y0 + y));
        }
    }
    GrayImage {
        width: w,
        height: h,
        data,
    }
}
