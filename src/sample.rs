use alloc::vec::Vec;

use rgb::{RGB, RGBA};

/// Channels above this value on all of R, G and B count as near-white.
pub const WHITE_THRESHOLD: u8 = 250;

/// Pixels with alpha below this are skipped by default.
pub const DEFAULT_MIN_ALPHA: u8 = 125;

/// A pixel type the sampler can read.
pub trait SourcePixel: Copy {
    fn to_rgba(self) -> RGBA<u8>;
}

impl SourcePixel for RGBA<u8> {
    #[inline]
    fn to_rgba(self) -> RGBA<u8> {
        self
    }
}

impl SourcePixel for RGB<u8> {
    #[inline]
    fn to_rgba(self) -> RGBA<u8> {
        RGBA {
            r: self.r,
            g: self.g,
            b: self.b,
            a: 255,
        }
    }
}

/// Byte order of a packed pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Rgb,
    Rgba,
    /// Blue, green, red, alpha. The native order of most GPU readbacks.
    Bgra,
    Bgr,
    Argb,
}

impl ChannelLayout {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra | Self::Argb => 4,
        }
    }

    /// Decode one pixel. `px` must hold exactly [`channels`](Self::channels) bytes.
    #[inline]
    fn decode(self, px: &[u8]) -> RGBA<u8> {
        let (r, g, b, a) = match self {
            Self::Rgb => (px[0], px[1], px[2], 255),
            Self::Rgba => (px[0], px[1], px[2], px[3]),
            Self::Bgra => (px[2], px[1], px[0], px[3]),
            Self::Bgr => (px[2], px[1], px[0], 255),
            Self::Argb => (px[1], px[2], px[3], px[0]),
        };
        RGBA { r, g, b, a }
    }
}

/// Filters applied while sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleParams {
    /// Sampling stride, already coerced to at least 1.
    pub step: usize,
    pub ignore_white: bool,
    pub min_alpha: u8,
}

impl SampleParams {
    #[inline]
    fn keeps(&self, px: RGBA<u8>) -> bool {
        if px.a < self.min_alpha {
            return false;
        }
        !(self.ignore_white
            && px.r > WHITE_THRESHOLD
            && px.g > WHITE_THRESHOLD
            && px.b > WHITE_THRESHOLD)
    }
}

/// Take every `step`-th pixel starting at index 0, dropping filtered ones.
pub fn sample_pixels<P: SourcePixel>(pixels: &[P], params: &SampleParams) -> Vec<RGBA<u8>> {
    let step = params.step.max(1);
    pixels
        .iter()
        .step_by(step)
        .map(|p| p.to_rgba())
        .filter(|&p| params.keeps(p))
        .collect()
}

/// Byte-buffer variant of [`sample_pixels`]. Trailing bytes that do not form
/// a whole pixel are ignored.
pub fn sample_bytes(bytes: &[u8], layout: ChannelLayout, params: &SampleParams) -> Vec<RGBA<u8>> {
    let step = params.step.max(1);
    bytes
        .chunks_exact(layout.channels())
        .step_by(step)
        .map(|px| layout.decode(px))
        .filter(|&p| params.keeps(p))
        .collect()
}
