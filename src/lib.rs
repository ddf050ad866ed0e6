//! Median-cut (MMCQ) palette extraction.
//!
//! Reduces an image to a small palette of representative colors, each paired
//! with the number of sampled pixels it represents. Pixels are subsampled,
//! bucketed into a 5-bit-per-channel histogram, and the populated color space
//! is recursively split at the population median of its widest axis.
//!
//! ```
//! use median_palette::{QuantizeConfig, quantize_rgb};
//!
//! let pixels = vec![rgb::RGB { r: 200, g: 30, b: 40 }; 64];
//! let palette = quantize_rgb(&pixels, 8, 8, &QuantizeConfig::new().quality(1)).unwrap();
//! assert_eq!(palette.len(), 1);
//! assert_eq!(palette.colors()[0].population, 64);
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod histogram;
#[cfg(feature = "std")]
pub mod job;
pub mod median_cut;
pub mod palette;
pub mod sample;
pub mod vbox;

pub use error::QuantizeError;
#[cfg(feature = "std")]
pub use error::JobError;
#[cfg(feature = "std")]
pub use job::{JobState, QuantizeJob};
pub use palette::{Palette, PaletteOrder, QuantizedColor};
pub use sample::ChannelLayout;

use alloc::vec::Vec;
use core::sync::atomic::AtomicBool;

use histogram::Histogram;
use median_cut::ColorMapBuilder;
use sample::{SampleParams, SourcePixel};

/// Palette size used when none is configured.
pub const DEFAULT_COLOR_COUNT: u32 = 16;
/// Sampling stride used when none is configured, or when 0 is given.
pub const DEFAULT_QUALITY: u32 = 10;
/// Near-white pixels are skipped unless configured otherwise.
pub const DEFAULT_IGNORE_WHITE: bool = true;
/// Upper bound on `max_colors`.
pub const MAX_COLORS: u32 = 256;

/// Configuration for palette extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizeConfig {
    /// Maximum number of palette colors (1..=256).
    pub max_colors: u32,
    /// Sampling stride: 1 reads every pixel, 10 every tenth.
    /// Higher = faster, less faithful. 0 falls back to [`DEFAULT_QUALITY`].
    pub quality: u32,
    /// Skip pixels whose R, G and B all exceed 250.
    pub ignore_white: bool,
    /// Skip pixels with alpha below this. 0 keeps everything.
    pub min_alpha: u8,
    /// Output ordering by population.
    pub order: PaletteOrder,
    /// Share of `max_colors` split by population before switching to
    /// population × volume.
    pub fraction_by_population: f64,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            max_colors: DEFAULT_COLOR_COUNT,
            quality: DEFAULT_QUALITY,
            ignore_white: DEFAULT_IGNORE_WHITE,
            min_alpha: sample::DEFAULT_MIN_ALPHA,
            order: PaletteOrder::Ascending,
            fraction_by_population: median_cut::FRACTION_BY_POPULATION,
        }
    }
}

impl QuantizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_colors(mut self, n: u32) -> Self {
        self.max_colors = n;
        self
    }

    pub fn quality(mut self, q: u32) -> Self {
        self.quality = q;
        self
    }

    pub fn ignore_white(mut self, ignore: bool) -> Self {
        self.ignore_white = ignore;
        self
    }

    pub fn min_alpha(mut self, alpha: u8) -> Self {
        self.min_alpha = alpha;
        self
    }

    pub fn order(mut self, order: PaletteOrder) -> Self {
        self.order = order;
        self
    }

    pub fn fraction_by_population(mut self, fraction: f64) -> Self {
        self.fraction_by_population = fraction;
        self
    }

    /// Sampling stride actually used, with 0 coerced to the default.
    pub fn effective_quality(&self) -> u32 {
        if self.quality < 1 {
            DEFAULT_QUALITY
        } else {
            self.quality
        }
    }

    pub(crate) fn sample_params(&self) -> SampleParams {
        if self.quality < 1 {
            log::warn!("quality {} is invalid, using {DEFAULT_QUALITY}", self.quality);
        }
        SampleParams {
            step: self.effective_quality() as usize,
            ignore_white: self.ignore_white,
            min_alpha: self.min_alpha,
        }
    }
}

/// Extract a palette from RGBA pixels laid out row-major.
///
/// A zero-area image, or one whose pixels are all filtered out, yields an
/// empty palette rather than an error.
pub fn quantize(
    pixels: &[rgb::RGBA<u8>],
    width: usize,
    height: usize,
    config: &QuantizeConfig,
) -> Result<Palette, QuantizeError> {
    quantize_pixels(pixels, width, height, config, None)
}

/// Extract a palette from RGB pixels. Every pixel is treated as opaque.
pub fn quantize_rgb(
    pixels: &[rgb::RGB<u8>],
    width: usize,
    height: usize,
    config: &QuantizeConfig,
) -> Result<Palette, QuantizeError> {
    quantize_pixels(pixels, width, height, config, None)
}

/// Samples that would feed the histogram for these pixels and settings.
///
/// Their count equals the total population of the palette built from them.
pub fn sampled_pixels<P: SourcePixel>(
    pixels: &[P],
    config: &QuantizeConfig,
) -> Vec<rgb::RGBA<u8>> {
    sample::sample_pixels(pixels, &config.sample_params())
}

/// Extract a palette from a packed byte buffer in the given channel layout.
pub fn quantize_bytes(
    bytes: &[u8],
    layout: ChannelLayout,
    width: usize,
    height: usize,
    config: &QuantizeConfig,
) -> Result<Palette, QuantizeError> {
    validate_config(config)?;
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(layout.channels()));
    if expected != Some(bytes.len()) {
        return Err(QuantizeError::DimensionMismatch {
            len: bytes.len(),
            width,
            height,
        });
    }
    let samples = sample::sample_bytes(bytes, layout, &config.sample_params());
    palette_from_samples(&samples, config, None)
}

/// Average of the palette [`quantize`] would return, as a single color.
///
/// `Ok(None)` when nothing survives sampling.
pub fn dominant_color(
    pixels: &[rgb::RGBA<u8>],
    width: usize,
    height: usize,
    config: &QuantizeConfig,
) -> Result<Option<QuantizedColor>, QuantizeError> {
    Ok(quantize(pixels, width, height, config)?.average_color())
}

pub(crate) fn quantize_pixels<P: SourcePixel>(
    pixels: &[P],
    width: usize,
    height: usize,
    config: &QuantizeConfig,
    cancel: Option<&AtomicBool>,
) -> Result<Palette, QuantizeError> {
    validate_inputs(pixels.len(), width, height, config)?;
    let samples = sample::sample_pixels(pixels, &config.sample_params());
    palette_from_samples(&samples, config, cancel)
}

/// Histogram, split and average an already-sampled stream.
fn palette_from_samples(
    samples: &[rgb::RGBA<u8>],
    config: &QuantizeConfig,
    cancel: Option<&AtomicBool>,
) -> Result<Palette, QuantizeError> {
    if samples.is_empty() {
        log::debug!("no pixels survived sampling, returning empty palette");
        return Ok(Palette::default());
    }

    let hist = Histogram::from_samples(samples);

    let mut builder = ColorMapBuilder::new(&hist, config.max_colors as usize)
        .fraction_by_population(config.fraction_by_population);
    if let Some(flag) = cancel {
        builder = builder.cancel_flag(flag);
    }
    let map = builder.build()?;

    let palette = Palette::from_color_map(&map, &hist, config.order);
    log::debug!(
        "quantized {} samples into {} colors (requested {})",
        samples.len(),
        palette.len(),
        config.max_colors
    );
    Ok(palette)
}

fn validate_config(config: &QuantizeConfig) -> Result<(), QuantizeError> {
    if config.max_colors < 1 || config.max_colors > MAX_COLORS {
        return Err(QuantizeError::InvalidMaxColors(config.max_colors));
    }
    Ok(())
}

fn validate_inputs(
    pixel_count: usize,
    width: usize,
    height: usize,
    config: &QuantizeConfig,
) -> Result<(), QuantizeError> {
    validate_config(config)?;
    if width.checked_mul(height) != Some(pixel_count) {
        return Err(QuantizeError::DimensionMismatch {
            len: pixel_count,
            width,
            height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quality_falls_back_to_default() {
        let config = QuantizeConfig::new().quality(0);
        assert_eq!(config.effective_quality(), DEFAULT_QUALITY);
        assert_eq!(config.sample_params().step, DEFAULT_QUALITY as usize);
    }

    #[test]
    fn builder_sets_fields() {
        let config = QuantizeConfig::new()
            .max_colors(8)
            .quality(3)
            .ignore_white(false)
            .min_alpha(0)
            .order(PaletteOrder::Descending)
            .fraction_by_population(0.5);
        assert_eq!(config.max_colors, 8);
        assert_eq!(config.effective_quality(), 3);
        assert!(!config.ignore_white);
        assert_eq!(config.min_alpha, 0);
        assert_eq!(config.order, PaletteOrder::Descending);
        assert_eq!(config.fraction_by_population, 0.5);
    }

    #[test]
    fn defaults() {
        let config = QuantizeConfig::default();
        assert_eq!(config.max_colors, 16);
        assert_eq!(config.quality, 10);
        assert!(config.ignore_white);
    }

    #[test]
    fn sampled_pixels_accepts_rgb() {
        let white = rgb::RGB { r: 255, g: 255, b: 255 };
        let dark = rgb::RGB { r: 10, g: 20, b: 30 };
        let mid = rgb::RGB { r: 40, g: 50, b: 60 };
        let pixels = vec![white, dark, white, mid];
        let config = QuantizeConfig::new().quality(1);

        let samples = sampled_pixels(&pixels, &config);
        let expected: Vec<rgb::RGBA<u8>> = [dark, mid].iter().map(|p| p.to_rgba()).collect();
        assert_eq!(samples, expected);
        let palette = quantize_rgb(&pixels, 2, 2, &config).unwrap();
        assert_eq!(palette.total_population(), samples.len() as u64);
    }
}
