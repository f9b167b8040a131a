//! Dominant color extraction: strided pixel sampling, quantization into coarse buckets
//! and frequency ranking.

use std::collections::HashMap;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::model::{ColorInfo, Rgb};

/// Tuning knobs for [`analyze_colors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorAnalysisConfig {
    /// Sample one pixel out of every `sample_stride`.
    pub sample_stride: usize,
    /// Pixels with alpha below this are treated as erased background.
    pub alpha_threshold: u8,
    /// Channels are rounded to the nearest multiple of this.
    pub quantization_step: u8,
    /// How many buckets to report.
    pub max_colors: usize,
}

impl ColorAnalysisConfig {
    /// Used after background removal.
    pub const fn background_aware() -> Self {
        Self {
            sample_stride: 8,
            alpha_threshold: 128,
            quantization_step: 16,
            max_colors: 5,
        }
    }

    /// Coarser variant for images that were not segmented; only fully
    /// transparent pixels are skipped.
    pub const fn simple() -> Self {
        Self {
            sample_stride: 10,
            alpha_threshold: 1,
            quantization_step: 32,
            max_colors: 5,
        }
    }
}

impl Default for ColorAnalysisConfig {
    fn default() -> Self {
        Self::background_aware()
    }
}

/// Rounds `value` to the nearest multiple of `step`, saturating at 255.
pub fn quantize_channel(value: u8, step: u8) -> u8 {
    if step <= 1 {
        return value;
    }
    let step = step as f32;
    ((value as f32 / step).round() * step).min(255.0) as u8
}

pub fn quantize(rgb: Rgb, step: u8) -> Rgb {
    Rgb::new(
        quantize_channel(rgb.r, step),
        quantize_channel(rgb.g, step),
        quantize_channel(rgb.b, step),
    )
}

/// Every `stride`-th pixel in row-major order whose alpha is at least `alpha_threshold`.
pub fn sample_pixels(
    image: &RgbaImage,
    stride: usize,
    alpha_threshold: u8,
) -> impl Iterator<Item = Rgb> + '_ {
    image
        .pixels()
        .step_by(stride.max(1))
        .filter(move |p| p[3] >= alpha_threshold)
        .map(|p| Rgb::new(p[0], p[1], p[2]))
}

/// Occurrence counts per quantized bucket.
#[derive(Debug, Default)]
pub struct ColorHistogram {
    // bucket -> (count, first seen), the latter breaks count ties
    buckets: HashMap<Rgb, (u32, usize)>,
    total: u32,
}

impl ColorHistogram {
    pub fn from_samples(samples: impl IntoIterator<Item = Rgb>, step: u8) -> Self {
        let mut histogram = Self::default();
        for rgb in samples {
            histogram.push(quantize(rgb, step));
        }
        histogram
    }

    fn push(&mut self, bucket: Rgb) {
        let next_index = self.buckets.len();
        self.buckets.entry(bucket).or_insert((0, next_index)).0 += 1;
        self.total += 1;
    }

    /// Number of samples that made it into the histogram.
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Buckets by descending count, ties in first-seen order.
    pub fn ranked(&self) -> Vec<(Rgb, u32)> {
        let mut entries: Vec<_> = self
            .buckets
            .iter()
            .map(|(&rgb, &(count, first))| (rgb, count, first))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        entries.into_iter().map(|(rgb, count, _)| (rgb, count)).collect()
    }

    /// Top `limit` buckets as named colors with their share of the total.
    pub fn top_colors(&self, limit: usize) -> Vec<ColorInfo> {
        if self.is_empty() {
            return Vec::new();
        }
        self.ranked()
            .into_iter()
            .take(limit)
            .map(|(rgb, count)| {
                let percentage = (100.0 * count as f64 / self.total as f64).round() as u8;
                ColorInfo::new(rgb, percentage)
            })
            .collect()
    }
}

/// Ranked dominant colors of `image`. Empty if no pixel survived the alpha filter.
pub fn analyze_colors(image: &RgbaImage, config: &ColorAnalysisConfig) -> Vec<ColorInfo> {
    let samples = sample_pixels(image, config.sample_stride, config.alpha_threshold);
    let histogram = ColorHistogram::from_samples(samples, config.quantization_step);
    log::debug!(
        "Sampled {} opaque pixels into {} buckets",
        histogram.total(),
        histogram.buckets.len()
    );
    histogram.top_colors(config.max_colors)
}
