//! Decode -> remove background -> sample, quantize and name colors.

use std::sync::Arc;

use image::DynamicImage;

use crate::color_extractor::{analyze_colors, ColorAnalysisConfig};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::model::{ColorDetectionResult, ImageSource};
use crate::progress::{self, Progress};
use crate::segmentation::{BackgroundScorer, BackgroundSegmenter};

/// Runs the color pipeline. Holds no per-image state, so one detector can serve
/// any number of independent (and concurrent) calls.
pub struct ColorDetector {
    segmenter: BackgroundSegmenter,
    analysis: ColorAnalysisConfig,
}

impl ColorDetector {
    pub fn new(scorer: Arc<dyn BackgroundScorer>) -> Self {
        Self::from_config(scorer, &PipelineConfig::default())
    }

    pub fn from_config(scorer: Arc<dyn BackgroundScorer>, config: &PipelineConfig) -> Self {
        let segmenter = BackgroundSegmenter::new(scorer)
            .with_max_dimension(config.max_dimension)
            .with_timeout(config.inference_timeout());
        Self {
            segmenter,
            analysis: config.analysis,
        }
    }

    pub fn process_image(&self, source: &ImageSource) -> Result<ColorDetectionResult> {
        self.process_image_with_progress(source, &Progress::new())
    }

    /// Like [`Self::process_image`], reporting through `progress`. On error the
    /// progress is reset to 0 and the error is returned unchanged.
    pub fn process_image_with_progress(
        &self,
        source: &ImageSource,
        progress: &Progress,
    ) -> Result<ColorDetectionResult> {
        progress.reset();
        match self.run(source, progress) {
            Ok(result) => {
                progress.advance(progress::DONE);
                Ok(result)
            }
            Err(e) => {
                progress.reset();
                Err(e)
            }
        }
    }

    fn run(&self, source: &ImageSource, progress: &Progress) -> Result<ColorDetectionResult> {
        let original = source.decode()?;
        progress.advance(progress::DECODED);

        let processed = self.segmenter.remove_background(&original, progress)?;
        let colors = analyze_colors(&processed, &self.analysis);
        match colors.first() {
            Some(primary) => log::info!(
                "Primary color {} ({}) at {}%",
                primary.name,
                primary.hex,
                primary.percentage
            ),
            None => log::warn!("Background removal left nothing to sample"),
        }

        Ok(ColorDetectionResult::new(
            original,
            DynamicImage::ImageRgba8(processed),
            colors,
        ))
    }

    /// Color analysis of the whole image without background removal, using the coarser
    /// [`ColorAnalysisConfig::simple`] settings. The processed image is the original.
    pub fn process_without_segmentation(source: &ImageSource) -> Result<ColorDetectionResult> {
        let original = source.decode()?;
        let colors = analyze_colors(&original.to_rgba8(), &ColorAnalysisConfig::simple());
        Ok(ColorDetectionResult::new(original.clone(), original, colors))
    }
}
