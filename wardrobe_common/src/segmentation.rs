//! Background removal: per-pixel background scores from a pluggable model, composited
//! into the alpha channel.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use ndarray::Array2;

use crate::error::{Result, VisionError};
use crate::progress::{self, Progress};

/// Longest side an image may have before it is downscaled for segmentation.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// `(height, width)` grid of background-ness scores in `[0, 1]`.
pub type ScoreMap = Array2<f32>;

/// Anything that can tell, per pixel, how likely it belongs to the background.
pub trait BackgroundScorer: Send + Sync {
    /// Loads whatever the scorer needs. Called before every run; should be cheap once loaded.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }

    /// Must return a map with the same dimensions as `image`.
    fn score(&self, image: &RgbImage) -> Result<ScoreMap>;
}

pub struct BackgroundSegmenter {
    scorer: Arc<dyn BackgroundScorer>,
    max_dimension: u32,
    timeout: Option<Duration>,
}

impl BackgroundSegmenter {
    pub fn new(scorer: Arc<dyn BackgroundScorer>) -> Self {
        Self {
            scorer,
            max_dimension: DEFAULT_MAX_DIMENSION,
            timeout: None,
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    /// Deadline applied separately to model loading and to inference.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the (possibly downscaled) image with background pixels made transparent.
    pub fn remove_background(&self, image: &DynamicImage, progress: &Progress) -> Result<RgbaImage> {
        self.call_with_deadline(|scorer| scorer.warm_up())?;
        progress.advance(progress::MODEL_READY);

        let resized = downscale_to_fit(image, self.max_dimension);
        progress.advance(progress::RESIZED);

        let rgb = resized.to_rgb8();
        let (width, height) = rgb.dimensions();
        let scores = self.call_with_deadline(move |scorer| scorer.score(&rgb))?;
        progress.advance(progress::INFERRED);

        let mut rgba = resized.into_rgba8();
        apply_background_scores(&mut rgba, &scores)?;
        progress.advance(progress::MASK_APPLIED);

        log::debug!("Background removed from {width}x{height} image");
        progress.advance(progress::SEGMENTED);
        Ok(rgba)
    }

    fn call_with_deadline<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn BackgroundScorer) -> Result<T> + Send + 'static,
    {
        let Some(timeout) = self.timeout else {
            return f(self.scorer.as_ref());
        };

        // The worker cannot be cancelled; on timeout its result is simply dropped.
        let scorer = Arc::clone(&self.scorer);
        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name("background-scorer".to_string())
            .spawn(move || {
                let _ = tx.send(f(scorer.as_ref()));
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Background scorer exceeded {timeout:?}");
                Err(VisionError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(VisionError::model_unavailable(
                "background scorer stopped without a result",
            )),
        }
    }
}

/// Scales `image` down so its longer side equals `max_dimension`, keeping the aspect ratio.
/// Images already within bounds are returned unchanged.
pub fn downscale_to_fit(image: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max_dimension {
        return image.clone();
    }
    let scale = max_dimension as f64 / longest as f64;
    let (new_width, new_height) = if width >= height {
        (max_dimension, ((height as f64 * scale).round() as u32).max(1))
    } else {
        (((width as f64 * scale).round() as u32).max(1), max_dimension)
    };
    log::debug!("Downscaling {width}x{height} -> {new_width}x{new_height}");
    image.resize_exact(new_width, new_height, FilterType::Triangle)
}

/// Writes `alpha = round((1 - score) * 255)` into every pixel; RGB is left untouched.
pub fn apply_background_scores(image: &mut RgbaImage, scores: &ScoreMap) -> Result<()> {
    let (width, height) = image.dimensions();
    if scores.dim() != (height as usize, width as usize) {
        return Err(VisionError::InvalidModelOutput(format!(
            "mask is {:?}, image is {}x{}",
            scores.dim(),
            height,
            width
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(VisionError::InvalidModelOutput(format!(
            "mask contains non-finite score {bad}"
        )));
    }

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let score = scores[[y as usize, x as usize]].clamp(0.0, 1.0);
        pixel[3] = ((1.0 - score) * 255.0).round() as u8;
    }
    Ok(())
}
