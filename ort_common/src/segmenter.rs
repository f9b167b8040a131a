//! Background scoring with a single-channel ONNX segmentation model
//! (U2-Net / ISNet style: `(1, 3, S, S)` in, `(1, 1, S, S)` out).

use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Luma, RgbImage};
use ndarray::Array2;
use wardrobe_common::segmentation::{BackgroundScorer, ScoreMap};
use wardrobe_common::{Result, VisionError};

use crate::preprocess::{Normalization, resize_to_array};
use crate::session::LazySession;

/// What the model's output channel measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSemantics {
    /// Higher means more likely to be the garment (salient object models).
    Foreground,
    /// Higher means more likely to be background.
    Background,
}

pub struct OrtBackgroundScorer {
    session: LazySession,
    input_size: u32,
    normalization: Normalization,
    semantics: MaskSemantics,
}

impl OrtBackgroundScorer {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            session: LazySession::new(model_path),
            input_size: 320,
            normalization: Normalization::IMAGENET,
            semantics: MaskSemantics::Foreground,
        }
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_semantics(mut self, semantics: MaskSemantics) -> Self {
        self.semantics = semantics;
        self
    }
}

impl BackgroundScorer for OrtBackgroundScorer {
    fn warm_up(&self) -> Result<()> {
        self.session.lock().map(drop)
    }

    fn score(&self, image: &RgbImage) -> Result<ScoreMap> {
        let (width, height) = image.dimensions();
        let input = resize_to_array(
            &DynamicImage::ImageRgb8(image.clone()),
            self.input_size,
            self.input_size,
            FilterType::Triangle,
            self.normalization,
        );
        let (shape, values) = self.session.run(input)?;
        let mask = mask_from_output(&shape, values)?;
        let mask = resize_mask(mask, width, height);

        let scores = Array2::from_shape_vec((height as usize, width as usize), mask.into_raw())
            .map_err(VisionError::invalid_output)?;
        Ok(match self.semantics {
            MaskSemantics::Foreground => scores.mapv(|s| 1.0 - s.clamp(0.0, 1.0)),
            MaskSemantics::Background => scores.mapv(|s| s.clamp(0.0, 1.0)),
        })
    }
}

/// Accepts `(1, 1, H, W)`, `(1, H, W)` or `(H, W)` outputs.
fn mask_from_output(shape: &[i64], values: Vec<f32>) -> Result<ImageBuffer<Luma<f32>, Vec<f32>>> {
    let (leading, spatial) = match shape.len() {
        2..=4 => shape.split_at(shape.len() - 2),
        _ => {
            return Err(VisionError::InvalidModelOutput(format!(
                "unexpected mask shape {shape:?}"
            )))
        }
    };
    if leading.iter().any(|&d| d != 1) {
        return Err(VisionError::InvalidModelOutput(format!(
            "expected a single mask channel, got shape {shape:?}"
        )));
    }
    let (h, w) = (spatial[0], spatial[1]);
    if h <= 0 || w <= 0 || values.len() != (h * w) as usize {
        return Err(VisionError::InvalidModelOutput(format!(
            "mask shape {shape:?} does not match {} values",
            values.len()
        )));
    }
    ImageBuffer::from_raw(w as u32, h as u32, values)
        .ok_or_else(|| VisionError::invalid_output("mask buffer too small"))
}

fn resize_mask(
    mask: ImageBuffer<Luma<f32>, Vec<f32>>,
    width: u32,
    height: u32,
) -> ImageBuffer<Luma<f32>, Vec<f32>> {
    if mask.dimensions() == (width, height) {
        mask
    } else {
        imageops::resize(&mask, width, height, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_shapes() {
        assert!(mask_from_output(&[1, 1, 2, 3], vec![0.0; 6]).is_ok());
        assert!(mask_from_output(&[1, 2, 3], vec![0.0; 6]).is_ok());
        assert!(mask_from_output(&[2, 3], vec![0.0; 6]).is_ok());
        let mask = mask_from_output(&[1, 1, 2, 3], (0..6).map(|v| v as f32).collect()).unwrap();
        assert_eq!(mask.get_pixel(2, 1)[0], 5.0);
    }

    #[test]
    fn test_bad_mask_shapes() {
        for (shape, len) in [(vec![1, 2, 2, 3], 12), (vec![6], 6), (vec![1, 1, 2, 3], 5)] {
            let err = mask_from_output(&shape, vec![0.0; len]).unwrap_err();
            assert!(matches!(err, VisionError::InvalidModelOutput(_)), "{shape:?}");
        }
    }

    #[test]
    fn test_resize_mask_to_image() {
        let mask = ImageBuffer::from_pixel(4, 4, Luma([0.25f32]));
        let resized = resize_mask(mask, 10, 6);
        assert_eq!(resized.dimensions(), (10, 6));
        assert!(resized.pixels().all(|p| (p[0] - 0.25).abs() < 1e-4));
    }

    #[test]
    fn test_missing_model_fails_warm_up() {
        let scorer = OrtBackgroundScorer::new("_models/missing-u2net.onnx");
        assert!(matches!(scorer.warm_up(), Err(VisionError::ModelUnavailable(_))));
    }
}
