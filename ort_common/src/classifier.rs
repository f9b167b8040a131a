//! General purpose ONNX image classifier (ImageNet style: `(1, 3, 224, 224)` in,
//! `(1, N)` logits out) with a plain-text label file.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use image::imageops::FilterType;
use wardrobe_common::classify::ImageClassifier;
use wardrobe_common::model::Label;
use wardrobe_common::{Result, VisionError};

use crate::preprocess::{Normalization, resize_to_array};
use crate::session::LazySession;

pub struct OrtImageClassifier {
    session: LazySession,
    labels: Vec<String>,
    input_size: u32,
    top_k: usize,
}

impl OrtImageClassifier {
    pub fn new(model_path: impl Into<PathBuf>, labels: Vec<String>) -> Self {
        Self {
            session: LazySession::new(model_path),
            labels,
            input_size: 224,
            top_k: 10,
        }
    }

    /// Reads labels from `labels_path`, one per line.
    pub fn from_files(model_path: impl Into<PathBuf>, labels_path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(labels_path)?;
        let labels = parse_labels(&text);
        log::info!("Loaded {} classifier labels from {:?}", labels.len(), labels_path);
        Ok(Self::new(model_path, labels))
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

impl ImageClassifier for OrtImageClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Label>> {
        let input = resize_to_array(
            image,
            self.input_size,
            self.input_size,
            FilterType::Lanczos3,
            Normalization::IMAGENET,
        );
        let (shape, values) = self.session.run(input)?;
        if values.len() != self.labels.len() {
            return Err(VisionError::InvalidModelOutput(format!(
                "output shape {shape:?} does not match {} labels",
                self.labels.len()
            )));
        }
        Ok(top_labels(&self.labels, &softmax(&values), self.top_k))
    }
}

/// One label per line. Blank lines are dropped and a leading WordNet id
/// (`n01440764 tench, Tinca tinca`) is stripped.
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(' ') {
            Some((id, rest)) if is_wordnet_id(id) => rest.trim().to_string(),
            _ => line.to_string(),
        })
        .collect()
}

fn is_wordnet_id(token: &str) -> bool {
    token.len() == 9
        && token.starts_with('n')
        && token[1..].bytes().all(|b| b.is_ascii_digit())
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

fn top_labels(labels: &[String], scores: &[f32], k: usize) -> Vec<Label> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
        .into_iter()
        .take(k)
        .map(|(i, score)| Label::new(labels[i].clone(), score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        let text = "n01440764 tench, Tinca tinca\n\n  cardigan  \nn0000 not an id\n";
        assert_eq!(
            parse_labels(text),
            vec!["tench, Tinca tinca", "cardigan", "n0000 not an id"]
        );
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, 1000.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(probs[3] > 0.99);
    }

    #[test]
    fn test_top_labels_sorted() {
        let labels: Vec<String> = ["jean", "suit", "kimono"].iter().map(|s| s.to_string()).collect();
        let top = top_labels(&labels, &[0.2, 0.7, 0.1], 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], Label::new("suit", 0.7));
        assert_eq!(top[1], Label::new("jean", 0.2));
    }

    #[test]
    fn test_missing_model_is_reported() {
        let classifier = OrtImageClassifier::new("_models/missing.onnx", vec!["tee".into()]);
        let err = classifier.classify(&DynamicImage::new_rgb8(8, 8)).unwrap_err();
        assert!(matches!(err, VisionError::ModelUnavailable(_)));
    }
}
