//! Best-effort pattern, style and garment attribute detection on top of a generic
//! image classifier.

use std::sync::Arc;

use image::DynamicImage;

use crate::error::Result;
use crate::interpret::{KeywordInterpreter, LabelInterpreter};
use crate::model::{Category, DetailedAttributes, Label, PatternDetectionResult};

/// General purpose image classifier.
pub trait ImageClassifier: Send + Sync {
    /// Labels ordered by descending score.
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Label>>;
}

/// Attribute detection using an [`ImageClassifier`] and a [`LabelInterpreter`].
///
/// Nothing here ever fails: classifier errors are logged and replaced by defaults so
/// that attribute detection can never block saving an item.
pub struct AttributeDetector {
    classifier: Arc<dyn ImageClassifier>,
    interpreter: Arc<dyn LabelInterpreter>,
}

impl AttributeDetector {
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self::with_interpreter(classifier, Arc::new(KeywordInterpreter::default()))
    }

    pub fn with_interpreter(
        classifier: Arc<dyn ImageClassifier>,
        interpreter: Arc<dyn LabelInterpreter>,
    ) -> Self {
        Self {
            classifier,
            interpreter,
        }
    }

    fn ranked_labels(&self, image: &DynamicImage) -> Result<Vec<Label>> {
        let mut labels = self.classifier.classify(image)?;
        labels.sort_by(|a, b| b.score.total_cmp(&a.score));
        log::debug!(
            "Classifier labels: {:?}",
            labels.iter().take(5).map(|l| (&l.label, l.score)).collect::<Vec<_>>()
        );
        Ok(labels)
    }

    /// Pattern and style tags, `solid`/`casual` if the classifier fails.
    pub fn detect_pattern(&self, image: &DynamicImage) -> PatternDetectionResult {
        match self.ranked_labels(image) {
            Ok(labels) => self.interpreter.pattern(&labels),
            Err(e) => {
                log::warn!("Pattern detection failed, using defaults: {e}");
                PatternDetectionResult::default()
            }
        }
    }

    /// Category specific attributes, empty if the classifier fails.
    pub fn detect_attributes(
        &self,
        image: &DynamicImage,
        category: Category,
        subcategory: Option<&str>,
    ) -> DetailedAttributes {
        match self.ranked_labels(image) {
            Ok(labels) => self.interpreter.attributes(&labels, category, subcategory),
            Err(e) => {
                log::warn!("Attribute detection failed for {category}: {e}");
                DetailedAttributes::default()
            }
        }
    }

    /// Both of the above from a single classifier run.
    pub fn detect_all(
        &self,
        image: &DynamicImage,
        category: Option<Category>,
        subcategory: Option<&str>,
    ) -> (PatternDetectionResult, DetailedAttributes) {
        match self.ranked_labels(image) {
            Ok(labels) => (
                self.interpreter.pattern(&labels),
                category
                    .map(|c| self.interpreter.attributes(&labels, c, subcategory))
                    .unwrap_or_default(),
            ),
            Err(e) => {
                log::warn!("Classification failed, using default attributes: {e}");
                Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VisionError;
    use crate::model::Pattern;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClassifier {
        labels: Vec<Label>,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn new(pairs: &[(&str, f32)]) -> Self {
            Self {
                labels: pairs.iter().map(|&(l, s)| Label::new(l, s)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ImageClassifier for FixedClassifier {
        fn classify(&self, _image: &DynamicImage) -> Result<Vec<Label>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.labels.clone())
        }
    }

    struct DownClassifier;

    impl ImageClassifier for DownClassifier {
        fn classify(&self, _image: &DynamicImage) -> Result<Vec<Label>> {
            Err(VisionError::model_unavailable("503 from inference service"))
        }
    }

    fn image() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn test_failure_yields_defaults() {
        let detector = AttributeDetector::new(Arc::new(DownClassifier));
        assert_eq!(detector.detect_pattern(&image()), PatternDetectionResult::default());
        assert!(detector
            .detect_attributes(&image(), Category::Tops, None)
            .is_empty());
        let (pattern, attrs) = detector.detect_all(&image(), Some(Category::Dresses), None);
        assert_eq!(pattern.pattern, Pattern::Solid);
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_unsorted_labels_are_ranked() {
        // the zebra label would fall outside the top five if not sorted first
        let classifier = FixedClassifier::new(&[
            ("a", 0.01),
            ("b", 0.02),
            ("c", 0.03),
            ("d", 0.04),
            ("e", 0.05),
            ("zebra", 0.8),
        ]);
        let detector = AttributeDetector::new(Arc::new(classifier));
        let result = detector.detect_pattern(&image());
        assert_eq!(result.pattern, Pattern::Animal);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_detect_all_classifies_once() {
        let classifier = Arc::new(FixedClassifier::new(&[("v-neck sweater", 0.7)]));
        let detector = AttributeDetector::new(classifier.clone());
        let (_, attrs) = detector.detect_all(&image(), Some(Category::Tops), None);
        assert_eq!(attrs.neckline.as_deref(), Some("V-Neck"));
        assert_eq!(attrs.sleeve_type.as_deref(), Some("Long Sleeve"));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_accessories_get_no_attributes() {
        let classifier = FixedClassifier::new(&[("cardigan", 0.9), ("slim tie", 0.5)]);
        let detector = AttributeDetector::new(Arc::new(classifier));
        let attrs = detector.detect_attributes(&image(), Category::Accessories, Some("Belt"));
        assert_eq!(attrs, DetailedAttributes::default());
    }
}
