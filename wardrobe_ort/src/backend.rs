use std::path::Path;
use std::sync::Arc;

use ort_common::{OrtBackgroundScorer, OrtImageClassifier};
use remote_inference::{InferenceClient, RemoteClassifier, RemoteSegmenter};
use wardrobe_common::classify::{AttributeDetector, ImageClassifier};
use wardrobe_common::config::PipelineConfig;
use wardrobe_common::detector::ColorDetector;
use wardrobe_common::interpret::KeywordInterpreter;
use wardrobe_common::segmentation::BackgroundScorer;

/// The two pipelines wired to one inference backend. Models load on first use and
/// stay loaded for every following image.
pub struct Backend {
    pub colors: ColorDetector,
    /// Absent when no classifier could be set up; attributes then use defaults.
    pub attributes: Option<AttributeDetector>,
}

impl Backend {
    pub fn local(
        segmentation_model: &Path,
        classifier_model: &Path,
        labels: &Path,
        config: &PipelineConfig,
    ) -> anyhow::Result<Self> {
        let scorer: Arc<dyn BackgroundScorer> =
            Arc::new(OrtBackgroundScorer::new(segmentation_model));
        let classifier = match OrtImageClassifier::from_files(classifier_model, labels) {
            Ok(classifier) => Some(Arc::new(classifier) as Arc<dyn ImageClassifier>),
            Err(e) => {
                log::warn!("Attribute detection disabled, could not read labels {labels:?}: {e}");
                None
            }
        };
        log::info!("Prepared local backend with segmentation model {segmentation_model:?}");
        Self::assemble(scorer, classifier, config)
    }

    pub fn remote(url: &str, config: &PipelineConfig) -> anyhow::Result<Self> {
        let client = InferenceClient::new(Some(url.to_string()), config.inference_timeout())?;
        let scorer: Arc<dyn BackgroundScorer> = Arc::new(RemoteSegmenter::new(client.clone()));
        let classifier: Arc<dyn ImageClassifier> = Arc::new(RemoteClassifier::new(client));
        log::info!("Prepared remote backend at {url}");
        Self::assemble(scorer, Some(classifier), config)
    }

    fn assemble(
        scorer: Arc<dyn BackgroundScorer>,
        classifier: Option<Arc<dyn ImageClassifier>>,
        config: &PipelineConfig,
    ) -> anyhow::Result<Self> {
        let interpreter = Arc::new(KeywordInterpreter::new(config.load_keyword_tables()?));
        Ok(Self {
            colors: ColorDetector::from_config(scorer, config),
            attributes: classifier
                .map(|classifier| AttributeDetector::with_interpreter(classifier, interpreter)),
        })
    }
}
