use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color_extractor::ColorAnalysisConfig;
use crate::error::Result;
use crate::interpret::KeywordTables;
use crate::segmentation::DEFAULT_MAX_DIMENSION;

/// Settings for the color and attribute pipelines. Every field has a default, so an empty
/// config file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Longer image side is capped to this before segmentation.
    pub max_dimension: u32,
    pub analysis: ColorAnalysisConfig,
    /// Deadline for model loading and inference; unbounded when absent.
    pub inference_timeout_secs: Option<u64>,
    /// JSON file replacing the built-in keyword tables.
    pub keyword_tables: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            analysis: ColorAnalysisConfig::background_aware(),
            inference_timeout_secs: None,
            keyword_tables: None,
        }
    }
}

impl PipelineConfig {
    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_secs.map(Duration::from_secs)
    }

    /// Built-in tables unless a replacement file is configured.
    pub fn load_keyword_tables(&self) -> Result<KeywordTables> {
        match &self.keyword_tables {
            Some(path) => {
                log::info!("Loading keyword tables from {path:?}");
                KeywordTables::from_json_file(path)
            }
            None => Ok(KeywordTables::default()),
        }
    }
}
