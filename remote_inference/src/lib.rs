//! Background scoring and classification against a request/response inference
//! service. Both endpoints take a PNG body and answer with JSON:
//!
//! - `POST {url}/segment` -> `{ "width": W, "height": H, "mask": [f32; W*H] }`, row major
//!   foreground probabilities
//! - `POST {url}/classify` -> `{ "labels": [{ "label": "...", "score": 0.9 }, ...] }`

use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, RgbImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use wardrobe_common::classify::ImageClassifier;
use wardrobe_common::model::Label;
use wardrobe_common::segmentation::{BackgroundScorer, ScoreMap};
use wardrobe_common::{Result, VisionError};

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct MaskResponse {
    pub width: u32,
    pub height: u32,
    pub mask: Vec<f32>,
}

impl MaskResponse {
    /// Converts foreground probabilities into a background score map for an image of
    /// `width` x `height`.
    pub fn into_scores(self, width: u32, height: u32) -> Result<ScoreMap> {
        if (self.width, self.height) != (width, height) {
            return Err(VisionError::InvalidModelOutput(format!(
                "mask is {}x{}, image is {width}x{height}",
                self.width, self.height
            )));
        }
        let fg = Array2::from_shape_vec((height as usize, width as usize), self.mask)
            .map_err(VisionError::invalid_output)?;
        Ok(fg.mapv(|v| 1.0 - v))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub labels: Vec<Label>,
}

impl ClassifyResponse {
    pub fn into_ranked(mut self) -> Vec<Label> {
        self.labels.sort_by(|a, b| b.score.total_cmp(&a.score));
        self.labels
    }
}

/// Blocking client shared by [`RemoteSegmenter`] and [`RemoteClassifier`].
#[derive(Clone)]
pub struct InferenceClient {
    client: reqwest::blocking::Client,
    service_url: String,
}

impl InferenceClient {
    pub fn new(service_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout.unwrap_or(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
            .build()
            .map_err(VisionError::model_unavailable)?;
        let service_url = service_url
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self { client, service_url })
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn check_health(&self) -> Result<bool> {
        let url = format!("{}/health", self.service_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(VisionError::model_unavailable)?;
        Ok(response.status().is_success())
    }

    fn post_image<T: serde::de::DeserializeOwned>(&self, endpoint: &str, image: &DynamicImage) -> Result<T> {
        let url = format!("{}/{endpoint}", self.service_url);
        let body = encode_png(image)?;

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(body)
            .send()
            .map_err(|e| VisionError::ModelUnavailable(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(VisionError::ModelUnavailable(format!(
                "inference service returned {status}: {error_text}"
            )));
        }

        let text = response.text().map_err(VisionError::model_unavailable)?;
        serde_json::from_str(&text)
            .map_err(|e| VisionError::InvalidModelOutput(format!("unparseable {endpoint} response: {e}")))
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

pub struct RemoteSegmenter {
    client: InferenceClient,
}

impl RemoteSegmenter {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }
}

impl BackgroundScorer for RemoteSegmenter {
    fn warm_up(&self) -> Result<()> {
        if self.client.check_health()? {
            Ok(())
        } else {
            Err(VisionError::ModelUnavailable(format!(
                "{} is not healthy",
                self.client.service_url()
            )))
        }
    }

    fn score(&self, image: &RgbImage) -> Result<ScoreMap> {
        let (width, height) = image.dimensions();
        let response: MaskResponse = self
            .client
            .post_image("segment", &DynamicImage::ImageRgb8(image.clone()))?;
        log::debug!("Received {}x{} mask", response.width, response.height);
        response.into_scores(width, height)
    }
}

pub struct RemoteClassifier {
    client: InferenceClient,
}

impl RemoteClassifier {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }
}

impl ImageClassifier for RemoteClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Label>> {
        let response: ClassifyResponse = self.client.post_image("classify", image)?;
        Ok(response.into_ranked())
    }
}
