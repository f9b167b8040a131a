//! Error taxonomy shared by the color pipeline and the inference backends.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VisionError>;

#[derive(Debug, Error)]
pub enum VisionError {
    /// The segmentation or classification backend could not be reached or failed to initialize.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    /// The backend answered, but with something we cannot use (missing mask, wrong shape, NaNs).
    #[error("invalid model output: {0}")]
    InvalidModelOutput(String),
    /// The input bytes are not a decodable image.
    #[error("failed to decode image")]
    DecodeFailure(#[from] image::ImageError),
    /// Inference did not finish before the configured deadline.
    #[error("inference timed out after {0:?}")]
    Timeout(Duration),
    #[error("unknown clothing category: {0:?}")]
    UnknownCategory(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VisionError {
    pub fn model_unavailable(err: impl std::fmt::Display) -> Self {
        Self::ModelUnavailable(err.to_string())
    }

    pub fn invalid_output(err: impl std::fmt::Display) -> Self {
        Self::InvalidModelOutput(err.to_string())
    }

    /// Whether this error came from the external model rather than from the input.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable(_) | Self::InvalidModelOutput(_) | Self::Timeout(_)
        )
    }
}
