//! ONNX Runtime backends for the wardrobe color and attribute pipelines.

pub mod classifier;
pub mod preprocess;
pub mod segmenter;
pub mod session;

pub use classifier::OrtImageClassifier;
pub use segmenter::{MaskSemantics, OrtBackgroundScorer};
