//! Clothing photo analysis: background removal, dominant colors, and keyword based
//! pattern/attribute tagging on top of pluggable inference backends.

pub mod classify;
pub mod color_extractor;
pub mod color_names;
pub mod config;
pub mod detector;
pub mod error;
pub mod interpret;
pub mod item_record;
pub mod model;
pub mod progress;
pub mod segmentation;

pub use error::{Result, VisionError};
