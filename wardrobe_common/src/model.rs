//! Value types produced by the color and attribute pipelines.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::VisionError;

/// 8-bit RGB triple, alpha is never carried in named colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parses `#rrggbb` or `rrggbb`, any case.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub(crate) fn distance_squared(self, other: Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// One ranked color of a detection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorInfo {
    pub hex: String,
    pub name: String,
    pub rgb: Rgb,
    /// Share of sampled, non-transparent pixels, 0-100.
    pub percentage: u8,
}

impl ColorInfo {
    pub fn new(rgb: Rgb, percentage: u8) -> Self {
        Self {
            hex: rgb.to_hex(),
            name: crate::color_names::color_name(rgb).to_string(),
            rgb,
            percentage,
        }
    }

    /// Neutral color used when nothing could be sampled.
    pub fn fallback() -> Self {
        Self {
            hex: "#000000".to_string(),
            name: "Black".to_string(),
            rgb: Rgb::BLACK,
            percentage: 0,
        }
    }
}

/// Output of [`crate::detector::ColorDetector::process_image`].
#[derive(Debug, Clone)]
pub struct ColorDetectionResult {
    pub original_image: DynamicImage,
    /// Background removed, possibly downscaled.
    pub processed_image: DynamicImage,
    /// Descending by percentage, at most five entries.
    pub dominant_colors: Vec<ColorInfo>,
    pub primary_color: ColorInfo,
}

impl ColorDetectionResult {
    pub fn new(
        original_image: DynamicImage,
        processed_image: DynamicImage,
        dominant_colors: Vec<ColorInfo>,
    ) -> Self {
        let primary_color = dominant_colors
            .first()
            .cloned()
            .unwrap_or_else(ColorInfo::fallback);
        Self {
            original_image,
            processed_image,
            dominant_colors,
            primary_color,
        }
    }

    pub fn summary(&self) -> ColorSummary {
        ColorSummary {
            width: self.processed_image.width(),
            height: self.processed_image.height(),
            dominant_colors: self.dominant_colors.clone(),
            primary_color: self.primary_color.clone(),
        }
    }
}

/// Serializable projection of a [`ColorDetectionResult`] without pixel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSummary {
    pub width: u32,
    pub height: u32,
    pub dominant_colors: Vec<ColorInfo>,
    pub primary_color: ColorInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    Solid,
    Striped,
    Floral,
    Geometric,
    Plaid,
    Polkadot,
    Animal,
    Abstract,
}

impl Pattern {
    pub fn as_str(self) -> &'static str {
        match self {
            Pattern::Solid => "solid",
            Pattern::Striped => "striped",
            Pattern::Floral => "floral",
            Pattern::Geometric => "geometric",
            Pattern::Plaid => "plaid",
            Pattern::Polkadot => "polkadot",
            Pattern::Animal => "animal",
            Pattern::Abstract => "abstract",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered by declaration, which is also the order tags are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleTag {
    Casual,
    Formal,
    Sporty,
    Bohemian,
    Vintage,
    Modern,
}

impl StyleTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StyleTag::Casual => "casual",
            StyleTag::Formal => "formal",
            StyleTag::Sporty => "sporty",
            StyleTag::Bohemian => "bohemian",
            StyleTag::Vintage => "vintage",
            StyleTag::Modern => "modern",
        }
    }
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDetectionResult {
    pub pattern: Pattern,
    /// Score of the label that triggered the match, 0.5 when defaulted.
    pub confidence: f32,
    /// Never empty.
    pub style_tags: BTreeSet<StyleTag>,
}

impl Default for PatternDetectionResult {
    fn default() -> Self {
        Self {
            pattern: Pattern::Solid,
            confidence: 0.5,
            style_tags: BTreeSet::from([StyleTag::Casual]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleeve_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pant_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neckline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<String>,
}

impl DetailedAttributes {
    pub fn is_empty(&self) -> bool {
        self.sleeve_type.is_none()
            && self.pant_style.is_none()
            && self.neckline.is_none()
            && self.fit.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Tops,
    Bottoms,
    Dresses,
    Outerwear,
    Shoes,
    Accessories,
    Underwear,
    Sleepwear,
    Activewear,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Tops,
        Category::Bottoms,
        Category::Dresses,
        Category::Outerwear,
        Category::Shoes,
        Category::Accessories,
        Category::Underwear,
        Category::Sleepwear,
        Category::Activewear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Tops => "Tops",
            Category::Bottoms => "Bottoms",
            Category::Dresses => "Dresses",
            Category::Outerwear => "Outerwear",
            Category::Shoes => "Shoes",
            Category::Accessories => "Accessories",
            Category::Underwear => "Underwear",
            Category::Sleepwear => "Sleepwear",
            Category::Activewear => "Activewear",
        }
    }

    pub fn has_sleeves(self) -> bool {
        matches!(self, Category::Tops | Category::Dresses | Category::Outerwear)
    }

    pub fn has_pant_style(self) -> bool {
        self == Category::Bottoms
    }

    pub fn has_neckline(self) -> bool {
        matches!(self, Category::Tops | Category::Dresses)
    }

    pub fn has_fit(self) -> bool {
        matches!(
            self,
            Category::Tops | Category::Bottoms | Category::Dresses | Category::Outerwear
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VisionError::UnknownCategory(s.to_string()))
    }
}

/// One entry of a classifier's ranked output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub label: String,
    pub score: f32,
}

impl Label {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Raw image resource as handed over by the caller.
#[derive(Debug, Clone)]
pub struct ImageSource {
    pub bytes: Vec<u8>,
    /// Declared MIME type, e.g. `image/jpeg`. Sniffed from the bytes when absent.
    pub mime: Option<String>,
}

impl ImageSource {
    pub fn new(bytes: Vec<u8>, mime: Option<String>) -> Self {
        Self { bytes, mime }
    }

    /// Decodes using the declared MIME type if it is one we know, else by content sniffing.
    pub fn decode(&self) -> crate::error::Result<DynamicImage> {
        let format = self
            .mime
            .as_deref()
            .and_then(image::ImageFormat::from_mime_type);
        let image = match format {
            Some(format) => image::load_from_memory_with_format(&self.bytes, format)?,
            None => image::load_from_memory(&self.bytes)?,
        };
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_is_lowercase() {
        assert_eq!(Rgb::new(0x1E, 0x3A, 0x8A).to_hex(), "#1e3a8a");
        assert_eq!(Rgb::new(255, 255, 255).to_hex(), "#ffffff");
    }

    #[test]
    fn test_hex_parse() {
        assert_eq!(Rgb::from_hex("#1E3A8A"), Some(Rgb::new(30, 58, 138)));
        assert_eq!(Rgb::from_hex("00ff00"), Some(Rgb::new(0, 255, 0)));
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb::from_hex("#gg0000"), None);
    }

    #[test]
    fn test_primary_falls_back_to_black() {
        let img = DynamicImage::new_rgba8(4, 4);
        let result = ColorDetectionResult::new(img.clone(), img, Vec::new());
        assert_eq!(result.primary_color, ColorInfo::fallback());
        assert_eq!(result.primary_color.hex, "#000000");
        assert_eq!(result.primary_color.percentage, 0);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("tops".parse::<Category>().unwrap(), Category::Tops);
        assert_eq!(" Outerwear ".parse::<Category>().unwrap(), Category::Outerwear);
        assert!(matches!(
            "Hats".parse::<Category>(),
            Err(VisionError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_category_gates() {
        assert!(Category::Tops.has_sleeves() && Category::Tops.has_neckline());
        assert!(Category::Bottoms.has_pant_style() && !Category::Bottoms.has_sleeves());
        assert!(Category::Outerwear.has_fit() && !Category::Outerwear.has_neckline());
        for c in [Category::Shoes, Category::Accessories, Category::Sleepwear] {
            assert!(!c.has_sleeves() && !c.has_pant_style() && !c.has_neckline() && !c.has_fit());
        }
    }

    #[test]
    fn test_pattern_default_serializes_lowercase() {
        let json = serde_json::to_value(PatternDetectionResult::default()).unwrap();
        assert_eq!(json["pattern"], "solid");
        assert_eq!(json["style_tags"], serde_json::json!(["casual"]));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let source = ImageSource::new(vec![1, 2, 3, 4], Some("image/png".into()));
        assert!(matches!(source.decode(), Err(VisionError::DecodeFailure(_))));
    }
}
