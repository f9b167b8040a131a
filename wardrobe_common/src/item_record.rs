//! Flattening detection results into the string fields stored on a clothing item.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{Category, ColorInfo, ColorSummary, DetailedAttributes, PatternDetectionResult};

/// Persistable form of everything the pipelines found for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFields {
    pub color: String,
    pub hex_color: String,
    pub pattern: String,
    pub pattern_confidence: f32,
    pub style_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleeve_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pant_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neckline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<String>,
}

impl ItemFields {
    pub fn new(
        primary_color: &ColorInfo,
        pattern: &PatternDetectionResult,
        attributes: &DetailedAttributes,
        category: Option<Category>,
        subcategory: Option<&str>,
    ) -> Self {
        Self {
            color: primary_color.name.clone(),
            hex_color: primary_color.hex.clone(),
            pattern: pattern.pattern.to_string(),
            pattern_confidence: pattern.confidence,
            style_tags: pattern.style_tags.iter().map(|t| t.to_string()).collect(),
            category: category.map(|c| c.to_string()),
            subcategory: subcategory.map(str::to_string),
            sleeve_type: attributes.sleeve_type.clone(),
            pant_style: attributes.pant_style.clone(),
            neckline: attributes.neckline.clone(),
            fit: attributes.fit.clone(),
        }
    }
}

/// Everything written next to a processed image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    pub input_file: PathBuf,
    /// Background-removed PNG, absent when color detection fell back to the original.
    pub processed_file: Option<PathBuf>,
    pub colors: ColorSummary,
    pub fields: ItemFields,
}

impl ItemReport {
    pub fn export_json(&self, path: &Path) -> Result<(), std::io::Error> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn print_summary(&self) {
        println!("\n--- {} ---", self.input_file.display());
        for color in &self.colors.dominant_colors {
            println!("  {:<14} {} {:>3}%", color.name, color.hex, color.percentage);
        }
        if self.colors.dominant_colors.is_empty() {
            println!("  (no colors sampled, using {})", self.fields.color);
        }

        let mut attrs = vec![
            format!("pattern={}({:.2})", self.fields.pattern, self.fields.pattern_confidence),
            format!("style={}", self.fields.style_tags.join("/")),
        ];
        let optional = [
            ("sleeve", &self.fields.sleeve_type),
            ("pants", &self.fields.pant_style),
            ("neckline", &self.fields.neckline),
            ("fit", &self.fields.fit),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                attrs.push(format!("{key}={value}"));
            }
        }
        println!("  {}", attrs.join(", "));
        println!("----------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Pattern, Rgb, StyleTag};
    use std::collections::BTreeSet;

    #[test]
    fn test_flatten_fields() {
        let pattern = PatternDetectionResult {
            pattern: Pattern::Striped,
            confidence: 0.42,
            style_tags: BTreeSet::from([StyleTag::Sporty, StyleTag::Casual]),
        };
        let attributes = DetailedAttributes {
            sleeve_type: Some("Short Sleeve".into()),
            fit: Some("Regular".into()),
            ..Default::default()
        };
        let fields = ItemFields::new(
            &ColorInfo::new(Rgb::new(0, 0, 128), 80),
            &pattern,
            &attributes,
            Some(Category::Tops),
            Some("T-Shirt"),
        );
        assert_eq!(fields.color, "Navy Blue");
        assert_eq!(fields.hex_color, "#000080");
        assert_eq!(fields.pattern, "striped");
        assert_eq!(fields.style_tags, vec!["casual", "sporty"]);
        assert_eq!(fields.category.as_deref(), Some("Tops"));

        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["sleeve_type"], "Short Sleeve");
        assert!(json.get("pant_style").is_none());
    }
}
