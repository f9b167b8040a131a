//! Turns a classifier's free-text labels into clothing tags by substring matching
//! against declarative keyword tables.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::model::{Category, DetailedAttributes, Label, Pattern, PatternDetectionResult, StyleTag};

/// Only the highest ranked labels are considered for pattern and style.
pub const TOP_LABELS: usize = 5;
/// Reported for a gated attribute when no rule matches.
pub const DEFAULT_ATTRIBUTE: &str = "Regular";

/// Maps a tag to the substrings that trigger it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule<T> {
    pub tag: T,
    #[serde(deserialize_with = "lowercase_keywords")]
    pub keywords: Vec<String>,
}

fn lowercase_keywords<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let keywords = Vec::<String>::deserialize(deserializer)?;
    Ok(keywords.into_iter().map(|k| k.to_lowercase()).collect())
}

impl<T> KeywordRule<T> {
    pub fn new(tag: T, keywords: &[&str]) -> Self {
        Self {
            tag,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// `text` must already be lowercase.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

/// All lookup tables. Rule order is significant for attribute rules: the first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTables {
    pub patterns: Vec<KeywordRule<Pattern>>,
    pub styles: Vec<KeywordRule<StyleTag>>,
    pub sleeve_types: Vec<KeywordRule<String>>,
    pub pant_styles: Vec<KeywordRule<String>>,
    pub necklines: Vec<KeywordRule<String>>,
    pub fits: Vec<KeywordRule<String>>,
}

impl KeywordTables {
    /// Reads replacement tables from JSON; sections left out keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let tables = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(tables)
    }
}

fn rules(table: &[(&str, &[&str])]) -> Vec<KeywordRule<String>> {
    table
        .iter()
        .map(|(tag, keywords)| KeywordRule::new(tag.to_string(), keywords))
        .collect()
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            patterns: vec![
                KeywordRule::new(Pattern::Striped, &["stripe", "striped", "lines", "pinstripe", "breton"]),
                KeywordRule::new(Pattern::Floral, &["floral", "flower", "rose", "daisy", "botanical", "petal"]),
                KeywordRule::new(Pattern::Geometric, &["geometric", "triangle", "hexagon", "chevron", "zigzag", "argyle"]),
                KeywordRule::new(Pattern::Plaid, &["plaid", "tartan", "gingham", "checkered", "flannel", "houndstooth"]),
                KeywordRule::new(Pattern::Polkadot, &["polka", "dotted", "spotted", "dots"]),
                KeywordRule::new(Pattern::Animal, &["leopard", "zebra", "tiger", "cheetah", "snakeskin", "animal print"]),
                KeywordRule::new(Pattern::Abstract, &["abstract", "tie-dye", "tie dye", "splatter", "psychedelic", "paisley"]),
            ],
            styles: vec![
                KeywordRule::new(StyleTag::Casual, &["t-shirt", "tee shirt", "jean", "denim", "sweatshirt", "hoodie", "sneaker"]),
                KeywordRule::new(StyleTag::Formal, &["suit", "necktie", "bow tie", "blazer", "gown", "tuxedo", "dress shirt", "oxford"]),
                KeywordRule::new(StyleTag::Sporty, &["sport", "jersey", "athletic", "running", "tracksuit", "gym", "swimsuit"]),
                KeywordRule::new(StyleTag::Bohemian, &["boho", "poncho", "fringe", "kimono", "peasant", "crochet"]),
                KeywordRule::new(StyleTag::Vintage, &["vintage", "retro", "tweed", "cardigan", "corduroy"]),
                KeywordRule::new(StyleTag::Modern, &["modern", "minimal", "sleek", "trench coat", "techwear"]),
            ],
            sleeve_types: rules(&[
                ("Sleeveless", &["sleeveless", "tank", "camisole", "strapless", "halter", "sweater vest", "vest top"]),
                ("Short Sleeve", &["short sleeve", "short-sleeve", "t-shirt", "tee shirt", "polo"]),
                ("3/4 Sleeve", &["3/4", "three quarter", "three-quarter"]),
                ("Long Sleeve", &["long sleeve", "long-sleeve", "sweater", "cardigan", "sweatshirt", "hoodie", "jacket", "coat", "blazer"]),
            ]),
            pant_styles: rules(&[
                ("Skinny", &["skinny", "legging", "jegging"]),
                ("Wide Leg", &["wide leg", "wide-leg", "palazzo", "culotte"]),
                ("Bootcut", &["bootcut", "boot cut", "flare"]),
                ("Cargo", &["cargo"]),
                ("Jogger", &["jogger", "sweatpant", "track pant"]),
                ("Straight", &["straight"]),
                ("Shorts", &["shorts", "bermuda"]),
            ]),
            necklines: rules(&[
                ("V-Neck", &["v-neck", "v neck", "vneck"]),
                ("Turtleneck", &["turtleneck", "turtle neck", "polo neck", "mock neck"]),
                ("Off-Shoulder", &["off-shoulder", "off shoulder", "strapless", "bardot"]),
                ("Collared", &["collar", "polo", "dress shirt", "button-down", "button down"]),
                ("Hooded", &["hood"]),
                ("Scoop Neck", &["scoop"]),
                ("Crew Neck", &["crew", "t-shirt", "tee shirt", "sweatshirt"]),
            ]),
            fits: rules(&[
                ("Slim", &["slim", "skinny", "fitted", "bodycon"]),
                ("Oversized", &["oversized", "oversize", "baggy", "poncho"]),
                ("Relaxed", &["relaxed", "loose", "boyfriend"]),
                ("Tailored", &["tailored", "suit", "blazer"]),
            ]),
        }
    }
}

/// Strategy that turns ranked classifier labels into tags.
pub trait LabelInterpreter: Send + Sync {
    fn pattern(&self, labels: &[Label]) -> PatternDetectionResult;

    fn attributes(
        &self,
        labels: &[Label],
        category: Category,
        subcategory: Option<&str>,
    ) -> DetailedAttributes;
}

#[derive(Debug, Clone, Default)]
pub struct KeywordInterpreter {
    tables: KeywordTables,
}

impl KeywordInterpreter {
    pub fn new(tables: KeywordTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &KeywordTables {
        &self.tables
    }
}

fn first_match(rules: &[KeywordRule<String>], haystack: &[String]) -> String {
    rules
        .iter()
        .find(|rule| haystack.iter().any(|text| rule.matches(text)))
        .map(|rule| rule.tag.clone())
        .unwrap_or_else(|| DEFAULT_ATTRIBUTE.to_string())
}

impl LabelInterpreter for KeywordInterpreter {
    fn pattern(&self, labels: &[Label]) -> PatternDetectionResult {
        let mut best: Option<(Pattern, f32)> = None;
        let mut style_tags = BTreeSet::new();

        for label in labels.iter().take(TOP_LABELS) {
            let text = label.label.to_lowercase();
            for rule in &self.tables.patterns {
                if rule.matches(&text) && best.is_none_or(|(_, score)| label.score > score) {
                    best = Some((rule.tag, label.score));
                }
            }
            style_tags.extend(
                self.tables
                    .styles
                    .iter()
                    .filter(|rule| rule.matches(&text))
                    .map(|rule| rule.tag),
            );
        }

        if style_tags.is_empty() {
            style_tags.insert(StyleTag::Casual);
        }
        let (pattern, confidence) = best.unwrap_or((Pattern::Solid, 0.5));
        PatternDetectionResult {
            pattern,
            confidence,
            style_tags,
        }
    }

    fn attributes(
        &self,
        labels: &[Label],
        category: Category,
        subcategory: Option<&str>,
    ) -> DetailedAttributes {
        let mut haystack: Vec<String> = labels.iter().map(|l| l.label.to_lowercase()).collect();
        if let Some(sub) = subcategory.filter(|s| !s.trim().is_empty()) {
            haystack.push(sub.to_lowercase());
        }

        let tables = &self.tables;
        DetailedAttributes {
            sleeve_type: category
                .has_sleeves()
                .then(|| first_match(&tables.sleeve_types, &haystack)),
            pant_style: category
                .has_pant_style()
                .then(|| first_match(&tables.pant_styles, &haystack)),
            neckline: category
                .has_neckline()
                .then(|| first_match(&tables.necklines, &haystack)),
            fit: category
                .has_fit()
                .then(|| first_match(&tables.fits, &haystack)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, f32)]) -> Vec<Label> {
        pairs.iter().map(|&(l, s)| Label::new(l, s)).collect()
    }

    #[test]
    fn test_no_keywords_defaults() {
        let result = KeywordInterpreter::default().pattern(&labels(&[
            ("mailbox", 0.4),
            ("umbrella", 0.2),
        ]));
        assert_eq!(result, PatternDetectionResult::default());
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.style_tags, BTreeSet::from([StyleTag::Casual]));
    }

    #[test]
    fn test_highest_scoring_pattern_wins() {
        let result = KeywordInterpreter::default().pattern(&labels(&[
            ("jersey, T-shirt, tee shirt", 0.6),
            ("floral print dress", 0.3),
            ("tartan", 0.35),
        ]));
        assert_eq!(result.pattern, Pattern::Plaid);
        assert_eq!(result.confidence, 0.35);
    }

    #[test]
    fn test_only_top_five_labels_considered() {
        let result = KeywordInterpreter::default().pattern(&labels(&[
            ("a", 0.5),
            ("b", 0.4),
            ("c", 0.3),
            ("d", 0.2),
            ("e", 0.1),
            ("zebra", 0.05),
        ]));
        assert_eq!(result.pattern, Pattern::Solid);
    }

    #[test]
    fn test_all_matching_styles_collected() {
        let result = KeywordInterpreter::default().pattern(&labels(&[
            ("suit", 0.5),
            ("jersey, T-shirt, tee shirt", 0.3),
            ("cardigan", 0.1),
        ]));
        assert_eq!(
            result.style_tags,
            BTreeSet::from([StyleTag::Casual, StyleTag::Formal, StyleTag::Sporty, StyleTag::Vintage])
        );
    }

    #[test]
    fn test_attributes_gated_by_category() {
        let interpreter = KeywordInterpreter::default();
        let input = labels(&[("cardigan", 0.9), ("jean", 0.4)]);
        let attrs = interpreter.attributes(&input, Category::Accessories, Some("Scarf"));
        assert!(attrs.is_empty());

        let attrs = interpreter.attributes(&input, Category::Outerwear, None);
        assert_eq!(attrs.sleeve_type.as_deref(), Some("Long Sleeve"));
        assert_eq!(attrs.fit.as_deref(), Some(DEFAULT_ATTRIBUTE));
        assert_eq!(attrs.neckline, None);
        assert_eq!(attrs.pant_style, None);
    }

    #[test]
    fn test_subcategory_feeds_matching() {
        let attrs = KeywordInterpreter::default().attributes(
            &labels(&[("jean", 0.8)]),
            Category::Bottoms,
            Some("Skinny Jeans"),
        );
        assert_eq!(attrs.pant_style.as_deref(), Some("Skinny"));
        assert_eq!(attrs.fit.as_deref(), Some("Slim"));
    }

    #[test]
    fn test_first_rule_wins() {
        // matches both Sleeveless ("tank") and Short Sleeve ("tee shirt")
        let attrs = KeywordInterpreter::default().attributes(
            &labels(&[("tank top tee shirt", 0.7)]),
            Category::Tops,
            None,
        );
        assert_eq!(attrs.sleeve_type.as_deref(), Some("Sleeveless"));
        assert_eq!(attrs.neckline.as_deref(), Some("Crew Neck"));
    }

    #[test]
    fn test_tables_from_json_override_sections() {
        let json = r#"{ "patterns": [ { "tag": "animal", "keywords": ["spots"] } ] }"#;
        let tables: KeywordTables = serde_json::from_str(json).unwrap();
        assert_eq!(tables.patterns.len(), 1);
        assert_eq!(tables.styles, KeywordTables::default().styles);

        let result = KeywordInterpreter::new(tables).pattern(&labels(&[("dalmatian spots", 0.8)]));
        assert_eq!(result.pattern, Pattern::Animal);
    }

    #[test]
    fn test_json_keywords_are_case_insensitive() {
        let json = r#"{ "patterns": [ { "tag": "striped", "keywords": ["Stripe"] } ],
                        "sleeve_types": [ { "tag": "Cap Sleeve", "keywords": ["CAP SLEEVE"] } ] }"#;
        let tables: KeywordTables = serde_json::from_str(json).unwrap();
        assert_eq!(tables.patterns[0].keywords, vec!["stripe"]);

        let interpreter = KeywordInterpreter::new(tables);
        let result = interpreter.pattern(&labels(&[("Stripe shirt", 0.9)]));
        assert_eq!(result.pattern, Pattern::Striped);
        assert_eq!(result.confidence, 0.9);

        let attrs = interpreter.attributes(&labels(&[("blouse", 0.5)]), Category::Tops, Some("Cap Sleeve Top"));
        assert_eq!(attrs.sleeve_type.as_deref(), Some("Cap Sleeve"));
    }

    #[test]
    fn test_keywords_do_not_fire_inside_other_words() {
        let interpreter = KeywordInterpreter::default();
        let result = interpreter.pattern(&labels(&[("tie-dye t-shirt", 0.9)]));
        assert_eq!(result.pattern, Pattern::Abstract);
        assert_eq!(result.style_tags, BTreeSet::from([StyleTag::Casual]));

        let result = interpreter.pattern(&labels(&[("settee", 0.6), ("vestment", 0.3)]));
        assert_eq!(result, PatternDetectionResult::default());

        let attrs = interpreter.attributes(&labels(&[("vestment", 0.6), ("settee", 0.3)]), Category::Tops, None);
        assert_eq!(attrs.sleeve_type.as_deref(), Some(DEFAULT_ATTRIBUTE));
        assert_eq!(attrs.neckline.as_deref(), Some(DEFAULT_ATTRIBUTE));

        let result = interpreter.pattern(&labels(&[("bow tie", 0.4)]));
        assert!(result.style_tags.contains(&StyleTag::Formal));
    }
}
