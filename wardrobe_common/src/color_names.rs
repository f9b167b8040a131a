//! Nearest-match naming against a fixed clothing palette.

use crate::model::Rgb;

/// Reference palette. Order matters: equidistant matches resolve to the earlier entry.
pub const PALETTE: &[(&str, Rgb)] = &[
    ("Black", Rgb::new(0, 0, 0)),
    ("White", Rgb::new(255, 255, 255)),
    ("Gray", Rgb::new(128, 128, 128)),
    ("Light Gray", Rgb::new(211, 211, 211)),
    ("Charcoal", Rgb::new(64, 64, 64)),
    ("Red", Rgb::new(255, 0, 0)),
    ("Burgundy", Rgb::new(128, 0, 32)),
    ("Maroon", Rgb::new(128, 0, 0)),
    ("Pink", Rgb::new(255, 192, 203)),
    ("Hot Pink", Rgb::new(255, 105, 180)),
    ("Coral", Rgb::new(255, 127, 80)),
    ("Orange", Rgb::new(255, 165, 0)),
    ("Yellow", Rgb::new(255, 255, 0)),
    ("Mustard", Rgb::new(225, 173, 1)),
    ("Gold", Rgb::new(255, 215, 0)),
    ("Beige", Rgb::new(245, 245, 220)),
    ("Cream", Rgb::new(255, 253, 208)),
    ("Tan", Rgb::new(210, 180, 140)),
    ("Camel", Rgb::new(193, 154, 107)),
    ("Khaki", Rgb::new(195, 176, 145)),
    ("Brown", Rgb::new(139, 69, 19)),
    ("Green", Rgb::new(0, 128, 0)),
    ("Olive", Rgb::new(128, 128, 0)),
    ("Sage Green", Rgb::new(156, 175, 136)),
    ("Forest Green", Rgb::new(34, 139, 34)),
    ("Mint", Rgb::new(152, 255, 152)),
    ("Navy Blue", Rgb::new(0, 0, 128)),
    ("Teal", Rgb::new(0, 128, 128)),
    ("Turquoise", Rgb::new(64, 224, 208)),
    ("Blue", Rgb::new(0, 0, 255)),
    ("Royal Blue", Rgb::new(65, 105, 225)),
    ("Sky Blue", Rgb::new(135, 206, 235)),
    ("Purple", Rgb::new(128, 0, 128)),
    ("Lavender", Rgb::new(230, 230, 250)),
    ("Magenta", Rgb::new(255, 0, 255)),
];

/// Name of the palette entry closest to `rgb` by Euclidean distance.
pub fn color_name(rgb: Rgb) -> &'static str {
    let mut best = PALETTE[0];
    let mut best_distance = rgb.distance_squared(best.1);
    for &entry in &PALETTE[1..] {
        let distance = rgb.distance_squared(entry.1);
        // strict: the first minimum wins
        if distance < best_distance {
            best = entry;
            best_distance = distance;
        }
    }
    best.0
}

/// Reverse lookup, case-insensitive.
pub fn palette_rgb(name: &str) -> Option<Rgb> {
    PALETTE
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, rgb)| rgb)
}
