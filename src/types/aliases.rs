//! Label normalization and the global alias table
//!
//! The alias table maps normalized human labels to canonical base tokens
//! ("webcam" -> "videoin"). It is immutable, built once, and deliberately
//! small: type-specific labels belong on the descriptor itself.

use super::family::Family;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Lowercased family suffix tokens recognized during normalization
const FAMILY_SUFFIXES: [(&str, Family); 6] = [
    ("fx", Family::Visual),
    ("chan", Family::Channel),
    ("geo", Family::Geometry),
    ("dat", Family::Data),
    ("comp", Family::Container),
    ("mat", Family::Material),
];

/// Normalize a human label into a base token: lowercase, strip whitespace
/// and separators, strip one trailing family suffix if the remainder is
/// non-empty. A stripped suffix is returned as an implied family hint.
pub fn normalize_with_family(label: &str) -> (String, Option<Family>) {
    let mut token: String = label
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect();
    for (suffix, family) in FAMILY_SUFFIXES {
        if token.len() > suffix.len() && token.ends_with(suffix) {
            token.truncate(token.len() - suffix.len());
            return (token, Some(family));
        }
    }
    (token, None)
}

/// Normalize a human label, discarding any implied family
pub fn normalize(label: &str) -> String {
    normalize_with_family(label).0
}

/// Normalized label -> canonical base token
pub static SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Visual sources
        ("webcam", "videoin"),
        ("camin", "videoin"),
        ("camerain", "videoin"),
        ("movie", "moviein"),
        ("video", "moviein"),
        ("videofile", "moviein"),
        ("image", "moviein"),
        ("picture", "moviein"),
        ("img", "moviein"),
        // Visual filters
        ("mosaic", "pixelate"),
        ("pixellate", "pixelate"),
        ("mix", "composite"),
        ("blend", "composite"),
        ("lut", "lookup"),
        ("scale", "transform"),
        // Channel
        ("mic", "audioin"),
        ("microphone", "audioin"),
        ("mouse", "mousein"),
        // Geometry
        ("xform", "transform"),
        ("cube", "box"),
        ("ball", "sphere"),
        // Container
        ("geo", "geometry"),
        ("geom", "geometry"),
        ("cam", "camera"),
        ("panel", "container"),
        ("ui", "container"),
        // Material
        ("material", "phong"),
        ("principled", "pbr"),
        // Data
        ("txt", "text"),
    ])
});
