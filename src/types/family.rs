//! Node type families
//!
//! Families are the coarse categories that drive default layout bands,
//! wiring heuristics, and label resolution priority.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse category of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    /// Image generators and filters
    Visual,
    /// Sampled value channels (audio, control signals, timers)
    Channel,
    /// Geometry generators and modifiers
    Geometry,
    /// Tables, text, and protocol endpoints
    Data,
    /// Containers that own child networks
    Container,
    /// Surface materials
    Material,
}

impl Family {
    /// All families, in resolution priority order.
    ///
    /// When a label matches types in several families and the caller gave
    /// no hint, the first family in this list wins. The order reflects the
    /// most common authoring intent and is fixed by design.
    pub const PRIORITY: [Family; 6] = [
        Family::Visual,
        Family::Channel,
        Family::Geometry,
        Family::Container,
        Family::Material,
        Family::Data,
    ];

    /// Canonical type-name suffix that encodes this family (e.g. `blurFx`)
    pub fn suffix(&self) -> &'static str {
        match self {
            Family::Visual => "Fx",
            Family::Channel => "Chan",
            Family::Geometry => "Geo",
            Family::Data => "Dat",
            Family::Container => "Comp",
            Family::Material => "Mat",
        }
    }

    /// Vertical band reserved for this family in auto-layout.
    ///
    /// Each family gets its own row band so mixed-family graphs stay
    /// visually separated.
    pub fn row_offset(&self) -> i32 {
        match self {
            Family::Visual => 0,
            Family::Channel => -300,
            Family::Geometry => -600,
            Family::Material => -900,
            Family::Container => -1200,
            Family::Data => -1500,
        }
    }

    /// Parse a family hint string (case-insensitive, prefixes and plurals
    /// accepted: "visual", "Vis", "geos", ...)
    pub fn parse_hint(hint: &str) -> Option<Family> {
        let mut h = hint.trim().to_lowercase();
        if h.ends_with('s') && h.len() > 1 {
            h.pop();
        }
        if h.is_empty() {
            return None;
        }
        for family in Family::PRIORITY {
            let name = family.name().to_lowercase();
            let suffix = family.suffix().to_lowercase();
            if name.starts_with(&h) || h == suffix {
                return Some(family);
            }
        }
        None
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Family::Visual => "Visual",
            Family::Channel => "Channel",
            Family::Geometry => "Geometry",
            Family::Data => "Data",
            Family::Container => "Container",
            Family::Material => "Material",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hint_variants() {
        assert_eq!(Family::parse_hint("visual"), Some(Family::Visual));
        assert_eq!(Family::parse_hint("Vis"), Some(Family::Visual));
        assert_eq!(Family::parse_hint("GEOMETRY"), Some(Family::Geometry));
        assert_eq!(Family::parse_hint("geos"), Some(Family::Geometry));
        assert_eq!(Family::parse_hint("chan"), Some(Family::Channel));
        assert_eq!(Family::parse_hint("mat"), Some(Family::Material));
        assert_eq!(Family::parse_hint(""), None);
        assert_eq!(Family::parse_hint("zzz"), None);
    }

    #[test]
    fn test_priority_covers_all_families() {
        assert_eq!(Family::PRIORITY.len(), 6);
        assert_eq!(Family::PRIORITY[0], Family::Visual);
        assert_eq!(Family::PRIORITY[5], Family::Data);
    }

    #[test]
    fn test_band_offsets_are_distinct() {
        let mut offsets: Vec<i32> = Family::PRIORITY.iter().map(|f| f.row_offset()).collect();
        offsets.sort_unstable();
        offsets.dedup();
        assert_eq!(offsets.len(), 6);
    }
}
