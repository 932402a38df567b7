//! Per-type preferred-source tables
//!
//! For filter types with a strong conventional upstream, an ordered list
//! of source types that make sense feeding them. Earlier entries rank
//! higher in scored wiring and in automatic input satisfaction.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Target type name -> source type names, best first
pub static PREFERRED_SOURCES: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert(
            "compositeFx",
            &["movieInFx", "videoInFx", "noiseFx", "renderFx", "constantFx"][..],
        );
        m.insert("blurFx", &["movieInFx", "videoInFx", "noiseFx", "renderFx"][..]);
        m.insert("levelFx", &["movieInFx", "videoInFx", "compositeFx", "noiseFx"][..]);
        m.insert("displaceFx", &["movieInFx", "videoInFx", "noiseFx"][..]);
        m.insert("lookupFx", &["movieInFx", "videoInFx", "noiseFx"][..]);
        m.insert("feedbackFx", &["compositeFx", "levelFx", "blurFx"][..]);
        m.insert("outFx", &["compositeFx", "levelFx", "blurFx", "nullFx"][..]);
        m.insert("mathChan", &["audioInChan", "lfoChan", "noiseChan", "constantChan"][..]);
        m.insert("filterChan", &["audioInChan", "noiseChan", "lfoChan"][..]);
        m.insert("lagChan", &["mouseInChan", "noiseChan", "lfoChan"][..]);
        m.insert("outChan", &["mathChan", "filterChan", "lagChan", "nullChan"][..]);
        m.insert("transformGeo", &["boxGeo", "sphereGeo", "gridGeo", "torusGeo"][..]);
        m.insert("subdivideGeo", &["boxGeo", "sphereGeo", "torusGeo"][..]);
        m.insert("extrudeGeo", &["gridGeo", "lineGeo", "boxGeo"][..]);
        m.insert("booleanGeo", &["boxGeo", "sphereGeo", "tubeGeo"][..]);
        m.insert("outGeo", &["transformGeo", "mergeGeo", "nullGeo"][..]);
        m
    });

/// Rank of `source_type` in the table for `target_type` (0 is best),
/// with the table length so callers can weight the rank in one lookup
pub fn preference_rank(target_type: &str, source_type: &str) -> Option<(usize, usize)> {
    let sources = PREFERRED_SOURCES.get(target_type)?;
    sources
        .iter()
        .position(|s| *s == source_type)
        .map(|rank| (rank, sources.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    #[test]
    fn test_tables_name_real_types() {
        let reg = TypeRegistry::builtin();
        for (target, sources) in PREFERRED_SOURCES.iter() {
            assert!(reg.get(target).is_some(), "unknown target {target}");
            for source in *sources {
                assert!(reg.get(source).is_some(), "unknown source {source}");
            }
        }
    }

    #[test]
    fn test_preference_rank() {
        assert_eq!(preference_rank("compositeFx", "movieInFx"), Some((0, 5)));
        assert_eq!(preference_rank("compositeFx", "constantFx"), Some((4, 5)));
        assert_eq!(preference_rank("compositeFx", "boxGeo"), None);
        assert_eq!(preference_rank("nullFx", "movieInFx"), None);
    }
}
