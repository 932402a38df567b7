//! Type registry and label resolution
//!
//! The registry indexes every known type descriptor by canonical name and
//! by normalized base token. It is built once at startup and read-only
//! afterwards, so concurrent readers need no synchronization.

use super::aliases::{normalize, normalize_with_family, SYNONYMS};
use super::descriptor::TypeDescriptor;
use super::family::Family;
use crate::error::EngineError;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Read-only index of all registered node types
pub struct TypeRegistry {
    by_name: HashMap<String, Arc<TypeDescriptor>>,
    by_base: HashMap<String, Vec<Arc<TypeDescriptor>>>,
    by_family: BTreeMap<Family, Vec<String>>,
}

impl TypeRegistry {
    /// Build the registry from a list of descriptors.
    ///
    /// Each descriptor is indexed under its normalized base token and under
    /// every one of its aliases; candidate lists stay in registration order.
    pub fn new(descriptors: Vec<TypeDescriptor>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_base: HashMap<String, Vec<Arc<TypeDescriptor>>> = HashMap::new();
        let mut by_family: BTreeMap<Family, Vec<String>> = BTreeMap::new();

        for desc in descriptors {
            let desc = Arc::new(desc);
            by_family
                .entry(desc.family)
                .or_default()
                .push(desc.name.clone());
            by_base
                .entry(normalize(&desc.name))
                .or_default()
                .push(desc.clone());
            for alias in &desc.aliases {
                let token = normalize(alias);
                let bucket = by_base.entry(token).or_default();
                if !bucket.iter().any(|d| d.name == desc.name) {
                    bucket.push(desc.clone());
                }
            }
            by_name.insert(desc.name.clone(), desc);
        }
        for names in by_family.values_mut() {
            names.sort_unstable();
        }
        debug!("type registry built: {} types", by_name.len());

        Self {
            by_name,
            by_base,
            by_family,
        }
    }

    /// Registry built from the built-in catalog
    pub fn builtin() -> Self {
        Self::new(super::catalog::builtin_types())
    }

    /// Look up a descriptor by exact canonical name
    pub fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.by_name.get(name).cloned()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True when no types are registered
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Resolve a human label (plus optional family hint) to a descriptor.
    ///
    /// Pure function over the pre-built index: identical inputs always
    /// return the identical descriptor.
    pub fn resolve(
        &self,
        label: &str,
        hint: Option<Family>,
    ) -> Result<Arc<TypeDescriptor>, EngineError> {
        if label.trim().is_empty() {
            return Err(EngineError::UnknownType(label.to_string()));
        }

        // Normalize, then substitute a known synonym for the base token.
        // A family suffix in the label acts as a hint unless the caller
        // supplied an explicit one.
        let (mut base, implied) = normalize_with_family(label);
        if let Some(sub) = SYNONYMS.get(base.as_str()) {
            base = (*sub).to_string();
        }
        let hint = hint.or(implied);

        // Fast path: the literal label is already a canonical type name
        if let Some(desc) = self.by_name.get(label) {
            return Ok(desc.clone());
        }

        let candidates = self.by_base.get(&base).cloned().unwrap_or_default();

        // Family hint narrows the candidate list
        if let Some(family) = hint {
            let narrowed: Vec<_> = candidates
                .iter()
                .filter(|d| d.family == family)
                .cloned()
                .collect();
            if narrowed.len() == 1 {
                return Ok(narrowed[0].clone());
            }
        }

        // A unique candidate wins regardless of hint
        if candidates.len() == 1 {
            return Ok(candidates[0].clone());
        }

        // Several candidates, no decisive hint: fixed family priority order
        if !candidates.is_empty() {
            for family in Family::PRIORITY {
                if let Some(desc) = candidates.iter().find(|d| d.family == family) {
                    return Ok(desc.clone());
                }
            }
        }

        // Last resort: substring scan across all registered names
        for family in Family::PRIORITY {
            if let Some(required) = hint {
                if family != required {
                    continue;
                }
            }
            if let Some(names) = self.by_family.get(&family) {
                for name in names {
                    if name.to_lowercase().contains(&base) {
                        debug!("resolved '{}' via substring scan -> {}", label, name);
                        return Ok(self.by_name[name].clone());
                    }
                }
            }
        }

        Err(EngineError::UnknownType(label.to_string()))
    }

    /// Registered type names grouped by family, optionally filtered to one
    /// family and/or a case-insensitive substring
    pub fn names_by_family(
        &self,
        family: Option<Family>,
        search: &str,
    ) -> BTreeMap<Family, Vec<String>> {
        let needle = search.to_lowercase();
        self.by_family
            .iter()
            .filter(|(f, _)| family.map_or(true, |want| **f == want))
            .map(|(f, names)| {
                let filtered = names
                    .iter()
                    .filter(|n| needle.is_empty() || n.to_lowercase().contains(&needle))
                    .cloned()
                    .collect();
                (*f, filtered)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::builtin()
    }

    #[test]
    fn test_resolve_exact_canonical_name() {
        let reg = registry();
        let desc = reg.resolve("blurFx", None).unwrap();
        assert_eq!(desc.name, "blurFx");
        assert_eq!(desc.family, Family::Visual);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let reg = registry();
        let a = reg.resolve("noise", Some(Family::Channel)).unwrap();
        let b = reg.resolve("noise", Some(Family::Channel)).unwrap();
        assert_eq!(a.name, b.name);
    }

    #[test]
    fn test_resolve_prefers_family_priority_without_hint() {
        let reg = registry();
        // "noise" exists in Visual and Channel; Visual wins
        let desc = reg.resolve("noise", None).unwrap();
        assert_eq!(desc.name, "noiseFx");
        // "constant" exists in Visual, Channel, and Material; Visual wins
        let desc = reg.resolve("constant", None).unwrap();
        assert_eq!(desc.name, "constantFx");
    }

    #[test]
    fn test_resolve_honors_family_hint() {
        let reg = registry();
        let desc = reg.resolve("noise", Some(Family::Channel)).unwrap();
        assert_eq!(desc.name, "noiseChan");
        let desc = reg.resolve("constant", Some(Family::Material)).unwrap();
        assert_eq!(desc.name, "constantMat");
    }

    #[test]
    fn test_resolve_through_synonym() {
        let reg = registry();
        let desc = reg.resolve("webcam", None).unwrap();
        assert_eq!(desc.name, "videoInFx");
        let desc = reg.resolve("Material", None).unwrap();
        assert_eq!(desc.name, "phongMat");
        let desc = reg.resolve("geo", None).unwrap();
        assert_eq!(desc.name, "geometryComp");
    }

    #[test]
    fn test_resolve_through_descriptor_alias() {
        let reg = registry();
        let desc = reg.resolve("mix", None).unwrap();
        assert_eq!(desc.name, "compositeFx");
    }

    #[test]
    fn test_resolve_strips_separators_and_suffix() {
        let reg = registry();
        let desc = reg.resolve("Video In", None).unwrap();
        assert_eq!(desc.name, "videoInFx");
        let desc = reg.resolve("null chan", None).unwrap();
        assert_eq!(desc.name, "nullChan");
    }

    #[test]
    fn test_unique_candidate_wins_over_mismatched_hint() {
        let reg = registry();
        // "lfo" only exists in Channel; a wrong hint does not hide it
        let desc = reg.resolve("lfo", Some(Family::Geometry)).unwrap();
        assert_eq!(desc.name, "lfoChan");
    }

    #[test]
    fn test_unique_candidate_rule_scenario() {
        // One Visual "circle" and one Channel "circleGen": resolving
        // "circle" with no hint returns the Visual type
        let reg = TypeRegistry::new(vec![
            TypeDescriptor::new("circle", Family::Visual),
            TypeDescriptor::new("circleGen", Family::Channel),
        ]);
        let desc = reg.resolve("circle", None).unwrap();
        assert_eq!(desc.family, Family::Visual);
        assert_eq!(desc.name, "circle");
    }

    #[test]
    fn test_substring_fallback() {
        let reg = registry();
        let desc = reg.resolve("subdiv", None).unwrap();
        assert_eq!(desc.name, "subdivideGeo");
        // Hint restricts the scan
        assert!(reg.resolve("subdiv", Some(Family::Visual)).is_err());
    }

    #[test]
    fn test_unknown_label_fails() {
        let reg = registry();
        match reg.resolve("flux capacitor", None) {
            Err(EngineError::UnknownType(label)) => assert_eq!(label, "flux capacitor"),
            other => panic!("expected UnknownType, got {other:?}"),
        }
        assert!(reg.resolve("", None).is_err());
    }

    #[test]
    fn test_names_by_family_search() {
        let reg = registry();
        let listing = reg.names_by_family(Some(Family::Visual), "null");
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[&Family::Visual], vec!["nullFx".to_string()]);

        let all = reg.names_by_family(None, "");
        assert_eq!(all.len(), 6);
    }
}
