//! Node type descriptors
//!
//! A descriptor is the immutable metadata record for one concrete node
//! type: its family, canonical name, label aliases, declared minimum
//! input count, and default property values. Descriptors are registered
//! once at startup and never mutated afterwards.

use super::family::Family;
use crate::graph::PropertyValue;

/// Immutable metadata for a concrete node type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Canonical name, normally carrying the family suffix (e.g. `blurFx`)
    pub name: String,
    /// Family the type belongs to
    pub family: Family,
    /// Extra human labels that resolve to this type
    pub aliases: Vec<String>,
    /// Number of input slots that must be connected for the node to work
    pub min_inputs: usize,
    /// Property names with their default values, in declaration order
    pub defaults: Vec<(String, PropertyValue)>,
}

impl TypeDescriptor {
    /// Create a descriptor with no aliases, no required inputs, no defaults
    pub fn new(name: impl Into<String>, family: Family) -> Self {
        Self {
            name: name.into(),
            family,
            aliases: Vec::new(),
            min_inputs: 0,
            defaults: Vec::new(),
        }
    }

    /// Add a label alias
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Declare the minimum required input count
    pub fn with_min_inputs(mut self, count: usize) -> Self {
        self.min_inputs = count;
        self
    }

    /// Add a default property value
    pub fn with_default(mut self, name: &str, value: PropertyValue) -> Self {
        self.defaults.push((name.to_string(), value));
        self
    }

    /// Base token for auto-generated node names (`blurFx` -> `blur`)
    pub fn base_name(&self) -> &str {
        let suffix = self.family.suffix();
        match self.name.strip_suffix(suffix) {
            Some(base) if !base.is_empty() => base,
            _ => &self.name,
        }
    }
}
