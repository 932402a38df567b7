//! Node structure and typed property values

use crate::types::{Family, TypeDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a node
pub type NodeId = usize;

/// A typed property value stored on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    /// Name of the declared type, for diagnostics and listings
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Boolean(_) => "bool",
            PropertyValue::Integer(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Text(_) => "string",
        }
    }

    /// Coerce an incoming value to this value's declared type.
    ///
    /// Booleans accept `true/1/on` in any case; integers parse through
    /// float so `"3.0"` works; anything that will not coerce falls back
    /// to a string rather than failing the whole operation.
    pub fn coerce_like(&self, incoming: &Value) -> PropertyValue {
        match self {
            PropertyValue::Boolean(_) => match incoming {
                Value::Bool(b) => PropertyValue::Boolean(*b),
                other => {
                    let s = plain_string(other).to_lowercase();
                    PropertyValue::Boolean(matches!(s.as_str(), "true" | "1" | "on"))
                }
            },
            PropertyValue::Integer(_) => match incoming.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => match incoming.as_f64() {
                    Some(f) => PropertyValue::Integer(f as i64),
                    None => match plain_string(incoming).trim().parse::<f64>() {
                        Ok(f) => PropertyValue::Integer(f as i64),
                        Err(_) => PropertyValue::Text(plain_string(incoming)),
                    },
                },
            },
            PropertyValue::Float(_) => match incoming.as_f64() {
                Some(f) => PropertyValue::Float(f),
                None => match plain_string(incoming).trim().parse::<f64>() {
                    Ok(f) => PropertyValue::Float(f),
                    Err(_) => PropertyValue::Text(plain_string(incoming)),
                },
            },
            PropertyValue::Text(_) => PropertyValue::Text(plain_string(incoming)),
        }
    }

    /// JSON representation for result payloads
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Boolean(b) => Value::from(*b),
            PropertyValue::Integer(i) => Value::from(*i),
            PropertyValue::Float(f) => Value::from(*f),
            PropertyValue::Text(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A live node in the graph.
///
/// Owned by its parent: destroying the parent destroys the whole subtree.
/// Input slots hold references to other nodes' outputs; slot count starts
/// at the declared minimum and grows on demand.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Name, unique among siblings
    pub name: String,
    /// Absolute path ("/project/blur1")
    pub path: String,
    pub descriptor: Arc<TypeDescriptor>,
    pub parent: Option<NodeId>,
    /// Child ids in creation order
    pub children: Vec<NodeId>,
    /// Input slots; `None` is an empty slot
    pub inputs: Vec<Option<NodeId>>,
    /// 2D layout position
    pub position: (i32, i32),
    pub properties: BTreeMap<String, PropertyValue>,
    /// Cleared when the node is destroyed
    pub valid: bool,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        name: impl Into<String>,
        path: impl Into<String>,
        descriptor: Arc<TypeDescriptor>,
        parent: Option<NodeId>,
        position: (i32, i32),
    ) -> Self {
        let properties = descriptor
            .defaults
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let inputs = vec![None; descriptor.min_inputs];
        Self {
            id,
            name: name.into(),
            path: path.into(),
            descriptor,
            parent,
            children: Vec::new(),
            inputs,
            position,
            properties,
            valid: true,
        }
    }

    /// Canonical type name
    pub fn type_name(&self) -> &str {
        &self.descriptor.name
    }

    /// Family of this node's type
    pub fn family(&self) -> Family {
        self.descriptor.family
    }

    /// Source connected at `slot`, if any
    pub fn input(&self, slot: usize) -> Option<NodeId> {
        self.inputs.get(slot).copied().flatten()
    }

    /// Store `source` in `slot`, growing the slot list if needed
    pub fn set_input(&mut self, slot: usize, source: Option<NodeId>) {
        if slot >= self.inputs.len() {
            self.inputs.resize(slot + 1, None);
        }
        self.inputs[slot] = source;
    }

    /// Number of filled input slots
    pub fn connected_inputs(&self) -> usize {
        self.inputs.iter().filter(|slot| slot.is_some()).count()
    }

    /// Actual property name matching `name` case-insensitively
    pub fn property_name_ci(&self, name: &str) -> Option<String> {
        if self.properties.contains_key(name) {
            return Some(name.to_string());
        }
        let lower = name.to_lowercase();
        self.properties
            .keys()
            .find(|k| k.to_lowercase() == lower)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn float_prop() -> PropertyValue {
        PropertyValue::Float(0.0)
    }

    #[test]
    fn test_coerce_bool() {
        let current = PropertyValue::Boolean(false);
        assert_eq!(current.coerce_like(&json!(true)), PropertyValue::Boolean(true));
        assert_eq!(current.coerce_like(&json!("On")), PropertyValue::Boolean(true));
        assert_eq!(current.coerce_like(&json!(1)), PropertyValue::Boolean(true));
        assert_eq!(current.coerce_like(&json!("off")), PropertyValue::Boolean(false));
    }

    #[test]
    fn test_coerce_int_through_float() {
        let current = PropertyValue::Integer(0);
        assert_eq!(current.coerce_like(&json!(7)), PropertyValue::Integer(7));
        assert_eq!(current.coerce_like(&json!(3.9)), PropertyValue::Integer(3));
        assert_eq!(current.coerce_like(&json!("4.2")), PropertyValue::Integer(4));
    }

    #[test]
    fn test_coerce_failure_falls_back_to_text() {
        assert_eq!(
            float_prop().coerce_like(&json!("fast")),
            PropertyValue::Text("fast".to_string())
        );
    }

    #[test]
    fn test_set_input_grows_slots() {
        let desc = Arc::new(TypeDescriptor::new("nullFx", Family::Visual));
        let mut node = Node::new(1, "null1", "/null1", desc, None, (0, 0));
        assert!(node.inputs.is_empty());
        node.set_input(2, Some(9));
        assert_eq!(node.inputs.len(), 3);
        assert_eq!(node.input(2), Some(9));
        assert_eq!(node.connected_inputs(), 1);
    }

    #[test]
    fn test_property_name_ci() {
        let desc = Arc::new(
            TypeDescriptor::new("blurFx", Family::Visual)
                .with_default("size", PropertyValue::Float(5.0)),
        );
        let node = Node::new(1, "blur1", "/blur1", desc, None, (0, 0));
        assert_eq!(node.property_name_ci("Size"), Some("size".to_string()));
        assert_eq!(node.property_name_ci("radius"), None);
    }
}
