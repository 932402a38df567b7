//! Scene graph: nodes, paths, connections, and the audit log

pub mod node;
pub mod scene;

pub use node::{Node, NodeId, PropertyValue};
pub use scene::{normalize_path, ConnectionRecord, SceneGraph, WireReason};
