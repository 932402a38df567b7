//! Patchbay: a node-graph automation engine behind a single-writer
//! command dispatcher.
//!
//! Callers on any thread submit commands (create, wire, set, inspect);
//! one worker thread applies them to the scene graph in arrival order.
//! Creation resolves loose human labels to concrete node types, places
//! nodes on collision-free per-family grids, and can wire or synthesize
//! the inputs a node needs to function.

pub mod constants;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod graph;
pub mod layout;
pub mod server;
pub mod types;
pub mod wire;

pub use dispatch::{Command, CommandClass, DispatchConfig, Dispatcher};
pub use engine::Engine;
pub use error::EngineError;
pub use graph::{Node, NodeId, PropertyValue, SceneGraph};
pub use server::Server;
pub use types::{Family, TypeDescriptor, TypeRegistry};
