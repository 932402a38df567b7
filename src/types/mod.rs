//! Node type system: families, descriptors, and label resolution

pub mod aliases;
pub mod catalog;
pub mod descriptor;
pub mod family;
pub mod registry;

pub use descriptor::TypeDescriptor;
pub use family::Family;
pub use registry::TypeRegistry;
