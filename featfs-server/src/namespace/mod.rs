//! Namespace primitives
//!
//! The node tree a service exposes, path handling and the token intake used
//! by parameter files. Which nodes exist and what they mean is decided by
//! [`crate::service`].

mod node;
mod path;
mod tokens;
mod tree;

pub use node::{Binding, Node, NodeAllocator, NodeKind};
pub use path::NsPath;
pub use tokens::feed_tokens;
pub use tree::Tree;
