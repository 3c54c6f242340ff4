pub mod node;
pub mod tree;
pub use node::{Node, NodeKind};
pub use tree::{BuildOptions, Tree};
