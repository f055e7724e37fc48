// Definition of the virtual file system. Everything lives in memory: a tree of
// directories and files, a resolver that turns path strings into nodes, and an
// owner/other permission model checked against the acting user.

mod engine;
mod inspect;
pub mod node;
pub mod permissions;
pub mod resolver;
pub mod tree;

pub use engine::{FileSystem, Touched};
pub use inspect::{Stat, WordCount, DEFAULT_LINE_COUNT};
pub use node::{Node, NodeId, NodeKind};
pub use permissions::{Access, ROOT_USER};
pub use tree::Tree;
