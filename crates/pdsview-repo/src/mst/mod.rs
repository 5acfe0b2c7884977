//! Merkle Search Tree reading
//!
//! Only the read side is implemented: decoding nodes and walking leaves in key order.

pub mod cursor;
pub mod node;
pub mod util;

pub use cursor::MstCursor;
pub use node::{NodeData, NodeEntry, TreeEntry};
