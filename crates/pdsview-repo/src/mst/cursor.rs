//! MST cursor for in-order leaf traversal

use super::node::{NodeData, NodeEntry};
use crate::error::{MstError, RepoError, Result};
use crate::storage::BlockStore;
use cid::Cid as IpldCid;
use smol_str::SmolStr;
use std::collections::HashSet;

/// Iterator over the leaves of an MST in sorted key order
///
/// Nodes are loaded from the block store lazily as the traversal reaches them. The
/// cursor keeps an explicit stack instead of recursing, and refuses to enter a node
/// twice (archives are not hash-verified, so a crafted one could contain a cycle).
///
/// # Example traversal
///
/// ```ignore
/// for leaf in MstCursor::new(&store, commit.data) {
///     let (key, cid) = leaf?;
///     println!("{} -> {}", key, cid);
/// }
/// ```
pub struct MstCursor<'s, S> {
    storage: &'s S,
    /// Pending work, top of stack is next in key order
    stack: Vec<NodeEntry>,
    visited: HashSet<IpldCid>,
    failed: bool,
}

impl<'s, S: BlockStore> MstCursor<'s, S> {
    /// Create new cursor at the start of the tree rooted at `root`
    pub fn new(storage: &'s S, root: IpldCid) -> Self {
        Self {
            storage,
            stack: vec![NodeEntry::Tree(root)],
            visited: HashSet::new(),
            failed: false,
        }
    }

    fn expand(&mut self, cid: IpldCid) -> Result<()> {
        if !self.visited.insert(cid) {
            return Err(MstError::InvalidNode(format!("node {} reached twice", cid)).into());
        }

        let block = self
            .storage
            .get(&cid)
            .ok_or_else(|| RepoError::not_found("MST node", &cid))?;
        let node = NodeData::from_cbor(&block)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(%cid, entries = node.entries.len(), "expanding MST node");

        // Reverse so the left-most entry ends up on top
        self.stack.extend(node.flatten()?.into_iter().rev());
        Ok(())
    }
}

impl<S: BlockStore> Iterator for MstCursor<'_, S> {
    type Item = Result<(SmolStr, IpldCid)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        while let Some(entry) = self.stack.pop() {
            match entry {
                NodeEntry::Leaf { key, value } => return Some(Ok((key, value))),
                NodeEntry::Tree(cid) => {
                    if let Err(e) = self.expand(cid) {
                        self.failed = true;
                        self.stack.clear();
                        return Some(Err(e));
                    }
                }
            }
        }

        None
    }
}
