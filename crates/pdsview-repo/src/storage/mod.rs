//! Block storage abstraction for MST nodes and records

use bytes::Bytes;
use cid::Cid as IpldCid;

/// Read-only block storage
///
/// Provides CID-keyed lookup for commits, MST nodes, and record data. A repository
/// export is read once and queried in place, so lookups are synchronous and infallible
/// beyond "not present".
pub trait BlockStore {
    /// Get a block by CID
    ///
    /// Returns `None` if the block is not found.
    fn get(&self, cid: &IpldCid) -> Option<Bytes>;

    /// Check if a block exists without retrieving it
    fn has(&self, cid: &IpldCid) -> bool {
        self.get(cid).is_some()
    }

    /// Number of blocks held
    fn len(&self) -> usize;

    /// Whether the store holds no blocks
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub mod memory;

pub use memory::MemoryBlockStore;
