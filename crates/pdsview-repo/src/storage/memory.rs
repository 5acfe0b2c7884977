//! In-memory block storage implementation

use crate::error::Result;
use crate::storage::BlockStore;
use bytes::Bytes;
use cid::Cid as IpldCid;
use std::collections::BTreeMap;

/// In-memory block storage using BTreeMap
///
/// Backs a [`crate::Repository`] loaded from a CAR archive. Uses `Bytes` so blocks stay
/// zero-copy slices of the archive buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    blocks: BTreeMap<IpldCid, Bytes>,
}

impl MemoryBlockStore {
    /// Create new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new memory store from a map of blocks
    pub fn new_from_blocks(blocks: BTreeMap<IpldCid, Bytes>) -> Self {
        Self { blocks }
    }

    /// Store a block under its computed CID (SHA-256, DAG-CBOR codec)
    pub fn put(&mut self, data: &[u8]) -> Result<IpldCid> {
        let cid = crate::mst::util::compute_cid(data)?;
        self.blocks.insert(cid, Bytes::copy_from_slice(data));
        Ok(cid)
    }
}

impl BlockStore for MemoryBlockStore {
    fn get(&self, cid: &IpldCid) -> Option<Bytes> {
        self.blocks.get(cid).cloned()
    }

    fn has(&self, cid: &IpldCid) -> bool {
        self.blocks.contains_key(cid)
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }
}
