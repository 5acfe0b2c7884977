//! MST utility functions

use super::node::NodeData;
use crate::error::{MstError, Result};
use crate::{DAG_CBOR_CID_CODEC, SHA2_256};
use cid::Cid as IpldCid;
use sha2::{Digest, Sha256};

/// Compute CID from raw bytes
///
/// Uses SHA-256 hash and DAG-CBOR codec. Assumes data is already DAG-CBOR encoded.
pub fn compute_cid(data: &[u8]) -> Result<IpldCid> {
    let hash = Sha256::digest(data);
    let mh = multihash::Multihash::<64>::wrap(SHA2_256, hash.as_slice())
        .map_err(|e| MstError::InvalidNode(e.to_string()))?;

    Ok(IpldCid::new_v1(DAG_CBOR_CID_CODEC, mh))
}

/// Serialize node to DAG-CBOR and compute CID
pub fn node_to_cid(node: &NodeData) -> Result<(IpldCid, Vec<u8>)> {
    let cbor = node.to_cbor()?;
    Ok((compute_cid(&cbor)?, cbor))
}

/// Split a repo path `collection/rkey` into its two halves
///
/// Returns `None` unless there is exactly one `/` with text on both sides.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    let (collection, rkey) = key.split_once('/')?;
    if collection.is_empty() || rkey.is_empty() || rkey.contains('/') {
        return None;
    }
    Some((collection, rkey))
}

/// Count shared prefix length between two keys, in bytes
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}
