//! MST node data structures

use bytes::Bytes;
use cid::Cid as IpldCid;
use smol_str::SmolStr;

use crate::error::{MstError, Result};

/// Entry in an MST node - either a subtree or a leaf
///
/// Flat, in-order form of a node: `[Tree, Leaf, Tree, Leaf, Leaf, Tree]` etc.
/// The wire format (CBOR) is different - see `NodeData` and `TreeEntry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEntry {
    /// Subtree reference (CID of a child node)
    Tree(IpldCid),

    /// Leaf node with key-value pair
    Leaf {
        /// Full key (not prefix-compressed in memory)
        key: SmolStr,
        /// CID of the record value
        value: IpldCid,
    },
}

/// Wire format entry (prefix-compressed leaf with optional subtree pointer)
///
/// Fields are declared in DAG-CBOR canonical order (k, p, t, v).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TreeEntry {
    /// Key suffix after prefix (CBOR byte string)
    #[serde(rename = "k", with = "crate::commit::bytes_field")]
    pub key_suffix: Bytes,

    /// Prefix length (shared bytes with previous key in node)
    #[serde(rename = "p")]
    pub prefix_len: u8,

    /// Optional subtree pointer (CID of child MST node)
    ///
    /// Serializes as explicit `null` when None.
    #[serde(rename = "t")]
    pub tree: Option<IpldCid>,

    /// CID of the record value
    #[serde(rename = "v")]
    pub value: IpldCid,
}

/// Wire format node data (serialized as DAG-CBOR)
///
/// # Conversion rules (wire → flat)
///
/// - `left` if present → prepend `Tree` entry
/// - Each entry → append `Leaf` with the full key rebuilt from the previous key
/// - Each `tree` if present → append `Tree` entry after its leaf
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeData {
    /// Left-most subtree pointer
    #[serde(rename = "l")]
    pub left: Option<IpldCid>,

    /// Entries in this node (sorted by full key, prefix-compressed)
    #[serde(rename = "e")]
    pub entries: Vec<TreeEntry>,
}

impl NodeData {
    /// Deserialize from DAG-CBOR
    pub fn from_cbor(data: &[u8]) -> Result<Self> {
        serde_ipld_dagcbor::from_slice(data).map_err(|e| MstError::Serialization(Box::new(e)).into())
    }

    /// Serialize to DAG-CBOR
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        serde_ipld_dagcbor::to_vec(self).map_err(|e| MstError::Serialization(Box::new(e)).into())
    }

    /// Expand to flat in-order entries, rebuilding full keys
    pub fn flatten(&self) -> Result<Vec<NodeEntry>> {
        let mut entries = Vec::with_capacity(self.entries.len() * 2 + 1);

        if let Some(left) = self.left {
            entries.push(NodeEntry::Tree(left));
        }

        let mut last_key = String::new();
        for entry in &self.entries {
            let prefix_len = entry.prefix_len as usize;
            if prefix_len > last_key.len() || !last_key.is_char_boundary(prefix_len) {
                return Err(MstError::BadPrefix {
                    prefix_len,
                    prev_len: last_key.len(),
                }
                .into());
            }
            let suffix = std::str::from_utf8(&entry.key_suffix).map_err(MstError::InvalidKey)?;

            let mut full_key = String::with_capacity(prefix_len + suffix.len());
            full_key.push_str(&last_key[..prefix_len]);
            full_key.push_str(suffix);

            if !last_key.is_empty() && full_key.as_str() <= last_key.as_str() {
                return Err(MstError::InvalidNode(format!(
                    "keys out of order: {:?} after {:?}",
                    full_key, last_key
                ))
                .into());
            }

            entries.push(NodeEntry::Leaf {
                key: SmolStr::new(&full_key),
                value: entry.value,
            });
            if let Some(tree) = entry.tree {
                entries.push(NodeEntry::Tree(tree));
            }

            last_key = full_key;
        }

        Ok(entries)
    }

    /// Build a node from sorted leaves and subtree pointers (prefix-compresses keys)
    ///
    /// `entries` must alternate as described on [`NodeData`]; two adjacent trees are invalid.
    pub fn from_entries(entries: &[NodeEntry]) -> Result<Self> {
        let mut data = NodeData {
            left: None,
            entries: Vec::new(),
        };

        let mut iter = entries.iter().peekable();
        if let Some(NodeEntry::Tree(cid)) = iter.peek() {
            data.left = Some(*cid);
            iter.next();
        }

        let mut last_key = "";
        while let Some(entry) = iter.next() {
            let NodeEntry::Leaf { key, value } = entry else {
                return Err(MstError::InvalidNode("Two Trees adjacent in flat entries".into()).into());
            };

            let prefix_len = super::util::common_prefix_len(last_key, key);
            let tree = match iter.peek() {
                Some(NodeEntry::Tree(cid)) => {
                    let cid = *cid;
                    iter.next();
                    Some(cid)
                }
                _ => None,
            };

            data.entries.push(TreeEntry {
                key_suffix: Bytes::copy_from_slice(key.as_str()[prefix_len..].as_bytes()),
                prefix_len: prefix_len.try_into().map_err(|_| {
                    MstError::InvalidNode(format!("Prefix length {} exceeds u8::MAX", prefix_len))
                })?,
                tree,
                value: *value,
            });
            last_key = key.as_str();
        }

        Ok(data)
    }
}
