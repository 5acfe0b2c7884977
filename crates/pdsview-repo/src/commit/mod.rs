//! Repository commit objects
//!
//! The root block of a repository export is a signed commit pointing at the MST root.
//! Signatures are carried but not verified here.

use crate::error::{CommitError, Result};
use bytes::Bytes;
use cid::Cid as IpldCid;
use smol_str::SmolStr;

/// Repository commit object
///
/// **Version compatibility**: v2 and v3 commits differ only in how `prev` is
/// serialized (v3 must include it even if null). Both decode into this struct.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Commit {
    /// Repository DID
    pub did: SmolStr,

    /// Commit version (2 or 3)
    pub version: i64,

    /// MST root CID
    pub data: IpldCid,

    /// Revision TID
    pub rev: SmolStr,

    /// Previous commit CID (None for initial commit)
    pub prev: Option<IpldCid>,

    /// Signature bytes
    #[serde(with = "bytes_field")]
    pub sig: Bytes,
}

impl Commit {
    /// Create new unsigned commit (version = 3, sig empty)
    pub fn new_unsigned(
        did: impl Into<SmolStr>,
        data: IpldCid,
        rev: impl Into<SmolStr>,
        prev: Option<IpldCid>,
    ) -> Self {
        Self {
            did: did.into(),
            version: 3,
            data,
            rev: rev.into(),
            prev,
            sig: Bytes::new(),
        }
    }

    /// Serialize to DAG-CBOR
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        serde_ipld_dagcbor::to_vec(self).map_err(|e| CommitError::Serialization(Box::new(e)).into())
    }

    /// Deserialize from DAG-CBOR, accepting versions 2 and 3
    pub fn from_cbor(data: &[u8]) -> Result<Self> {
        let commit: Commit = serde_ipld_dagcbor::from_slice(data)
            .map_err(|e| CommitError::Serialization(Box::new(e)))?;
        if !(2..=3).contains(&commit.version) {
            return Err(CommitError::InvalidVersion(commit.version).into());
        }
        Ok(commit)
    }
}

/// `Bytes` as a CBOR byte string (major type 2) rather than an array of integers
pub(crate) mod bytes_field {
    use bytes::Bytes;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serde_bytes::serialize(bytes.as_ref(), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let buf: serde_bytes::ByteBuf = serde::Deserialize::deserialize(deserializer)?;
        Ok(Bytes::from(buf.into_vec()))
    }
}
