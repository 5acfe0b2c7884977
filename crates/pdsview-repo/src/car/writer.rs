//! CAR file writing utilities
//!
//! The inverse of [`crate::car::reader`]: frames a header and a sequence of blocks as
//! CARv1. Used to assemble archives in memory, e.g. for fixtures and round-trip checks.

use crate::error::EncodeError;
use cid::Cid as IpldCid;

#[derive(serde::Serialize)]
struct CarHeader<'a> {
    roots: &'a [IpldCid],
    version: u64,
}

fn write_frame(out: &mut Vec<u8>, parts: &[&[u8]]) {
    let len: usize = parts.iter().map(|p| p.len()).sum();
    let mut buf = unsigned_varint::encode::u64_buffer();
    out.extend_from_slice(unsigned_varint::encode::u64(len as u64, &mut buf));
    for part in parts {
        out.extend_from_slice(part);
    }
}

/// Write blocks to CAR bytes (in-memory)
///
/// Blocks are written in iteration order. CIDs are not checked against their payloads.
pub fn write_car_bytes<'a>(
    roots: &[IpldCid],
    blocks: impl IntoIterator<Item = (IpldCid, &'a [u8])>,
) -> Result<Vec<u8>, EncodeError> {
    let header = serde_ipld_dagcbor::to_vec(&CarHeader { roots, version: 1 })
        .map_err(EncodeError::new)?;

    let mut out = Vec::new();
    write_frame(&mut out, &[&header]);

    for (cid, data) in blocks {
        let cid_bytes = cid.to_bytes();
        write_frame(&mut out, &[&cid_bytes, data]);
    }

    Ok(out)
}
