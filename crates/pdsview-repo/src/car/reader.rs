//! CAR file reading utilities
//!
//! A CARv1 archive is a sequence of frames, each prefixed by its length as an unsigned
//! varint. The first frame is a DAG-CBOR header `{version, roots}`; every following frame
//! is a CID immediately followed by the block payload.
//!
//! [`CarReader`] holds the archive as one [`Bytes`] buffer and yields blocks as zero-copy
//! slices of it, one frame at a time.

use crate::error::{FormatError, RepoError, Result};
use bytes::Bytes;
use cid::Cid as IpldCid;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

/// One block from an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Content identifier as written in the archive (not verified against the payload)
    pub cid: IpldCid,
    /// Raw block payload
    pub data: Bytes,
}

#[derive(Debug, serde::Deserialize)]
struct CarHeader {
    version: u64,
    #[serde(default)]
    roots: Vec<IpldCid>,
}

/// Forward-only reader over an in-memory CAR archive
///
/// Opening validates the header and the frame boundaries of the whole buffer, so a
/// truncated archive is rejected before any block is handed out. Iteration then parses
/// one frame per step.
#[derive(Debug, Clone)]
pub struct CarReader {
    buf: Bytes,
    pos: usize,
    version: u64,
    roots: Vec<IpldCid>,
    frames: usize,
}

/// Read one varint length prefix at `pos`, returning (length, body offset)
fn read_frame_len(buf: &[u8], pos: usize) -> std::result::Result<(u64, usize), FormatError> {
    let (len, rest) = unsigned_varint::decode::u64(&buf[pos..])
        .map_err(|_| FormatError::BadVarint { offset: pos })?;
    let body = buf.len() - rest.len();
    let remaining = rest.len();
    if len > remaining as u64 {
        return Err(FormatError::TruncatedFrame {
            offset: body,
            declared: len,
            remaining,
        });
    }
    Ok((len, body))
}

impl CarReader {
    /// Open an archive held in memory
    ///
    /// Fails with [`FormatError`] if the header is malformed, the version is not 1, the
    /// roots list is empty, or any frame declares more bytes than remain.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub fn open(bytes: impl Into<Bytes>) -> std::result::Result<Self, FormatError> {
        let buf: Bytes = bytes.into();

        if buf.is_empty() {
            return Err(FormatError::BadVarint { offset: 0 });
        }
        let (header_len, header_start) = read_frame_len(&buf, 0)?;
        let header_end = header_start + header_len as usize;

        let header: CarHeader = serde_ipld_dagcbor::from_slice(&buf[header_start..header_end])
            .map_err(|e| FormatError::InvalidHeader(Box::new(e)))?;
        if header.version != 1 {
            return Err(FormatError::UnsupportedVersion(header.version));
        }
        if header.roots.is_empty() {
            return Err(FormatError::NoRoots);
        }

        // Framing pass: only length prefixes are read
        let mut frames = 0;
        let mut pos = header_end;
        while pos < buf.len() {
            let (len, body) = read_frame_len(&buf, pos)?;
            if len == 0 {
                return Err(FormatError::EmptyFrame { offset: body });
            }
            pos = body + len as usize;
            frames += 1;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(frames, roots = header.roots.len(), "opened CAR archive");

        Ok(Self {
            buf,
            pos: header_end,
            version: header.version,
            roots: header.roots,
            frames,
        })
    }

    /// Header roots (the first is the repository commit)
    pub fn roots(&self) -> &[IpldCid] {
        &self.roots
    }

    /// Header version (always 1)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of block frames in the archive
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    fn next_block(&mut self) -> std::result::Result<Block, FormatError> {
        let (len, body) = read_frame_len(&self.buf, self.pos)?;
        let end = body + len as usize;

        let mut cursor = Cursor::new(&self.buf[body..end]);
        let cid = IpldCid::read_bytes(&mut cursor)
            .map_err(|source| FormatError::InvalidCid { offset: body, source })?;
        let data_start = body + cursor.position() as usize;

        self.pos = end;
        Ok(Block {
            cid,
            data: self.buf.slice(data_start..end),
        })
    }
}

impl Iterator for CarReader {
    type Item = std::result::Result<Block, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let item = self.next_block();
        if item.is_err() {
            // Stop after the first malformed frame
            self.pos = self.buf.len();
        }
        Some(item)
    }
}

/// Parsed CAR file data
#[derive(Debug, Clone)]
pub struct ParsedCar {
    /// The first root CID from the CAR header
    pub root: IpldCid,
    /// All blocks in the CAR file
    pub blocks: BTreeMap<IpldCid, Bytes>,
}

/// Parse CAR bytes into root and block map
///
/// For callers that need random access to blocks. Later duplicates of a CID replace
/// earlier ones.
pub fn parse_car_bytes(data: impl Into<Bytes>) -> Result<ParsedCar> {
    let reader = CarReader::open(data)?;
    let root = reader
        .roots()
        .first()
        .copied()
        .ok_or(FormatError::NoRoots)?;

    let mut blocks = BTreeMap::new();
    for block in reader {
        let block = block?;
        blocks.insert(block.cid, block.data);
    }

    Ok(ParsedCar { root, blocks })
}

/// Read an entire CAR file into memory
pub async fn read_car_file(path: impl AsRef<Path>) -> Result<Bytes> {
    let data = tokio::fs::read(path).await.map_err(RepoError::io)?;
    Ok(Bytes::from(data))
}
