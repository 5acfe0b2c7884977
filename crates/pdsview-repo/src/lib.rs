//! AT Protocol repository export reading
//!
//! This crate reads the CAR archives a PDS hands out from `com.atproto.sync.getRepo`
//! and answers the question "which record collections does this repository hold?"
//!
//! - **CAR I/O**: Lazy, single-pass reading of CARv1 archives, plus a writer for fixtures
//! - **Values**: DAG-CBOR decoding into a generic [`Value`], rejecting trailing or truncated input
//! - **Classification**: Per-block collection discovery that tolerates non-record blocks
//! - **Repository view**: Commit and MST resolution for record-level queries
//!
//! # Example
//!
//! ```rust,ignore
//! use pdsview_repo::classify_archive;
//!
//! let bytes = std::fs::read("repo.car")?;
//! let collections = classify_archive(bytes)?;
//! for name in collections.sorted() {
//!     println!("{name}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

/// CAR (Content Addressable aRchive) utilities
pub mod car;
/// Collection discovery over archive blocks
pub mod classify;
/// Commit structures
pub mod commit;
pub mod error;
/// Merkle Search Tree reading
pub mod mst;
/// Read-only repository view
pub mod repo;
/// Block storage abstraction
pub mod storage;
/// Generic DAG-CBOR values
pub mod value;

/// Multicodec code for DAG-CBOR
pub const DAG_CBOR_CID_CODEC: u64 = 0x71;

/// Multihash code for SHA2-256
pub const SHA2_256: u64 = 0x12;

pub use car::{Block, CarReader};
pub use classify::{BlockOutcome, Collections, SkipReason, classify, classify_archive};
pub use commit::Commit;
pub use error::{DecodeError, FormatError, RepoError, RepoErrorKind, Result};
pub use repo::{RecordEntry, Repository};
pub use value::{Value, decode, encode};
