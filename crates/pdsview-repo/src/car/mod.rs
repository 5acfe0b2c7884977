//! CAR (Content Addressable aRchive) file I/O
//!
//! Repository exports (`com.atproto.sync.getRepo`) are CARv1 archives.
//!
//! # Examples
//!
//! Iterating blocks:
//! ```ignore
//! use pdsview_repo::car::CarReader;
//!
//! let reader = CarReader::open(bytes)?;
//! for block in reader {
//!     let block = block?;
//!     println!("{} ({} bytes)", block.cid, block.data.len());
//! }
//! ```

pub mod reader;
pub mod writer;

// Re-export commonly used functions and types
pub use reader::{parse_car_bytes, read_car_file, Block, CarReader, ParsedCar};
pub use writer::write_car_bytes;
