//! Collection discovery over an archive's blocks
//!
//! A repository export mixes record blocks with commit and MST node blocks. Each block
//! is classified on its own: records contribute the namespace of their `$type`, and
//! everything else is skipped with a reason. Skips are ordinary outcomes, not errors.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use smol_str::SmolStr;

use crate::car::{Block, CarReader};
use crate::error::{FormatError, Result};
use crate::value::{self, TYPE_KEY, Value};

/// Why a block contributed no collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Payload is not valid DAG-CBOR
    Undecodable,
    /// Decoded, but not a map
    NotAnObject,
    /// Map without a `$type` key
    MissingType,
    /// `$type` present but not a string
    NonStringType,
    /// `$type` contains no `.`, so there is no namespace to take
    NoNamespace,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Undecodable => "undecodable",
            SkipReason::NotAnObject => "not an object",
            SkipReason::MissingType => "missing $type",
            SkipReason::NonStringType => "non-string $type",
            SkipReason::NoNamespace => "$type without namespace",
        };
        f.write_str(s)
    }
}

/// Result of classifying one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    /// A record of the given collection
    Record {
        /// Collection name (the `$type` minus its last segment)
        collection: SmolStr,
    },
    /// Not a record
    Skipped(SkipReason),
}

/// The collection segment of a schema type: everything before the final `.`
///
/// `app.bsky.feed.post` → `app.bsky.feed`. Returns `None` only when there is no `.`;
/// empty segments are kept as written.
pub fn collection_of(type_: &str) -> Option<&str> {
    type_.rsplit_once('.').map(|(collection, _)| collection)
}

/// Classify an already-decoded value
pub fn classify_value(value: &Value) -> BlockOutcome {
    let Some(map) = value.as_object() else {
        return BlockOutcome::Skipped(SkipReason::NotAnObject);
    };
    let type_ = match map.get(TYPE_KEY) {
        None => return BlockOutcome::Skipped(SkipReason::MissingType),
        Some(Value::String(s)) => s,
        Some(_) => return BlockOutcome::Skipped(SkipReason::NonStringType),
    };
    match collection_of(type_) {
        Some(collection) => BlockOutcome::Record {
            collection: SmolStr::new(collection),
        },
        None => BlockOutcome::Skipped(SkipReason::NoNamespace),
    }
}

/// Decode and classify a raw payload
pub fn classify_payload(data: &[u8]) -> BlockOutcome {
    match value::decode(data) {
        Ok(value) => classify_value(&value),
        Err(_) => BlockOutcome::Skipped(SkipReason::Undecodable),
    }
}

/// Decode and classify one archive block
pub fn classify_block(block: &Block) -> BlockOutcome {
    let outcome = classify_payload(&block.data);

    #[cfg(feature = "tracing")]
    if let BlockOutcome::Skipped(reason) = &outcome {
        tracing::trace!(cid = %block.cid, %reason, "skipping block");
    }

    outcome
}

/// Set of collection names found in an archive
///
/// Iteration follows first-seen order. Use [`Collections::sorted`] for a stable
/// presentation order. Each name also carries how many record blocks named it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collections {
    order: Vec<SmolStr>,
    counts: HashMap<SmolStr, usize>,
    skipped: HashMap<SkipReason, usize>,
}

impl Collections {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one block outcome into the set
    pub fn record(&mut self, outcome: BlockOutcome) {
        match outcome {
            BlockOutcome::Record { collection } => match self.counts.get_mut(&collection) {
                Some(count) => *count += 1,
                None => {
                    self.counts.insert(collection.clone(), 1);
                    self.order.push(collection);
                }
            },
            BlockOutcome::Skipped(reason) => *self.skipped.entry(reason).or_insert(0) += 1,
        }
    }

    /// Number of distinct collections
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no collection was found
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether `collection` was found
    pub fn contains(&self, collection: &str) -> bool {
        self.counts.contains_key(collection)
    }

    /// Collection names in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(SmolStr::as_str)
    }

    /// Collection names in lexicographic order
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.iter().collect();
        names.sort_unstable();
        names
    }

    /// Number of record blocks that named `collection`
    pub fn count(&self, collection: &str) -> usize {
        self.counts.get(collection).copied().unwrap_or(0)
    }

    /// Number of blocks skipped for `reason`
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    /// Total number of skipped blocks
    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

impl<'a> IntoIterator for &'a Collections {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, SmolStr>, fn(&'a SmolStr) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter().map(SmolStr::as_str)
    }
}

/// Classify every block of a sequence
///
/// Consumes the sequence exactly once. Blocks that are not records are skipped; a
/// container error from the sequence aborts the fold and is returned.
pub fn classify<I>(blocks: I) -> std::result::Result<Collections, FormatError>
where
    I: IntoIterator<Item = std::result::Result<Block, FormatError>>,
{
    blocks.into_iter().try_fold(Collections::new(), |mut acc, block| {
        acc.record(classify_block(&block?));
        Ok(acc)
    })
}

/// Open an archive and classify all of its blocks
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
pub fn classify_archive(bytes: impl Into<Bytes>) -> Result<Collections> {
    let reader = CarReader::open(bytes)?;
    let collections = classify(reader)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        collections = collections.len(),
        skipped = collections.total_skipped(),
        "classified archive"
    );

    Ok(collections)
}
