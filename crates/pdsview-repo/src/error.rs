//! Error types for repository export reading

use std::error::Error;
use std::fmt;

/// Boxed error type for error sources
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Result type alias for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

/// Repository operation error with rich diagnostics
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub struct RepoError {
    kind: RepoErrorKind,
    #[source]
    source: Option<BoxError>,
    #[help]
    help: Option<String>,
    context: Option<String>,
}

/// Error categories for repository operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoErrorKind {
    /// CAR container header or framing is malformed
    Format,
    /// A block payload is not valid DAG-CBOR
    Decode,
    /// Invalid MST structure
    InvalidMst,
    /// Invalid commit structure
    InvalidCommit,
    /// Resource not found
    NotFound,
    /// I/O error
    Io,
}

impl RepoError {
    /// Create a new error with the given kind and optional source
    pub fn new(kind: RepoErrorKind, source: Option<BoxError>) -> Self {
        Self {
            kind,
            source,
            help: None,
            context: None,
        }
    }

    /// Add a help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add context information to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> &RepoErrorKind {
        &self.kind
    }

    /// Create an invalid MST error
    pub fn invalid_mst(msg: impl Into<String>) -> Self {
        Self::new(RepoErrorKind::InvalidMst, Some(msg.into().into()))
            .with_help("MST nodes must follow protocol structure")
    }

    /// Create an invalid commit error
    pub fn invalid_commit(msg: impl Into<String>) -> Self {
        Self::new(RepoErrorKind::InvalidCommit, Some(msg.into().into()))
    }

    /// Create a not found error
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::new(RepoErrorKind::NotFound, None)
            .with_context(format!("{} not found: {}", resource, id))
    }

    /// Create an I/O error
    pub fn io(source: impl Error + Send + Sync + 'static) -> Self {
        Self::new(RepoErrorKind::Io, Some(Box::new(source)))
    }
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;

        if let Some(ctx) = &self.context {
            write!(f, ": {}", ctx)?;
        }

        if let Some(src) = &self.source {
            write!(f, ": {}", src)?;
        }

        Ok(())
    }
}

// Internal granular errors

/// CAR container errors
///
/// Raised while opening or iterating an archive. Fatal for the archive as a whole.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum FormatError {
    /// A frame length prefix could not be read
    #[error("Invalid varint length prefix at offset {offset}")]
    #[diagnostic(code(car::bad_varint))]
    BadVarint {
        /// Byte offset of the length prefix
        offset: usize,
    },

    /// A frame declares more bytes than remain in the buffer
    #[error("Truncated frame at offset {offset}: declares {declared} bytes, {remaining} remain")]
    #[diagnostic(
        code(car::truncated),
        help("The archive was cut short; download the repository export again")
    )]
    TruncatedFrame {
        /// Byte offset of the frame body
        offset: usize,
        /// Declared frame length
        declared: u64,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// A block frame has zero length
    #[error("Empty frame at offset {offset}")]
    #[diagnostic(code(car::empty_frame))]
    EmptyFrame {
        /// Byte offset of the frame body
        offset: usize,
    },

    /// The header frame is not a valid DAG-CBOR CAR header
    #[error("Invalid CAR header")]
    #[diagnostic(code(car::invalid_header))]
    InvalidHeader(#[source] BoxError),

    /// Only CARv1 archives are supported
    #[error("Unsupported CAR version {0}")]
    #[diagnostic(
        code(car::unsupported_version),
        help("Repository exports are CARv1; unwrap CARv2 files before reading")
    )]
    UnsupportedVersion(u64),

    /// Header has an empty roots list
    #[error("CAR header has no roots")]
    #[diagnostic(code(car::no_roots))]
    NoRoots,

    /// A block frame does not start with a valid CID
    #[error("Invalid CID in frame at offset {offset}")]
    #[diagnostic(code(car::invalid_cid))]
    InvalidCid {
        /// Byte offset of the frame body
        offset: usize,
        /// Underlying CID parse error
        #[source]
        source: cid::Error,
    },
}

impl From<FormatError> for RepoError {
    fn from(e: FormatError) -> Self {
        RepoError::new(RepoErrorKind::Format, Some(Box::new(e)))
            .with_context("Failed to read CAR archive".to_string())
    }
}

/// DAG-CBOR decode failure for a single block payload
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("Invalid DAG-CBOR: {source}")]
#[diagnostic(code(dagcbor::decode))]
pub struct DecodeError {
    #[source]
    source: BoxError,
}

impl DecodeError {
    pub(crate) fn new(source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

impl From<DecodeError> for RepoError {
    fn from(e: DecodeError) -> Self {
        RepoError::new(RepoErrorKind::Decode, Some(Box::new(e)))
    }
}

/// DAG-CBOR encode failure
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("DAG-CBOR encoding failed: {source}")]
#[diagnostic(code(dagcbor::encode))]
pub struct EncodeError {
    #[source]
    source: BoxError,
}

impl EncodeError {
    pub(crate) fn new(source: impl Error + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

/// MST-specific errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum MstError {
    /// Prefix length points past the previous key
    #[error("Prefix length {prefix_len} exceeds previous key length {prev_len}")]
    BadPrefix {
        /// Declared shared prefix
        prefix_len: usize,
        /// Length of the previous key in the node
        prev_len: usize,
    },

    /// Key suffix is not UTF-8
    #[error("Invalid UTF-8 in key suffix")]
    InvalidKey(#[source] std::str::Utf8Error),

    /// Node structure invalid
    #[error("Node structure invalid: {0}")]
    InvalidNode(String),

    /// Node block failed to decode
    #[error("Node deserialization failed")]
    Serialization(#[source] BoxError),
}

impl From<MstError> for RepoError {
    fn from(e: MstError) -> Self {
        match e {
            MstError::Serialization(e) => RepoError::new(RepoErrorKind::InvalidMst, Some(e))
                .with_help("MST nodes must follow protocol structure"),
            other => RepoError::invalid_mst(other.to_string()),
        }
    }
}

/// Commit-specific errors
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CommitError {
    /// Invalid commit version
    #[error("Invalid commit version: {0}")]
    InvalidVersion(i64),

    /// Commit block failed to decode
    #[error("Commit deserialization failed")]
    Serialization(#[source] BoxError),
}

impl From<CommitError> for RepoError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::InvalidVersion(v) => {
                RepoError::invalid_commit(format!("unsupported version {}", v))
            }
            CommitError::Serialization(e) => RepoError::new(RepoErrorKind::InvalidCommit, Some(e)),
        }
    }
}
