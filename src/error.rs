//! Error types for the table codecs.

use thiserror::Error;

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, SstError>;

/// Header validation failures. Fatal to the `load` that raised them: the
/// table keeps its previous state and must be reloaded from a valid buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("bad table magic: expected {expected:?}, got {found:?}")]
    BadMagic { expected: [u8; 8], found: [u8; 8] },

    #[error("unsupported table version {found} (expected {expected})")]
    BadVersion { expected: u16, found: u16 },

    #[error("truncated table buffer: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("unknown table version {0} (supported: 1 = fixed, 2 = chunked)")]
    UnknownVersion(u16),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SstError {
    #[error("header error: {0}")]
    Header(#[from] HeaderError),

    #[error("key not found")]
    KeyNotFound,

    #[error("duplicate key")]
    DuplicateKey,

    #[error("payload size mismatch: expected {expected} bytes, got {actual}")]
    PayloadSizeMismatch { expected: usize, actual: usize },

    #[error("key must not be empty")]
    EmptyKey,

    #[error("invalid chunk size {0}: must exceed the 8-byte chunk header")]
    InvalidChunkSize(usize),

    #[error("corrupt table: {0}")]
    Corrupt(String),

    #[error("too large: {0}")]
    TooLarge(String),

    #[error("invalid config: {0}")]
    Config(String),
}

impl SstError {
    /// Ошибки, после которых вызывающий код может продолжать работу с таблицей.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound
                | Self::DuplicateKey
                | Self::PayloadSizeMismatch { .. }
                | Self::EmptyKey
                | Self::TooLarge(_)
        )
    }
}
