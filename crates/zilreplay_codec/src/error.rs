//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while walking a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The record ended before a field could be read.
    #[error("record truncated at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Offset of the field that could not be read.
        offset: usize,
        /// Number of bytes the field needs.
        needed: usize,
        /// Number of bytes left in the buffer.
        available: usize,
    },

    /// A NUL-terminated string ran to the end of the buffer.
    #[error("unterminated string at offset {offset}")]
    MissingTerminator {
        /// Offset where the string starts.
        offset: usize,
    },

    /// A string that must be UTF-8 is not.
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 {
        /// Offset where the string starts.
        offset: usize,
    },

    /// A count or length field cannot describe a structure in memory.
    #[error("size limit exceeded: claimed {claimed}, max allowed {max_allowed}")]
    SizeLimitExceeded {
        /// The claimed size.
        claimed: u64,
        /// The maximum allowed size.
        max_allowed: u64,
    },
}

impl CodecError {
    /// Creates a truncation error.
    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        Self::Truncated {
            offset,
            needed,
            available,
        }
    }

    /// Creates a size limit error.
    pub fn size_limit(claimed: u64, max_allowed: u64) -> Self {
        Self::SizeLimitExceeded {
            claimed,
            max_allowed,
        }
    }
}
