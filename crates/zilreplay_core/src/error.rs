//! Error types for intent-log replay.

use thiserror::Error;

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Errors that can occur while decoding or replaying a record.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The transaction-type code is reserved or unknown.
    #[error("unsupported transaction type {code:#x}")]
    Unsupported {
        /// The code, with the case-insensitive bit removed.
        code: u64,
    },

    /// The record needs a capability this engine was configured without.
    #[error("{capability} support is disabled, cannot replay transaction type {code}")]
    CapabilityDisabled {
        /// The missing capability.
        capability: &'static str,
        /// The record's transaction-type code.
        code: u64,
    },

    /// The record buffer is shorter than its own counts require, or a string
    /// is unterminated.
    #[error("codec error: {0}")]
    Codec(#[from] zilreplay_codec::CodecError),

    /// The record decodes but is internally inconsistent.
    #[error("malformed record: {message}")]
    Malformed {
        /// Description of the inconsistency.
        message: String,
    },

    /// The record was written with a layout this engine cannot interpret.
    ///
    /// Only a corrupt log or one written by an incompatible version produces
    /// this. Replay of the whole log must stop.
    #[error("incompatible log layout: {message}")]
    IncompatibleLayout {
        /// Description of the mismatch.
        message: String,
    },

    /// An object-store primitive failed.
    #[error("store error: {0}")]
    Store(#[from] zilreplay_store::StoreError),
}

impl ReplayError {
    /// Creates a malformed-record error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates an incompatible-layout error.
    pub fn incompatible(message: impl Into<String>) -> Self {
        Self::IncompatibleLayout {
            message: message.into(),
        }
    }

    /// Returns true if replay of the remaining log must not continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::IncompatibleLayout { .. })
    }

    /// Returns true if the record was refused without being applied.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::Unsupported { .. } | Self::CapabilityDisabled { .. }
        )
    }
}
