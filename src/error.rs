//! Crate-wide error taxonomy.
//!
//! Fatal variants propagate with `?` up to `main`, which prints one line to
//! stderr and exits with code 1. Recoverable variants are never returned from
//! the per-read passes; they are logged and the affected read is
//! dropped/truncated/deleted in place instead.

use std::path::PathBuf;

/// All errors this crate can raise.
#[derive(Debug, thiserror::Error)]
pub enum SffError {
    /// The input stream ended before a complete record could be read.
    #[error("{path}: truncated input ({context})")]
    IoTruncated {
        path: PathBuf,
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The input could not be opened or read at all.
    #[error("{path}: unreadable: {source}")]
    IoUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output could not be created or written.
    #[error("{path}: unwritable: {source}")]
    IoUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The magic number did not match `.sff`, even after a byte-swap attempt.
    #[error("{path}: bad magic number (expected 0x2e736666, got {found:#010x})")]
    BadMagic { path: PathBuf, found: u32 },

    /// A length field implied an absurd allocation.
    #[error("{path}: invalid format: {reason}")]
    FormatInvalid { path: PathBuf, reason: String },

    /// A read's UID was already registered in the store.
    #[error("duplicate UID '{uid}'")]
    DuplicateUid { uid: String },

    /// A read's effective length was below `AS_READ_MIN_LEN`.
    #[error("read '{uid}' too short ({len} < {min})")]
    ReadTooShort { uid: String, len: usize, min: usize },

    /// A read's effective length exceeded `AS_READ_MAX_LEN` and was truncated.
    #[error("read '{uid}' too long ({len} > {max}), truncated")]
    ReadTooLong { uid: String, len: usize, max: usize },

    /// A read contained an ambiguous base.
    #[error("read '{uid}' contains N")]
    ReadContainsN { uid: String },

    /// A read was found to be a prefix of another and was deleted.
    #[error("read '{uid}' is a prefix duplicate")]
    PrefixDuplicate { uid: String },

    /// Both halves of a split read matched the linker again.
    #[error("linker detected in both mates '{uid1}' and '{uid2}', deleted")]
    LinkerAmbiguous { uid1: String, uid2: String },

    /// A CLI usage or configuration error.
    #[error("usage error: {0}")]
    Config(String),
}

impl SffError {
    /// Whether this error is fatal (aborts the whole run) or merely logged.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SffError::IoTruncated { .. }
                | SffError::IoUnreadable { .. }
                | SffError::IoUnwritable { .. }
                | SffError::BadMagic { .. }
                | SffError::FormatInvalid { .. }
                | SffError::Config(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SffError>;
