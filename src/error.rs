//! Crate-level error type for persisted learning data.
//!
//! Port-level failures (`StorageError`, `ConfigError`) live next to their
//! traits in [`crate::app::ports`]. This type wraps them together with the
//! integrity failures that can occur while decoding a stored learning
//! record. Every variant is `Copy` so it can be logged and dropped without
//! allocation; none of them is fatal to the controller.

use core::fmt;

use crate::app::ports::StorageError;

/// Failure while loading or decoding the persisted learning matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The storage backend failed or holds no record.
    Storage(StorageError),
    /// The stored blob has the wrong size (e.g. an older slot layout).
    RecordLength { expected: usize, found: usize },
    /// The additive checksum does not match the stored cells.
    ChecksumMismatch { expected: u32, found: u32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::RecordLength { expected, found } => {
                write!(f, "record length {found} (expected {expected})")
            }
            Self::ChecksumMismatch { expected, found } => {
                write!(f, "checksum mismatch (expected 0x{expected:08X}, got 0x{found:08X})")
            }
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
