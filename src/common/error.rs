//! Error types for maxmem.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in maxmem.
///
/// Eviction failures are terminal for the command that triggered them: the
/// caller must reject any operation that would grow memory further.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error, e.g. failing to spawn a background worker.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Memory is over the ceiling and the active policy is `noeviction`.
    ///
    /// No key was deleted.
    #[error("eviction forbidden by policy: {to_free} bytes over maxmemory (ratio {ratio:.2})")]
    EvictionForbidden {
        /// Bytes the dataset is over the ceiling.
        to_free: usize,
        /// Logical usage divided by the ceiling.
        ratio: f32,
    },

    /// Memory is over the ceiling and nothing evictable was found.
    ///
    /// Raised only after any pending lazy-free work has drained.
    #[error("no evictable keys left: {owed} bytes still over maxmemory (ratio {ratio:.2})")]
    EvictionExhausted {
        /// Bytes still owed after the cycle.
        owed: usize,
        /// Logical usage divided by the ceiling.
        ratio: f32,
    },

    /// A `maxmemory-policy` name that doesn't match any policy.
    #[error("invalid maxmemory policy: {0}")]
    InvalidPolicy(String),

    /// A configuration value out of its allowed range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl Error {
    /// Whether this is one of the out-of-memory outcomes of an eviction cycle.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(
            self,
            Error::EvictionForbidden { .. } | Error::EvictionExhausted { .. }
        )
    }
}
