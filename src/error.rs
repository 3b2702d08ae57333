//! Error types for table construction and the open-addressing placement path.

use thiserror::Error;

/// Rejected construction parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Probing mode name other than `linear` or `double`.
    #[error("unknown probing mode {0:?}; expected \"linear\" or \"double\"")]
    UnknownProbeMode(String),
}

/// Internal-invariant violations surfaced by table operations.
///
/// Absence of a key is never reported through this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Every attempt of the probe sequence hit a live entry with a different key.
    #[error("probe sequence exhausted after {attempts} attempts at capacity {capacity}")]
    ProbeExhausted { capacity: usize, attempts: usize },
}
