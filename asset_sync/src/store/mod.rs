//! CSV-backed persistence for everything the pipeline produces.
//!
//! - [`dataset::DatasetStore`]: one append-only price series per symbol.
//! - [`dominance::DominanceSeries`]: the long-running dominance ratio file.
//! - [`snapshot::SnapshotWriter`]: per-day option chain snapshots, written atomically.
//!
//! A missing file is never an error here; it simply means "nothing stored yet".

use std::{io, path::PathBuf};

pub mod dataset;
pub mod dominance;
pub mod snapshot;

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading or writing stored series.
pub enum StoreError {
    #[error("corrupt dataset {}: {reason}", path.display())]
    /// The file exists but its content cannot be trusted (bad header,
    /// unparsable row, timestamps out of order).
    Corrupt {
        /// File that failed validation.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    #[error("i/o error on {}: {source}", path.display())]
    /// The storage medium failed for a reason other than "not found".
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
