//! Error type shared by every pooling kernel.

use thiserror::Error;

/// Why a pooling call failed.
///
/// Output rows written before a per-bag failure (`SegmentOverrun`,
/// `NegativeLength`, `InvalidIndex`) are left in place, and `CursorMismatch`
/// is only detected after every row has been written. Callers must discard
/// the whole output buffer on any error. `InvalidConfig` is raised before
/// the first row is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("bag {row} of length {len} at cursor {cursor} overruns index_size {index_size}")]
    SegmentOverrun {
        row: usize,
        cursor: usize,
        len: usize,
        index_size: usize,
    },
    #[error("bag {row} has negative length {len}")]
    NegativeLength { row: usize, len: i64 },
    #[error("row id {index} at position {position} outside [0, {bound})")]
    InvalidIndex {
        position: usize,
        index: i64,
        bound: usize,
    },
    #[error("bags consumed {cursor} indices, expected {index_size}")]
    CursorMismatch { cursor: usize, index_size: usize },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type PoolResult<T> = Result<T, PoolError>;

impl From<String> for PoolError {
    fn from(msg: String) -> Self {
        PoolError::InvalidConfig(msg)
    }
}

/// Collapse a kernel result into the boolean contract, logging the cause.
#[inline]
pub(crate) fn report(kernel: &'static str, result: PoolResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            log::debug!("{kernel} failed: {err}");
            false
        }
    }
}
