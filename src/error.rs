//! Error types for store access and engine operations
//!
//! Store failures are classified by how the engine reacts:
//! - IndexUnavailable: the planner switches to the scan fallback
//! - Transient: the kind loads empty this cycle and retries cleanly on the
//!   next navigation or refresh
//!
//! Storage failures never cross the engine boundary as panics; they land in
//! the month load report as per-kind diagnostics.

use thiserror::Error;

use crate::types::ActivityKind;

/// Errors surfaced by an [`ActivityStore`](crate::store::ActivityStore).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The range index for this kind is missing or still building. The
    /// planner recovers locally by scanning; this is never user-blocking.
    #[error("Range index unavailable for {kind}: {detail}")]
    IndexUnavailable { kind: ActivityKind, detail: String },

    /// The backend dropped or rejected the request; a later retry of the
    /// same query may succeed unchanged.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Backend-reported failure that is not an index problem.
    #[error("Store backend error: {0}")]
    Backend(String),

    /// The owner scope was rejected (unknown user id).
    #[error("Unknown owner: {0}")]
    UnknownOwner(String),
}

impl StoreError {
    /// True for the missing-range-index case the planner recovers from by
    /// falling back to an unbounded scan.
    pub fn is_index_unavailable(&self) -> bool {
        matches!(self, StoreError::IndexUnavailable { .. })
    }

    /// True when retrying the same query later may succeed unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Errors from engine construction.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),
}
