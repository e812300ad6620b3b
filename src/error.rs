//! Error kinds for the engine.
//!
//! Mirrors the semantic categories of the error design: validation errors at
//! construction time, conflicts during propagation/unification, cancellation
//! of a running search, and internal invariant violations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VulcanError {
    /// Rejected at construction time: the model is left unmodified.
    #[error("validation error: {0}")]
    Validation(String),

    /// A store branch failed: empty domain, violated check, or an
    /// occurs-check violation during unification. Local to the branch; does
    /// not poison the model or sibling branches.
    #[error("conflict")]
    Conflict,

    /// Search was cancelled (deadline exceeded or explicit cancel). Carries
    /// the number of solutions already collected before cancellation.
    #[error("search cancelled after {partial} solution(s)")]
    Cancelled { partial: usize },

    /// A bug: the propagation loop exceeded its iteration safeguard, or an
    /// internal worklist invariant was violated.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

pub type VResult<T> = Result<T, VulcanError>;
