//! Error types produced by the restructuring engine.
//!
//! All errors here are fatal: there is no retry path, and a caller that
//! observes an `Err` should discard the [`crate::Scfg`] it came from rather
//! than attempt to continue operating on it (see spec §7).

/// The result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced while restructuring or (de)serializing a [`crate::Scfg`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input graph violates one of the closed-adjacency / backedge
    /// invariants expected of a frontend-supplied graph (spec §3, invariants
    /// 1–2).
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// An analysis precondition was violated: an empty dominator seed set,
    /// a non-unique head, a linear-walk assertion failing during branch
    /// restructuring, and so on (spec §7).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A code path that the algorithm's case analysis asserts is
    /// unreachable was reached; this always indicates a logic bug in the
    /// restructurer itself (spec §7).
    #[error("unreachable state: {0}")]
    Unreachable(String),

    /// Serialization to the dict/YAML form failed.
    #[error("failed to serialize scfg: {0}")]
    Serialize(String),

    /// Deserialization from the dict/YAML form failed.
    #[error("failed to deserialize scfg: {0}")]
    Deserialize(String),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedGraph(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub(crate) fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }
}
