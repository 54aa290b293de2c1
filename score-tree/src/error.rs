//! Errors raised while building and transforming score trees.
//!
//! Structural queries (`is_measured`, `is_flat`, ...) never fail, they
//! answer `false` on malformed trees. Everything that can violate an
//! invariant returns [ScoreResult] and fails before touching the tree.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScoreError {
    #[error("Ownership violation: {0}")]
    OwnershipViolation(String),
    #[error("Onset of {0} is not resolved yet")]
    UnresolvedOnset(String),
    #[error("Malformed pitch name: `{name}` ({reason})")]
    MalformedPitchName { name: String, reason: String },
    #[error("Can not resolve tie: {0}")]
    TieResolution(String),
    #[error(
        "TimeMap breakpoints must be ascending: \
        got beat {beat}, last beat is {last}"
    )]
    NonMonotonicTimeMap { beat: f64, last: f64 },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
pub type ScoreResult<T> = Result<T, ScoreError>;

impl ScoreError {
    pub(crate) fn malformed_pitch(
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedPitchName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
