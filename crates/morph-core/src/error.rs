//! Error types for the entry points
//!
//! Planning failures are returned as errors. Value-level failures are not:
//! they come back inside the [`PartialResult`](morph_partial::PartialResult)
//! so the caller sees every path.

use morph_plan::DiagnosticSet;

/// A plan could not be derived
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeriveError {
    /// The shapes cannot be matched under the registry
    #[error("plan derivation failed: {0}")]
    Rejected(#[from] DiagnosticSet),
}

impl DeriveError {
    /// Every structural problem found, in depth-first order
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticSet {
        match self {
            Self::Rejected(set) => set,
        }
    }
}

/// A patch plan could not be derived
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// The patch shape cannot be merged into the target shape
    #[error("patch derivation failed: {0}")]
    Rejected(#[from] DiagnosticSet),
}

impl PatchError {
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticSet {
        match self {
            Self::Rejected(set) => set,
        }
    }
}
