//! Derivation-time diagnostics
//!
//! Planning never stops at the first structural problem. Every failure is
//! recorded as a [`Diagnostic`] and the complete [`DiagnosticSet`] is
//! returned when the plan is rejected.

use morph_shape::{FieldPath, ShapeKind, ValueTag};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// A structural reason a plan cannot be derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Target field has no source accessor and no fallback
    #[error("{path}: no source accessor")]
    MissingAccessor { path: FieldPath },

    /// Source variant has no target counterpart
    #[error("{path}: source variant `{variant}` has no target variant")]
    UnmatchedSourceVariant { path: FieldPath, variant: String },

    /// Override rule resolves to no target node or is shadowed by an
    /// ancestor rule
    #[error("{path}: override does not apply to any target node")]
    AmbiguousOverridePath { path: FieldPath },

    /// Scalar tags differ and the coercion table has no entry
    #[error("{path}: no coercion from {from} to {to}")]
    UnsupportedCoercion {
        path: FieldPath,
        from: ValueTag,
        to: ValueTag,
    },

    /// Structural recursion went past the configured depth
    #[error("{path}: recursion depth exceeded")]
    RecursionDepthExceeded { path: FieldPath },

    /// Source and target nodes are of unrelated kinds
    #[error("{path}: cannot map {from} to {to}")]
    IncompatibleShapes {
        path: FieldPath,
        from: ShapeKind,
        to: ShapeKind,
    },

    /// Optional source feeds a required target without a default
    #[error("{path}: optional source needs a default for the absent case")]
    UnsupportedOptionalUnwrap { path: FieldPath },

    /// Shape reference names no definition
    #[error("{path}: unknown shape reference `{name}`")]
    UnknownShapeRef { path: FieldPath, name: String },

    /// Patch field has no target counterpart
    #[error("{path}: patch field `{field}` has no target field")]
    UnusedPatchField { path: FieldPath, field: String },
}

impl Diagnostic {
    /// Target path the diagnostic refers to
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        match self {
            Self::MissingAccessor { path }
            | Self::UnmatchedSourceVariant { path, .. }
            | Self::AmbiguousOverridePath { path }
            | Self::UnsupportedCoercion { path, .. }
            | Self::RecursionDepthExceeded { path }
            | Self::IncompatibleShapes { path, .. }
            | Self::UnsupportedOptionalUnwrap { path }
            | Self::UnknownShapeRef { path, .. }
            | Self::UnusedPatchField { path, .. } => path,
        }
    }
}

/// Every diagnostic from one derivation attempt, in depth-first order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticSet(Vec<Diagnostic>);

impl DiagnosticSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Any diagnostic matches `predicate`
    pub fn any(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.0.iter().any(predicate)
    }

    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl Display for DiagnosticSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} derivation diagnostic(s)", self.0.len())?;
        for d in &self.0 {
            write!(f, "\n  - {d}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DiagnosticSet {}

impl IntoIterator for DiagnosticSet {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Diagnostic> for DiagnosticSet {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_diagnostic() {
        let set: DiagnosticSet = [
            Diagnostic::MissingAccessor {
                path: FieldPath::single("nickname"),
            },
            Diagnostic::UnsupportedCoercion {
                path: FieldPath::single("age"),
                from: ValueTag::Bool,
                to: ValueTag::I32,
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(
            set.to_string(),
            "2 derivation diagnostic(s)\n  - nickname: no source accessor\n  - age: no coercion from bool to i32"
        );
        assert_eq!(set.iter().next().map(Diagnostic::path), Some(&FieldPath::single("nickname")));
    }
}
