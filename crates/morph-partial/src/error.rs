//! Execution-time errors and their path-tagged collections

use morph_shape::{CoercionError, Segment, ValuePath, ValueTag};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Value-level failure raised while executing a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ExecError {
    /// An optional was absent where a value was required
    #[error("empty optional value")]
    EmptyOptionalValue,

    /// Numeric value does not fit the target tag
    #[error("{value} is out of range for {to} (from {from})")]
    CoercionOutOfRange {
        from: ValueTag,
        to: ValueTag,
        value: String,
    },

    /// String does not parse as the target tag
    #[error("cannot parse {input:?} as {to}")]
    CoercionParse { to: ValueTag, input: String },

    /// Rejected by a user-supplied fallible step
    #[error("validation failed: {0}")]
    CustomValidationFailure(String),

    /// Source value does not have the structure the plan was derived for
    #[error("expected {expected}, found {found}")]
    ShapeMismatch {
        expected: String,
        found: &'static str,
    },
}

impl ExecError {
    /// Convenience constructor for user validation failures
    #[inline]
    #[must_use]
    pub fn custom(message: impl Into<String>) -> Self {
        Self::CustomValidationFailure(message.into())
    }
}

impl From<CoercionError> for ExecError {
    fn from(err: CoercionError) -> Self {
        match err {
            CoercionError::OutOfRange { from, to, value } => {
                Self::CoercionOutOfRange { from, to, value }
            }
            CoercionError::Parse { to, input } => Self::CoercionParse { to, input },
            CoercionError::Mismatch { expected, found } => Self::ShapeMismatch {
                expected: expected.to_string(),
                found,
            },
        }
    }
}

/// An [`ExecError`] and where it happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathedError {
    pub path: ValuePath,
    pub error: ExecError,
}

impl Display for PathedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "<root>: {}", self.error)
        } else {
            write!(f, "{}: {}", self.path, self.error)
        }
    }
}

/// Non-empty, ordered list of path-tagged failures
///
/// Order is the depth-first, left-to-right order in which failures were
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Errors(Vec<PathedError>);

impl Errors {
    /// Single failure at the current (root) position
    #[inline]
    #[must_use]
    pub fn single(error: ExecError) -> Self {
        Self(vec![PathedError {
            path: ValuePath::root(),
            error,
        }])
    }

    /// Build from a list; `None` when the list is empty
    #[must_use]
    pub fn from_vec(errors: Vec<PathedError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The earliest failure
    #[inline]
    #[must_use]
    pub fn first(&self) -> &PathedError {
        &self.0[0]
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PathedError> {
        self.0.iter()
    }

    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<PathedError> {
        self.0
    }

    /// Prefix every path with `segment`
    pub fn prepend(&mut self, segment: &Segment) {
        for e in &mut self.0 {
            e.path.prepend(segment.clone());
        }
    }

    /// Drop every failure after the earliest
    pub fn keep_first(&mut self) {
        self.0.truncate(1);
    }

    /// Append `other`'s failures after this one's
    pub fn append(&mut self, other: Errors) {
        self.0.extend(other.0);
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl IntoIterator for Errors {
    type Item = PathedError;
    type IntoIter = std::vec::IntoIter<PathedError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
