//! The partial result monoid
//!
//! [`PartialResult`] is either a fully-formed value or an ordered list of
//! path-tagged failures. Results combine according to an [`ErrorMode`]:
//! accumulate keeps every failure from both sides, fail-fast stops at the
//! first failure and never evaluates the work after it.

use crate::error::{Errors, ExecError};
use morph_shape::Segment;
use std::ops::ControlFlow;

/// How failures combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Collect every failure in depth-first, left-to-right order
    #[default]
    Accumulate,
    /// Return the first failure and skip remaining siblings
    FailFast,
}

impl ErrorMode {
    #[inline]
    #[must_use]
    pub const fn from_fail_fast(fail_fast: bool) -> Self {
        if fail_fast {
            Self::FailFast
        } else {
            Self::Accumulate
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_fail_fast(self) -> bool {
        matches!(self, Self::FailFast)
    }
}

impl From<bool> for ErrorMode {
    fn from(fail_fast: bool) -> Self {
        Self::from_fail_fast(fail_fast)
    }
}

/// Success, or accumulated failures with paths
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum PartialResult<T> {
    Success(T),
    Failure(Errors),
}

impl<T> PartialResult<T> {
    #[inline]
    pub fn success(value: T) -> Self {
        Self::Success(value)
    }

    /// Failure at the current position
    #[inline]
    pub fn failure(error: ExecError) -> Self {
        Self::Failure(Errors::single(error))
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    #[inline]
    pub fn map<U, F>(self, f: F) -> PartialResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(v) => PartialResult::Success(f(v)),
            Self::Failure(e) => PartialResult::Failure(e),
        }
    }

    #[inline]
    pub fn and_then<U, F>(self, f: F) -> PartialResult<U>
    where
        F: FnOnce(T) -> PartialResult<U>,
    {
        match self {
            Self::Success(v) => f(v),
            Self::Failure(e) => PartialResult::Failure(e),
        }
    }

    /// Continue with `f`, attributing its failures to `segment`
    pub fn flat_map_with_path<U, F>(self, segment: Segment, f: F) -> PartialResult<U>
    where
        F: FnOnce(T) -> PartialResult<U>,
    {
        self.and_then(f).prepend_path(segment)
    }

    /// Prefix all failure paths with `segment`
    pub fn prepend_path(mut self, segment: Segment) -> Self {
        if let Self::Failure(errors) = &mut self {
            errors.prepend(&segment);
        }
        self
    }

    /// Trim to the earliest failure when `mode` is fail-fast
    ///
    /// A single step, such as a user validation, may report several
    /// failures at once; fail-fast callers only ever see the first.
    pub fn in_mode(mut self, mode: ErrorMode) -> Self {
        if let (Self::Failure(errors), true) = (&mut self, mode.is_fail_fast()) {
            errors.keep_first();
        }
        self
    }

    /// Combine two already evaluated results
    ///
    /// Both successes are merged by `f`. In accumulate mode failures of both
    /// sides are kept, left first. In fail-fast mode only the first failure
    /// is returned.
    pub fn combine<U, V, F>(self, other: PartialResult<U>, mode: ErrorMode, f: F) -> PartialResult<V>
    where
        F: FnOnce(T, U) -> V,
    {
        let combined = match (self, other) {
            (Self::Success(a), PartialResult::Success(b)) => PartialResult::Success(f(a, b)),
            (Self::Failure(e), PartialResult::Success(_)) => PartialResult::Failure(e),
            (Self::Success(_), PartialResult::Failure(e)) => PartialResult::Failure(e),
            (Self::Failure(mut left), PartialResult::Failure(right)) => {
                if !mode.is_fail_fast() {
                    left.append(right);
                }
                PartialResult::Failure(left)
            }
        };
        combined.in_mode(mode)
    }

    /// Combine with a right side that is only evaluated when needed
    ///
    /// In fail-fast mode a failing left side short-circuits and `other` is
    /// never called.
    pub fn combine_lazy<U, V, G, F>(self, mode: ErrorMode, other: G, f: F) -> PartialResult<V>
    where
        G: FnOnce() -> PartialResult<U>,
        F: FnOnce(T, U) -> V,
    {
        if mode.is_fail_fast() {
            if let Self::Failure(e) = self {
                return PartialResult::Failure(e).in_mode(mode);
            }
        }
        self.combine(other(), mode, f)
    }

    /// The failures, if any
    #[inline]
    #[must_use]
    pub fn errors(&self) -> Option<&Errors> {
        match self {
            Self::Success(_) => None,
            Self::Failure(e) => Some(e),
        }
    }

    /// The value, if successful
    #[inline]
    #[must_use]
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(v) => Some(v),
            Self::Failure(_) => None,
        }
    }

    /// Convert into a standard `Result`
    ///
    /// # Errors
    /// Returns the accumulated failures
    #[inline]
    pub fn into_result(self) -> Result<T, Errors> {
        match self {
            Self::Success(v) => Ok(v),
            Self::Failure(e) => Err(e),
        }
    }
}

impl<T> From<Result<T, ExecError>> for PartialResult<T> {
    fn from(result: Result<T, ExecError>) -> Self {
        match result {
            Ok(v) => Self::Success(v),
            Err(e) => Self::failure(e),
        }
    }
}

/// Incremental collector for sibling results
///
/// Feed results in depth-first order with [`push`](Self::push); stop feeding
/// once it returns `Break`.
#[derive(Debug)]
pub struct Accumulator<T> {
    values: Vec<T>,
    errors: Option<Errors>,
    mode: ErrorMode,
}

impl<T> Accumulator<T> {
    #[inline]
    #[must_use]
    pub fn new(mode: ErrorMode) -> Self {
        Self {
            values: Vec::new(),
            errors: None,
            mode,
        }
    }

    /// Record one result; `Break` means remaining siblings must be skipped
    pub fn push(&mut self, result: PartialResult<T>) -> ControlFlow<()> {
        match result {
            PartialResult::Success(v) => {
                if self.errors.is_none() {
                    self.values.push(v);
                }
            }
            PartialResult::Failure(mut e) => {
                if self.mode.is_fail_fast() {
                    e.keep_first();
                }
                match &mut self.errors {
                    Some(existing) => existing.append(e),
                    None => self.errors = Some(e),
                }
                if self.mode.is_fail_fast() {
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// All pushed values, or every recorded failure
    pub fn finish(self) -> PartialResult<Vec<T>> {
        match self.errors {
            Some(e) => PartialResult::Failure(e),
            None => PartialResult::Success(self.values),
        }
    }
}

/// Evaluate lazy items in order, collecting values or failures
///
/// In fail-fast mode items after the first failure are never evaluated.
pub fn traverse<T, I, F>(items: I, mode: ErrorMode) -> PartialResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> PartialResult<T>,
{
    let mut acc = Accumulator::new(mode);
    for item in items {
        if acc.push(item()).is_break() {
            break;
        }
    }
    acc.finish()
}
