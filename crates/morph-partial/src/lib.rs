//! Morph Partial Results
//!
//! Error-accumulating and short-circuiting results with path information,
//! used while executing transformation plans.
//!
//! # Core Concepts
//!
//! - [`PartialResult`]: `Success(value)` or `Failure(errors)`
//! - [`Errors`]: Non-empty ordered list of [`PathedError`]s
//! - [`ExecError`]: Value-level failure kinds
//! - [`ErrorMode`]: Accumulate every failure, or stop at the first
//! - [`traverse`] / [`Accumulator`]: Combine sibling results in order
//!
//! # Example
//!
//! ```rust
//! use morph_partial::{traverse, ErrorMode, ExecError, PartialResult};
//! use morph_shape::Segment;
//!
//! let fields = ["1", "x", "y"].map(|raw| {
//!     move || {
//!         let parsed: PartialResult<i32> = raw
//!             .parse::<i32>()
//!             .map_err(|_| ExecError::custom("not a number"))
//!             .into();
//!         parsed.prepend_path(Segment::Field(raw.to_string()))
//!     }
//! });
//!
//! let result = traverse(fields, ErrorMode::Accumulate);
//! assert_eq!(result.errors().map(|e| e.len()), Some(2));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod result;

pub use error::{Errors, ExecError, PathedError};
pub use result::{traverse, Accumulator, ErrorMode, PartialResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod laws {
    use super::*;
    use morph_shape::Segment;
    use proptest::prelude::*;

    fn outcome(i: usize, ok: bool) -> PartialResult<usize> {
        if ok {
            PartialResult::success(i)
        } else {
            PartialResult::failure(ExecError::custom(i.to_string())).prepend_path(Segment::Index(i))
        }
    }

    proptest! {
        #[test]
        fn accumulate_reports_every_failure_in_order(oks in proptest::collection::vec(any::<bool>(), 0..32)) {
            let items = oks.iter().enumerate().map(|(i, ok)| move || outcome(i, *ok));
            let result = traverse(items, ErrorMode::Accumulate);
            let expected: Vec<usize> = oks.iter().enumerate().filter(|(_, ok)| !**ok).map(|(i, _)| i).collect();

            match result {
                PartialResult::Success(values) => {
                    prop_assert!(expected.is_empty());
                    prop_assert_eq!(values.len(), oks.len());
                }
                PartialResult::Failure(errors) => {
                    let got: Vec<usize> = errors
                        .iter()
                        .map(|e| match e.path.segments() {
                            [Segment::Index(i)] => *i,
                            _ => usize::MAX,
                        })
                        .collect();
                    prop_assert_eq!(got, expected);
                }
            }
        }

        #[test]
        fn fail_fast_reports_only_the_first(oks in proptest::collection::vec(any::<bool>(), 0..32)) {
            let items = oks.iter().enumerate().map(|(i, ok)| move || outcome(i, *ok));
            let result = traverse(items, ErrorMode::FailFast);
            let first = oks.iter().position(|ok| !ok);

            match (result, first) {
                (PartialResult::Success(_), None) => {}
                (PartialResult::Failure(errors), Some(i)) => {
                    prop_assert_eq!(errors.len(), 1);
                    prop_assert_eq!(errors.first().path.segments(), &[Segment::Index(i)]);
                }
                _ => prop_assert!(false, "fail-fast outcome disagrees with input"),
            }
        }
    }
}
