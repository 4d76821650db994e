//! Morph Synthesizer
//!
//! Executes sealed plans against concrete values.
//!
//! # Core Concepts
//!
//! - [`execute`]: Build a target value from a source value
//! - [`apply_patch`]: Merge a sparse patch into an existing target value
//!
//! Both walk the plan depth-first, left to right, and report value-level
//! failures as a [`PartialResult`](morph_partial::PartialResult) whose
//! errors carry paths. [`ErrorMode`](morph_partial::ErrorMode) decides
//! between the first failure and all of them.
//!
//! # Example
//!
//! ```rust
//! use morph_partial::ErrorMode;
//! use morph_plan::Planner;
//! use morph_rules::OverrideRegistry;
//! use morph_shape::{ProductShape, Shape, ShapeModel, Value};
//!
//! let wire = ShapeModel::new(ProductShape::new().field("age", Shape::string()).into());
//! let domain = ShapeModel::new(ProductShape::new().field("age", Shape::i32()).into());
//! let plan = Planner::new(&wire, &domain, &OverrideRegistry::empty()).derive().unwrap();
//!
//! let result = morph_synth::execute(
//!     &plan,
//!     &Value::record([("age", Value::str("abc"))]),
//!     ErrorMode::Accumulate,
//! );
//! assert_eq!(result.errors().unwrap().first().path.to_string(), ".age");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod interpreter;
mod patcher;
mod synthesizer;

pub use patcher::apply_patch;
pub use synthesizer::execute;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
