//! Morph - structural shape-to-shape transformation
//!
//! Derives a transformation plan from a source shape, a target shape and a
//! registry of overrides, then runs it against concrete values.
//!
//! # Core Concepts
//!
//! - [`Engine`]: Derivation with a plan cache, execution and patching
//! - [`EngineConfig`]: Depth limit, cache capacity and default error mode
//! - [`derive`] / [`transform`] / [`patch`]: Free functions over a shared default engine
//!
//! Derivation either yields a complete [`Plan`] or every structural
//! diagnostic at once. Execution never fails structurally; value-level
//! failures come back as a [`PartialResult`] carrying paths.
//!
//! # Example
//!
//! ```rust
//! use morph_core::{OverrideRegistry, ProductShape, Shape, ShapeModel, Value};
//!
//! let dto = ShapeModel::new(
//!     ProductShape::new()
//!         .field("name", Shape::string())
//!         .field("age", Shape::string())
//!         .into(),
//! );
//! let person = ShapeModel::new(
//!     ProductShape::new()
//!         .field("fullName", Shape::string())
//!         .field("age", Shape::i32())
//!         .into(),
//! );
//! let registry = OverrideRegistry::builder()
//!     .rename("fullName", "name")
//!     .build()
//!     .unwrap();
//!
//! let plan = morph_core::derive(&dto, &person, &registry).unwrap();
//! let input = Value::record([("name", Value::str("Ada")), ("age", Value::str("36"))]);
//! let out = morph_core::transform(&plan, &input, false).ok().unwrap();
//! assert_eq!(out.get("age"), Some(&Value::Int(36)));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;

pub use cache::PlanCache;
pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::{DeriveError, PatchError};

pub use morph_partial::{ErrorMode, Errors, ExecError, PartialResult, PathedError};
pub use morph_plan::{Diagnostic, DiagnosticSet, PatchPlan, Plan, PlanKey};
pub use morph_rules::{DeriveFlags, OverrideRegistry, OverrideRule, RegistryBuilder, RegistryError};
pub use morph_shape::{
    Cardinality, CoproductShape, FieldPath, ProductShape, Shape, ShapeId, ShapeModel, ValuePath,
    ValueTag, Value,
};

use once_cell::sync::Lazy;
use std::sync::Arc;

static DEFAULT_ENGINE: Lazy<Engine> = Lazy::new(Engine::default);

/// Engine behind the free functions, with default configuration
#[inline]
#[must_use]
pub fn default_engine() -> &'static Engine {
    &DEFAULT_ENGINE
}

/// Derive a plan with the default engine
///
/// # Errors
/// Returns every structural diagnostic if the shapes cannot be matched.
pub fn derive(
    source: &ShapeModel,
    target: &ShapeModel,
    registry: &OverrideRegistry,
) -> Result<Arc<Plan>, DeriveError> {
    DEFAULT_ENGINE.derive(source, target, registry)
}

/// Run a plan against one source value
pub fn transform(plan: &Plan, value: &Value, fail_fast: bool) -> PartialResult<Value> {
    DEFAULT_ENGINE.transform(plan, value, fail_fast)
}

/// Merge a patch into an existing value with the default engine
///
/// # Errors
/// Returns error if no patch plan can be derived.
pub fn patch(
    target: &ShapeModel,
    existing: &Value,
    patch_shape: &ShapeModel,
    patch_value: &Value,
) -> Result<PartialResult<Value>, PatchError> {
    DEFAULT_ENGINE.patch(target, existing, patch_shape, patch_value)
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Morph
    pub use crate::{
        DeriveFlags, Engine, EngineConfig, ErrorMode, OverrideRegistry, PartialResult, ProductShape,
        Shape, ShapeModel, Value,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
