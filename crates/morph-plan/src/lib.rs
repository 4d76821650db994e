//! Morph Matching Planner
//!
//! Derives a complete, value-independent [`Plan`] from a source shape, a
//! target shape and an override registry, or rejects the pair with every
//! structural problem found.
//!
//! # Core Concepts
//!
//! - [`Planner`]: Fixed-precedence matching over the target shape
//! - [`Plan`] / [`PlanNode`]: Sealed tree mirroring the target shape
//! - [`PatchPlan`] / [`PatchStep`]: Per-field merge of a sparse patch
//! - [`Diagnostic`] / [`DiagnosticSet`]: Structural failures with paths
//!
//! # Example
//!
//! ```rust
//! use morph_plan::{Diagnostic, Planner};
//! use morph_rules::OverrideRegistry;
//! use morph_shape::{ProductShape, Shape, ShapeModel};
//!
//! let source = ShapeModel::new(ProductShape::new().field("name", Shape::string()).into());
//! let target = ShapeModel::new(
//!     ProductShape::new()
//!         .field("name", Shape::string())
//!         .field("email", Shape::string())
//!         .into(),
//! );
//!
//! let diagnostics = Planner::new(&source, &target, &OverrideRegistry::empty())
//!     .derive()
//!     .unwrap_err();
//! assert!(diagnostics.any(|d| matches!(d, Diagnostic::MissingAccessor { .. })));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod diagnostic;
mod plan;
mod planner;

pub use diagnostic::{Diagnostic, DiagnosticSet};
pub use plan::{
    Accessor, AccessorKind, FieldStep, OverrideStep, PatchField, PatchPlan, PatchStep, Plan,
    PlanKey, PlanNode, ProductPlan, SlotId, VariantCase, VariantTarget,
};
pub use planner::{Planner, PlannerConfig, DEFAULT_MAX_DEPTH};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
