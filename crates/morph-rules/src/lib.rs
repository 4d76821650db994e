//! Morph Override Rules
//!
//! User-supplied rules that replace automatic field matching at specific
//! target paths, frozen into an immutable [`OverrideRegistry`].
//!
//! # Core Concepts
//!
//! - [`OverrideRule`]: Rename, constant, computed, variant default,
//!   partial computed, deep merge
//! - [`OverrideRegistry`]: At most one rule per target path
//! - [`DeriveFlags`]: Opt-in matching behaviours
//!
//! # Example
//!
//! ```rust
//! use morph_rules::{DeriveFlags, OverrideRegistry};
//! use morph_shape::Value;
//!
//! let registry = OverrideRegistry::builder()
//!     .rename("fullName", "name")
//!     .constant("schemaVersion", Value::Int(2))
//!     .flags(DeriveFlags::new().with_optional_defaults_to_none())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(registry.len(), 2);
//! assert!(registry.flags().optional_defaults_to_none);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod registry;
mod rule;

pub use registry::{OverrideRegistry, RegistryBuilder, RegistryError, RegistryId};
pub use rule::{ComputeFn, DeriveFlags, OverrideRule, PartialComputeFn, RuleKind, ValueThunk};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
