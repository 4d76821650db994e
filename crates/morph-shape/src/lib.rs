//! Morph Shape Model
//!
//! Canonical, inspectable descriptions of data shapes and the runtime values
//! that inhabit them.
//!
//! # Core Concepts
//!
//! - [`Shape`]: Structural description (value, product, coproduct, container, opaque)
//! - [`ShapeModel`]: Root shape plus named definitions for recursive types
//! - [`ShapeId`]: Blake3 digest of a shape's canonical encoding
//! - [`Value`]: Concrete value transformed by a plan
//! - [`FieldPath`] / [`ValuePath`]: Addressing within shapes and values
//! - [`coercion_for`]: The fixed scalar coercion table
//!
//! # Example
//!
//! ```rust
//! use morph_shape::{ProductShape, Shape, ShapeModel};
//!
//! let dto = ShapeModel::new(
//!     ProductShape::new()
//!         .field("name", Shape::string())
//!         .optional_field("nickname", Shape::string())
//!         .into(),
//! );
//! let domain = ShapeModel::new(
//!     ProductShape::new()
//!         .field("name", Shape::string())
//!         .optional_field("nickname", Shape::string())
//!         .into(),
//! );
//!
//! // Independently declared, structurally equal
//! assert_eq!(dto.id(), domain.id());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod coercion;
mod id;
mod path;
mod shape;
mod tag;
mod value;

pub use coercion::{coercion_for, Coercion, CoercionError};
pub use id::{IdError, ShapeId};
pub use path::{FieldPath, PathError, Segment, ValuePath};
pub use shape::{
    CoproductShape, FieldShape, ProductShape, Shape, ShapeError, ShapeKind, ShapeModel,
    ShapeModelBuilder,
};
pub use tag::{Cardinality, ValueTag};
pub use value::Value;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
