//! Canonical shape descriptions
//!
//! A [`Shape`] is the structural description of a type. Shapes carry no
//! nominal identity: two independently declared types with the same fields
//! describe equal shapes, which is what lets the planner map between them.
//!
//! Self-referential types are described with [`Shape::Ref`], which names a
//! definition held by the enclosing [`ShapeModel`]. Every shape is therefore
//! a finite tree and can be shared read-only behind an `Arc`.

use crate::id::ShapeId;
use crate::tag::{Cardinality, ValueTag};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Structural description of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "def", rename_all = "snake_case")]
pub enum Shape {
    /// Opaque scalar
    Value(ValueTag),
    /// Record with named fields
    Product(ProductShape),
    /// Sum with named variants
    Coproduct(CoproductShape),
    /// Wrapper around an element shape
    Container {
        cardinality: Cardinality,
        element: Box<Shape>,
    },
    /// Type unknown to the engine, treated as atomic; equal names copy directly
    Opaque(String),
    /// Named definition of the enclosing [`ShapeModel`]
    Ref(String),
}

impl Shape {
    #[inline]
    #[must_use]
    pub const fn value(tag: ValueTag) -> Self {
        Self::Value(tag)
    }

    #[inline]
    #[must_use]
    pub const fn string() -> Self {
        Self::Value(ValueTag::String)
    }

    #[inline]
    #[must_use]
    pub const fn bool() -> Self {
        Self::Value(ValueTag::Bool)
    }

    #[inline]
    #[must_use]
    pub const fn i32() -> Self {
        Self::Value(ValueTag::I32)
    }

    #[inline]
    #[must_use]
    pub const fn i64() -> Self {
        Self::Value(ValueTag::I64)
    }

    #[inline]
    #[must_use]
    pub const fn unit() -> Self {
        Self::Value(ValueTag::Unit)
    }

    /// Wrap in a container of the given cardinality
    #[inline]
    #[must_use]
    pub fn container(cardinality: Cardinality, element: Shape) -> Self {
        Self::Container {
            cardinality,
            element: Box::new(element),
        }
    }

    #[inline]
    #[must_use]
    pub fn optional(element: Shape) -> Self {
        Self::container(Cardinality::Optional, element)
    }

    #[inline]
    #[must_use]
    pub fn seq(element: Shape) -> Self {
        Self::container(Cardinality::Sequence, element)
    }

    #[inline]
    #[must_use]
    pub fn map(element: Shape) -> Self {
        Self::container(Cardinality::Map, element)
    }

    #[inline]
    #[must_use]
    pub fn single(element: Shape) -> Self {
        Self::container(Cardinality::Single, element)
    }

    #[inline]
    #[must_use]
    pub fn opaque(name: impl Into<String>) -> Self {
        Self::Opaque(name.into())
    }

    #[inline]
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    /// Kind of this node, for diagnostics
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Value(tag) => ShapeKind::Value(*tag),
            Self::Product(_) => ShapeKind::Product,
            Self::Coproduct(_) => ShapeKind::Coproduct,
            Self::Container { cardinality, .. } => ShapeKind::Container(*cardinality),
            Self::Opaque(name) => ShapeKind::Opaque(name.clone()),
            Self::Ref(name) => ShapeKind::Ref(name.clone()),
        }
    }

    /// Element of an `Optional` container
    #[must_use]
    pub fn optional_element(&self) -> Option<&Shape> {
        match self {
            Self::Container {
                cardinality: Cardinality::Optional,
                element,
            } => Some(element),
            _ => None,
        }
    }
}

impl From<ProductShape> for Shape {
    fn from(product: ProductShape) -> Self {
        Self::Product(product)
    }
}

impl From<CoproductShape> for Shape {
    fn from(coproduct: CoproductShape) -> Self {
        Self::Coproduct(coproduct)
    }
}

/// Shape node kind, as reported by diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Value(ValueTag),
    Product,
    Coproduct,
    Container(Cardinality),
    Opaque(String),
    Ref(String),
}

impl Display for ShapeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(tag) => write!(f, "value<{tag}>"),
            Self::Product => f.write_str("product"),
            Self::Coproduct => f.write_str("coproduct"),
            Self::Container(c) => write!(f, "{c} container"),
            Self::Opaque(name) => write!(f, "opaque<{name}>"),
            Self::Ref(name) => write!(f, "ref<{name}>"),
        }
    }
}

/// A product field: its shape and optional default value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldShape {
    pub shape: Shape,
    pub default: Option<Value>,
}

impl FieldShape {
    #[inline]
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            default: None,
        }
    }

    /// Field shape is an `Optional` container
    #[inline]
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.shape.optional_element().is_some()
    }

    #[inline]
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Ordered named fields plus zero-argument accessor methods
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductShape {
    pub fields: IndexMap<String, FieldShape>,
    /// Alternate accessors, consulted only when discovery flags allow
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub methods: IndexMap<String, Shape>,
}

impl ProductShape {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.fields.insert(name.into(), FieldShape::new(shape));
        self
    }

    /// Add a field of shape `Optional<shape>`
    #[must_use]
    pub fn optional_field(self, name: impl Into<String>, shape: Shape) -> Self {
        self.field(name, Shape::optional(shape))
    }

    /// Add a field with a declared default value
    #[must_use]
    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        shape: Shape,
        default: Value,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldShape {
                shape,
                default: Some(default),
            },
        );
        self
    }

    /// Add a zero-argument accessor method
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.methods.insert(name.into(), shape);
        self
    }
}

/// Ordered named variants; an empty payload is `Value(Unit)`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoproductShape {
    pub variants: IndexMap<String, Shape>,
}

impl CoproductShape {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn variant(mut self, name: impl Into<String>, payload: Shape) -> Self {
        self.variants.insert(name.into(), payload);
        self
    }

    #[must_use]
    pub fn unit_variant(self, name: impl Into<String>) -> Self {
        self.variant(name, Shape::unit())
    }
}

#[derive(Debug)]
struct ModelInner {
    root: Shape,
    definitions: BTreeMap<String, Shape>,
    definition_ids: BTreeMap<String, ShapeId>,
    id: ShapeId,
}

/// A root shape together with the named definitions its `Ref`s point to
///
/// Constructed once per described type and immutable afterwards; clones
/// share the same allocation.
#[derive(Debug, Clone)]
pub struct ShapeModel(Arc<ModelInner>);

impl ShapeModel {
    /// Model without definitions
    #[must_use]
    pub fn new(root: Shape) -> Self {
        Self::builder(root).build()
    }

    #[must_use]
    pub fn builder(root: Shape) -> ShapeModelBuilder {
        ShapeModelBuilder {
            root,
            definitions: BTreeMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Shape {
        &self.0.root
    }

    /// Structural id of the whole model
    #[inline]
    #[must_use]
    pub fn id(&self) -> ShapeId {
        self.0.id
    }

    #[inline]
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&Shape> {
        self.0.definitions.get(name)
    }

    /// Structural id of one named definition
    #[inline]
    #[must_use]
    pub fn definition_id(&self, name: &str) -> Option<ShapeId> {
        self.0.definition_ids.get(name).copied()
    }

    /// Follow `Ref`s until a concrete node is reached
    ///
    /// # Errors
    /// Returns error if a ref names no definition or refs form a cycle
    /// without any concrete node in between.
    pub fn resolve<'a>(&'a self, mut shape: &'a Shape) -> Result<&'a Shape, ShapeError> {
        let mut hops = 0;
        while let Shape::Ref(name) = shape {
            if hops > self.0.definitions.len() {
                return Err(ShapeError::RefCycle(name.clone()));
            }
            shape = self
                .definition(name)
                .ok_or_else(|| ShapeError::UnknownRef(name.clone()))?;
            hops += 1;
        }
        Ok(shape)
    }

    /// Check that a value is admitted by a shape of this model
    #[must_use]
    pub fn admits(&self, shape: &Shape, value: &Value) -> bool {
        let Ok(shape) = self.resolve(shape) else {
            return false;
        };
        match (shape, value) {
            (Shape::Value(tag), v) => scalar_admits(*tag, v),
            (Shape::Product(product), Value::Record(entries)) => {
                product.fields.iter().all(|(name, field)| {
                    entries
                        .get(name)
                        .is_some_and(|v| self.admits(&field.shape, v))
                })
            }
            (Shape::Coproduct(coproduct), Value::Variant { name, payload }) => coproduct
                .variants
                .get(name)
                .is_some_and(|p| self.admits(p, payload)),
            (Shape::Container { cardinality, element }, v) => match (cardinality, v) {
                (Cardinality::Single, v) => self.admits(element, v),
                (Cardinality::Optional, Value::Opt(inner)) => {
                    inner.as_deref().map_or(true, |v| self.admits(element, v))
                }
                (Cardinality::Sequence, Value::Seq(items)) => {
                    items.iter().all(|v| self.admits(element, v))
                }
                (Cardinality::Map, Value::Map(entries)) => {
                    entries.values().all(|v| self.admits(element, v))
                }
                _ => false,
            },
            (Shape::Opaque(_), Value::Opaque(_)) => true,
            _ => false,
        }
    }
}

impl PartialEq for ShapeModel {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ShapeModel {}

fn scalar_admits(tag: ValueTag, value: &Value) -> bool {
    match (tag, value) {
        (ValueTag::Unit, Value::Unit)
        | (ValueTag::Bool, Value::Bool(_))
        | (ValueTag::F32 | ValueTag::F64, Value::Float(_))
        | (ValueTag::Char, Value::Char(_))
        | (ValueTag::String, Value::Str(_)) => true,
        (tag, v) if tag.is_integer() => match (tag.int_range(), v.as_i128()) {
            (Some((lo, hi)), Some(n)) => lo <= n && n <= hi,
            _ => false,
        },
        _ => false,
    }
}

/// Builder for [`ShapeModel`]
#[derive(Debug)]
pub struct ShapeModelBuilder {
    root: Shape,
    definitions: BTreeMap<String, Shape>,
}

impl ShapeModelBuilder {
    /// Add a named definition
    #[must_use]
    pub fn define(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.definitions.insert(name.into(), shape);
        self
    }

    /// Freeze the model and compute its structural ids
    #[must_use]
    pub fn build(self) -> ShapeModel {
        let definition_ids = self
            .definitions
            .iter()
            .map(|(name, shape)| (name.clone(), structural_id(&(name, shape))))
            .collect();
        let id = structural_id(&(&self.root, &self.definitions));
        ShapeModel(Arc::new(ModelInner {
            root: self.root,
            definitions: self.definitions,
            definition_ids,
            id,
        }))
    }
}

fn structural_id<T: Serialize + fmt::Debug>(value: &T) -> ShapeId {
    // Shapes only hold string-keyed maps, so encoding cannot fail in practice.
    ShapeId::of_serializable(value)
        .unwrap_or_else(|_| ShapeId::compute(format!("{value:?}").as_bytes()))
}

/// Errors resolving shapes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// Ref names no definition
    #[error("unknown shape reference: {0}")]
    UnknownRef(String),

    /// Refs point at each other without reaching a concrete shape
    #[error("reference cycle without a concrete shape at: {0}")]
    RefCycle(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn person() -> Shape {
        ProductShape::new()
            .field("name", Shape::string())
            .optional_field("nickname", Shape::string())
            .field_with_default("age", Shape::i32(), Value::Int(0))
            .into()
    }

    #[test]
    fn structural_equality_ignores_origin() {
        let dto = person();
        let domain = person();
        assert_eq!(dto, domain);
        assert_eq!(ShapeModel::new(dto).id(), ShapeModel::new(domain).id());
    }

    #[test]
    fn field_flags() {
        let Shape::Product(p) = person() else {
            unreachable!()
        };
        assert!(!p.fields["name"].is_optional());
        assert!(p.fields["nickname"].is_optional());
        assert!(p.fields["age"].has_default());
    }

    #[test]
    fn different_shapes_have_different_ids() {
        let a = ShapeModel::new(Shape::i32());
        let b = ShapeModel::new(Shape::i64());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn resolve_follows_refs() {
        let tree = ProductShape::new()
            .field("label", Shape::string())
            .field("children", Shape::seq(Shape::reference("Tree")));
        let model = ShapeModel::builder(Shape::reference("Tree"))
            .define("Tree", tree.clone().into())
            .build();

        assert_eq!(model.resolve(model.root()).unwrap(), &Shape::Product(tree));
        assert!(model.definition_id("Tree").is_some());
        assert_eq!(
            model.resolve(&Shape::reference("Nope")),
            Err(ShapeError::UnknownRef("Nope".into()))
        );
    }

    #[test]
    fn resolve_detects_ref_only_cycle() {
        let model = ShapeModel::builder(Shape::reference("A"))
            .define("A", Shape::reference("B"))
            .define("B", Shape::reference("A"))
            .build();
        assert!(matches!(
            model.resolve(model.root()),
            Err(ShapeError::RefCycle(_))
        ));
    }

    #[test]
    fn admits_checks_structure_and_ranges() {
        let model = ShapeModel::new(person());
        let ok = Value::record([
            ("name", Value::str("Alice")),
            ("nickname", Value::none()),
            ("age", Value::Int(30)),
        ]);
        assert!(model.admits(model.root(), &ok));

        let missing = Value::record([("name", Value::str("Alice"))]);
        assert!(!model.admits(model.root(), &missing));

        let byte = ShapeModel::new(Shape::value(ValueTag::U8));
        assert!(byte.admits(byte.root(), &Value::Int(200)));
        assert!(!byte.admits(byte.root(), &Value::Int(300)));
    }

    #[test]
    fn shape_kind_display() {
        assert_eq!(Shape::i32().kind().to_string(), "value<i32>");
        assert_eq!(
            Shape::seq(Shape::string()).kind().to_string(),
            "sequence container"
        );
    }
}
