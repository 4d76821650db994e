//! Testing utilities for the Morph workspace
//!
//! Shared shapes, values and helpers for integration tests.

#![allow(missing_docs)]

use morph_core::{Engine, EngineConfig};
use morph_partial::PartialResult;
use morph_shape::{CoproductShape, ProductShape, Shape, ShapeModel, Value};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Engine with its own empty cache
pub fn setup_engine() -> Engine {
    init_tracing();
    Engine::new(EngineConfig::new())
}

/// `{ name: String, age: I32 }`
pub fn person_shape() -> ShapeModel {
    ShapeModel::new(
        ProductShape::new()
            .field("name", Shape::string())
            .field("age", Shape::i32())
            .into(),
    )
}

/// `{ name: String, age: String }`, as received over the wire
pub fn person_wire_shape() -> ShapeModel {
    ShapeModel::new(
        ProductShape::new()
            .field("name", Shape::string())
            .field("age", Shape::string())
            .into(),
    )
}

/// `{ name: Optional<String>, age: Optional<I32> }`
pub fn person_patch_shape() -> ShapeModel {
    ShapeModel::new(
        ProductShape::new()
            .optional_field("name", Shape::string())
            .optional_field("age", Shape::i32())
            .into(),
    )
}

pub fn person(name: &str, age: i64) -> Value {
    Value::record([("name", Value::str(name)), ("age", Value::Int(age))])
}

/// Coproduct with one unit variant per name
pub fn enum_shape(variants: &[&str]) -> ShapeModel {
    let coproduct = variants
        .iter()
        .fold(CoproductShape::new(), |c, v| c.unit_variant(*v));
    ShapeModel::new(coproduct.into())
}

/// Singly linked list of `label` nodes, described through a `Ref`
pub fn list_shape(label: Shape) -> ShapeModel {
    ShapeModel::builder(Shape::reference("Node"))
        .define(
            "Node",
            ProductShape::new()
                .field("label", label)
                .field("next", Shape::optional(Shape::reference("Node")))
                .into(),
        )
        .build()
}

/// List value from head to tail; an empty list is the absent optional
pub fn list_value(labels: Vec<Value>) -> Value {
    let chain = labels.into_iter().rev().fold(Value::none(), |next, label| {
        Value::some(Value::record([("label", label), ("next", next)]))
    });
    match chain {
        Value::Opt(Some(head)) => *head,
        empty => empty,
    }
}

/// Rendered paths of every failure, in order
pub fn error_paths<T>(result: &PartialResult<T>) -> Vec<String> {
    result
        .errors()
        .map(|errors| errors.iter().map(|e| e.path.to_string()).collect())
        .unwrap_or_default()
}
