//! Identity: a plan between structurally equal shapes reproduces its input

use morph_core::{CoproductShape, OverrideRegistry, ProductShape, Shape, ShapeModel, Value};
use morph_test_utils::{list_shape, list_value, setup_engine};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn account_shape() -> ShapeModel {
    ShapeModel::new(
        ProductShape::new()
            .field("id", Shape::i64())
            .field("name", Shape::string())
            .field("active", Shape::bool())
            .field("balance", Shape::value(morph_core::ValueTag::F64))
            .optional_field("nickname", Shape::string())
            .field("tags", Shape::seq(Shape::string()))
            .field("limits", Shape::map(Shape::i32()))
            .field(
                "status",
                CoproductShape::new()
                    .unit_variant("Active")
                    .variant(
                        "Suspended",
                        ProductShape::new().field("reason", Shape::string()).into(),
                    )
                    .into(),
            )
            .field("address", ProductShape::new().field("city", Shape::string()).into())
            .field("attributes", Shape::opaque("Attributes"))
            .field("score", Shape::single(Shape::i32()))
            .into(),
    )
}

fn status() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::unit_variant("Active")),
        "[a-z ]{0,12}".prop_map(|reason| {
            Value::variant("Suspended", Value::record([("reason", Value::str(reason))]))
        }),
    ]
}

prop_compose! {
    fn account()(
        id in any::<i64>(),
        name in "[A-Za-z]{0,10}",
        active in any::<bool>(),
        balance in -1.0e9f64..1.0e9,
        nickname in proptest::option::of("[a-z]{1,6}"),
        tags in proptest::collection::vec("[a-z]{0,5}", 0..4),
        limits in proptest::collection::vec(("[a-z]{1,4}", any::<i32>()), 0..4),
        status in status(),
        city in "[A-Za-z]{0,10}",
        attributes in proptest::collection::btree_map("[a-z]{1,4}", any::<i64>(), 0..3),
        score in any::<i32>(),
    ) -> Value {
        Value::record([
            ("id", Value::Int(id)),
            ("name", Value::str(name)),
            ("active", Value::Bool(active)),
            ("balance", Value::Float(balance)),
            ("nickname", nickname.map_or(Value::none(), |n| Value::some(Value::str(n)))),
            ("tags", Value::Seq(tags.into_iter().map(Value::str).collect())),
            ("limits", Value::map(limits.into_iter().map(|(k, v)| (k, Value::Int(i64::from(v)))))),
            ("status", status),
            ("address", Value::record([("city", Value::str(city))])),
            ("attributes", Value::Opaque(serde_json::json!(attributes))),
            ("score", Value::Int(i64::from(score))),
        ])
    }
}

proptest! {
    #[test]
    fn identity_plans_reproduce_their_input(value in account()) {
        let engine = setup_engine();
        let shape = account_shape();
        prop_assert!(shape.admits(shape.root(), &value));

        let plan = engine.derive(&shape, &account_shape(), &OverrideRegistry::empty()).unwrap();
        prop_assert_eq!(engine.transform(&plan, &value, false).ok(), Some(value));
    }
}

#[test]
fn recursive_identity_runs_through_one_shared_slot() {
    let engine = setup_engine();
    let shape = list_shape(Shape::string());
    let plan = engine.derive(&shape, &shape, &OverrideRegistry::empty()).unwrap();
    assert_eq!(plan.slot_count(), 1);

    let list = list_value(vec![Value::str("a"), Value::str("b"), Value::str("c")]);
    assert_eq!(engine.transform(&plan, &list, false).ok(), Some(list));
}

#[test]
fn recursive_plans_coerce_every_node() {
    let engine = setup_engine();
    let plan = engine
        .derive(&list_shape(Shape::i32()), &list_shape(Shape::string()), &OverrideRegistry::empty())
        .unwrap();
    let out = engine.transform(&plan, &list_value(vec![Value::Int(1), Value::Int(2)]), false);
    assert_eq!(out.ok(), Some(list_value(vec![Value::str("1"), Value::str("2")])));
}
