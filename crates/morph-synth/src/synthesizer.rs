//! Plan execution
//!
//! Planning proved the pair structurally sound; execution can still fail
//! per value (overflow, parse errors, absent optionals, user validation).
//! Those failures carry the path at which they happened.

use crate::interpreter::Interpreter;
use morph_partial::{ErrorMode, PartialResult};
use morph_plan::Plan;
use morph_shape::Value;

/// Run `plan` against `source`
///
/// Pure: the source is never mutated, and the same plan may run
/// concurrently against different values.
pub fn execute(plan: &Plan, source: &Value, mode: ErrorMode) -> PartialResult<Value> {
    let result = Interpreter::new(plan.slots(), source, mode).node(plan.root(), source);
    if let Some(errors) = result.errors() {
        tracing::debug!("Execution failed with {} error(s): {}", errors.len(), errors);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_partial::ExecError;
    use morph_plan::Planner;
    use morph_rules::{DeriveFlags, OverrideRegistry};
    use morph_shape::{CoproductShape, ProductShape, Segment, Shape, ShapeModel, ValuePath, ValueTag};
    use pretty_assertions::assert_eq;

    fn plan(source: &ShapeModel, target: &ShapeModel, registry: &OverrideRegistry) -> Plan {
        Planner::new(source, target, registry).derive().unwrap()
    }

    fn paths<T>(result: &PartialResult<T>) -> Vec<String> {
        result
            .errors()
            .map(|e| e.iter().map(|p| p.path.to_string()).collect())
            .unwrap_or_default()
    }

    fn wire() -> ShapeModel {
        ShapeModel::new(
            ProductShape::new()
                .field("name", Shape::string())
                .field("age", Shape::string())
                .field("score", Shape::string())
                .into(),
        )
    }

    fn domain() -> ShapeModel {
        ShapeModel::new(
            ProductShape::new()
                .field("name", Shape::string())
                .field("age", Shape::i32())
                .field("score", Shape::value(ValueTag::U8))
                .into(),
        )
    }

    #[test]
    fn parses_wire_strings() {
        let plan = plan(&wire(), &domain(), &OverrideRegistry::empty());
        let source = Value::record([
            ("name", Value::str("Alice")),
            ("age", Value::str("30")),
            ("score", Value::str("200")),
        ]);
        assert_eq!(
            execute(&plan, &source, ErrorMode::Accumulate),
            PartialResult::Success(Value::record([
                ("name", Value::str("Alice")),
                ("age", Value::Int(30)),
                ("score", Value::UInt(200)),
            ]))
        );
    }

    #[test]
    fn accumulates_or_fails_fast() {
        let plan = plan(&wire(), &domain(), &OverrideRegistry::empty());
        let source = Value::record([
            ("name", Value::str("Bob")),
            ("age", Value::str("abc")),
            ("score", Value::str("999")),
        ]);

        let all = execute(&plan, &source, ErrorMode::Accumulate);
        assert_eq!(paths(&all), vec![".age", ".score"]);

        let first = execute(&plan, &source, ErrorMode::FailFast);
        assert_eq!(paths(&first), vec![".age"]);
        assert_eq!(
            first.errors().unwrap().first().error,
            ExecError::CoercionParse {
                to: ValueTag::I32,
                input: "abc".into()
            }
        );
    }

    #[test]
    fn element_and_variant_paths() {
        let shape = ShapeModel::new(
            ProductShape::new()
                .field("ids", Shape::seq(Shape::string()))
                .field(
                    "payment",
                    CoproductShape::new()
                        .variant("Card", ProductShape::new().field("number", Shape::string()).into())
                        .unit_variant("Cash")
                        .into(),
                )
                .into(),
        );
        let target = ShapeModel::new(
            ProductShape::new()
                .field("ids", Shape::seq(Shape::i64()))
                .field(
                    "payment",
                    CoproductShape::new()
                        .variant("Card", ProductShape::new().field("number", Shape::i64()).into())
                        .unit_variant("Cash")
                        .into(),
                )
                .into(),
        );
        let plan = plan(&shape, &target, &OverrideRegistry::empty());
        let source = Value::record([
            ("ids", Value::Seq(vec![Value::str("1"), Value::str("x")])),
            (
                "payment",
                Value::variant("Card", Value::record([("number", Value::str("4x"))])),
            ),
        ]);

        let result = execute(&plan, &source, ErrorMode::Accumulate);
        assert_eq!(paths(&result), vec![".ids[1]", ".payment<Card>.number"]);
        assert_eq!(
            result.errors().unwrap().iter().next().map(|e| e.path.clone()),
            Some(ValuePath::new(vec![
                Segment::Field("ids".into()),
                Segment::Index(1)
            ]))
        );
    }

    #[test]
    fn absent_optional_without_default_fails_at_runtime() {
        let source = ShapeModel::new(ProductShape::new().optional_field("age", Shape::i32()).into());
        let target = ShapeModel::new(ProductShape::new().field("age", Shape::i32()).into());
        let registry = OverrideRegistry::with_flags(DeriveFlags::new().with_partial_unwrap_optionals());
        let plan = plan(&source, &target, &registry);

        let present = Value::record([("age", Value::some(Value::Int(4)))]);
        assert_eq!(
            execute(&plan, &present, ErrorMode::Accumulate).ok(),
            Some(Value::record([("age", Value::Int(4))]))
        );

        let absent = Value::record([("age", Value::none())]);
        let result = execute(&plan, &absent, ErrorMode::Accumulate);
        assert_eq!(paths(&result), vec![".age"]);
        assert_eq!(
            result.errors().unwrap().first().error,
            ExecError::EmptyOptionalValue
        );
    }

    #[test]
    fn computed_overrides_see_the_source_root() {
        let source = ShapeModel::new(
            ProductShape::new()
                .field("first", Shape::string())
                .field("last", Shape::string())
                .into(),
        );
        let target = ShapeModel::new(ProductShape::new().field("full", Shape::string()).into());
        let registry = OverrideRegistry::builder()
            .computed("full", |root| {
                let part = |k: &str| match root.get(k) {
                    Some(Value::Str(s)) => s.clone(),
                    _ => String::new(),
                };
                Value::str(format!("{} {}", part("first"), part("last")))
            })
            .build()
            .unwrap();
        let plan = plan(&source, &target, &registry);

        let value = Value::record([("first", Value::str("Ada")), ("last", Value::str("Lovelace"))]);
        assert_eq!(
            execute(&plan, &value, ErrorMode::FailFast).ok(),
            Some(Value::record([("full", Value::str("Ada Lovelace"))]))
        );
    }

    #[test]
    fn partial_computed_failures_carry_the_field_path() {
        let source = ShapeModel::new(ProductShape::new().field("email", Shape::string()).into());
        let target = ShapeModel::new(ProductShape::new().field("email", Shape::string()).into());
        let registry = OverrideRegistry::builder()
            .partial_computed("email", |root| match root.get("email") {
                Some(Value::Str(s)) if s.contains('@') => PartialResult::success(Value::str(s.clone())),
                _ => PartialResult::failure(ExecError::custom("not an email")),
            })
            .build()
            .unwrap();
        let plan = plan(&source, &target, &registry);

        let result = execute(&plan, &Value::record([("email", Value::str("nope"))]), ErrorMode::Accumulate);
        assert_eq!(
            result.errors().map(ToString::to_string),
            Some(".email: validation failed: not an email".to_string())
        );
    }

    #[test]
    fn multi_failure_overrides_report_one_error_when_failing_fast() {
        let nested = || ShapeModel::new(
            ProductShape::new()
                .field("a", ProductShape::new().field("p", Shape::string()).into())
                .into(),
        );
        let registry = OverrideRegistry::builder()
            .partial_computed("a", |_| {
                PartialResult::<Value>::failure(ExecError::custom("x"))
                    .prepend_path(Segment::Field("p".into()))
                    .combine(
                        PartialResult::<Value>::failure(ExecError::custom("y")),
                        ErrorMode::Accumulate,
                        |a, _| a,
                    )
            })
            .build()
            .unwrap();
        let plan = plan(&nested(), &nested(), &registry);
        let source = Value::record([("a", Value::record([("p", Value::str("v"))]))]);

        let all = execute(&plan, &source, ErrorMode::Accumulate);
        assert_eq!(paths(&all), vec![".a.p", ".a"]);

        let first = execute(&plan, &source, ErrorMode::FailFast);
        assert_eq!(
            first.errors().map(ToString::to_string),
            Some(".a.p: validation failed: x".to_string())
        );
    }

    #[test]
    fn variant_value_rules_produce_the_target_variant() {
        let units = |names: &[&str]| {
            let coproduct = names.iter().fold(CoproductShape::new(), |c, v| c.unit_variant(*v));
            ShapeModel::new(coproduct.into())
        };
        let registry = OverrideRegistry::builder()
            .constant("A", Value::unit_variant("B"))
            .constant("C", Value::unit_variant("B"))
            .build()
            .unwrap();
        let plan = plan(&units(&["A", "C"]), &units(&["A", "B"]), &registry);

        for input in ["A", "C"] {
            assert_eq!(
                execute(&plan, &Value::unit_variant(input), ErrorMode::Accumulate).ok(),
                Some(Value::unit_variant("B"))
            );
        }
    }

    #[test]
    fn mismatched_source_values_are_reported_not_panicked() {
        let plan = plan(&wire(), &domain(), &OverrideRegistry::empty());
        let result = execute(&plan, &Value::Int(3), ErrorMode::Accumulate);
        assert_eq!(
            result.errors().unwrap().first().error,
            ExecError::ShapeMismatch {
                expected: "record".into(),
                found: "int"
            }
        );
    }

    #[test]
    fn recursive_plans_run_through_slots() {
        let tree = |label: Shape| {
            ShapeModel::builder(Shape::reference("Node"))
                .define(
                    "Node",
                    ProductShape::new()
                        .field("label", label)
                        .field("next", Shape::optional(Shape::reference("Node")))
                        .into(),
                )
                .build()
        };
        let plan = plan(&tree(Shape::i32()), &tree(Shape::string()), &OverrideRegistry::empty());

        let leaf = Value::record([("label", Value::Int(2)), ("next", Value::none())]);
        let list = Value::record([("label", Value::Int(1)), ("next", Value::some(leaf))]);
        let expected = Value::record([
            ("label", Value::str("1")),
            (
                "next",
                Value::some(Value::record([("label", Value::str("2")), ("next", Value::none())])),
            ),
        ]);
        assert_eq!(execute(&plan, &list, ErrorMode::Accumulate).ok(), Some(expected));
    }
}

#[cfg(test)]
mod laws {
    use super::*;
    use morph_plan::Planner;
    use morph_rules::OverrideRegistry;
    use morph_shape::{ProductShape, Shape, ShapeModel};
    use proptest::prelude::*;

    fn numbers(width: usize, target: &Shape) -> ShapeModel {
        let product = (0..width).fold(ProductShape::new(), |p, i| p.field(format!("f{i}"), target.clone()));
        ShapeModel::new(product.into())
    }

    proptest! {
        #[test]
        fn fail_fast_stops_at_the_first_nested_error(
            items in proptest::collection::vec(prop_oneof!["[0-9]{1,4}", "[a-z]{1,4}"], 0..6),
            tail in prop_oneof!["[0-9]{1,4}", "[a-z]{1,4}"],
        ) {
            let shape = |element: Shape| ShapeModel::new(
                ProductShape::new()
                    .field("items", Shape::seq(element.clone()))
                    .field("tail", element)
                    .into(),
            );
            let plan = Planner::new(&shape(Shape::string()), &shape(Shape::i32()), &OverrideRegistry::empty())
                .derive()
                .unwrap();
            let value = Value::record([
                ("items", Value::Seq(items.iter().map(|s| Value::str(s.as_str())).collect())),
                ("tail", Value::str(tail.as_str())),
            ]);

            let mut expected: Vec<String> = items
                .iter()
                .enumerate()
                .filter(|(_, s)| s.parse::<i32>().is_err())
                .map(|(i, _)| format!(".items[{i}]"))
                .collect();
            if tail.parse::<i32>().is_err() {
                expected.push(".tail".to_string());
            }

            let all = execute(&plan, &value, ErrorMode::Accumulate);
            let first = execute(&plan, &value, ErrorMode::FailFast);
            let all_paths: Vec<String> = all.errors().map(|e| e.iter().map(|p| p.path.to_string()).collect()).unwrap_or_default();
            let first_paths: Vec<String> = first.errors().map(|e| e.iter().map(|p| p.path.to_string()).collect()).unwrap_or_default();

            prop_assert_eq!(&all_paths, &expected);
            prop_assert_eq!(first_paths, expected.into_iter().take(1).collect::<Vec<_>>());
        }

        #[test]
        fn fail_fast_reports_the_first_accumulated_error(
            inputs in proptest::collection::vec(prop_oneof!["-?[0-9]{1,6}", "[a-z]{1,4}"], 1..12)
        ) {
            let source = numbers(inputs.len(), &Shape::string());
            let target = numbers(inputs.len(), &Shape::i32());
            let plan = Planner::new(&source, &target, &OverrideRegistry::empty()).derive().unwrap();
            let value = Value::record(
                inputs.iter().enumerate().map(|(i, s)| (format!("f{i}"), Value::str(s.as_str()))),
            );

            let expected: Vec<String> = inputs
                .iter()
                .enumerate()
                .filter(|(_, s)| s.parse::<i32>().is_err())
                .map(|(i, _)| format!(".f{i}"))
                .collect();

            let all = execute(&plan, &value, ErrorMode::Accumulate);
            let first = execute(&plan, &value, ErrorMode::FailFast);
            let all_paths: Vec<String> = all.errors().map(|e| e.iter().map(|p| p.path.to_string()).collect()).unwrap_or_default();
            let first_paths: Vec<String> = first.errors().map(|e| e.iter().map(|p| p.path.to_string()).collect()).unwrap_or_default();

            prop_assert_eq!(&all_paths, &expected);
            prop_assert_eq!(first_paths, expected.into_iter().take(1).collect::<Vec<_>>());
        }
    }
}
