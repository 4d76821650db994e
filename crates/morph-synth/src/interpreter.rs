//! Plan interpretation shared by the synthesizer and the patcher

use morph_partial::{traverse, Accumulator, ErrorMode, ExecError, PartialResult};
use morph_plan::{FieldStep, PlanNode, ProductPlan, VariantCase, VariantTarget};
use morph_shape::{Cardinality, FieldPath, Segment, Value};

/// Walks plan nodes depth-first, left to right
///
/// `root` is the full source value handed to computed overrides.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Interpreter<'p> {
    slots: &'p [PlanNode],
    root: &'p Value,
    mode: ErrorMode,
}

impl<'p> Interpreter<'p> {
    pub(crate) fn new(slots: &'p [PlanNode], root: &'p Value, mode: ErrorMode) -> Self {
        Self { slots, root, mode }
    }

    #[inline]
    pub(crate) fn mode(&self) -> ErrorMode {
        self.mode
    }

    pub(crate) fn node(&self, node: &PlanNode, value: &Value) -> PartialResult<Value> {
        match node {
            PlanNode::CopyDirect => PartialResult::success(value.clone()),
            PlanNode::Coerce {
                coercion, from, to, ..
            } => coercion
                .apply(value, *from, *to)
                .map_err(ExecError::from)
                .into(),
            PlanNode::Recurse(product) => self.product(product, value),
            PlanNode::SelectVariant(cases) => self.variant(cases, value),
            PlanNode::WrapOptional(inner) => self.node(inner, value).map(Value::some),
            PlanNode::UnwrapOptional { inner, default } => match value {
                Value::Opt(Some(present)) => self.node(inner, present),
                Value::Opt(None) => match default {
                    Some(default) => default.run(self.root).in_mode(self.mode),
                    None => PartialResult::failure(ExecError::EmptyOptionalValue),
                },
                other => mismatch("optional", other),
            },
            PlanNode::MapContainer {
                cardinality,
                element,
            } => self.container(*cardinality, element, value),
            PlanNode::UseOverride(step) => step.run(self.root).in_mode(self.mode),
            PlanNode::ConstantDefault(default) => PartialResult::success(default.clone()),
            PlanNode::Call(slot) => match self.slots.get(slot.index()) {
                Some(body) => self.node(body, value),
                None => PartialResult::failure(ExecError::custom(format!(
                    "unresolved plan slot {slot}"
                ))),
            },
            PlanNode::Fail(diagnostic) => {
                PartialResult::failure(ExecError::custom(diagnostic.to_string()))
            }
        }
    }

    fn product(&self, product: &ProductPlan, value: &Value) -> PartialResult<Value> {
        if !matches!(value, Value::Record(_)) {
            return mismatch("record", value);
        }

        let mut acc = Accumulator::new(self.mode);
        for step in &product.fields {
            let result = self
                .field(step, value)
                .map(|v| (step.name.clone(), v))
                .prepend_path(Segment::Field(step.name.clone()));
            if acc.push(result).is_break() {
                break;
            }
        }
        acc.finish().map(Value::record)
    }

    fn field(&self, step: &FieldStep, record: &Value) -> PartialResult<Value> {
        let Some(accessor) = &step.source else {
            return self.node(&step.node, record);
        };
        match read(record, &accessor.path) {
            Some(v) => self.node(&step.node, v),
            None => missing_entry(&accessor.path, record),
        }
    }

    fn variant(&self, cases: &[VariantCase], value: &Value) -> PartialResult<Value> {
        let Value::Variant { name, payload } = value else {
            return mismatch("variant", value);
        };
        let Some(case) = cases.iter().find(|c| &c.source == name) else {
            return mismatch(format!("planned variant, not `{name}`"), value);
        };

        match &case.target {
            VariantTarget::Variant {
                name: target,
                payload: node,
            } => self
                .node(node, payload)
                .map(|p| Value::variant(target.clone(), p))
                .prepend_path(Segment::Variant(target.clone())),
            VariantTarget::Value(step) => step.run(self.root).in_mode(self.mode),
            VariantTarget::Unmatched(diagnostic) => {
                PartialResult::failure(ExecError::custom(diagnostic.to_string()))
            }
        }
    }

    pub(crate) fn container(
        &self,
        cardinality: Cardinality,
        element: &PlanNode,
        value: &Value,
    ) -> PartialResult<Value> {
        match (cardinality, value) {
            (Cardinality::Single, v) => self.node(element, v),
            (Cardinality::Optional, Value::Opt(None)) => PartialResult::success(Value::none()),
            (Cardinality::Optional, Value::Opt(Some(v))) => self.node(element, v).map(Value::some),
            (Cardinality::Sequence, Value::Seq(items)) => {
                let elements = items.iter().enumerate().map(|(i, item)| {
                    move || self.node(element, item).prepend_path(Segment::Index(i))
                });
                traverse(elements, self.mode).map(Value::Seq)
            }
            (Cardinality::Map, Value::Map(entries)) => self
                .entries(element, entries.iter())
                .map(|pairs| Value::Map(pairs.into_iter().collect())),
            (cardinality, other) => mismatch(format!("{cardinality} container"), other),
        }
    }

    /// Map entries through `element`, keeping keys and order
    pub(crate) fn entries<'v>(
        &self,
        element: &PlanNode,
        entries: impl Iterator<Item = (&'v String, &'v Value)>,
    ) -> PartialResult<Vec<(String, Value)>> {
        let mapped = entries.map(|(key, v)| {
            move || {
                self.node(element, v)
                    .map(|out| (key.clone(), out))
                    .prepend_path(Segment::Key(key.clone()))
            }
        });
        traverse(mapped, self.mode)
    }
}

/// Follow record entries along `path`
pub(crate) fn read<'v>(value: &'v Value, path: &FieldPath) -> Option<&'v Value> {
    path.iter().try_fold(value, |v, segment| v.get(segment))
}

pub(crate) fn mismatch<T>(expected: impl Into<String>, found: &Value) -> PartialResult<T> {
    PartialResult::failure(ExecError::ShapeMismatch {
        expected: expected.into(),
        found: found.kind_name(),
    })
}

pub(crate) fn missing_entry<T>(path: &FieldPath, record: &Value) -> PartialResult<T> {
    mismatch(format!("entry `{path}`"), record)
}
