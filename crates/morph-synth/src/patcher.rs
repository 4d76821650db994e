//! Patch application
//!
//! Builds a fresh target value from an existing one and a sparse patch.
//! Absence in the patch never clears anything: an empty optional, or an
//! optional entry missing from the patch record, keeps the existing value.

use crate::interpreter::{mismatch, missing_entry, read, Interpreter};
use morph_partial::{Accumulator, ErrorMode, PartialResult};
use morph_plan::{PatchField, PatchPlan, PatchStep, PlanNode};
use morph_shape::{Segment, Value};

/// Merge `patch` into `existing` according to `plan`
///
/// Computed overrides receive the patch value as their root.
pub fn apply_patch(
    plan: &PatchPlan,
    existing: &Value,
    patch: &Value,
    mode: ErrorMode,
) -> PartialResult<Value> {
    let patcher = Patcher {
        interpreter: Interpreter::new(plan.slots(), patch, mode),
    };
    let result = patcher.fields(plan.fields(), existing, patch);
    if let Some(errors) = result.errors() {
        tracing::debug!("Patch failed with {} error(s): {}", errors.len(), errors);
    }
    result
}

struct Patcher<'p> {
    interpreter: Interpreter<'p>,
}

/// Patch entry after optional unwrapping
enum Incoming<'v> {
    Absent,
    Present(&'v Value),
}

impl Patcher<'_> {
    fn fields(&self, fields: &[PatchField], existing: &Value, patch: &Value) -> PartialResult<Value> {
        let Value::Record(current) = existing else {
            return mismatch("existing record", existing);
        };
        if !matches!(patch, Value::Record(_)) {
            return mismatch("patch record", patch);
        }

        let mut acc = Accumulator::new(self.interpreter.mode());
        for field in fields {
            let result = self
                .field(field, current.get(&field.name), patch)
                .map(|v| (field.name.clone(), v))
                .prepend_path(Segment::Field(field.name.clone()));
            if acc.push(result).is_break() {
                break;
            }
        }
        acc.finish().map(Value::record)
    }

    fn field(&self, field: &PatchField, existing: Option<&Value>, patch: &Value) -> PartialResult<Value> {
        let preserve = || match existing {
            Some(v) => PartialResult::success(v.clone()),
            None => mismatch(format!("existing entry `{}`", field.name), patch),
        };

        let incoming = match &field.source {
            Some(accessor) => read(patch, &accessor.path),
            None => Some(patch),
        };
        let entry = |optional: bool| match incoming {
            Some(Value::Opt(None)) | None if optional => Ok(Incoming::Absent),
            Some(Value::Opt(Some(v))) if optional => Ok(Incoming::Present(v.as_ref())),
            Some(other) if optional => Err(mismatch("optional", other)),
            Some(v) => Ok(Incoming::Present(v)),
            None => Err(missing(field, patch)),
        };

        match &field.step {
            PatchStep::Preserve => preserve(),
            PatchStep::Replace(node) => match entry(false) {
                Ok(Incoming::Present(v)) => self.interpreter.node(node, v),
                Ok(Incoming::Absent) => preserve(),
                Err(failure) => failure,
            },
            PatchStep::UpdateIfPresent(node) => match entry(true) {
                Ok(Incoming::Present(v)) => self.interpreter.node(node, v),
                Ok(Incoming::Absent) => preserve(),
                Err(failure) => failure,
            },
            PatchStep::Merge { fields, if_present } => match (entry(*if_present), existing) {
                (Ok(Incoming::Present(v)), Some(current)) => self.fields(fields, current, v),
                (Ok(_), _) => preserve(),
                (Err(failure), _) => failure,
            },
            PatchStep::MergeMap { element, if_present } => match entry(*if_present) {
                Ok(Incoming::Present(v)) => self.overlay(element, existing, v),
                Ok(Incoming::Absent) => preserve(),
                Err(failure) => failure,
            },
        }
    }

    /// Existing map with patch entries written over it
    fn overlay(&self, element: &PlanNode, existing: Option<&Value>, patch: &Value) -> PartialResult<Value> {
        let Some(Value::Map(current)) = existing else {
            return mismatch("existing map", existing.unwrap_or(&Value::Unit));
        };
        let Value::Map(entries) = patch else {
            return mismatch("patch map", patch);
        };

        self.interpreter
            .entries(element, entries.iter())
            .map(|updates| {
                let mut merged = current.clone();
                merged.extend(updates);
                Value::Map(merged)
            })
    }
}

fn missing(field: &PatchField, patch: &Value) -> PartialResult<Value> {
    match &field.source {
        Some(accessor) => missing_entry(&accessor.path, patch),
        None => mismatch("patch record", patch),
    }
}
