//! The matching planner
//!
//! Walks the target shape and decides, per node, how its value is produced.
//! Precedence per target node is fixed:
//!
//! 1. an override registered at the node's path
//! 2. a same-named source accessor, then alternate accessors when enabled
//! 3. absent optional, then declared default, when enabled
//! 4. `MissingAccessor`
//!
//! Failures are recorded in the tree as [`PlanNode::Fail`] and planning
//! continues with the siblings. Sealing collects every failure; a plan with
//! any failure is rejected as a whole.

use crate::diagnostic::{Diagnostic, DiagnosticSet};
use crate::plan::{
    Accessor, AccessorKind, FieldStep, OverrideStep, PatchField, PatchPlan, PatchStep, Plan,
    PlanKey, PlanNode, ProductPlan, SlotId, VariantCase, VariantTarget,
};
use morph_rules::{DeriveFlags, OverrideRegistry, OverrideRule, ValueThunk};
use morph_shape::{
    coercion_for, Cardinality, CoproductShape, FieldPath, FieldShape, ProductShape, Shape,
    ShapeError, ShapeId, ShapeModel, Value, ValueTag,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Default bound on structural recursion
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Planner settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Deepest nesting of shape nodes before `RecursionDepthExceeded`
    pub max_depth: usize,
}

impl PlannerConfig {
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A (source, target) definition pair being planned
#[derive(Debug)]
struct Frame {
    key: (ShapeId, ShapeId),
    path: FieldPath,
    /// No rule lies below `path`, so the sub-plan is path-independent
    generic: bool,
    slot: Option<SlotId>,
}

/// Derives plans for one (source, target, registry) triple
///
/// For patch plans the source is the patch shape.
#[derive(Debug)]
pub struct Planner<'a> {
    source: &'a ShapeModel,
    target: &'a ShapeModel,
    registry: &'a OverrideRegistry,
    flags: DeriveFlags,
    config: PlannerConfig,
    depth: usize,
    frames: Vec<Frame>,
    slots: Vec<PlanNode>,
    used: HashSet<FieldPath>,
    detached: Vec<Diagnostic>,
}

impl<'a> Planner<'a> {
    #[must_use]
    pub fn new(
        source: &'a ShapeModel,
        target: &'a ShapeModel,
        registry: &'a OverrideRegistry,
    ) -> Self {
        Self {
            source,
            target,
            registry,
            flags: registry.flags(),
            config: PlannerConfig::default(),
            depth: 0,
            frames: Vec::new(),
            slots: Vec::new(),
            used: HashSet::new(),
            detached: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    fn key(&self) -> PlanKey {
        PlanKey {
            source: self.source.id(),
            target: self.target.id(),
            registry: self.registry.id(),
        }
    }

    /// Derive a complete plan
    ///
    /// # Errors
    /// Returns every structural problem found, in depth-first order.
    pub fn derive(mut self) -> Result<Plan, DiagnosticSet> {
        let key = self.key();
        tracing::debug!(
            "Planning {} -> {} with {}",
            key.source.short(),
            key.target.short(),
            key.registry
        );

        let root = self.plan_root();

        let mut sealer = Sealer::new(&self.slots);
        sealer.node(&root);
        let found = sealer.into_diagnostics();
        let diagnostics = self.finish(found);
        if !diagnostics.is_empty() {
            tracing::debug!("Derivation rejected: {}", diagnostics);
            return Err(diagnostics);
        }

        tracing::debug!("Derived plan with {} shared slot(s)", self.slots.len());
        Ok(Plan::sealed(key, root, self.slots))
    }

    /// Derive a plan that merges a patch into an existing target value
    ///
    /// # Errors
    /// Returns every structural problem found, in depth-first order.
    pub fn derive_patch(mut self) -> Result<PatchPlan, DiagnosticSet> {
        let key = self.key();
        tracing::debug!(
            "Planning patch {} -> {} with {}",
            key.source.short(),
            key.target.short(),
            key.registry
        );

        let fields = self.patch_root();

        let mut sealer = Sealer::new(&self.slots);
        sealer.patch_fields(&fields);
        let found = sealer.into_diagnostics();
        let diagnostics = self.finish(found);
        if !diagnostics.is_empty() {
            tracing::debug!("Patch derivation rejected: {}", diagnostics);
            return Err(diagnostics);
        }

        Ok(PatchPlan::sealed(key, fields, self.slots))
    }

    /// Append diagnostics that live outside the tree
    fn finish(&mut self, mut diagnostics: DiagnosticSet) -> DiagnosticSet {
        for d in self.detached.drain(..) {
            diagnostics.push(d);
        }
        for path in self.registry.paths() {
            if !self.used.contains(path) {
                diagnostics.push(Diagnostic::AmbiguousOverridePath { path: path.clone() });
            }
        }
        diagnostics
    }

    /// Rule at `path`, marked as consumed
    fn take_rule(&mut self, path: &FieldPath) -> Option<&'a OverrideRule> {
        let registry = self.registry;
        let rule = registry.lookup(path)?;
        self.used.insert(path.clone());
        Some(rule)
    }

    fn plan_root(&mut self) -> PlanNode {
        let path = FieldPath::root();
        let (source, target) = (self.source.root(), self.target.root());
        self.plan_located(&path, source, target)
    }

    /// Plan a target node whose source node is already known
    fn plan_located(&mut self, path: &FieldPath, source: &'a Shape, target: &'a Shape) -> PlanNode {
        match self.take_rule(path) {
            None | Some(OverrideRule::DeepMerge) => self.plan_node(path, source, target),
            Some(OverrideRule::VariantDefault(default)) => {
                self.plan_defaulted(path, source, target, default.clone())
            }
            // Renames only apply to product fields and coproduct variants
            Some(OverrideRule::Rename(_)) => PlanNode::fail(Diagnostic::AmbiguousOverridePath {
                path: path.clone(),
            }),
            Some(rule) => OverrideStep::from_rule(rule).map_or_else(
                || self.plan_node(path, source, target),
                PlanNode::UseOverride,
            ),
        }
    }

    fn plan_field(
        &mut self,
        path: &FieldPath,
        source: &'a ProductShape,
        name: &str,
        field: &'a FieldShape,
    ) -> FieldStep {
        let step = |source: Option<Accessor>, node: PlanNode| FieldStep {
            name: name.to_string(),
            source,
            node,
        };

        match self.take_rule(path) {
            Some(OverrideRule::Rename(from)) => {
                return match self.follow(source, from, path) {
                    Ok(shape) => step(
                        Some(Accessor::new(AccessorKind::Renamed, from.clone())),
                        self.plan_node(path, shape, &field.shape),
                    ),
                    Err(d) => step(None, PlanNode::fail(d)),
                };
            }
            Some(OverrideRule::VariantDefault(default)) => {
                return match self.discover(source, name, &field.shape) {
                    Some((accessor, shape)) => step(
                        Some(accessor),
                        self.plan_defaulted(path, shape, &field.shape, default.clone()),
                    ),
                    None => step(
                        None,
                        PlanNode::UseOverride(OverrideStep::VariantDefault(default.clone())),
                    ),
                };
            }
            Some(rule) => {
                if let Some(over) = OverrideStep::from_rule(rule) {
                    return step(None, PlanNode::UseOverride(over));
                }
            }
            None => {}
        }

        match self.discover(source, name, &field.shape) {
            Some((accessor, shape)) => step(Some(accessor), self.plan_node(path, shape, &field.shape)),
            None => step(None, self.fallback(path, field)),
        }
    }

    /// No accessor: absent optional, declared default, or failure
    fn fallback(&self, path: &FieldPath, field: &FieldShape) -> PlanNode {
        if field.is_optional() && self.flags.optional_defaults_to_none {
            let absent: ValueThunk = Arc::new(Value::none);
            return PlanNode::UseOverride(OverrideStep::VariantDefault(absent));
        }
        if self.flags.default_values {
            if let Some(default) = &field.default {
                return PlanNode::ConstantDefault(default.clone());
            }
        }
        PlanNode::fail(Diagnostic::MissingAccessor { path: path.clone() })
    }

    /// Find a source accessor for target field `name`
    ///
    /// Exact field first, then method, then bean getter. The first strategy
    /// that finds anything wins.
    fn discover(
        &self,
        source: &'a ProductShape,
        name: &str,
        target: &'a Shape,
    ) -> Option<(Accessor, &'a Shape)> {
        let found = |kind, accessor: &str, shape| {
            Some((Accessor::new(kind, FieldPath::single(accessor)), shape))
        };

        if let Some(field) = source.fields.get(name) {
            return found(AccessorKind::Field, name, &field.shape);
        }
        if self.flags.method_accessors {
            if let Some(shape) = source.methods.get(name) {
                return found(AccessorKind::Method, name, shape);
            }
        }
        if self.flags.bean_getters {
            let capitalized = capitalize(name);
            let getter = format!("get{capitalized}");
            if let Some(shape) = source.methods.get(&getter) {
                return found(AccessorKind::BeanGetter, &getter, shape);
            }
            let is_bool = matches!(
                self.concrete(self.target, target),
                Ok(Shape::Value(ValueTag::Bool))
            );
            let predicate = format!("is{capitalized}");
            if is_bool {
                if let Some(shape) = source.methods.get(&predicate) {
                    return found(AccessorKind::BeanGetter, &predicate, shape);
                }
            }
        }
        None
    }

    /// Shape at a rename source path, relative to `source`
    fn follow(
        &self,
        source: &'a ProductShape,
        from: &FieldPath,
        target_path: &FieldPath,
    ) -> Result<&'a Shape, Diagnostic> {
        let missing = || Diagnostic::MissingAccessor {
            path: target_path.clone(),
        };
        let mut product = source;
        let mut segments = from.iter().peekable();
        while let Some(segment) = segments.next() {
            let shape = product
                .fields
                .get(segment)
                .map(|f| &f.shape)
                .or_else(|| product.methods.get(segment))
                .ok_or_else(missing)?;
            if segments.peek().is_none() {
                return Ok(shape);
            }
            match self.concrete(self.source, shape) {
                Ok(Shape::Product(next)) => product = next,
                _ => return Err(missing()),
            }
        }
        Err(missing())
    }

    /// A value-if-absent rule: unwrap default for optional sources,
    /// constant otherwise
    fn plan_defaulted(
        &mut self,
        path: &FieldPath,
        source: &'a Shape,
        target: &'a Shape,
        default: ValueThunk,
    ) -> PlanNode {
        let source_concrete = self.concrete(self.source, source);
        let target_concrete = self.concrete(self.target, target);
        if let (Ok(s), Ok(t)) = (source_concrete, target_concrete) {
            if let (Some(element), None) = (s.optional_element(), t.optional_element()) {
                return PlanNode::UnwrapOptional {
                    inner: Box::new(self.plan_node(path, element, target)),
                    default: Some(OverrideStep::VariantDefault(default)),
                };
            }
        }
        PlanNode::UseOverride(OverrideStep::VariantDefault(default))
    }

    /// Strip `Single` boxes and follow refs down to a concrete node
    fn concrete(&self, model: &'a ShapeModel, mut shape: &'a Shape) -> Result<&'a Shape, ShapeError> {
        for _ in 0..=self.config.max_depth {
            match shape {
                Shape::Container {
                    cardinality: Cardinality::Single,
                    element,
                } => shape = element,
                Shape::Ref(_) => shape = model.resolve(shape)?,
                other => return Ok(other),
            }
        }
        Err(ShapeError::RefCycle(shape.kind().to_string()))
    }

    /// Plan a node pair with no rule at `path`
    fn plan_node(&mut self, path: &FieldPath, source: &'a Shape, target: &'a Shape) -> PlanNode {
        if self.depth >= self.config.max_depth {
            return PlanNode::fail(Diagnostic::RecursionDepthExceeded { path: path.clone() });
        }

        let (source, target) = (strip_single(source), strip_single(target));
        if let (Shape::Ref(s), Shape::Ref(t)) = (source, target) {
            return self.plan_refs(path, s, t);
        }

        let source = match self.concrete(self.source, source) {
            Ok(shape) => shape,
            Err(e) => return unresolved(path, e),
        };
        let target = match self.concrete(self.target, target) {
            Ok(shape) => shape,
            Err(e) => return unresolved(path, e),
        };

        self.depth += 1;
        let node = self.plan_concrete(path, source, target);
        self.depth -= 1;
        node
    }

    fn plan_concrete(&mut self, path: &FieldPath, source: &'a Shape, target: &'a Shape) -> PlanNode {
        match (source, target) {
            (Shape::Value(from), Shape::Value(to)) => plan_scalar(path, *from, *to),
            (Shape::Product(s), Shape::Product(t)) => PlanNode::Recurse(self.plan_product(path, s, t)),
            (Shape::Coproduct(s), Shape::Coproduct(t)) => self.plan_coproduct(path, s, t),
            (
                Shape::Container {
                    cardinality: sc,
                    element: se,
                },
                Shape::Container {
                    cardinality: tc,
                    element: te,
                },
            ) if sc == tc => PlanNode::MapContainer {
                cardinality: *tc,
                element: Box::new(self.plan_node(path, se, te)),
            },
            (
                Shape::Container {
                    cardinality: Cardinality::Optional,
                    element,
                },
                _,
            ) => {
                if self.flags.partial_unwrap_optionals {
                    PlanNode::UnwrapOptional {
                        inner: Box::new(self.plan_node(path, element, target)),
                        default: None,
                    }
                } else {
                    PlanNode::fail(Diagnostic::UnsupportedOptionalUnwrap { path: path.clone() })
                }
            }
            (
                _,
                Shape::Container {
                    cardinality: Cardinality::Optional,
                    element,
                },
            ) => PlanNode::WrapOptional(Box::new(self.plan_node(path, source, element))),
            (Shape::Opaque(a), Shape::Opaque(b)) if a == b => PlanNode::CopyDirect,
            _ => PlanNode::fail(Diagnostic::IncompatibleShapes {
                path: path.clone(),
                from: source.kind(),
                to: target.kind(),
            }),
        }
    }

    fn plan_product(
        &mut self,
        path: &FieldPath,
        source: &'a ProductShape,
        target: &'a ProductShape,
    ) -> ProductPlan {
        let fields = target
            .fields
            .iter()
            .map(|(name, field)| self.plan_field(&path.child(name.as_str()), source, name, field))
            .collect();
        ProductPlan { fields }
    }

    /// Every source variant must map somewhere; extra target variants are
    /// simply unreachable
    fn plan_coproduct(
        &mut self,
        path: &FieldPath,
        source: &'a CoproductShape,
        target: &'a CoproductShape,
    ) -> PlanNode {
        let registry = self.registry;

        // Explicit variant mapping: rename at `<path>.<Target>` from `<Source>`
        let mut renamed: Vec<(&'a str, &'a str, &'a Shape)> = Vec::new();
        for (name, payload) in &target.variants {
            let variant_path = path.child(name.as_str());
            if let Some(OverrideRule::Rename(from)) = registry.lookup(&variant_path) {
                if let [single] = from.segments() {
                    let taken = renamed.iter().any(|(s, _, _)| *s == single.as_str());
                    if let Some((key, _)) = source.variants.get_key_value(single.as_str()) {
                        if !taken {
                            self.used.insert(variant_path);
                            renamed.push((key.as_str(), name.as_str(), payload));
                        }
                    }
                }
            }
        }

        let cases = source
            .variants
            .iter()
            .map(|(name, payload)| {
                let mapped = if let Some(&(_, to, to_payload)) =
                    renamed.iter().find(|(from, _, _)| *from == name.as_str())
                {
                    VariantTarget::Variant {
                        name: to.to_string(),
                        payload: self.plan_node(&path.child(to), payload, to_payload),
                    }
                } else if let Some(to_payload) = target.variants.get(name) {
                    self.matched_variant(path, name, payload, to_payload)
                } else {
                    self.unmatched_variant(path, name)
                };
                VariantCase {
                    source: name.clone(),
                    target: mapped,
                }
            })
            .collect();

        PlanNode::SelectVariant(cases)
    }

    /// A source variant with no target counterpart, possibly rescued by a
    /// value rule at `<path>.<Source>`
    /// A source variant whose name also exists on the target side
    ///
    /// A value rule at `<path>.<Variant>` replaces the whole coproduct value;
    /// payload rules live one level deeper. A rename at that path maps some
    /// other source variant here and leaves the same-named one untouched.
    fn matched_variant(
        &mut self,
        path: &FieldPath,
        name: &str,
        source: &'a Shape,
        target: &'a Shape,
    ) -> VariantTarget {
        let variant_path = path.child(name);
        let registry = self.registry;
        let payload = match registry.lookup(&variant_path) {
            Some(OverrideRule::Rename(_)) => self.plan_node(&variant_path, source, target),
            Some(rule) => match OverrideStep::from_rule(rule) {
                Some(step) => {
                    self.used.insert(variant_path);
                    return VariantTarget::Value(step);
                }
                None => self.plan_located(&variant_path, source, target),
            },
            None => self.plan_located(&variant_path, source, target),
        };
        VariantTarget::Variant {
            name: name.to_string(),
            payload,
        }
    }

    fn unmatched_variant(&mut self, path: &FieldPath, name: &str) -> VariantTarget {
        let variant_path = path.child(name);
        let registry = self.registry;
        match registry.lookup(&variant_path).and_then(OverrideStep::from_rule) {
            Some(step) => {
                self.used.insert(variant_path);
                VariantTarget::Value(step)
            }
            None => VariantTarget::Unmatched(Diagnostic::UnmatchedSourceVariant {
                path: path.clone(),
                variant: name.to_string(),
            }),
        }
    }

    /// Recursion through named definitions
    ///
    /// The first entry into a (source, target) definition pair opens a
    /// frame. Re-entering it from a path-independent position yields a
    /// `Call` to a slot that is back-patched when the frame closes.
    fn plan_refs(&mut self, path: &FieldPath, source: &str, target: &str) -> PlanNode {
        let (source_model, target_model) = (self.source, self.target);
        let (Some(source_def), Some(source_id)) =
            (source_model.definition(source), source_model.definition_id(source))
        else {
            return unknown_ref(path, source);
        };
        let (Some(target_def), Some(target_id)) =
            (target_model.definition(target), target_model.definition_id(target))
        else {
            return unknown_ref(path, target);
        };

        let key = (source_id, target_id);
        let generic = !self.registry.has_rules_under(path);

        if generic {
            if let Some(i) = self.frames.iter().rposition(|f| f.key == key && f.generic) {
                let slot = match self.frames[i].slot {
                    Some(slot) => slot,
                    None => {
                        let slot = SlotId(self.slots.len());
                        // Replaced when the frame closes
                        self.slots.push(PlanNode::fail(Diagnostic::RecursionDepthExceeded {
                            path: self.frames[i].path.clone(),
                        }));
                        self.frames[i].slot = Some(slot);
                        slot
                    }
                };
                tracing::trace!("Recursive reference at {} resolved to slot {}", path, slot);
                return PlanNode::Call(slot);
            }
        }

        self.frames.push(Frame {
            key,
            path: path.clone(),
            generic,
            slot: None,
        });
        let node = self.plan_node(path, source_def, target_def);
        let frame = self.frames.pop();

        match frame.and_then(|f| f.slot) {
            Some(slot) => {
                self.slots[slot.0] = node;
                PlanNode::Call(slot)
            }
            None => node,
        }
    }

    fn patch_root(&mut self) -> Vec<PatchField> {
        let path = FieldPath::root();
        let patch = self.concrete(self.source, self.source.root());
        let target = self.concrete(self.target, self.target.root());
        match (patch, target) {
            (Ok(Shape::Product(p)), Ok(Shape::Product(t))) => self.patch_product(&path, p, t),
            (Ok(p), Ok(t)) => {
                self.detached.push(Diagnostic::IncompatibleShapes {
                    path,
                    from: p.kind(),
                    to: t.kind(),
                });
                Vec::new()
            }
            (Err(e), _) | (_, Err(e)) => {
                if let PlanNode::Fail(d) = unresolved(&path, e) {
                    self.detached.push(d);
                }
                Vec::new()
            }
        }
    }

    fn patch_product(
        &mut self,
        path: &FieldPath,
        patch: &'a ProductShape,
        target: &'a ProductShape,
    ) -> Vec<PatchField> {
        let mut consumed: HashSet<String> = HashSet::new();
        let fields: Vec<PatchField> = target
            .fields
            .iter()
            .map(|(name, field)| {
                let step = self.patch_field(&path.child(name.as_str()), patch, name, field);
                if let Some(first) = step.source.as_ref().and_then(|a| a.path.iter().next()) {
                    consumed.insert(first.to_string());
                }
                step
            })
            .collect();

        if !self.flags.ignore_redundant_patch_fields {
            for name in patch.fields.keys().filter(|n| !consumed.contains(*n)) {
                self.detached.push(Diagnostic::UnusedPatchField {
                    path: path.clone(),
                    field: name.clone(),
                });
            }
        }
        fields
    }

    fn patch_field(
        &mut self,
        path: &FieldPath,
        patch: &'a ProductShape,
        name: &str,
        field: &'a FieldShape,
    ) -> PatchField {
        let entry = |source: Option<Accessor>, step: PatchStep| PatchField {
            name: name.to_string(),
            source,
            step,
        };

        let deep = match self.take_rule(path) {
            Some(OverrideRule::Rename(from)) => {
                return match self.follow(patch, from, path) {
                    Ok(shape) => entry(
                        Some(Accessor::new(AccessorKind::Renamed, from.clone())),
                        self.patch_update(path, shape, &field.shape, false),
                    ),
                    Err(d) => entry(None, PatchStep::Replace(PlanNode::fail(d))),
                };
            }
            Some(OverrideRule::DeepMerge) => true,
            Some(rule) => {
                return match OverrideStep::from_rule(rule) {
                    Some(over) => entry(None, PatchStep::Replace(PlanNode::UseOverride(over))),
                    None => entry(None, PatchStep::Preserve),
                };
            }
            None => false,
        };

        match self.discover(patch, name, &field.shape) {
            Some((accessor, shape)) => {
                entry(Some(accessor), self.patch_update(path, shape, &field.shape, deep))
            }
            None => entry(None, PatchStep::Preserve),
        }
    }

    /// Update of one field from a present patch entry
    ///
    /// An optional patch entry only updates when present. With `deep`,
    /// nested records merge field by field and maps overlay key by key.
    fn patch_update(
        &mut self,
        path: &FieldPath,
        patch: &'a Shape,
        target: &'a Shape,
        deep: bool,
    ) -> PatchStep {
        let (if_present, patch) = match self.concrete(self.source, patch) {
            Ok(shape) => shape.optional_element().map_or((false, patch), |e| (true, e)),
            Err(_) => (false, patch),
        };

        if deep {
            let pair = (
                self.concrete(self.source, patch),
                self.concrete(self.target, target),
            );
            match pair {
                (Ok(Shape::Product(p)), Ok(Shape::Product(t))) => {
                    return PatchStep::Merge {
                        fields: self.patch_product(path, p, t),
                        if_present,
                    };
                }
                (
                    Ok(Shape::Container {
                        cardinality: Cardinality::Map,
                        element: pe,
                    }),
                    Ok(Shape::Container {
                        cardinality: Cardinality::Map,
                        element: te,
                    }),
                ) => {
                    return PatchStep::MergeMap {
                        element: self.plan_node(path, pe, te),
                        if_present,
                    };
                }
                _ => {}
            }
        }

        let node = self.plan_node(path, patch, target);
        if if_present {
            PatchStep::UpdateIfPresent(node)
        } else {
            PatchStep::Replace(node)
        }
    }
}

fn strip_single(mut shape: &Shape) -> &Shape {
    while let Shape::Container {
        cardinality: Cardinality::Single,
        element,
    } = shape
    {
        shape = element;
    }
    shape
}

fn plan_scalar(path: &FieldPath, from: ValueTag, to: ValueTag) -> PlanNode {
    if from == to {
        return PlanNode::CopyDirect;
    }
    match coercion_for(from, to) {
        Some(coercion) => PlanNode::Coerce {
            coercion,
            from,
            to,
            fallible: coercion.is_fallible(from, to),
        },
        None => PlanNode::fail(Diagnostic::UnsupportedCoercion {
            path: path.clone(),
            from,
            to,
        }),
    }
}

fn unknown_ref(path: &FieldPath, name: &str) -> PlanNode {
    PlanNode::fail(Diagnostic::UnknownShapeRef {
        path: path.clone(),
        name: name.to_string(),
    })
}

fn unresolved(path: &FieldPath, err: ShapeError) -> PlanNode {
    match err {
        ShapeError::UnknownRef(name) => unknown_ref(path, &name),
        ShapeError::RefCycle(_) => {
            PlanNode::fail(Diagnostic::RecursionDepthExceeded { path: path.clone() })
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Collects `Fail` diagnostics in depth-first order, entering each shared
/// slot once at its first call
struct Sealer<'p> {
    slots: &'p [PlanNode],
    entered: HashSet<SlotId>,
    diagnostics: DiagnosticSet,
}

impl<'p> Sealer<'p> {
    fn new(slots: &'p [PlanNode]) -> Self {
        Self {
            slots,
            entered: HashSet::new(),
            diagnostics: DiagnosticSet::new(),
        }
    }

    fn node(&mut self, node: &PlanNode) {
        match node {
            PlanNode::Fail(d) => self.diagnostics.push(d.clone()),
            PlanNode::Recurse(product) => {
                for field in &product.fields {
                    self.node(&field.node);
                }
            }
            PlanNode::SelectVariant(cases) => {
                for case in cases {
                    match &case.target {
                        VariantTarget::Variant { payload, .. } => self.node(payload),
                        VariantTarget::Unmatched(d) => self.diagnostics.push(d.clone()),
                        VariantTarget::Value(_) => {}
                    }
                }
            }
            PlanNode::WrapOptional(inner)
            | PlanNode::UnwrapOptional { inner, .. }
            | PlanNode::MapContainer { element: inner, .. } => self.node(inner),
            PlanNode::Call(slot) => {
                if self.entered.insert(*slot) {
                    let slots = self.slots;
                    if let Some(body) = slots.get(slot.0) {
                        self.node(body);
                    }
                }
            }
            PlanNode::CopyDirect
            | PlanNode::Coerce { .. }
            | PlanNode::UseOverride(_)
            | PlanNode::ConstantDefault(_) => {}
        }
    }

    fn patch_fields(&mut self, fields: &[PatchField]) {
        for field in fields {
            match &field.step {
                PatchStep::Preserve => {}
                PatchStep::Replace(node)
                | PatchStep::UpdateIfPresent(node)
                | PatchStep::MergeMap { element: node, .. } => self.node(node),
                PatchStep::Merge { fields, .. } => self.patch_fields(fields),
            }
        }
    }

    fn into_diagnostics(self) -> DiagnosticSet {
        self.diagnostics
    }
}
