//! Transformation plans
//!
//! A [`Plan`] is a tree mirroring the target shape. It is derived once per
//! (source shape, target shape, registry) triple, holds no source values,
//! and can be executed any number of times concurrently.
//!
//! Recursive shapes are planned once per (source, target) definition pair.
//! The shared sub-plan lives in a slot and is referenced with
//! [`PlanNode::Call`].

use crate::diagnostic::Diagnostic;
use morph_partial::PartialResult;
use morph_rules::{ComputeFn, OverrideRule, PartialComputeFn, RegistryId, ValueThunk};
use morph_shape::{Cardinality, Coercion, FieldPath, ShapeId, Value, ValueTag};
use std::fmt::{self, Debug, Display, Formatter};

/// Index of a shared sub-plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for SlotId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// One step of a plan
#[derive(Debug, Clone)]
pub enum PlanNode {
    /// Source value is already a valid target value
    CopyDirect,

    /// Scalar coercion from the fixed table
    Coerce {
        coercion: Coercion,
        from: ValueTag,
        to: ValueTag,
        /// Some source values have no target representation
        fallible: bool,
    },

    /// Build a record field by field
    Recurse(ProductPlan),

    /// Dispatch on the source variant
    SelectVariant(Vec<VariantCase>),

    /// Wrap the planned value in a present optional
    WrapOptional(Box<PlanNode>),

    /// Unwrap an optional source, running `default` when it is absent
    ///
    /// Without a default an absent source fails with `EmptyOptionalValue`.
    UnwrapOptional {
        inner: Box<PlanNode>,
        default: Option<OverrideStep>,
    },

    /// Apply `element` to every element of a container
    MapContainer {
        cardinality: Cardinality,
        element: Box<PlanNode>,
    },

    /// User override replaces automatic matching
    UseOverride(OverrideStep),

    /// Declared default of the target field
    ConstantDefault(Value),

    /// Run the shared sub-plan in a slot
    Call(SlotId),

    /// Structural failure; never present in a sealed plan
    Fail(Diagnostic),
}

impl PlanNode {
    #[inline]
    #[must_use]
    pub fn fail(diagnostic: Diagnostic) -> Self {
        Self::Fail(diagnostic)
    }

    #[inline]
    #[must_use]
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

/// Record construction: one step per target field, in target field order
#[derive(Debug, Clone, Default)]
pub struct ProductPlan {
    pub fields: Vec<FieldStep>,
}

/// How a target field is produced
#[derive(Debug, Clone)]
pub struct FieldStep {
    /// Target field name
    pub name: String,
    /// Where the value is read from, relative to the source record;
    /// `None` when the node does not read the source
    pub source: Option<Accessor>,
    pub node: PlanNode,
}

/// A resolved source accessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub kind: AccessorKind,
    /// Path of record entries from the enclosing source record
    pub path: FieldPath,
}

impl Accessor {
    #[inline]
    #[must_use]
    pub fn new(kind: AccessorKind, path: FieldPath) -> Self {
        Self { kind, path }
    }
}

/// How an accessor was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// Field with the same name
    Field,
    /// Zero-argument method with the same name
    Method,
    /// `getX` / `isX` accessor
    BeanGetter,
    /// Source path named by a rename rule
    Renamed,
}

/// Mapping of one source variant
#[derive(Debug, Clone)]
pub struct VariantCase {
    pub source: String,
    pub target: VariantTarget,
}

/// What a source variant becomes
#[derive(Debug, Clone)]
pub enum VariantTarget {
    /// Target variant with a planned payload
    Variant { name: String, payload: PlanNode },
    /// Whole target value supplied by an override
    Value(OverrideStep),
    /// No target counterpart
    Unmatched(Diagnostic),
}

/// Override as it runs inside a plan
#[derive(Clone)]
pub enum OverrideStep {
    Constant(ValueThunk),
    Computed(ComputeFn),
    VariantDefault(ValueThunk),
    PartialComputed(PartialComputeFn),
}

impl OverrideStep {
    /// Value-producing form of a rule; `None` for renames and merges
    #[must_use]
    pub fn from_rule(rule: &OverrideRule) -> Option<Self> {
        match rule {
            OverrideRule::Constant(f) => Some(Self::Constant(f.clone())),
            OverrideRule::Computed(f) => Some(Self::Computed(f.clone())),
            OverrideRule::VariantDefault(f) => Some(Self::VariantDefault(f.clone())),
            OverrideRule::PartialComputed(f) => Some(Self::PartialComputed(f.clone())),
            OverrideRule::Rename(_) | OverrideRule::DeepMerge => None,
        }
    }

    /// Produce the value; `root` is the full source value
    pub fn run(&self, root: &Value) -> PartialResult<Value> {
        match self {
            Self::Constant(f) | Self::VariantDefault(f) => PartialResult::success(f()),
            Self::Computed(f) => PartialResult::success(f(root)),
            Self::PartialComputed(f) => f(root),
        }
    }
}

impl Debug for OverrideStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Constant(_) => "Constant",
            Self::Computed(_) => "Computed",
            Self::VariantDefault(_) => "VariantDefault",
            Self::PartialComputed(_) => "PartialComputed",
        })
    }
}

/// Identity of the inputs a plan was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanKey {
    pub source: ShapeId,
    pub target: ShapeId,
    pub registry: RegistryId,
}

/// A complete, sealed transformation plan
///
/// Only the planner constructs plans, and only when no node failed.
#[derive(Debug, Clone)]
pub struct Plan {
    key: PlanKey,
    root: PlanNode,
    slots: Vec<PlanNode>,
}

impl Plan {
    pub(crate) fn sealed(key: PlanKey, root: PlanNode, slots: Vec<PlanNode>) -> Self {
        Self { key, root, slots }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> PlanKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &PlanNode {
        &self.root
    }

    /// Shared sub-plan in `slot`
    #[inline]
    #[must_use]
    pub fn slot(&self, slot: SlotId) -> Option<&PlanNode> {
        self.slots.get(slot.0)
    }

    /// All shared sub-plans, indexed by [`SlotId::index`]
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[PlanNode] {
        &self.slots
    }

    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// A sealed plan for merging a patch into an existing target value
#[derive(Debug, Clone)]
pub struct PatchPlan {
    key: PlanKey,
    fields: Vec<PatchField>,
    slots: Vec<PlanNode>,
}

impl PatchPlan {
    pub(crate) fn sealed(key: PlanKey, fields: Vec<PatchField>, slots: Vec<PlanNode>) -> Self {
        Self { key, fields, slots }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> PlanKey {
        self.key
    }

    /// Steps for the target's top-level fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[PatchField] {
        &self.fields
    }

    #[inline]
    #[must_use]
    pub fn slot(&self, slot: SlotId) -> Option<&PlanNode> {
        self.slots.get(slot.0)
    }

    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[PlanNode] {
        &self.slots
    }
}

/// How one target field reacts to a patch
#[derive(Debug, Clone)]
pub struct PatchField {
    /// Target field name
    pub name: String,
    /// Patch entry feeding this field, relative to the patch record
    pub source: Option<Accessor>,
    pub step: PatchStep,
}

/// Per-field patch behaviour
#[derive(Debug, Clone)]
pub enum PatchStep {
    /// Keep the existing value
    Preserve,
    /// Always replace with the planned value
    Replace(PlanNode),
    /// Replace when the optional patch entry is present, else keep
    UpdateIfPresent(PlanNode),
    /// Merge a nested record field by field
    Merge {
        fields: Vec<PatchField>,
        if_present: bool,
    },
    /// Overlay patch map entries onto the existing map
    MergeMap { element: PlanNode, if_present: bool },
}
