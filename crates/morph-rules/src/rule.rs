//! Override rules and derivation flags

use morph_partial::PartialResult;
use morph_shape::{FieldPath, Value};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Produces a value with no input
pub type ValueThunk = Arc<dyn Fn() -> Value + Send + Sync>;

/// Computes a target value from the full source root
pub type ComputeFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Fallibly computes a target value from the full source root
pub type PartialComputeFn = Arc<dyn Fn(&Value) -> PartialResult<Value> + Send + Sync>;

/// A user rule replacing automatic matching at one target path
#[derive(Clone)]
pub enum OverrideRule {
    /// Read the value from another source path
    ///
    /// The path is relative to the source value matched by the enclosing
    /// product. At a coproduct variant path a single-segment source names
    /// the source variant mapped onto this target variant.
    Rename(FieldPath),

    /// Fixed value
    Constant(ValueThunk),

    /// Value computed from the source root
    Computed(ComputeFn),

    /// Value used when the source has nothing here
    ///
    /// Acts as a constant when no accessor exists, as the fallback when an
    /// optional source is absent, and as the mapped value for an unmatched
    /// source variant.
    VariantDefault(ValueThunk),

    /// Fallible value computed from the source root
    PartialComputed(PartialComputeFn),

    /// Merge a patch into the existing value instead of replacing it
    DeepMerge,
}

impl OverrideRule {
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Rename(_) => RuleKind::Rename,
            Self::Constant(_) => RuleKind::Constant,
            Self::Computed(_) => RuleKind::Computed,
            Self::VariantDefault(_) => RuleKind::VariantDefault,
            Self::PartialComputed(_) => RuleKind::PartialComputed,
            Self::DeepMerge => RuleKind::DeepMerge,
        }
    }
}

impl Debug for OverrideRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename(source) => f.debug_tuple("Rename").field(source).finish(),
            other => write!(f, "{:?}", other.kind()),
        }
    }
}

/// Discriminant of [`OverrideRule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    Rename,
    Constant,
    Computed,
    VariantDefault,
    PartialComputed,
    DeepMerge,
}

/// Switches for optional matching behaviour
///
/// All switches are off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct DeriveFlags {
    /// Match fields against zero-argument methods of the same name
    pub method_accessors: bool,
    /// Match fields against `getX` / `isX` accessors
    pub bean_getters: bool,
    /// Unmatched optional target fields become absent
    pub optional_defaults_to_none: bool,
    /// Unmatched target fields with a declared default use it
    pub default_values: bool,
    /// Allow `Optional<X>` → `X`, failing at runtime on absence
    pub partial_unwrap_optionals: bool,
    /// Patch fields with no target counterpart are ignored
    pub ignore_redundant_patch_fields: bool,
}

impl DeriveFlags {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_method_accessors(mut self) -> Self {
        self.method_accessors = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_bean_getters(mut self) -> Self {
        self.bean_getters = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_optional_defaults_to_none(mut self) -> Self {
        self.optional_defaults_to_none = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_default_values(mut self) -> Self {
        self.default_values = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_partial_unwrap_optionals(mut self) -> Self {
        self.partial_unwrap_optionals = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_ignore_redundant_patch_fields(mut self) -> Self {
        self.ignore_redundant_patch_fields = true;
        self
    }
}
