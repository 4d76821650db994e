//! The override registry
//!
//! Provides [`OverrideRegistry`], the normalized, immutable set of rules a
//! derivation consults, and [`RegistryBuilder`] for constructing it.

use crate::rule::{DeriveFlags, OverrideRule};
use morph_partial::PartialResult;
use morph_shape::{FieldPath, PathError, Value};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a built registry
///
/// Rules hold closures and cannot be compared, so every build gets a fresh
/// id. Plan caches key on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistryId(u64);

impl RegistryId {
    fn next() -> Self {
        Self(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for RegistryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "registry#{}", self.0)
    }
}

#[derive(Debug)]
struct RegistryInner {
    id: RegistryId,
    rules: BTreeMap<FieldPath, OverrideRule>,
    flags: DeriveFlags,
}

/// Immutable set of override rules keyed by target path
///
/// At most one rule exists per path. Cheap to clone; clones share storage
/// and identity.
#[derive(Debug, Clone)]
pub struct OverrideRegistry(Arc<RegistryInner>);

impl OverrideRegistry {
    /// Registry with no rules and default flags
    #[must_use]
    pub fn empty() -> Self {
        Self::with_flags(DeriveFlags::default())
    }

    /// Registry with no rules
    #[must_use]
    pub fn with_flags(flags: DeriveFlags) -> Self {
        Self(Arc::new(RegistryInner {
            id: RegistryId::next(),
            rules: BTreeMap::new(),
            flags,
        }))
    }

    #[inline]
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> RegistryId {
        self.0.id
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> DeriveFlags {
        self.0.flags
    }

    /// Rule registered at exactly this target path
    #[inline]
    #[must_use]
    pub fn lookup(&self, path: &FieldPath) -> Option<&OverrideRule> {
        self.0.rules.get(path)
    }

    /// Any rule lies strictly below `path`
    #[must_use]
    pub fn has_rules_under(&self, path: &FieldPath) -> bool {
        self.0
            .rules
            .range(path.clone()..)
            .take_while(|(p, _)| path.is_prefix_of(p))
            .any(|(p, _)| path.is_ancestor_of(p))
    }

    /// Registered paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.0.rules.keys()
    }

    /// Registered rules in path order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &OverrideRule)> {
        self.0.rules.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.rules.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.rules.is_empty()
    }
}

impl Default for OverrideRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builder for [`OverrideRegistry`]
///
/// Paths are written dot-separated from the target root, e.g.
/// `"customer.address.city"`. Validation happens in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    rules: Vec<(String, PendingRule)>,
    flags: DeriveFlags,
}

// Rename sources stay raw until build so malformed ones report like targets.
#[derive(Debug)]
enum PendingRule {
    Ready(OverrideRule),
    Rename(String),
}

impl RegistryBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arbitrary rule
    #[must_use]
    pub fn rule(mut self, target: impl Into<String>, rule: OverrideRule) -> Self {
        self.rules.push((target.into(), PendingRule::Ready(rule)));
        self
    }

    /// Read `target` from `source`
    #[must_use]
    pub fn rename(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.rules
            .push((target.into(), PendingRule::Rename(source.into())));
        self
    }

    /// Fixed value at `target`
    #[must_use]
    pub fn constant(self, target: impl Into<String>, value: Value) -> Self {
        self.rule(target, OverrideRule::Constant(Arc::new(move || value.clone())))
    }

    /// Value computed from the source root
    #[must_use]
    pub fn computed<F>(self, target: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.rule(target, OverrideRule::Computed(Arc::new(f)))
    }

    /// Fallible value computed from the source root
    #[must_use]
    pub fn partial_computed<F>(self, target: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> PartialResult<Value> + Send + Sync + 'static,
    {
        self.rule(target, OverrideRule::PartialComputed(Arc::new(f)))
    }

    /// Value used when the source has nothing at `target`
    #[must_use]
    pub fn variant_default(self, target: impl Into<String>, value: Value) -> Self {
        self.rule(
            target,
            OverrideRule::VariantDefault(Arc::new(move || value.clone())),
        )
    }

    /// Merge patches into the existing value at `target`
    #[must_use]
    pub fn deep_merge(self, target: impl Into<String>) -> Self {
        self.rule(target, OverrideRule::DeepMerge)
    }

    /// Set derivation flags
    #[inline]
    #[must_use]
    pub fn flags(mut self, flags: DeriveFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Validate and freeze the rules
    ///
    /// # Errors
    /// Returns error if a path is malformed or two rules target the same
    /// path.
    pub fn build(self) -> Result<OverrideRegistry, RegistryError> {
        let mut rules = BTreeMap::new();
        for (raw, pending) in self.rules {
            let path = parse_path(&raw)?;
            let rule = match pending {
                PendingRule::Ready(rule) => rule,
                PendingRule::Rename(source) if source.is_empty() => {
                    return Err(RegistryError::EmptyRenameSource(path));
                }
                PendingRule::Rename(source) => OverrideRule::Rename(parse_path(&source)?),
            };
            if rules.contains_key(&path) {
                return Err(RegistryError::ConflictingOverride(path));
            }
            rules.insert(path, rule);
        }

        let registry = OverrideRegistry(Arc::new(RegistryInner {
            id: RegistryId::next(),
            rules,
            flags: self.flags,
        }));
        tracing::debug!(
            id = %registry.id(),
            rules = registry.len(),
            "built override registry"
        );
        Ok(registry)
    }
}

fn parse_path(raw: &str) -> Result<FieldPath, RegistryError> {
    raw.parse().map_err(|source: PathError| RegistryError::InvalidPath {
        path: raw.to_string(),
        source,
    })
}

/// Errors constructing a registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Path is not syntactically well-formed
    #[error("invalid override path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathError,
    },

    /// Two rules target the same path
    #[error("conflicting overrides at '{0}'")]
    ConflictingOverride(FieldPath),

    /// Rename reads from the source root itself
    #[error("rename at '{0}' has an empty source path")]
    EmptyRenameSource(FieldPath),
}
