//! The derivation engine
//!
//! Ties the planner, the plan cache and the synthesizer together. An
//! [`Engine`] is `Send + Sync`; share one per process or use the free
//! functions in the crate root.

use crate::cache::PlanCache;
use crate::config::EngineConfig;
use crate::error::{DeriveError, PatchError};
use morph_partial::{ErrorMode, PartialResult};
use morph_plan::{PatchPlan, Plan, PlanKey, Planner};
use morph_rules::OverrideRegistry;
use morph_shape::{ShapeModel, Value};
use std::sync::Arc;

/// Derives, caches and runs transformation plans
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    plans: PlanCache<Plan>,
    patches: PlanCache<PatchPlan>,
    // Shared so registry-less patches hit the cache.
    empty: OverrideRegistry,
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        tracing::debug!(
            "Creating engine: max_depth={}, cache_capacity={}",
            config.max_depth,
            config.cache_capacity
        );
        Self {
            config,
            plans: PlanCache::new(config.cache_capacity),
            patches: PlanCache::new(config.cache_capacity),
            empty: OverrideRegistry::empty(),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn plans(&self) -> &PlanCache<Plan> {
        &self.plans
    }

    #[inline]
    #[must_use]
    pub fn patch_plans(&self) -> &PlanCache<PatchPlan> {
        &self.patches
    }

    /// Plan for turning `source` values into `target` values
    ///
    /// Cached per (source, target, registry).
    ///
    /// # Errors
    /// Returns every structural diagnostic if the shapes cannot be matched.
    pub fn derive(
        &self,
        source: &ShapeModel,
        target: &ShapeModel,
        registry: &OverrideRegistry,
    ) -> Result<Arc<Plan>, DeriveError> {
        let key = plan_key(source, target, registry);
        self.plans
            .get_or_derive(key, || {
                Planner::new(source, target, registry)
                    .with_config(self.config.planner())
                    .derive()
            })
            .map_err(DeriveError::from)
    }

    /// Run a plan against one source value
    pub fn transform(&self, plan: &Plan, value: &Value, fail_fast: bool) -> PartialResult<Value> {
        morph_synth::execute(plan, value, ErrorMode::from_fail_fast(fail_fast))
    }

    /// Derive then run, in the configured default error mode
    ///
    /// # Errors
    /// Returns error if no plan can be derived; value-level failures are in
    /// the returned result.
    pub fn convert(
        &self,
        source: &ShapeModel,
        target: &ShapeModel,
        registry: &OverrideRegistry,
        value: &Value,
    ) -> Result<PartialResult<Value>, DeriveError> {
        let plan = self.derive(source, target, registry)?;
        Ok(morph_synth::execute(&plan, value, self.config.default_mode()))
    }

    /// Plan for merging `patch_shape` values into `target` values
    ///
    /// # Errors
    /// Returns every structural diagnostic, including patch fields with no
    /// target counterpart.
    pub fn derive_patch(
        &self,
        target: &ShapeModel,
        patch_shape: &ShapeModel,
        registry: &OverrideRegistry,
    ) -> Result<Arc<PatchPlan>, PatchError> {
        let key = plan_key(patch_shape, target, registry);
        self.patches
            .get_or_derive(key, || {
                Planner::new(patch_shape, target, registry)
                    .with_config(self.config.planner())
                    .derive_patch()
            })
            .map_err(PatchError::from)
    }

    /// Merge a patch into an existing value with no overrides
    ///
    /// # Errors
    /// Returns error if no patch plan can be derived.
    pub fn patch(
        &self,
        target: &ShapeModel,
        existing: &Value,
        patch_shape: &ShapeModel,
        patch_value: &Value,
    ) -> Result<PartialResult<Value>, PatchError> {
        self.patch_with(
            target,
            existing,
            patch_shape,
            patch_value,
            &self.empty,
            self.config.fail_fast_default,
        )
    }

    /// Merge a patch into an existing value
    ///
    /// # Errors
    /// Returns error if no patch plan can be derived.
    pub fn patch_with(
        &self,
        target: &ShapeModel,
        existing: &Value,
        patch_shape: &ShapeModel,
        patch_value: &Value,
        registry: &OverrideRegistry,
        fail_fast: bool,
    ) -> Result<PartialResult<Value>, PatchError> {
        let plan = self.derive_patch(target, patch_shape, registry)?;
        Ok(morph_synth::apply_patch(
            &plan,
            existing,
            patch_value,
            ErrorMode::from_fail_fast(fail_fast),
        ))
    }

    /// Drop every cached plan
    pub fn clear_cache(&self) {
        self.plans.invalidate_all();
        self.patches.invalidate_all();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn plan_key(source: &ShapeModel, target: &ShapeModel, registry: &OverrideRegistry) -> PlanKey {
    PlanKey {
        source: source.id(),
        target: target.id(),
        registry: registry.id(),
    }
}
