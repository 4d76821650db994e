//! Derived plan cache using moka
//!
//! Plans are keyed by the identities of their inputs, so a new registry or
//! a changed shape simply misses. Failed derivations are never stored.

use moka::sync::Cache;
use morph_plan::{DiagnosticSet, PlanKey};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Concurrent compute-if-absent cache of sealed plans
pub struct PlanCache<P> {
    inner: Cache<PlanKey, Arc<P>>,
}

impl<P: Send + Sync + 'static> PlanCache<P> {
    /// Create cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &PlanKey) -> Option<Arc<P>> {
        self.inner.get(key)
    }

    /// Cached plan for `key`, deriving it on first use
    ///
    /// Concurrent callers for the same key wait for a single derivation.
    ///
    /// # Errors
    /// Returns the diagnostics of a rejected derivation.
    pub fn get_or_derive<F>(&self, key: PlanKey, derive: F) -> Result<Arc<P>, DiagnosticSet>
    where
        F: FnOnce() -> Result<P, DiagnosticSet>,
    {
        let mut derived = false;
        let result = self.inner.try_get_with(key, || {
            derived = true;
            derive().map(Arc::new)
        });

        if derived {
            tracing::debug!(
                "Plan cache miss for {} -> {} ({})",
                key.source.short(),
                key.target.short(),
                key.registry
            );
        } else {
            tracing::trace!("Plan cache hit for {} -> {}", key.source.short(), key.target.short());
        }

        result.map_err(|shared| Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: &PlanKey) -> bool {
        self.inner.contains_key(key)
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Number of cached plans after pending maintenance has run
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl<P: Send + Sync + 'static> Debug for PlanCache<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanCache")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_plan::Diagnostic;
    use morph_rules::OverrideRegistry;
    use morph_shape::{FieldPath, ShapeId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(seed: &[u8]) -> PlanKey {
        PlanKey {
            source: ShapeId::compute(seed),
            target: ShapeId::compute(b"target"),
            registry: OverrideRegistry::empty().id(),
        }
    }

    #[test]
    fn derives_once_per_key() {
        let cache: PlanCache<String> = PlanCache::new(16);
        let calls = AtomicUsize::new(0);
        let k = key(b"a");

        for _ in 0..3 {
            let plan = cache
                .get_or_derive(k, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("plan".to_string())
                })
                .unwrap();
            assert_eq!(plan.as_str(), "plan");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&k));
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache: PlanCache<String> = PlanCache::new(16);
        let k = key(b"b");
        let missing = DiagnosticSet::from_iter([Diagnostic::MissingAccessor {
            path: FieldPath::single("x"),
        }]);

        let err = cache.get_or_derive(k, || Err(missing.clone())).unwrap_err();
        assert_eq!(err, missing);
        assert!(!cache.contains(&k));

        assert!(cache.get_or_derive(k, || Ok("fixed".to_string())).is_ok());
        assert!(cache.contains(&k));
    }

    #[test]
    fn invalidate_all_empties_the_cache() {
        let cache: PlanCache<u32> = PlanCache::new(16);
        for seed in [b"1", b"2", b"3"] {
            cache.get_or_derive(key(seed), || Ok(1)).unwrap();
        }
        assert_eq!(cache.entry_count(), 3);
        cache.invalidate_all();
        assert_eq!(cache.entry_count(), 0);
    }
}
