//! Plan cache behaviour under sharing and concurrency

use morph_core::{Engine, EngineConfig, OverrideRegistry};
use morph_test_utils::{init_tracing, person_patch_shape, person_shape, person_wire_shape};
use std::sync::Arc;
use std::thread;

#[test]
fn concurrent_first_use_sees_one_plan() {
    init_tracing();
    let engine = Engine::new(EngineConfig::new());
    let registry = OverrideRegistry::empty();
    let (source, target) = (person_wire_shape(), person_shape());

    let plans: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| engine.derive(&source, &target, &registry).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(plans.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(engine.plans().entry_count(), 1);
}

#[test]
fn structurally_equal_shapes_share_a_plan() {
    let engine = Engine::default();
    let registry = OverrideRegistry::empty();
    let a = engine.derive(&person_shape(), &person_shape(), &registry).unwrap();
    let b = engine.derive(&person_shape(), &person_shape(), &registry).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn patch_plans_are_cached_separately() {
    let engine = Engine::default();
    let registry = OverrideRegistry::empty();
    engine.derive(&person_shape(), &person_shape(), &registry).unwrap();
    let patch = engine
        .derive_patch(&person_shape(), &person_patch_shape(), &registry)
        .unwrap();
    let again = engine
        .derive_patch(&person_shape(), &person_patch_shape(), &registry)
        .unwrap();

    assert!(Arc::ptr_eq(&patch, &again));
    assert_eq!(engine.plans().entry_count(), 1);
    assert_eq!(engine.patch_plans().entry_count(), 1);
}

#[test]
fn small_caches_stay_bounded() {
    let engine = Engine::new(EngineConfig::new().with_cache_capacity(2));
    for _ in 0..10 {
        engine
            .derive(&person_shape(), &person_shape(), &OverrideRegistry::empty())
            .unwrap();
    }
    assert!(engine.plans().entry_count() <= 2);
}
