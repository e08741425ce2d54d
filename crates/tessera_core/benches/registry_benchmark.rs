//! # Registry Performance Benchmark
//!
//! Measures the operations that dominate a frame:
//! - entity create/delete churn
//! - component add/remove on a live entity (pool slot reuse)
//! - group iteration versus a brute-force scan
//!
//! Run with: `cargo bench --package tessera_core`

// Benchmarks don't need docs and may carry unread fields
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use tessera_core::{Component, EntityId, Registry};

const ENTITY_COUNT: usize = 100_000;

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}
impl Component for Velocity {}

#[derive(Clone, Copy)]
struct Health(u32);
impl Component for Health {}

/// Every entity gets a position, every other one a velocity.
fn populated(count: usize) -> (Registry, Vec<EntityId>) {
    let mut registry = Registry::new();
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let e = registry.create_entity();
        let f = i as f32;
        let _ = registry.add_component(e, Position { x: f, y: f });
        if i % 2 == 0 {
            let _ = registry.add_component(e, Velocity { dx: 0.1, dy: 0.2 });
        }
        ids.push(e);
    }
    (registry, ids)
}

/// Benchmark: create N bare entities.
fn bench_create_entities(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_entities");

    for count in [1_000, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut registry = Registry::new();
                for _ in 0..count {
                    black_box(registry.create_entity());
                }
                registry.len()
            });
        });
    }

    group.finish();
}

/// Benchmark: delete and recreate 10K entities that all belong to a group.
fn bench_create_delete_cycle(c: &mut Criterion) {
    let (mut registry, mut ids) = populated(ENTITY_COUNT);
    let _ = registry.group_id::<(Position, Velocity)>();

    c.bench_function("create_delete_cycle_10K", |b| {
        b.iter(|| {
            for id in ids.iter_mut().take(10_000) {
                let _ = registry.delete_entity(*id);
                let e = registry.create_entity();
                let _ = registry.add_component(e, Position { x: 0.0, y: 0.0 });
                let _ = registry.add_component(e, Velocity { dx: 1.0, dy: 1.0 });
                *id = e;
            }
            black_box(registry.len())
        });
    });
}

/// Benchmark: add then remove a component; the slot is reused every time.
fn bench_add_remove_component(c: &mut Criterion) {
    let (mut registry, ids) = populated(10_000);
    let _ = registry.group_id::<(Position, Health)>();

    c.bench_function("add_remove_component_10K", |b| {
        b.iter(|| {
            for &id in &ids {
                let _ = registry.add_component(id, Health(100));
            }
            for &id in &ids {
                let _ = black_box(registry.remove_component::<Health>(id));
            }
        });
    });
}

/// Benchmark: iterate a cached group against a full scan with lookups.
fn bench_group_iteration(c: &mut Criterion) {
    let (mut registry, _) = populated(ENTITY_COUNT);
    let _ = registry.group_id::<(Position, Velocity)>();

    let mut group = c.benchmark_group("iterate_position_velocity");

    group.bench_function("group_view", |b| {
        b.iter(|| {
            let mut sum = 0.0_f32;
            if let Some(view) = registry.find_entity_group::<(Position, Velocity)>() {
                for (_, pos, vel) in view.iter() {
                    sum += pos.x * vel.dx + pos.y * vel.dy;
                }
            }
            black_box(sum)
        });
    });

    group.bench_function("scan_all_entities", |b| {
        b.iter(|| {
            let mut sum = 0.0_f32;
            for &e in registry.entities() {
                if let (Some(pos), Some(vel)) = (
                    registry.get_component::<Position>(e),
                    registry.get_component::<Velocity>(e),
                ) {
                    sum += pos.x * vel.dx + pos.y * vel.dy;
                }
            }
            black_box(sum)
        });
    });

    group.finish();
}

/// Benchmark: first lookup of a group over existing entities.
fn bench_group_materialize(c: &mut Criterion) {
    c.bench_function("materialize_group_100K", |b| {
        b.iter_batched(
            || populated(ENTITY_COUNT).0,
            |mut registry| {
                let members = registry.get_entity_group::<(Velocity, Position)>().len();
                black_box(members)
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_create_entities,
    bench_create_delete_cycle,
    bench_add_remove_component,
    bench_group_iteration,
    bench_group_materialize,
);

criterion_main!(benches);
