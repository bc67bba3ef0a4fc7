//! ECS microbenchmarks using Criterion.
//!
//! These benchmarks measure individual operations in isolation:
//! - Entity spawn/despawn
//! - Component add/remove (archetype migration)
//! - View iteration over filters
//! - Filter churn (membership moving in and out)

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use hive_bench::components::*;
use hive_bench::populate;
use hive_engine::ecs::world::World;

// =============================================================================
// Spawn Benchmarks
// =============================================================================

fn bench_spawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for count in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("empty", count), &count, |b, &n| {
            b.iter(|| {
                let world = World::new();
                for _ in 0..n {
                    black_box(world.spawn());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("three_components", count), &count, |b, &n| {
            b.iter(|| {
                let world = World::new();
                for _ in 0..n {
                    black_box(world.spawn_with((
                        Position::default(),
                        Velocity::default(),
                        Transform::default(),
                    )));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("spawn_despawn", count), &count, |b, &n| {
            b.iter(|| {
                let world = World::new();
                let entities: Vec<_> =
                    (0..n).map(|_| world.spawn_with(Position::default())).collect();
                for entity in entities {
                    world.despawn(entity);
                }
            });
        });
    }

    group.finish();
}

// =============================================================================
// Migration Benchmarks
// =============================================================================

fn bench_migration(c: &mut Criterion) {
    let mut group = c.benchmark_group("migration");

    for count in [1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("add_remove", count), &count, |b, &n| {
            let world = World::new();
            let entities = populate(&world, n);
            b.iter(|| {
                for entity in &entities {
                    world.add(*entity, Transform::default());
                }
                for entity in &entities {
                    world.remove::<Transform>(*entity);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("remove_all", count), &count, |b, &n| {
            b.iter(|| {
                let world = World::new();
                let entities = populate(&world, n);
                for entity in &entities {
                    world.add(*entity, Transform::default());
                }
                world.remove_all::<Transform>();
                black_box(world.entity_count());
            });
        });
    }

    group.finish();
}

// =============================================================================
// Iteration Benchmarks
// =============================================================================

fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration");

    // Entity ids are 16-bit, so stay under the 65k id-space ceiling.
    for count in [1_000, 10_000, 50_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("view_position", count), &count, |b, &n| {
            let world = World::new();
            populate(&world, n);
            let filter = world.filter().with::<Position>().register();
            b.iter(|| {
                let mut sum = 0.0f32;
                for entity in world.view(filter) {
                    sum += world.get::<Position>(entity).x;
                }
                black_box(sum)
            });
        });

        group.bench_with_input(
            BenchmarkId::new("view_moving_unfrozen", count),
            &count,
            |b, &n| {
                let world = World::new();
                populate(&world, n);
                let filter = world
                    .filter()
                    .with::<Position>()
                    .with::<Velocity>()
                    .without::<Frozen>()
                    .register();
                b.iter(|| {
                    for entity in world.view(filter) {
                        let delta = world.get::<Velocity>(entity).x;
                        world.get_mut::<Position>(entity).x += black_box(delta);
                    }
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// Filter Churn Benchmarks
// =============================================================================

fn bench_filter_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_churn");

    for count in [1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        // Entities bounce in and out of a filter via an excluded tag.
        group.bench_with_input(BenchmarkId::new("toggle_tag", count), &count, |b, &n| {
            let world = World::new();
            let entities = populate(&world, n);
            let _watcher = world
                .filter()
                .with::<Position>()
                .without::<Frozen>()
                .register();
            let unfrozen: Vec<_> = entities
                .iter()
                .copied()
                .filter(|e| !world.has::<Frozen>(*e))
                .collect();
            b.iter(|| {
                for entity in &unfrozen {
                    world.add(*entity, Frozen);
                }
                for entity in &unfrozen {
                    world.remove::<Frozen>(*entity);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_spawn,
    bench_migration,
    bench_iteration,
    bench_filter_churn
);
criterion_main!(benches);
