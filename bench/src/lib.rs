//! Benchmark utilities for the hive ECS.
//!
//! This crate provides the shared pieces for the criterion benchmarks:
//! representative component types and world-population helpers with
//! reproducible random data.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p hive_bench
//!
//! # Run a specific group
//! cargo bench -p hive_bench -- spawn
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports.

pub mod components;

use hive_engine::ecs::{entity::Entity, world::World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::components::*;

/// Fixed seed so every run populates identical worlds.
pub const SEED: u64 = 0x5eed_c0de;

/// Populate a world with `count` entities in a realistic archetype mix:
/// all have Position, half move, a quarter fight, a tenth are frozen.
pub fn populate(world: &World, count: u32) -> Vec<Entity> {
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    (0..count)
        .map(|i| {
            let entity = world.spawn_with(Position {
                x: rng.gen_range(-100.0..100.0),
                y: rng.gen_range(-100.0..100.0),
                z: rng.gen_range(-100.0..100.0),
            });
            if i % 2 == 0 {
                world.add(
                    entity,
                    Velocity {
                        x: rng.gen_range(-1.0..1.0),
                        y: rng.gen_range(-1.0..1.0),
                        z: rng.gen_range(-1.0..1.0),
                    },
                );
            }
            if i % 4 == 0 {
                world.add(entity, Health(rng.gen_range(1..100)));
            }
            if i % 10 == 0 {
                world.add(entity, Frozen);
            }
            entity
        })
        .collect()
}
