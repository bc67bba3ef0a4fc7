//! An archetype-based in-memory entity store for cooperative single-threaded
//! simulations.
//!
//! The crate centers on [`ecs::world::World`]: spawn entities, attach
//! components (derive them with `hive_macros`), register filters over
//! component signatures, and iterate views that stay coherent while user
//! code mutates the world mid-iteration.

// Lets the derive macros refer to this crate by its external name from
// within (their expansions name `::hive_engine::...`).
extern crate self as hive_engine;

pub mod ecs;
