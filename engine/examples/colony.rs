//! A small foraging-colony simulation driving the ECS end to end:
//! filters with include/exclude masks, views with mid-iteration mutation,
//! reactive add callbacks, and deferred despawns.

use hive_engine::ecs::world::{Added, World};
use hive_macros::{Component, Tag};

const TICKS: u32 = 20;
const WORKERS: u32 = 12;

#[derive(Component, Clone, Copy)]
struct Position {
    x: i32,
    y: i32,
}

#[derive(Component)]
struct Energy(i32);

#[derive(Tag)]
struct Forager;

#[derive(Tag)]
struct Resting;

fn wander(world: &World, tick: u32) {
    // Active foragers only; resting workers sit this one out.
    let active = world
        .filter()
        .with::<Position>()
        .with::<Forager>()
        .without::<Resting>()
        .register();

    for worker in world.view(active) {
        {
            let mut pos = world.get_mut::<Position>(worker);
            // A cheap deterministic wobble keyed off id and tick.
            pos.x += ((worker.id() + tick) % 3) as i32 - 1;
            pos.y += ((worker.id() * 7 + tick) % 3) as i32 - 1;
        }

        let spent = {
            let mut energy = world.get_mut::<Energy>(worker);
            energy.0 -= 3;
            energy.0
        };
        if spent <= 0 {
            // Exhausted mid-iteration: flip to resting. The filter applies
            // the change after this pass finishes.
            world.add(worker, Resting);
        }
    }
}

fn recover(world: &World) {
    let sleeping = world.filter().with::<Resting>().register();

    for worker in world.view(sleeping) {
        let rested = {
            let mut energy = world.get_mut::<Energy>(worker);
            energy.0 += 10;
            energy.0
        };
        if rested >= 20 {
            world.remove::<Resting>(worker);
        }
    }
}

fn cull_strays(world: &World) {
    let everyone = world.filter().with::<Position>().register();

    for worker in world.view(everyone) {
        let pos = *world.get::<Position>(worker);
        if pos.x.abs() > 10 || pos.y.abs() > 10 {
            // Deferred until the view is released.
            world.despawn(worker);
        }
    }
}

fn main() {
    let world = World::new();

    // Announce new foragers in batches, once per unlock.
    world.on_added::<Forager>(|world| {
        let fresh = world.filter().with::<Added<Forager>>().register();
        println!("  recruited {} forager(s)", world.view(fresh).count());
    });

    for i in 0..WORKERS {
        world.spawn_with((
            Position {
                x: (i % 5) as i32 - 2,
                y: (i % 7) as i32 - 3,
            },
            Energy(8 + (i % 4) as i32 * 4),
            Forager,
        ));
    }

    let resting = world.filter().with::<Resting>().register();
    let everyone = world.filter().with::<Position>().register();

    for tick in 0..TICKS {
        wander(&world, tick);
        recover(&world);
        cull_strays(&world);

        println!(
            "tick {tick:>2}: {} alive, {} resting",
            world.entity_count(),
            world.view(resting).count()
        );
    }

    println!(
        "done: {} worker(s) survived the field",
        world.view(everyone).count()
    );
}
