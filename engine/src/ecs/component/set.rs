use crate::{
    ecs::{component::Component, entity::Entity, world::World},
    impl_for_tuples,
};

/// A bundle of component values attachable to an entity in one call.
///
/// Single components and tuples of bundles (nested tuples included) all
/// implement this, so `world.spawn_with((pos, vel))` reads naturally.
pub trait Set: 'static {
    /// Attach every value in this bundle to the entity.
    fn apply(self, world: &World, entity: Entity);
}

/// A single component is a bundle of one.
impl<C: Component> Set for C {
    fn apply(self, world: &World, entity: Entity) {
        world.add(entity, self);
    }
}

impl Set for () {
    fn apply(self, _world: &World, _entity: Entity) {
        // Nothing to attach.
    }
}

/// Bundles compose: tuples of bundles are bundles.
macro_rules! tuple_set {
    ($($name: ident),*) => {
        impl<$($name: Set),*> Set for ($($name,)*) {
            fn apply(self, world: &World, entity: Entity) {
                #[allow(non_snake_case)]
                let ($($name,)*) = self;
                $($name.apply(world, entity);)*
            }
        }
    }
}

impl_for_tuples!(tuple_set);
