//! Per-component-type storage pools.
//!
//! Every registered component type gets exactly one pool per world, created
//! lazily through the factory recorded at registration. Data components store
//! their values in a [`SparseSet`] keyed by entity id; tags carry no payload,
//! so a tag pool is a bare [`Mask`] of entity ids plus a count.
//!
//! The object-safe [`Pool`] trait is the surface the world uses for
//! id-addressed bulk operations, and the read-only surface external walkers
//! (serializers, dump tools) are expected to consume: length, per-id
//! containment, removal, reset. Pools use interior mutability so the world
//! can hold shared references across reentrant user callbacks; aliasing is
//! enforced at runtime by the inner `RefCell`s.
//!
//! Invariant: pool containment always agrees with the bit for this component
//! in the owning entity's archetype signature. The world cross-checks this in
//! debug builds after every structural mutation.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};

use crate::ecs::{component, mask::Mask, storage::sparse::SparseSet};

/// Type-erased surface of a component pool.
pub trait Pool: Any {
    /// The component id this pool stores.
    fn component_id(&self) -> component::Id;

    /// Whether this pool stores data values or tag presence.
    fn kind(&self) -> component::Kind;

    /// Number of entities currently holding this component.
    fn len(&self) -> usize;

    /// Whether the entity id holds this component.
    fn contains(&self, entity_id: u32) -> bool;

    /// Drop the entity's value (or presence bit).
    ///
    /// Removing an absent entry is a programming error; debug builds panic.
    fn remove(&self, entity_id: u32);

    /// Reset the pool, retaining storage.
    fn clear(&self);

    /// Downcast support for typed access.
    fn as_any(&self) -> &dyn Any;
}

/// Construct the right pool kind for a component type.
///
/// Taken as a plain `fn` pointer at registration time, this lets the world
/// instantiate pools by integer id with no generic information at the call
/// site.
pub(crate) fn new_pool<C: component::Component>(id: component::Id) -> Box<dyn Pool> {
    if C::IS_TAG {
        Box::new(TagPool::new(id))
    } else {
        Box::new(DataPool::<C>::new(id))
    }
}

/// Storage pool for a data component: a sparse set of values by entity id.
pub struct DataPool<C: component::Component> {
    id: component::Id,
    values: RefCell<SparseSet<C>>,
}

impl<C: component::Component> DataPool<C> {
    #[inline]
    pub(crate) fn new(id: component::Id) -> Self {
        Self {
            id,
            values: RefCell::new(SparseSet::new()),
        }
    }

    /// Borrow the values for reading.
    ///
    /// Panics if a mutable borrow of this pool is outstanding (a value
    /// reference held across a structural mutation of the same type).
    #[inline]
    pub fn borrow(&self) -> Ref<'_, SparseSet<C>> {
        self.values.borrow()
    }

    /// Borrow the values for writing. Panics on any outstanding borrow.
    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, SparseSet<C>> {
        self.values.borrow_mut()
    }

    /// Store a value for the entity id.
    #[inline]
    pub(crate) fn insert(&self, entity_id: u32, value: C) {
        self.values.borrow_mut().insert(entity_id, value);
    }

    /// Remove and return the entity's value.
    #[inline]
    pub(crate) fn take(&self, entity_id: u32) -> C {
        self.values.borrow_mut().remove(entity_id)
    }

    /// Replace the entity's value in place, returning the old one.
    pub(crate) fn replace(&self, entity_id: u32, value: C) -> C {
        let mut values = self.values.borrow_mut();
        let slot = values
            .get_mut(entity_id)
            .expect("cannot replace a component the entity does not have");
        std::mem::replace(slot, value)
    }
}

impl<C: component::Component> Pool for DataPool<C> {
    #[inline]
    fn component_id(&self) -> component::Id {
        self.id
    }

    #[inline]
    fn kind(&self) -> component::Kind {
        component::Kind::Data
    }

    #[inline]
    fn len(&self) -> usize {
        self.values.borrow().len()
    }

    #[inline]
    fn contains(&self, entity_id: u32) -> bool {
        self.values.borrow().contains(entity_id)
    }

    fn remove(&self, entity_id: u32) {
        drop(self.values.borrow_mut().remove(entity_id));
    }

    fn clear(&self) {
        self.values.borrow_mut().clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Storage pool for a tag: presence is all that is stored.
pub struct TagPool {
    id: component::Id,
    bits: RefCell<Mask>,
    count: Cell<usize>,
}

impl TagPool {
    #[inline]
    pub(crate) fn new(id: component::Id) -> Self {
        Self {
            id,
            bits: RefCell::new(Mask::new()),
            count: Cell::new(0),
        }
    }

    /// Mark the entity id as carrying this tag.
    pub(crate) fn insert(&self, entity_id: u32) {
        let mut bits = self.bits.borrow_mut();
        debug_assert!(
            !bits.check(entity_id),
            "entity {entity_id} already carries tag {:?}",
            self.id
        );
        bits.set(entity_id);
        self.count.set(self.count.get() + 1);
    }
}

impl Pool for TagPool {
    #[inline]
    fn component_id(&self) -> component::Id {
        self.id
    }

    #[inline]
    fn kind(&self) -> component::Kind {
        component::Kind::Tag
    }

    #[inline]
    fn len(&self) -> usize {
        self.count.get()
    }

    #[inline]
    fn contains(&self, entity_id: u32) -> bool {
        self.bits.borrow().check(entity_id)
    }

    fn remove(&self, entity_id: u32) {
        let mut bits = self.bits.borrow_mut();
        debug_assert!(
            bits.check(entity_id),
            "entity {entity_id} does not carry tag {:?}",
            self.id
        );
        bits.unset(entity_id);
        self.count.set(self.count.get() - 1);
    }

    fn clear(&self) {
        self.bits.borrow_mut().clear();
        self.count.set(0);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Component, Id, Kind};

    struct Health(u32);
    impl Component for Health {}

    struct Frozen;
    impl Component for Frozen {
        const IS_TAG: bool = true;
    }

    #[test]
    fn data_pool_round_trip() {
        // Given
        let pool = DataPool::<Health>::new(Id::new(0));

        // When
        pool.insert(3, Health(70));
        pool.insert(9, Health(20));

        // Then
        assert_eq!(pool.len(), 2);
        assert!(pool.contains(3));
        assert!(!pool.contains(4));
        assert_eq!(pool.borrow().get(3).unwrap().0, 70);

        // And When
        let taken = pool.take(3);

        // Then
        assert_eq!(taken.0, 70);
        assert!(!pool.contains(3));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn data_pool_replace_keeps_slot() {
        // Given
        let pool = DataPool::<Health>::new(Id::new(0));
        pool.insert(1, Health(10));

        // When
        let old = pool.replace(1, Health(99));

        // Then
        assert_eq!(old.0, 10);
        assert_eq!(pool.borrow().get(1).unwrap().0, 99);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn tag_pool_presence_only() {
        // Given
        let pool = TagPool::new(Id::new(1));

        // When
        pool.insert(2);
        pool.insert(7);

        // Then
        assert_eq!(pool.len(), 2);
        assert!(pool.contains(2));
        assert!(!pool.contains(3));

        // And When
        pool.remove(2);

        // Then
        assert!(!pool.contains(2));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn factory_picks_pool_kind() {
        // Given / When
        let data = new_pool::<Health>(Id::new(0));
        let tag = new_pool::<Frozen>(Id::new(1));

        // Then
        assert_eq!(data.kind(), Kind::Data);
        assert_eq!(tag.kind(), Kind::Tag);
        assert!(data.as_any().downcast_ref::<DataPool<Health>>().is_some());
        assert!(tag.as_any().downcast_ref::<TagPool>().is_some());
    }

    #[test]
    fn clear_resets_both_kinds() {
        // Given
        let data = new_pool::<Health>(Id::new(0));
        data.as_any()
            .downcast_ref::<DataPool<Health>>()
            .unwrap()
            .insert(0, Health(1));
        let tag = new_pool::<Frozen>(Id::new(1));
        tag.as_any().downcast_ref::<TagPool>().unwrap().insert(0);

        // When
        data.clear();
        tag.clear();

        // Then
        assert_eq!(data.len(), 0);
        assert_eq!(tag.len(), 0);
        assert!(!data.contains(0));
        assert!(!tag.contains(0));
    }
}
