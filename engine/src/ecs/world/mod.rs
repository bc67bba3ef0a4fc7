//! The World is the central container and façade of the ECS.
//!
//! A `World` owns the entity manager, every component pool, and the
//! archetype manager (which in turn owns archetypes and filters). It provides
//! the primary API for spawning and despawning entities, attaching and
//! detaching components, registering filters, and iterating views.
//!
//! # Reentrancy
//!
//! The world is single-threaded; "concurrency" here means reentrancy through
//! user code: reactive callbacks and anything invoked while iterating a
//! [`View`]. The world keeps a nesting lock counter, incremented for every
//! live view. While the counter is non-zero, despawns are deferred into a
//! pending set and filter membership changes are deferred inside each locked
//! filter; everything flushes when the counter returns to zero. Unlocked
//! mutations apply immediately and synchronously.
//!
//! Most methods therefore take `&self`: internal state lives behind
//! `RefCell`/`Cell`, and runtime borrow checks stand in for the aliasing
//! rules user callbacks would otherwise violate. Holding a component
//! reference across a structural mutation of the same component type panics.
//!
//! # Example
//!
//! ```ignore
//! use hive_engine::ecs::world::World;
//!
//! let world = World::new();
//! let entity = world.spawn();
//! world.add(entity, Position { x: 0.0, y: 0.0 });
//!
//! let moving = world.filter().with::<Position>().register();
//! for entity in world.view(moving) {
//!     let pos = world.get::<Position>(entity);
//! }
//! ```

mod reaction;

use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    collections::VecDeque,
    marker::PhantomData,
    rc::Rc,
    sync::Arc,
};

pub use reaction::{Added, Removed};

use crate::ecs::{
    archetype::Archetypes,
    component::{self, Component},
    entity::{self, Entity},
    filter::{self, View},
    mask::Mask,
    storage::pool::{DataPool, Pool, TagPool},
    world::reaction::{Extra, Reactions},
};

/// The central container for all entities, components, and filters.
pub struct World {
    /// The component type registry; shareable across worlds so ids agree.
    registry: Arc<component::Registry>,

    /// Entity identity, versions, and the recycling free-list.
    entities: RefCell<entity::Entities>,

    /// One pool per registered component id, created lazily. Entries are
    /// never removed or replaced once created.
    pools: RefCell<Vec<Option<Box<dyn Pool>>>>,

    /// Archetypes, filters, and every index tying them together.
    archetypes: RefCell<Archetypes>,

    /// Nesting lock counter; non-zero while any view is alive.
    locks: Cell<u32>,

    /// Despawns requested while locked, applied in recording order at
    /// unlock.
    pending_despawn: RefCell<Vec<Entity>>,

    /// Ids already in the pending set, to drop duplicate requests.
    despawn_marks: RefCell<Mask>,

    /// Reactive add/remove subscriptions and their dirty markers.
    reactions: Reactions,

    /// Marker to make World !Send: all interior state is single-threaded.
    _not_send: PhantomData<*mut ()>,
}

impl World {
    /// Create a world with its own component registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(component::Registry::new()))
    }

    /// Create a world sharing an existing component registry, so component
    /// ids agree across worlds.
    pub fn with_registry(registry: Arc<component::Registry>) -> Self {
        Self {
            registry,
            entities: RefCell::new(entity::Entities::new()),
            pools: RefCell::new(Vec::new()),
            archetypes: RefCell::new(Archetypes::new()),
            locks: Cell::new(0),
            pending_despawn: RefCell::new(Vec::new()),
            despawn_marks: RefCell::new(Mask::new()),
            reactions: Reactions::default(),
            _not_send: PhantomData,
        }
    }

    /// The component type registry.
    #[inline]
    pub fn registry(&self) -> &component::Registry {
        &self.registry
    }

    /// Clone the shared handle to the registry, for building sibling worlds.
    #[inline]
    pub fn share_registry(&self) -> Arc<component::Registry> {
        Arc::clone(&self.registry)
    }

    // ---- entity lifecycle -------------------------------------------------

    /// Create an entity with no components, placed in the empty archetype.
    pub fn spawn(&self) -> Entity {
        let entity = self.entities.borrow_mut().create();
        self.archetypes.borrow_mut().place_in_empty(entity);
        log::trace!("spawned {entity:?}");
        entity
    }

    /// Create an entity and attach a bundle of components.
    pub fn spawn_with<S: component::Set>(&self, set: S) -> Entity {
        let entity = self.spawn();
        set.apply(self, entity);
        entity
    }

    /// Destroy an entity and every component it carries.
    ///
    /// While the world is locked (inside an active view or reactive
    /// callback) the despawn is deferred and applied when the lock count
    /// returns to zero, in recording order; it never happens immediately in
    /// that case.
    pub fn despawn(&self, entity: Entity) {
        debug_assert!(
            self.is_alive(entity),
            "despawning a dead or stale handle: {entity:?}"
        );
        if self.locks.get() > 0 {
            let mut marks = self.despawn_marks.borrow_mut();
            if !marks.check(entity.id()) {
                marks.set(entity.id());
                self.pending_despawn.borrow_mut().push(entity);
                log::trace!("deferred despawn of {entity:?}");
            }
            return;
        }
        self.do_despawn(entity);
    }

    /// Whether the handle refers to a live entity.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.borrow().is_alive(entity)
    }

    /// Number of live entities.
    #[inline]
    pub fn entity_count(&self) -> u32 {
        self.entities.borrow().len()
    }

    // ---- components -------------------------------------------------------

    /// Attach a component value to an entity.
    ///
    /// The pool and the archetype are updated as one logical step. A second
    /// add of the same data component pushes the value into a hidden
    /// overflow list (see [`remove`](Self::remove)); a second add of a tag
    /// is a programming error.
    pub fn add<C: Component>(&self, entity: Entity, value: C) {
        debug_assert!(
            self.is_alive(entity),
            "adding a component to a dead entity: {entity:?}"
        );
        let component = self.registry.register::<C>();

        if self.has_component(entity.id(), component) {
            debug_assert!(
                !C::IS_TAG,
                "tag `{}` added twice to {entity:?}",
                std::any::type_name::<C>()
            );
            if !C::IS_TAG {
                self.push_extra(entity, value);
                self.note_added(entity, component);
            }
        } else {
            if C::IS_TAG {
                self.tag_pool(component).insert(entity.id());
            } else {
                self.data_pool::<C>(component).insert(entity.id(), value);
            }
            self.archetypes.borrow_mut().transition(entity, component, true);
            self.assert_coherent(entity, component);
            self.note_added(entity, component);
        }
        self.maybe_drain();
    }

    /// Detach a component from an entity.
    ///
    /// If the entity holds extra values of the component, the front of the
    /// overflow list is promoted into the primary slot instead and the
    /// signature is unchanged. Removing an absent component is a programming
    /// error.
    pub fn remove<C: Component>(&self, entity: Entity) {
        debug_assert!(
            self.is_alive(entity),
            "removing a component from a dead entity: {entity:?}"
        );
        let Some(component) = self.registry.get::<C>() else {
            debug_assert!(
                false,
                "removing never-registered component `{}`",
                std::any::type_name::<C>()
            );
            return;
        };
        if !self.has_component(entity.id(), component) {
            debug_assert!(
                false,
                "removing absent component `{}` from {entity:?}",
                std::any::type_name::<C>()
            );
            return;
        }

        if C::IS_TAG || !self.promote_extra::<C>(entity, component) {
            self.pool_by_id(component).remove(entity.id());
            self.archetypes
                .borrow_mut()
                .transition(entity, component, false);
            self.assert_coherent(entity, component);
        }
        self.note_removed(entity, component);
        self.maybe_drain();
    }

    /// Whether the entity currently holds the component.
    pub fn has<C: Component>(&self, entity: Entity) -> bool {
        debug_assert!(
            self.is_alive(entity),
            "component check on a dead entity: {entity:?}"
        );
        match self.registry.get::<C>() {
            Some(component) => self.has_component(entity.id(), component),
            None => false,
        }
    }

    /// Borrow the entity's component value.
    ///
    /// Contract violations, both fatal: `C` is a tag (tags carry no value),
    /// or the entity does not hold `C`. Check with [`has`](Self::has) first
    /// when presence is uncertain.
    pub fn get<C: Component>(&self, entity: Entity) -> Ref<'_, C> {
        assert!(
            !C::IS_TAG,
            "`{}` is a tag and carries no value",
            std::any::type_name::<C>()
        );
        debug_assert!(
            self.is_alive(entity),
            "component access on a dead entity: {entity:?}"
        );
        let component = self.registry.get::<C>().unwrap_or_else(|| {
            panic!(
                "component `{}` was never registered",
                std::any::type_name::<C>()
            )
        });
        let pool = self.data_pool::<C>(component);
        Ref::map(pool.borrow(), |values| {
            values.get(entity.id()).unwrap_or_else(|| {
                panic!(
                    "{entity:?} does not have component `{}`",
                    std::any::type_name::<C>()
                )
            })
        })
    }

    /// Borrow the entity's component value mutably.
    ///
    /// Same contract as [`get`](Self::get).
    pub fn get_mut<C: Component>(&self, entity: Entity) -> RefMut<'_, C> {
        assert!(
            !C::IS_TAG,
            "`{}` is a tag and carries no value",
            std::any::type_name::<C>()
        );
        debug_assert!(
            self.is_alive(entity),
            "component access on a dead entity: {entity:?}"
        );
        let component = self.registry.get::<C>().unwrap_or_else(|| {
            panic!(
                "component `{}` was never registered",
                std::any::type_name::<C>()
            )
        });
        let pool = self.data_pool::<C>(component);
        RefMut::map(pool.borrow_mut(), |values| {
            values.get_mut(entity.id()).unwrap_or_else(|| {
                panic!(
                    "{entity:?} does not have component `{}`",
                    std::any::type_name::<C>()
                )
            })
        })
    }

    /// Remove every entity's copy of the component, in bulk.
    ///
    /// Affected archetypes are migrated wholesale (id order, members in
    /// dense order) and the pool is reset. Reactive subscriptions do not
    /// fire for bulk removal.
    pub fn remove_all<C: Component>(&self) {
        let Some(component) = self.registry.get::<C>() else {
            return;
        };
        self.remove_all_by_id(component);
        // Overflow lists of C are orphaned by the bulk removal; drop them
        // with their primary.
        if !C::IS_TAG
            && let Some(extra) = self.registry.get::<Extra<C>>()
        {
            self.remove_all_by_id(extra);
        }
    }

    /// Id-addressed bulk removal, usable with no generic information.
    fn remove_all_by_id(&self, component: component::Id) {
        self.archetypes.borrow_mut().remove_everywhere(component);
        if let Some(pool) = self.try_pool_by_id(component) {
            pool.clear();
        }
    }

    // ---- filters and views ------------------------------------------------

    /// Start building a filter: a standing query by include/exclude masks.
    pub fn filter(&self) -> FilterBuilder<'_> {
        FilterBuilder {
            world: self,
            include: Mask::new(),
            exclude: Mask::new(),
        }
    }

    /// Acquire an iteration view over a filter.
    ///
    /// Acquisition locks the filter and the world; the view snapshots the
    /// current length, so entities entering the filter during the iteration
    /// are not visited in the same pass. Dropping the view unlocks both and
    /// flushes whatever was deferred.
    pub fn view(&self, filter: filter::Id) -> View<'_> {
        let len = {
            let mut archetypes = self.archetypes.borrow_mut();
            let filter = archetypes.filter_mut(filter);
            filter.lock();
            filter.len()
        };
        self.lock();
        View::new(self, filter, len)
    }

    /// Release one view of a filter: unlock the filter (flushing its pending
    /// membership at zero) and then the world.
    pub(crate) fn release_view(&self, filter: filter::Id) {
        self.archetypes.borrow_mut().filter_mut(filter).unlock();
        self.unlock();
    }

    /// Shared read access to the archetype manager: signatures, member
    /// lists, and filters. This is the surface external walkers (snapshot
    /// writers, debug dumps) combine with [`pool_of`](Self::pool_of) instead
    /// of reaching into storage internals.
    #[inline]
    pub fn archetypes(&self) -> Ref<'_, Archetypes> {
        self.archetypes.borrow()
    }

    /// The type-erased pool for a component id, if one was ever created:
    /// length, per-id containment, kind. Read-only companion to
    /// [`archetypes`](Self::archetypes) for external walkers.
    #[inline]
    pub fn pool_of(&self, component: component::Id) -> Option<&dyn Pool> {
        self.try_pool_by_id(component)
    }

    // ---- reactive subscriptions --------------------------------------------

    /// Run `callback` after entities gain a `C`, batched once per unlock.
    ///
    /// Affected entities carry the [`Added<C>`] marker tag until the
    /// callback pass completes; filter on it inside the callback to find
    /// them.
    pub fn on_added<C: Component>(&self, callback: impl Fn(&World) + 'static) {
        let guarded = self.registry.register::<C>();
        let marker = self.registry.register::<Added<C>>();
        self.reactions.guard_add(guarded, marker, Rc::new(callback));
    }

    /// Run `callback` after entities lose a `C`, batched once per unlock.
    ///
    /// Affected entities carry the [`Removed<C>`] marker tag until the
    /// callback pass completes.
    pub fn on_removed<C: Component>(&self, callback: impl Fn(&World) + 'static) {
        let guarded = self.registry.register::<C>();
        let marker = self.registry.register::<Removed<C>>();
        self.reactions.guard_remove(guarded, marker, Rc::new(callback));
    }

    // ---- locking ----------------------------------------------------------

    /// Enter a locked region. Strictly a nesting counter, not a mutex.
    fn lock(&self) {
        self.locks.set(self.locks.get() + 1);
    }

    /// Leave a locked region; at zero, apply deferred despawns and drain
    /// reactive markers.
    fn unlock(&self) {
        let locks = self.locks.get();
        debug_assert!(locks > 0, "unbalanced world unlock");
        self.locks.set(locks - 1);
        if locks == 1 {
            self.flush_despawns();
            self.drain_reactions();
        }
    }

    /// Drain reactions now if nothing holds the world locked.
    fn maybe_drain(&self) {
        if self.locks.get() == 0 {
            self.drain_reactions();
        }
    }

    /// Apply deferred despawns in recording order.
    fn flush_despawns(&self) {
        loop {
            let batch: Vec<Entity> = self.pending_despawn.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                return;
            }
            for entity in batch {
                self.despawn_marks.borrow_mut().unset(entity.id());
                if self.is_alive(entity) {
                    self.do_despawn(entity);
                }
            }
        }
    }

    /// Destroy an entity now: release every pooled value named by its
    /// signature, leave its archetype (notifying filters), free the id.
    fn do_despawn(&self, entity: Entity) {
        log::trace!("despawning {entity:?}");
        let signature = self.archetypes.borrow().mask_of(entity.id()).clone();
        for bit in signature.ones() {
            self.pool_by_id(component::Id::new(bit)).remove(entity.id());
        }
        self.archetypes.borrow_mut().remove_entity(entity);
        self.entities.borrow_mut().free(entity);
    }

    /// Invoke the callback of every dirty reactive marker, then strip the
    /// marker tags in bulk. The world stays locked for the duration so
    /// despawns requested by callbacks defer; the drain flag blocks
    /// re-entrant drains, and markers dirtied by callbacks are picked up by
    /// the same pass.
    fn drain_reactions(&self) {
        if !self.reactions.has_dirty() || !self.reactions.begin_drain() {
            return;
        }
        self.lock();
        while let Some(marker) = self.reactions.pop_dirty() {
            if let Some(callback) = self.reactions.callback(marker) {
                callback(self);
            }
            self.remove_all_by_id(marker);
        }
        // Manual unlock: must not recurse into the drain we are finishing.
        self.locks.set(self.locks.get() - 1);
        if self.locks.get() == 0 {
            self.flush_despawns();
        }
        self.reactions.end_drain();
    }

    // ---- reactive plumbing --------------------------------------------------

    /// Attach the add-side marker and dirty it, if `component` is guarded.
    fn note_added(&self, entity: Entity, component: component::Id) {
        let Some(marker) = self.reactions.add_marker(component) else {
            return;
        };
        if !self.has_component(entity.id(), marker) {
            self.attach_marker(entity, marker);
        }
        self.reactions.mark_dirty(marker);
    }

    /// Attach the remove-side marker and dirty it, if `component` is
    /// guarded.
    fn note_removed(&self, entity: Entity, component: component::Id) {
        let Some(marker) = self.reactions.remove_marker(component) else {
            return;
        };
        if !self.has_component(entity.id(), marker) {
            self.attach_marker(entity, marker);
        }
        self.reactions.mark_dirty(marker);
    }

    /// Attach a reactive marker tag without re-entering the reactive path.
    fn attach_marker(&self, entity: Entity, marker: component::Id) {
        self.tag_pool(marker).insert(entity.id());
        self.archetypes.borrow_mut().transition(entity, marker, true);
    }

    // ---- multi-value overflow -----------------------------------------------

    /// Record an additional value of a component the entity already holds.
    fn push_extra<C: Component>(&self, entity: Entity, value: C) {
        let extra = self.registry.register::<Extra<C>>();
        if self.has_component(entity.id(), extra) {
            let pool = self.data_pool::<Extra<C>>(extra);
            pool.borrow_mut()
                .get_mut(entity.id())
                .expect("overflow list must exist while its bit is set")
                .overflow
                .push_back(value);
        } else {
            let mut overflow = VecDeque::new();
            overflow.push_back(value);
            self.data_pool::<Extra<C>>(extra)
                .insert(entity.id(), Extra { overflow });
            self.archetypes.borrow_mut().transition(entity, extra, true);
            self.assert_coherent(entity, extra);
        }
    }

    /// Promote the front of the entity's overflow list into the primary
    /// slot. Returns false when the entity has no overflow list; the caller
    /// then removes the component outright.
    fn promote_extra<C: Component>(&self, entity: Entity, component: component::Id) -> bool {
        let Some(extra) = self.registry.get::<Extra<C>>() else {
            return false;
        };
        if !self.has_component(entity.id(), extra) {
            return false;
        }
        let pool = self.data_pool::<Extra<C>>(extra);
        let (front, emptied) = {
            let mut lists = pool.borrow_mut();
            let list = lists
                .get_mut(entity.id())
                .expect("overflow list must exist while its bit is set");
            let front = list
                .overflow
                .pop_front()
                .expect("overflow lists are deleted before they empty");
            (front, list.overflow.is_empty())
        };
        drop(self.data_pool::<C>(component).replace(entity.id(), front));
        if emptied {
            drop(pool.take(entity.id()));
            self.archetypes.borrow_mut().transition(entity, extra, false);
            self.assert_coherent(entity, extra);
        }
        true
    }

    // ---- pools --------------------------------------------------------------

    /// Whether a pool exists and holds the entity id.
    fn has_component(&self, entity_id: u32, component: component::Id) -> bool {
        match self.try_pool_by_id(component) {
            Some(pool) => pool.contains(entity_id),
            None => false,
        }
    }

    /// The pool for a component id, created lazily through the factory
    /// recorded at registration.
    fn pool_by_id(&self, component: component::Id) -> &dyn Pool {
        if let Some(pool) = self.try_pool_by_id(component) {
            return pool;
        }
        self.create_pool(component)
    }

    /// The pool for a component id, if it was ever created.
    fn try_pool_by_id(&self, component: component::Id) -> Option<&dyn Pool> {
        let pools = self.pools.borrow();
        let pool: &dyn Pool = pools.get(component.index())?.as_deref()?;
        // Safety: pool entries are created once and never removed, replaced,
        // or dropped while the world is alive, and growing the outer vector
        // moves only the Box pointers, not the pools they own. Extending the
        // borrow from the short RefCell guard to `&self` is therefore sound;
        // aliasing within a pool is enforced by its interior RefCell.
        Some(unsafe { &*std::ptr::from_ref(pool) })
    }

    /// Create the pool for a component id.
    fn create_pool(&self, component: component::Id) -> &dyn Pool {
        let info = self.registry.info(component).unwrap_or_else(|| {
            panic!("component id {component:?} was never registered")
        });
        {
            let mut pools = self.pools.borrow_mut();
            if component.index() >= pools.len() {
                pools.resize_with(component.index() + 1, || None);
            }
            debug_assert!(pools[component.index()].is_none());
            pools[component.index()] = Some(info.new_pool());
        }
        self.try_pool_by_id(component)
            .expect("pool was just created")
    }

    /// The typed value pool for a data component.
    fn data_pool<C: Component>(&self, component: component::Id) -> &DataPool<C> {
        self.pool_by_id(component)
            .as_any()
            .downcast_ref::<DataPool<C>>()
            .unwrap_or_else(|| {
                panic!(
                    "pool for `{}` does not store values",
                    std::any::type_name::<C>()
                )
            })
    }

    /// The presence pool for a tag.
    fn tag_pool(&self, component: component::Id) -> &TagPool {
        self.pool_by_id(component)
            .as_any()
            .downcast_ref::<TagPool>()
            .expect("pool is not a tag pool")
    }

    // ---- invariants -----------------------------------------------------------

    /// Debug cross-check: the pool-level and archetype-level answers to "has
    /// this component" must agree after every structural mutation.
    fn assert_coherent(&self, entity: Entity, component: component::Id) {
        #[cfg(debug_assertions)]
        {
            let in_pool = self.has_component(entity.id(), component);
            let in_mask = self
                .archetypes
                .borrow()
                .mask_of(entity.id())
                .check(component.bit());
            assert_eq!(
                in_pool, in_mask,
                "pool/archetype disagreement for {entity:?}, component {component:?}"
            );
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = (entity, component);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// World is intentionally !Send and !Sync:
// - !Send: the _not_send marker keeps the world on the thread that made it.
// - !Sync: Cell/RefCell state is !Sync on its own.
// Only the component registry is shared across threads (by Arc), so sibling
// worlds agree on component ids.

/// Builder for a filter's (include, exclude) mask pair.
///
/// Registration is idempotent: equal mask pairs always yield the same
/// filter.
pub struct FilterBuilder<'w> {
    world: &'w World,
    include: Mask,
    exclude: Mask,
}

impl FilterBuilder<'_> {
    /// Require the component to be present.
    pub fn with<C: Component>(mut self) -> Self {
        let component = self.world.registry.register::<C>();
        self.include.set(component.bit());
        self
    }

    /// Require the component to be absent.
    pub fn without<C: Component>(mut self) -> Self {
        let component = self.world.registry.register::<C>();
        self.exclude.set(component.bit());
        self
    }

    /// Register the filter (or fetch the existing one for this mask pair).
    pub fn register(self) -> filter::Id {
        self.world
            .archetypes
            .borrow_mut()
            .register_filter(self.include, self.exclude)
    }
}
