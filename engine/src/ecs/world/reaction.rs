//! Reactive add/remove notifications, batched per unlock.
//!
//! Subscribing to a component type `C` installs a callback keyed by a
//! synthetic marker type: [`Added<C>`] or [`Removed<C>`], both zero-payload
//! tags. When a guarded `C` is added to (or removed from) an entity, the
//! world attaches the marker to that entity and records the marker's
//! component id as dirty. Dirty marker ids are drained when the world lock
//! returns to zero: the callback runs once per marker type, then the marker
//! is stripped from every carrier in bulk.
//!
//! This turns "fire a callback for every add/remove of C" into a batched,
//! iteration-safe pass executed once per unlock instead of inline at
//! mutation time, so callbacks can never storm reentrantly.

use std::{cell::Cell, cell::RefCell, collections::HashMap, marker::PhantomData, rc::Rc};

use fixedbitset::FixedBitSet;

use crate::ecs::{component, component::Component, world::World};

/// Marker tag attached to entities that gained a `C` since the last drain.
///
/// Filter on it inside an [`on_added`](World::on_added) callback to find the
/// affected entities.
pub struct Added<C: Component>(PhantomData<C>);

impl<C: Component> Component for Added<C> {
    const IS_TAG: bool = true;
}

/// Marker tag attached to entities that lost a `C` since the last drain.
///
/// Filter on it inside an [`on_removed`](World::on_removed) callback to find
/// the affected entities.
pub struct Removed<C: Component>(PhantomData<C>);

impl<C: Component> Component for Removed<C> {
    const IS_TAG: bool = true;
}

/// Hidden list component holding the extra values when an entity is given
/// more than one `C`. Removal promotes the front into the primary slot and
/// deletes the list once it empties.
pub(crate) struct Extra<C: Component> {
    pub(crate) overflow: std::collections::VecDeque<C>,
}

impl<C: Component> Component for Extra<C> {}

/// The reactive subscription state owned by the world.
#[derive(Default)]
pub(crate) struct Reactions {
    /// Marker id → the callback to run when that marker is dirty.
    callbacks: RefCell<HashMap<component::Id, Rc<dyn Fn(&World)>>>,

    /// Guarded component id → marker id, add side.
    add_guards: RefCell<HashMap<component::Id, component::Id>>,

    /// Guarded component id → marker id, remove side.
    remove_guards: RefCell<HashMap<component::Id, component::Id>>,

    /// Marker ids with un-drained attachments.
    dirty: RefCell<FixedBitSet>,

    /// Set while a drain is in progress; blocks re-entrant drains.
    draining: Cell<bool>,
}

impl Reactions {
    /// Install an add-side subscription: `guarded` gains → `marker` dirty.
    pub(crate) fn guard_add(
        &self,
        guarded: component::Id,
        marker: component::Id,
        callback: Rc<dyn Fn(&World)>,
    ) {
        self.add_guards.borrow_mut().insert(guarded, marker);
        self.callbacks.borrow_mut().insert(marker, callback);
    }

    /// Install a remove-side subscription: `guarded` lost → `marker` dirty.
    pub(crate) fn guard_remove(
        &self,
        guarded: component::Id,
        marker: component::Id,
        callback: Rc<dyn Fn(&World)>,
    ) {
        self.remove_guards.borrow_mut().insert(guarded, marker);
        self.callbacks.borrow_mut().insert(marker, callback);
    }

    /// The add-side marker for a guarded component, if subscribed.
    #[inline]
    pub(crate) fn add_marker(&self, guarded: component::Id) -> Option<component::Id> {
        self.add_guards.borrow().get(&guarded).copied()
    }

    /// The remove-side marker for a guarded component, if subscribed.
    #[inline]
    pub(crate) fn remove_marker(&self, guarded: component::Id) -> Option<component::Id> {
        self.remove_guards.borrow().get(&guarded).copied()
    }

    /// Record a marker as having un-drained attachments.
    pub(crate) fn mark_dirty(&self, marker: component::Id) {
        let mut dirty = self.dirty.borrow_mut();
        if marker.index() >= dirty.len() {
            dirty.grow(marker.index() + 1);
        }
        dirty.insert(marker.index());
    }

    /// Take one dirty marker id, if any.
    pub(crate) fn pop_dirty(&self) -> Option<component::Id> {
        let mut dirty = self.dirty.borrow_mut();
        let index = dirty.ones().next()?;
        dirty.set(index, false);
        Some(component::Id::new(index as u32))
    }

    /// Whether any marker is dirty.
    #[inline]
    pub(crate) fn has_dirty(&self) -> bool {
        self.dirty.borrow().count_ones(..) > 0
    }

    /// The callback registered for a marker.
    #[inline]
    pub(crate) fn callback(&self, marker: component::Id) -> Option<Rc<dyn Fn(&World)>> {
        self.callbacks.borrow().get(&marker).cloned()
    }

    /// Enter the drain; returns false when one is already in progress.
    pub(crate) fn begin_drain(&self) -> bool {
        !self.draining.replace(true)
    }

    /// Leave the drain.
    pub(crate) fn end_drain(&self) {
        self.draining.set(false);
    }
}
