//! Standing queries over archetype membership.
//!
//! A [`Filter`] is identified by an (include, exclude) mask pair and keeps a
//! packed entity list current by receiving "entity added" / "entity removed"
//! notifications from every archetype whose signature passes both masks.
//! Filters with equal mask pairs are deduplicated by the archetype manager.
//!
//! # Reentrancy
//!
//! The filter carries a lock counter. While it is non-zero (some view is
//! mid-iteration), incoming notifications are *not* applied to the live list;
//! they are recorded into pending-add / pending-remove id masks instead. An
//! id landing in both directions cancels out: added then removed (or the
//! reverse) inside one locked region is a no-op. Unlocking to zero flushes
//! the pending state into the live list. This lets a consumer iterate while
//! a callback adds or removes entities (including the one being visited)
//! without corrupting the traversal.

mod view;

pub use view::View;

use crate::ecs::{entity::Entity, mask::Mask, storage::sparse::SparseSet};

/// A filter identifier, stable for the lifetime of the world.
///
/// This is the opaque subscriber handle archetypes keep in their observer
/// lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct a filter Id from a raw u32 value.
    #[inline]
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The index of this filter in id-indexed storage.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A standing query: include mask, exclude mask, and the live entity list.
pub struct Filter {
    id: Id,

    /// Every bit here must be present in a matching signature.
    include: Mask,

    /// No bit here may be present in a matching signature.
    exclude: Mask,

    /// The live membership list: packed entities with an id sparse index.
    entities: SparseSet<Entity>,

    /// Nesting lock counter; non-zero while views iterate this filter.
    locks: u32,

    /// Ids added while locked, pending application at unlock.
    pending_added: Mask,

    /// Ids removed while locked, pending application at unlock.
    pending_removed: Mask,

    /// Handles for the ids in `pending_added` (the mask alone cannot carry
    /// the version half). Entries whose bit was cancelled are skipped at
    /// flush time.
    staged: Vec<Entity>,
}

impl Filter {
    pub(crate) fn new(id: Id, include: Mask, exclude: Mask) -> Self {
        Self {
            id,
            include,
            exclude,
            entities: SparseSet::new(),
            locks: 0,
            pending_added: Mask::new(),
            pending_removed: Mask::new(),
            staged: Vec::new(),
        }
    }

    /// This filter's identifier.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The include mask.
    #[inline]
    pub fn include(&self) -> &Mask {
        &self.include
    }

    /// The exclude mask.
    #[inline]
    pub fn exclude(&self) -> &Mask {
        &self.exclude
    }

    /// Whether a signature passes both masks.
    #[inline]
    pub fn matches(&self, signature: &Mask) -> bool {
        signature.inclusive_pass(&self.include) && signature.exclusive_pass(&self.exclude)
    }

    /// Number of entities in the live list (pending changes excluded).
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the live list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether the entity id is in the live list.
    #[inline]
    pub fn contains(&self, entity_id: u32) -> bool {
        self.entities.contains(entity_id)
    }

    /// The entity at a dense position. Positions are unstable across
    /// removals (swap compaction); views pin them by holding the lock.
    #[inline]
    pub(crate) fn entity_at(&self, dense: usize) -> Entity {
        self.entities.values()[dense]
    }

    /// Whether the id was removed during the current locked region.
    #[inline]
    pub(crate) fn is_pending_removal(&self, entity_id: u32) -> bool {
        self.pending_removed.check(entity_id)
    }

    /// Notification: an entity entered a subscribed archetype.
    pub(crate) fn on_added(&mut self, entity: Entity) {
        if self.locks == 0 {
            self.entities.insert(entity.id(), entity);
            return;
        }
        // Removed then re-added inside one locked region cancels out.
        if self.pending_removed.check(entity.id()) {
            self.pending_removed.unset(entity.id());
        } else if !self.pending_added.check(entity.id()) {
            self.pending_added.set(entity.id());
            self.staged.push(entity);
        }
    }

    /// Notification: an entity left a subscribed archetype.
    pub(crate) fn on_removed(&mut self, entity: Entity) {
        if self.locks == 0 {
            self.entities.remove(entity.id());
            return;
        }
        // Added then removed inside one locked region cancels out.
        if self.pending_added.check(entity.id()) {
            self.pending_added.unset(entity.id());
        } else {
            self.pending_removed.set(entity.id());
        }
    }

    /// Enter a locked region (view acquired).
    #[inline]
    pub(crate) fn lock(&mut self) {
        self.locks += 1;
    }

    /// Leave a locked region (view released); flushes pending state when the
    /// counter returns to zero.
    pub(crate) fn unlock(&mut self) {
        debug_assert!(self.locks > 0, "unbalanced filter unlock");
        self.locks -= 1;
        if self.locks == 0 {
            self.flush();
        }
    }

    /// Apply the deferred membership changes to the live list.
    fn flush(&mut self) {
        for entity in self.staged.drain(..) {
            // A cleared bit means the staged add was cancelled (or a later
            // duplicate already applied it).
            if self.pending_added.check(entity.id()) {
                self.pending_added.unset(entity.id());
                self.entities.insert(entity.id(), entity);
            }
        }
        debug_assert!(self.pending_added.is_empty(), "staged adds out of sync");

        for id in self.pending_removed.ones() {
            self.entities.remove(id);
        }
        self.pending_removed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> Filter {
        Filter::new(Id::new(0), Mask::with_bits([0]), Mask::with_bits([1]))
    }

    fn entity(id: u32) -> Entity {
        Entity::pack(id, 0)
    }

    #[test]
    fn matches_include_and_exclude() {
        // Given
        let filter = filter();

        // Then
        assert!(filter.matches(&Mask::with_bits([0])));
        assert!(filter.matches(&Mask::with_bits([0, 2])));
        assert!(!filter.matches(&Mask::with_bits([2])));
        assert!(!filter.matches(&Mask::with_bits([0, 1])));
        assert!(!filter.matches(&Mask::new()));
    }

    #[test]
    fn unlocked_notifications_apply_live() {
        // Given
        let mut filter = filter();

        // When
        filter.on_added(entity(3));
        filter.on_added(entity(5));
        filter.on_removed(entity(3));

        // Then
        assert_eq!(filter.len(), 1);
        assert!(filter.contains(5));
        assert!(!filter.contains(3));
    }

    #[test]
    fn locked_notifications_defer_until_unlock() {
        // Given
        let mut filter = filter();
        filter.on_added(entity(1));

        // When - locked, membership changes arrive
        filter.lock();
        filter.on_added(entity(2));
        filter.on_removed(entity(1));

        // Then - the live list is untouched while locked
        assert_eq!(filter.len(), 1);
        assert!(filter.contains(1));
        assert!(!filter.contains(2));
        assert!(filter.is_pending_removal(1));

        // And When
        filter.unlock();

        // Then - pending state flushed
        assert_eq!(filter.len(), 1);
        assert!(filter.contains(2));
        assert!(!filter.contains(1));
    }

    #[test]
    fn add_then_remove_while_locked_cancels() {
        // Given
        let mut filter = filter();

        // When
        filter.lock();
        filter.on_added(entity(7));
        filter.on_removed(entity(7));
        filter.unlock();

        // Then - a no-op overall
        assert!(filter.is_empty());
        assert!(!filter.contains(7));
    }

    #[test]
    fn remove_then_readd_while_locked_cancels() {
        // Given
        let mut filter = filter();
        filter.on_added(entity(4));

        // When
        filter.lock();
        filter.on_removed(entity(4));
        filter.on_added(entity(4));
        filter.unlock();

        // Then - the entity never left
        assert_eq!(filter.len(), 1);
        assert!(filter.contains(4));
    }

    #[test]
    fn cancelled_add_can_be_staged_again() {
        // Given
        let mut filter = filter();

        // When - add, cancel, add again within one locked region
        filter.lock();
        filter.on_added(entity(9));
        filter.on_removed(entity(9));
        filter.on_added(entity(9));
        filter.unlock();

        // Then - exactly one copy lands in the list
        assert_eq!(filter.len(), 1);
        assert!(filter.contains(9));
    }

    #[test]
    fn nested_locks_flush_once_at_zero() {
        // Given
        let mut filter = filter();

        // When - two nested locked regions
        filter.lock();
        filter.lock();
        filter.on_added(entity(1));
        filter.unlock();

        // Then - still deferred at depth one
        assert!(filter.is_empty());

        // And When
        filter.unlock();

        // Then
        assert_eq!(filter.len(), 1);
        assert!(filter.contains(1));
    }
}
