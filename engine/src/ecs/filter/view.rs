//! Iteration handles over a filter's entity list.
//!
//! A [`View`] is a lightweight iterator over the entities of one filter.
//! Acquiring a view (via [`World::view`](crate::ecs::world::World::view))
//! increments the filter's and the world's lock counters; dropping it
//! decrements both, flushing the filter's deferred membership changes and,
//! when the world lock returns to zero, running deferred despawns and
//! reactive drains.
//!
//! The view snapshots the dense length at acquisition, so entities that
//! enter the filter during the iteration (deferred while locked) are never
//! visited in the same pass, and entities removed mid-iteration are skipped.
//! Views are plain stack values: nested or repeated iteration of the same
//! filter allocates nothing. There is no ordering guarantee across removals;
//! swap compaction reorders the tail.

use crate::ecs::{entity::Entity, filter, world::World};

/// An in-flight traversal of one filter's entity list.
pub struct View<'w> {
    world: &'w World,
    filter: filter::Id,

    /// Next dense position to visit.
    cursor: usize,

    /// Dense length captured at acquisition; entries past it belong to a
    /// later pass.
    len: usize,
}

impl<'w> View<'w> {
    /// Build a view over a filter whose locks were already taken.
    pub(crate) fn new(world: &'w World, filter: filter::Id, len: usize) -> Self {
        Self {
            world,
            filter,
            cursor: 0,
            len,
        }
    }

    /// The filter this view traverses.
    #[inline]
    pub fn filter(&self) -> filter::Id {
        self.filter
    }

    /// Number of entities in the captured snapshot (including any that are
    /// later skipped as pending removals).
    #[inline]
    pub fn captured_len(&self) -> usize {
        self.len
    }
}

impl Iterator for View<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        // The manager is borrowed per step, not across user code: the caller
        // is free to mutate the world between calls.
        let archetypes = self.world.archetypes();
        let filter = archetypes.filter(self.filter);
        while self.cursor < self.len {
            let entity = filter.entity_at(self.cursor);
            self.cursor += 1;
            // Removed mid-iteration (deferred while we hold the lock): skip.
            if filter.is_pending_removal(entity.id()) {
                continue;
            }
            return Some(entity);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.len - self.cursor))
    }
}

impl Drop for View<'_> {
    fn drop(&mut self) {
        self.world.release_view(self.filter);
    }
}
