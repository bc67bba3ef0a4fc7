//! Archetypes: groups of entities sharing an identical component signature.
//!
//! An archetype owns the packed list of entities whose signature is exactly
//! its mask, with an entity-id sparse index for O(1) removal by swap. It also
//! carries an explicit observer list: the ids of every filter whose masks its
//! signature passes. The [`registry`] module owns all archetypes and routes
//! membership notifications to those observers.
//!
//! Archetypes are created lazily as entities transition, never merge, and are
//! never deleted; the empty-signature archetype always exists.

pub mod registry;

pub use registry::Archetypes;

use crate::ecs::{entity::Entity, filter, mask::Mask, storage::sparse::SparseSet};

/// A unique identifier for an archetype within one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(u32);

impl Id {
    /// Construct an archetype Id from a raw u32 value.
    #[inline]
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The index of this archetype in id-indexed storage.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One archetype: a signature mask plus the entities that have exactly it.
pub struct Archetype {
    /// The archetype's unique identifier.
    id: Id,

    /// The exact component signature shared by every member.
    mask: Mask,

    /// Packed member list with an entity-id sparse index.
    members: SparseSet<Entity>,

    /// Filters observing this archetype's membership.
    subscribers: Vec<filter::Id>,
}

impl Archetype {
    /// Create an empty archetype for the given signature.
    pub(crate) fn new(id: Id, mask: Mask) -> Self {
        Self {
            id,
            mask,
            members: SparseSet::new(),
            subscribers: Vec::new(),
        }
    }

    /// This archetype's identifier.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The component signature of this archetype.
    #[inline]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Number of member entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the archetype currently has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the entity id is a member.
    #[inline]
    pub fn contains(&self, entity_id: u32) -> bool {
        self.members.contains(entity_id)
    }

    /// The packed member list. Positions are unstable across removals.
    #[inline]
    pub fn members(&self) -> &[Entity] {
        self.members.values()
    }

    /// The member at a dense position.
    #[inline]
    pub(crate) fn member_at(&self, dense: usize) -> Entity {
        self.members.values()[dense]
    }

    /// Insert a member.
    #[inline]
    pub(crate) fn insert(&mut self, entity: Entity) {
        self.members.insert(entity.id(), entity);
    }

    /// Remove a member by swap, invalidating the dense position of the
    /// swapped tail entity.
    #[inline]
    pub(crate) fn remove(&mut self, entity: Entity) -> Entity {
        self.members.remove(entity.id())
    }

    /// Reset the member list after a bulk migration; only the length is
    /// cleared, the backing storage is kept for reuse.
    #[inline]
    pub(crate) fn reset_members(&mut self) {
        self.members.clear();
    }

    /// Subscribe a filter to membership notifications.
    #[inline]
    pub(crate) fn subscribe(&mut self, filter: filter::Id) {
        debug_assert!(
            !self.subscribers.contains(&filter),
            "filter {filter:?} already subscribed to archetype {:?}",
            self.id
        );
        self.subscribers.push(filter);
    }

    /// The filters observing this archetype.
    #[inline]
    pub(crate) fn subscribers(&self) -> &[filter::Id] {
        &self.subscribers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u32) -> Entity {
        Entity::pack(id, 0)
    }

    #[test]
    fn membership_round_trip() {
        // Given
        let mut archetype = Archetype::new(Id::new(1), Mask::with_bits([0, 3]));

        // When
        archetype.insert(entity(10));
        archetype.insert(entity(11));

        // Then
        assert_eq!(archetype.len(), 2);
        assert!(archetype.contains(10));
        assert!(archetype.contains(11));
        assert!(!archetype.contains(12));

        // And When - removal swaps the tail into the vacated slot
        archetype.remove(entity(10));

        // Then
        assert_eq!(archetype.len(), 1);
        assert!(!archetype.contains(10));
        assert_eq!(archetype.members(), &[entity(11)]);
    }

    #[test]
    fn reset_keeps_storage_and_empties_list() {
        // Given
        let mut archetype = Archetype::new(Id::new(0), Mask::new());
        archetype.insert(entity(0));
        archetype.insert(entity(1));

        // When
        archetype.reset_members();

        // Then
        assert!(archetype.is_empty());
        assert!(!archetype.contains(0));

        // And - reusable immediately
        archetype.insert(entity(1));
        assert_eq!(archetype.len(), 1);
    }

    #[test]
    fn subscribers_are_recorded_once() {
        // Given
        let mut archetype = Archetype::new(Id::new(0), Mask::new());

        // When
        archetype.subscribe(filter::Id::new(0));
        archetype.subscribe(filter::Id::new(2));

        // Then
        assert_eq!(
            archetype.subscribers(),
            &[filter::Id::new(0), filter::Id::new(2)]
        );
    }
}
