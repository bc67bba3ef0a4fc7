//! Central manager for archetypes and filters.
//!
//! [`Archetypes`] maintains every index the core needs to stay consistent:
//! entity id → archetype, signature mask → archetype, component id →
//! archetypes containing it (the reverse index behind bulk removal), and
//! (include, exclude) masks → filter. Entity transitions between archetypes
//! happen here, including the lazy creation of destination archetypes and
//! the routing of membership notifications to subscribed filters.
//!
//! The manager assumes its caller (the world) only ever hands it valid,
//! previously created entity ids; lookups outside the known range are
//! programming errors, fatal in debug builds.

use std::collections::HashMap;

use crate::ecs::{
    archetype::{Archetype, Id},
    component,
    entity::Entity,
    filter::{self, Filter},
    mask::Mask,
};

/// Marker for an entity id with no archetype (dead or never placed).
const UNPLACED: u32 = u32::MAX;

/// Owner of all archetypes and filters, and of the indices tying them to
/// entities and component ids.
pub struct Archetypes {
    /// The archetypes stored by their unique identifier.
    archetypes: Vec<Archetype>,

    /// The archetypes indexed by their exact signature.
    by_mask: HashMap<Mask, Id>,

    /// Reverse index: component id → archetypes whose signature has the bit.
    by_component: Vec<Vec<Id>>,

    /// Entity id → current archetype (`UNPLACED` when none).
    entity_index: Vec<u32>,

    /// The filters stored by their unique identifier.
    filters: Vec<Filter>,

    /// The filters indexed by their (include, exclude) mask pair.
    by_filter: HashMap<(Mask, Mask), filter::Id>,
}

impl Archetypes {
    /// The empty-signature archetype; always exists.
    pub const EMPTY: Id = Id::new(0);

    /// Create a manager holding only the empty archetype.
    pub fn new() -> Self {
        let empty = Mask::new();
        let mut by_mask = HashMap::new();
        by_mask.insert(empty.clone(), Self::EMPTY);
        Self {
            archetypes: vec![Archetype::new(Self::EMPTY, empty)],
            by_mask,
            by_component: Vec::new(),
            entity_index: Vec::new(),
            filters: Vec::new(),
            by_filter: HashMap::new(),
        }
    }

    /// Place a freshly created entity in the empty-signature archetype.
    pub fn place_in_empty(&mut self, entity: Entity) {
        let index = entity.index();
        if index >= self.entity_index.len() {
            self.entity_index.resize(index + 1, UNPLACED);
        }
        debug_assert_eq!(
            self.entity_index[index], UNPLACED,
            "entity {entity:?} is already placed in an archetype"
        );
        self.archetypes[Self::EMPTY.index()].insert(entity);
        self.entity_index[index] = 0;
        self.notify_added(Self::EMPTY, entity);
    }

    /// The archetype currently holding the entity id.
    #[inline]
    pub fn archetype_of(&self, entity_id: u32) -> &Archetype {
        &self.archetypes[self.archetype_id_of(entity_id).index()]
    }

    /// The signature of the entity id's current archetype.
    #[inline]
    pub fn mask_of(&self, entity_id: u32) -> &Mask {
        self.archetype_of(entity_id).mask()
    }

    /// An archetype by id.
    #[inline]
    pub fn get(&self, id: Id) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    /// Iterate all archetypes in id order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Number of archetypes (the empty one included).
    #[inline]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Whether no archetypes beyond the built-in empty one exist.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archetypes.len() == 1
    }

    /// Move an entity to the archetype reflecting one component added or
    /// removed, creating the destination lazily.
    ///
    /// Atomic from the caller's point of view: the removal and insertion
    /// notifications are delivered back-to-back with no user code in
    /// between, so no observer sees the entity absent from all archetypes.
    pub fn transition(&mut self, entity: Entity, component: component::Id, added: bool) {
        let src = self.archetype_id_of(entity.id());
        self.archetypes[src.index()].remove(entity);
        self.notify_removed(src, entity);

        let mut mask = self.archetypes[src.index()].mask().clone();
        if added {
            mask.set(component.bit());
        } else {
            mask.unset(component.bit());
        }

        let dst = self.intern(mask);
        self.archetypes[dst.index()].insert(entity);
        self.entity_index[entity.index()] = dst.index() as u32;
        self.notify_added(dst, entity);
    }

    /// Remove an entity from its archetype entirely (despawn support).
    pub fn remove_entity(&mut self, entity: Entity) {
        let src = self.archetype_id_of(entity.id());
        self.archetypes[src.index()].remove(entity);
        self.notify_removed(src, entity);
        self.entity_index[entity.index()] = UNPLACED;
    }

    /// Migrate every entity out of every archetype containing the component,
    /// into the corresponding post-removal archetype.
    ///
    /// Archetypes are processed in id order and members in dense order.
    /// Each stale archetype's member list is reset afterwards (length only,
    /// the backing storage stays for reuse), and every migrated entity is
    /// individually announced to subscribed filters before that reset.
    pub fn remove_everywhere(&mut self, component: component::Id) {
        let Some(list) = self.by_component.get(component.index()) else {
            return;
        };
        // Snapshot: destinations created during the sweep lack the bit and
        // can never enter this list, but the Vec itself may reallocate.
        let affected = list.clone();
        log::trace!(
            "bulk-removing component {component:?} from {} archetype(s)",
            affected.len()
        );

        for src in affected {
            if self.archetypes[src.index()].is_empty() {
                continue;
            }
            let mut mask = self.archetypes[src.index()].mask().clone();
            mask.unset(component.bit());
            let dst = self.intern(mask);

            for dense in 0..self.archetypes[src.index()].len() {
                let entity = self.archetypes[src.index()].member_at(dense);
                self.notify_removed(src, entity);
                self.archetypes[dst.index()].insert(entity);
                self.entity_index[entity.index()] = dst.index() as u32;
                self.notify_added(dst, entity);
            }
            self.archetypes[src.index()].reset_members();
        }
    }

    /// Get or register the filter for an (include, exclude) mask pair.
    ///
    /// Idempotent: an equal mask pair always yields the existing filter. A
    /// new filter subscribes to every matching archetype and is back-filled
    /// with their current members.
    pub fn register_filter(&mut self, include: Mask, exclude: Mask) -> filter::Id {
        let key = (include, exclude);
        if let Some(id) = self.by_filter.get(&key) {
            return *id;
        }
        let (include, exclude) = (key.0.clone(), key.1.clone());

        let id = filter::Id::new(self.filters.len() as u32);
        let mut filter = Filter::new(id, include, exclude);
        for archetype in &mut self.archetypes {
            if filter.matches(archetype.mask()) {
                archetype.subscribe(id);
                for dense in 0..archetype.len() {
                    filter.on_added(archetype.member_at(dense));
                }
            }
        }
        log::debug!(
            "registered filter {id:?}: include {:?} exclude {:?}, {} entities back-filled",
            filter.include(),
            filter.exclude(),
            filter.len()
        );
        self.by_filter.insert(key, id);
        self.filters.push(filter);
        id
    }

    /// A filter by id.
    #[inline]
    pub fn filter(&self, id: filter::Id) -> &Filter {
        &self.filters[id.index()]
    }

    /// A filter by id, mutably.
    #[inline]
    pub(crate) fn filter_mut(&mut self, id: filter::Id) -> &mut Filter {
        &mut self.filters[id.index()]
    }

    /// The archetype id the entity currently belongs to.
    fn archetype_id_of(&self, entity_id: u32) -> Id {
        debug_assert!(
            (entity_id as usize) < self.entity_index.len()
                && self.entity_index[entity_id as usize] != UNPLACED,
            "entity id {entity_id} is not placed in any archetype"
        );
        Id::new(self.entity_index[entity_id as usize])
    }

    /// Get or lazily create the archetype for an exact signature. Creation
    /// indexes the archetype by every contained component id and subscribes
    /// every live filter whose masks its signature passes.
    fn intern(&mut self, mask: Mask) -> Id {
        if let Some(id) = self.by_mask.get(&mask) {
            return *id;
        }

        let id = Id::new(self.archetypes.len() as u32);
        for bit in mask.ones() {
            let index = bit as usize;
            if index >= self.by_component.len() {
                self.by_component.resize(index + 1, Vec::new());
            }
            self.by_component[index].push(id);
        }

        let mut archetype = Archetype::new(id, mask.clone());
        for filter in &self.filters {
            if filter.matches(&mask) {
                archetype.subscribe(filter.id());
            }
        }
        log::debug!("created archetype {id:?} for signature {mask:?}");
        self.by_mask.insert(mask, id);
        self.archetypes.push(archetype);
        id
    }

    /// Announce an entity's arrival to the archetype's subscribed filters.
    fn notify_added(&mut self, archetype: Id, entity: Entity) {
        let (archetypes, filters) = (&self.archetypes, &mut self.filters);
        for &id in archetypes[archetype.index()].subscribers() {
            filters[id.index()].on_added(entity);
        }
    }

    /// Announce an entity's departure to the archetype's subscribed filters.
    fn notify_removed(&mut self, archetype: Id, entity: Entity) {
        let (archetypes, filters) = (&self.archetypes, &mut self.filters);
        for &id in archetypes[archetype.index()].subscribers() {
            filters[id.index()].on_removed(entity);
        }
    }
}

impl Default for Archetypes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: component::Id = component::Id::new(0);
    const B: component::Id = component::Id::new(1);

    fn entity(id: u32) -> Entity {
        Entity::pack(id, 0)
    }

    fn place(archetypes: &mut Archetypes, id: u32) -> Entity {
        let e = entity(id);
        archetypes.place_in_empty(e);
        e
    }

    #[test]
    fn fresh_entities_land_in_the_empty_archetype() {
        // Given
        let mut archetypes = Archetypes::new();

        // When
        let e = place(&mut archetypes, 0);

        // Then
        assert_eq!(archetypes.len(), 1);
        assert!(archetypes.mask_of(e.id()).is_empty());
        assert!(archetypes.get(Archetypes::EMPTY).unwrap().contains(0));
    }

    #[test]
    fn transitions_create_archetypes_lazily_and_reuse_them() {
        // Given
        let mut archetypes = Archetypes::new();
        let e1 = place(&mut archetypes, 0);
        let e2 = place(&mut archetypes, 1);

        // When - two entities take the same path
        archetypes.transition(e1, A, true);
        archetypes.transition(e2, A, true);

        // Then - one archetype serves both
        assert_eq!(archetypes.len(), 2);
        assert!(archetypes.mask_of(0).check(A.bit()));
        assert!(archetypes.mask_of(1).check(A.bit()));
        assert_eq!(archetypes.archetype_of(0).len(), 2);

        // And When - one diverges
        archetypes.transition(e2, B, true);

        // Then
        assert_eq!(archetypes.len(), 3);
        assert!(archetypes.mask_of(1).check(B.bit()));
        assert!(!archetypes.mask_of(0).check(B.bit()));

        // And When - it comes back
        archetypes.transition(e2, B, false);

        // Then - the {A} archetype is reused, nothing new created
        assert_eq!(archetypes.len(), 3);
        assert_eq!(archetypes.archetype_of(0).id(), archetypes.archetype_of(1).id());
    }

    #[test]
    fn remove_entity_clears_the_index() {
        // Given
        let mut archetypes = Archetypes::new();
        let e = place(&mut archetypes, 3);
        archetypes.transition(e, A, true);

        // When
        archetypes.remove_entity(e);

        // Then
        assert!(!archetypes.archetype_of(0).contains(3));
    }

    #[test]
    fn remove_everywhere_migrates_and_resets() {
        // Given - {A}: e0, e1; {A,B}: e2; {B}: e3
        let mut archetypes = Archetypes::new();
        let e0 = place(&mut archetypes, 0);
        let e1 = place(&mut archetypes, 1);
        let e2 = place(&mut archetypes, 2);
        let e3 = place(&mut archetypes, 3);
        archetypes.transition(e0, A, true);
        archetypes.transition(e1, A, true);
        archetypes.transition(e2, A, true);
        archetypes.transition(e2, B, true);
        archetypes.transition(e3, B, true);

        // When
        archetypes.remove_everywhere(A);

        // Then - every signature lost the A bit, B holders kept B
        assert!(archetypes.mask_of(0).is_empty());
        assert!(archetypes.mask_of(1).is_empty());
        assert!(!archetypes.mask_of(2).check(A.bit()));
        assert!(archetypes.mask_of(2).check(B.bit()));
        assert!(archetypes.mask_of(3).check(B.bit()));

        // And - entities with B were untouched, stale archetypes are empty
        let a_only = archetypes.by_mask.get(&Mask::with_bits([A.bit()])).copied();
        assert!(archetypes.get(a_only.unwrap()).unwrap().is_empty());

        // And - a second sweep is a no-op
        archetypes.remove_everywhere(A);
        assert!(archetypes.mask_of(2).check(B.bit()));
    }

    #[test]
    fn remove_everywhere_for_unknown_component_is_noop() {
        // Given
        let mut archetypes = Archetypes::new();
        place(&mut archetypes, 0);

        // When/Then - no archetype ever contained component 9
        archetypes.remove_everywhere(component::Id::new(9));
        assert_eq!(archetypes.len(), 1);
    }

    #[test]
    fn filters_deduplicate_by_mask_pair() {
        // Given
        let mut archetypes = Archetypes::new();

        // When
        let f1 = archetypes.register_filter(Mask::with_bits([0]), Mask::new());
        let f2 = archetypes.register_filter(Mask::with_bits([0]), Mask::new());
        let f3 = archetypes.register_filter(Mask::with_bits([0]), Mask::with_bits([1]));

        // Then
        assert_eq!(f1, f2);
        assert_ne!(f1, f3);
    }

    #[test]
    fn new_filters_backfill_existing_archetypes() {
        // Given - entities already in a matching archetype
        let mut archetypes = Archetypes::new();
        let e0 = place(&mut archetypes, 0);
        let e1 = place(&mut archetypes, 1);
        archetypes.transition(e0, A, true);
        archetypes.transition(e1, A, true);
        archetypes.transition(e1, B, true);

        // When - register a filter afterwards
        let id = archetypes.register_filter(Mask::with_bits([A.bit()]), Mask::with_bits([B.bit()]));

        // Then - only the non-excluded entity is present
        let filter = archetypes.filter(id);
        assert_eq!(filter.len(), 1);
        assert!(filter.contains(0));
        assert!(!filter.contains(1));
    }

    #[test]
    fn filters_track_later_archetypes_and_transitions() {
        // Given
        let mut archetypes = Archetypes::new();
        let id = archetypes.register_filter(Mask::with_bits([A.bit()]), Mask::with_bits([B.bit()]));
        let e = place(&mut archetypes, 0);

        // When - the entity gains A (archetype created after the filter)
        archetypes.transition(e, A, true);

        // Then
        assert!(archetypes.filter(id).contains(0));

        // And When - it gains the excluded B
        archetypes.transition(e, B, true);

        // Then
        assert!(!archetypes.filter(id).contains(0));

        // And When - B goes away again
        archetypes.transition(e, B, false);

        // Then
        assert!(archetypes.filter(id).contains(0));
    }

    #[test]
    fn remove_everywhere_updates_filters() {
        // Given
        let mut archetypes = Archetypes::new();
        let id = archetypes.register_filter(Mask::with_bits([A.bit()]), Mask::new());
        let e0 = place(&mut archetypes, 0);
        let e1 = place(&mut archetypes, 1);
        archetypes.transition(e0, A, true);
        archetypes.transition(e1, A, true);
        assert_eq!(archetypes.filter(id).len(), 2);

        // When
        archetypes.remove_everywhere(A);

        // Then
        assert!(archetypes.filter(id).is_empty());
    }
}
