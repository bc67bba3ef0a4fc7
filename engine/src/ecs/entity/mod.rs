//! Entity identity and recycling.
//!
//! An [`Entity`] is a single `u32` packed as `(version, id)` in two 16-bit
//! halves. The id addresses a slot in the [`Entities`] manager; the version
//! counts how many times that slot has been recycled, so a handle obtained
//! before a despawn is distinguishable from the live entity later occupying
//! the same id.
//!
//! # Recycling
//!
//! The free-list is embedded in the slot array itself: a dead slot stores the
//! next free id in its id half, and the manager keeps head and tail cursors.
//! Freed ids are appended at the tail and reused from the head (FIFO), giving
//! O(1) allocation and free with no side allocation.

use std::fmt;

/// Bits of an entity value reserved for the id half.
const ID_BITS: u32 = 16;

/// The reserved id denoting "no entity"; also the free-list end marker.
/// Never a valid id.
pub(crate) const ID_MASK: u32 = (1 << ID_BITS) - 1;

/// An entity handle: `(version, id)` packed into a `u32`.
///
/// Entities carry no data of their own; data is attached via components.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u32);

impl Entity {
    /// The null entity: the reserved id with version 0.
    pub const NULL: Entity = Entity(ID_MASK);

    /// Pack an id and version into a handle.
    #[inline]
    pub(crate) const fn pack(id: u32, version: u32) -> Self {
        Self((version << ID_BITS) | (id & ID_MASK))
    }

    /// The slot id of this entity.
    #[inline]
    pub fn id(&self) -> u32 {
        self.0 & ID_MASK
    }

    /// The recycle generation of this entity's slot.
    #[inline]
    pub fn version(&self) -> u32 {
        self.0 >> ID_BITS
    }

    /// Whether this is the null entity.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.id() == ID_MASK
    }

    /// The id as an index into id-indexed storage (e.g. Vec).
    #[inline]
    pub fn index(&self) -> usize {
        self.id() as usize
    }
}

impl Default for Entity {
    #[inline]
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.id(), self.version())
        }
    }
}

/// Owner of entity identity: slot array, versions, and the embedded
/// free-list.
#[derive(Debug, Default)]
pub struct Entities {
    /// Slot `i` holds the live entity with id `i`, or a dead slot whose id
    /// half stores the next free id (`ID_MASK` = end of list) and whose
    /// version half is the version the slot will be revived with.
    slots: Vec<Entity>,

    /// First free slot id, `ID_MASK` when the list is empty.
    free_head: u32,

    /// Last free slot id, `ID_MASK` when the list is empty.
    free_tail: u32,

    /// Number of live entities.
    alive: u32,
}

impl Entities {
    /// Create an empty manager.
    #[inline]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: ID_MASK,
            free_tail: ID_MASK,
            alive: 0,
        }
    }

    /// Allocate an entity, reusing the oldest freed id when one exists.
    pub fn create(&mut self) -> Entity {
        self.alive += 1;

        if self.free_head != ID_MASK {
            // Pop the free-list head; the dead slot carries the next pointer
            // and the already-bumped version.
            let id = self.free_head;
            let slot = self.slots[id as usize];
            self.free_head = slot.id();
            if self.free_head == ID_MASK {
                self.free_tail = ID_MASK;
            }
            let entity = Entity::pack(id, slot.version());
            self.slots[id as usize] = entity;
            return entity;
        }

        let id = self.slots.len() as u32;
        assert!(id < ID_MASK, "entity id space exhausted");
        let entity = Entity::pack(id, 0);
        self.slots.push(entity);
        entity
    }

    /// Free an entity: bump the slot version and append the id to the
    /// free-list tail.
    ///
    /// Freeing a stale or null handle is a programming error; debug builds
    /// panic.
    pub fn free(&mut self, entity: Entity) {
        debug_assert!(
            self.is_alive(entity),
            "freeing a stale or null entity handle: {entity:?}"
        );
        let id = entity.id();

        // The dead slot becomes the new tail: end marker for next, version
        // pre-bumped for the eventual revival. 16-bit versions wrap.
        let next_version = (entity.version() + 1) & ID_MASK;
        self.slots[id as usize] = Entity::pack(ID_MASK, next_version);

        if self.free_tail == ID_MASK {
            self.free_head = id;
        } else {
            let tail = self.slots[self.free_tail as usize];
            self.slots[self.free_tail as usize] = Entity::pack(id, tail.version());
        }
        self.free_tail = id;
        self.alive -= 1;
    }

    /// Whether the handle refers to the live entity in its slot.
    ///
    /// A handle from before a despawn fails this check forever: the slot's
    /// version moved on when the id was recycled.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        !entity.is_null()
            && self
                .slots
                .get(entity.index())
                .is_some_and(|slot| *slot == entity)
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> u32 {
        self.alive
    }

    /// Whether no entities are alive.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.alive == 0
    }
}

#[test]
fn pack_round_trip() {
    // Given
    let entity = Entity::pack(513, 7);

    // Then
    assert_eq!(entity.id(), 513);
    assert_eq!(entity.version(), 7);
    assert_eq!(entity.index(), 513);
    assert!(!entity.is_null());
    assert!(Entity::NULL.is_null());
}

#[test]
fn create_assigns_sequential_ids() {
    // Given
    let mut entities = Entities::new();

    // When
    let handles: Vec<_> = (0..4).map(|_| entities.create()).collect();

    // Then
    for (i, e) in handles.iter().enumerate() {
        assert_eq!(e.id(), i as u32);
        assert_eq!(e.version(), 0);
        assert!(entities.is_alive(*e));
    }
    assert_eq!(entities.len(), 4);
}

#[test]
fn recycling_is_fifo_with_version_bump() {
    // Given - four entities, ids 0..4
    let mut entities = Entities::new();
    let handles: Vec<_> = (0..4).map(|_| entities.create()).collect();

    // When - delete id 1, then id 2
    entities.free(handles[1]);
    entities.free(handles[2]);

    // And - create two more
    let r1 = entities.create();
    let r2 = entities.create();

    // Then - ids reused in {1, 2} order, version bumped exactly once
    assert_eq!(r1.id(), 1);
    assert_eq!(r1.version(), 1);
    assert_eq!(r2.id(), 2);
    assert_eq!(r2.version(), 1);

    // And - the next creation gets a fresh id with version 0
    let fresh = entities.create();
    assert_eq!(fresh.id(), 4);
    assert_eq!(fresh.version(), 0);
}

#[test]
fn stale_handles_are_never_alive_again() {
    // Given
    let mut entities = Entities::new();
    let original = entities.create();

    // When - free and recycle the id
    entities.free(original);
    assert!(!entities.is_alive(original));
    let recycled = entities.create();

    // Then - same id, but the old handle stays dead
    assert_eq!(recycled.id(), original.id());
    assert!(entities.is_alive(recycled));
    assert!(!entities.is_alive(original));
}

#[test]
fn repeated_recycling_increments_version_each_time() {
    // Given
    let mut entities = Entities::new();
    let mut current = entities.create();
    let id = current.id();

    // When/Then - every free/create cycle bumps the version once
    for round in 1..=5u32 {
        entities.free(current);
        current = entities.create();
        assert_eq!(current.id(), id);
        assert_eq!(current.version(), round);
    }
}

#[test]
fn free_list_survives_interleaved_churn() {
    // Given
    let mut entities = Entities::new();
    let mut live: Vec<Entity> = (0..8).map(|_| entities.create()).collect();

    // When - free every other entity, then churn
    for e in live.drain(..).skip(1).step_by(2).collect::<Vec<_>>() {
        entities.free(e);
    }
    let mut seen = std::collections::HashSet::new();
    for _ in 0..10 {
        let e = entities.create();
        assert!(seen.insert(e), "duplicate live handle {e:?}");
        assert!(entities.is_alive(e));
    }

    // Then - alive count adds up: 4 survivors + 10 created
    assert_eq!(entities.len(), 14);
}

#[test]
fn null_entity_is_never_alive() {
    // Given
    let entities = Entities::new();

    // Then
    assert!(!entities.is_alive(Entity::NULL));
    assert!(!entities.is_alive(Entity::default()));
}
