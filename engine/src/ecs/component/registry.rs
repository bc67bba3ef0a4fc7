use std::{
    any::TypeId as StdTypeId,
    sync::RwLock,
    sync::atomic::{AtomicU32, Ordering},
};

use dashmap::DashMap;

use crate::ecs::component::{Component, Id, Info};

/// A thread-safe component registry, responsible for assigning every
/// component/tag type a stable small integer id on first use.
///
/// The registry uses lock-free reads for TypeId → component-id lookups via
/// `DashMap`; registration takes a single shard plus a write lock on the info
/// vector. Registration is idempotent.
///
/// Why thread-safe when the world is single-threaded?
/// - Worlds may be created on different threads, and all worlds sharing a
///   registry must agree on component ids. Nothing else in the core is
///   shared across threads.
///
/// Ids are sequential and never reused; the assignment order is an artifact
/// of first use and carries no meaning across process runs.
pub struct Registry {
    /// Map from TypeId to component Id. Lock-free reads via sharded map.
    type_map: DashMap<StdTypeId, Id>,

    /// Registered component entries, indexed by id. RwLock for rare writes.
    infos: RwLock<Vec<Option<Info>>>,

    /// Next available component identifier.
    next_id: AtomicU32,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_map: DashMap::new(),
            infos: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a component type and get its unique identifier.
    ///
    /// Idempotent: if the type is already registered, the existing id is
    /// returned. Classification (data vs tag) and the pool factory are
    /// recorded on first registration.
    pub fn register<C: Component>(&self) -> Id {
        let type_id = StdTypeId::of::<C>();

        // Fast path: already registered (lock-free read).
        if let Some(id) = self.type_map.get(&type_id) {
            return *id;
        }

        // Slow path: the entry API resolves the race where two threads both
        // miss the fast path.
        *self
            .type_map
            .entry(type_id)
            .or_insert_with(|| {
                let id = Id::new(self.next_id.fetch_add(1, Ordering::Relaxed));

                let mut infos = self.infos.write().unwrap();
                let index = id.index();
                if index >= infos.len() {
                    infos.resize(index + 1, None);
                }
                infos[index] = Some(Info::new::<C>(id));

                id
            })
            .value()
    }

    /// Get the id for a component type, if registered.
    #[inline]
    pub fn get<C: Component>(&self) -> Option<Id> {
        self.type_map
            .get(&StdTypeId::of::<C>())
            .map(|entry| *entry.value())
    }

    /// Get the metadata recorded for a component id.
    #[inline]
    pub fn info(&self, id: Id) -> Option<Info> {
        let infos = self.infos.read().unwrap();
        infos.get(id.index()).and_then(|info| *info)
    }

    /// Get the metadata for a component type, if registered.
    #[inline]
    pub fn info_of<C: Component>(&self) -> Option<Info> {
        self.info(self.get::<C>()?)
    }

    /// Number of registered component types.
    #[inline]
    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::Relaxed) as usize
    }

    /// Whether no types have been registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::ecs::component::Kind;

    struct Position {
        #[allow(dead_code)]
        x: f32,
        #[allow(dead_code)]
        y: f32,
    }
    impl Component for Position {}

    struct Velocity {
        #[allow(dead_code)]
        dx: f32,
        #[allow(dead_code)]
        dy: f32,
    }
    impl Component for Velocity {}

    struct Frozen;
    impl Component for Frozen {
        const IS_TAG: bool = true;
    }

    #[test]
    fn registration_assigns_sequential_ids() {
        // Given
        let registry = Registry::new();

        // When
        let pos_id = registry.register::<Position>();
        let vel_id = registry.register::<Velocity>();

        // Then
        assert_ne!(pos_id, vel_id);
        assert_eq!(registry.len(), 2);

        // Then - registering the same type again returns the same id
        assert_eq!(registry.register::<Position>(), pos_id);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn get_without_registration() {
        // Given
        let registry = Registry::new();
        registry.register::<Position>();

        // Then
        assert!(registry.get::<Position>().is_some());
        assert!(registry.get::<Velocity>().is_none());
    }

    #[test]
    fn info_classifies_tags() {
        // Given
        let registry = Registry::new();
        let pos_id = registry.register::<Position>();
        let tag_id = registry.register::<Frozen>();

        // Then
        assert_eq!(registry.info(pos_id).unwrap().kind(), Kind::Data);
        assert_eq!(registry.info(tag_id).unwrap().kind(), Kind::Tag);
        assert_eq!(registry.info_of::<Frozen>().unwrap().id(), tag_id);
    }

    #[test]
    fn info_factory_builds_matching_pool() {
        // Given
        let registry = Registry::new();
        let pos_id = registry.register::<Position>();
        let tag_id = registry.register::<Frozen>();

        // When - pools built from nothing but the recorded info
        let data_pool = registry.info(pos_id).unwrap().new_pool();
        let tag_pool = registry.info(tag_id).unwrap().new_pool();

        // Then
        assert_eq!(data_pool.component_id(), pos_id);
        assert_eq!(data_pool.kind(), Kind::Data);
        assert_eq!(tag_pool.component_id(), tag_id);
        assert_eq!(tag_pool.kind(), Kind::Tag);
    }

    #[test]
    fn info_for_unknown_id_is_none() {
        // Given
        let registry = Registry::new();

        // Then
        assert!(registry.info(Id::new(17)).is_none());
    }

    #[test]
    fn concurrent_registration_agrees() {
        // Given
        let registry = Arc::new(Registry::new());

        // When - many threads register the same small set of types
        let handles: Vec<_> = (0..12)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    if i % 3 == 0 {
                        registry.register::<Position>()
                    } else if i % 3 == 1 {
                        registry.register::<Velocity>()
                    } else {
                        registry.register::<Frozen>()
                    }
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Then - every thread that registered a type got the same id
        let pos_ids: Vec<_> = results.iter().step_by(3).collect();
        let vel_ids: Vec<_> = results.iter().skip(1).step_by(3).collect();
        let tag_ids: Vec<_> = results.iter().skip(2).step_by(3).collect();
        assert!(pos_ids.iter().all(|id| *id == pos_ids[0]));
        assert!(vel_ids.iter().all(|id| *id == vel_ids[0]));
        assert!(tag_ids.iter().all(|id| *id == tag_ids[0]));

        // And the three types got three distinct ids
        assert_ne!(pos_ids[0], vel_ids[0]);
        assert_ne!(pos_ids[0], tag_ids[0]);
        assert_eq!(registry.len(), 3);
    }
}
