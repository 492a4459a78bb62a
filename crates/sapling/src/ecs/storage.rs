//! # Storage — Entities, Stores, and the Index Between Them
//!
//! [`Storage`] is the part of the [`World`](super::world::World) that
//! [`Commands`](super::commands::Commands) mutate. It owns:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Storage                                                       │
//! │                                                               │
//! │  allocator: EntityAllocator       live/free entity ids        │
//! │  registry:  ComponentRegistry     TypeId → ComponentTypeId    │
//! │  stores:    ComponentTypeId → Box<dyn AnyStore>               │
//! │  entities:  Entity → { ComponentTypeId → PoolHandle }         │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `entities` map mirrors every store's sparse index: it has an entry for
//! `(entity, type)` exactly when that type's store holds the entity. Destroying
//! an entity walks its entry to find every store it has to be released from,
//! instead of asking every store.
//!
//! Read access is public so query code outside this crate can iterate stores
//! directly. Structural mutation is `pub(crate)` and only reachable through
//! `Commands`.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use super::component::{AnyStore, ComponentRegistry, ComponentStore, ComponentTypeId, StoreStats};
use super::entity::{Entity, EntityAllocator};
use super::hierarchy::{Children, Parent, ensure_not_hierarchy};
use super::pool::PoolHandle;
use crate::error::EcsError;

/// Entity allocation, component stores, and the entity → components index.
pub struct Storage {
    allocator: EntityAllocator,
    registry: ComponentRegistry,
    stores: HashMap<ComponentTypeId, Box<dyn AnyStore>>,
    entities: HashMap<Entity, HashMap<ComponentTypeId, PoolHandle>>,
    require_registration: bool,
    pool_capacity: usize,
}

impl Storage {
    pub(crate) fn new(require_registration: bool, pool_capacity: usize) -> Self {
        let mut registry = ComponentRegistry::new();
        registry.get_or_register::<Parent>();
        registry.get_or_register::<Children>();
        Self {
            allocator: EntityAllocator::new(),
            registry,
            stores: HashMap::new(),
            entities: HashMap::new(),
            require_registration,
            pool_capacity,
        }
    }

    // ── Registration ─────────────────────────────────────────────────

    pub(crate) fn register<T: 'static>(&mut self) -> Result<ComponentTypeId, EcsError> {
        self.registry.register::<T>()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    fn type_id_for<T: 'static>(&mut self) -> Result<ComponentTypeId, EcsError> {
        match self.registry.id_of::<T>() {
            Some(id) => Ok(id),
            None if self.require_registration => Err(EcsError::UnregisteredComponent {
                component: std::any::type_name::<T>(),
            }),
            None => Ok(self.registry.get_or_register::<T>()),
        }
    }

    fn is_known(&self, type_id: TypeId) -> bool {
        !self.require_registration || self.registry.contains_type(type_id)
    }

    // ── Entities ─────────────────────────────────────────────────────

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Every live entity, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys().copied()
    }

    pub(crate) fn ensure_alive(&self, entity: Entity) -> Result<(), EcsError> {
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::UnknownEntity(entity))
        }
    }

    pub(crate) fn spawn_empty(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.entities.insert(entity, HashMap::new());
        log::trace!("spawned {entity}");
        entity
    }

    /// Validate the whole bundle, then allocate and fill the entity.
    ///
    /// Bundles may not carry hierarchy components.
    pub(crate) fn spawn<B: Bundle>(&mut self, bundle: B) -> Result<Entity, EcsError> {
        let mut seen = HashSet::new();
        for (type_id, name) in B::components() {
            ensure_not_hierarchy(type_id, name)?;
            if !seen.insert(type_id) {
                return Err(EcsError::DuplicateBundleComponent { component: name });
            }
            if !self.is_known(type_id) {
                return Err(EcsError::UnregisteredComponent { component: name });
            }
        }
        let entity = self.spawn_empty();
        bundle.insert_into(self, entity)?;
        Ok(entity)
    }

    /// Release every component of `entity` and free its id.
    ///
    /// Hierarchy links must already have been cleaned up by the caller.
    pub(crate) fn despawn(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        if let Some(components) = self.entities.remove(&entity) {
            for type_id in components.into_keys() {
                self.release_from(type_id, entity)?;
            }
        }
        self.allocator.deallocate(entity);
        log::trace!("destroyed {entity}");
        Ok(())
    }

    /// Destroy every entity, then drop every store.
    ///
    /// Instances go back to their pools first, so each pool's teardown sees
    /// both its active and cached values exactly once.
    pub(crate) fn clear(&mut self) -> Result<(), EcsError> {
        let alive: Vec<Entity> = self.entities.keys().copied().collect();
        for entity in alive {
            self.despawn(entity)?;
        }
        self.stores.clear();
        Ok(())
    }

    // ── Components ───────────────────────────────────────────────────

    /// Typed store for `T`, if one exists yet.
    pub fn store<T: 'static>(&self) -> Option<&ComponentStore<T>> {
        let id = self.registry.id_of::<T>()?;
        self.stores.get(&id)?.as_any().downcast_ref::<ComponentStore<T>>()
    }

    fn store_mut<T: 'static>(&mut self) -> Option<&mut ComponentStore<T>> {
        let id = self.registry.id_of::<T>()?;
        self.stores.get_mut(&id)?.as_any_mut().downcast_mut::<ComponentStore<T>>()
    }

    fn store_or_create<T: 'static>(
        &mut self,
        id: ComponentTypeId,
    ) -> Result<&mut ComponentStore<T>, EcsError> {
        let capacity = self.pool_capacity;
        self.stores
            .entry(id)
            .or_insert_with(|| Box::new(ComponentStore::<T>::with_capacity(capacity)) as Box<dyn AnyStore>)
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .ok_or(EcsError::StoreMismatch {
                component: std::any::type_name::<T>(),
            })
    }

    /// Attach a component. A second instance of the same type is rejected.
    pub(crate) fn insert<T: 'static>(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        let id = self.type_id_for::<T>()?;
        let handle = self.store_or_create::<T>(id)?.insert(entity, value)?;
        self.entities.entry(entity).or_default().insert(id, handle);
        log::trace!("{entity} += {}", std::any::type_name::<T>());
        Ok(())
    }

    /// Detach a component. Returns `false` if the entity did not have one.
    pub(crate) fn remove<T: 'static>(&mut self, entity: Entity) -> Result<bool, EcsError> {
        self.ensure_alive(entity)?;
        let Some(id) = self.registry.id_of::<T>() else {
            return Ok(false);
        };
        let removed = self.release_from(id, entity)?;
        if let Some(components) = self.entities.get_mut(&entity) {
            components.remove(&id);
        }
        if removed {
            log::trace!("{entity} -= {}", std::any::type_name::<T>());
        }
        Ok(removed)
    }

    fn release_from(&mut self, id: ComponentTypeId, entity: Entity) -> Result<bool, EcsError> {
        let Some(store) = self.stores.get_mut(&id) else {
            return Ok(false);
        };
        let component = store.type_name();
        store
            .release(entity)
            .map_err(|source| EcsError::PoolCorrupted { component, source })
    }

    pub fn get<T: 'static>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.ensure_alive(entity)?;
        self.store::<T>()
            .and_then(|store| store.get(entity))
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            })
    }

    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.ensure_alive(entity)?;
        self.store_mut::<T>()
            .and_then(|store| store.get_mut(entity))
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<T>(),
            })
    }

    pub fn contains<T: 'static>(&self, entity: Entity) -> bool {
        self.store::<T>().is_some_and(|store| store.contains(entity))
    }

    /// Entities that currently hold a `T`.
    pub fn entities_with<T: 'static>(&self) -> &[Entity] {
        self.store::<T>().map(|store| store.entities()).unwrap_or(&[])
    }

    /// Component type ids attached to `entity`.
    pub fn component_types(&self, entity: Entity) -> Result<Vec<ComponentTypeId>, EcsError> {
        self.ensure_alive(entity)?;
        let mut ids: Vec<_> = self
            .entities
            .get(&entity)
            .map(|components| components.keys().copied().collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }

    /// Per-type occupancy, keyed by type name.
    pub fn store_stats(&self) -> Vec<(&'static str, StoreStats)> {
        let mut stats: Vec<_> = self
            .stores
            .values()
            .map(|store| (store.type_name(), store.stats()))
            .collect();
        stats.sort_by_key(|(name, _)| *name);
        stats
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn allocator(&self) -> &EntityAllocator {
        &self.allocator
    }
}

// ── Bundles (tuple support) ──────────────────────────────────────────────

/// A set of components spawned together.
///
/// Implemented for tuples of up to 8 components.
pub trait Bundle: 'static {
    /// `(TypeId, type name)` for each component, in tuple order.
    fn components() -> Vec<(TypeId, &'static str)>;

    /// Insert every component onto `entity`.
    fn insert_into(self, storage: &mut Storage, entity: Entity) -> Result<(), EcsError>;
}

macro_rules! impl_bundle {
    ($($T:ident),+) => {
        impl<$($T: 'static),+> Bundle for ($($T,)+) {
            fn components() -> Vec<(TypeId, &'static str)> {
                vec![$((TypeId::of::<$T>(), std::any::type_name::<$T>())),+]
            }

            #[allow(non_snake_case)]
            fn insert_into(self, storage: &mut Storage, entity: Entity) -> Result<(), EcsError> {
                let ($($T,)+) = self;
                $(storage.insert::<$T>(entity, $T)?;)+
                Ok(())
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
