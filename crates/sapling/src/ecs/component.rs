//! # Component — Typed Stores Behind a Type-Erased Map
//!
//! Components are plain data keyed by their Rust type. Each component type
//! gets one [`ComponentStore<T>`], which pairs a [`SparseIndex`] (entity →
//! dense slot) with an [`ObjectPool<T>`] (where the values actually live):
//!
//! ```text
//! ComponentStore<Position>
//!   index.dense: [ e7,  e2,  e9  ]      slot order
//!   handles:     [ h0,  h2,  h1  ]      parallel to index.dense
//!   pool.slots:  [ P(a), P(c), P(b), P(stale) ]
//! ```
//!
//! The [`Storage`](super::storage::Storage) holds stores for many types in one
//! map, so it talks to them through the object-safe [`AnyStore`] trait and
//! downcasts with `as_any` when it needs the concrete `ComponentStore<T>`.
//!
//! ## Type ids
//!
//! Rust's `TypeId` is stable but opaque and sparse. The
//! [`ComponentRegistry`] maps it to a dense [`ComponentTypeId`] assigned in
//! registration order. Ids are never reused or reassigned for the lifetime of
//! the registry.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::entity::Entity;
use super::pool::{ObjectPool, PoolError, PoolHandle};
use super::sparse::SparseIndex;
use crate::error::EcsError;

/// Dense runtime id of a component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(u32);

impl ComponentTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

/// Maps Rust types to [`ComponentTypeId`]s.
#[derive(Default)]
pub struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentTypeId>,
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`. Registering a type twice is an error.
    pub fn register<T: 'static>(&mut self) -> Result<ComponentTypeId, EcsError> {
        if self.ids.contains_key(&TypeId::of::<T>()) {
            return Err(EcsError::AlreadyRegistered {
                component: std::any::type_name::<T>(),
            });
        }
        Ok(self.get_or_register::<T>())
    }

    /// Id of `T`, registering it first if needed.
    pub fn get_or_register<T: 'static>(&mut self) -> ComponentTypeId {
        let next = ComponentTypeId(self.names.len() as u32);
        let id = *self.ids.entry(TypeId::of::<T>()).or_insert(next);
        if id == next {
            self.names.push(std::any::type_name::<T>());
            log::trace!("registered component `{}` as {:?}", std::any::type_name::<T>(), id);
        }
        id
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.ids.contains_key(&type_id)
    }

    pub fn id_of<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Full type name a component id was registered with.
    pub fn name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.names.get(id.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Occupancy of one component store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Entities currently holding this component.
    pub live: usize,
    /// Freed instances retained by the pool.
    pub cached: usize,
    /// Slots the pool has ever allocated.
    pub allocations: usize,
}

/// Object-safe view of a [`ComponentStore<T>`].
pub trait AnyStore {
    /// Return `entity`'s instance to the pool. `Ok(false)` if it had none.
    fn release(&mut self, entity: Entity) -> Result<bool, PoolError>;
    fn contains(&self, entity: Entity) -> bool;
    fn stats(&self) -> StoreStats;
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Storage for every instance of one component type.
pub struct ComponentStore<T> {
    index: SparseIndex,
    /// Parallel to `index.dense()`.
    handles: Vec<PoolHandle>,
    pool: ObjectPool<T>,
}

impl<T: 'static> ComponentStore<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: SparseIndex::new(),
            handles: Vec::with_capacity(capacity),
            pool: ObjectPool::with_capacity(capacity),
        }
    }

    /// Attach `value` to `entity`.
    ///
    /// Fails without touching anything if the entity already has one.
    pub fn insert(&mut self, entity: Entity, value: T) -> Result<PoolHandle, EcsError> {
        let Some(slot) = self.index.add(entity) else {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: std::any::type_name::<T>(),
            });
        };
        let handle = self.pool.create(value);
        debug_assert_eq!(slot, self.handles.len());
        self.handles.push(handle);
        Ok(handle)
    }

    /// Detach `entity`'s instance and hand its slot back to the pool.
    pub fn remove(&mut self, entity: Entity) -> Result<bool, PoolError> {
        let Some(slot) = self.index.remove(entity) else {
            return Ok(false);
        };
        let handle = self.handles.swap_remove(slot);
        self.pool.destroy(handle)?;
        Ok(true)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains(entity)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        let slot = self.index.get(entity)?;
        self.pool.get(self.handles[slot])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let slot = self.index.get(entity)?;
        self.pool.get_mut(self.handles[slot])
    }

    /// Pool handle backing `entity`'s instance.
    pub fn handle(&self, entity: Entity) -> Option<PoolHandle> {
        self.index.get(entity).map(|slot| self.handles[slot])
    }

    /// Entities holding this component, in dense order.
    pub fn entities(&self) -> &[Entity] {
        self.index.dense()
    }

    /// Iterate `(entity, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.index
            .dense()
            .iter()
            .zip(&self.handles)
            .filter_map(|(&entity, &handle)| Some((entity, self.pool.get(handle)?)))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn sparse_index(&self) -> &SparseIndex {
        &self.index
    }

    pub fn pool(&self) -> &ObjectPool<T> {
        &self.pool
    }
}

impl<T: 'static> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> AnyStore for ComponentStore<T> {
    fn release(&mut self, entity: Entity) -> Result<bool, PoolError> {
        self.remove(entity)
    }

    fn contains(&self, entity: Entity) -> bool {
        self.index.contains(entity)
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            live: self.pool.active_count(),
            cached: self.pool.cached_count(),
            allocations: self.pool.allocations(),
        }
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
