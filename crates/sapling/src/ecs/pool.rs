//! # Object Pool — Recycling Component Slots
//!
//! Component churn (spawn, destroy, spawn again) should not turn into a
//! steady stream of allocations. [`ObjectPool`] keeps values in an arena of
//! typed slots and hands out [`PoolHandle`]s, which are slot indices rather
//! than addresses, so they survive the arena growing.
//!
//! ```text
//! slots:  [ A , B , C , D ]
//! active: [ 0, 3 ]          handles currently owned by an entity
//! cache:  [ 2, 1 ]          freed slots, next create() pops from here
//! ```
//!
//! A freed slot keeps its old value until it is handed out again (the stale
//! value is dropped when overwritten) or the pool itself is dropped. The arena
//! only grows when the cache is empty, so its length is the historical peak of
//! live values.

use std::fmt;

/// Index of a slot in an [`ObjectPool`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle(u32);

impl PoolHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_raw(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolHandle({})", self.0)
    }
}

/// Pool bookkeeping failures. These mean a double free or a handle from the
/// wrong pool, and are never recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("handle {0:?} is not active in this pool")]
    NotActive(PoolHandle),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// Position of the handle inside `active`.
    Active(u32),
    Cached,
}

/// Typed slot arena with a free-slot cache.
pub struct ObjectPool<T> {
    slots: Vec<T>,
    states: Vec<SlotState>,
    active: Vec<PoolHandle>,
    cache: Vec<PoolHandle>,
}

impl<T> ObjectPool<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Reserve room for `capacity` slots up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            states: Vec::with_capacity(capacity),
            active: Vec::with_capacity(capacity),
            cache: Vec::new(),
        }
    }

    /// Store `value`, reusing a cached slot when there is one.
    pub fn create(&mut self, value: T) -> PoolHandle {
        let handle = match self.cache.pop() {
            Some(handle) => {
                self.slots[handle.index()] = value;
                handle
            }
            None => {
                let handle = PoolHandle(self.slots.len() as u32);
                self.slots.push(value);
                self.states.push(SlotState::Cached);
                handle
            }
        };
        self.states[handle.index()] = SlotState::Active(self.active.len() as u32);
        self.active.push(handle);
        handle
    }

    /// Move an active handle to the cache.
    pub fn destroy(&mut self, handle: PoolHandle) -> Result<(), PoolError> {
        let Some(SlotState::Active(position)) = self.states.get(handle.index()).copied() else {
            return Err(PoolError::NotActive(handle));
        };
        let position = position as usize;
        self.active.swap_remove(position);
        if let Some(&moved) = self.active.get(position) {
            self.states[moved.index()] = SlotState::Active(position as u32);
        }
        self.states[handle.index()] = SlotState::Cached;
        self.cache.push(handle);
        Ok(())
    }

    pub fn is_active(&self, handle: PoolHandle) -> bool {
        matches!(self.states.get(handle.index()), Some(SlotState::Active(_)))
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        if self.is_active(handle) {
            self.slots.get(handle.index())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        if self.is_active(handle) {
            self.slots.get_mut(handle.index())
        } else {
            None
        }
    }

    /// Handles currently in use.
    pub fn active(&self) -> &[PoolHandle] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// How many slots the arena has ever allocated.
    pub fn allocations(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
