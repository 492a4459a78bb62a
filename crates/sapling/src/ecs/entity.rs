//! # Entity — Opaque Identifiers
//!
//! An [`Entity`] names a thing without holding any data. Component stores key
//! their sparse indices on it, and [`Commands`](super::commands::Commands) is
//! the only way to create or destroy one.
//!
//! ## Generations
//!
//! Destroyed indices are recycled, so the index alone is not enough to tell a
//! live entity from a stale handle:
//!
//! ```text
//! spawn      -> Entity { index: 4, generation: 0 }
//! destroy    -> slot 4 freed, generation bumped to 1
//! spawn      -> Entity { index: 4, generation: 1 }
//! ```
//!
//! The old handle still carries `generation: 0`, so every lookup with it fails
//! with [`EcsError::UnknownEntity`](crate::EcsError::UnknownEntity) instead of
//! silently reaching the new entity's components.

use std::fmt;

/// A handle to an entity in a [`World`](super::world::World).
///
/// Only valid for the world that created it, and only until it is destroyed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    /// Recycled slot index. This is what sparse indices page on.
    pub(crate) index: u32,
    /// Bumped every time the slot is recycled.
    pub(crate) generation: u32,
}

impl Entity {
    /// Returns the raw slot index.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation.
    pub fn generation(self) -> u32 {
        self.generation
    }

    #[cfg(test)]
    pub(crate) fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Hands out entity ids and recycles freed ones.
///
/// ```text
/// generations: [1, 0, 2]   one counter per slot ever handed out
/// free_list:   [0]         slots waiting to be reused
/// ```
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate an id, reusing a freed slot when one exists.
    pub fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free_list.pop() {
            let generation = self.generations[index as usize];
            return Entity { index, generation };
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        Entity {
            index,
            generation: 0,
        }
    }

    /// Free an id. Returns `false` if the handle was already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = &mut self.generations[entity.index as usize];
        *slot = slot.wrapping_add(1);
        self.free_list.push(entity.index);
        true
    }

    /// A freed slot's generation has already moved past every handle issued
    /// for it, so a generation match alone means alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.generations
            .get(entity.index as usize)
            .is_some_and(|&generation| generation == entity.generation)
    }

    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }

    /// Number of freed slots waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Number of slots ever handed out.
    pub fn total_slots(&self) -> usize {
        self.generations.len()
    }
}
