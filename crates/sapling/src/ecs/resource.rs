//! # Resources — Singleton Values
//!
//! Resources are global data that does not belong to any entity: a frame
//! clock, a score counter, an asset cache. There is at most one value per
//! type. They are stored type-erased as `Box<dyn Any>` and downcast on
//! access.
//!
//! A resource is dropped when it is replaced, removed, or cleared at
//! shutdown. Replacing drops the old value before the new one is stored.

use std::any::{Any, TypeId};
use std::collections::HashMap;

struct Entry {
    name: &'static str,
    value: Box<dyn Any>,
}

/// Type-keyed singleton registry.
#[derive(Default)]
pub struct Resources {
    entries: HashMap<TypeId, Entry>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `value`, dropping any previous value of the same type first.
    pub fn insert<T: 'static>(&mut self, value: T) {
        let id = TypeId::of::<T>();
        if self.entries.remove(&id).is_some() {
            log::debug!("replaced resource `{}`", std::any::type_name::<T>());
        }
        self.entries.insert(
            id,
            Entry {
                name: std::any::type_name::<T>(),
                value: Box::new(value),
            },
        );
    }

    /// Returns `None` if no `T` has been set.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value.downcast_ref::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.entries
            .get_mut(&TypeId::of::<T>())
            .and_then(|entry| entry.value.downcast_mut::<T>())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Take a resource out, returning ownership to the caller.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.entries
            .remove(&TypeId::of::<T>())
            .and_then(|entry| entry.value.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Drop every resource.
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.drain() {
            log::trace!("dropping resource `{}`", entry.name);
        }
    }

    /// Type names of every installed resource, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|entry| entry.name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
