//! # Sparse Index — Entity → Dense Slot
//!
//! Every component store needs to answer "does this entity have one, and
//! where is it?" in O(1). A plain `Vec` indexed by entity id answers that, but
//! it has to be as long as the largest id ever seen. Instead the sparse side is
//! split into fixed pages that are only allocated once an entity in their
//! range shows up:
//!
//! ```text
//! entity.index = 70, PAGE_SIZE = 32
//!
//! pages: [ Some(page 0), None, Some(page 2) ]
//!                                   │
//!                     offset 70 % 32 = 6 ──► dense slot 1
//!
//! dense: [ Entity(3v0), Entity(70v0), Entity(12v1) ]
//! ```
//!
//! ## Swap-remove
//!
//! Removal moves the last dense entry into the hole so the dense array stays
//! packed. That changes the slot of the moved entity, so any slot read before a
//! removal must be looked up again afterwards. Callers that keep arrays in
//! parallel with `dense` must perform the same `swap_remove` at the slot
//! returned by [`SparseIndex::remove`].

use super::entity::Entity;

/// Number of entries per sparse page.
pub const PAGE_SIZE: usize = 32;

const EMPTY: u32 = u32::MAX;

type Page = Box<[u32; PAGE_SIZE]>;

/// Paged map from [`Entity`] to a dense slot index.
///
/// Not thread-safe; a single owner mutates it.
#[derive(Default)]
pub struct SparseIndex {
    pages: Vec<Option<Page>>,
    dense: Vec<Entity>,
}

impl SparseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entity` at the end of the dense array and return its slot.
    ///
    /// Returns `None` (and changes nothing) if the entity is already present.
    pub fn add(&mut self, entity: Entity) -> Option<usize> {
        if self.contains(entity) {
            return None;
        }
        let (page, offset) = split(entity);
        if page >= self.pages.len() {
            self.pages.resize_with(page + 1, || None);
        }
        let slot = self.dense.len();
        let entries = self.pages[page].get_or_insert_with(|| Box::new([EMPTY; PAGE_SIZE]));
        entries[offset] = slot as u32;
        self.dense.push(entity);
        Some(slot)
    }

    /// Remove `entity`, returning the slot it occupied.
    ///
    /// The last dense entry is moved into that slot.
    pub fn remove(&mut self, entity: Entity) -> Option<usize> {
        let slot = self.get(entity)?;
        self.set_entry(entity, EMPTY);
        self.dense.swap_remove(slot);
        if let Some(&moved) = self.dense.get(slot) {
            self.set_entry(moved, slot as u32);
        }
        Some(slot)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    /// Current dense slot of `entity`.
    pub fn get(&self, entity: Entity) -> Option<usize> {
        let (page, offset) = split(entity);
        let slot = self.pages.get(page)?.as_ref()?[offset];
        if slot == EMPTY {
            return None;
        }
        let slot = slot as usize;
        // Same index, older or newer generation: not this entity.
        (self.dense.get(slot) == Some(&entity)).then_some(slot)
    }

    /// Entities in slot order.
    pub fn dense(&self) -> &[Entity] {
        &self.dense
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Number of sparse pages that have been allocated.
    pub fn page_count(&self) -> usize {
        self.pages.iter().filter(|page| page.is_some()).count()
    }

    /// Forget every entity. Allocated pages are kept for reuse.
    pub fn clear(&mut self) {
        for entity in std::mem::take(&mut self.dense) {
            self.set_entry(entity, EMPTY);
        }
    }

    fn set_entry(&mut self, entity: Entity, value: u32) {
        let (page, offset) = split(entity);
        if let Some(Some(entries)) = self.pages.get_mut(page) {
            entries[offset] = value;
        }
    }
}

fn split(entity: Entity) -> (usize, usize) {
    let index = entity.index as usize;
    (index / PAGE_SIZE, index % PAGE_SIZE)
}
