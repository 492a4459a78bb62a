//! # Sparse-Set ECS
//!
//! Entities are generational ids. Each component type lives in its own
//! store: a paged sparse index from entity to dense slot, next to an object
//! pool that recycles component instances instead of freeing them.
//! Structural changes are buffered in [`Commands`] and applied when the
//! buffer executes.
//!
//! ## Module Overview
//!
//! - [`entity`] — Generational entity IDs
//! - [`sparse`] — Paged entity → slot index
//! - [`pool`] — Slot arena with a free-slot cache
//! - [`component`] — Per-type stores behind an object-safe trait
//! - [`storage`] — Entities, stores, and the index between them
//! - [`hierarchy`] — Parent/child components and edits
//! - [`resource`] — Singleton values
//! - [`commands`] — Deferred structural changes
//! - [`system`] — System trait and schedule runner
//! - [`world`] — Lifecycle, registration, and scheduling

pub mod commands;
pub mod component;
pub mod entity;
pub mod hierarchy;
pub mod pool;
pub mod resource;
pub mod sparse;
pub mod storage;
pub mod system;
pub mod world;

pub use commands::Commands;
pub use component::{AnyStore, ComponentRegistry, ComponentStore, ComponentTypeId, StoreStats};
pub use entity::Entity;
pub use hierarchy::{Children, HierarchyEditor, Parent};
pub use pool::{ObjectPool, PoolError, PoolHandle};
pub use resource::Resources;
pub use sparse::SparseIndex;
pub use storage::{Bundle, Storage};
pub use system::{Schedule, System};
pub use world::{Lifecycle, World};
