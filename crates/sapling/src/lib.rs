//! # Sapling — Minimal Entity Component System
//!
//! A small single-threaded ECS runtime: sparse-indexed component stores
//! backed by recycling object pools, a deferred command buffer for
//! structural changes, singleton resources, and a startup/update scheduler
//! with plugins.
//!
//! Start with `use sapling::prelude::*`:
//!
//! ```ignore
//! let mut world = World::new();
//! world.add_startup_system(|commands, _| {
//!     let root = commands.spawn_empty();
//!     let leaf = commands.spawn_immediate((Health(3),)).unwrap();
//!     commands.change_hierarchy(root).unwrap().append([leaf]).unwrap();
//! });
//! world.startup()?;
//! world.update()?;
//! world.shutdown()?;
//! ```

pub mod config;
pub mod ecs;
pub mod error;
pub mod plugin;
pub mod prelude;

#[cfg(feature = "diagnostics")]
pub mod diag;

pub use error::{EcsError, Result};
