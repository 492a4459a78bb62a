//! Error types shared by the storage, command, and lifecycle layers.
//!
//! Everything a caller can trigger through [`Commands`](crate::ecs::Commands)
//! or [`World`](crate::ecs::World) comes back as an [`EcsError`]. Most variants
//! are recoverable: the operation that produced them did not mutate anything.
//! The exception is [`EcsError::PoolCorrupted`] (and the related
//! [`EcsError::StoreMismatch`]), which means the bookkeeping between a sparse
//! index and its object pool has diverged. Check [`EcsError::is_fatal`] before
//! deciding to keep going.

use std::path::PathBuf;

use crate::ecs::entity::Entity;
use crate::ecs::pool::PoolError;
use crate::ecs::world::Lifecycle;

/// Errors produced by the ECS runtime.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity was never spawned, or has already been destroyed.
    #[error("unknown entity {0}")]
    UnknownEntity(Entity),

    /// The entity is alive but has no component of the requested type.
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    /// A second instance of a component type was attached to an entity.
    #[error("entity {entity} already has a `{component}` component")]
    DuplicateComponent {
        entity: Entity,
        component: &'static str,
    },

    /// A spawn bundle listed the same component type more than once.
    #[error("spawn bundle contains `{component}` more than once")]
    DuplicateBundleComponent { component: &'static str },

    /// A component type was registered twice.
    #[error("component `{component}` is already registered")]
    AlreadyRegistered { component: &'static str },

    /// Strict registration is on and the component type was never registered.
    #[error("component `{component}` is not registered")]
    UnregisteredComponent { component: &'static str },

    /// `Parent` and `Children` are only changed through hierarchy edits.
    #[error("`{component}` is maintained by the hierarchy; edit it with `Commands::change_hierarchy`")]
    HierarchyManaged { component: &'static str },

    /// Appending `child` under `parent` would make an entity its own ancestor.
    #[error("cannot parent {child} under {parent}: hierarchy would contain a cycle")]
    HierarchyCycle { parent: Entity, child: Entity },

    /// A child removal named a position that does not hold that child.
    #[error("{parent} does not have child {child} at index {index}")]
    ChildNotAtIndex {
        parent: Entity,
        child: Entity,
        index: usize,
    },

    /// A lifecycle method was called in the wrong state.
    #[error("cannot {operation} a world that is {state}")]
    Lifecycle {
        operation: &'static str,
        state: Lifecycle,
    },

    /// The world configuration is not valid JSON for [`WorldConfig`](crate::config::WorldConfig).
    #[error("invalid world configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A world configuration file could not be read.
    #[error("cannot read world configuration {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A diagnostics snapshot could not be rendered.
    #[error("cannot serialize diagnostics: {0}")]
    Diagnostics(#[source] serde_json::Error),

    /// A pool was asked to release a handle it does not consider active.
    #[error("object pool for `{component}` is corrupted: {source}")]
    PoolCorrupted {
        component: &'static str,
        #[source]
        source: PoolError,
    },

    /// A component store was registered under an id that maps to another type.
    #[error("component store for `{component}` holds a different type")]
    StoreMismatch { component: &'static str },
}

impl EcsError {
    /// Returns `true` for errors that mean internal bookkeeping is broken.
    ///
    /// Everything else is local to the failed operation and leaves the world
    /// consistent.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EcsError::PoolCorrupted { .. } | EcsError::StoreMismatch { .. }
        )
    }
}

/// Shorthand result type for ECS operations.
pub type Result<T, E = EcsError> = std::result::Result<T, E>;
