//! # Commands — Buffered Structural Changes
//!
//! Systems never mutate the entity layout directly. They get a [`Commands`]
//! bound to the world for the length of one invocation and record what they
//! want changed:
//!
//! ```text
//!  system body                         after the system returns
//!  ───────────                         ────────────────────────
//!  spawn_immediate(..) ──► applied now, returns Entity
//!  destroy_entity(e)   ──► queue: [Destroy(e)]
//!  change_hierarchy(p)
//!      .append([c])    ──► queue: [Destroy(e), AppendChildren(p, [c])]
//!                                      │
//!                          execute() ──┴─► replayed in record order
//! ```
//!
//! Spawning is immediate because a new entity cannot disturb anything a
//! system is already looking at, and the caller usually wants the id back.
//! Everything that removes or relinks entities is deferred.
//!
//! ## Failure
//!
//! Deferred operations are validated twice: when recorded (so obvious misuse
//! is reported at the call site) and when executed (earlier operations in the
//! batch may have changed the world). [`Commands::execute`] stops at the first
//! operation that fails. Operations before it stay applied, the failing one
//! changes nothing, and the rest of the batch is dropped. The buffer is empty
//! afterwards either way.

use std::any::{TypeId, type_name};

use super::entity::Entity;
use super::hierarchy::{HierarchyEditor, ensure_not_hierarchy};
use super::storage::{Bundle, Storage};
use super::world::World;
use crate::error::EcsError;

type Deferred = Box<dyn FnOnce(&mut Storage) -> Result<(), EcsError>>;

/// One buffered structural change.
pub(crate) enum Command {
    Destroy(Entity),
    DestroyRecursive(Entity),
    Insert {
        entity: Entity,
        component: &'static str,
        apply: Deferred,
    },
    Remove {
        entity: Entity,
        component: &'static str,
        apply: Deferred,
    },
    AppendChildren {
        parent: Entity,
        children: Vec<Entity>,
    },
    RemoveChild {
        parent: Entity,
        child: Entity,
        index: usize,
    },
}

impl Command {
    fn apply(self, storage: &mut Storage) -> Result<(), EcsError> {
        match self {
            Command::Destroy(entity) => storage.destroy(entity),
            Command::DestroyRecursive(entity) => {
                let count = storage.destroy_recursive(entity)?;
                log::trace!("destroyed subtree of {entity} ({count} entities)");
                Ok(())
            }
            Command::Insert { apply, .. } | Command::Remove { apply, .. } => apply(storage),
            Command::AppendChildren { parent, children } => {
                storage.append_children(parent, &children)
            }
            Command::RemoveChild {
                parent,
                child,
                index,
            } => storage.remove_child(parent, child, index),
        }
    }

    fn describe(&self) -> String {
        match self {
            Command::Destroy(entity) => format!("destroy {entity}"),
            Command::DestroyRecursive(entity) => format!("destroy subtree {entity}"),
            Command::Insert { entity, component, .. } => format!("insert `{component}` on {entity}"),
            Command::Remove { entity, component, .. } => {
                format!("remove `{component}` from {entity}")
            }
            Command::AppendChildren { parent, children } => {
                format!("append {} children to {parent}", children.len())
            }
            Command::RemoveChild { parent, child, index } => {
                format!("remove child {child} at {index} from {parent}")
            }
        }
    }
}

/// Mutation buffer bound to one world.
///
/// Short-lived: one per system invocation, or one per explicit local scope
/// created with [`Commands::new`].
pub struct Commands<'w> {
    storage: &'w mut Storage,
    queue: Vec<Command>,
}

impl<'w> Commands<'w> {
    pub fn new(world: &'w mut World) -> Self {
        Self::from_storage(world.storage_mut())
    }

    pub(crate) fn from_storage(storage: &'w mut Storage) -> Self {
        Self {
            storage,
            queue: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, command: Command) {
        self.queue.push(command);
    }

    // ── Immediate ────────────────────────────────────────────────────

    /// Spawn an entity with `bundle` right away and return it.
    ///
    /// Fails without creating anything if the bundle names a type twice or,
    /// under strict registration, names an unregistered type.
    pub fn spawn_immediate<B: Bundle>(&mut self, bundle: B) -> Result<Entity, EcsError> {
        self.storage.spawn(bundle)
    }

    /// Spawn an entity with no components.
    pub fn spawn_empty(&mut self) -> Entity {
        self.storage.spawn_empty()
    }

    // ── Deferred ─────────────────────────────────────────────────────

    /// Queue the destruction of `entity`. Its children are orphaned.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.storage.ensure_alive(entity)?;
        self.queue.push(Command::Destroy(entity));
        Ok(())
    }

    /// Queue the destruction of `entity` and all of its descendants.
    pub fn destroy_recursive(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.storage.ensure_alive(entity)?;
        self.queue.push(Command::DestroyRecursive(entity));
        Ok(())
    }

    /// Queue attaching `value` to `entity`.
    ///
    /// [`Parent`](super::hierarchy::Parent) and
    /// [`Children`](super::hierarchy::Children) are rejected; use
    /// [`change_hierarchy`](Self::change_hierarchy).
    pub fn insert<T: 'static>(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        ensure_not_hierarchy(TypeId::of::<T>(), type_name::<T>())?;
        self.storage.ensure_alive(entity)?;
        self.queue.push(Command::Insert {
            entity,
            component: type_name::<T>(),
            apply: Box::new(move |storage| storage.insert(entity, value)),
        });
        Ok(())
    }

    /// Queue detaching the `T` from `entity`. Missing components are ignored.
    /// Hierarchy components are rejected as for [`insert`](Self::insert).
    pub fn remove<T: 'static>(&mut self, entity: Entity) -> Result<(), EcsError> {
        ensure_not_hierarchy(TypeId::of::<T>(), type_name::<T>())?;
        self.storage.ensure_alive(entity)?;
        self.queue.push(Command::Remove {
            entity,
            component: type_name::<T>(),
            apply: Box::new(move |storage| storage.remove::<T>(entity).map(|_| ())),
        });
        Ok(())
    }

    /// Start recording hierarchy edits for `entity`.
    pub fn change_hierarchy(&mut self, entity: Entity) -> Result<HierarchyEditor<'_, 'w>, EcsError> {
        self.storage.ensure_alive(entity)?;
        Ok(HierarchyEditor::new(self, entity))
    }

    /// Apply every queued operation in record order.
    pub fn execute(&mut self) -> Result<(), EcsError> {
        let queue = std::mem::take(&mut self.queue);
        let total = queue.len();
        for (applied, command) in queue.into_iter().enumerate() {
            let description = log::log_enabled!(log::Level::Debug).then(|| command.describe());
            if let Err(err) = command.apply(self.storage) {
                log::debug!(
                    "`{}` failed: {err}; dropped {} remaining command(s)",
                    description.unwrap_or_default(),
                    total - applied - 1
                );
                return Err(err);
            }
        }
        Ok(())
    }

    /// Number of operations waiting for [`execute`](Self::execute).
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn get<T: 'static>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.storage.get(entity)
    }

    /// Hierarchy components are read-only here.
    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        ensure_not_hierarchy(TypeId::of::<T>(), type_name::<T>())?;
        self.storage.get_mut(entity)
    }

    pub fn contains<T: 'static>(&self, entity: Entity) -> bool {
        self.storage.contains::<T>(entity)
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.storage.is_alive(entity)
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.storage.parent_of(entity)
    }

    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.storage.children_of(entity)
    }

    /// Read-only view of the world's entities and component stores.
    pub fn storage(&self) -> &Storage {
        self.storage
    }
}

impl Drop for Commands<'_> {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            log::warn!(
                "discarding {} unexecuted command(s); call Commands::execute to apply them",
                self.queue.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Position(i32, i32);
    #[derive(Debug, PartialEq)]
    struct Health(u32);

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn spawn_is_visible_before_execute() {
        let mut world = World::new();
        let mut commands = Commands::new(&mut world);
        let e = commands.spawn_immediate((Position(1, 2), Health(10))).unwrap();
        assert!(commands.is_alive(e));
        assert_eq!(commands.get::<Position>(e).unwrap(), &Position(1, 2));
        assert_eq!(commands.pending(), 0);
    }

    #[test]
    fn destroy_is_deferred_until_execute() {
        let mut world = World::new();
        let mut commands = Commands::new(&mut world);
        let e = commands.spawn_immediate((Health(1),)).unwrap();

        commands.destroy_entity(e).unwrap();
        assert!(commands.is_alive(e));
        assert_eq!(commands.pending(), 1);

        commands.execute().unwrap();
        assert!(!commands.is_alive(e));
        assert_eq!(commands.pending(), 0);
    }

    #[test]
    fn spawn_destroy_round_trip_restores_store_state() {
        let mut world = World::new();
        let mut commands = Commands::new(&mut world);
        let keep = commands.spawn_immediate((Position(0, 0),)).unwrap();
        let before = commands.storage().store::<Position>().unwrap().pool().active_count();

        let e = commands.spawn_immediate((Position(5, 5), Health(3))).unwrap();
        commands.destroy_entity(e).unwrap();
        commands.execute().unwrap();

        let store = commands.storage().store::<Position>().unwrap();
        assert_eq!(store.pool().active_count(), before);
        assert_eq!(store.entities(), &[keep]);
        assert!(!store.contains(e));
        assert_eq!(store.pool().cached_count(), 1);
        assert_eq!(commands.storage().store::<Health>().unwrap().pool().cached_count(), 1);
    }

    #[test]
    fn churn_reuses_pooled_slots() {
        let mut world = World::new();
        let mut commands = Commands::new(&mut world);
        for i in 0..50 {
            let e = commands.spawn_immediate((Health(i),)).unwrap();
            commands.destroy_entity(e).unwrap();
            commands.execute().unwrap();
        }
        let pool = commands.storage().store::<Health>().unwrap().pool();
        assert_eq!(pool.allocations(), 1);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn destroy_unknown_entity_is_rejected_when_recorded() {
        let mut world = World::new();
        let mut commands = Commands::new(&mut world);
        let e = commands.spawn_empty();
        commands.destroy_entity(e).unwrap();
        commands.execute().unwrap();

        assert!(matches!(commands.destroy_entity(e), Err(EcsError::UnknownEntity(_))));
        assert!(matches!(commands.change_hierarchy(e).err(), Some(EcsError::UnknownEntity(_))));
        assert_eq!(commands.pending(), 0);
    }

    #[test]
    fn execute_stops_at_first_failure_and_clears_buffer() {
        init_logger();
        let mut world = World::new();
        let mut commands = Commands::new(&mut world);
        let a = commands.spawn_empty();
        let b = commands.spawn_empty();
        let c = commands.spawn_empty();

        commands.destroy_entity(a).unwrap();
        commands.destroy_entity(b).unwrap();
        commands.destroy_entity(b).unwrap();
        commands.destroy_entity(c).unwrap();

        let err = commands.execute().unwrap_err();
        assert!(matches!(err, EcsError::UnknownEntity(x) if x == b));
        assert!(!commands.is_alive(a));
        assert!(!commands.is_alive(b));
        assert!(commands.is_alive(c));
        assert_eq!(commands.pending(), 0);
    }

    #[test]
    fn deferred_insert_and_remove() {
        let mut world = World::new();
        let mut commands = Commands::new(&mut world);
        let e = commands.spawn_immediate((Position(0, 0),)).unwrap();

        commands.insert(e, Health(5)).unwrap();
        assert!(!commands.contains::<Health>(e));
        commands.execute().unwrap();
        assert_eq!(commands.get::<Health>(e).unwrap(), &Health(5));

        commands.remove::<Position>(e).unwrap();
        commands.execute().unwrap();
        assert!(matches!(
            commands.get::<Position>(e),
            Err(EcsError::MissingComponent { .. })
        ));
    }

    #[test]
    fn duplicate_insert_fails_and_keeps_original() {
        let mut world = World::new();
        let mut commands = Commands::new(&mut world);
        let e = commands.spawn_immediate((Health(1),)).unwrap();
        commands.insert(e, Health(99)).unwrap();

        let err = commands.execute().unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { entity, .. } if entity == e));
        assert_eq!(commands.get::<Health>(e).unwrap(), &Health(1));
    }

    #[test]
    fn get_mut_writes_through() {
        let mut world = World::new();
        let mut commands = Commands::new(&mut world);
        let e = commands.spawn_immediate((Health(1),)).unwrap();
        commands.get_mut::<Health>(e).unwrap().0 = 42;
        assert_eq!(commands.get::<Health>(e).unwrap().0, 42);
    }

    #[test]
    fn strict_registration_rejects_unregistered_spawn() {
        let config = WorldConfig {
            require_registration: true,
            ..WorldConfig::default()
        };
        let mut world = World::with_config(config);
        let mut commands = Commands::new(&mut world);
        let err = commands.spawn_immediate((Health(1),)).unwrap_err();
        assert!(matches!(err, EcsError::UnregisteredComponent { .. }));
        assert_eq!(commands.storage().entity_count(), 0);
    }

    #[test]
    fn dropping_with_pending_commands_discards_them() {
        init_logger();
        let mut world = World::new();
        let e = {
            let mut commands = Commands::new(&mut world);
            let e = commands.spawn_empty();
            commands.destroy_entity(e).unwrap();
            e
        };
        assert!(world.storage().is_alive(e));
    }

    #[test]
    fn destroyed_components_are_dropped_at_teardown_only() {
        struct Tracked(Arc<AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let mut world = World::new();
        {
            let mut commands = Commands::new(&mut world);
            let a = commands.spawn_immediate((Tracked(drops.clone()),)).unwrap();
            commands.spawn_immediate((Tracked(drops.clone()),)).unwrap();
            commands.destroy_entity(a).unwrap();
            commands.execute().unwrap();
        }
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(world);
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }
}
