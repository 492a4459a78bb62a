//! # World — The Central Container
//!
//! The [`World`] owns all entities, components, and resources, plus the
//! schedules and plugins that drive them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ World                                               │
//! │                                                     │
//! │  storage: Storage                                   │
//! │    entities, component stores, Entity → components  │
//! │                                                     │
//! │  resources: Resources                               │
//! │    one value per type, not tied to an entity        │
//! │                                                     │
//! │  startup_systems / systems: Schedule                │
//! │  plugins: Vec<Box<dyn Plugin>>                      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//!  Created ──startup()──► Starting ──► Running ──shutdown()──► ShuttingDown ──► ShutDown
//!                      (plugins build)   │    ▲            (plugins quit)
//!                                        └────┘ update()
//! ```
//!
//! Calling a lifecycle method out of order returns
//! [`EcsError::Lifecycle`] and changes nothing. That includes a plugin
//! calling `startup` from its `build`. While plugins quit, the world is
//! already cleared and rejects new resources, commands and plugins.
//!
//! The world does not expose entity mutation directly. Structural changes go
//! through [`Commands`], either handed to systems by the schedule or created
//! for a local scope with [`Commands::new`].

use std::fmt;

use super::commands::Commands;
use super::component::ComponentTypeId;
use super::resource::Resources;
use super::storage::Storage;
use super::system::Schedule;
use crate::config::{QuitOrder, WorldConfig};
use crate::error::EcsError;
use crate::plugin::Plugin;

/// Where a [`World`] is in its startup → update → shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    /// Plugins are being built.
    Starting,
    Running,
    /// Plugins are quitting.
    ShuttingDown,
    ShutDown,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Created => "not started",
            Lifecycle::Starting => "starting",
            Lifecycle::Running => "running",
            Lifecycle::ShuttingDown => "shutting down",
            Lifecycle::ShutDown => "shut down",
        })
    }
}

/// The central container for all runtime state.
pub struct World {
    config: WorldConfig,
    storage: Storage,
    resources: Resources,
    startup_systems: Schedule,
    systems: Schedule,
    plugins: Vec<Box<dyn Plugin>>,
    lifecycle: Lifecycle,
    /// Completed `update` calls.
    tick: u64,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            storage: Storage::new(config.require_registration, config.pool_capacity),
            resources: Resources::new(),
            startup_systems: Schedule::new(),
            systems: Schedule::new(),
            plugins: Vec::new(),
            lifecycle: Lifecycle::Created,
            tick: 0,
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Add a system that runs once, during [`startup`](Self::startup).
    pub fn add_startup_system<F>(&mut self, system: F) -> &mut Self
    where
        F: FnMut(&mut Commands<'_>, &mut Resources) + 'static,
    {
        if !matches!(self.lifecycle, Lifecycle::Created | Lifecycle::Starting) {
            log::warn!("startup system added to a {} world will never run", self.lifecycle);
        }
        self.startup_systems.add_system(system);
        self
    }

    /// Add a system that runs on every [`update`](Self::update).
    pub fn add_system<F>(&mut self, system: F) -> &mut Self
    where
        F: FnMut(&mut Commands<'_>, &mut Resources) + 'static,
    {
        self.systems.add_system(system);
        self
    }

    /// Startup schedule, for adding [`System`](super::system::System)
    /// implementations that are not closures.
    pub fn startup_schedule_mut(&mut self) -> &mut Schedule {
        &mut self.startup_systems
    }

    /// Update schedule, for adding [`System`](super::system::System)
    /// implementations that are not closures.
    pub fn update_schedule_mut(&mut self) -> &mut Schedule {
        &mut self.systems
    }

    /// Add a plugin. It is built during [`startup`](Self::startup), or right
    /// away if the world is already running.
    ///
    /// Plugins added once shutdown has begun are dropped without being built.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        let mut plugin: Box<dyn Plugin> = Box::new(plugin);
        match self.lifecycle {
            Lifecycle::Created | Lifecycle::Starting => {}
            Lifecycle::Running => {
                log::debug!("building plugin `{}`", plugin.name());
                plugin.build(self);
            }
            Lifecycle::ShuttingDown | Lifecycle::ShutDown => {
                log::warn!(
                    "plugin `{}` added to a {} world was discarded",
                    plugin.name(),
                    self.lifecycle
                );
                return self;
            }
        }
        self.plugins.push(plugin);
        self
    }

    /// Register a component type up front.
    ///
    /// Required for every component type when
    /// [`WorldConfig::require_registration`] is set.
    pub fn register_component<T: 'static>(&mut self) -> Result<ComponentTypeId, EcsError> {
        self.storage.register::<T>()
    }

    // ── Resources ────────────────────────────────────────────────────

    /// Install or replace the singleton of type `T`. A replaced value is
    /// dropped first.
    ///
    /// Rejected once shutdown has begun.
    pub fn set_resource<T: 'static>(&mut self, value: T) -> Result<(), EcsError> {
        self.reject_after_shutdown("set a resource on")?;
        self.resources.insert(value);
        Ok(())
    }

    /// Returns `None` if no `T` is set.
    pub fn get_resource<T: 'static>(&self) -> Option<&T> {
        self.resources.get::<T>()
    }

    pub fn get_resource_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.resources.get_mut::<T>()
    }

    pub fn remove_resource<T: 'static>(&mut self) -> Option<T> {
        self.resources.remove::<T>()
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// A command buffer for a local scope. Rejected once shutdown has begun.
    pub fn commands(&mut self) -> Result<Commands<'_>, EcsError> {
        self.reject_after_shutdown("issue commands to")?;
        Ok(Commands::new(self))
    }

    /// Read-only view of entities and component stores.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    pub fn entity_count(&self) -> usize {
        self.storage.entity_count()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Number of completed [`update`](Self::update) calls.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    fn require_state(&self, state: Lifecycle, operation: &'static str) -> Result<(), EcsError> {
        if self.lifecycle == state {
            Ok(())
        } else {
            Err(EcsError::Lifecycle {
                operation,
                state: self.lifecycle,
            })
        }
    }

    fn reject_after_shutdown(&self, operation: &'static str) -> Result<(), EcsError> {
        match self.lifecycle {
            Lifecycle::ShuttingDown | Lifecycle::ShutDown => Err(EcsError::Lifecycle {
                operation,
                state: self.lifecycle,
            }),
            _ => Ok(()),
        }
    }

    /// Build every plugin, then run every startup system once, in order.
    ///
    /// Plugins added by another plugin's `build` are built in the same pass,
    /// after the ones already registered.
    pub fn startup(&mut self) -> Result<(), EcsError> {
        self.require_state(Lifecycle::Created, "start up")?;
        self.lifecycle = Lifecycle::Starting;
        log::debug!("world starting up");

        let mut built = Vec::new();
        loop {
            let pending = std::mem::take(&mut self.plugins);
            if pending.is_empty() {
                break;
            }
            for mut plugin in pending {
                log::debug!("building plugin `{}`", plugin.name());
                plugin.build(self);
                built.push(plugin);
            }
        }
        self.plugins = built;

        self.lifecycle = Lifecycle::Running;
        self.startup_systems.run(&mut self.storage, &mut self.resources)?;
        log::debug!(
            "world running: {} plugin(s), {} startup system(s), {} system(s)",
            self.plugins.len(),
            self.startup_systems.len(),
            self.systems.len()
        );
        Ok(())
    }

    /// Run every update system once, in order.
    pub fn update(&mut self) -> Result<(), EcsError> {
        self.require_state(Lifecycle::Running, "update")?;
        self.systems.run(&mut self.storage, &mut self.resources)?;
        self.tick += 1;
        Ok(())
    }

    /// Clear every entity, resource, and component store, then run each
    /// plugin's `quit`.
    ///
    /// Plugins quit even if clearing storage reports pool corruption; that
    /// error is returned afterwards.
    pub fn shutdown(&mut self) -> Result<(), EcsError> {
        self.require_state(Lifecycle::Running, "shut down")?;
        self.lifecycle = Lifecycle::ShuttingDown;
        log::debug!("world shutting down after {} tick(s)", self.tick);

        let cleared = self.storage.clear();
        self.resources.clear();

        let mut plugins = std::mem::take(&mut self.plugins);
        let order = self.config.quit_order;
        match order {
            QuitOrder::Registration => {
                for plugin in plugins.iter_mut() {
                    log::debug!("quitting plugin `{}`", plugin.name());
                    plugin.quit(self);
                }
            }
            QuitOrder::Reverse => {
                for plugin in plugins.iter_mut().rev() {
                    log::debug!("quitting plugin `{}`", plugin.name());
                    plugin.quit(self);
                }
            }
        }
        self.plugins = plugins;

        self.lifecycle = Lifecycle::ShutDown;
        cleared
    }

    /// Snapshot of entity, store, resource, and system timing state.
    #[cfg(feature = "diagnostics")]
    pub fn diagnostics_snapshot(&self) -> crate::diag::DiagSnapshot {
        crate::diag::DiagSnapshot::capture(
            self.tick,
            self.lifecycle,
            &self.storage,
            &self.resources,
            &self.systems,
        )
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for World {
    fn drop(&mut self) {
        if self.lifecycle == Lifecycle::Running {
            log::warn!("world dropped while running; shutting down");
            if let Err(err) = self.shutdown() {
                log::error!("shutdown during drop failed: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::Entity;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Log = Rc<RefCell<Vec<String>>>;

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl Plugin for Recorder {
        fn build(&mut self, _world: &mut World) {
            self.log.borrow_mut().push(format!("build {}", self.name));
        }

        fn quit(&mut self, world: &mut World) {
            assert!(world.resources().is_empty());
            self.log.borrow_mut().push(format!("quit {}", self.name));
        }
    }

    #[derive(Debug, PartialEq)]
    struct Score(u32);

    #[test]
    fn startup_systems_run_once_in_order() {
        let log = new_log();
        let mut world = World::new();
        for name in ["first", "second", "third"] {
            let log = log.clone();
            world.add_startup_system(move |_, _| log.borrow_mut().push(name.to_string()));
        }

        world.startup().unwrap();
        for _ in 0..5 {
            world.update().unwrap();
        }
        assert_eq!(entries(&log), vec!["first", "second", "third"]);
    }

    #[test]
    fn update_systems_run_every_update() {
        let mut world = World::new();
        world.set_resource(Score(0)).unwrap();
        world.add_system(|_, resources| {
            if let Some(score) = resources.get_mut::<Score>() {
                score.0 += 1;
            }
        });

        world.startup().unwrap();
        for _ in 0..3 {
            world.update().unwrap();
        }
        assert_eq!(world.get_resource::<Score>(), Some(&Score(3)));
        assert_eq!(world.tick(), 3);
    }

    #[test]
    fn plugins_build_before_startup_systems() {
        let log = new_log();
        let mut world = World::new();
        {
            let log = log.clone();
            world.add_startup_system(move |_, _| log.borrow_mut().push("startup".into()));
        }
        world.add_plugin(Recorder { name: "a", log: log.clone() });
        world.add_plugin(Recorder { name: "b", log: log.clone() });

        world.startup().unwrap();
        assert_eq!(entries(&log), vec!["build a", "build b", "startup"]);
    }

    #[test]
    fn shutdown_clears_resources_and_quits_plugins_in_order() {
        let log = new_log();
        let mut world = World::new();
        world.add_plugin(Recorder { name: "a", log: log.clone() });
        world.add_plugin(Recorder { name: "b", log: log.clone() });
        world.set_resource(Score(1)).unwrap();
        world.set_resource(String::from("name")).unwrap();

        world.startup().unwrap();
        world.shutdown().unwrap();

        assert_eq!(world.get_resource::<Score>(), None);
        assert_eq!(world.get_resource::<String>(), None);
        assert_eq!(entries(&log), vec!["build a", "build b", "quit a", "quit b"]);
        assert_eq!(world.lifecycle(), Lifecycle::ShutDown);
    }

    #[test]
    fn reverse_quit_order() {
        let log = new_log();
        let config = WorldConfig {
            quit_order: QuitOrder::Reverse,
            ..WorldConfig::default()
        };
        let mut world = World::with_config(config);
        world.add_plugin(Recorder { name: "a", log: log.clone() });
        world.add_plugin(Recorder { name: "b", log: log.clone() });

        world.startup().unwrap();
        world.shutdown().unwrap();
        assert_eq!(entries(&log)[2..].to_vec(), vec!["quit b", "quit a"]);
    }

    #[test]
    fn plugin_added_during_build_is_built_in_same_pass() {
        struct Outer(Log);
        impl Plugin for Outer {
            fn build(&mut self, world: &mut World) {
                self.0.borrow_mut().push("build outer".into());
                world.add_plugin(Recorder { name: "inner", log: self.0.clone() });
            }
        }

        let log = new_log();
        let mut world = World::new();
        world.add_plugin(Outer(log.clone()));
        world.add_plugin(Recorder { name: "last", log: log.clone() });

        world.startup().unwrap();
        world.shutdown().unwrap();
        assert_eq!(
            entries(&log),
            vec!["build outer", "build last", "build inner", "quit last", "quit inner"]
        );
    }

    #[test]
    fn plugin_can_install_systems_and_resources() {
        struct ScorePlugin;
        impl Plugin for ScorePlugin {
            fn build(&mut self, world: &mut World) {
                world.set_resource(Score(10)).unwrap();
                world.add_system(|_, resources| {
                    if let Some(score) = resources.get_mut::<Score>() {
                        score.0 *= 2;
                    }
                });
            }
        }

        let mut world = World::new();
        world.add_plugin(ScorePlugin);
        world.startup().unwrap();
        world.update().unwrap();
        assert_eq!(world.get_resource::<Score>(), Some(&Score(20)));
    }

    #[test]
    fn lifecycle_order_is_enforced() {
        let mut world = World::new();
        assert!(matches!(
            world.update(),
            Err(EcsError::Lifecycle { state: Lifecycle::Created, .. })
        ));
        assert!(matches!(world.shutdown(), Err(EcsError::Lifecycle { .. })));

        world.startup().unwrap();
        assert!(matches!(
            world.startup(),
            Err(EcsError::Lifecycle { state: Lifecycle::Running, .. })
        ));

        world.shutdown().unwrap();
        let err = world.update().unwrap_err();
        assert_eq!(err.to_string(), "cannot update a world that is shut down");
        assert!(world.shutdown().is_err());
        assert!(world.commands().is_err());
    }

    #[test]
    fn startup_from_plugin_build_is_rejected() {
        struct Restarter(Rc<RefCell<Option<Result<(), EcsError>>>>);
        impl Plugin for Restarter {
            fn build(&mut self, world: &mut World) {
                assert_eq!(world.lifecycle(), Lifecycle::Starting);
                *self.0.borrow_mut() = Some(world.startup());
            }
        }

        let nested = Rc::new(RefCell::new(None));
        let runs = Rc::new(RefCell::new(0));
        let mut world = World::new();
        world.add_plugin(Restarter(nested.clone()));
        {
            let runs = runs.clone();
            world.add_startup_system(move |_, _| *runs.borrow_mut() += 1);
        }

        world.startup().unwrap();
        assert!(matches!(
            nested.borrow_mut().take(),
            Some(Err(EcsError::Lifecycle { state: Lifecycle::Starting, .. }))
        ));
        assert_eq!(*runs.borrow(), 1);
        assert_eq!(world.lifecycle(), Lifecycle::Running);
    }

    #[test]
    fn plugin_quit_cannot_repopulate_the_world() {
        struct Lingerer(Log);
        impl Plugin for Lingerer {
            fn build(&mut self, _world: &mut World) {}

            fn quit(&mut self, world: &mut World) {
                assert_eq!(world.lifecycle(), Lifecycle::ShuttingDown);
                if world.set_resource(Score(7)).is_err() {
                    self.0.borrow_mut().push("resource rejected".into());
                }
                if world.commands().is_err() {
                    self.0.borrow_mut().push("commands rejected".into());
                }
                world.add_plugin(Recorder { name: "late", log: self.0.clone() });
            }
        }

        let log = new_log();
        let mut world = World::new();
        world.add_plugin(Lingerer(log.clone()));
        world.startup().unwrap();
        world.shutdown().unwrap();

        assert_eq!(entries(&log), vec!["resource rejected", "commands rejected"]);
        assert_eq!(world.get_resource::<Score>(), None);
        assert!(world.resources().is_empty());
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.lifecycle(), Lifecycle::ShutDown);
        assert!(world.set_resource(Score(1)).is_err());
    }

    #[test]
    fn system_spawns_are_visible_to_later_systems_and_updates() {
        let mut world = World::new();
        world.add_startup_system(|commands, _| {
            commands.spawn_immediate((Score(1),)).unwrap();
        });
        world.add_system(|commands, resources| {
            let alive: Vec<Entity> = commands.storage().entities_with::<Score>().to_vec();
            for e in alive {
                commands.destroy_entity(e).unwrap();
            }
            resources.insert(Score(0));
        });

        world.startup().unwrap();
        assert_eq!(world.entity_count(), 1);
        world.update().unwrap();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn failing_system_reports_error_and_keeps_running_state() {
        let mut world = World::new();
        world.add_system(|commands, _| {
            let e = commands.spawn_empty();
            commands.destroy_entity(e).unwrap();
            commands.destroy_entity(e).unwrap();
        });
        world.startup().unwrap();
        assert!(matches!(world.update(), Err(EcsError::UnknownEntity(_))));
        assert_eq!(world.tick(), 0);
        assert_eq!(world.lifecycle(), Lifecycle::Running);
    }

    #[test]
    fn register_component_twice_fails() {
        #[derive(Debug)]
        struct Tag;

        let mut world = World::new();
        world.register_component::<Tag>().unwrap();
        assert!(matches!(
            world.register_component::<Tag>(),
            Err(EcsError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn shutdown_drops_every_component_once() {
        struct Tracked(Arc<AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let mut world = World::new();
        world.startup().unwrap();
        {
            let mut commands = world.commands().unwrap();
            for _ in 0..3 {
                commands.spawn_immediate((Tracked(drops.clone()),)).unwrap();
            }
            let e = commands.spawn_immediate((Tracked(drops.clone()),)).unwrap();
            commands.destroy_entity(e).unwrap();
            commands.execute().unwrap();
        }

        world.shutdown().unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 4);
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn dropping_running_world_quits_plugins() {
        let log = new_log();
        {
            let mut world = World::new();
            world.add_plugin(Recorder { name: "a", log: log.clone() });
            world.startup().unwrap();
        }
        assert_eq!(entries(&log), vec!["build a", "quit a"]);
    }

    #[test]
    fn plugin_added_while_running_is_built_immediately() {
        let log = new_log();
        let mut world = World::new();
        world.startup().unwrap();
        world.add_plugin(Recorder { name: "late", log: log.clone() });
        assert_eq!(entries(&log), vec!["build late"]);
        world.shutdown().unwrap();
        assert_eq!(entries(&log), vec!["build late", "quit late"]);
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn diagnostics_snapshot_reflects_state() {
        let mut world = World::new();
        world.set_resource(Score(0)).unwrap();
        world.add_system(|commands, _| {
            commands.spawn_immediate((Score(1),)).unwrap();
        });
        world.startup().unwrap();
        world.update().unwrap();
        world.update().unwrap();

        let snapshot = world.diagnostics_snapshot();
        assert_eq!(snapshot.tick, 2);
        assert_eq!(snapshot.entity_count, 2);
        assert_eq!(snapshot.resource_count, 1);
        assert_eq!(snapshot.system_timings.len(), 1);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"tick\": 2"));
    }
}
