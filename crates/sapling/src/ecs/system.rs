//! # System — Functions Driven by the World
//!
//! A system is a function that receives a fresh [`Commands`] and the world's
//! [`Resources`] each time it runs:
//!
//! - A system is `FnMut(&mut Commands, &mut Resources)`.
//! - Systems run one at a time, in the order they were added.
//! - Each system's commands are executed as soon as it returns, so the next
//!   system sees its changes.
//!
//! ## Schedule
//!
//! A [`Schedule`] is an ordered `Vec` of systems. The world keeps two: one
//! run once by [`World::startup`](super::world::World::startup), one run on
//! every [`World::update`](super::world::World::update).

use super::commands::Commands;
use super::resource::Resources;
use super::storage::Storage;
use crate::error::EcsError;

/// Something the world can run.
///
/// Any `FnMut(&mut Commands, &mut Resources)` implements this trait, so
/// closures and plain functions work directly.
pub trait System {
    fn run(&mut self, commands: &mut Commands<'_>, resources: &mut Resources);
}

impl<F> System for F
where
    F: FnMut(&mut Commands<'_>, &mut Resources),
{
    fn run(&mut self, commands: &mut Commands<'_>, resources: &mut Resources) {
        (self)(commands, resources);
    }
}

/// A boxed [`System`] with a short name for logs and diagnostics.
struct NamedSystem {
    name: String,
    system: Box<dyn System>,
}

/// Per-system timing recorded during the most recent run.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SystemTiming {
    pub name: String,
    pub duration_us: f64,
}

/// An ordered list of systems.
pub struct Schedule {
    systems: Vec<NamedSystem>,
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    /// Add a system to the end of the schedule.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        let name = short_system_name(std::any::type_name::<S>());
        log::trace!("scheduled system `{name}`");
        self.systems.push(NamedSystem {
            name,
            system: Box::new(system),
        });
    }

    /// Run every system in order, executing each one's commands after it
    /// returns.
    ///
    /// Stops at the first system whose commands fail to execute; later
    /// systems do not run.
    pub(crate) fn run(
        &mut self,
        storage: &mut Storage,
        resources: &mut Resources,
    ) -> Result<(), EcsError> {
        #[cfg(feature = "diagnostics")]
        self.timings.clear();

        for named in &mut self.systems {
            #[cfg(feature = "diagnostics")]
            let start = std::time::Instant::now();

            let mut commands = Commands::from_storage(storage);
            named.system.run(&mut commands, resources);
            if let Err(err) = commands.execute() {
                log::error!("system `{}` failed: {err}", named.name);
                return Err(err);
            }

            #[cfg(feature = "diagnostics")]
            self.timings.push(SystemTiming {
                name: named.name.clone(),
                duration_us: start.elapsed().as_secs_f64() * 1_000_000.0,
            });
        }
        Ok(())
    }

    /// Names of the scheduled systems, in run order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|named| named.name.as_str())
    }

    /// Timings from the most recent run.
    #[cfg(feature = "diagnostics")]
    pub fn timings(&self) -> &[SystemTiming] {
        &self.timings
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// last meaningful segment (e.g. `game::movement_system` → `movement_system`,
/// `{{closure}}` → `<closure>`).
fn short_system_name(full: &str) -> String {
    let name = full.rsplit("::").next().unwrap_or(full);
    if name.contains("closure") {
        "<closure>".to_string()
    } else {
        name.to_string()
    }
}
