//! Diagnostics snapshot — a serializable view of world state.
//!
//! Enabled by the `diagnostics` feature flag. [`World::diagnostics_snapshot`]
//! collects entity counts, per-store pool occupancy, installed resources and
//! the timings of the most recent update, and [`DiagSnapshot::to_json`]
//! renders it for a log line or an external inspector.
//!
//! [`World::diagnostics_snapshot`]: crate::ecs::World::diagnostics_snapshot

use serde::Serialize;

use crate::ecs::system::{Schedule, SystemTiming};
use crate::ecs::world::Lifecycle;
use crate::ecs::{Resources, Storage};
use crate::error::EcsError;

// ── Snapshot types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DiagSnapshot {
    pub tick: u64,
    pub lifecycle: String,
    pub entity_count: usize,
    pub entity_pool: EntityPoolSnapshot,
    pub component_types: usize,
    pub stores: Vec<StoreSnapshot>,
    pub resource_count: usize,
    pub resources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system_timings: Vec<SystemTiming>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityPoolSnapshot {
    pub total_slots: usize,
    pub free_count: usize,
    pub alive_count: usize,
}

/// Pool occupancy of one component store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub name: String,
    pub live: usize,
    pub cached: usize,
    pub allocations: usize,
}

impl DiagSnapshot {
    pub(crate) fn capture(
        tick: u64,
        lifecycle: Lifecycle,
        storage: &Storage,
        resources: &Resources,
        systems: &Schedule,
    ) -> Self {
        let allocator = storage.allocator();
        Self {
            tick,
            lifecycle: lifecycle.to_string(),
            entity_count: storage.entity_count(),
            entity_pool: EntityPoolSnapshot {
                total_slots: allocator.total_slots(),
                free_count: allocator.free_count(),
                alive_count: allocator.alive_count(),
            },
            component_types: storage.registry().len(),
            stores: storage
                .store_stats()
                .into_iter()
                .map(|(name, stats)| StoreSnapshot {
                    name: short_type_name(name),
                    live: stats.live,
                    cached: stats.cached,
                    allocations: stats.allocations,
                })
                .collect(),
            resource_count: resources.len(),
            resources: resources.names().into_iter().map(short_type_name).collect(),
            system_timings: systems.timings().to_vec(),
        }
    }

    /// Total time spent in systems during the captured update, in µs.
    pub fn systems_us(&self) -> f64 {
        self.system_timings.iter().map(|t| t.duration_us).sum()
    }

    pub fn to_json(&self) -> Result<String, EcsError> {
        serde_json::to_string_pretty(self).map_err(EcsError::Diagnostics)
    }
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// short name (e.g. `game::components::Position` → `Position`).
fn short_type_name(full: &str) -> String {
    full.rsplit("::").next().unwrap_or(full).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Commands;
    use crate::ecs::World;

    struct Position(i32);
    struct Velocity(i32);

    #[test]
    fn short_names_drop_module_path() {
        assert_eq!(short_type_name("sapling::ecs::hierarchy::Parent"), "Parent");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn snapshot_counts_live_and_cached_slots() {
        let mut world = World::new();
        {
            let mut commands = Commands::new(&mut world);
            let a = commands.spawn_immediate((Position(0), Velocity(1))).unwrap();
            commands.spawn_immediate((Position(2),)).unwrap();
            commands.destroy_entity(a).unwrap();
            commands.execute().unwrap();
        }

        let snapshot = world.diagnostics_snapshot();
        assert_eq!(snapshot.entity_count, 1);
        assert_eq!(snapshot.entity_pool.free_count, 1);
        assert_eq!(snapshot.entity_pool.total_slots, 2);

        let position = snapshot.stores.iter().find(|s| s.name == "Position").unwrap();
        assert_eq!((position.live, position.cached, position.allocations), (1, 1, 2));
        let velocity = snapshot.stores.iter().find(|s| s.name == "Velocity").unwrap();
        assert_eq!((velocity.live, velocity.cached), (0, 1));
        assert_eq!(snapshot.lifecycle, "not started");
    }

    #[test]
    fn json_omits_empty_timings() {
        let world = World::new();
        let json = world.diagnostics_snapshot().to_json().unwrap();
        assert!(json.contains("\"entity_count\": 0"));
        assert!(!json.contains("system_timings"));
    }

    #[test]
    fn serialization_failure_is_a_diagnostics_error() {
        use std::error::Error as _;

        let source = serde_json::from_str::<u32>("[").unwrap_err();
        let err = EcsError::Diagnostics(source);
        assert!(err.to_string().starts_with("cannot serialize diagnostics"));
        assert!(err.source().is_some());
        assert!(!err.is_fatal());
    }
}
