//! World configuration.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```json
//! { "quit_order": "reverse", "pool_capacity": 256 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EcsError;

/// Order in which plugins' `quit` hooks run at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuitOrder {
    /// Same order the plugins were added in.
    #[default]
    Registration,
    /// Last added quits first.
    Reverse,
}

/// Settings fixed at [`World`](crate::ecs::World) construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub quit_order: QuitOrder,
    /// Reject component types that were not registered with
    /// [`World::register_component`](crate::ecs::World::register_component).
    pub require_registration: bool,
    /// Slots reserved up front in each new component store's pool.
    pub pool_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            quit_order: QuitOrder::Registration,
            require_registration: false,
            pool_capacity: 0,
        }
    }
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EcsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EcsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| EcsError::ConfigIo {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_json_str(&contents)?;
        log::debug!("loaded world config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, EcsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
