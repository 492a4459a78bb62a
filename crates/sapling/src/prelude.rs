//! Convenience re-exports — `use sapling::prelude::*` for the common items.

pub use crate::config::{QuitOrder, WorldConfig};
pub use crate::ecs::{
    Bundle, Children, Commands, Entity, HierarchyEditor, Lifecycle, Parent, Resources, Schedule,
    Storage, System, World,
};
pub use crate::error::EcsError;
pub use crate::plugin::Plugin;
#[cfg(feature = "diagnostics")]
pub use crate::diag::DiagSnapshot;
