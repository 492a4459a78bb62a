//! Plugins bundle setup and teardown that belong together.
//!
//! A plugin is added with [`World::add_plugin`]. Its [`build`](Plugin::build)
//! runs during [`World::startup`], before any startup system, and may add
//! systems, resources, component registrations, or further plugins. Its
//! [`quit`](Plugin::quit) runs during [`World::shutdown`], after every
//! entity and resource has been cleared; by then the world rejects new
//! resources, commands and plugins.
//!
//! ```ignore
//! struct ScorePlugin;
//!
//! impl Plugin for ScorePlugin {
//!     fn build(&mut self, world: &mut World) {
//!         world.set_resource(Score(0)).expect("world is starting");
//!         world.add_system(tally_score);
//!     }
//! }
//! ```

use crate::ecs::World;

/// Lifecycle hooks invoked by the [`World`].
pub trait Plugin: 'static {
    fn build(&mut self, world: &mut World);

    fn quit(&mut self, _world: &mut World) {}

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
