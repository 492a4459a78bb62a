//! Builds a small entity tree, ticks it a few times, and tears it down.
//!
//! Run with `RUST_LOG=debug cargo run --example hierarchy` to see lifecycle
//! logging.

use sapling::prelude::*;

#[derive(Debug)]
struct Name(&'static str);

#[derive(Debug)]
struct Lifetime(u32);

struct Frames(u64);

struct ReportPlugin;

impl Plugin for ReportPlugin {
    fn build(&mut self, world: &mut World) {
        if let Err(err) = world.set_resource(Frames(0)) {
            eprintln!("report plugin disabled: {err}");
            return;
        }
        world.add_system(|_, resources| {
            if let Some(frames) = resources.get_mut::<Frames>() {
                frames.0 += 1;
            }
        });
    }

    fn quit(&mut self, _world: &mut World) {
        println!("report plugin quit");
    }
}

fn spawn_tree(commands: &mut Commands<'_>, _resources: &mut Resources) {
    let result = (|| -> Result<(), EcsError> {
        let root = commands.spawn_immediate((Name("root"),))?;
        let left = commands.spawn_immediate((Name("left"), Lifetime(2)))?;
        let right = commands.spawn_immediate((Name("right"),))?;
        let leaf = commands.spawn_immediate((Name("leaf"), Lifetime(1)))?;

        commands.change_hierarchy(root)?.append([left, right])?;
        commands.change_hierarchy(left)?.append([leaf])?;
        Ok(())
    })();
    if let Err(err) = result {
        eprintln!("could not build tree: {err}");
    }
}

/// Counts every `Lifetime` down and destroys the subtree of anything that
/// reaches zero.
fn expire(commands: &mut Commands<'_>, _resources: &mut Resources) {
    let tracked = commands.storage().entities_with::<Lifetime>().to_vec();
    for entity in tracked {
        let Ok(lifetime) = commands.get_mut::<Lifetime>(entity) else {
            continue;
        };
        lifetime.0 = lifetime.0.saturating_sub(1);
        if lifetime.0 == 0 {
            let _ = commands.destroy_recursive(entity);
        }
    }
}

fn main() -> Result<(), EcsError> {
    let _ = env_logger::builder().try_init();

    let mut world = World::new();
    world.add_plugin(ReportPlugin);
    world.add_startup_system(spawn_tree);
    world.add_system(expire);

    world.startup()?;
    for _ in 0..3 {
        world.update()?;
        println!(
            "tick {}: {} entities, {} frame(s) counted",
            world.tick(),
            world.entity_count(),
            world.get_resource::<Frames>().map_or(0, |f| f.0)
        );
    }

    if let Some(names) = world.storage().store::<Name>() {
        for (entity, name) in names.iter() {
            let parent = world.storage().parent_of(entity);
            println!("survivor {entity} `{}` (parent: {parent:?})", name.0);
        }
    }

    #[cfg(feature = "diagnostics")]
    println!("{}", world.diagnostics_snapshot().to_json()?);

    world.shutdown()
}
