//! Obstacle run!
//!
//! Roll a ball down a generated runway of spinning, bobbing and swinging
//! obstacles, as fast as you can.

pub mod config;
pub mod hud;
pub mod input;
pub mod level;
pub mod physics;
pub mod player;
pub mod run;

use bevy::app::PluginGroupBuilder;
use bevy::prelude::*;

/// The game's plugins.
///
/// Physics is not included; add `RapierPhysicsPlugin` next to these.
pub struct GamePlugins;

impl PluginGroup for GamePlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>()
            .add(GameSetPlugin)
            .add(run::RunPlugin)
            .add(input::ControlsPlugin)
            .add(physics::controller::ControllerPlugin)
            .add(player::PlayerPlugin)
            .add(level::LevelPlugin)
            .add(hud::HudPlugin)
    }
}

/// A plugin that orders the [`GameSet`]s.
pub struct GameSetPlugin;

impl Plugin for GameSetPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                GameSet::Input,
                GameSet::Movement,
                GameSet::Outcome,
                GameSet::Lifecycle,
                GameSet::Camera,
            )
                .chain(),
        );
    }
}

/// The phases of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, SystemSet)]
pub enum GameSet {
    /// Input scanning.
    Input,
    /// Applying input in movement, and moving obstacles.
    Movement,
    /// Deciding whether the run ends or restarts.
    Outcome,
    /// Rebuilding the level and resetting the player after a restart.
    Lifecycle,
    /// For late-calculated camera shenanigans to prevent 1-frame delay.
    Camera,
}
