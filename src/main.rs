use std::path::Path;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use obstacle_run::config::{ConfigError, GameConfig, DEFAULT_CONFIG_PATH};
use obstacle_run::GamePlugins;

fn main() -> Result<(), ConfigError> {
    let path = std::env::args().nth(1);
    let config = GameConfig::load_or_default(Path::new(
        path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH),
    ))?;

    let mut app = App::new();
    // resources first so the plugins keep them instead of their defaults
    config.insert_into(&mut app);
    app.insert_resource(ClearColor(Color::rgb(0.15, 0.16, 0.21)))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Obstacle Run".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
        .add_plugins(GamePlugins)
        .run();

    Ok(())
}
