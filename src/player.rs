//! The local player, the local camera, and how the player drives the run.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::input::PlayerInput;
use crate::level::LevelConfig;
use crate::physics::controller::{Controller, ControllerBundle, ControllerOptions};
use crate::run::{in_phase, Phase, PhaseChanged, RunState};
use crate::GameSet;

/// Contains systems for the player and the camera.
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraOptions>()
            .add_systems(Startup, spawn_player)
            .add_systems(
                Update,
                (
                    start_on_input
                        .in_set(GameSet::Input)
                        .after(crate::input::read_player_input),
                    check_run_bounds
                        .run_if(in_phase(Phase::Playing))
                        .in_set(GameSet::Outcome),
                    reset_player.in_set(GameSet::Lifecycle),
                    update_camera_position.in_set(GameSet::Camera),
                ),
            );
    }
}

/// A marker component that marks the local player.
///
/// There can only be one local player at a time.
#[derive(Clone, Copy, Component, Debug, Default)]
pub struct LocalPlayer;

/// A marker component that marks the local camera.
///
/// Similarly to [`LocalPlayer`], there can only be one local camera at a time.
#[derive(Clone, Copy, Component, Debug, Default)]
pub struct LocalCamera;

/// Chase camera tuning.
#[derive(Clone, Debug, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Camera position relative to the player.
    pub offset: Vec3,
    /// Look-at point relative to the player.
    pub target_offset: Vec3,
    /// Smoothing rate, per second.
    pub rate: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        CameraOptions {
            offset: Vec3::new(0.0, 0.65, 2.25),
            target_offset: Vec3::new(0.0, 0.25, 0.0),
            rate: 5.0,
        }
    }
}

/// Smoothed camera position and look-at target.
#[derive(Clone, Copy, Component, Debug, PartialEq)]
pub struct ChaseCamera {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for ChaseCamera {
    fn default() -> Self {
        ChaseCamera {
            position: Vec3::splat(20.0),
            target: Vec3::ZERO,
        }
    }
}

impl ChaseCamera {
    /// Moves both estimates toward the player by `min(1, rate * dt)` of the
    /// remaining distance.
    pub fn follow(&mut self, player: Vec3, dt: f32, options: &CameraOptions) {
        let factor = (options.rate * dt).clamp(0.0, 1.0);

        self.position = self.position.lerp(player + options.offset, factor);
        self.target = self.target.lerp(player + options.target_offset, factor);
    }
}

/// How a run ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The player dropped off the course.
    Fell,
    /// The player crossed the goal line.
    Finished,
}

impl RunOutcome {
    /// Checks a player `position` against the course for `segment_count`
    /// obstacle segments of `unit` length.
    pub fn evaluate(
        position: Vec3,
        segment_count: usize,
        unit: f32,
        copts: &ControllerOptions,
    ) -> Option<RunOutcome> {
        let goal_z = -(segment_count as f32 * unit + copts.goal_margin);

        if position.y < copts.fall_height {
            Some(RunOutcome::Fell)
        } else if position.z < goal_z {
            Some(RunOutcome::Finished)
        } else {
            None
        }
    }
}

/// A system that spawns the player and the camera.
pub fn spawn_player(
    mut commands: Commands,
    copts: Res<ControllerOptions>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // spawn the player
    commands.spawn((
        ControllerBundle {
            transform: Transform::from_translation(copts.spawn),
            ..default()
        },
        meshes.add(Sphere::new(Controller::RADIUS)),
        materials.add(StandardMaterial {
            base_color: Color::rgb(0.58, 0.44, 0.86),
            ..default()
        }),
        LocalPlayer,
    ));

    // spawn the camera
    let chase = ChaseCamera::default();
    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_translation(chase.position)
                .looking_at(chase.target, Vec3::Y),
            ..default()
        },
        chase,
        LocalCamera,
    ));
}

/// Starts the run on the first directional press.
pub fn start_on_input(
    input: Res<PlayerInput>,
    time: Res<Time>,
    mut run: ResMut<RunState>,
    mut changes: EventWriter<PhaseChanged>,
) {
    if !input.direction_pressed {
        return;
    }

    // ignored unless ready
    if let Some(change) = run.start(time.elapsed()) {
        changes.send(change);
    }
}

/// Ends or restarts the run depending on where the player is.
pub fn check_run_bounds(
    player: Query<&Transform, With<LocalPlayer>>,
    copts: Res<ControllerOptions>,
    level: Res<LevelConfig>,
    time: Res<Time>,
    mut run: ResMut<RunState>,
    mut changes: EventWriter<PhaseChanged>,
) {
    let Ok(transform) = player.get_single() else {
        return;
    };

    let change = match RunOutcome::evaluate(
        transform.translation,
        run.segment_count(),
        level.unit(),
        &copts,
    ) {
        Some(RunOutcome::Fell) => {
            info!("player fell at {}", transform.translation);
            run.restart(level.segment_count())
        }
        Some(RunOutcome::Finished) => run.end(time.elapsed()),
        None => None,
    };

    if let Some(change) = change {
        changes.send(change);
    }
}

/// Puts the player back on the spawn point, at rest, whenever the run enters
/// [`Phase::Ready`].
pub fn reset_player(
    mut changes: EventReader<PhaseChanged>,
    copts: Res<ControllerOptions>,
    mut player: Query<
        (&mut Transform, &mut Velocity, Option<&mut ExternalImpulse>),
        With<LocalPlayer>,
    >,
) {
    if changes.read().filter(|change| change.is_reset()).count() == 0 {
        return;
    }
    let Ok((mut transform, mut velocity, impulse)) = player.get_single_mut() else {
        return;
    };

    *transform = Transform::from_translation(copts.spawn);
    *velocity = Velocity::zero();
    // drop whatever was queued this frame
    if let Some(mut impulse) = impulse {
        *impulse = ExternalImpulse::default();
    }
}

/// Updates the camera's movement based on the player position.
///
/// Reads the player's local [`Transform`], which already holds this frame's
/// reset; the player has no parent, so it is also the world position.
pub fn update_camera_position(
    player: Query<&Transform, (With<LocalPlayer>, Without<LocalCamera>)>,
    mut camera: Query<(&mut Transform, &mut ChaseCamera), With<LocalCamera>>,
    options: Res<CameraOptions>,
    time: Res<Time>,
) {
    let (Ok(player_transform), Ok((mut camera_transform, mut chase))) =
        (player.get_single(), camera.get_single_mut())
    else {
        return;
    };

    chase.follow(player_transform.translation, time.delta_seconds(), &options);

    *camera_transform =
        Transform::from_translation(chase.position).looking_at(chase.target, Vec3::Y);
}
