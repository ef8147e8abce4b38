//! 3D physics-based rolling controller.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::input::{PlayerInput, RollInput};
use crate::GameSet;

/// Plugin for this module.
pub struct ControllerPlugin;

impl Plugin for ControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ControllerOptions>().add_systems(
            Update,
            (apply_controller_movement, apply_controller_jump)
                .chain()
                .in_set(GameSet::Movement),
        );
    }
}

/// A bundle that allows an entity to act with a controller.
///
/// The default values are preferred. The controller rolls: rotation must stay
/// unlocked.
#[derive(Bundle)]
pub struct ControllerBundle {
    pub transform: Transform,
    pub global_transform: GlobalTransform,
    pub visibility: Visibility,
    pub view_visibility: ViewVisibility,
    pub inherited_visibility: InheritedVisibility,
    pub collider: Collider,
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    pub external_impulse: ExternalImpulse,
    pub damping: Damping,
    pub restitution: Restitution,
    pub friction: Friction,
    pub sleeping: Sleeping,
    pub ccd: Ccd,
    pub controller: Controller,
}

impl Default for ControllerBundle {
    fn default() -> Self {
        ControllerBundle {
            transform: default(),
            global_transform: default(),
            visibility: default(),
            view_visibility: default(),
            inherited_visibility: default(),
            collider: Collider::ball(Controller::RADIUS),
            rigid_body: RigidBody::Dynamic,
            velocity: default(),
            external_impulse: default(),
            damping: Damping {
                linear_damping: 1.0,
                angular_damping: 1.0,
            },
            restitution: Restitution::coefficient(0.2),
            friction: Friction::coefficient(1.0),
            sleeping: Sleeping::disabled(),
            ccd: Ccd::enabled(),
            controller: default(),
        }
    }
}

/// A resource that holds controller options.
///
/// These can be set dynamically in-game.
#[derive(Clone, Debug, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerOptions {
    /// Rolling impulse per second of held input.
    pub impulse_strength: f32,
    /// Rolling torque impulse per second of held input.
    pub torque_strength: f32,
    /// Upward impulse of a jump.
    pub jump_impulse: f32,
    /// How far below the center the ground probe starts.
    pub probe_offset: f32,
    /// Longest ground probe.
    pub probe_length: f32,
    /// A probe hit closer than this counts as grounded.
    pub ground_distance: f32,
    /// Falling below this height restarts the run.
    pub fall_height: f32,
    /// How far past the last obstacle segment the goal line sits.
    pub goal_margin: f32,
    /// Where the player starts every attempt.
    pub spawn: Vec3,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        ControllerOptions {
            impulse_strength: 0.6,
            torque_strength: 0.2,
            jump_impulse: 0.5,
            probe_offset: 0.31,
            probe_length: 10.0,
            ground_distance: 0.15,
            fall_height: -4.0,
            goal_margin: 2.0,
            spawn: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}

/// A component that actually holds the state of the controller.
#[derive(Clone, Component, Debug, Default)]
pub struct Controller {
    roll: RollInput,
    jump: bool,
}

impl Controller {
    /// Radius of the ball collider.
    pub const RADIUS: f32 = 0.3;

    /// Will attempt to roll the controller in the held directions this frame.
    pub fn update_roll(&mut self, roll: RollInput) {
        self.roll = roll;
    }

    /// Queues a jump for this frame. It only happens if the controller is on
    /// the ground.
    pub fn request_jump(&mut self) {
        self.jump = true;
    }
}

/// Impulse and torque impulse for one frame of rolling.
///
/// Opposite directions cancel out; the input layer is expected to not send
/// both.
pub fn roll_impulse(roll: RollInput, dt: f32, copts: &ControllerOptions) -> (Vec3, Vec3) {
    let impulse_strength = copts.impulse_strength * dt;
    let torque_strength = copts.torque_strength * dt;

    let mut impulse = Vec3::ZERO;
    let mut torque = Vec3::ZERO;

    if roll.forward {
        impulse.z -= impulse_strength;
        torque.x -= torque_strength;
    }
    if roll.backward {
        impulse.z += impulse_strength;
        torque.x += torque_strength;
    }
    if roll.rightward {
        impulse.x += impulse_strength;
        torque.z -= torque_strength;
    }
    if roll.leftward {
        impulse.x -= impulse_strength;
        torque.z += torque_strength;
    }

    (impulse, torque)
}

/// The jump impulse, given the distance the ground probe travelled before
/// hitting something.
pub fn jump_impulse(probe_hit: Option<f32>, copts: &ControllerOptions) -> Option<Vec3> {
    match probe_hit {
        Some(distance) if distance < copts.ground_distance => Some(Vec3::Y * copts.jump_impulse),
        _ => None,
    }
}

/// Feeds this frame's input into every controller.
pub fn apply_controller_movement(
    input: Res<PlayerInput>,
    copts: Res<ControllerOptions>,
    time: Res<Time>,
    mut controllers: Query<(&mut Controller, &mut ExternalImpulse)>,
) {
    for (mut con, mut ei) in controllers.iter_mut() {
        con.update_roll(input.roll);
        if input.jump_pressed {
            con.request_jump();
        }

        let (impulse, torque) = roll_impulse(con.roll, time.delta_seconds(), &copts);
        ei.impulse += impulse;
        ei.torque_impulse += torque;
    }
}

/// Performs queued jumps for controllers standing on something.
pub fn apply_controller_jump(
    rapier_ctx: Option<Res<RapierContext>>,
    copts: Res<ControllerOptions>,
    mut controllers: Query<(Entity, &GlobalTransform, &mut Controller, &mut ExternalImpulse)>,
) {
    let Some(rapier_ctx) = rapier_ctx else {
        return;
    };

    for (entity, transform, mut con, mut ei) in controllers.iter_mut() {
        if !std::mem::take(&mut con.jump) {
            continue;
        }

        let origin = transform.translation() - Vec3::Y * copts.probe_offset;
        let hit = rapier_ctx
            .cast_ray(
                origin,
                Vec3::NEG_Y,
                copts.probe_length,
                true,
                QueryFilter::default().exclude_rigid_body(entity),
            )
            .map(|(_, toi)| toi);

        if let Some(impulse) = jump_impulse(hit, &copts) {
            debug!("jump (ground at {:?})", hit);
            ei.impulse += impulse;
        }
    }
}
