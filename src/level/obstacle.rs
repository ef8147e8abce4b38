//! Obstacle archetypes and their motion.
//!
//! Every obstacle is a kinematic body whose pose is a closed-form function of
//! elapsed time. Nothing is integrated frame to frame, so the motion does not
//! drift with the frame rate and restarting a level needs no extra state.

use std::f32::consts::TAU;

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Height of the spinner and limbo bars above their segment.
const BAR_HEIGHT: f32 = 0.3;
/// Resting height of the limbo bar; it bobs one unit either side of this.
const LIMBO_CENTER: f32 = 1.15;
/// Height of the axe's center above its segment.
const AXE_HEIGHT: f32 = 0.76;
/// How far the axe swings to either side.
const AXE_REACH: f32 = 1.25;

/// The fixed motion patterns an obstacle can follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// A bar spinning about the vertical axis.
    Spinner,
    /// A bar bobbing up and down.
    Limbo,
    /// A block swinging side to side.
    Axe,
}

impl Archetype {
    pub const ALL: [Archetype; 3] = [Archetype::Spinner, Archetype::Limbo, Archetype::Axe];

    /// Full size of this archetype's collider.
    pub fn size(self) -> Vec3 {
        match self {
            Archetype::Spinner | Archetype::Limbo => Vec3::new(3.5, 0.3, 0.3),
            Archetype::Axe => Vec3::new(1.5, 1.5, 0.3),
        }
    }
}

/// One obstacle's constants, drawn once when the level is generated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub archetype: Archetype,
    /// Phase offset in `[0, 2π)`.
    pub phase_offset: f32,
    /// Angular speed; the magnitude is in `[0.2, 1.2)` and the sign is random.
    pub speed: f32,
}

impl Obstacle {
    /// Draws a new obstacle of `archetype`.
    pub fn random(archetype: Archetype, rng: &mut impl Rng) -> Obstacle {
        let phase_offset = rng.random_range(0.0..TAU);
        let magnitude = rng.random::<f32>() + 0.2;
        let sign = if rng.random_bool(0.5) { -1.0 } else { 1.0 };

        Obstacle {
            archetype,
            phase_offset,
            speed: magnitude * sign,
        }
    }

    /// The pose of the obstacle `t` seconds in, for a segment at `anchor`.
    pub fn pose(&self, t: f32, anchor: Vec3) -> Transform {
        match self.archetype {
            Archetype::Spinner => Transform::from_translation(anchor + Vec3::Y * BAR_HEIGHT)
                .with_rotation(Quat::from_rotation_y(t * self.speed)),
            Archetype::Limbo => Transform::from_xyz(
                anchor.x,
                (t + self.phase_offset).sin() + LIMBO_CENTER,
                anchor.z,
            ),
            Archetype::Axe => Transform::from_xyz(
                anchor.x + (t + self.phase_offset).sin() * AXE_REACH,
                anchor.y + AXE_HEIGHT,
                anchor.z,
            ),
        }
    }
}

/// Drives a kinematic body along an [`Obstacle`]'s motion.
#[derive(Clone, Copy, Component, Debug)]
pub struct ObstacleMotion {
    pub obstacle: Obstacle,
    /// Position of the segment the obstacle belongs to.
    pub anchor: Vec3,
}

/// Writes every obstacle's pose for this frame.
pub fn animate_obstacles(time: Res<Time>, mut obstacles: Query<(&ObstacleMotion, &mut Transform)>) {
    let t = time.elapsed_seconds();

    for (motion, mut transform) in obstacles.iter_mut() {
        *transform = motion.obstacle.pose(t, motion.anchor);
    }
}
