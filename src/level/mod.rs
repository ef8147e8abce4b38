//! Level generation and the level's physical presence.
//!
//! A level is a straight runway laid out along −Z: a start platform at the
//! origin, `count` obstacle segments spaced one `unit` apart, and an end
//! platform. Walls on both sides and at the far end keep the player on it.
//!
//! [`Level`] is plain data. [`rebuild_level`] turns it into entities every time
//! the run (re-)enters [`Phase::Ready`](crate::run::Phase::Ready).

pub mod obstacle;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::run::PhaseChanged;
use crate::GameSet;

pub use obstacle::{animate_obstacles, Archetype, Obstacle, ObstacleMotion};

/// Plugin for this module.
pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LevelConfig>()
            .add_systems(Startup, (load_level_assets, spawn_lights))
            .add_systems(
                Update,
                (
                    animate_obstacles.in_set(GameSet::Movement),
                    rebuild_level.in_set(GameSet::Lifecycle),
                ),
            );
    }
}

/// Errors from building a level.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("a level needs at least one obstacle archetype")]
    NoArchetypes,
    #[error("segment unit must be positive and finite")]
    InvalidUnit,
}

/// What the generator is asked to build.
///
/// Always valid once constructed. Edits at runtime restart the run.
#[derive(Clone, Debug, PartialEq, Resource, Serialize, Deserialize)]
#[serde(try_from = "RawLevelConfig", into = "RawLevelConfig")]
pub struct LevelConfig {
    segment_count: usize,
    archetypes: Vec<Archetype>,
    unit: f32,
}

impl LevelConfig {
    /// Validates a configuration; there must be at least one archetype and a
    /// positive, finite unit.
    pub fn new(
        segment_count: usize,
        archetypes: Vec<Archetype>,
        unit: f32,
    ) -> Result<LevelConfig, LevelError> {
        if archetypes.is_empty() {
            return Err(LevelError::NoArchetypes);
        }
        if !(unit.is_finite() && unit > 0.0) {
            return Err(LevelError::InvalidUnit);
        }

        Ok(LevelConfig {
            segment_count,
            archetypes,
            unit,
        })
    }

    /// Number of obstacle segments between the start and end tiles.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Changes the number of obstacle segments. Any count is valid, including
    /// zero. Done through `ResMut`, this restarts the run.
    pub fn set_segment_count(&mut self, segment_count: usize) {
        self.segment_count = segment_count;
    }

    /// The archetypes obstacles are drawn from, uniformly. Never empty.
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Length of one segment along the runway.
    pub fn unit(&self) -> f32 {
        self.unit
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        LevelConfig {
            segment_count: 10,
            archetypes: Archetype::ALL.to_vec(),
            unit: 4.0,
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(default)]
struct RawLevelConfig {
    segment_count: usize,
    archetypes: Vec<Archetype>,
    unit: f32,
}

impl Default for RawLevelConfig {
    fn default() -> Self {
        LevelConfig::default().into()
    }
}

impl TryFrom<RawLevelConfig> for LevelConfig {
    type Error = LevelError;

    fn try_from(raw: RawLevelConfig) -> Result<Self, Self::Error> {
        LevelConfig::new(raw.segment_count, raw.archetypes, raw.unit)
    }
}

impl From<LevelConfig> for RawLevelConfig {
    fn from(config: LevelConfig) -> Self {
        RawLevelConfig {
            segment_count: config.segment_count,
            archetypes: config.archetypes,
            unit: config.unit,
        }
    }
}

/// What sits on a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentKind {
    Start,
    Obstacle(Obstacle),
    End,
}

/// One floor tile of the runway.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Position along Z. Always `0` or negative.
    pub offset: f32,
    pub kind: SegmentKind,
}

impl Segment {
    /// Center of the tile's top surface.
    pub fn anchor(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.offset)
    }

    pub fn obstacle(&self) -> Option<&Obstacle> {
        match &self.kind {
            SegmentKind::Obstacle(obstacle) => Some(obstacle),
            _ => None,
        }
    }
}

/// Walls and floor collider, sized to the generated length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boundary {
    /// Number of tiles spanned, start and end included.
    pub length: usize,
    /// Z of the center of the side walls and the floor collider.
    pub center_z: f32,
    /// Full Z extent of the side walls and the floor collider.
    pub extent_z: f32,
    /// Z of the back wall.
    pub back_z: f32,
    /// Half width of the runway; side walls sit just outside it.
    pub half_width: f32,
}

impl Boundary {
    pub const WALL_THICKNESS: f32 = 0.3;
    pub const WALL_HEIGHT: f32 = 1.5;
    pub const FLOOR_THICKNESS: f32 = 0.2;

    fn new(length: usize, unit: f32) -> Boundary {
        let span = length as f32 * unit;

        Boundary {
            length,
            center_z: -span / 2.0 + unit / 2.0,
            extent_z: span,
            back_z: -span + unit / 2.0,
            half_width: unit / 2.0,
        }
    }

    /// X of the right side wall; the left one is mirrored.
    pub fn side_wall_x(&self) -> f32 {
        self.half_width + Self::WALL_THICKNESS / 2.0
    }
}

/// A generated level.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    seed: u64,
    unit: f32,
    segments: Vec<Segment>,
    boundary: Boundary,
}

impl Level {
    /// Generates a level of `count` obstacle segments, each drawn uniformly
    /// from `archetypes`.
    ///
    /// Spacing depends only on `count` and `unit`. The archetypes and each
    /// obstacle's constants depend only on `seed`.
    pub fn generate(
        count: usize,
        archetypes: &[Archetype],
        unit: f32,
        seed: u64,
    ) -> Result<Level, LevelError> {
        if archetypes.is_empty() {
            return Err(LevelError::NoArchetypes);
        }
        if !(unit.is_finite() && unit > 0.0) {
            return Err(LevelError::InvalidUnit);
        }

        Ok(Level::build(count, archetypes, unit, seed))
    }

    /// Generates a level from an already validated `config`.
    pub fn from_config(config: &LevelConfig, seed: u64) -> Level {
        Level::build(config.segment_count, &config.archetypes, config.unit, seed)
    }

    fn build(count: usize, archetypes: &[Archetype], unit: f32, seed: u64) -> Level {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut segments = Vec::with_capacity(count + 2);

        segments.push(Segment {
            offset: 0.0,
            kind: SegmentKind::Start,
        });
        for i in 0..count {
            let archetype = archetypes[rng.random_range(0..archetypes.len())];
            segments.push(Segment {
                offset: -((i + 1) as f32) * unit,
                kind: SegmentKind::Obstacle(Obstacle::random(archetype, &mut rng)),
            });
        }
        segments.push(Segment {
            offset: -((count + 1) as f32) * unit,
            kind: SegmentKind::End,
        });

        Level {
            seed,
            unit,
            segments,
            boundary: Boundary::new(count + 2, unit),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn unit(&self) -> f32 {
        self.unit
    }

    /// All segments, start and end included, from near to far.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn obstacles(&self) -> impl Iterator<Item = (&Segment, &Obstacle)> {
        self.segments
            .iter()
            .filter_map(|segment| segment.obstacle().map(|o| (segment, o)))
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }
}

/// Marks every entity that belongs to the current level.
#[derive(Clone, Copy, Component, Debug, Default)]
pub struct LevelEntity;

/// Meshes and materials shared by every level.
#[derive(Resource)]
pub struct LevelAssets {
    floor: Handle<Mesh>,
    bar: Handle<Mesh>,
    axe: Handle<Mesh>,
    start_floor: Handle<StandardMaterial>,
    obstacle_floor: Handle<StandardMaterial>,
    obstacle: Handle<StandardMaterial>,
    wall: Handle<StandardMaterial>,
    goal: Handle<StandardMaterial>,
}

/// Creates the shared [`LevelAssets`]. Runs once at startup.
pub fn load_level_assets(
    mut commands: Commands,
    config: Res<LevelConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let unit = config.unit();
    let bar = Archetype::Spinner.size();
    let axe = Archetype::Axe.size();

    commands.insert_resource(LevelAssets {
        floor: meshes.add(Cuboid::new(unit, Boundary::FLOOR_THICKNESS, unit)),
        bar: meshes.add(Cuboid::new(bar.x, bar.y, bar.z)),
        axe: meshes.add(Cuboid::new(axe.x, axe.y, axe.z)),
        start_floor: materials.add(Color::rgb(0.2, 0.8, 0.2)),
        obstacle_floor: materials.add(Color::rgb(0.68, 1.0, 0.18)),
        obstacle: materials.add(Color::rgb(1.0, 0.27, 0.0)),
        wall: materials.add(Color::rgb(0.44, 0.5, 0.56)),
        goal: materials.add(Color::rgb(1.0, 0.84, 0.0)),
    });
}

fn spawn_lights(mut commands: Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
    });

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 4500.0,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(4.0, 4.0, 1.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });
}

/// Replaces the current level with a freshly generated one whenever the run
/// enters [`Phase::Ready`](crate::run::Phase::Ready).
pub fn rebuild_level(
    mut commands: Commands,
    mut changes: EventReader<PhaseChanged>,
    config: Res<LevelConfig>,
    assets: Option<Res<LevelAssets>>,
    mut meshes: ResMut<Assets<Mesh>>,
    existing: Query<Entity, With<LevelEntity>>,
) {
    // several resets in one frame still produce a single level
    if changes.read().filter(|change| change.is_reset()).count() == 0 {
        return;
    }
    let Some(assets) = assets else {
        warn!("level assets not loaded, skipping rebuild");
        return;
    };

    for entity in existing.iter() {
        commands.entity(entity).despawn_recursive();
    }

    let level = Level::from_config(&config, rand::rng().random());
    info!(
        "generated level with {} segments (seed {:#018x})",
        level.segments().len() - 2,
        level.seed()
    );

    spawn_level(&mut commands, &level, &assets, &mut meshes);
}

fn spawn_level(
    commands: &mut Commands,
    level: &Level,
    assets: &LevelAssets,
    meshes: &mut Assets<Mesh>,
) {
    for segment in level.segments() {
        let floor_material = match segment.kind {
            SegmentKind::Obstacle(_) => assets.obstacle_floor.clone(),
            SegmentKind::Start | SegmentKind::End => assets.start_floor.clone(),
        };

        commands.spawn((
            PbrBundle {
                mesh: assets.floor.clone(),
                material: floor_material,
                transform: Transform::from_translation(
                    segment.anchor() - Vec3::Y * Boundary::FLOOR_THICKNESS / 2.0,
                ),
                ..default()
            },
            LevelEntity,
        ));

        match segment.kind {
            SegmentKind::Obstacle(obstacle) => {
                let size = obstacle.archetype.size();
                let mesh = match obstacle.archetype {
                    Archetype::Axe => assets.axe.clone(),
                    Archetype::Spinner | Archetype::Limbo => assets.bar.clone(),
                };

                commands.spawn((
                    PbrBundle {
                        mesh,
                        material: assets.obstacle.clone(),
                        transform: obstacle.pose(0.0, segment.anchor()),
                        ..default()
                    },
                    RigidBody::KinematicPositionBased,
                    Collider::cuboid(size.x / 2.0, size.y / 2.0, size.z / 2.0),
                    Restitution::coefficient(0.2),
                    Friction::coefficient(0.0),
                    ObstacleMotion {
                        obstacle,
                        anchor: segment.anchor(),
                    },
                    LevelEntity,
                ));
            }
            SegmentKind::End => {
                commands.spawn((
                    PbrBundle {
                        mesh: meshes.add(Cuboid::new(0.6, 0.5, 0.6)),
                        material: assets.goal.clone(),
                        transform: Transform::from_translation(segment.anchor() + Vec3::Y * 0.25),
                        ..default()
                    },
                    RigidBody::Fixed,
                    Collider::cuboid(0.3, 0.25, 0.3),
                    Restitution::coefficient(0.2),
                    Friction::coefficient(0.0),
                    LevelEntity,
                ));
            }
            SegmentKind::Start => (),
        }
    }

    spawn_boundary(commands, level.boundary(), assets, meshes);
}

fn spawn_boundary(
    commands: &mut Commands,
    boundary: &Boundary,
    assets: &LevelAssets,
    meshes: &mut Assets<Mesh>,
) {
    let wall_y = Boundary::WALL_HEIGHT / 2.0;
    let side = Vec3::new(Boundary::WALL_THICKNESS, Boundary::WALL_HEIGHT, boundary.extent_z);
    let back = Vec3::new(
        boundary.half_width * 2.0,
        Boundary::WALL_HEIGHT,
        Boundary::WALL_THICKNESS,
    );
    let side_mesh = meshes.add(Cuboid::new(side.x, side.y, side.z));

    let walls = [
        (
            side_mesh.clone(),
            side,
            Vec3::new(boundary.side_wall_x(), wall_y, boundary.center_z),
        ),
        (
            side_mesh,
            side,
            Vec3::new(-boundary.side_wall_x(), wall_y, boundary.center_z),
        ),
        (
            meshes.add(Cuboid::new(back.x, back.y, back.z)),
            back,
            Vec3::new(0.0, wall_y, boundary.back_z),
        ),
    ];

    for (mesh, size, position) in walls {
        commands.spawn((
            PbrBundle {
                mesh,
                material: assets.wall.clone(),
                transform: Transform::from_translation(position),
                ..default()
            },
            RigidBody::Fixed,
            Collider::cuboid(size.x / 2.0, size.y / 2.0, size.z / 2.0),
            Restitution::coefficient(0.2),
            Friction::coefficient(0.0),
            LevelEntity,
        ));
    }

    // one collider for the whole runway so the ball never catches a tile seam
    commands.spawn((
        TransformBundle::from_transform(Transform::from_xyz(
            0.0,
            -Boundary::FLOOR_THICKNESS / 2.0,
            boundary.center_z,
        )),
        RigidBody::Fixed,
        Collider::cuboid(
            boundary.half_width,
            Boundary::FLOOR_THICKNESS / 2.0,
            boundary.extent_z / 2.0,
        ),
        Restitution::coefficient(0.2),
        Friction::coefficient(1.0),
        LevelEntity,
    ));
}
