//! Drives the run lifecycle through the real systems, frame by frame.

use std::time::Duration;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use obstacle_run::input::{PlayerInput, RollInput};
use obstacle_run::level::{
    load_level_assets, rebuild_level, Archetype, LevelConfig, LevelEntity, ObstacleMotion,
};
use obstacle_run::physics::controller::{apply_controller_movement, Controller, ControllerOptions};
use obstacle_run::player::{check_run_bounds, reset_player, start_on_input, LocalPlayer};
use obstacle_run::run::{begin_session, in_phase, Phase, PhaseChanged, RunState};
use obstacle_run::GameSet;

struct Harness {
    world: World,
    frame: Schedule,
    player: Entity,
}

impl Harness {
    fn new() -> Harness {
        let mut world = World::new();
        world.insert_resource(Time::<()>::default());
        world.init_resource::<PlayerInput>();
        world.init_resource::<ControllerOptions>();
        world.init_resource::<RunState>();
        world.init_resource::<Events<PhaseChanged>>();
        world.insert_resource(LevelConfig::new(3, vec![Archetype::Spinner], 4.0).unwrap());
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();

        let player = world
            .spawn((
                Transform::from_xyz(0.0, 1.0, 0.0),
                Velocity::zero(),
                ExternalImpulse::default(),
                Controller::default(),
                LocalPlayer,
            ))
            .id();

        let mut startup = Schedule::default();
        startup.add_systems((load_level_assets, begin_session));
        startup.run(&mut world);

        let mut frame = Schedule::default();
        frame
            .configure_sets(
                (
                    GameSet::Input,
                    GameSet::Movement,
                    GameSet::Outcome,
                    GameSet::Lifecycle,
                )
                    .chain(),
            )
            .add_systems((
                start_on_input.in_set(GameSet::Input),
                apply_controller_movement.in_set(GameSet::Movement),
                check_run_bounds
                    .run_if(in_phase(Phase::Playing))
                    .in_set(GameSet::Outcome),
                (rebuild_level, reset_player).in_set(GameSet::Lifecycle),
            ));

        let mut harness = Harness {
            world,
            frame,
            player,
        };
        // the first frame builds the level and places the player
        harness.tick(PlayerInput::default());
        harness
    }

    fn tick(&mut self, input: PlayerInput) {
        self.world
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(16));
        self.world.insert_resource(input);
        self.frame.run(&mut self.world);
    }

    fn move_player(&mut self, to: Vec3) {
        self.world.get_mut::<Transform>(self.player).unwrap().translation = to;
        self.world.get_mut::<Velocity>(self.player).unwrap().linvel = Vec3::new(0.0, -9.0, -3.0);
    }

    fn phase(&self) -> Phase {
        self.world.resource::<RunState>().phase()
    }

    fn translation(&self) -> Vec3 {
        self.world.get::<Transform>(self.player).unwrap().translation
    }

    fn level_entities(&mut self) -> Vec<Entity> {
        let mut query = self.world.query_filtered::<Entity, With<LevelEntity>>();
        query.iter(&self.world).collect()
    }

    fn obstacle_count(&mut self) -> usize {
        self.world.query::<&ObstacleMotion>().iter(&self.world).count()
    }
}

fn press_forward() -> PlayerInput {
    PlayerInput {
        roll: RollInput {
            forward: true,
            ..default()
        },
        direction_pressed: true,
        ..default()
    }
}

/// Floor tiles, obstacles, the goal, three walls and the runway collider for
/// a 3 segment level.
const LEVEL_ENTITIES: usize = 5 + 3 + 1 + 3 + 1;

#[test]
fn session_begins_ready() {
    let mut harness = Harness::new();

    let run = harness.world.resource::<RunState>();
    assert_eq!(run.phase(), Phase::Ready);
    assert_eq!(run.segment_count(), 3);
    assert_eq!(run.attempts(), 1);

    assert_eq!(harness.level_entities().len(), LEVEL_ENTITIES);
    assert_eq!(harness.obstacle_count(), 3);
}

#[test]
fn first_press_starts_and_rolls() {
    let mut harness = Harness::new();

    harness.tick(press_forward());

    let run = harness.world.resource::<RunState>();
    assert_eq!(run.phase(), Phase::Playing);
    assert_eq!(run.start_time(), Some(Duration::from_millis(32)));

    let impulse = harness.world.get::<ExternalImpulse>(harness.player).unwrap();
    assert!(impulse.impulse.z < 0.0);
}

#[test]
fn falling_restarts_at_spawn() {
    let mut harness = Harness::new();
    harness.tick(press_forward());
    let old_level = harness.level_entities();
    assert_eq!(old_level.len(), LEVEL_ENTITIES);

    harness.move_player(Vec3::new(0.4, -5.0, -7.0));
    harness.tick(PlayerInput::default());

    assert_eq!(harness.phase(), Phase::Ready);
    assert_eq!(harness.translation(), Vec3::new(0.0, 1.0, 0.0));
    let velocity = harness.world.get::<Velocity>(harness.player).unwrap();
    assert_eq!(velocity.linvel, Vec3::ZERO);
    assert_eq!(velocity.angvel, Vec3::ZERO);
    assert_eq!(harness.world.resource::<RunState>().attempts(), 2);

    // the same frame swapped in a fresh level of the same shape
    for entity in old_level {
        assert!(harness.world.get_entity(entity).is_none());
    }
    assert_eq!(harness.level_entities().len(), LEVEL_ENTITIES);
    assert_eq!(harness.obstacle_count(), 3);
}

#[test]
fn falling_before_start_is_ignored() {
    let mut harness = Harness::new();

    harness.move_player(Vec3::new(0.0, -5.0, 0.0));
    harness.tick(PlayerInput::default());

    assert_eq!(harness.phase(), Phase::Ready);
    assert_eq!(harness.translation(), Vec3::new(0.0, -5.0, 0.0));
}

#[test]
fn crossing_the_goal_ends_and_freezes() {
    let mut harness = Harness::new();
    harness.tick(press_forward());

    // 3 segments of 4 units plus a margin of 2
    harness.move_player(Vec3::new(0.0, 0.3, -14.5));
    harness.tick(PlayerInput::default());

    assert_eq!(harness.phase(), Phase::Ended);
    let run = harness.world.resource::<RunState>();
    assert!(run.end_time() >= run.start_time());
    let frozen = run.elapsed(Duration::from_secs(100));

    // pressing a direction after the finish does not start a new run
    harness.tick(press_forward());
    harness.tick(press_forward());

    let run = harness.world.resource::<RunState>();
    assert_eq!(run.phase(), Phase::Ended);
    assert_eq!(run.elapsed(Duration::from_secs(200)), frozen);
    assert_eq!(harness.level_entities().len(), LEVEL_ENTITIES);
}
