//! Timer, restart prompt and key indicators.

use std::time::Duration;

use bevy::prelude::*;

use crate::input::{Keybinds, PlayerInput, RollInput};
use crate::level::LevelConfig;
use crate::run::{Phase, PhaseChanged, RunState};
use crate::GameSet;

/// Plugin for this module.
pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_hud).add_systems(
            Update,
            (
                restart_from_hud.in_set(GameSet::Outcome),
                (update_timer, update_restart_prompt, update_key_indicators)
                    .after(GameSet::Lifecycle),
            ),
        );
    }
}

/// The text node showing the run time, refreshed every frame.
#[derive(Clone, Copy, Component, Debug, Default)]
pub struct TimerText;

/// The "Restart" button. Visible only once the run has ended; clicking it
/// restarts like the restart key does.
#[derive(Clone, Copy, Component, Debug, Default)]
pub struct RestartPrompt;

/// The control a key indicator lights up for.
#[derive(Clone, Copy, Component, Debug, PartialEq, Eq)]
pub enum KeyIndicator {
    Forward,
    Backward,
    Leftward,
    Rightward,
    Jump,
}

impl KeyIndicator {
    fn is_held(self, roll: RollInput, jump: bool) -> bool {
        match self {
            KeyIndicator::Forward => roll.forward,
            KeyIndicator::Backward => roll.backward,
            KeyIndicator::Leftward => roll.leftward,
            KeyIndicator::Rightward => roll.rightward,
            KeyIndicator::Jump => jump,
        }
    }
}

const KEY_IDLE: Color = Color::rgba(1.0, 1.0, 1.0, 0.25);
const KEY_ACTIVE: Color = Color::rgba(1.0, 1.0, 1.0, 0.99);

/// Formats a run time the way the timer shows it.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2}", elapsed.as_secs_f64())
}

fn spawn_hud(mut commands: Commands) {
    let text_style = |font_size: f32| TextStyle {
        font_size,
        color: Color::WHITE,
        ..default()
    };
    let key = |width: f32, indicator: KeyIndicator| {
        (
            NodeBundle {
                style: Style {
                    width: Val::Px(width),
                    height: Val::Px(40.0),
                    margin: UiRect::all(Val::Px(4.0)),
                    ..default()
                },
                background_color: KEY_IDLE.into(),
                ..default()
            },
            indicator,
        )
    };
    let row = || NodeBundle {
        style: Style {
            justify_content: JustifyContent::Center,
            ..default()
        },
        ..default()
    };

    commands
        .spawn(NodeBundle {
            style: Style {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::SpaceBetween,
                align_items: AlignItems::Center,
                padding: UiRect::all(Val::Px(16.0)),
                ..default()
            },
            ..default()
        })
        .with_children(|root| {
            root.spawn((
                TextBundle::from_section(format_elapsed(Duration::ZERO), text_style(48.0)),
                TimerText,
            ));

            root.spawn((
                ButtonBundle {
                    style: Style {
                        padding: UiRect::axes(Val::Px(24.0), Val::Px(8.0)),
                        ..default()
                    },
                    background_color: Color::rgba(0.0, 0.0, 0.0, 0.25).into(),
                    visibility: Visibility::Hidden,
                    ..default()
                },
                RestartPrompt,
            ))
            .with_children(|button| {
                button.spawn(TextBundle::from_section("Restart", text_style(64.0)));
            });

            root.spawn(NodeBundle {
                style: Style {
                    flex_direction: FlexDirection::Column,
                    ..default()
                },
                ..default()
            })
            .with_children(|controls| {
                controls.spawn(row()).with_children(|keys| {
                    keys.spawn(key(40.0, KeyIndicator::Forward));
                });
                controls.spawn(row()).with_children(|keys| {
                    keys.spawn(key(40.0, KeyIndicator::Leftward));
                    keys.spawn(key(40.0, KeyIndicator::Backward));
                    keys.spawn(key(40.0, KeyIndicator::Rightward));
                });
                controls.spawn(row()).with_children(|keys| {
                    keys.spawn(key(144.0, KeyIndicator::Jump));
                });
            });
        });
}

/// Restarts a finished run from the restart key or the prompt.
pub fn restart_from_hud(
    input: Res<PlayerInput>,
    prompt: Query<&Interaction, (Changed<Interaction>, With<RestartPrompt>)>,
    config: Res<LevelConfig>,
    mut run: ResMut<RunState>,
    mut changes: EventWriter<PhaseChanged>,
) {
    if run.phase() != Phase::Ended {
        return;
    }

    let clicked = prompt
        .iter()
        .any(|interaction| *interaction == Interaction::Pressed);
    if !(input.restart_pressed || clicked) {
        return;
    }

    if let Some(change) = run.restart(config.segment_count()) {
        changes.send(change);
    }
}

fn update_timer(
    run: Res<RunState>,
    time: Res<Time>,
    mut timers: Query<&mut Text, With<TimerText>>,
) {
    let elapsed = format_elapsed(run.elapsed(time.elapsed()));

    for mut text in timers.iter_mut() {
        text.sections[0].value.clone_from(&elapsed);
    }
}

fn update_restart_prompt(
    run: Res<RunState>,
    mut prompts: Query<&mut Visibility, With<RestartPrompt>>,
) {
    if !run.is_changed() {
        return;
    }

    let visibility = match run.phase() {
        Phase::Ended => Visibility::Inherited,
        Phase::Ready | Phase::Playing => Visibility::Hidden,
    };
    for mut prompt in prompts.iter_mut() {
        *prompt = visibility;
    }
}

fn update_key_indicators(
    input: Res<PlayerInput>,
    keys: Option<Res<ButtonInput<KeyCode>>>,
    binds: Res<Keybinds>,
    mut indicators: Query<(&KeyIndicator, &mut BackgroundColor)>,
) {
    let jump = keys.is_some_and(|keys| keys.any_pressed(binds.jump.iter().copied()));

    for (indicator, mut color) in indicators.iter_mut() {
        color.0 = if indicator.is_held(input.roll, jump) {
            KEY_ACTIVE
        } else {
            KEY_IDLE
        };
    }
}
