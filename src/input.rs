//! Keyboard sampling.
//!
//! Everything downstream reads [`PlayerInput`] instead of the keyboard, so the
//! controller can be driven by anything that fills it in.

use bevy::prelude::*;

use crate::GameSet;

/// Plugin for this module.
pub struct ControlsPlugin;

impl Plugin for ControlsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Keybinds>()
            .init_resource::<PlayerInput>()
            .add_systems(Update, read_player_input.in_set(GameSet::Input));
    }
}

/// Which keys drive which control.
#[derive(Clone, Debug, Resource)]
pub struct Keybinds {
    pub forward: Vec<KeyCode>,
    pub backward: Vec<KeyCode>,
    pub leftward: Vec<KeyCode>,
    pub rightward: Vec<KeyCode>,
    pub jump: Vec<KeyCode>,
    pub restart: Vec<KeyCode>,
}

impl Default for Keybinds {
    fn default() -> Self {
        Keybinds {
            forward: vec![KeyCode::KeyW, KeyCode::ArrowUp],
            backward: vec![KeyCode::KeyS, KeyCode::ArrowDown],
            leftward: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            rightward: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            jump: vec![KeyCode::Space],
            restart: vec![KeyCode::KeyR],
        }
    }
}

/// The directions held this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollInput {
    pub forward: bool,
    pub backward: bool,
    pub leftward: bool,
    pub rightward: bool,
}

impl RollInput {
    pub fn any(&self) -> bool {
        self.forward || self.backward || self.leftward || self.rightward
    }
}

/// This frame's controls: held directions plus the edges pressed this frame.
#[derive(Clone, Copy, Debug, Default, Resource)]
pub struct PlayerInput {
    pub roll: RollInput,
    /// Jump went down this frame.
    pub jump_pressed: bool,
    /// Any direction went down this frame.
    pub direction_pressed: bool,
    /// Restart went down this frame.
    pub restart_pressed: bool,
}

/// Samples the keyboard into [`PlayerInput`].
pub fn read_player_input(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    binds: Res<Keybinds>,
    mut input: ResMut<PlayerInput>,
) {
    let Some(keys) = keys else {
        return;
    };

    let held = |codes: &[KeyCode]| keys.any_pressed(codes.iter().copied());
    let pressed = |codes: &[KeyCode]| keys.any_just_pressed(codes.iter().copied());

    *input = PlayerInput {
        roll: RollInput {
            forward: held(&binds.forward),
            backward: held(&binds.backward),
            leftward: held(&binds.leftward),
            rightward: held(&binds.rightward),
        },
        jump_pressed: pressed(&binds.jump),
        direction_pressed: pressed(&binds.forward)
            || pressed(&binds.backward)
            || pressed(&binds.leftward)
            || pressed(&binds.rightward),
        restart_pressed: pressed(&binds.restart),
    };
}
