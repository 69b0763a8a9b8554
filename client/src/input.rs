use bevy::prelude::*;
use kula_engine::MoveInput;
use leafwing_input_manager::prelude::*;

#[derive(Reflect, Actionlike, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputAction {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Respawn,
}

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(InputManagerPlugin::<InputAction>::default());

    app.register_type::<InputAction>();

    let mut input_map = InputMap::<InputAction>::default();
    input_map.insert(InputAction::Forward, KeyCode::KeyW);
    input_map.insert(InputAction::Forward, KeyCode::ArrowUp);
    input_map.insert(InputAction::Backward, KeyCode::KeyS);
    input_map.insert(InputAction::Backward, KeyCode::ArrowDown);
    input_map.insert(InputAction::Left, KeyCode::KeyA);
    input_map.insert(InputAction::Left, KeyCode::ArrowLeft);
    input_map.insert(InputAction::Right, KeyCode::KeyD);
    input_map.insert(InputAction::Right, KeyCode::ArrowRight);
    input_map.insert(InputAction::Jump, KeyCode::Space);
    input_map.insert(InputAction::Respawn, KeyCode::KeyR);
    app.insert_resource(input_map);
    app.insert_resource(ActionState::<InputAction>::default());
}

/// Held movement keys as engine input. Jump is level-triggered; the engine finds the edge.
pub fn move_input(actions: &ActionState<InputAction>) -> MoveInput {
    MoveInput {
        forward: actions.pressed(&InputAction::Forward),
        backward: actions.pressed(&InputAction::Backward),
        left: actions.pressed(&InputAction::Left),
        right: actions.pressed(&InputAction::Right),
        jump: actions.pressed(&InputAction::Jump),
    }
}
