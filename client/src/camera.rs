use bevy::{camera::Exposure, prelude::*};

use crate::{
    player::step_world,
    world::{Game, to_bevy},
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, add_camera);
    app.add_systems(Update, follow_ball.after(step_world));
}

fn add_camera(mut commands: Commands, game: Res<Game>) {
    let transform = game
        .world
        .camera_pose()
        .map(|pose| {
            Transform::from_translation(to_bevy(&pose.position))
                .looking_at(to_bevy(&pose.look_at), to_bevy(&pose.up))
        })
        .unwrap_or_default();

    commands.spawn((
        Exposure { ev100: 12.0 },
        bevy::core_pipeline::tonemapping::Tonemapping::AcesFitted,
        Camera3d::default(),
        transform,
        DistanceFog {
            color: Color::srgba(0.35, 0.48, 0.66, 1.0),
            directional_light_color: Color::srgba(1.0, 0.95, 0.85, 0.5),
            directional_light_exponent: 30.0,
            falloff: FogFalloff::from_visibility_colors(
                120.0, // Fog distance
                Color::srgb(0.35, 0.5, 0.66),
                Color::srgb(0.8, 0.8, 0.7),
            ),
        },
    ));
}

/// Place the camera where the engine's orientation controller says, with its up as the
/// view up so the horizon rolls with gravity.
fn follow_ball(game: Res<Game>, mut camera: Single<&mut Transform, With<Camera3d>>) {
    let Some(pose) = game.world.camera_pose() else {
        return;
    };
    **camera = Transform::from_translation(to_bevy(&pose.position))
        .looking_at(to_bevy(&pose.look_at), to_bevy(&pose.up));
}
