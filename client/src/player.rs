use bevy::prelude::*;
use kula_engine::{MoveInput, PickupKind, TriggerEvent};
use leafwing_input_manager::prelude::*;

use crate::{
    input::{InputAction, move_input},
    world::{Game, LevelElement, Pickup, to_bevy},
};

#[derive(Component)]
pub struct Ball;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, spawn_ball);
    app.add_systems(Update, (step_world, sync_ball).chain());
}

fn spawn_ball(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    game: Res<Game>,
) {
    let position = match game.world.player_position() {
        Ok(p) => to_bevy(&p),
        Err(err) => {
            error!("no player body: {err}");
            return;
        }
    };

    commands.spawn((
        Ball,
        Mesh3d(meshes.add(Sphere::new(game.radius).mesh().uv(32, 18))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.95, 0.25, 0.2),
            perceptual_roughness: 0.4,
            ..default()
        })),
        Transform::from_translation(position),
    ));
}

/// Advance the engine by this frame's delta and apply what happened.
pub fn step_world(
    mut commands: Commands,
    mut game: ResMut<Game>,
    actions: Res<ActionState<InputAction>>,
    pickups: Query<(Entity, &LevelElement), With<Pickup>>,
    time: Res<Time>,
) {
    let game = &mut *game;

    if actions.just_pressed(&InputAction::Respawn) || game.world.has_fallen() {
        if let Err(err) = game.world.respawn() {
            error!("respawn failed: {err}");
            return;
        }
    }

    // The ball coasts to a stop once the goal is reached.
    let input = if game.score.complete {
        MoveInput::default()
    } else {
        move_input(&actions)
    };
    let report = match game.world.update(time.delta_secs(), &input) {
        Ok(report) => report,
        Err(err) => {
            error!("world update failed: {err}");
            return;
        }
    };

    for trigger in &report.triggers {
        let TriggerEvent::Entered { element, .. } = *trigger else {
            continue;
        };
        if game.world.pickup_kind(element) == Some(PickupKind::Goal) && !game.score.goal_open() {
            info!(
                "goal locked: {}/{} keys",
                game.score.keys, game.score.keys_total
            );
            continue;
        }

        let kind = match game.world.collect_pickup(element) {
            Ok(Some(kind)) => kind,
            Ok(None) => continue,
            Err(err) => {
                error!("collecting {element} failed: {err}");
                continue;
            }
        };
        match kind {
            PickupKind::Coin => game.score.coins += 1,
            PickupKind::Key => game.score.keys += 1,
            PickupKind::Goal => {
                game.score.complete = true;
                info!(
                    "{} complete with {} coins",
                    game.level.name(),
                    game.score.coins
                );
            }
        }

        for (entity, e) in &pickups {
            if e.0 == element {
                commands.entity(entity).despawn();
            }
        }
    }
}

fn sync_ball(game: Res<Game>, mut ball: Single<&mut Transform, With<Ball>>, time: Res<Time>) {
    let world = &game.world;
    let (Ok(p), Ok(w)) = (
        world.player_position(),
        world.simulation().angvel(world.player()),
    ) else {
        return;
    };

    ball.translation = to_bevy(&p);
    ball.rotate(Quat::from_scaled_axis(to_bevy(&w) * time.delta_secs()));
}
