//! Debug tooling for native dev builds.
//!
//! This plugin is compiled/used only when the caller gates it behind `dev_native`
//! (recommended: `#[cfg(feature = "dev_native")] mod debug_tools;` in `main.rs`).

use bevy::diagnostic::{
    EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin,
};
use bevy::prelude::*;

use crate::world::{Game, to_bevy};

/// Add debug tooling (intended for `dev_native` builds only).
pub(super) fn plugin(app: &mut App) {
    app.add_plugins((
        FrameTimeDiagnosticsPlugin::default(),
        EntityCountDiagnosticsPlugin::default(),
        LogDiagnosticsPlugin::default(),
    ));

    app.add_systems(Update, draw_gravity);
}

/// Gravity as a red arrow from the ball; the probed contact normal in green.
fn draw_gravity(game: Res<Game>, mut gizmos: Gizmos) {
    let world = &game.world;
    let Ok(center) = world.player_position() else {
        return;
    };
    let center = to_bevy(&center);
    let down = to_bevy(&world.gravity().vector()).normalize_or_zero();
    gizmos.arrow(center, center + down * 1.5, Color::srgb(1.0, 0.2, 0.2));

    let contact = world.contact();
    if contact.has_contact {
        let foot = center + down * contact.distance;
        gizmos.arrow(foot, foot + to_bevy(&contact.normal), Color::srgb(0.2, 1.0, 0.2));
    }
}
