//! The bubble shooter gameplay.
//!
//! The simulation is message-driven and runs on the fixed tick: the launcher
//! fires, the projectile flies and attaches, the attachment resolves into
//! matches or power effects, the drop counter ticks, and the aftermath
//! checks decide whether the run continues. Each stage lives in its own
//! module with its own plugin.

mod bubble;
mod cluster;
mod debug;
mod descent;
mod grid;
mod hex;
mod highscore;
mod hud;
mod polish;
pub mod powerups;
mod projectile;
mod save;
mod shooter;
pub mod state;

use bevy::prelude::*;

use crate::{PausableSystems, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        tint_backdrop.run_if(in_state(Screen::Gameplay)),
    );

    // The resolution pipeline runs in this order within a tick so that a
    // shot's consequences are fully applied before the next one can fire.
    app.configure_sets(
        FixedUpdate,
        (
            GameSet::Flight,
            GameSet::Resolve,
            GameSet::Pressure,
            GameSet::Aftermath,
        )
            .chain()
            .in_set(PausableSystems),
    );

    app.add_plugins((
        hex_types_plugin,
        grid::plugin,
        bubble::plugin,
        shooter::plugin,
        projectile::plugin,
        cluster::plugin,
        descent::plugin,
        powerups::plugin,
        state::plugin,
        save::plugin,
        highscore::plugin,
        hud::plugin,
        polish::plugin,
        debug::plugin,
    ));
}

/// Stages of the per-tick simulation pipeline.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameSet {
    /// Projectile spawn and flight.
    Flight,
    /// Attachment resolution: power effects, matches, floating sweeps.
    Resolve,
    /// Drop counter and ceiling advance.
    Pressure,
    /// Scoring and game-over checks.
    Aftermath,
}

fn hex_types_plugin(app: &mut App) {
    app.register_type::<hex::GridPos>();
}

/// Marker for the playfield backdrop quad.
#[derive(Component)]
struct FieldBackdrop;

/// Spawn the playfield backdrop.
/// Called from `screens/gameplay.rs` on `OnEnter(Screen::Gameplay)`.
pub fn spawn_game(mut commands: Commands) {
    commands.spawn((
        Name::new("Field Backdrop"),
        FieldBackdrop,
        Sprite {
            color: backdrop_color(1),
            custom_size: Some(Vec2::new(hex::FIELD_WIDTH, hex::FIELD_HEIGHT)),
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, -1.0),
        DespawnOnExit(Screen::Gameplay),
    ));
}

/// The backdrop hue walks around the wheel as the level climbs.
fn backdrop_color(level: u32) -> Color {
    let hue = (120.0 + (level.saturating_sub(1) % 6) as f32 * 40.0) % 360.0;
    Color::hsl(hue, 0.45, 0.12)
}

fn tint_backdrop(
    score: Res<state::GameScore>,
    mut backdrops: Query<&mut Sprite, With<FieldBackdrop>>,
) {
    if !score.is_changed() {
        return;
    }
    let Ok(mut sprite) = backdrops.single_mut() else {
        return;
    };
    sprite.color = backdrop_color(score.level);
}
