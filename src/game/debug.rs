//! Debug visualization for the bubble field.
//!
//! Toggle the grid overlay with the 'D' key during gameplay. The field
//! walls and the danger line are always drawn.

use bevy::{color::palettes::css, input::common_conditions::input_just_pressed, prelude::*};

use super::{
    grid::BubbleGrid,
    hex::{
        BUBBLE_RADIUS, COLS, FIELD_WIDTH, GridPos, LAUNCHER_Y, ROWS, field_to_world,
    },
};
use crate::screens::Screen;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<DebugGridVisible>();

    app.add_systems(
        Update,
        toggle_debug.run_if(in_state(Screen::Gameplay).and(input_just_pressed(KeyCode::KeyD))),
    );

    app.add_systems(
        Update,
        draw_debug_grid.run_if(in_state(Screen::Gameplay).and(debug_visible)),
    );

    app.add_systems(Update, draw_walls.run_if(in_state(Screen::Gameplay)));
}

/// Resource to track if the grid overlay is visible.
#[derive(Resource, Default)]
pub struct DebugGridVisible(pub bool);

fn debug_visible(debug: Res<DebugGridVisible>) -> bool {
    debug.0
}

fn toggle_debug(mut debug: ResMut<DebugGridVisible>) {
    debug.0 = !debug.0;
    let state = if debug.0 { "ON" } else { "OFF" };
    info!("Debug grid: {state}");
}

/// Outline every cell; occupied cells get a brighter ring.
fn draw_debug_grid(mut gizmos: Gizmos, grid: Res<BubbleGrid>) {
    for row in 0..ROWS as i32 {
        for col in 0..COLS as i32 {
            let pos = GridPos::new(row, col);
            let color = if grid.is_occupied(pos) {
                css::LIMEGREEN.with_alpha(0.5)
            } else if row == 0 {
                // Anchor row.
                css::GOLD.with_alpha(0.3)
            } else {
                css::WHITE.with_alpha(0.12)
            };

            gizmos.circle_2d(
                Isometry2d::from_translation(field_to_world(pos.center())),
                BUBBLE_RADIUS,
                color,
            );
        }
    }
}

/// The side walls, ceiling, and danger line.
fn draw_walls(mut gizmos: Gizmos) {
    let wall_color = css::ORANGE.with_alpha(0.8);
    let danger_color = css::RED.with_alpha(0.6);

    let top_left = field_to_world(Vec2::ZERO);
    let top_right = field_to_world(Vec2::new(FIELD_WIDTH, 0.0));
    let bottom_left = field_to_world(Vec2::new(0.0, LAUNCHER_Y));
    let bottom_right = field_to_world(Vec2::new(FIELD_WIDTH, LAUNCHER_Y));

    gizmos.line_2d(top_left, bottom_left, wall_color);
    gizmos.line_2d(top_right, bottom_right, wall_color);
    gizmos.line_2d(top_left, top_right, wall_color);

    let danger_left = field_to_world(Vec2::new(0.0, LAUNCHER_Y - 50.0));
    let danger_right = field_to_world(Vec2::new(FIELD_WIDTH, LAUNCHER_Y - 50.0));
    gizmos.line_2d(danger_left, danger_right, danger_color);
}
