//! The flying bubble: fixed-tick flight, wall bounces, collision against the
//! settled field, and the snap into the grid.
//!
//! At most one projectile exists at a time; the launcher refuses to fire
//! while one is in flight. Flight runs in `FixedUpdate` so the physics step
//! is the same 60 Hz tick everywhere.

use bevy::prelude::*;

use super::{
    GameSet,
    bubble::{BubbleColor, BubbleKind},
    grid::BubbleGrid,
    hex::{BUBBLE_RADIUS, FIELD_WIDTH, GridPos, field_to_world},
};
use crate::{AppSystems, PausableSystems, audio::sound_effect, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Projectile>();

    app.add_message::<FireProjectile>();
    app.add_message::<BubbleAttached>();
    app.add_message::<ShotResolved>();

    // Spawning happens in `Update`, right after input, so a fire message is
    // never dropped between fixed ticks; flight itself runs on the tick.
    app.add_systems(
        Update,
        spawn_projectile
            .in_set(AppSystems::Update)
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );

    app.add_systems(
        FixedUpdate,
        advance_projectile
            .in_set(GameSet::Flight)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Projectile speed in field pixels per second (10 px per 16 ms tick).
const PROJECTILE_SPEED: f32 = 600.0;

/// Contact distance against settled bubbles. Deliberately less than two
/// radii: the slight overlap lets shots squeeze into gaps.
const CONTACT_DISTANCE: f32 = BUBBLE_RADIUS * 1.8;

/// Coarse vertical band for the collision scan.
const SCAN_BAND: f32 = BUBBLE_RADIUS * 2.5;

/// Message to fire a bubble from the launcher.
#[derive(Message, Debug, Clone)]
pub struct FireProjectile {
    /// Spawn position in field coordinates.
    pub position: Vec2,
    /// Launch angle in degrees; 90 is straight up.
    pub angle: f32,
    pub kind: BubbleKind,
}

/// Message sent when a shot is committed into the grid. Drives the whole
/// resolution pipeline.
#[derive(Message, Debug, Clone)]
pub struct BubbleAttached {
    pub pos: GridPos,
    pub kind: BubbleKind,
}

/// Message sent whenever the projectile is gone, attached or not. The
/// launcher reloads on this.
#[derive(Message, Debug, Clone)]
pub struct ShotResolved;

/// The one bubble in flight.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Projectile {
    /// Position in field coordinates (y grows downward).
    pub pos: Vec2,
    /// Velocity in field pixels per second.
    pub velocity: Vec2,
    pub kind: BubbleKind,
}

/// Spawn a projectile for each fire message.
fn spawn_projectile(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut fire_events: MessageReader<FireProjectile>,
    in_flight: Query<&Projectile>,
) {
    for event in fire_events.read() {
        // One shot at a time; a second fire message while one is flying is a
        // stale input and gets dropped.
        if !in_flight.is_empty() {
            continue;
        }

        let rad = event.angle.to_radians();
        let velocity = Vec2::new(rad.cos(), -rad.sin()) * PROJECTILE_SPEED;

        commands.spawn((
            Name::new("Projectile"),
            Projectile {
                pos: event.position,
                velocity,
                kind: event.kind,
            },
            Transform::from_translation(field_to_world(event.position).extend(5.0)),
            Mesh2d(meshes.add(Circle::new(BUBBLE_RADIUS))),
            MeshMaterial2d(materials.add(ColorMaterial::from_color(event.kind.to_color()))),
            DespawnOnExit(Screen::Gameplay),
        ));

        let launch = asset_server.load("audio/sound_effects/shoot.ogg");
        commands.spawn(sound_effect(launch));
    }
}

/// One flight tick: move, bounce off the side walls, then check the ceiling
/// and the settled bubbles. The ceiling always wins within a tick.
fn advance_projectile(
    time: Res<Time>,
    mut commands: Commands,
    mut grid: ResMut<BubbleGrid>,
    mut projectiles: Query<(Entity, &mut Projectile, &mut Transform)>,
    mut attached_events: MessageWriter<BubbleAttached>,
    mut resolved_events: MessageWriter<ShotResolved>,
) {
    let dt = time.delta_secs();

    for (entity, mut projectile, mut transform) in &mut projectiles {
        let velocity = projectile.velocity;
        projectile.pos += velocity * dt;

        // Elastic horizontal bounce; vertical speed untouched.
        if projectile.pos.x - BUBBLE_RADIUS <= 0.0 {
            projectile.pos.x = BUBBLE_RADIUS;
            projectile.velocity.x = projectile.velocity.x.abs();
        }
        if projectile.pos.x + BUBBLE_RADIUS >= FIELD_WIDTH {
            projectile.pos.x = FIELD_WIDTH - BUBBLE_RADIUS;
            projectile.velocity.x = -projectile.velocity.x.abs();
        }

        let mut contact = projectile.pos.y - BUBBLE_RADIUS < 0.0;
        if !contact {
            contact = touches_settled_bubble(&grid, projectile.pos);
        }

        if contact {
            commands.entity(entity).despawn();
            attach(&mut grid, &projectile, &mut attached_events);
            resolved_events.write(ShotResolved);
            continue;
        }

        transform.translation = field_to_world(projectile.pos).extend(5.0);
    }
}

/// Whether the projectile overlaps any settled bubble. The coarse band keeps
/// the scan from touching rows nowhere near the projectile.
fn touches_settled_bubble(grid: &BubbleGrid, pos: Vec2) -> bool {
    let contact_sq = CONTACT_DISTANCE * CONTACT_DISTANCE;

    grid.occupied().any(|(cell, _)| {
        let center = cell.center();
        (center.y - pos.y).abs() <= SCAN_BAND && center.distance_squared(pos) < contact_sq
    })
}

/// Snap the projectile into the nearest empty cell and commit its color.
fn attach(
    grid: &mut BubbleGrid,
    projectile: &Projectile,
    attached_events: &mut MessageWriter<BubbleAttached>,
) {
    let Some(cell) = grid.closest_empty_cell(projectile.pos) else {
        // Grid packed solid; the shot fizzles.
        warn!("no empty cell left to attach to, discarding shot");
        return;
    };

    // Stale-state guard; should never happen while shots resolve one at a
    // time.
    if grid.is_occupied(cell) {
        warn!("attachment target {cell} already occupied, discarding shot");
        return;
    }

    let kind = resolve_wildcard(grid, cell, projectile.kind);
    grid.set(cell, kind);
    info!("Bubble {kind:?} attached at {cell}");

    attached_events.write(BubbleAttached { pos: cell, kind });
}

/// Give an attaching wildcard the most frequent color among its non-rainbow
/// neighbors. Ties resolve to the lowest palette index; with no colored
/// neighbor it stays a wildcard.
pub(super) fn resolve_wildcard(grid: &BubbleGrid, cell: GridPos, kind: BubbleKind) -> BubbleKind {
    let BubbleKind::Rainbow = kind else {
        return kind;
    };

    let mut counts = [0u32; BubbleColor::ALL.len()];
    for (_, neighbor) in grid.occupied_neighbors(cell) {
        if let BubbleKind::Color(color) = neighbor {
            counts[color.index() as usize] += 1;
        }
    }

    let mut best: Option<(BubbleColor, u32)> = None;
    for color in BubbleColor::ALL {
        let count = counts[color.index() as usize];
        if count > 0 && best.is_none_or(|(_, n)| count > n) {
            best = Some((color, count));
        }
    }

    match best {
        Some((color, _)) => BubbleKind::Color(color),
        None => BubbleKind::Rainbow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(c: BubbleColor) -> BubbleKind {
        BubbleKind::Color(c)
    }

    #[test]
    fn wildcard_takes_the_majority_neighbor_color() {
        // Neighbors colored {green, green, blue} around (1, 4).
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 4), color(BubbleColor::Green));
        grid.set(GridPos::new(0, 5), color(BubbleColor::Green));
        grid.set(GridPos::new(1, 3), color(BubbleColor::Blue));

        let resolved = resolve_wildcard(&grid, GridPos::new(1, 4), BubbleKind::Rainbow);
        assert_eq!(resolved, color(BubbleColor::Green));
    }

    #[test]
    fn wildcard_tie_resolves_to_the_lowest_palette_index() {
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 4), color(BubbleColor::Cyan));
        grid.set(GridPos::new(0, 5), color(BubbleColor::Red));

        let resolved = resolve_wildcard(&grid, GridPos::new(1, 4), BubbleKind::Rainbow);
        assert_eq!(resolved, color(BubbleColor::Red));
    }

    #[test]
    fn wildcard_without_colored_neighbors_stays_a_wildcard() {
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 4), BubbleKind::Rainbow);

        let resolved = resolve_wildcard(&grid, GridPos::new(1, 4), BubbleKind::Rainbow);
        assert_eq!(resolved, BubbleKind::Rainbow);
    }

    #[test]
    fn regular_colors_pass_through_untouched() {
        let grid = BubbleGrid::default();
        let kind = color(BubbleColor::Yellow);
        assert_eq!(resolve_wildcard(&grid, GridPos::new(3, 3), kind), kind);
    }

    #[test]
    fn contact_uses_the_squeeze_distance() {
        let mut grid = BubbleGrid::default();
        let cell = GridPos::new(4, 4);
        grid.set(cell, color(BubbleColor::Red));
        let center = cell.center();

        // Just outside 1.8R: no contact even though the bubbles would already
        // overlap visually at 2R.
        let outside = center + Vec2::new(CONTACT_DISTANCE + 0.5, 0.0);
        assert!(!touches_settled_bubble(&grid, outside));

        let inside = center + Vec2::new(CONTACT_DISTANCE - 0.5, 0.0);
        assert!(touches_settled_bubble(&grid, inside));
    }
}
