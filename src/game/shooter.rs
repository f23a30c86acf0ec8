//! The launcher at the bottom of the field.
//!
//! The player aims with the mouse and fires with click or space. The loaded
//! bubble and the preview behind it live in [`LauncherQueue`]; the two can
//! be swapped without spending a shot, and the queue cycles once a shot
//! resolves.

use bevy::{prelude::*, window::PrimaryWindow};

use super::{
    bubble::BubbleKind,
    hex::{BUBBLE_RADIUS, FIELD_WIDTH, LAUNCHER_Y, field_to_world},
    projectile::{FireProjectile, Projectile, ShotResolved},
};
use crate::{AppSystems, PausableSystems, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<LauncherQueue>();
    app.register_type::<LauncherQueue>();
    app.register_type::<Launcher>();
    app.register_type::<LauncherState>();
    app.register_type::<Aim>();

    app.add_systems(OnEnter(Screen::Gameplay), spawn_launcher);

    app.add_systems(
        Update,
        (
            (update_aim, handle_fire_input, handle_swap_input).in_set(AppSystems::RecordInput),
            (
                reload_launcher,
                refresh_launcher_visuals,
                draw_aim_line,
                rotate_barrel,
            )
                .in_set(AppSystems::Update),
        )
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Launch position in field coordinates.
pub const LAUNCH_POS: Vec2 = Vec2::new(FIELD_WIDTH * 0.5, LAUNCHER_Y);

/// Aim clamp in degrees. Keeps shots from going sideways or backward.
const MIN_ANGLE: f32 = 15.0;
const MAX_ANGLE: f32 = 165.0;

/// Length of the dotted aim line in pixels.
const AIM_LINE_LENGTH: f32 = 150.0;

/// The loaded bubble and the one queued behind it.
#[derive(Resource, Debug, Clone, Reflect)]
#[reflect(Resource)]
pub struct LauncherQueue {
    pub current: BubbleKind,
    pub next: BubbleKind,
}

impl Default for LauncherQueue {
    fn default() -> Self {
        let mut rng = rand::rng();
        Self {
            current: BubbleKind::random_color(&mut rng),
            next: BubbleKind::random_color(&mut rng),
        }
    }
}

impl LauncherQueue {
    /// Swap the loaded and queued bubbles. Free: no shot is consumed.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Cycle after a resolved shot: current ← next, next ← random.
    pub fn reload(&mut self) {
        self.current = self.next;
        self.next = BubbleKind::random_color(&mut rand::rng());
    }
}

/// Marker component for the launcher entity.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Launcher;

/// Whether the launcher may fire.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect, Default)]
#[reflect(Component)]
pub enum LauncherState {
    /// Ready to fire.
    #[default]
    Ready,
    /// Waiting for the shot in flight to resolve.
    Reloading,
}

/// Aim angle in degrees; 90 points straight up.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Aim {
    pub angle: f32,
}

impl Default for Aim {
    fn default() -> Self {
        Self { angle: 90.0 }
    }
}

impl Aim {
    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle.clamp(MIN_ANGLE, MAX_ANGLE);
    }
}

/// Marker for the loaded-bubble visual.
#[derive(Component)]
struct LoadedBubbleVisual;

/// Marker for the next-bubble preview visual.
#[derive(Component)]
struct NextBubbleVisual;

/// Marker for the rotating barrel visual.
#[derive(Component)]
struct BarrelVisual;

pub(super) fn spawn_launcher(mut commands: Commands, mut queue: ResMut<LauncherQueue>) {
    *queue = LauncherQueue::default();

    let world = field_to_world(LAUNCH_POS);

    let launcher = commands
        .spawn((
            Name::new("Launcher"),
            Launcher,
            LauncherState::Ready,
            Aim::default(),
            Transform::from_translation(world.extend(1.0)),
            Visibility::default(),
            DespawnOnExit(Screen::Gameplay),
        ))
        .id();

    // Barrel pointer, rotated to follow the aim.
    let barrel = commands
        .spawn((
            Name::new("Launcher Barrel"),
            BarrelVisual,
            Sprite {
                color: Color::srgb(0.95, 0.55, 0.1),
                custom_size: Some(Vec2::new(8.0, BUBBLE_RADIUS * 2.4)),
                ..default()
            },
            Transform::from_translation(Vec3::new(0.0, 0.0, 2.0)),
        ))
        .id();
    commands.entity(launcher).add_child(barrel);

    // Base platform.
    let base = commands
        .spawn((
            Name::new("Launcher Base"),
            Sprite {
                color: Color::srgb(0.35, 0.22, 0.1),
                custom_size: Some(Vec2::new(BUBBLE_RADIUS * 3.0, BUBBLE_RADIUS * 0.6)),
                ..default()
            },
            Transform::from_translation(Vec3::new(0.0, -BUBBLE_RADIUS * 1.2, -0.1)),
        ))
        .id();
    commands.entity(launcher).add_child(base);

    info!(
        "Launcher spawned with {:?} loaded, {:?} next",
        queue.current, queue.next
    );
}

/// Point the launcher at the cursor. Only positions above the launcher
/// count, and the angle is clamped to the legal arc.
fn update_aim(
    window: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform)>,
    mut launchers: Query<(&Transform, &mut Aim), With<Launcher>>,
) {
    let Ok(window) = window.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera.single() else {
        return;
    };
    let Ok((transform, mut aim)) = launchers.single_mut() else {
        return;
    };

    let Some(cursor) = window
        .cursor_position()
        .and_then(|p| camera.viewport_to_world_2d(camera_transform, p).ok())
    else {
        return;
    };

    let origin = transform.translation.truncate();
    let dx = cursor.x - origin.x;
    let dy = cursor.y - origin.y;
    if dy > 0.0 {
        aim.set_angle(dy.atan2(dx).to_degrees());
    }
}

/// Fire on left click or space. Rejected while a shot is resolving.
fn handle_fire_input(
    mouse: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    queue: Res<LauncherQueue>,
    mut launchers: Query<(&Aim, &mut LauncherState), With<Launcher>>,
    projectiles: Query<&Projectile>,
    mut fire_events: MessageWriter<FireProjectile>,
) {
    let pressed = mouse.just_pressed(MouseButton::Left) || keyboard.just_pressed(KeyCode::Space);
    if !pressed {
        return;
    }

    let Ok((aim, mut state)) = launchers.single_mut() else {
        return;
    };

    if *state != LauncherState::Ready || !projectiles.is_empty() {
        return;
    }

    fire_events.write(FireProjectile {
        position: LAUNCH_POS,
        angle: aim.angle,
        kind: queue.current,
    });
    *state = LauncherState::Reloading;

    info!("Fired {:?} at {:.1} degrees", queue.current, aim.angle);
}

/// Swap the loaded and queued bubbles (X or right click).
fn handle_swap_input(
    mouse: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut queue: ResMut<LauncherQueue>,
    launchers: Query<&LauncherState, With<Launcher>>,
) {
    let pressed = mouse.just_pressed(MouseButton::Right) || keyboard.just_pressed(KeyCode::KeyX);
    if !pressed {
        return;
    }

    let Ok(state) = launchers.single() else {
        return;
    };
    if *state != LauncherState::Ready {
        return;
    }

    queue.swap();
}

/// Cycle the queue once the shot has resolved.
fn reload_launcher(
    mut resolved_events: MessageReader<ShotResolved>,
    mut queue: ResMut<LauncherQueue>,
    mut launchers: Query<&mut LauncherState, With<Launcher>>,
) {
    if resolved_events.is_empty() {
        return;
    }
    resolved_events.clear();

    let Ok(mut state) = launchers.single_mut() else {
        return;
    };
    if *state != LauncherState::Reloading {
        return;
    }

    queue.reload();
    *state = LauncherState::Ready;

    info!("Reloaded with {:?}, next is {:?}", queue.current, queue.next);
}

/// Rebuild the loaded/next visuals whenever the queue changes.
fn refresh_launcher_visuals(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    queue: Res<LauncherQueue>,
    launchers: Query<Entity, With<Launcher>>,
    loaded_visuals: Query<Entity, With<LoadedBubbleVisual>>,
    next_visuals: Query<Entity, With<NextBubbleVisual>>,
) {
    if !queue.is_changed() {
        return;
    }
    let Ok(launcher) = launchers.single() else {
        return;
    };

    for visual in &loaded_visuals {
        commands.entity(visual).despawn();
    }
    for visual in &next_visuals {
        commands.entity(visual).despawn();
    }

    let loaded = commands
        .spawn((
            Name::new("Loaded Bubble"),
            LoadedBubbleVisual,
            Transform::from_translation(Vec3::new(0.0, 0.0, 3.0)),
            Mesh2d(meshes.add(Circle::new(BUBBLE_RADIUS))),
            MeshMaterial2d(materials.add(ColorMaterial::from_color(queue.current.to_color()))),
        ))
        .id();
    commands.entity(launcher).add_child(loaded);

    let next = commands
        .spawn((
            Name::new("Next Bubble"),
            NextBubbleVisual,
            Transform::from_translation(Vec3::new(BUBBLE_RADIUS * 3.0, 0.0, 3.0)),
            Mesh2d(meshes.add(Circle::new(BUBBLE_RADIUS * 0.6))),
            MeshMaterial2d(materials.add(ColorMaterial::from_color(queue.next.to_color()))),
        ))
        .id();
    commands.entity(launcher).add_child(next);
}

/// Keep the barrel sprite aligned with the aim.
fn rotate_barrel(
    launchers: Query<&Aim, With<Launcher>>,
    mut barrels: Query<&mut Transform, With<BarrelVisual>>,
) {
    let Ok(aim) = launchers.single() else {
        return;
    };
    let Ok(mut transform) = barrels.single_mut() else {
        return;
    };

    // The sprite points up at 90 degrees.
    transform.rotation = Quat::from_rotation_z((aim.angle - 90.0).to_radians());
}

/// Dotted aim line while the launcher is ready.
fn draw_aim_line(
    mut gizmos: Gizmos,
    launchers: Query<(&Transform, &Aim, &LauncherState), With<Launcher>>,
) {
    let Ok((transform, aim, state)) = launchers.single() else {
        return;
    };
    if *state == LauncherState::Reloading {
        return;
    }

    let start = transform.translation.truncate();
    let rad = aim.angle.to_radians();
    // World space: y up.
    let direction = Vec2::new(rad.cos(), rad.sin());

    let segments = 15;
    let segment_length = AIM_LINE_LENGTH / segments as f32;
    for i in 0..segments {
        if i % 2 == 0 {
            let seg_start = start + direction * (i as f32 * segment_length);
            let seg_end = start + direction * ((i as f32 + 0.7) * segment_length);
            gizmos.line_2d(seg_start, seg_end, Color::srgba(0.9, 0.9, 0.9, 0.5));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bubble::BubbleColor;

    #[test]
    fn aim_is_clamped_to_the_legal_arc() {
        let mut aim = Aim::default();

        aim.set_angle(5.0);
        assert_eq!(aim.angle, MIN_ANGLE);

        aim.set_angle(175.0);
        assert_eq!(aim.angle, MAX_ANGLE);

        aim.set_angle(90.0);
        assert_eq!(aim.angle, 90.0);
    }

    #[test]
    fn swap_exchanges_the_two_slots() {
        let mut queue = LauncherQueue {
            current: BubbleKind::Color(BubbleColor::Red),
            next: BubbleKind::Rainbow,
        };

        queue.swap();
        assert_eq!(queue.current, BubbleKind::Rainbow);
        assert_eq!(queue.next, BubbleKind::Color(BubbleColor::Red));
    }

    #[test]
    fn reload_promotes_the_next_bubble() {
        let mut queue = LauncherQueue {
            current: BubbleKind::Color(BubbleColor::Red),
            next: BubbleKind::Color(BubbleColor::Cyan),
        };

        queue.reload();
        assert_eq!(queue.current, BubbleKind::Color(BubbleColor::Cyan));
        // The fresh bubble is always a regular color, never a wildcard.
        assert!(matches!(queue.next, BubbleKind::Color(_)));
    }
}
