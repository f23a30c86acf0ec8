//! Game juice: pop animations, screen shake, combo text, and the power
//! effect flashes.

use bevy::prelude::*;
use rand::Rng;

use super::{
    bubble::BubbleKind,
    cluster::{ClusterPopped, FloatingBubblesRemoved},
    descent::CeilingAdvanced,
    hex::{BUBBLE_RADIUS, FIELD_HEIGHT, FIELD_WIDTH, GridPos, field_to_world},
    powerups::{PowerActivated, PowerCollected, PowerDetonated, PowerKind},
    state::GameOver,
};
use crate::{PausableSystems, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<ScreenShake>();

    app.add_systems(
        Update,
        (
            (trigger_shake_on_events, apply_screen_shake).chain(),
            spawn_pop_ghosts,
            animate_pop,
            spawn_combo_text,
            animate_combo_text,
            spawn_power_flashes,
            animate_fade_out,
        )
            .in_set(PausableSystems)
            .run_if(in_state(Screen::Gameplay)),
    );
}

// =============================================================================
// SCREEN SHAKE
// =============================================================================

/// Resource tracking screen shake state.
#[derive(Resource, Default)]
pub struct ScreenShake {
    /// Current trauma level (0.0 to 1.0).
    pub trauma: f32,
    /// Base position to return to.
    pub base_position: Vec3,
}

/// Maximum shake offset in pixels.
const MAX_SHAKE_OFFSET: f32 = 10.0;
/// How fast trauma decays per second.
const TRAUMA_DECAY: f32 = 2.5;

fn trigger_shake_on_events(
    mut shake: ResMut<ScreenShake>,
    mut popped_events: MessageReader<ClusterPopped>,
    mut floating_events: MessageReader<FloatingBubblesRemoved>,
    mut detonated_events: MessageReader<PowerDetonated>,
    mut advanced_events: MessageReader<CeilingAdvanced>,
    mut game_over_events: MessageReader<GameOver>,
) {
    for event in popped_events.read() {
        let intensity = match event.count {
            0..=3 => 0.35,
            4..=5 => 0.5,
            6..=7 => 0.65,
            _ => 0.8,
        };
        shake.trauma = (shake.trauma + intensity).min(1.0);
    }

    for event in floating_events.read() {
        let intensity = (event.count as f32 * 0.15).min(0.6);
        shake.trauma = (shake.trauma + intensity).min(1.0);
    }

    for _ in detonated_events.read() {
        shake.trauma = (shake.trauma + 0.7).min(1.0);
    }

    // Ceiling advance - medium rumble.
    for _ in advanced_events.read() {
        shake.trauma = (shake.trauma + 0.45).min(1.0);
    }

    for _ in game_over_events.read() {
        shake.trauma = 1.0;
    }
}

fn apply_screen_shake(
    time: Res<Time>,
    mut shake: ResMut<ScreenShake>,
    mut cameras: Query<&mut Transform, With<Camera2d>>,
) {
    let Ok(mut camera_transform) = cameras.single_mut() else {
        return;
    };

    if shake.trauma > 0.0 {
        let mut rng = rand::rng();

        // Trauma squared makes small hits gentle and big ones violent.
        let amount = shake.trauma * shake.trauma;
        let offset_x = rng.random_range(-1.0..1.0) * MAX_SHAKE_OFFSET * amount;
        let offset_y = rng.random_range(-1.0..1.0) * MAX_SHAKE_OFFSET * amount;

        camera_transform.translation.x = shake.base_position.x + offset_x;
        camera_transform.translation.y = shake.base_position.y + offset_y;

        shake.trauma = (shake.trauma - TRAUMA_DECAY * time.delta_secs()).max(0.0);
    } else {
        camera_transform.translation.x = shake.base_position.x;
        camera_transform.translation.y = shake.base_position.y;
    }
}

// =============================================================================
// POP ANIMATION
// =============================================================================

/// Component for pop ghosts: scale up, then shrink to nothing.
#[derive(Component)]
pub struct PopAnimation {
    pub timer: f32,
    pub duration: f32,
    pub start_scale: Vec3,
    pub peak_scale: Vec3,
}

impl PopAnimation {
    pub fn new(current_scale: Vec3) -> Self {
        Self {
            timer: 0.0,
            duration: 0.15,
            start_scale: current_scale,
            peak_scale: current_scale * 1.4,
        }
    }
}

/// Spawn a short-lived ghost for every cleared cell. The real bubble entity
/// is already gone by the time these messages arrive; the ghost is purely
/// cosmetic.
fn spawn_pop_ghosts(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut popped_events: MessageReader<ClusterPopped>,
    mut floating_events: MessageReader<FloatingBubblesRemoved>,
    mut detonated_events: MessageReader<PowerDetonated>,
) {
    let mut cleared: Vec<(GridPos, BubbleKind)> = Vec::new();
    for event in popped_events.read() {
        cleared.extend(event.cells.iter().copied());
    }
    for event in floating_events.read() {
        cleared.extend(event.cells.iter().copied());
    }
    for event in detonated_events.read() {
        cleared.extend(event.cells.iter().copied());
    }

    for (pos, kind) in cleared {
        let world = field_to_world(pos.center());
        commands.spawn((
            Name::new("Pop Ghost"),
            PopAnimation::new(Vec3::ONE),
            Transform::from_translation(world.extend(4.0)),
            Mesh2d(meshes.add(Circle::new(BUBBLE_RADIUS))),
            MeshMaterial2d(materials.add(ColorMaterial::from_color(kind.to_color()))),
            DespawnOnExit(Screen::Gameplay),
        ));
    }
}

fn animate_pop(
    mut commands: Commands,
    time: Res<Time>,
    mut ghosts: Query<(Entity, &mut Transform, &mut PopAnimation)>,
) {
    for (entity, mut transform, mut pop) in &mut ghosts {
        pop.timer += time.delta_secs();
        let progress = (pop.timer / pop.duration).min(1.0);

        let scale = if progress < 0.5 {
            let t = progress * 2.0;
            pop.start_scale.lerp(pop.peak_scale, t)
        } else {
            let t = (progress - 0.5) * 2.0;
            pop.peak_scale.lerp(Vec3::ZERO, t)
        };

        transform.scale = scale;

        if progress >= 1.0 {
            commands.entity(entity).despawn();
        }
    }
}

// =============================================================================
// COMBO TEXT
// =============================================================================

/// Component for floating combo text.
#[derive(Component)]
pub struct ComboText {
    pub timer: f32,
    pub duration: f32,
    pub start_y: f32,
    pub float_distance: f32,
}

fn spawn_combo_text(
    mut commands: Commands,
    mut popped_events: MessageReader<ClusterPopped>,
    mut collected_events: MessageReader<PowerCollected>,
) {
    for event in collected_events.read() {
        commands.spawn((
            Name::new("Power Drop Text"),
            ComboText {
                timer: 0.0,
                duration: 1.0,
                start_y: -60.0,
                float_distance: 60.0,
            },
            Text2d::new(format!("{}!", event.kind.name())),
            TextFont {
                font_size: 28.0,
                ..default()
            },
            TextColor(Color::srgb(0.6, 1.0, 1.0)),
            Transform::from_translation(Vec3::new(0.0, -60.0, 10.0)).with_scale(Vec3::splat(0.5)),
            DespawnOnExit(Screen::Gameplay),
        ));
    }

    for event in popped_events.read() {
        if event.count <= 3 {
            continue;
        }

        let center = if event.cells.is_empty() {
            Vec2::ZERO
        } else {
            let sum: Vec2 = event
                .cells
                .iter()
                .map(|(pos, _)| field_to_world(pos.center()))
                .fold(Vec2::ZERO, |acc, p| acc + p);
            sum / event.cells.len() as f32
        };

        let text = if event.count >= 8 {
            format!("MASSIVE! +{}!", event.count)
        } else if event.count >= 6 {
            format!("COMBO! +{}!", event.count)
        } else {
            format!("+{}!", event.count)
        };

        commands.spawn((
            Name::new("Combo Text"),
            ComboText {
                timer: 0.0,
                duration: 0.8,
                start_y: center.y,
                float_distance: 50.0,
            },
            Text2d::new(text),
            TextFont {
                font_size: 32.0,
                ..default()
            },
            TextColor(Color::srgb(1.0, 1.0, 0.2)),
            Transform::from_translation(center.extend(10.0)).with_scale(Vec3::splat(0.5)),
            DespawnOnExit(Screen::Gameplay),
        ));
    }
}

fn animate_combo_text(
    mut commands: Commands,
    time: Res<Time>,
    mut texts: Query<(Entity, &mut Transform, &mut ComboText, &mut TextColor)>,
) {
    for (entity, mut transform, mut combo, mut color) in &mut texts {
        combo.timer += time.delta_secs();
        let progress = (combo.timer / combo.duration).min(1.0);

        let scale = if progress < 0.2 {
            0.5 + (progress / 0.2)
        } else {
            1.5
        };
        transform.scale = Vec3::splat(scale);
        transform.translation.y = combo.start_y + combo.float_distance * progress;

        let alpha = if progress > 0.7 {
            1.0 - (progress - 0.7) / 0.3
        } else {
            1.0
        };
        color.0 = Color::srgba(1.0, 1.0, 0.2, alpha);

        if progress >= 1.0 {
            commands.entity(entity).despawn();
        }
    }
}

// =============================================================================
// POWER FLASHES
// =============================================================================

/// Component for one-shot flash sprites that fade and despawn.
#[derive(Component)]
pub struct FadeOut {
    pub timer: f32,
    pub duration: f32,
}

/// Beam for the laser, blast disc for bomb and fireball, a cold wash over
/// the whole field for freeze.
fn spawn_power_flashes(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut activated_events: MessageReader<PowerActivated>,
    mut detonated_events: MessageReader<PowerDetonated>,
) {
    for event in activated_events.read() {
        if event.kind != PowerKind::Freeze {
            continue;
        }
        commands.spawn((
            Name::new("Freeze Flash"),
            FadeOut {
                timer: 0.0,
                duration: 0.6,
            },
            Sprite {
                color: Color::srgba(0.53, 0.81, 0.98, 0.35),
                custom_size: Some(Vec2::new(FIELD_WIDTH, FIELD_HEIGHT)),
                ..default()
            },
            Transform::from_translation(Vec3::new(0.0, 0.0, 7.0)),
            DespawnOnExit(Screen::Gameplay),
        ));
    }

    for event in detonated_events.read() {
        let impact = field_to_world(event.impact.center());

        match event.kind {
            PowerKind::Laser => {
                commands.spawn((
                    Name::new("Laser Beam"),
                    FadeOut {
                        timer: 0.0,
                        duration: 0.3,
                    },
                    Sprite {
                        color: Color::srgba(0.4, 1.0, 1.0, 0.8),
                        custom_size: Some(Vec2::new(10.0, FIELD_HEIGHT)),
                        ..default()
                    },
                    Transform::from_translation(Vec3::new(impact.x, 0.0, 6.0)),
                    DespawnOnExit(Screen::Gameplay),
                ));
            }
            PowerKind::Bomb | PowerKind::Fireball => {
                let radius = if event.kind == PowerKind::Bomb {
                    BUBBLE_RADIUS * 3.0
                } else {
                    BUBBLE_RADIUS * 5.0
                };
                commands.spawn((
                    Name::new("Blast Flash"),
                    FadeOut {
                        timer: 0.0,
                        duration: 0.3,
                    },
                    Transform::from_translation(impact.extend(6.0)),
                    Mesh2d(meshes.add(Circle::new(radius))),
                    MeshMaterial2d(
                        materials.add(ColorMaterial::from_color(Color::srgba(1.0, 0.6, 0.1, 0.6))),
                    ),
                    DespawnOnExit(Screen::Gameplay),
                ));
            }
            PowerKind::Rainbow | PowerKind::Freeze => {}
        }
    }
}

fn animate_fade_out(
    mut commands: Commands,
    time: Res<Time>,
    mut flashes: Query<(Entity, &mut FadeOut, &mut Transform, Option<&mut Sprite>)>,
) {
    for (entity, mut fade, mut transform, sprite) in &mut flashes {
        fade.timer += time.delta_secs();
        let progress = (fade.timer / fade.duration).min(1.0);

        // Grow a little while fading.
        transform.scale = Vec3::splat(1.0 + progress * 0.3);
        if let Some(mut sprite) = sprite {
            let alpha = (1.0 - progress) * 0.8;
            sprite.color = sprite.color.with_alpha(alpha);
        }

        if progress >= 1.0 {
            commands.entity(entity).despawn();
        }
    }
}
