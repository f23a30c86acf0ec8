//! The in-game HUD: score, level, drop counter, and the power slots.

use bevy::prelude::*;

use super::{
    descent::DropCounter,
    powerups::{PowerKind, PowerUpInventory},
    state::GameScore,
};
use crate::{screens::Screen, theme::palette::HUD_TEXT};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::Gameplay), spawn_hud);

    app.add_systems(
        Update,
        (update_score_label, update_drop_label, update_power_labels)
            .run_if(in_state(Screen::Gameplay)),
    );
}

#[derive(Component)]
struct ScoreLabel;

#[derive(Component)]
struct DropLabel;

#[derive(Component)]
struct PowerSlotLabel(PowerKind);

fn hud_text(font_size: f32) -> (TextFont, TextColor) {
    (
        TextFont {
            font_size,
            ..default()
        },
        TextColor(HUD_TEXT),
    )
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        Name::new("HUD Top Bar"),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(8.0),
            left: Val::Px(12.0),
            right: Val::Px(12.0),
            justify_content: JustifyContent::SpaceBetween,
            column_gap: Val::Px(20.0),
            ..default()
        },
        DespawnOnExit(Screen::Gameplay),
        children![
            (
                Name::new("Score"),
                ScoreLabel,
                Text::new("Score: 0   Level: 1"),
                hud_text(22.0),
            ),
            (
                Name::new("Drop Counter"),
                DropLabel,
                Text::new(""),
                hud_text(22.0),
            ),
        ],
    ));

    // Power slots down the right edge, one row per power.
    let mut slots = commands.spawn((
        Name::new("HUD Power Slots"),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(60.0),
            right: Val::Px(12.0),
            flex_direction: FlexDirection::Column,
            row_gap: Val::Px(6.0),
            ..default()
        },
        DespawnOnExit(Screen::Gameplay),
    ));

    slots.with_children(|parent| {
        for (index, kind) in PowerKind::ALL.into_iter().enumerate() {
            parent.spawn((
                Name::new(format!("Power Slot {}", kind.name())),
                PowerSlotLabel(kind),
                Text::new(format!("[{}] {}", index + 1, kind.name())),
                hud_text(16.0),
            ));
        }
    });
}

fn update_score_label(
    score: Res<GameScore>,
    mut labels: Query<&mut Text, With<ScoreLabel>>,
) {
    if !score.is_changed() {
        return;
    }
    let Ok(mut text) = labels.single_mut() else {
        return;
    };
    text.0 = format!("Score: {}   Level: {}", score.score, score.level);
}

fn update_drop_label(
    counter: Res<DropCounter>,
    mut labels: Query<&mut Text, With<DropLabel>>,
) {
    if !counter.is_changed() {
        return;
    }
    let Ok(mut text) = labels.single_mut() else {
        return;
    };

    text.0 = if counter.freeze_shots_remaining > 0 {
        format!("FROZEN ({} shots)", counter.freeze_shots_remaining)
    } else {
        format!("Drop in: {}", counter.shots_until_drop)
    };
}

fn update_power_labels(
    inventory: Res<PowerUpInventory>,
    mut labels: Query<(&mut Text, &mut TextColor, &PowerSlotLabel)>,
) {
    if !inventory.is_changed() {
        return;
    }

    for (mut text, mut color, slot) in &mut labels {
        let kind = slot.0;
        let index = PowerKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
        let cooldown = inventory.cooldown_remaining(kind);

        text.0 = if cooldown > 0 {
            format!("[{}] {} x{} ({cooldown})", index + 1, kind.name(), inventory.charges(kind))
        } else {
            format!("[{}] {} x{}", index + 1, kind.name(), inventory.charges(kind))
        };

        color.0 = if inventory.can_use(kind) {
            HUD_TEXT
        } else {
            Color::srgba(0.7, 0.7, 0.7, 0.5)
        };
    }
}
