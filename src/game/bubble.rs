//! Bubble colors, the cell model, and the grid-to-entity visual sync.
//!
//! The simulation stores plain [`BubbleKind`] values in the grid; entities
//! exist purely to draw them. A sync system rebuilds the visuals whenever the
//! grid changes, so no game rule ever has to touch a render component.

use bevy::prelude::*;
use rand::Rng;
use std::collections::HashMap;

use super::{
    grid::BubbleGrid,
    hex::{BUBBLE_RADIUS, GridPos, field_to_world},
};
use crate::screens::Screen;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Bubble>();
    app.register_type::<BubbleColor>();
    app.register_type::<BubbleKind>();

    app.add_systems(
        Update,
        sync_grid_visuals.run_if(in_state(Screen::Gameplay)),
    );
}

/// Save-file cell value for the rainbow wildcard.
pub const RAINBOW_CELL: i8 = -1;

/// The six regular bubble colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Default)]
pub enum BubbleColor {
    #[default]
    Red,
    Green,
    Blue,
    Yellow,
    Pink,
    Cyan,
}

impl BubbleColor {
    pub const ALL: [BubbleColor; 6] = [
        BubbleColor::Red,
        BubbleColor::Green,
        BubbleColor::Blue,
        BubbleColor::Yellow,
        BubbleColor::Pink,
        BubbleColor::Cyan,
    ];

    /// Palette index used by the save encoding.
    pub const fn index(self) -> i8 {
        match self {
            BubbleColor::Red => 0,
            BubbleColor::Green => 1,
            BubbleColor::Blue => 2,
            BubbleColor::Yellow => 3,
            BubbleColor::Pink => 4,
            BubbleColor::Cyan => 5,
        }
    }

    pub const fn from_index(index: i8) -> Option<Self> {
        match index {
            0 => Some(BubbleColor::Red),
            1 => Some(BubbleColor::Green),
            2 => Some(BubbleColor::Blue),
            3 => Some(BubbleColor::Yellow),
            4 => Some(BubbleColor::Pink),
            5 => Some(BubbleColor::Cyan),
            _ => None,
        }
    }

    /// Render color.
    pub fn to_color(self) -> Color {
        match self {
            BubbleColor::Red => Color::srgb_u8(255, 100, 100),
            BubbleColor::Green => Color::srgb_u8(100, 255, 100),
            BubbleColor::Blue => Color::srgb_u8(100, 100, 255),
            BubbleColor::Yellow => Color::srgb_u8(255, 255, 100),
            BubbleColor::Pink => Color::srgb_u8(255, 100, 255),
            BubbleColor::Cyan => Color::srgb_u8(100, 255, 255),
        }
    }

    /// Pick a random color from the palette.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// What occupies a cell: a regular color or the rainbow wildcard.
///
/// The wildcard matches every color during flood fill but has no color of its
/// own until attachment resolves it against its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum BubbleKind {
    Color(BubbleColor),
    Rainbow,
}

impl BubbleKind {
    /// Save-file encoding: palette index, or -1 for the wildcard.
    pub const fn encode(self) -> i8 {
        match self {
            BubbleKind::Color(color) => color.index(),
            BubbleKind::Rainbow => RAINBOW_CELL,
        }
    }

    pub const fn decode(value: i8) -> Option<Self> {
        if value == RAINBOW_CELL {
            return Some(BubbleKind::Rainbow);
        }
        match BubbleColor::from_index(value) {
            Some(color) => Some(BubbleKind::Color(color)),
            None => None,
        }
    }

    pub fn to_color(self) -> Color {
        match self {
            BubbleKind::Color(color) => color.to_color(),
            BubbleKind::Rainbow => Color::srgb(0.95, 0.95, 0.95),
        }
    }

    /// A random regular bubble. The wildcard never spawns on its own; it only
    /// enters play through the rainbow power-up.
    pub fn random_color(rng: &mut impl Rng) -> Self {
        BubbleKind::Color(BubbleColor::random(rng))
    }
}

/// Marker component for a settled bubble visual.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Bubble {
    pub pos: GridPos,
    pub kind: BubbleKind,
}

/// Spawn the visual entity for one settled bubble.
pub(super) fn spawn_bubble(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<ColorMaterial>,
    pos: GridPos,
    kind: BubbleKind,
) -> Entity {
    let world = field_to_world(pos.center());

    commands
        .spawn((
            Name::new(format!("Bubble {kind:?} at {pos}")),
            Bubble { pos, kind },
            Transform::from_translation(world.extend(0.0)),
            Mesh2d(meshes.add(Circle::new(BUBBLE_RADIUS))),
            MeshMaterial2d(materials.add(ColorMaterial::from_color(kind.to_color()))),
            DespawnOnExit(Screen::Gameplay),
        ))
        .id()
}

/// Rebuild bubble visuals from the grid whenever it changes.
///
/// Cells that kept their contents keep their entity; anything that moved,
/// changed kind, or was cleared is respawned or despawned.
fn sync_grid_visuals(
    mut commands: Commands,
    grid: Res<BubbleGrid>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    bubbles: Query<(Entity, &Bubble)>,
) {
    if !grid.is_changed() {
        return;
    }

    let mut existing: HashMap<GridPos, (Entity, BubbleKind)> = HashMap::new();
    for (entity, bubble) in &bubbles {
        existing.insert(bubble.pos, (entity, bubble.kind));
    }

    for (pos, kind) in grid.occupied() {
        match existing.remove(&pos) {
            Some((_, existing_kind)) if existing_kind == kind => {}
            Some((entity, _)) => {
                commands.entity(entity).despawn();
                spawn_bubble(&mut commands, &mut meshes, &mut materials, pos, kind);
            }
            None => {
                spawn_bubble(&mut commands, &mut meshes, &mut materials, pos, kind);
            }
        }
    }

    // Whatever is left no longer exists in the grid.
    for (entity, _) in existing.values() {
        commands.entity(*entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_encoding_round_trips() {
        for color in BubbleColor::ALL {
            let kind = BubbleKind::Color(color);
            assert_eq!(BubbleKind::decode(kind.encode()), Some(kind));
        }
        assert_eq!(
            BubbleKind::decode(BubbleKind::Rainbow.encode()),
            Some(BubbleKind::Rainbow)
        );
    }

    #[test]
    fn out_of_palette_values_are_rejected() {
        assert_eq!(BubbleKind::decode(6), None);
        assert_eq!(BubbleKind::decode(-2), None);
    }
}
