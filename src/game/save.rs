//! Session persistence: a flat snapshot of the run, written on leaving
//! gameplay and restored on the way back in.
//!
//! The snapshot is deliberately dumb: grid cells as palette indices, plus
//! the handful of counters that make up a run. A snapshot that fails
//! validation is discarded and the game starts fresh.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use super::{
    bubble::BubbleKind,
    descent::DropCounter,
    grid::BubbleGrid,
    powerups::{PowerKind, PowerUpInventory},
    shooter::LauncherQueue,
    state::GameScore,
};
use crate::screens::Screen;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        OnEnter(Screen::Gameplay),
        restore_session
            .after(super::grid::setup_grid)
            .after(super::shooter::spawn_launcher)
            .after(super::state::reset_score)
            .after(super::descent::reset_drop_counter)
            .after(super::powerups::reset_inventory),
    );

    app.add_systems(
        OnExit(Screen::Gameplay),
        save_session.before(super::grid::clear_grid),
    );
}

/// The on-disk snapshot. Cells are `null` (empty), a palette index, or -1
/// for the rainbow wildcard; the launcher slots use the same encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGame {
    pub score: u32,
    pub level: u32,
    pub shots_until_drop: u32,
    pub grid: Vec<Vec<Option<i8>>>,
    pub shooter_current: i8,
    pub shooter_next: i8,
    pub powerups: HashMap<String, u32>,
}

/// Everything a valid snapshot restores.
pub struct RestoredSession {
    pub grid: BubbleGrid,
    pub score: u32,
    pub level: u32,
    pub shots_until_drop: u32,
    pub shooter_current: BubbleKind,
    pub shooter_next: BubbleKind,
    pub charges: Vec<(PowerKind, u32)>,
}

impl SaveGame {
    /// Capture the running state.
    pub fn capture(
        grid: &BubbleGrid,
        score: &GameScore,
        counter: &DropCounter,
        queue: &LauncherQueue,
        inventory: &PowerUpInventory,
    ) -> Self {
        let powerups = PowerKind::ALL
            .into_iter()
            .map(|kind| (kind.name().to_string(), inventory.charges(kind)))
            .collect();

        Self {
            score: score.score,
            level: score.level,
            shots_until_drop: counter.shots_until_drop,
            grid: grid.to_cells(),
            shooter_current: queue.current.encode(),
            shooter_next: queue.next.encode(),
            powerups,
        }
    }

    /// Validate and decode the snapshot. `None` means the save is not usable
    /// with the current field constants and must be discarded.
    pub fn restore(&self) -> Option<RestoredSession> {
        let grid = BubbleGrid::from_cells(&self.grid)?;
        let shooter_current = BubbleKind::decode(self.shooter_current)?;
        let shooter_next = BubbleKind::decode(self.shooter_next)?;

        if self.level == 0 || self.shots_until_drop == 0 {
            return None;
        }

        let mut charges = Vec::new();
        for (name, count) in &self.powerups {
            // Unknown power names are tolerated; they may come from an older
            // build and restore as nothing.
            if let Some(kind) = PowerKind::from_name(name) {
                charges.push((kind, *count));
            }
        }

        Some(RestoredSession {
            grid,
            score: self.score,
            level: self.level,
            shots_until_drop: self.shots_until_drop,
            shooter_current,
            shooter_next,
            charges,
        })
    }
}

fn save_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("hexpop").join("save.json"))
}

/// Read and parse the save file, if any.
fn load_from_disk() -> Option<SaveGame> {
    let path = save_path()?;
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(save) => Some(save),
            Err(e) => {
                warn!("Failed to parse save file: {e}");
                None
            }
        },
        Err(e) => {
            warn!("Failed to read save file: {e}");
            None
        }
    }
}

fn write_to_disk(save: &SaveGame) {
    let Some(path) = save_path() else {
        warn!("Could not determine data directory for the save file");
        return;
    };

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create save directory: {e}");
        return;
    }

    match serde_json::to_string(save) {
        Ok(json) => match fs::write(&path, json) {
            Ok(()) => info!("Session saved to {path:?}"),
            Err(e) => warn!("Failed to write save file: {e}"),
        },
        Err(e) => warn!("Failed to serialize save file: {e}"),
    }
}

/// Remove the save file, if it exists.
pub(super) fn delete_save() {
    let Some(path) = save_path() else {
        return;
    };
    if path.exists()
        && let Err(e) = fs::remove_file(&path)
    {
        warn!("Failed to remove save file: {e}");
    }
}

/// Overwrite the fresh session with a saved one, when a valid save exists.
fn restore_session(
    mut grid: ResMut<BubbleGrid>,
    mut score: ResMut<GameScore>,
    mut counter: ResMut<DropCounter>,
    mut inventory: ResMut<PowerUpInventory>,
    mut queue: ResMut<LauncherQueue>,
) {
    let Some(save) = load_from_disk() else {
        return;
    };
    let Some(session) = save.restore() else {
        warn!("Save file does not match the current field layout, starting fresh");
        delete_save();
        return;
    };

    *grid = session.grid;
    score.score = session.score;
    score.level = session.level;
    counter.shots_until_drop = session.shots_until_drop;
    for (kind, charges) in session.charges {
        inventory.set_charges(kind, charges);
    }

    queue.current = session.shooter_current;
    queue.next = session.shooter_next;

    info!(
        "Session restored: score {}, level {}, {} bubbles on the field",
        score.score,
        score.level,
        grid.len()
    );
}

/// Persist the session on the way out. A finished game leaves no save
/// behind.
fn save_session(
    grid: Res<BubbleGrid>,
    score: Res<GameScore>,
    counter: Res<DropCounter>,
    inventory: Res<PowerUpInventory>,
    queue: Res<LauncherQueue>,
) {
    if score.over {
        delete_save();
        return;
    }

    let save = SaveGame::capture(&grid, &score, &counter, &queue, &inventory);
    write_to_disk(&save);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bubble::BubbleColor;
    use crate::game::hex::{COLS, GridPos, ROWS};
    use rand::{SeedableRng, rngs::StdRng};

    fn sample_state() -> (
        BubbleGrid,
        GameScore,
        DropCounter,
        LauncherQueue,
        PowerUpInventory,
    ) {
        let mut grid = BubbleGrid::default();
        grid.fill_initial(&mut StdRng::seed_from_u64(11));
        grid.set(GridPos::new(6, 1), BubbleKind::Rainbow);

        let score = GameScore {
            score: 1240,
            level: 3,
            bubbles_popped: 70,
            over: false,
        };

        let counter = DropCounter {
            shots_until_drop: 4,
            freeze_shots_remaining: 0,
        };

        let launcher = LauncherQueue {
            current: BubbleKind::Color(BubbleColor::Pink),
            next: BubbleKind::Rainbow,
        };

        let mut inventory = PowerUpInventory::default();
        inventory.add_charge(PowerKind::Bomb);
        inventory.add_charge(PowerKind::Bomb);
        inventory.add_charge(PowerKind::Freeze);

        (grid, score, counter, launcher, inventory)
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let (grid, score, counter, launcher, inventory) = sample_state();
        let save = SaveGame::capture(&grid, &score, &counter, &launcher, &inventory);

        let json = serde_json::to_string(&save).unwrap();
        let reread: SaveGame = serde_json::from_str(&json).unwrap();
        let session = reread.restore().unwrap();

        assert_eq!(session.grid.to_cells(), grid.to_cells());
        assert_eq!(session.score, 1240);
        assert_eq!(session.level, 3);
        assert_eq!(session.shots_until_drop, 4);
        assert_eq!(session.shooter_current, BubbleKind::Color(BubbleColor::Pink));
        assert_eq!(session.shooter_next, BubbleKind::Rainbow);

        let bombs = session
            .charges
            .iter()
            .find(|(kind, _)| *kind == PowerKind::Bomb)
            .unwrap();
        assert_eq!(bombs.1, 2);
    }

    #[test]
    fn snapshot_with_mismatched_grid_is_rejected() {
        let (grid, score, counter, launcher, inventory) = sample_state();
        let mut save = SaveGame::capture(&grid, &score, &counter, &launcher, &inventory);

        save.grid.push(vec![None; COLS]);
        assert!(save.restore().is_none());

        save.grid.truncate(ROWS - 2);
        assert!(save.restore().is_none());
    }

    #[test]
    fn snapshot_with_bad_shooter_color_is_rejected() {
        let (grid, score, counter, launcher, inventory) = sample_state();
        let mut save = SaveGame::capture(&grid, &score, &counter, &launcher, &inventory);

        save.shooter_current = 9;
        assert!(save.restore().is_none());
    }

    #[test]
    fn unknown_power_names_restore_as_nothing() {
        let (grid, score, counter, launcher, inventory) = sample_state();
        let mut save = SaveGame::capture(&grid, &score, &counter, &launcher, &inventory);

        save.powerups.insert("Tornado".to_string(), 5);
        let session = save.restore().unwrap();
        assert!(session.charges.iter().all(|(kind, _)| PowerKind::ALL.contains(kind)));
    }
}
