//! The bubble grid: a dense ROWS×COLS array of optional bubbles.
//!
//! A cell's occupancy is the only truth about presence; there is no
//! separate alive flag anywhere. Rows are fixed-length; the ceiling advance
//! shifts contents toward the bottom row but never resizes anything.

use bevy::prelude::*;
use rand::Rng;

use super::{
    bubble::BubbleKind,
    hex::{COLS, GridPos, ROWS},
};
use crate::screens::Screen;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<BubbleGrid>();
    app.register_type::<BubbleGrid>();

    app.add_systems(OnEnter(Screen::Gameplay), setup_grid);
    app.add_systems(OnExit(Screen::Gameplay), clear_grid);
}

/// Rows filled with random bubbles at the start of a game.
const INITIAL_ROWS: usize = 5;

/// The main grid resource.
#[derive(Resource, Debug, Clone, Reflect)]
#[reflect(Resource)]
pub struct BubbleGrid {
    #[reflect(ignore)]
    cells: Vec<Vec<Option<BubbleKind>>>,
}

impl Default for BubbleGrid {
    fn default() -> Self {
        Self {
            cells: vec![vec![None; COLS]; ROWS],
        }
    }
}

impl BubbleGrid {
    /// Whether a position lies inside the fixed field.
    pub fn in_bounds(pos: GridPos) -> bool {
        pos.row >= 0 && (pos.row as usize) < ROWS && pos.col >= 0 && (pos.col as usize) < COLS
    }

    /// The bubble at `pos`, if the position is in bounds and occupied.
    pub fn get(&self, pos: GridPos) -> Option<BubbleKind> {
        if !Self::in_bounds(pos) {
            return None;
        }
        self.cells[pos.row as usize][pos.col as usize]
    }

    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.get(pos).is_some()
    }

    /// Put a bubble into a cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: GridPos, kind: BubbleKind) {
        if Self::in_bounds(pos) {
            self.cells[pos.row as usize][pos.col as usize] = Some(kind);
        }
    }

    /// Empty a cell, returning what was there.
    pub fn clear(&mut self, pos: GridPos) -> Option<BubbleKind> {
        if !Self::in_bounds(pos) {
            return None;
        }
        self.cells[pos.row as usize][pos.col as usize].take()
    }

    /// Remove every bubble.
    pub fn clear_all(&mut self) {
        for row in &mut self.cells {
            row.fill(None);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|row| row.iter().all(Option::is_none))
    }

    pub fn len(&self) -> usize {
        self.cells
            .iter()
            .map(|row| row.iter().filter(|c| c.is_some()).count())
            .sum()
    }

    /// Iterate over all occupied cells in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (GridPos, BubbleKind)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, cell)| {
                cell.map(|kind| (GridPos::new(row as i32, col as i32), kind))
            })
        })
    }

    /// The occupied, in-bounds neighbors of a position.
    pub fn occupied_neighbors(&self, pos: GridPos) -> Vec<(GridPos, BubbleKind)> {
        pos.neighbors()
            .into_iter()
            .filter_map(|n| self.get(n).map(|kind| (n, kind)))
            .collect()
    }

    /// Fill the top rows for a fresh game.
    ///
    /// Odd rows leave their last column empty: the half-cell shift pushes
    /// that cell past the straight right edge of the block.
    pub fn fill_initial(&mut self, rng: &mut impl Rng) {
        self.clear_all();
        for row in 0..INITIAL_ROWS {
            for col in 0..COLS {
                if row % 2 == 1 && col == COLS - 1 {
                    continue;
                }
                self.cells[row][col] = Some(BubbleKind::random_color(rng));
            }
        }
    }

    /// The empty cell whose center is closest to a field position.
    ///
    /// Full scan over the grid: robust against physics overshoot, and cheap
    /// at this field size. Returns `None` only when the grid is packed solid.
    pub fn closest_empty_cell(&self, point: Vec2) -> Option<GridPos> {
        let mut best: Option<(GridPos, f32)> = None;

        for row in 0..ROWS as i32 {
            for col in 0..COLS as i32 {
                let pos = GridPos::new(row, col);
                if self.is_occupied(pos) {
                    continue;
                }
                let dist_sq = pos.center().distance_squared(point);
                if best.is_none_or(|(_, d)| dist_sq < d) {
                    best = Some((pos, dist_sq));
                }
            }
        }

        best.map(|(pos, _)| pos)
    }

    /// Whether the bottom row holds any bubble (the ceiling advance would
    /// push it out of the field).
    pub fn bottom_row_occupied(&self) -> bool {
        self.cells[ROWS - 1].iter().any(Option::is_some)
    }

    /// Ceiling advance: drop the bottom row and inject a fresh random row at
    /// the top. The injected row is always full width.
    pub fn shift_down(&mut self, rng: &mut impl Rng) {
        self.cells.pop();
        let fresh = (0..COLS)
            .map(|_| Some(BubbleKind::random_color(rng)))
            .collect();
        self.cells.insert(0, fresh);
    }

    /// Encode the grid for the save snapshot.
    pub fn to_cells(&self) -> Vec<Vec<Option<i8>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.map(BubbleKind::encode)).collect())
            .collect()
    }

    /// Decode a saved grid. Rejects snapshots whose dimensions do not match
    /// the fixed field or that contain values outside the palette.
    pub fn from_cells(cells: &[Vec<Option<i8>>]) -> Option<Self> {
        if cells.len() != ROWS || cells.iter().any(|row| row.len() != COLS) {
            return None;
        }

        let mut grid = Self::default();
        for (row, saved) in cells.iter().enumerate() {
            for (col, value) in saved.iter().enumerate() {
                grid.cells[row][col] = match value {
                    None => None,
                    Some(v) => Some(BubbleKind::decode(*v)?),
                };
            }
        }
        Some(grid)
    }
}

/// Fresh random field on entering gameplay. A valid save overrides this
/// afterwards (see the save module).
pub(super) fn setup_grid(mut grid: ResMut<BubbleGrid>) {
    grid.fill_initial(&mut rand::rng());
    info!("Grid filled with {} starting bubbles", grid.len());
}

pub(super) fn clear_grid(mut grid: ResMut<BubbleGrid>) {
    grid.clear_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bubble::BubbleColor;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn initial_fill_skips_last_column_of_odd_rows() {
        let mut grid = BubbleGrid::default();
        grid.fill_initial(&mut StdRng::seed_from_u64(7));

        for row in 0..INITIAL_ROWS as i32 {
            let last = GridPos::new(row, COLS as i32 - 1);
            if row % 2 == 1 {
                assert!(!grid.is_occupied(last), "odd row {row} should end short");
            } else {
                assert!(grid.is_occupied(last));
            }
        }
        for col in 0..COLS as i32 {
            assert!(!grid.is_occupied(GridPos::new(INITIAL_ROWS as i32, col)));
        }
    }

    #[test]
    fn closest_empty_cell_skips_occupied_cells() {
        let mut grid = BubbleGrid::default();
        let target = GridPos::new(0, 0);
        grid.set(target, BubbleKind::Color(BubbleColor::Red));

        let snapped = grid.closest_empty_cell(target.center()).unwrap();
        assert_ne!(snapped, target);
        assert!(!grid.is_occupied(snapped));
    }

    #[test]
    fn closest_empty_cell_on_a_full_grid_is_none() {
        let mut grid = BubbleGrid::default();
        for row in 0..ROWS as i32 {
            for col in 0..COLS as i32 {
                grid.set(GridPos::new(row, col), BubbleKind::Color(BubbleColor::Blue));
            }
        }
        assert_eq!(grid.closest_empty_cell(Vec2::new(100.0, 100.0)), None);
    }

    #[test]
    fn shift_down_injects_a_full_width_top_row() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 3), BubbleKind::Rainbow);

        grid.shift_down(&mut rng);

        // Old contents moved down one row.
        assert_eq!(grid.get(GridPos::new(1, 3)), Some(BubbleKind::Rainbow));
        // New top row has no gaps, including the last column.
        for col in 0..COLS as i32 {
            assert!(grid.is_occupied(GridPos::new(0, col)));
        }
    }

    #[test]
    fn shift_down_never_grows_the_field() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = BubbleGrid::default();
        for _ in 0..20 {
            grid.shift_down(&mut rng);
            assert_eq!(grid.to_cells().len(), ROWS);
        }
        assert!(grid.bottom_row_occupied());
    }

    #[test]
    fn snapshot_round_trips() {
        let mut grid = BubbleGrid::default();
        grid.fill_initial(&mut StdRng::seed_from_u64(42));
        grid.set(GridPos::new(6, 2), BubbleKind::Rainbow);

        let restored = BubbleGrid::from_cells(&grid.to_cells()).unwrap();
        assert_eq!(restored.to_cells(), grid.to_cells());
        assert_eq!(restored.get(GridPos::new(6, 2)), Some(BubbleKind::Rainbow));
    }

    #[test]
    fn snapshot_with_wrong_dimensions_is_rejected() {
        let short: Vec<Vec<Option<i8>>> = vec![vec![None; COLS]; ROWS - 1];
        assert!(BubbleGrid::from_cells(&short).is_none());

        let ragged: Vec<Vec<Option<i8>>> = (0..ROWS)
            .map(|r| vec![None; if r == 3 { COLS - 1 } else { COLS }])
            .collect();
        assert!(BubbleGrid::from_cells(&ragged).is_none());
    }

    #[test]
    fn snapshot_with_invalid_cell_value_is_rejected() {
        let mut cells: Vec<Vec<Option<i8>>> = vec![vec![None; COLS]; ROWS];
        cells[2][2] = Some(17);
        assert!(BubbleGrid::from_cells(&cells).is_none());
    }
}
