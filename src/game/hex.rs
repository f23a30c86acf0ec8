//! Offset coordinates for the bubble field.
//!
//! The field is a rectangular array where every odd row is shifted right by
//! one bubble radius, the classic "brick" bubble-shooter layout. Row parity
//! decides both the pixel offset and which of the two neighbor tables
//! applies, so all adjacency math lives here.

use bevy::prelude::*;

/// Radius of one bubble in field pixels.
pub const BUBBLE_RADIUS: f32 = 25.0;

/// Vertical spacing ratio between rows (√3, hex packing).
pub const ROW_SPACING: f32 = 1.732;

/// Number of rows in the field.
pub const ROWS: usize = 14;

/// Number of columns in the field.
pub const COLS: usize = 12;

/// Pixel width of the playfield.
///
/// Odd rows are shifted right by one radius, so the widest row ends at
/// `(COLS - 1) * 2R + R + R + R` = 12 * 50 + 25 = 625.
pub const FIELD_WIDTH: f32 = 625.0;

/// Pixel height of the playfield, launcher included.
pub const FIELD_HEIGHT: f32 = 800.0;

/// Y position of the launcher in field pixels (field y grows downward).
pub const LAUNCHER_Y: f32 = 750.0;

/// Neighbor offsets `(row, col)` for even rows.
const EVEN_ROW_NEIGHBORS: [(i32, i32); 6] =
    [(-1, -1), (-1, 0), (0, -1), (0, 1), (1, -1), (1, 0)];

/// Neighbor offsets `(row, col)` for odd rows (shifted right by half a cell).
const ODD_ROW_NEIGHBORS: [(i32, i32); 6] = [(-1, 0), (-1, 1), (0, -1), (0, 1), (1, 0), (1, 1)];

/// A cell position in the field. `row` increases downward, `col` to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub struct GridPos {
    pub row: i32,
    pub col: i32,
}

impl GridPos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Whether this position sits on an odd (right-shifted) row.
    #[inline]
    pub const fn odd_row(&self) -> bool {
        self.row % 2 != 0
    }

    /// Pixel center of this cell in field coordinates (y grows downward).
    pub fn center(&self) -> Vec2 {
        let shift = if self.odd_row() { BUBBLE_RADIUS } else { 0.0 };
        Vec2::new(
            self.col as f32 * BUBBLE_RADIUS * 2.0 + BUBBLE_RADIUS + shift,
            self.row as f32 * BUBBLE_RADIUS * ROW_SPACING + BUBBLE_RADIUS,
        )
    }

    /// The six surrounding positions, parity table applied.
    ///
    /// Out-of-bounds positions are included; callers bounds-check through the
    /// grid.
    pub fn neighbors(&self) -> [GridPos; 6] {
        let table = if self.odd_row() {
            &ODD_ROW_NEIGHBORS
        } else {
            &EVEN_ROW_NEIGHBORS
        };

        let mut out = [*self; 6];
        for (slot, (dr, dc)) in out.iter_mut().zip(table) {
            *slot = GridPos::new(self.row + dr, self.col + dc);
        }
        out
    }
}

impl std::fmt::Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Convert field coordinates (origin top-left, y down) to world coordinates
/// (origin at field center, y up). The simulation runs entirely in field
/// space; only visuals go through this.
pub fn field_to_world(p: Vec2) -> Vec2 {
    Vec2::new(p.x - FIELD_WIDTH * 0.5, FIELD_HEIGHT * 0.5 - p.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_row_has_no_pixel_shift() {
        let pos = GridPos::new(0, 0);
        assert_eq!(pos.center(), Vec2::new(BUBBLE_RADIUS, BUBBLE_RADIUS));
    }

    #[test]
    fn odd_row_shifts_right_by_one_radius() {
        let even = GridPos::new(2, 3).center();
        let odd = GridPos::new(3, 3).center();
        assert_eq!(odd.x - even.x, BUBBLE_RADIUS);
    }

    #[test]
    fn row_spacing_uses_hex_packing_ratio() {
        let a = GridPos::new(0, 0).center();
        let b = GridPos::new(1, 0).center();
        assert!((b.y - a.y - BUBBLE_RADIUS * ROW_SPACING).abs() < 1e-4);
    }

    #[test]
    fn neighbor_tables_differ_by_parity() {
        let even: Vec<_> = GridPos::new(2, 4).neighbors().into_iter().collect();
        assert!(even.contains(&GridPos::new(1, 3)));
        assert!(even.contains(&GridPos::new(3, 3)));
        assert!(!even.contains(&GridPos::new(1, 5)));

        let odd: Vec<_> = GridPos::new(3, 4).neighbors().into_iter().collect();
        assert!(odd.contains(&GridPos::new(2, 5)));
        assert!(odd.contains(&GridPos::new(4, 5)));
        assert!(!odd.contains(&GridPos::new(2, 3)));
    }

    #[test]
    fn adjacency_is_symmetric_across_the_whole_field() {
        for row in 0..ROWS as i32 {
            for col in 0..COLS as i32 {
                let pos = GridPos::new(row, col);
                for neighbor in pos.neighbors() {
                    if neighbor.row < 0
                        || neighbor.row >= ROWS as i32
                        || neighbor.col < 0
                        || neighbor.col >= COLS as i32
                    {
                        continue;
                    }
                    assert!(
                        neighbor.neighbors().contains(&pos),
                        "{pos} -> {neighbor} is not symmetric"
                    );
                }
            }
        }
    }

    #[test]
    fn neighbors_are_within_contact_distance() {
        // Every neighbor center must sit within one bubble diameter, with a
        // little slack for the vertical packing ratio.
        let pos = GridPos::new(5, 5);
        for neighbor in pos.neighbors() {
            let dist = pos.center().distance(neighbor.center());
            assert!(dist <= BUBBLE_RADIUS * 2.0 + 0.5, "{neighbor} too far: {dist}");
        }
    }
}
