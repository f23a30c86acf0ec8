//! The shrinking-ceiling pressure mechanic.
//!
//! Every resolved shot ticks the drop counter down; at zero the whole field
//! shifts one row toward the launcher and a fresh row rolls in at the top.
//! The freeze power suspends the counter for a handful of shots.

use bevy::prelude::*;

use super::{GameSet, grid::BubbleGrid, projectile::BubbleAttached, state::GameOver};
use crate::screens::Screen;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<DropCounter>();
    app.register_type::<DropCounter>();

    app.add_message::<CeilingAdvanced>();

    app.add_systems(OnEnter(Screen::Gameplay), reset_drop_counter);

    app.add_systems(
        FixedUpdate,
        tick_drop_counter
            .in_set(GameSet::Pressure)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Shots between ceiling advances.
pub const SHOTS_PER_DROP: u32 = 6;

/// Shots the freeze power suspends the counter for.
pub const FREEZE_SHOTS: u32 = 5;

/// Countdown to the next ceiling advance, plus the freeze suspension.
#[derive(Resource, Debug, Clone, Reflect)]
#[reflect(Resource)]
pub struct DropCounter {
    pub shots_until_drop: u32,
    pub freeze_shots_remaining: u32,
}

impl Default for DropCounter {
    fn default() -> Self {
        Self {
            shots_until_drop: SHOTS_PER_DROP,
            freeze_shots_remaining: 0,
        }
    }
}

impl DropCounter {
    /// Account for one resolved shot. Returns true when the counter ran out
    /// and the ceiling must advance (the counter resets itself).
    pub fn on_shot_resolved(&mut self) -> bool {
        if self.freeze_shots_remaining > 0 {
            self.freeze_shots_remaining -= 1;
            return false;
        }

        self.shots_until_drop -= 1;
        if self.shots_until_drop == 0 {
            self.shots_until_drop = SHOTS_PER_DROP;
            return true;
        }
        false
    }
}

/// Message sent when the field shifts down one row.
#[derive(Message, Debug, Clone)]
pub struct CeilingAdvanced;

pub(super) fn reset_drop_counter(mut counter: ResMut<DropCounter>) {
    *counter = DropCounter::default();
}

/// Tick the counter per attachment; on zero, advance the ceiling. The
/// overflow check comes first: with the bottom row already occupied the
/// shift has nowhere to go and the game ends instead.
fn tick_drop_counter(
    mut counter: ResMut<DropCounter>,
    mut grid: ResMut<BubbleGrid>,
    mut attached_events: MessageReader<BubbleAttached>,
    mut advanced_events: MessageWriter<CeilingAdvanced>,
    mut game_over_events: MessageWriter<GameOver>,
) {
    for _ in attached_events.read() {
        if !counter.on_shot_resolved() {
            continue;
        }

        if grid.bottom_row_occupied() {
            info!("Ceiling advance would overflow the field, game over");
            game_over_events.write(GameOver);
            continue;
        }

        grid.shift_down(&mut rand::rng());
        info!("Ceiling advanced, fresh row injected");
        advanced_events.write(CeilingAdvanced);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_decrements_once_per_shot_and_resets_at_zero() {
        let mut counter = DropCounter::default();

        for expected in (1..SHOTS_PER_DROP).rev() {
            assert!(!counter.on_shot_resolved());
            assert_eq!(counter.shots_until_drop, expected);
        }

        // The shot that reaches zero reports the advance and resets.
        assert!(counter.on_shot_resolved());
        assert_eq!(counter.shots_until_drop, SHOTS_PER_DROP);
    }

    #[test]
    fn the_final_shot_injects_a_row_and_resets() {
        use crate::game::grid::BubbleGrid;
        use rand::{SeedableRng, rngs::StdRng};

        let mut counter = DropCounter {
            shots_until_drop: 1,
            freeze_shots_remaining: 0,
        };
        let mut grid = BubbleGrid::default();

        assert!(counter.on_shot_resolved());
        assert!(!grid.bottom_row_occupied());
        grid.shift_down(&mut StdRng::seed_from_u64(1));

        assert_eq!(counter.shots_until_drop, SHOTS_PER_DROP);
        assert_eq!(
            grid.to_cells()[0].iter().filter(|c| c.is_some()).count(),
            crate::game::hex::COLS
        );
    }

    #[test]
    fn freeze_suspends_the_countdown() {
        let mut counter = DropCounter::default();
        counter.freeze_shots_remaining = FREEZE_SHOTS;

        for _ in 0..FREEZE_SHOTS {
            assert!(!counter.on_shot_resolved());
            assert_eq!(counter.shots_until_drop, SHOTS_PER_DROP);
        }
        assert_eq!(counter.freeze_shots_remaining, 0);

        // Thawed: the countdown resumes.
        assert!(!counter.on_shot_resolved());
        assert_eq!(counter.shots_until_drop, SHOTS_PER_DROP - 1);
    }
}
