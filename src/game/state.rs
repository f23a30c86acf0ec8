//! Score, level, and the two game-over conditions.
//!
//! Scoring listens to the resolution messages; it never reaches into the
//! grid. The danger-line check is independent of the ceiling advance: any
//! settled bubble creeping within 50 px of the launcher ends the game, no
//! matter how it got there.

use bevy::prelude::*;

use super::{
    GameSet,
    cluster::{ClusterPopped, FloatingBubblesRemoved},
    grid::BubbleGrid,
    hex::LAUNCHER_Y,
    highscore::{HighScores, ScoreEntry},
    powerups::PowerDetonated,
};
use crate::{menus::Menu, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<GameScore>();
    app.register_type::<GameScore>();

    app.add_message::<GameOver>();

    app.add_systems(OnEnter(Screen::Gameplay), reset_score);

    app.add_systems(
        FixedUpdate,
        (update_score, check_danger_line, handle_game_over)
            .chain()
            .in_set(GameSet::Aftermath)
            .run_if(in_state(Screen::Gameplay)),
    );
}

/// Points per bubble in a popped cluster.
const MATCH_POINTS_PER_BUBBLE: u32 = 10;

/// Extra points per level on every cluster pop.
const MATCH_LEVEL_BONUS: u32 = 5;

/// Flat points per dropped floating bubble.
const FLOATING_POINTS: u32 = 20;

/// Score needed per level: the level rises once score crosses
/// `LEVEL_THRESHOLD * level`.
const LEVEL_THRESHOLD: u32 = 500;

/// Settled bubbles closer than this to the launcher end the game.
const DANGER_MARGIN: f32 = 50.0;

/// Message sent when either game-over condition fires.
#[derive(Message, Debug, Clone)]
pub struct GameOver;

/// Resource tracking the current run.
#[derive(Resource, Debug, Reflect)]
#[reflect(Resource)]
pub struct GameScore {
    pub score: u32,
    pub level: u32,
    pub bubbles_popped: u32,
    pub over: bool,
}

impl Default for GameScore {
    fn default() -> Self {
        Self {
            score: 0,
            level: 1,
            bubbles_popped: 0,
            over: false,
        }
    }
}

impl GameScore {
    /// Add points, then promote the level for every threshold crossed.
    pub fn award(&mut self, points: u32) {
        self.score += points;
        while self.score >= LEVEL_THRESHOLD * self.level {
            self.level += 1;
            info!("Level up! Now level {}", self.level);
        }
    }
}

pub(super) fn reset_score(mut score: ResMut<GameScore>) {
    *score = GameScore::default();
}

fn update_score(
    mut score: ResMut<GameScore>,
    mut popped_events: MessageReader<ClusterPopped>,
    mut floating_events: MessageReader<FloatingBubblesRemoved>,
    mut detonated_events: MessageReader<PowerDetonated>,
) {
    for event in popped_events.read() {
        let points = event.count as u32 * MATCH_POINTS_PER_BUBBLE + score.level * MATCH_LEVEL_BONUS;
        score.bubbles_popped += event.count as u32;
        score.award(points);
        info!(
            "Cluster of {} scored {points} (total {})",
            event.count, score.score
        );
    }

    for event in floating_events.read() {
        let points = event.count as u32 * FLOATING_POINTS;
        score.bubbles_popped += event.count as u32;
        score.award(points);
    }

    for event in detonated_events.read() {
        let points = event.count as u32 * event.kind.points_per_cell();
        score.bubbles_popped += event.count as u32;
        score.award(points);
    }
}

/// End the game once any settled bubble hangs too close to the launcher.
fn check_danger_line(grid: Res<BubbleGrid>, mut game_over_events: MessageWriter<GameOver>) {
    if !grid.is_changed() {
        return;
    }

    for (pos, _) in grid.occupied() {
        if pos.center().y > LAUNCHER_Y - DANGER_MARGIN {
            info!("Bubble at {pos} crossed the danger line");
            game_over_events.write(GameOver);
            return;
        }
    }
}

fn handle_game_over(
    mut game_over_events: MessageReader<GameOver>,
    mut score: ResMut<GameScore>,
    mut high_scores: ResMut<HighScores>,
    mut next_menu: ResMut<NextState<Menu>>,
) {
    if game_over_events.is_empty() {
        return;
    }
    game_over_events.clear();

    if score.over {
        return;
    }
    score.over = true;

    info!("GAME OVER, final score {}", score.score);

    let entry = ScoreEntry::new(score.score, score.level);
    if high_scores.add_score(entry) {
        info!("New high score!");
        high_scores.save();
    }

    next_menu.set(Menu::GameOver);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_monotone_and_levels_track_thresholds() {
        let mut score = GameScore::default();
        score.award(499);
        assert_eq!(score.level, 1);

        score.award(1);
        assert_eq!(score.score, 500);
        assert_eq!(score.level, 2);

        // A big award can cross several thresholds at once: 2000 clears the
        // level 2, 3, and 4 thresholds (1000, 1500, 2000).
        score.award(1500);
        assert_eq!(score.score, 2000);
        assert_eq!(score.level, 5);
    }

    #[test]
    fn match_points_follow_the_size_and_level_formula() {
        let mut score = GameScore::default();
        // A 3-match at level 1 is worth 3*10 + 1*5.
        let points = 3 * MATCH_POINTS_PER_BUBBLE + score.level * MATCH_LEVEL_BONUS;
        score.award(points);
        assert_eq!(score.score, 35);
    }
}
