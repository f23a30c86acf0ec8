//! Match detection and the attachment resolution pipeline.
//!
//! All three searches are iterative flood fills (explicit deque + visited
//! set) over the parity-aware neighbor relation:
//! - same-color match fill, with the rainbow wildcard acting as a transparent
//!   pass-through,
//! - ceiling connectivity, seeded from every occupied top-row cell,
//! - local cluster, seeded from a single cell, used for the support-loss rule.

use bevy::prelude::*;
use rand::Rng;
use std::collections::{HashSet, VecDeque};

use super::{
    GameSet,
    bubble::{BubbleColor, BubbleKind},
    grid::BubbleGrid,
    hex::{COLS, GridPos},
    powerups::{
        ActivePower, PowerCollected, PowerDetonated, PowerKind, PowerUpInventory,
        apply_area_effect, roll_power_drop,
    },
    projectile::BubbleAttached,
};
use crate::{audio::sound_effect, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.add_message::<ClusterPopped>();
    app.add_message::<FloatingBubblesRemoved>();

    app.add_systems(
        FixedUpdate,
        resolve_attachment
            .in_set(GameSet::Resolve)
            .run_if(in_state(Screen::Gameplay)),
    );

    app.add_systems(
        Update,
        play_resolution_cues.run_if(in_state(Screen::Gameplay)),
    );
}

/// Minimum connected same-color group that pops.
pub const MIN_MATCH_SIZE: usize = 3;

/// Cluster size that counts as a combo for the sound cue.
const COMBO_MATCH_SIZE: usize = 6;

/// Floating-drop count that counts as a combo for the sound cue.
const COMBO_FLOATING_SIZE: usize = 3;

/// Message sent when a same-color cluster pops.
#[derive(Message, Debug, Clone)]
pub struct ClusterPopped {
    pub cells: Vec<(GridPos, BubbleKind)>,
    pub color: BubbleColor,
    pub count: usize,
}

/// Message sent when bubbles with no path to the ceiling are dropped.
#[derive(Message, Debug, Clone)]
pub struct FloatingBubblesRemoved {
    pub cells: Vec<(GridPos, BubbleKind)>,
    pub count: usize,
}

/// Flood fill for bubbles matching `target`, starting at an occupied cell.
///
/// A cell matches if it holds the target color or the rainbow wildcard.
/// Wildcards pass the fill through without redefining the search color, so a
/// red search stays a red search on the far side of a rainbow.
pub fn find_matching(grid: &BubbleGrid, start: GridPos, target: BubbleColor) -> HashSet<GridPos> {
    let mut matched = HashSet::new();
    if !grid.is_occupied(start) {
        return matched;
    }

    let mut queue = VecDeque::new();
    matched.insert(start);
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        for (neighbor, kind) in grid.occupied_neighbors(pos) {
            if matched.contains(&neighbor) {
                continue;
            }
            let hit = match kind {
                BubbleKind::Color(color) => color == target,
                BubbleKind::Rainbow => true,
            };
            if hit {
                matched.insert(neighbor);
                queue.push_back(neighbor);
            }
        }
    }

    matched
}

/// Every occupied cell reachable from the top row through occupied neighbors.
pub fn connected_to_ceiling(grid: &BubbleGrid) -> HashSet<GridPos> {
    let mut connected = HashSet::new();
    let mut queue = VecDeque::new();

    for col in 0..COLS as i32 {
        let pos = GridPos::new(0, col);
        if grid.is_occupied(pos) {
            connected.insert(pos);
            queue.push_back(pos);
        }
    }

    while let Some(pos) = queue.pop_front() {
        for (neighbor, _) in grid.occupied_neighbors(pos) {
            if connected.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    connected
}

/// The occupied cells connected to `start`, color ignored.
pub fn find_cluster(grid: &BubbleGrid, start: GridPos) -> HashSet<GridPos> {
    let mut cluster = HashSet::new();
    if !grid.is_occupied(start) {
        return cluster;
    }

    let mut queue = VecDeque::new();
    cluster.insert(start);
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        for (neighbor, _) in grid.occupied_neighbors(pos) {
            if cluster.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    cluster
}

/// Clear every occupied cell without a path to the ceiling.
pub fn remove_floating(grid: &mut BubbleGrid) -> Vec<(GridPos, BubbleKind)> {
    let anchored = connected_to_ceiling(grid);

    let floating: Vec<(GridPos, BubbleKind)> = grid
        .occupied()
        .filter(|(pos, _)| !anchored.contains(pos))
        .collect();

    for (pos, _) in &floating {
        grid.clear(*pos);
    }

    floating
}

fn clear_cells(grid: &mut BubbleGrid, cells: &HashSet<GridPos>) -> Vec<(GridPos, BubbleKind)> {
    let mut cleared = Vec::with_capacity(cells.len());
    for pos in cells {
        if let Some(kind) = grid.clear(*pos) {
            cleared.push((*pos, kind));
        }
    }
    cleared
}

/// What one resolved shot did to the grid.
#[derive(Debug, Default)]
pub struct ShotOutcome {
    /// A popped match: its color and cleared cells.
    pub popped: Option<(BubbleColor, Vec<(GridPos, BubbleKind)>)>,
    /// Bubbles that lost their path to the ceiling and dropped.
    pub floating: Vec<(GridPos, BubbleKind)>,
    /// An armed power that went off: its kind and cleared cells.
    pub detonated: Option<(PowerKind, Vec<(GridPos, BubbleKind)>)>,
    /// A power charge awarded by the drop roll.
    pub collected: Option<PowerKind>,
}

/// Resolve one attachment: power effect, or match check, or support-loss
/// check, in that priority order. An armed area power replaces match
/// checking entirely for this shot.
pub fn resolve_shot(
    grid: &mut BubbleGrid,
    inventory: &mut PowerUpInventory,
    armed: &mut Option<PowerKind>,
    impact: GridPos,
    kind: BubbleKind,
    rng: &mut impl Rng,
) -> ShotOutcome {
    let mut outcome = ShotOutcome::default();

    // Every resolved shot ages every power cooldown by one.
    inventory.tick_cooldowns();

    if let Some(power) = armed.take() {
        let cells = apply_area_effect(grid, power, impact);
        outcome.detonated = Some((power, cells));
        outcome.floating = remove_floating(grid);
        return outcome;
    }

    let target = match kind {
        BubbleKind::Color(color) => color,
        // An unresolved wildcard has no search color; it just sits there
        // until a neighboring search sweeps it up.
        BubbleKind::Rainbow => {
            outcome.floating = drop_unsupported_neighbors(grid, impact);
            return outcome;
        }
    };

    let matched = find_matching(grid, impact, target);
    if matched.len() >= MIN_MATCH_SIZE {
        let cells = clear_cells(grid, &matched);

        if let Some(power) = roll_power_drop(cells.len(), rng) {
            inventory.add_charge(power);
            outcome.collected = Some(power);
        }

        outcome.popped = Some((target, cells));
        outcome.floating = remove_floating(grid);
    } else {
        outcome.floating = drop_unsupported_neighbors(grid, impact);
    }

    outcome
}

/// The no-match rule: an attachment can still knock things loose. Any direct
/// neighbor of the impact cell with no remaining path to the ceiling takes
/// its whole local cluster down with it.
fn drop_unsupported_neighbors(grid: &mut BubbleGrid, impact: GridPos) -> Vec<(GridPos, BubbleKind)> {
    let anchored = connected_to_ceiling(grid);
    let mut dropped = Vec::new();

    for (neighbor, _) in grid.occupied_neighbors(impact) {
        if anchored.contains(&neighbor) || !grid.is_occupied(neighbor) {
            continue;
        }
        for pos in find_cluster(grid, neighbor) {
            if let Some(kind) = grid.clear(pos) {
                dropped.push((pos, kind));
            }
        }
    }

    dropped
}

/// Drain attachment events through [`resolve_shot`] and fan the outcomes out
/// as messages.
fn resolve_attachment(
    mut grid: ResMut<BubbleGrid>,
    mut inventory: ResMut<PowerUpInventory>,
    mut active: ResMut<ActivePower>,
    mut attached_events: MessageReader<BubbleAttached>,
    mut popped_events: MessageWriter<ClusterPopped>,
    mut floating_events: MessageWriter<FloatingBubblesRemoved>,
    mut detonated_events: MessageWriter<PowerDetonated>,
    mut collected_events: MessageWriter<PowerCollected>,
) {
    for event in attached_events.read() {
        let outcome = resolve_shot(
            &mut grid,
            &mut inventory,
            &mut active.0,
            event.pos,
            event.kind,
            &mut rand::rng(),
        );

        if let Some((power, cells)) = outcome.detonated {
            info!("{} detonated, {} bubbles cleared", power.name(), cells.len());
            detonated_events.write(PowerDetonated {
                kind: power,
                impact: event.pos,
                count: cells.len(),
                cells,
            });
        }

        if let Some((color, cells)) = outcome.popped {
            info!("Popped {} {color:?} bubbles at {}", cells.len(), event.pos);
            popped_events.write(ClusterPopped {
                color,
                count: cells.len(),
                cells,
            });
        }

        if let Some(power) = outcome.collected {
            collected_events.write(PowerCollected { kind: power });
        }

        if !outcome.floating.is_empty() {
            info!("{} bubbles dropped after the shot at {}", outcome.floating.len(), event.pos);
            floating_events.write(FloatingBubblesRemoved {
                count: outcome.floating.len(),
                cells: outcome.floating,
            });
        }
    }
}

/// Sound cues for the resolution messages: a burst per destroyed bubble
/// batch, a clear chime for matches, a combo sting for the big ones.
fn play_resolution_cues(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut popped_events: MessageReader<ClusterPopped>,
    mut floating_events: MessageReader<FloatingBubblesRemoved>,
    mut detonated_events: MessageReader<PowerDetonated>,
) {
    let mut bursts = 0usize;
    let mut clear = false;
    let mut combo = false;

    for event in popped_events.read() {
        bursts += event.count;
        clear = true;
        combo |= event.count >= COMBO_MATCH_SIZE;
    }
    for event in floating_events.read() {
        bursts += event.count;
        combo |= event.count >= COMBO_FLOATING_SIZE;
    }
    for event in detonated_events.read() {
        bursts += event.count;
        combo |= event.count > 0;
    }

    for _ in 0..bursts.min(5) {
        let burst = asset_server.load("audio/sound_effects/burst.ogg");
        commands.spawn(sound_effect(burst));
    }
    if clear {
        let chime = asset_server.load("audio/sound_effects/clear.ogg");
        commands.spawn(sound_effect(chime));
    }
    if combo {
        let sting = asset_server.load("audio/sound_effects/combo.ogg");
        commands.spawn(sound_effect(sting));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn color(c: BubbleColor) -> BubbleKind {
        BubbleKind::Color(c)
    }

    #[test]
    fn match_fill_finds_connected_same_color_group() {
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 0), color(BubbleColor::Red));
        grid.set(GridPos::new(0, 1), color(BubbleColor::Red));
        grid.set(GridPos::new(0, 2), color(BubbleColor::Red));
        grid.set(GridPos::new(0, 3), color(BubbleColor::Blue));

        let matched = find_matching(&grid, GridPos::new(0, 0), BubbleColor::Red);
        assert_eq!(matched.len(), 3);
        assert!(!matched.contains(&GridPos::new(0, 3)));
    }

    #[test]
    fn match_fill_passes_through_rainbow_keeping_the_search_color() {
        // red, rainbow, red, then a green on the far side: the fill must
        // cross the wildcard and keep matching red, not green.
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 0), color(BubbleColor::Red));
        grid.set(GridPos::new(0, 1), BubbleKind::Rainbow);
        grid.set(GridPos::new(0, 2), color(BubbleColor::Red));
        grid.set(GridPos::new(0, 3), color(BubbleColor::Green));

        let matched = find_matching(&grid, GridPos::new(0, 0), BubbleColor::Red);
        assert!(matched.contains(&GridPos::new(0, 1)));
        assert!(matched.contains(&GridPos::new(0, 2)));
        assert!(!matched.contains(&GridPos::new(0, 3)));
    }

    #[test]
    fn ceiling_connectivity_covers_everything_anchored() {
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 5), color(BubbleColor::Cyan));
        grid.set(GridPos::new(1, 5), color(BubbleColor::Red));
        grid.set(GridPos::new(2, 5), color(BubbleColor::Green));
        // Island with no path up.
        grid.set(GridPos::new(7, 2), color(BubbleColor::Blue));
        grid.set(GridPos::new(7, 3), color(BubbleColor::Blue));

        let anchored = connected_to_ceiling(&grid);
        assert_eq!(anchored.len(), 3);
        assert!(!anchored.contains(&GridPos::new(7, 2)));
    }

    #[test]
    fn remove_floating_leaves_no_disconnected_cell_behind() {
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 0), color(BubbleColor::Red));
        grid.set(GridPos::new(1, 0), color(BubbleColor::Green));
        grid.set(GridPos::new(9, 9), color(BubbleColor::Blue));
        grid.set(GridPos::new(9, 10), color(BubbleColor::Pink));

        let dropped = remove_floating(&mut grid);
        assert_eq!(dropped.len(), 2);

        let anchored = connected_to_ceiling(&grid);
        for (pos, _) in grid.occupied() {
            assert!(anchored.contains(&pos), "{pos} survived disconnected");
        }
    }

    #[test]
    fn small_groups_are_not_a_match() {
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 0), color(BubbleColor::Red));
        grid.set(GridPos::new(0, 1), color(BubbleColor::Red));

        let matched = find_matching(&grid, GridPos::new(0, 0), BubbleColor::Red);
        assert!(matched.len() < MIN_MATCH_SIZE);
    }

    #[test]
    fn attaching_the_third_red_clears_the_row() {
        // Two reds on the top row; the shot lands next to them.
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 0), color(BubbleColor::Red));
        grid.set(GridPos::new(0, 1), color(BubbleColor::Red));
        grid.set(GridPos::new(0, 2), color(BubbleColor::Red));

        let mut inventory = PowerUpInventory::default();
        let mut armed = None;
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);

        let outcome = resolve_shot(
            &mut grid,
            &mut inventory,
            &mut armed,
            GridPos::new(0, 2),
            color(BubbleColor::Red),
            &mut rng,
        );

        let (popped_color, cells) = outcome.popped.expect("three reds must pop");
        assert_eq!(popped_color, BubbleColor::Red);
        assert_eq!(cells.len(), 3);
        assert!(grid.is_empty());
    }

    #[test]
    fn a_pair_pops_nothing() {
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 0), color(BubbleColor::Red));
        grid.set(GridPos::new(0, 1), color(BubbleColor::Red));

        let mut inventory = PowerUpInventory::default();
        let mut armed = None;
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);

        let outcome = resolve_shot(
            &mut grid,
            &mut inventory,
            &mut armed,
            GridPos::new(0, 1),
            color(BubbleColor::Red),
            &mut rng,
        );

        assert!(outcome.popped.is_none());
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn an_armed_bomb_replaces_match_checking() {
        // Three greens in a row would normally pop; with the bomb armed the
        // shot clears the 3x3 block instead and the match logic never runs.
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(0, 4), color(BubbleColor::Green));
        grid.set(GridPos::new(0, 5), color(BubbleColor::Green));
        grid.set(GridPos::new(1, 4), color(BubbleColor::Green));
        // The shot itself, already committed at the impact cell.
        grid.set(GridPos::new(1, 5), color(BubbleColor::Green));
        // Out of bomb range, still anchored through row 0.
        grid.set(GridPos::new(0, 8), color(BubbleColor::Pink));

        let mut inventory = PowerUpInventory::default();
        let mut armed = Some(PowerKind::Bomb);
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);

        let outcome = resolve_shot(
            &mut grid,
            &mut inventory,
            &mut armed,
            GridPos::new(1, 5),
            color(BubbleColor::Green),
            &mut rng,
        );

        assert!(outcome.popped.is_none());
        let (kind, cells) = outcome.detonated.expect("bomb must detonate");
        assert_eq!(kind, PowerKind::Bomb);
        assert_eq!(cells.len(), 4);
        assert!(armed.is_none());
        assert!(grid.is_occupied(GridPos::new(0, 8)));
    }

    #[test]
    fn a_dead_end_shot_drops_clusters_it_cannot_hold() {
        // A two-bubble island hangs mid-field (as after a power detonation
        // elsewhere); the shot lands beside it without making a match, and
        // the whole unsupported cluster goes.
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(6, 4), color(BubbleColor::Cyan));
        grid.set(GridPos::new(6, 5), color(BubbleColor::Pink));

        let mut inventory = PowerUpInventory::default();
        let mut armed = None;
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);

        // The shot itself snaps in at (6, 6), adjacent to the island.
        grid.set(GridPos::new(6, 6), color(BubbleColor::Red));
        let outcome = resolve_shot(
            &mut grid,
            &mut inventory,
            &mut armed,
            GridPos::new(6, 6),
            color(BubbleColor::Red),
            &mut rng,
        );

        assert!(outcome.popped.is_none());
        // Both island bubbles and the shot connected through them drop.
        assert_eq!(outcome.floating.len(), 3);
        assert!(grid.is_empty());
    }

    #[test]
    fn local_cluster_ignores_color() {
        let mut grid = BubbleGrid::default();
        grid.set(GridPos::new(5, 5), color(BubbleColor::Red));
        grid.set(GridPos::new(5, 6), color(BubbleColor::Green));
        grid.set(GridPos::new(5, 7), BubbleKind::Rainbow);

        let cluster = find_cluster(&grid, GridPos::new(5, 6));
        assert_eq!(cluster.len(), 3);
    }
}
