//! Per-move timing reconstructed from clock samples.
//!
//! Each side's list holds the clock reading taken after each of its moves,
//! in deciseconds. Time spent on a move is the drop from the previous
//! reading (or from the initial budget for a side's first move).

use chess_core::{Color, GameRecord};
use tracing::debug;

/// Seconds per raw clock unit
pub const CLOCK_SCALE: f64 = 0.1;

/// Timing fields of one result row, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveTiming {
    pub time_remaining: f64,
    pub time_spent: f64,
    /// Time the opponent spent on the preceding move
    pub opponent_time_spent: f64,
}

/// Raw time spent on ply `index`, if the log has the sample
pub fn raw_time_spent(game: &GameRecord, index: usize, initial_clock: i64) -> Option<i64> {
    let clock = game.clock(Color::for_ply(index));
    let own = index / 2;
    let current = *clock.get(own)?;
    let previous = match own {
        0 => initial_clock,
        _ => clock[own - 1],
    };
    Some(previous - current)
}

/// Timing for ply `index`. Without the mover's own sample the whole
/// computation is skipped and every field is zero; a missing opponent
/// sample zeroes only `opponent_time_spent`.
pub fn move_timing(game: &GameRecord, index: usize, initial_clock: i64) -> MoveTiming {
    let Some(remaining) = game.clock_after(index) else {
        debug!(game_id = %game.game_id, index, "No clock sample for move, timing skipped");
        return MoveTiming::default();
    };
    let spent = raw_time_spent(game, index, initial_clock);
    let opponent = match index {
        0 => Some(0),
        _ => raw_time_spent(game, index - 1, initial_clock),
    };
    if opponent.is_none() {
        debug!(game_id = %game.game_id, index, "No clock sample for opponent's move");
    }

    MoveTiming {
        time_remaining: scale(Some(remaining)),
        time_spent: scale(spent),
        opponent_time_spent: scale(opponent),
    }
}

fn scale(raw: Option<i64>) -> f64 {
    raw.map_or(0.0, |ds| ds as f64 * CLOCK_SCALE)
}
