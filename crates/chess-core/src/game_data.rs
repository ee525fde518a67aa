use serde::{Deserialize, Serialize};

use crate::position::Color;

/// A recorded game as decoded from a game log
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub moves: Vec<String>, // coordinate notation
    /// Clock readings in deciseconds, one after each white move
    pub white_clock: Vec<i64>,
    /// Clock readings in deciseconds, one after each black move
    pub black_clock: Vec<i64>,
}

impl GameRecord {
    pub fn clock(&self, color: Color) -> &[i64] {
        match color {
            Color::White => &self.white_clock,
            Color::Black => &self.black_clock,
        }
    }

    /// Clock reading taken after ply `index`, if the log has it
    pub fn clock_after(&self, index: usize) -> Option<i64> {
        self.clock(Color::for_ply(index)).get(index / 2).copied()
    }
}
