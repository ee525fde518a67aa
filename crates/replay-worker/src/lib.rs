//! Replays recorded chess games against a UCI engine and exports one
//! CSV row of engine and clock features per move.

pub use chess_core;

pub mod batch;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod replayer;
pub mod score;
pub mod sink;

pub use engine::{EngineOptions, EngineSession, SessionState};
pub use error::ReplayError;
pub use replayer::{replay_game, ReplayOptions, ReplaySummary};
pub use score::{Evaluation, MateScorePolicy, ScorePerspective};
pub use sink::{CsvSink, ResultRow, RowSink};
