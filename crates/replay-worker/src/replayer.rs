//! Replays one recorded game move by move.
//!
//! Each move is applied to the local tracker (castling rights and check
//! state) and sent to the engine (legal moves, evaluation, diagnostic),
//! then written out as one `ResultRow`. Every row's before-fields are the
//! previous row's after-fields.

use chess_core::{Color, GameRecord, PositionTracker};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::clock;
use crate::engine::EngineSession;
use crate::error::ReplayError;
use crate::score::{Evaluation, MateScorePolicy, ScorePerspective};
use crate::sink::{ResultRow, RowSink};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Legal moves in the starting position. Seeds the first row's
/// before-count and stands in for the after-count when the engine gives
/// no answer.
pub const INITIAL_LEGAL_MOVES: u32 = 20;

/// Per-game scoring and timing options
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOptions {
    /// Clock budget in deciseconds each side's first move is measured from
    pub initial_clock_ds: i64,
    pub mate_policy: MateScorePolicy,
    pub perspective: ScorePerspective,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            initial_clock_ds: 1800,
            mate_policy: MateScorePolicy::default(),
            perspective: ScorePerspective::default(),
        }
    }
}

impl ReplayOptions {
    /// Reported score for an evaluation of a position with `side_to_move` to play
    pub fn score(&self, eval: &Evaluation, side_to_move: Color) -> f64 {
        self.perspective
            .orient(self.mate_policy.apply(eval), side_to_move)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub game_id: String,
    pub rows: usize,
    /// Moves the local tracker could not apply
    pub rejected_moves: usize,
    /// Positions where the tracker's placement differed from the engine's
    pub diverged_positions: usize,
}

/// Replay `game` against `engine`, emitting one row per move into `sink`
pub async fn replay_game<W, R, S>(
    engine: &mut EngineSession<W, R>,
    game: &GameRecord,
    options: &ReplayOptions,
    sink: &mut S,
) -> Result<ReplaySummary, ReplayError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
    S: RowSink + ?Sized,
{
    info!(game_id = %game.game_id, moves = game.moves.len(), "Replaying game");

    let mut summary = ReplaySummary {
        game_id: game.game_id.clone(),
        ..Default::default()
    };
    let mut tracker = PositionTracker::new();

    // Baseline: the starting position
    let mut position_cmd = String::from("position startpos");
    engine.send(&position_cmd).await?;
    let baseline = engine.evaluate().await?;

    let mut eval_before = options.score(&baseline, Color::White);
    let mut check_before = tracker.is_in_check(Color::White);
    let mut legal_before = INITIAL_LEGAL_MOVES;
    let mut fen_before = STARTING_FEN.to_string();

    for (i, mv) in game.moves.iter().enumerate() {
        let mover = Color::for_ply(i);

        let applied = match tracker.try_apply(mv) {
            Ok(()) => true,
            Err(e) => {
                debug!(game_id = %game.game_id, index = i, error = %e, "Move not tracked locally");
                summary.rejected_moves += 1;
                false
            }
        };

        if i == 0 {
            position_cmd.push_str(" moves");
        }
        position_cmd.push(' ');
        position_cmd.push_str(mv);
        engine.send(&position_cmd).await?;

        let fen_after = engine.board_diagnostic().await?;

        let mut legal_after = INITIAL_LEGAL_MOVES;
        if engine.is_running() {
            legal_after = engine.count_legal_moves().await?;
        }

        let evaluation = engine.evaluate().await?;
        let eval_after = options.score(&evaluation, !mover);
        let check_after = applied && tracker.is_in_check(!mover);

        if applied && !placement_matches(&tracker, &fen_after) {
            summary.diverged_positions += 1;
            debug!(
                game_id = %game.game_id,
                index = i,
                tracker = %tracker.placement_fen(),
                engine = %fen_after,
                "Tracker placement differs from engine"
            );
        }

        let rights = tracker.castling_rights();
        let timing = clock::move_timing(game, i, options.initial_clock_ds);

        sink.emit(ResultRow {
            game_id: game.game_id.clone(),
            move_uci: mv.clone(),
            move_index: i,
            king_side_castle: rights.king_side,
            queen_side_castle: rights.queen_side,
            check_before,
            check_after,
            eval_delta: eval_after - eval_before,
            eval_before,
            eval_after,
            time_remaining: timing.time_remaining,
            opponent_time_spent: timing.opponent_time_spent,
            legal_moves_before: legal_before,
            legal_moves_after: legal_after,
            time_spent: timing.time_spent,
            fen_before: std::mem::take(&mut fen_before),
            fen_after: fen_after.clone(),
        })?;
        summary.rows += 1;

        eval_before = eval_after;
        check_before = check_after;
        legal_before = legal_after;
        fen_before = fen_after;
    }

    if summary.diverged_positions > 0 {
        warn!(
            game_id = %game.game_id,
            positions = summary.diverged_positions,
            "Local tracker diverged from engine"
        );
    }
    info!(
        game_id = %game.game_id,
        rows = summary.rows,
        rejected = summary.rejected_moves,
        "Game replayed"
    );
    Ok(summary)
}

/// Whether the placement field of an engine FEN matches the tracker.
/// An empty FEN (no engine answer) is not a mismatch.
fn placement_matches(tracker: &PositionTracker, fen: &str) -> bool {
    match fen.split_whitespace().next() {
        Some(placement) => placement == tracker.placement_fen(),
        None => true,
    }
}
