//! Replays real move sequences through both the tracker and shakmaty and
//! checks that the state the tracker is responsible for agrees after every ply.

use chess_core::{Color, PositionTracker};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingSide, Chess, Position};

fn to_shakmaty(color: Color) -> shakmaty::Color {
    match color {
        Color::White => shakmaty::Color::White,
        Color::Black => shakmaty::Color::Black,
    }
}

fn assert_agrees(moves: &[&str]) {
    let mut tracker = PositionTracker::new();
    let mut pos = Chess::default();

    for (ply, mv) in moves.iter().enumerate() {
        let uci: UciMove = mv.parse().expect("valid UCI");
        let legal = uci.to_move(&pos).unwrap_or_else(|_| panic!("illegal move {mv} at ply {ply}"));
        pos.play_unchecked(legal);
        assert!(tracker.apply(mv), "tracker rejected {mv} at ply {ply}");

        assert_eq!(
            tracker.placement_fen(),
            pos.board().to_string(),
            "placement differs after {mv} (ply {ply})"
        );
        let stm = tracker.side_to_move();
        assert_eq!(to_shakmaty(stm), pos.turn(), "turn differs after {mv}");
        assert_eq!(
            tracker.is_in_check(stm),
            pos.is_check(),
            "check state differs after {mv} (ply {ply})"
        );

        for color in [Color::White, Color::Black] {
            let rights = tracker.castling_rights_for(color);
            let castles = pos.castles();
            assert_eq!(
                rights.king_side,
                castles.has(to_shakmaty(color), CastlingSide::KingSide),
                "{color:?} king-side right differs after {mv}"
            );
            assert_eq!(
                rights.queen_side,
                castles.has(to_shakmaty(color), CastlingSide::QueenSide),
                "{color:?} queen-side right differs after {mv}"
            );
        }
    }
}

#[test]
fn test_en_passant_check_and_castling_game() {
    assert_agrees(&[
        "e2e4", "d7d5", "e4e5", "f7f5", "e5f6", "g7f6", "d1h5", "e8d7", "g1f3", "b8c6",
        "f1b5", "a7a6", "e1g1", "a6b5", "f1e1", "c6d4", "f3d4", "d8e8", "d4e6",
    ]);
}

#[test]
fn test_queen_side_castles_and_rook_moves() {
    assert_agrees(&[
        "d2d4", "d7d5", "c1f4", "c8f5", "b1c3", "b8c6", "d1d2", "d8d7", "e1c1", "a8d8",
        "h2h4", "h7h5", "h1h3", "h8h6",
    ]);
}

#[test]
fn test_fools_mate_is_check() {
    assert_agrees(&["f2f3", "e7e5", "g2g4", "d8h4"]);
}
