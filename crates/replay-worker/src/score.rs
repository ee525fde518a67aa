//! Search results and how they become row scores.

use std::fmt;
use std::str::FromStr;

use chess_core::Color;

/// Outcome of one `go depth N` search.
///
/// Scores are as the engine reports them: relative to the side to move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Last centipawn score seen, 0 if none arrived
    pub centipawns: i32,
    /// Last mate distance seen
    pub mate_in: Option<i32>,
    /// The mate score came after the last centipawn score
    pub mate_is_latest: bool,
    pub best_move: String,
}

/// How a mate score is folded into the numeric evaluation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MateScorePolicy {
    /// Report the last centipawn value; mate lines are ignored
    #[default]
    Passthrough,
    /// Report +N when the side to move mates, -N when it is mated
    Sentinel(i32),
    /// Report pawns clamped to +/-cap; mates report the cap
    Pawns(f64),
}

impl MateScorePolicy {
    pub fn apply(&self, eval: &Evaluation) -> f64 {
        let mate = eval.mate_in.filter(|_| eval.mate_is_latest);
        match (*self, mate) {
            (Self::Passthrough, _) => f64::from(eval.centipawns),
            (Self::Sentinel(n), Some(m)) => f64::from(if m > 0 { n } else { -n }),
            (Self::Sentinel(_), None) => f64::from(eval.centipawns),
            (Self::Pawns(cap), Some(m)) => {
                if m > 0 {
                    cap
                } else {
                    -cap
                }
            }
            (Self::Pawns(cap), None) => (f64::from(eval.centipawns) / 100.0).clamp(-cap, cap),
        }
    }
}

impl FromStr for MateScorePolicy {
    type Err = String;

    /// `passthrough`, `sentinel:<N>` or `pawns:<CAP>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (s, None),
        };
        match (name.to_ascii_lowercase().as_str(), arg) {
            ("passthrough", None) => Ok(Self::Passthrough),
            ("sentinel", Some(n)) => n
                .parse()
                .map(Self::Sentinel)
                .map_err(|_| format!("invalid sentinel value {n:?}")),
            ("pawns", Some(cap)) => match cap.parse::<f64>() {
                Ok(cap) if cap > 0.0 => Ok(Self::Pawns(cap)),
                _ => Err(format!("invalid pawn cap {cap:?}")),
            },
            _ => Err(format!("unknown mate score policy {s:?}")),
        }
    }
}

impl fmt::Display for MateScorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passthrough => write!(f, "passthrough"),
            Self::Sentinel(n) => write!(f, "sentinel:{n}"),
            Self::Pawns(cap) => write!(f, "pawns:{cap}"),
        }
    }
}

/// Side a reported score is relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorePerspective {
    #[default]
    SideToMove,
    White,
}

impl ScorePerspective {
    /// Re-orient a side-to-move score
    pub fn orient(self, score: f64, side_to_move: Color) -> f64 {
        match (self, side_to_move) {
            (Self::White, Color::Black) => -score,
            _ => score,
        }
    }
}

impl FromStr for ScorePerspective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "side-to-move" | "side_to_move" | "stm" => Ok(Self::SideToMove),
            "white" => Ok(Self::White),
            other => Err(format!("unknown score perspective {other:?}")),
        }
    }
}
