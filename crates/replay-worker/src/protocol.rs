//! UCI response scraping.
//!
//! Pure functions and line collectors for the engine's text output. The
//! engine session feeds them one line at a time; tests feed them captured
//! transcripts.

use crate::score::Evaluation;

pub const UCI_OK: &str = "uciok";
pub const READY_OK: &str = "readyok";
pub const BEST_MOVE: &str = "bestmove";
pub const FEN_LABEL: &str = "Fen:";
pub const NODES_LABEL: &str = "Nodes searched:";

/// Separates a move from its node count in perft output (`e2e4: 1`)
pub const PERFT_DELIMITER: char = ':';

/// Score carried by a search `info` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

/// Parse the `score cp X` / `score mate N` field of an info line
pub fn parse_score(line: &str) -> Option<Score> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let i = parts.iter().position(|part| *part == "score")?;
    let value = parts.get(i + 2)?.parse().ok()?;
    match *parts.get(i + 1)? {
        "cp" => Some(Score::Centipawns(value)),
        "mate" => Some(Score::Mate(value)),
        _ => None,
    }
}

/// Move named by a `bestmove` line, if the line is one
pub fn parse_best_move(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(BEST_MOVE)?;
    Some(rest.split_whitespace().next().unwrap_or(""))
}

/// Position export carried by a `d` diagnostic line (`Fen: ...`)
pub fn fen_field(line: &str) -> Option<&str> {
    let start = line.find(FEN_LABEL)? + FEN_LABEL.len();
    Some(line[start..].trim())
}

/// Node total from a perft summary line
pub fn parse_nodes_searched(line: &str) -> Option<u64> {
    let start = line.find(NODES_LABEL)? + NODES_LABEL.len();
    line[start..].trim().parse().ok()
}

/// Legal moves in accumulated perft output: one delimiter per move line,
/// plus one on the summary line that must not be counted.
pub fn count_perft_moves(text: &str) -> u32 {
    let delimiters = text.matches(PERFT_DELIMITER).count() as u32;
    delimiters.saturating_sub(1)
}

/// `position` command for the game so far
pub fn position_command<S: AsRef<str>>(moves: &[S]) -> String {
    let mut cmd = String::from("position startpos");
    if !moves.is_empty() {
        cmd.push_str(" moves");
        for mv in moves {
            cmd.push(' ');
            cmd.push_str(mv.as_ref());
        }
    }
    cmd
}

/// Collects `go perft 1` output until the response is complete
#[derive(Debug, Default)]
pub struct PerftCollector {
    text: String,
    nodes: Option<u64>,
}

impl PerftCollector {
    /// Feed one response line. Returns `true` once the blank line after the
    /// summary has been seen.
    pub fn push(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return self.nodes.is_some();
        }
        if line.starts_with("info") {
            return false;
        }
        if let Some(nodes) = parse_nodes_searched(line) {
            self.nodes = Some(nodes);
        }
        self.text.push_str(line);
        self.text.push('\n');
        false
    }

    pub fn legal_moves(&self) -> u32 {
        count_perft_moves(&self.text)
    }

    pub fn nodes_searched(&self) -> Option<u64> {
        self.nodes
    }
}

/// Collects `go depth N` output up to the `bestmove` line.
/// Later score lines overwrite earlier ones.
#[derive(Debug, Default)]
pub struct SearchCollector {
    eval: Evaluation,
}

impl SearchCollector {
    /// Feed one response line. Returns `true` on the terminal `bestmove` line.
    pub fn push(&mut self, line: &str) -> bool {
        if let Some(best) = parse_best_move(line) {
            self.eval.best_move = best.to_string();
            return true;
        }
        match parse_score(line) {
            Some(Score::Centipawns(cp)) => {
                self.eval.centipawns = cp;
                self.eval.mate_is_latest = false;
            }
            Some(Score::Mate(n)) => {
                self.eval.mate_in = Some(n);
                self.eval.mate_is_latest = true;
            }
            None => {}
        }
        false
    }

    pub fn finish(self) -> Evaluation {
        self.eval
    }
}
