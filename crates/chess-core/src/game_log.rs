//! Game-log decoding.
//!
//! A log is a JSON document holding game records keyed by their identifier:
//!
//! ```json
//! {
//!   "8f3a2c1d9e0b": {
//!     "moveListArray": ["e2e4", "e7e5"],
//!     "whiteMoveTimestampsArray": [1795],
//!     "blackMoveTimestampsArray": "[1790]"
//!   }
//! }
//! ```
//!
//! List fields are either JSON arrays or strings holding a bracketed,
//! comma-separated list. Records may sit at any depth of the document.

use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::game_data::GameRecord;

/// Keys shorter than this are field names, not game identifiers
pub const MIN_GAME_ID_LEN: usize = 10;

const MOVES_FIELD: &str = "moveListArray";
const WHITE_CLOCK_FIELD: &str = "whiteMoveTimestampsArray";
const BLACK_CLOCK_FIELD: &str = "blackMoveTimestampsArray";

#[derive(Error, Debug)]
pub enum GameLogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read and decode a game-log file
pub fn read_game_log<P: AsRef<Path>>(path: P) -> Result<Vec<GameRecord>, GameLogError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| GameLogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    decode_game_log(&content)
}

/// Decode every game record in a log, in document order.
/// Records without moves are skipped.
pub fn decode_game_log(content: &str) -> Result<Vec<GameRecord>, GameLogError> {
    let root: Value = serde_json::from_str(content)?;
    let mut games = Vec::new();
    collect_games(&root, &mut games);
    Ok(games)
}

fn collect_games(value: &Value, games: &mut Vec<GameRecord>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key.len() >= MIN_GAME_ID_LEN {
                    if let Some(record) = child.as_object().filter(|r| r.contains_key(MOVES_FIELD)) {
                        let game = decode_record(key, record);
                        if !game.moves.is_empty() {
                            games.push(game);
                        }
                        continue;
                    }
                }
                collect_games(child, games);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_games(item, games);
            }
        }
        _ => {}
    }
}

fn decode_record(game_id: &str, record: &Map<String, Value>) -> GameRecord {
    GameRecord {
        game_id: game_id.to_string(),
        moves: list_items(record.get(MOVES_FIELD)),
        white_clock: parse_clock(game_id, WHITE_CLOCK_FIELD, record.get(WHITE_CLOCK_FIELD)),
        black_clock: parse_clock(game_id, BLACK_CLOCK_FIELD, record.get(BLACK_CLOCK_FIELD)),
    }
}

/// Clock samples up to the first unparseable one. Later samples are
/// dropped so every kept sample stays at its move's index.
fn parse_clock(game_id: &str, field: &str, value: Option<&Value>) -> Vec<i64> {
    let mut samples = Vec::new();
    for item in list_items(value) {
        let parsed = item
            .parse::<i64>()
            .ok()
            .or_else(|| item.parse::<f64>().ok().map(|v| v.round() as i64));
        match parsed {
            Some(sample) => samples.push(sample),
            None => {
                warn!(
                    game_id,
                    field,
                    value = %item,
                    kept = samples.len(),
                    "Invalid clock sample, later samples dropped"
                );
                break;
            }
        }
    }
    samples
}

/// Flatten a list field into trimmed, non-empty items
fn list_items(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => clean_item(s).to_string(),
                other => other.to_string(),
            })
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::String(s)) => split_bracketed(s),
        Some(Value::Number(n)) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

/// Items of a `"[a, b, c]"` style string; text outside the brackets is ignored
fn split_bracketed(s: &str) -> Vec<String> {
    let inner = match (s.find('['), s.find(']')) {
        (Some(start), Some(end)) if start < end => &s[start + 1..end],
        _ => s,
    };
    inner
        .split(',')
        .map(clean_item)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_item(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_array_fields() {
        let log = r#"{
            "game0000000001": {
                "moveListArray": ["e2e4", "e7e5", "g1f3"],
                "whiteMoveTimestampsArray": [1795, 1781],
                "blackMoveTimestampsArray": [1790]
            }
        }"#;
        let games = decode_game_log(log).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, "game0000000001");
        assert_eq!(games[0].moves, vec!["e2e4", "e7e5", "g1f3"]);
        assert_eq!(games[0].white_clock, vec![1795, 1781]);
        assert_eq!(games[0].black_clock, vec![1790]);
    }

    #[test]
    fn test_decode_string_encoded_arrays() {
        let log = r#"{
            "game0000000002": {
                "moveListArray": "[\"d2d4\", \"d7d5\"]",
                "whiteMoveTimestampsArray": "[600, 590]",
                "blackMoveTimestampsArray": "[ 598 ]"
            }
        }"#;
        let games = decode_game_log(log).unwrap();
        assert_eq!(games[0].moves, vec!["d2d4", "d7d5"]);
        assert_eq!(games[0].white_clock, vec![600, 590]);
        assert_eq!(games[0].black_clock, vec![598]);
    }

    #[test]
    fn test_nested_records_keep_document_order() {
        let log = r#"{
            "games": {
                "zzzzzzzzzzzz": { "moveListArray": ["e2e4"] },
                "aaaaaaaaaaaa": { "moveListArray": ["d2d4"] }
            },
            "meta": { "count": 2 }
        }"#;
        let games = decode_game_log(log).unwrap();
        let ids: Vec<&str> = games.iter().map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec!["zzzzzzzzzzzz", "aaaaaaaaaaaa"]);
        assert!(games[0].white_clock.is_empty());
    }

    #[test]
    fn test_short_keys_and_empty_games_skipped() {
        let log = r#"{
            "short": { "moveListArray": ["e2e4"] },
            "emptygame0001": { "moveListArray": [] },
            "realgame00001": { "moveListArray": "[c2c4]" }
        }"#;
        let games = decode_game_log(log).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, "realgame00001");
    }

    #[test]
    fn test_invalid_clock_sample_keeps_other_games() {
        let log = r#"{
            "goodgame00001": {
                "moveListArray": ["e2e4", "e7e5"],
                "whiteMoveTimestampsArray": [1795],
                "blackMoveTimestampsArray": [1790]
            },
            "badclock00001": {
                "moveListArray": ["d2d4", "d7d5", "c2c4"],
                "whiteMoveTimestampsArray": ["600", "soon"],
                "blackMoveTimestampsArray": ["x"]
            }
        }"#;
        let games = decode_game_log(log).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].white_clock, vec![1795]);
        assert_eq!(games[1].game_id, "badclock00001");
        assert_eq!(games[1].moves.len(), 3);
        assert_eq!(games[1].white_clock, vec![600]);
        assert!(games[1].black_clock.is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(decode_game_log("{ nope"), Err(GameLogError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = read_game_log("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, GameLogError::Io { .. }));
    }
}
