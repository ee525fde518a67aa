//! Batch driver: expand inputs, decode game logs, replay every game.

use std::path::{Path, PathBuf};

use chess_core::read_game_log;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info, warn};

use crate::engine::EngineSession;
use crate::error::ReplayError;
use crate::replayer::{replay_game, ReplayOptions, ReplaySummary};
use crate::sink::CsvSink;

/// Outcome of a batch, printed as JSON by the binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchTotals {
    pub files: usize,
    pub games: usize,
    pub rows: usize,
    pub rejected_moves: usize,
    /// One entry per replayed game, in replay order
    pub summaries: Vec<ReplaySummary>,
}

/// Expand input arguments into file paths, keeping argument order.
/// Arguments with glob metacharacters are patterns; anything else is a path.
pub fn expand_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<PathBuf>, ReplayError> {
    let mut paths = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }

        let matches = glob::glob(input)
            .map_err(|e| ReplayError::Config(format!("Invalid pattern {input:?}: {e}")))?;
        let mut found: Vec<PathBuf> = matches
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Unreadable glob match");
                    None
                }
            })
            .collect();
        if found.is_empty() {
            warn!(pattern = input, "Pattern matched no files");
        }
        found.sort();
        paths.extend(found);
    }
    Ok(paths)
}

/// Replay every game in `files` into the CSV at `output`.
///
/// Unreadable or malformed logs are skipped. Engine and sink errors abort
/// the batch.
pub async fn run_batch<W, R>(
    engine: &mut EngineSession<W, R>,
    files: &[PathBuf],
    output: &Path,
    options: &ReplayOptions,
) -> Result<BatchTotals, ReplayError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let mut totals = BatchTotals::default();

    for file in files {
        let games = match read_game_log(file) {
            Ok(games) => games,
            Err(e) => {
                error!(file = %file.display(), error = %e, "Skipping game log");
                continue;
            }
        };
        totals.files += 1;
        info!(file = %file.display(), games = games.len(), "Loaded game log");

        for game in &games {
            let mut sink = CsvSink::open_append(output)?;
            let summary = replay_game(engine, game, options, &mut sink).await?;
            totals.games += 1;
            totals.rows += summary.rows;
            totals.rejected_moves += summary.rejected_moves;
            totals.summaries.push(summary);
        }
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths_kept_in_order() {
        let paths = expand_inputs(&["b.json", "a.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("b.json"), PathBuf::from("a.json")]);
    }

    #[test]
    fn test_pattern_without_matches() {
        let paths = expand_inputs(&["/nonexistent-dir-for-replay/*.json"]).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = expand_inputs(&["games/[.json"]).unwrap_err();
        assert!(matches!(err, ReplayError::Config(_)));
    }
}
