//! Result rows and where they go.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ReplayError;

/// Column names, in output order
pub const CSV_HEADER: [&str; 17] = [
    "game_id",
    "move",
    "move_index",
    "king_side_castle",
    "queen_side_castle",
    "check_before",
    "check_after",
    "eval_delta",
    "eval_before",
    "eval_after",
    "time_remaining",
    "opponent_time_spent",
    "legal_moves_before",
    "legal_moves_after",
    "time_spent",
    "fen_before",
    "fen_after",
];

/// One replayed move
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub game_id: String,
    pub move_uci: String,
    pub move_index: usize,
    /// Castling rights of the side to move after the move
    pub king_side_castle: bool,
    pub queen_side_castle: bool,
    pub check_before: bool,
    pub check_after: bool,
    pub eval_delta: f64,
    pub eval_before: f64,
    pub eval_after: f64,
    pub time_remaining: f64,
    pub opponent_time_spent: f64,
    pub legal_moves_before: u32,
    pub legal_moves_after: u32,
    pub time_spent: f64,
    pub fen_before: String,
    pub fen_after: String,
}

impl ResultRow {
    /// Fields as CSV text, in `CSV_HEADER` order
    pub fn csv_fields(&self) -> [String; 17] {
        [
            self.game_id.clone(),
            self.move_uci.clone(),
            self.move_index.to_string(),
            flag(self.king_side_castle),
            flag(self.queen_side_castle),
            flag(self.check_before),
            flag(self.check_after),
            self.eval_delta.to_string(),
            self.eval_before.to_string(),
            self.eval_after.to_string(),
            format!("{:.1}", self.time_remaining),
            format!("{:.1}", self.opponent_time_spent),
            self.legal_moves_before.to_string(),
            self.legal_moves_after.to_string(),
            format!("{:.1}", self.time_spent),
            self.fen_before.clone(),
            self.fen_after.clone(),
        ]
    }

    pub fn to_csv_line(&self) -> String {
        csv_line(self.csv_fields().iter().map(String::as_str))
    }
}

fn flag(value: bool) -> String {
    let digit = if value { "1" } else { "0" };
    digit.to_string()
}

fn csv_line<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields
        .into_iter()
        .map(quote_field)
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote a field if it holds a delimiter, quote or line break
fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Destination for result rows
pub trait RowSink {
    fn emit(&mut self, row: ResultRow) -> Result<(), ReplayError>;
}

impl RowSink for Vec<ResultRow> {
    fn emit(&mut self, row: ResultRow) -> Result<(), ReplayError> {
        self.push(row);
        Ok(())
    }
}

/// Append-only CSV file. Each row is written as soon as it is emitted.
pub struct CsvSink {
    path: PathBuf,
    file: File,
}

impl CsvSink {
    /// Open `path` for appending, writing the header if the file is new or empty
    pub fn open_append<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| sink_error(&path, e))?;

        let len = file.metadata().map_err(|e| sink_error(&path, e))?.len();
        if len == 0 {
            debug!(path = %path.display(), "Writing CSV header");
            writeln!(file, "{}", csv_line(CSV_HEADER)).map_err(|e| sink_error(&path, e))?;
        }
        Ok(Self { path, file })
    }
}

impl RowSink for CsvSink {
    fn emit(&mut self, row: ResultRow) -> Result<(), ReplayError> {
        let line = format!("{}\n", row.to_csv_line());
        self.file
            .write_all(line.as_bytes())
            .map_err(|e| sink_error(&self.path, e))
    }
}

fn sink_error(path: &Path, e: std::io::Error) -> ReplayError {
    ReplayError::Sink(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> ResultRow {
        ResultRow {
            game_id: "sinktest0001".into(),
            move_uci: "e2e4".into(),
            move_index: 0,
            king_side_castle: true,
            queen_side_castle: true,
            check_before: false,
            check_after: false,
            eval_delta: -10.0,
            eval_before: 45.0,
            eval_after: 35.0,
            time_remaining: 179.5,
            opponent_time_spent: 0.0,
            legal_moves_before: 20,
            legal_moves_after: 20,
            time_spent: 0.5,
            fen_before: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".into(),
            fen_after: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".into(),
        }
    }

    #[test]
    fn test_csv_line() {
        let line = sample_row().to_csv_line();
        assert_eq!(
            line,
            "sinktest0001,e2e4,0,1,1,0,0,-10,45,35,179.5,0.0,20,20,0.5,\
             rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1,\
             rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn test_quote_field() {
        assert_eq!(quote_field("plain"), "plain");
        assert_eq!(quote_field("a,b"), "\"a,b\"");
        assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_header_matches_fields() {
        assert_eq!(CSV_HEADER.len(), sample_row().csv_fields().len());
        assert_eq!(CSV_HEADER[1], "move");
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut rows: Vec<ResultRow> = Vec::new();
        rows.emit(sample_row()).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
