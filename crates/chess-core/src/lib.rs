pub mod game_data;
pub mod game_log;
pub mod position;

pub use game_data::GameRecord;
pub use game_log::{decode_game_log, read_game_log, GameLogError};
pub use position::{CastlingRights, Color, MoveError, Piece, PieceKind, PositionTracker, Square};
