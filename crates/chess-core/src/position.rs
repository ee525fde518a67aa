//! Mechanical chess position tracking from coordinate moves.
//!
//! Moves are applied without any legality checks. The tracker keeps only the
//! state the replay needs locally: side to move, castling rights, the
//! en-passant file and enough of the board to answer check queries.

use std::fmt;
use std::ops::Not;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Back-rank piece order, a-file to h-file
const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const DIAGONALS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ORTHOGONALS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

const KING_FILE: u8 = 4;
const QUEEN_ROOK_FILE: u8 = 0;
const KING_ROOK_FILE: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Colour that moves at ply `index` of a game (white on even plies)
    pub fn for_ply(index: usize) -> Self {
        if index % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// Rank (0-based) the colour's pieces start on
    pub fn home_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Rank (0-based) the colour's pawns promote on
    pub fn promotion_rank(self) -> u8 {
        (!self).home_rank()
    }

    fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }
}

impl Not for Color {
    type Output = Color;

    fn not(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Piece a UCI promotion suffix asks for. Only lowercase letters are recognized.
    pub fn from_promotion_letter(letter: char) -> Option<Self> {
        match letter {
            'q' => Some(PieceKind::Queen),
            'r' => Some(PieceKind::Rook),
            'b' => Some(PieceKind::Bishop),
            'n' => Some(PieceKind::Knight),
            _ => None,
        }
    }

    fn fen_letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// FEN letter: uppercase for white, lowercase for black
    pub fn fen_char(self) -> char {
        let letter = self.kind.fen_letter();
        match self.color {
            Color::White => letter.to_ascii_uppercase(),
            Color::Black => letter,
        }
    }
}

/// A board square, 0-based file (a = 0) and rank (1 = 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub file: u8,
    pub rank: u8,
}

impl Square {
    pub const fn new(file: u8, rank: u8) -> Self {
        Self { file, rank }
    }

    /// Decode a file letter and rank digit, e.g. `b'e', b'4'`
    fn from_coords(file: u8, rank: u8) -> Option<Self> {
        let file = file.wrapping_sub(b'a');
        let rank = rank.wrapping_sub(b'1');
        (file < 8 && rank < 8).then_some(Self { file, rank })
    }

    /// Parse algebraic square notation such as `"e4"`
    pub fn parse(s: &str) -> Option<Self> {
        match s.as_bytes() {
            [file, rank] => Self::from_coords(*file, *rank),
            _ => None,
        }
    }

    fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Self> {
        let file = self.file as i8 + file_delta;
        let rank = self.rank as i8 + rank_delta;
        ((0..8).contains(&file) && (0..8).contains(&rank))
            .then(|| Self::new(file as u8, rank as u8))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

/// Castling rights of one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CastlingRights {
    pub king_side: bool,
    pub queen_side: bool,
}

impl CastlingRights {
    pub const ALL: Self = Self {
        king_side: true,
        queen_side: true,
    };
    pub const NONE: Self = Self {
        king_side: false,
        queen_side: false,
    };
}

/// Structural problems that stop a move from being applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("move {0:?} is shorter than 4 characters")]
    TooShort(String),

    #[error("move {0:?} has a coordinate outside the board")]
    OutOfRange(String),

    #[error("move {mv:?} starts from empty square {square}")]
    EmptySource { mv: String, square: Square },
}

/// A decoded coordinate move (`e2e4`, `e7e8q`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordMove {
    pub from: Square,
    pub to: Square,
    /// Trailing fifth character, if any. Not validated here.
    pub promotion: Option<char>,
}

impl CoordMove {
    pub fn parse(mv: &str) -> Result<Self, MoveError> {
        let bytes = mv.as_bytes();
        if bytes.len() < 4 {
            return Err(MoveError::TooShort(mv.to_string()));
        }

        let out_of_range = || MoveError::OutOfRange(mv.to_string());
        let from = Square::from_coords(bytes[0], bytes[1]).ok_or_else(out_of_range)?;
        let to = Square::from_coords(bytes[2], bytes[3]).ok_or_else(out_of_range)?;
        let promotion = if bytes.len() == 5 {
            Some(bytes[4] as char)
        } else {
            None
        };

        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

/// One chess position, mutated in place as a game is replayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionTracker {
    /// Indexed `[rank][file]`
    board: [[Option<Piece>; 8]; 8],
    side_to_move: Color,
    castling: [CastlingRights; 2],
    en_passant_file: Option<u8>,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionTracker {
    /// Standard starting position
    pub fn new() -> Self {
        let mut position = Self::empty();
        position.reset();
        position
    }

    /// No pieces, white to move, no castling rights
    pub fn empty() -> Self {
        Self {
            board: [[None; 8]; 8],
            side_to_move: Color::White,
            castling: [CastlingRights::NONE; 2],
            en_passant_file: None,
        }
    }

    /// Restore the standard starting arrangement
    pub fn reset(&mut self) {
        self.board = [[None; 8]; 8];
        for (file, kind) in BACK_RANK.iter().enumerate() {
            self.board[0][file] = Some(Piece::new(Color::White, *kind));
            self.board[1][file] = Some(Piece::new(Color::White, PieceKind::Pawn));
            self.board[6][file] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            self.board[7][file] = Some(Piece::new(Color::Black, *kind));
        }
        self.side_to_move = Color::White;
        self.castling = [CastlingRights::ALL; 2];
        self.en_passant_file = None;
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board[square.rank as usize][square.file as usize]
    }

    pub fn set_piece(&mut self, square: Square, piece: Option<Piece>) {
        self.board[square.rank as usize][square.file as usize] = piece;
    }

    fn take_piece(&mut self, square: Square) -> Option<Piece> {
        self.board[square.rank as usize][square.file as usize].take()
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// File of the pawn that just made a double step, if any
    pub fn en_passant_file(&self) -> Option<u8> {
        self.en_passant_file
    }

    /// Remaining rights of the side whose turn it is.
    ///
    /// After [`apply`](Self::apply) the turn has already passed, so this
    /// reports the rights of the side about to move.
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling_rights_for(self.side_to_move)
    }

    pub fn castling_rights_for(&self, color: Color) -> CastlingRights {
        self.castling[color.index()]
    }

    /// Apply a coordinate move. Returns `false` and leaves the position
    /// untouched if the move is malformed or its source square is empty.
    pub fn apply(&mut self, mv: &str) -> bool {
        self.try_apply(mv).is_ok()
    }

    pub fn try_apply(&mut self, mv: &str) -> Result<(), MoveError> {
        let parsed = CoordMove::parse(mv)?;
        let CoordMove {
            from,
            to,
            promotion,
        } = parsed;

        let piece = self.piece_at(from).ok_or_else(|| MoveError::EmptySource {
            mv: mv.to_string(),
            square: from,
        })?;
        let color = piece.color;
        let home = color.home_rank();

        // En passant: the captured pawn sits beside the source square
        if piece.kind == PieceKind::Pawn
            && self.en_passant_file == Some(to.file)
            && from.file.abs_diff(to.file) == 1
        {
            let (capture_rank, landing_rank) = match color {
                Color::White => (4, 5),
                Color::Black => (3, 2),
            };
            if from.rank == capture_rank && to.rank == landing_rank {
                self.set_piece(Square::new(to.file, from.rank), None);
            }
        }

        self.en_passant_file = None;
        if piece.kind == PieceKind::Pawn {
            let (start_rank, double_rank) = match color {
                Color::White => (1, 3),
                Color::Black => (6, 4),
            };
            if from.rank == start_rank && to.rank == double_rank {
                self.en_passant_file = Some(from.file);
            }
        }

        if piece.kind == PieceKind::King && from == Square::new(KING_FILE, home) {
            if to == Square::new(6, home) {
                let rook = self.take_piece(Square::new(KING_ROOK_FILE, home));
                self.set_piece(Square::new(5, home), rook);
            } else if to == Square::new(2, home) {
                let rook = self.take_piece(Square::new(QUEEN_ROOK_FILE, home));
                self.set_piece(Square::new(3, home), rook);
            }
            self.castling[color.index()] = CastlingRights::NONE;
        }

        let rights = &mut self.castling[color.index()];
        match piece.kind {
            PieceKind::King => *rights = CastlingRights::NONE,
            PieceKind::Rook if from == Square::new(QUEEN_ROOK_FILE, home) => {
                rights.queen_side = false
            }
            PieceKind::Rook if from == Square::new(KING_ROOK_FILE, home) => {
                rights.king_side = false
            }
            _ => {}
        }

        let mut placed = piece;
        if let (PieceKind::Pawn, Some(letter)) = (piece.kind, promotion) {
            if to.rank == color.promotion_rank() {
                if let Some(kind) = PieceKind::from_promotion_letter(letter) {
                    placed.kind = kind;
                }
            }
        }

        self.set_piece(from, None);
        self.set_piece(to, Some(placed));
        self.side_to_move = !self.side_to_move;
        Ok(())
    }

    /// First king of `color` found scanning from a1, or `None`
    pub fn find_king(&self, color: Color) -> Option<Square> {
        let king = Piece::new(color, PieceKind::King);
        (0..8u8)
            .flat_map(|rank| (0..8u8).map(move |file| Square::new(file, rank)))
            .find(|&square| self.piece_at(square) == Some(king))
    }

    /// Whether `color`'s king is attacked. A position without that king is
    /// reported as not in check.
    pub fn is_in_check(&self, color: Color) -> bool {
        match self.find_king(color) {
            Some(square) => self.is_square_attacked(square, !color),
            None => false,
        }
    }

    pub fn is_square_attacked(&self, square: Square, by: Color) -> bool {
        self.attacked_by_pawn(square, by)
            || self.attacked_by_leaper(square, by, PieceKind::Knight, &KNIGHT_OFFSETS)
            || self.attacked_by_slider(square, by, PieceKind::Bishop, &DIAGONALS)
            || self.attacked_by_slider(square, by, PieceKind::Rook, &ORTHOGONALS)
            || self.attacked_by_leaper(square, by, PieceKind::King, &KING_OFFSETS)
    }

    fn attacked_by_pawn(&self, square: Square, by: Color) -> bool {
        let pawn = Some(Piece::new(by, PieceKind::Pawn));
        let behind = -by.pawn_direction();
        [-1, 1].into_iter().any(|file_delta| {
            square
                .offset(file_delta, behind)
                .is_some_and(|from| self.piece_at(from) == pawn)
        })
    }

    fn attacked_by_leaper(
        &self,
        square: Square,
        by: Color,
        kind: PieceKind,
        offsets: &[(i8, i8)],
    ) -> bool {
        let attacker = Some(Piece::new(by, kind));
        offsets.iter().any(|&(rank_delta, file_delta)| {
            square
                .offset(file_delta, rank_delta)
                .is_some_and(|from| self.piece_at(from) == attacker)
        })
    }

    /// Ray scan for `kind` or a queen; any other piece blocks the ray
    fn attacked_by_slider(
        &self,
        square: Square,
        by: Color,
        kind: PieceKind,
        directions: &[(i8, i8)],
    ) -> bool {
        for &(rank_delta, file_delta) in directions {
            let mut current = square;
            while let Some(next) = current.offset(file_delta, rank_delta) {
                if let Some(piece) = self.piece_at(next) {
                    if piece.color == by && (piece.kind == kind || piece.kind == PieceKind::Queen)
                    {
                        return true;
                    }
                    break;
                }
                current = next;
            }
        }
        false
    }

    /// Piece-placement field of a FEN string, rank 8 first
    pub fn placement_fen(&self) -> String {
        let mut fen = String::with_capacity(64);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.board[rank][file] {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        fen.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                fen.push('/');
            }
        }
        fen
    }
}
