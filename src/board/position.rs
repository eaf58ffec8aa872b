/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, ops::RangeInclusive, str::FromStr};

use log::{debug, warn};
use thiserror::Error;

use super::{Color, Move, Piece, PieceKind, Square, FEN_STARTPOS};

/// Reasons a FEN string can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("Invalid FEN - expected 6 fields, found {0}")]
    TokenCount(usize),

    #[error("Invalid FEN - expected 8 rows, found {0}")]
    RowCount(usize),

    #[error("Invalid FEN - row length in row {0}")]
    RowLength(usize),

    #[error("Invalid FEN - unknown piece {0:?}")]
    UnknownPiece(char),

    #[error("Invalid FEN - active player {0:?}")]
    ActiveColor(String),

    #[error("Invalid FEN - castling rights {0:?}")]
    CastlingRights(String),

    #[error("Invalid FEN - halfmove clock {0:?}")]
    Halfmove(String),

    #[error("Invalid FEN - fullmove number {0:?}")]
    Fullmove(String),
}

/// Represents the castling rights of a single player.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
pub struct CastlingRights {
    /// May castle kingside (towards the h-file).
    pub short: bool,
    /// May castle queenside (towards the a-file).
    pub long: bool,
}

impl CastlingRights {
    /// Creates a new [`CastlingRights`].
    #[inline(always)]
    pub const fn new(short: bool, long: bool) -> Self {
        Self { short, long }
    }

    /// Rights that permit nothing.
    #[inline(always)]
    pub const fn none() -> Self {
        Self::new(false, false)
    }
}

/// Represents the complete state of a chess game at a single moment: the pieces, whose turn it is, castling and en passant availability, and both move counters.
///
/// A [`Position`] is a plain value. Every operation that "changes" a position, such as [`Position::apply_move`],
/// returns a new [`Position`] and leaves the original untouched.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// The board, indexed as `board[x][y]`.
    board: [[Option<Piece>; 8]; 8],

    /// The [`Color`] of the current player.
    side_to_move: Color,

    /// Castling rights for each player.
    castling_rights: [CastlingRights; Color::COUNT],

    /// The square a pawn may capture onto en passant, if any.
    ep_square: Option<Square>,

    /// Moves since the last capture or pawn move.
    halfmove: u32,

    /// Starts at 1 and is incremented after Black's move.
    fullmove: u32,
}

impl Position {
    /// Creates a new, empty [`Position`] with White to move, no castling rights, no en passant square, and counters at `0 1`.
    ///
    /// # Example
    /// ```
    /// # use kibitz::Position;
    /// let empty = Position::new();
    /// assert_eq!(empty.to_fen(), "8/8/8/8/8/8/8/8 w - - 0 1");
    /// ```
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            board: [[None; 8]; 8],
            side_to_move: Color::White,
            castling_rights: [CastlingRights::none(); Color::COUNT],
            ep_square: None,
            halfmove: 0,
            fullmove: 1,
        }
    }

    /// Creates a new [`Position`] from the provided FEN string.
    ///
    /// Tabs and newlines are treated as ordinary whitespace. An en passant field that does not name a square is treated as `-`.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Position, Square};
    /// let pos = Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap();
    /// assert_eq!(pos.ep_square(), Some(Square::E3));
    ///
    /// assert!(Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1").is_err());
    /// ```
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let tokens = fen.split_whitespace().collect::<Vec<_>>();
        let [placements, active, castling, ep, halfmove, fullmove] = tokens[..] else {
            return Err(FenError::TokenCount(tokens.len()));
        };

        let mut pos = Self::new();

        let rows = placements.split('/').collect::<Vec<_>>();
        if rows.len() != 8 {
            return Err(FenError::RowCount(rows.len()));
        }

        for (y, row) in rows.into_iter().enumerate() {
            let mut x = 0;
            for c in row.chars() {
                if x > 7 {
                    return Err(FenError::RowLength(y));
                }

                if let Some(skip) = c.to_digit(10).filter(|n| (1..=8).contains(n)) {
                    x += skip as usize;
                    continue;
                }

                let piece = Piece::from_fen_char(c).ok_or(FenError::UnknownPiece(c))?;
                pos.board[x][y] = Some(piece);
                x += 1;
            }

            if x != 8 {
                return Err(FenError::RowLength(y));
            }
        }

        pos.side_to_move = match active.to_ascii_lowercase().as_str() {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(FenError::ActiveColor(active.to_string())),
        };

        if castling != "-" {
            for c in castling.chars() {
                match c {
                    'K' => pos.castling_rights[Color::White].short = true,
                    'Q' => pos.castling_rights[Color::White].long = true,
                    'k' => pos.castling_rights[Color::Black].short = true,
                    'q' => pos.castling_rights[Color::Black].long = true,
                    _ => return Err(FenError::CastlingRights(castling.to_string())),
                }
            }
        }

        pos.ep_square = Square::from_uci(&ep.to_ascii_lowercase()).ok();
        if pos.ep_square.is_none() && ep != "-" {
            debug!("Ignoring unusable en passant field {ep:?}");
        }

        pos.halfmove = halfmove
            .parse()
            .map_err(|_| FenError::Halfmove(halfmove.to_string()))?;
        pos.fullmove = fullmove
            .parse()
            .map_err(|_| FenError::Fullmove(fullmove.to_string()))?;

        Ok(pos)
    }

    /// Generates the FEN string of this [`Position`].
    pub fn to_fen(&self) -> String {
        self.to_string()
    }

    /// The piece placement field of this position's FEN.
    pub fn placements_fen(&self) -> String {
        let mut rows = Vec::with_capacity(8);

        for y in 0..8 {
            let mut row = String::with_capacity(8);
            let mut empty_spaces = 0;
            for x in 0..8 {
                if let Some(piece) = self.board[x][y] {
                    if empty_spaces != 0 {
                        row += &empty_spaces.to_string();
                        empty_spaces = 0;
                    }
                    row.push(piece.fen_char());
                } else {
                    empty_spaces += 1;
                }
            }

            if empty_spaces != 0 {
                row += &empty_spaces.to_string();
            }
            rows.push(row);
        }

        rows.join("/")
    }

    /// Returns the [`Color`] of the player who is about to move.
    #[inline(always)]
    pub const fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Returns the en passant target square, if one exists.
    #[inline(always)]
    pub const fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    /// Returns the [`CastlingRights`] for `color`.
    #[inline(always)]
    pub fn castling_rights_for(&self, color: Color) -> &CastlingRights {
        &self.castling_rights[color]
    }

    /// Returns the castling rights of the current position in standard FEN notation, such as `KQkq` or `-`.
    pub fn castling_rights_uci(&self) -> String {
        let mut castling = String::with_capacity(4);

        if self.castling_rights[Color::White].short {
            castling.push('K');
        }
        if self.castling_rights[Color::White].long {
            castling.push('Q');
        }
        if self.castling_rights[Color::Black].short {
            castling.push('k');
        }
        if self.castling_rights[Color::Black].long {
            castling.push('q');
        }

        // If no side can castle, use a hyphen
        if castling.is_empty() {
            castling = String::from("-");
        }
        castling
    }

    /// Number of halfmoves since the last capture or pawn move.
    #[inline(always)]
    pub const fn halfmove(&self) -> u32 {
        self.halfmove
    }

    /// The current fullmove number.
    #[inline(always)]
    pub const fn fullmove(&self) -> u32 {
        self.fullmove
    }

    /// Fetches the [`Piece`] on `square`, if there is one.
    #[inline(always)]
    pub const fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board[square.x() as usize][square.y() as usize]
    }

    /// Fetches the [`Color`] of the piece on `square`, if there is one.
    #[inline(always)]
    pub fn color_at(&self, square: Square) -> Option<Color> {
        self.piece_at(square).map(|p| p.color())
    }

    /// Returns `true` if `square` holds no piece.
    #[inline(always)]
    pub const fn is_empty(&self, square: Square) -> bool {
        self.piece_at(square).is_none()
    }

    /// Returns `true` if `a` and `b` both hold pieces of the same [`Color`].
    #[inline(always)]
    pub fn same_color(&self, a: Square, b: Square) -> bool {
        matches!((self.color_at(a), self.color_at(b)), (Some(x), Some(y)) if x == y)
    }

    #[inline(always)]
    fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.board[square.x() as usize][square.y() as usize] = piece;
    }

    #[inline(always)]
    fn take(&mut self, square: Square) -> Option<Piece> {
        let piece = self.piece_at(square);
        self.set(square, None);
        piece
    }

    /// An iterator over every occupied square and its [`Piece`].
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::iter().filter_map(|sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    /// Finds every square holding `piece`.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Piece, Position, Square};
    /// let pos = Position::default();
    /// assert_eq!(pos.find(Piece::WHITE_KNIGHT), vec![Square::B1, Square::G1]);
    /// ```
    pub fn find(&self, piece: Piece) -> Vec<Square> {
        self.find_in(piece, 0..=7, 0..=7)
    }

    /// Finds every square holding `piece` within the provided `x` (file) and `y` (row) ranges.
    ///
    /// Squares are scanned file by file, from the a-file to the h-file.
    pub fn find_in(
        &self,
        piece: Piece,
        xs: RangeInclusive<i32>,
        ys: RangeInclusive<i32>,
    ) -> Vec<Square> {
        let mut found = Vec::new();
        for x in xs {
            for y in ys.clone() {
                if let Some(square) = Square::new(x, y) {
                    if self.piece_at(square) == Some(piece) {
                        found.push(square);
                    }
                }
            }
        }
        found
    }

    /// Locates the king of `color`, if it is on the board.
    pub fn king(&self, color: Color) -> Option<Square> {
        self.find(Piece::new(color, PieceKind::King)).first().copied()
    }

    /// Fills in the implied promotion of `mv` and drops a meaningless one.
    ///
    /// A pawn reaching the far rank without a promotion is given a queen. A promotion on any other move is removed.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Move, Position};
    /// let pos: Position = "8/P7/8/8/8/8/8/k1K5 w - - 0 1".parse().unwrap();
    /// let mv = pos.normalize_move(Move::from_uci("a7a8").unwrap());
    /// assert_eq!(mv, "a7a8q");
    /// ```
    pub fn normalize_move(&self, mv: Move) -> Move {
        let promotes = self.piece_at(mv.from()).is_some_and(|piece| {
            piece.is_pawn() && (mv.to().y() == 0 || mv.to().y() == 7)
        });

        if promotes {
            mv.with_promotion(Some(mv.promotion().unwrap_or(PieceKind::Queen)))
        } else {
            mv.with_promotion(None)
        }
    }

    /// Plays `mv` on a copy of this [`Position`] and returns the copy.
    ///
    /// No legality checks are done here. See [`Position::illegal_reason`] for that.
    /// If the source square of `mv` is empty, a warning is logged and an unchanged copy is returned.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Move, Position};
    /// let pos = Position::default().apply_move(Move::from_uci("e2e4").unwrap());
    /// assert_eq!(pos.to_fen(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
    /// ```
    pub fn apply_move(&self, mv: Move) -> Self {
        let (from, to) = (mv.from(), mv.to());

        let Some(piece) = self.piece_at(from) else {
            warn!("Cannot apply {mv}: no piece on {from} in {self}");
            return *self;
        };

        let mut next = *self;
        let is_capture = self.piece_at(to).is_some() || (piece.is_pawn() && from.x() != to.x());

        // Moving the king forfeits both rights; touching a corner forfeits that corner's right
        if piece.is_king() {
            next.castling_rights[piece.color()] = CastlingRights::none();
        }
        for square in [from, to] {
            match square {
                Square::A1 => next.castling_rights[Color::White].long = false,
                Square::H1 => next.castling_rights[Color::White].short = false,
                Square::A8 => next.castling_rights[Color::Black].long = false,
                Square::H8 => next.castling_rights[Color::Black].short = false,
                _ => {}
            }
        }

        if self.side_to_move.is_black() {
            next.fullmove += 1;
        }

        if piece.is_pawn() || is_capture {
            next.halfmove = 0;
        } else {
            next.halfmove += 1;
        }

        if piece.is_king() {
            let rook_hop = match mv.with_promotion(None) {
                Move::WHITE_SHORT_CASTLE => Some((Square::H1, Square::F1)),
                Move::WHITE_LONG_CASTLE => Some((Square::A1, Square::D1)),
                Move::BLACK_SHORT_CASTLE => Some((Square::H8, Square::F8)),
                Move::BLACK_LONG_CASTLE => Some((Square::A8, Square::D8)),
                _ => None,
            };

            if let Some((rook_from, rook_to)) = rook_hop {
                let rook = next.take(rook_from);
                next.set(rook_to, rook);
            }
        }

        // En passant captures remove the pawn beside the source square
        if piece.is_pawn() && from.x() != to.x() && self.is_empty(to) {
            if let Some(victim) = Square::new(to.x(), from.y()) {
                next.set(victim, None);
            }
        }

        next.ep_square = None;
        if piece.is_pawn() {
            if from.y() == 6 && to.y() == 4 {
                next.ep_square = Square::new(from.x(), 5);
            } else if from.y() == 1 && to.y() == 3 {
                next.ep_square = Square::new(from.x(), 2);
            }
        }

        next.set(from, None);
        if piece.is_pawn() && (to.y() == 0 || to.y() == 7) {
            let promotion = mv.promotion().unwrap_or(PieceKind::Queen);
            next.set(to, Some(piece.promoted(promotion)));
        } else {
            next.set(to, Some(piece));
        }

        next.side_to_move = self.side_to_move.opponent();
        next
    }

    /// A compact 64-character rendering of the board, row by row from a8, with `.` for empty squares.
    pub fn simple_string(&self) -> String {
        Square::iter()
            .map(|sq| self.piece_at(sq).map(|p| p.fen_char()).unwrap_or('.'))
            .collect()
    }
}

impl FromStr for Position {
    type Err = FenError;
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl Default for Position {
    /// The standard starting position.
    #[inline(always)]
    fn default() -> Self {
        // The start position FEN is well-formed
        Self::from_fen(FEN_STARTPOS).unwrap_or_else(|_| Self::new())
    }
}

impl fmt::Display for Position {
    /// Display this position's FEN string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let en_passant_target = self
            .ep_square
            .map(|square| square.to_uci())
            .unwrap_or_else(|| String::from("-"));

        write!(
            f,
            "{} {} {} {en_passant_target} {} {}",
            self.placements_fen(),
            self.side_to_move,
            self.castling_rights_uci(),
            self.halfmove,
            self.fullmove
        )
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..8 {
            write!(f, "{}|", 8 - y)?;
            for x in 0..8 {
                let piece_char = self.board[x][y].map(|p| p.fen_char()).unwrap_or('.');
                write!(f, " {piece_char}")?;
            }

            match y {
                1 => write!(f, "           FEN: {}", self.to_fen())?,
                2 => write!(f, "          Side: {}", self.side_to_move.name())?,
                3 => write!(f, "      Castling: {}", self.castling_rights_uci())?,
                4 => {
                    let ep = self
                        .ep_square
                        .map(|t| t.to_uci())
                        .unwrap_or(String::from("-"));
                    write!(f, "            EP: {ep}")?
                }
                5 => write!(f, "     Half-move: {}", self.halfmove)?,
                6 => write!(f, "     Full-move: {}", self.fullmove)?,
                _ => {}
            }
            writeln!(f)?;
        }
        write!(f, " +")?;
        for _ in 0..8 {
            write!(f, "--")?;
        }
        write!(f, "\n   ")?;
        for file in 'a'..='h' {
            write!(f, "{file} ")?;
        }

        Ok(())
    }
}
