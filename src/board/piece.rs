/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    ops::{Index, IndexMut},
    str::FromStr,
};

use anyhow::{anyhow, Result};

/// The side a player or piece belongs to. White moves first, so it is the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Color {
    #[default]
    White,
    Black,
}

impl Color {
    /// Length of arrays indexed by [`Color`].
    pub const COUNT: usize = 2;

    #[inline(always)]
    pub const fn is_white(self) -> bool {
        matches!(self, Self::White)
    }

    #[inline(always)]
    pub const fn is_black(self) -> bool {
        matches!(self, Self::Black)
    }

    /// The other side.
    ///
    /// # Example
    /// ```
    /// # use kibitz::Color;
    /// assert_eq!(Color::White.opponent(), Color::Black);
    /// assert_eq!(Color::Black.opponent(), Color::White);
    /// ```
    #[inline(always)]
    pub const fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// The owner of a FEN piece letter: uppercase is White.
    #[inline(always)]
    pub const fn of_letter(c: char) -> Self {
        if c.is_ascii_lowercase() {
            Self::Black
        } else {
            Self::White
        }
    }

    /// Capitalised name, as used in messages (`"Black lost the right to castle"`).
    #[inline(always)]
    pub const fn name(self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Black => "Black",
        }
    }
}

impl<T> Index<Color> for [T; Color::COUNT] {
    type Output = T;

    #[inline(always)]
    fn index(&self, color: Color) -> &T {
        &self[color as usize]
    }
}

impl<T> IndexMut<Color> for [T; Color::COUNT] {
    #[inline(always)]
    fn index_mut(&mut self, color: Color) -> &mut T {
        &mut self[color as usize]
    }
}

impl fmt::Display for Color {
    /// The active color field of a FEN: `w` or `b`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_white() { "w" } else { "b" })
    }
}

/// What a piece is, independent of who owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// What a pawn may become on the last rank, strongest first.
    pub const PROMOTIONS: [Self; 4] = [Self::Queen, Self::Rook, Self::Bishop, Self::Knight];

    /// Reads a piece letter in either case.
    ///
    /// # Example
    /// ```
    /// # use kibitz::PieceKind;
    /// assert_eq!(PieceKind::from_letter('Q'), Some(PieceKind::Queen));
    /// assert_eq!(PieceKind::from_letter('n'), Some(PieceKind::Knight));
    /// assert_eq!(PieceKind::from_letter('x'), None);
    /// ```
    pub const fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'P' => Some(Self::Pawn),
            'N' => Some(Self::Knight),
            'B' => Some(Self::Bishop),
            'R' => Some(Self::Rook),
            'Q' => Some(Self::Queen),
            'K' => Some(Self::King),
            _ => None,
        }
    }

    /// The uppercase letter used in algebraic notation and for White in FEN.
    pub const fn letter(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }
}

impl FromStr for PieceKind {
    type Err = anyhow::Error;

    /// Parses a single piece letter, such as the promotion suffix of a UCI move.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Self::from_letter(c).ok_or_else(|| anyhow!("Unknown piece letter {c:?}"))
            }
            _ => Err(anyhow!("Expected a single piece letter. Got {s:?}")),
        }
    }
}

impl fmt::Display for PieceKind {
    /// Lowercase, as in the promotion suffix of `e7e8q`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter().to_ascii_lowercase())
    }
}

/// A [`Color`] and [`PieceKind`] pair. Empty squares are `None` wherever an `Option<Piece>` is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    color: Color,
    kind: PieceKind,
}

impl Piece {
    pub const WHITE_PAWN: Self = Self::new(Color::White, PieceKind::Pawn);
    pub const WHITE_KNIGHT: Self = Self::new(Color::White, PieceKind::Knight);
    pub const WHITE_BISHOP: Self = Self::new(Color::White, PieceKind::Bishop);
    pub const WHITE_ROOK: Self = Self::new(Color::White, PieceKind::Rook);
    pub const WHITE_QUEEN: Self = Self::new(Color::White, PieceKind::Queen);
    pub const WHITE_KING: Self = Self::new(Color::White, PieceKind::King);

    pub const BLACK_PAWN: Self = Self::new(Color::Black, PieceKind::Pawn);
    pub const BLACK_KNIGHT: Self = Self::new(Color::Black, PieceKind::Knight);
    pub const BLACK_BISHOP: Self = Self::new(Color::Black, PieceKind::Bishop);
    pub const BLACK_ROOK: Self = Self::new(Color::Black, PieceKind::Rook);
    pub const BLACK_QUEEN: Self = Self::new(Color::Black, PieceKind::Queen);
    pub const BLACK_KING: Self = Self::new(Color::Black, PieceKind::King);

    #[inline(always)]
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    #[inline(always)]
    pub const fn color(&self) -> Color {
        self.color
    }

    #[inline(always)]
    pub const fn kind(&self) -> PieceKind {
        self.kind
    }

    #[inline(always)]
    pub const fn is_pawn(&self) -> bool {
        matches!(self.kind, PieceKind::Pawn)
    }

    #[inline(always)]
    pub const fn is_knight(&self) -> bool {
        matches!(self.kind, PieceKind::Knight)
    }

    #[inline(always)]
    pub const fn is_king(&self) -> bool {
        matches!(self.kind, PieceKind::King)
    }

    /// Reads a FEN piece letter, whose case gives the owner.
    ///
    /// # Example
    /// ```
    /// # use kibitz::Piece;
    /// assert_eq!(Piece::from_fen_char('r'), Some(Piece::BLACK_ROOK));
    /// assert_eq!(Piece::from_fen_char('N'), Some(Piece::WHITE_KNIGHT));
    /// assert_eq!(Piece::from_fen_char('7'), None);
    /// ```
    pub const fn from_fen_char(c: char) -> Option<Self> {
        match PieceKind::from_letter(c) {
            Some(kind) => Some(Self::new(Color::of_letter(c), kind)),
            None => None,
        }
    }

    /// The FEN letter for this piece: uppercase for White, lowercase for Black.
    pub const fn fen_char(&self) -> char {
        match self.color {
            Color::White => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }

    /// The same side's piece of another kind, for promotion.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Piece, PieceKind};
    /// assert_eq!(Piece::BLACK_PAWN.promoted(PieceKind::Queen), Piece::BLACK_QUEEN);
    /// ```
    #[inline(always)]
    pub const fn promoted(self, kind: PieceKind) -> Self {
        Self::new(self.color, kind)
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fen_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fen_letters_follow_case() {
        for c in "PNBRQKpnbrqk".chars() {
            let piece = Piece::from_fen_char(c).unwrap();
            assert_eq!(piece.fen_char(), c);
            assert_eq!(piece.color().is_white(), c.is_ascii_uppercase());
        }
        assert_eq!(Piece::from_fen_char('x'), None);
    }

    #[test]
    fn test_promotion_suffix() {
        assert_eq!("q".parse::<PieceKind>().unwrap(), PieceKind::Queen);
        assert_eq!(PieceKind::Knight.to_string(), "n");
        assert!("qq".parse::<PieceKind>().is_err());
        assert!("".parse::<PieceKind>().is_err());
    }

    #[test]
    fn test_color_indexing() {
        let mut counts = [0; Color::COUNT];
        counts[Color::Black] += 2;
        counts[Color::Black.opponent()] += 1;
        assert_eq!(counts, [1, 2]);
        assert_eq!(Color::Black.to_string(), "b");
    }
}
