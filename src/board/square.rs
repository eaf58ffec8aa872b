/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, str::FromStr};

use anyhow::{bail, Result};

use crate::Color;

/// Represents a single square on an 8x8 chess board.
///
/// Squares are addressed by `(x, y)` coordinates, where `x` is the file (`0 = a`, `7 = h`)
/// and `y` counts downward from the top of the board, so `y = 0` is the 8th rank and `y = 7` is the 1st rank.
///
/// Internally, this is stored as `y * 8 + x`.
/// The absence of a square (such as when no en passant capture is available) is expressed as [`Option<Square>`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Square(u8);

#[rustfmt::skip]
impl Square {
    pub const A8: Self = Self(0); pub const B8: Self = Self(1); pub const C8: Self = Self(2); pub const D8: Self = Self(3); pub const E8: Self = Self(4); pub const F8: Self = Self(5); pub const G8: Self = Self(6); pub const H8: Self = Self(7);
    pub const A7: Self = Self(8); pub const B7: Self = Self(9); pub const C7: Self = Self(10); pub const D7: Self = Self(11); pub const E7: Self = Self(12); pub const F7: Self = Self(13); pub const G7: Self = Self(14); pub const H7: Self = Self(15);
    pub const A6: Self = Self(16); pub const B6: Self = Self(17); pub const C6: Self = Self(18); pub const D6: Self = Self(19); pub const E6: Self = Self(20); pub const F6: Self = Self(21); pub const G6: Self = Self(22); pub const H6: Self = Self(23);
    pub const A5: Self = Self(24); pub const B5: Self = Self(25); pub const C5: Self = Self(26); pub const D5: Self = Self(27); pub const E5: Self = Self(28); pub const F5: Self = Self(29); pub const G5: Self = Self(30); pub const H5: Self = Self(31);
    pub const A4: Self = Self(32); pub const B4: Self = Self(33); pub const C4: Self = Self(34); pub const D4: Self = Self(35); pub const E4: Self = Self(36); pub const F4: Self = Self(37); pub const G4: Self = Self(38); pub const H4: Self = Self(39);
    pub const A3: Self = Self(40); pub const B3: Self = Self(41); pub const C3: Self = Self(42); pub const D3: Self = Self(43); pub const E3: Self = Self(44); pub const F3: Self = Self(45); pub const G3: Self = Self(46); pub const H3: Self = Self(47);
    pub const A2: Self = Self(48); pub const B2: Self = Self(49); pub const C2: Self = Self(50); pub const D2: Self = Self(51); pub const E2: Self = Self(52); pub const F2: Self = Self(53); pub const G2: Self = Self(54); pub const H2: Self = Self(55);
    pub const A1: Self = Self(56); pub const B1: Self = Self(57); pub const C1: Self = Self(58); pub const D1: Self = Self(59); pub const E1: Self = Self(60); pub const F1: Self = Self(61); pub const G1: Self = Self(62); pub const H1: Self = Self(63);
}

impl Square {
    /// Number of squares on the board.
    pub const COUNT: usize = 64;

    /// Creates a new [`Square`] from `(x, y)` coordinates, if they lie on the board.
    ///
    /// # Example
    /// ```
    /// # use kibitz::Square;
    /// assert_eq!(Square::new(4, 7), Some(Square::E1));
    /// assert_eq!(Square::new(0, 0), Some(Square::A8));
    /// assert_eq!(Square::new(-1, 3), None);
    /// assert_eq!(Square::new(3, 8), None);
    /// ```
    #[inline(always)]
    pub const fn new(x: i32, y: i32) -> Option<Self> {
        if Self::on_board(x, y) {
            Some(Self((y * 8 + x) as u8))
        } else {
            None
        }
    }

    /// Returns `true` if `(x, y)` lies within the 8x8 board.
    #[inline(always)]
    pub const fn on_board(x: i32, y: i32) -> bool {
        x >= 0 && x <= 7 && y >= 0 && y <= 7
    }

    /// An iterator over all squares, from a8 to h1, row by row.
    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    /// The file of this [`Square`], where `0` is the a-file.
    #[inline(always)]
    pub const fn x(&self) -> i32 {
        (self.0 % 8) as i32
    }

    /// The row of this [`Square`], where `0` is the 8th rank.
    #[inline(always)]
    pub const fn y(&self) -> i32 {
        (self.0 / 8) as i32
    }

    /// Returns this [`Square`] as a `usize`, in the range `[0, 63]`.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Attempt to offset this [`Square`] by the provided deltas.
    ///
    /// # Example
    /// ```
    /// # use kibitz::Square;
    /// assert_eq!(Square::E2.offset(0, -2), Some(Square::E4));
    /// assert_eq!(Square::H1.offset(1, 0), None);
    /// ```
    #[inline(always)]
    pub const fn offset(&self, dx: i32, dy: i32) -> Option<Self> {
        Self::new(self.x() + dx, self.y() + dy)
    }

    /// The character of this [`Square`]'s file, such as `'e'`.
    #[inline(always)]
    pub const fn file_char(&self) -> char {
        (b'a' + (self.0 % 8)) as char
    }

    /// The character of this [`Square`]'s rank, such as `'4'`.
    #[inline(always)]
    pub const fn rank_char(&self) -> char {
        (b'8' - (self.0 / 8)) as char
    }

    /// Converts a file character (`a`-`h`) into an `x` coordinate.
    #[inline(always)]
    pub const fn x_from_char(file: char) -> Option<i32> {
        match file {
            'a'..='h' => Some(file as i32 - 'a' as i32),
            _ => None,
        }
    }

    /// Converts a rank character (`1`-`8`) into a `y` coordinate.
    #[inline(always)]
    pub const fn y_from_char(rank: char) -> Option<i32> {
        match rank {
            '1'..='8' => Some(7 - (rank as i32 - '1' as i32)),
            _ => None,
        }
    }

    /// The row on which pawns of `color` begin the game.
    #[inline(always)]
    pub const fn pawn_home_y(color: Color) -> i32 {
        match color {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// The row on which pawns of `color` promote.
    #[inline(always)]
    pub const fn promotion_y(color: Color) -> i32 {
        match color {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Creates a [`Square`] from a string, according to the [Universal Chess Interface](https://en.wikipedia.org//wiki/Universal_Chess_Interface) notation.
    ///
    /// # Example
    /// ```
    /// # use kibitz::Square;
    /// let c4 = Square::from_uci("c4");
    /// assert!(c4.is_ok());
    /// assert_eq!(c4.unwrap(), Square::C4);
    ///
    /// let err = Square::from_uci("z0");
    /// assert!(err.is_err());
    /// ```
    pub fn from_uci(square: &str) -> Result<Self> {
        let mut chars = square.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            bail!("Invalid Square string: String must contain exactly 2 characters. Got {square:?}")
        };

        let (Some(x), Some(y)) = (Self::x_from_char(file), Self::y_from_char(rank)) else {
            bail!("Invalid Square string: {square:?} is not on the board")
        };

        Ok(Self((y * 8 + x) as u8))
    }

    /// Converts this [`Square`] to a string, according to the [Universal Chess Interface](https://en.wikipedia.org//wiki/Universal_Chess_Interface) notation.
    ///
    /// # Example
    /// ```
    /// # use kibitz::Square;
    /// assert_eq!("c4", Square::C4.to_uci());
    /// ```
    #[inline(always)]
    pub fn to_uci(self) -> String {
        format!("{}{}", self.file_char(), self.rank_char())
    }
}

impl FromStr for Square {
    type Err = anyhow::Error;
    /// Wrapper for [`Square::from_uci`].
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uci(s)
    }
}

impl fmt::Display for Square {
    /// Calls [`Square::to_uci`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_uci().fmt(f)
    }
}

impl fmt::Debug for Square {
    /// Displays the square's name and its `(x, y)` coordinates.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.to_uci(), self.x(), self.y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_are_top_down() {
        assert_eq!((Square::A8.x(), Square::A8.y()), (0, 0));
        assert_eq!((Square::H1.x(), Square::H1.y()), (7, 7));
        assert_eq!((Square::E4.x(), Square::E4.y()), (4, 4));
        assert_eq!(Square::new(4, 4), Some(Square::E4));
    }

    #[test]
    fn test_uci_conversions() {
        for square in Square::iter() {
            assert_eq!(Square::from_uci(&square.to_uci()).unwrap(), square);
        }
        assert_eq!(Square::from_uci("d6").unwrap(), Square::D6);
        assert!(Square::from_uci("i1").is_err());
        assert!(Square::from_uci("a9").is_err());
        assert!(Square::from_uci("a").is_err());
        assert!(Square::from_uci("a1b").is_err());
    }

    #[test]
    fn test_char_helpers() {
        assert_eq!(Square::x_from_char('c'), Some(2));
        assert_eq!(Square::x_from_char('z'), None);
        assert_eq!(Square::y_from_char('1'), Some(7));
        assert_eq!(Square::y_from_char('8'), Some(0));
        assert_eq!(Square::y_from_char('0'), None);
        assert_eq!(Square::G7.file_char(), 'g');
        assert_eq!(Square::G7.rank_char(), '7');
    }
}
