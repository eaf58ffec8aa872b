/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Result};

use crate::{PieceKind, Square};

/// Represents a move made on a chess board, in coordinate form.
///
/// A [`Move`] carries no information about the piece being moved or the position it is played in.
/// It is the typed counterpart of the [Universal Chess Interface](https://en.wikipedia.org//wiki/Universal_Chess_Interface)
/// move string used on the wire (`e2e4`, `e7e8q`), and castling is always expressed as the king's two-square hop (`e1g1`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
}

impl Move {
    /// White's kingside castle.
    pub const WHITE_SHORT_CASTLE: Self = Self::new(Square::E1, Square::G1);
    /// White's queenside castle.
    pub const WHITE_LONG_CASTLE: Self = Self::new(Square::E1, Square::C1);
    /// Black's kingside castle.
    pub const BLACK_SHORT_CASTLE: Self = Self::new(Square::E8, Square::G8);
    /// Black's queenside castle.
    pub const BLACK_LONG_CASTLE: Self = Self::new(Square::E8, Square::C8);

    /// Creates a new [`Move`] without a promotion.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Move, Square};
    /// let e2e4 = Move::new(Square::E2, Square::E4);
    /// assert_eq!(e2e4.to_string(), "e2e4");
    /// ```
    #[inline(always)]
    pub const fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    /// Creates a new [`Move`] that promotes to `promotion`.
    #[inline(always)]
    pub const fn new_promotion(from: Square, to: Square, promotion: PieceKind) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }

    /// Returns a copy of this [`Move`] with its promotion replaced.
    #[inline(always)]
    pub const fn with_promotion(self, promotion: Option<PieceKind>) -> Self {
        Self { promotion, ..self }
    }

    /// Fetches the source [`Square`] of this [`Move`].
    #[inline(always)]
    pub const fn from(&self) -> Square {
        self.from
    }

    /// Fetches the destination [`Square`] of this [`Move`].
    #[inline(always)]
    pub const fn to(&self) -> Square {
        self.to
    }

    /// Fetches the [`PieceKind`] this [`Move`] promotes to, if any.
    #[inline(always)]
    pub const fn promotion(&self) -> Option<PieceKind> {
        self.promotion
    }

    /// Returns `true` if this [`Move`]'s squares match one of the four standard castling hops.
    ///
    /// Whether it is actually a castle depends on the moving piece being a king.
    #[inline(always)]
    pub fn is_castling_hop(&self) -> bool {
        let hop = self.with_promotion(None);
        hop == Self::WHITE_SHORT_CASTLE
            || hop == Self::WHITE_LONG_CASTLE
            || hop == Self::BLACK_SHORT_CASTLE
            || hop == Self::BLACK_LONG_CASTLE
    }

    /// Creates a [`Move`] from a string, according to the [Universal Chess Interface](https://en.wikipedia.org//wiki/Universal_Chess_Interface) notation.
    ///
    /// The promotion letter, if present, may be either case but must name a knight, bishop, rook, or queen.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Move, PieceKind, Square};
    /// let mv = Move::from_uci("b7b8N").unwrap();
    /// assert_eq!(mv.to(), Square::B8);
    /// assert_eq!(mv.promotion(), Some(PieceKind::Knight));
    ///
    /// assert!(Move::from_uci("e2").is_err());
    /// assert!(Move::from_uci("e7e8k").is_err());
    /// ```
    pub fn from_uci(uci: &str) -> Result<Self> {
        let from = uci
            .get(0..2)
            .ok_or(anyhow!("Move str must contain a `from` square. Got {uci:?}"))?;
        let to = uci
            .get(2..4)
            .ok_or(anyhow!("Move str must contain a `to` square. Got {uci:?}"))?;

        let from = Square::from_uci(from)?;
        let to = Square::from_uci(to)?;

        let promotion = match uci.get(4..) {
            None | Some("") => None,
            Some(p) => {
                let kind = PieceKind::from_str(p)?;
                if matches!(kind, PieceKind::Pawn | PieceKind::King) {
                    bail!("Cannot promote to a {} in {uci:?}", kind.name());
                }
                Some(kind)
            }
        };

        Ok(Self { from, to, promotion })
    }

    /// Converts this [`Move`] to a string, according to the [Universal Chess Interface](https://en.wikipedia.org//wiki/Universal_Chess_Interface) notation.
    ///
    /// Promotions are always lowercase.
    #[inline(always)]
    pub fn to_uci(&self) -> String {
        if let Some(promote) = self.promotion {
            format!("{}{}{}", self.from, self.to, promote)
        } else {
            format!("{}{}", self.from, self.to)
        }
    }
}

impl FromStr for Move {
    type Err = anyhow::Error;
    /// Wrapper for [`Move::from_uci`].
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uci(s)
    }
}

impl fmt::Display for Move {
    /// A [`Move`] is displayed in its UCI format.
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl fmt::Debug for Move {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl<T: AsRef<str>> PartialEq<T> for Move {
    #[inline(always)]
    fn eq(&self, other: &T) -> bool {
        self.to_uci().eq(other.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_parsing() {
        let mv = Move::from_uci("e2e4").unwrap();
        assert_eq!(mv, Move::new(Square::E2, Square::E4));
        assert_eq!(mv.promotion(), None);

        let mv = Move::from_uci("a2a1Q").unwrap();
        assert_eq!(mv, Move::new_promotion(Square::A2, Square::A1, PieceKind::Queen));
        assert_eq!(mv.to_uci(), "a2a1q");

        assert!(Move::from_uci("").is_err());
        assert!(Move::from_uci("e9e4").is_err());
        assert!(Move::from_uci("e7e8p").is_err());
        assert!(Move::from_uci("e7e8qq").is_err());
    }

    #[test]
    fn test_move_eq_str() {
        let mv = Move::new(Square::G1, Square::F3);
        assert_eq!(mv, "g1f3");
        assert_ne!(mv, "g1f3q");
    }

    #[test]
    fn test_castling_hops() {
        assert!(Move::WHITE_SHORT_CASTLE.is_castling_hop());
        assert!(Move::from_uci("e8c8").unwrap().is_castling_hop());
        assert!(!Move::from_uci("e1f1").unwrap().is_castling_hop());
    }
}
