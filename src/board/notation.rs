/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use thiserror::Error;

use super::{Move, Piece, PieceKind, Position, Square};

/// Reasons a move in algebraic notation cannot be resolved against a position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("illegal castling")]
    IllegalCastling,

    #[error("piece not found")]
    PieceNotFound,

    #[error("piece found but move illegal")]
    IllegalMove,

    #[error("ambiguous moves: [{}]", join_moves(.0))]
    AmbiguousMove(Vec<Move>),

    #[error("cannot read a destination square from {0:?}")]
    Malformed(String),
}

fn join_moves(moves: &[Move]) -> String {
    moves
        .iter()
        .map(Move::to_uci)
        .collect::<Vec<_>>()
        .join(",")
}

impl Position {
    /// Resolves a move written in standard algebraic notation (`Nf3`, `exd5`, `O-O`, `e8=Q+`) into a legal [`Move`].
    ///
    /// Capture, check, and annotation marks are ignored, as are castling written with zeroes and hyphenated long-form moves.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{NotationError, Position};
    /// let pos = Position::default();
    /// assert_eq!(pos.resolve_notation("Nf3").unwrap(), "g1f3");
    /// assert_eq!(pos.resolve_notation("e4!?").unwrap(), "e2e4");
    /// assert_eq!(pos.resolve_notation("Qd3"), Err(NotationError::IllegalMove));
    /// assert_eq!(pos.resolve_notation("N4e5"), Err(NotationError::PieceNotFound));
    /// ```
    pub fn resolve_notation(&self, text: &str) -> Result<Move, NotationError> {
        let mut s = text
            .trim_end_matches(|c| c == '!' || c == '?')
            .chars()
            .filter(|c| !matches!(c, 'x' | '+' | '#'))
            .collect::<String>();

        if !s.is_empty() && s.chars().all(|c| c == '0' || c == '-') {
            s = s.replace('0', "O");
        }

        let color = self.side_to_move();
        let castle = match s.to_ascii_uppercase().as_str() {
            "O-O" => Some(if color.is_white() {
                Move::WHITE_SHORT_CASTLE
            } else {
                Move::BLACK_SHORT_CASTLE
            }),
            "O-O-O" => Some(if color.is_white() {
                Move::WHITE_LONG_CASTLE
            } else {
                Move::BLACK_LONG_CASTLE
            }),
            _ => None,
        };

        if let Some(castle) = castle {
            return match self.illegal_reason(castle) {
                None => Ok(castle),
                Some(_) => Err(NotationError::IllegalCastling),
            };
        }

        s.retain(|c| c != '-');

        let mut chars = s.chars().collect::<Vec<_>>();

        let mut promotion = None;
        let n = chars.len();
        if n >= 2 && chars[n - 2] == '=' {
            promotion = PieceKind::from_letter(chars[n - 1]);
            chars.truncate(n - 2);
        } else if n >= 3 && chars[n - 2].is_ascii_digit() && matches!(chars[n - 1], 'Q' | 'R' | 'B' | 'N') {
            promotion = PieceKind::from_letter(chars[n - 1]);
            chars.truncate(n - 1);
        }

        let kind = match chars.first() {
            Some(&c) if "KQRBNP".contains(c) => {
                chars.remove(0);
                PieceKind::from_letter(c).unwrap_or(PieceKind::Pawn)
            }
            _ => PieceKind::Pawn,
        };

        if chars.len() < 2 {
            return Err(NotationError::Malformed(text.to_string()));
        }
        let split = chars.len() - 2;
        let dest = chars[split..].iter().collect::<String>();
        let dest = Square::from_uci(&dest).map_err(|_| NotationError::Malformed(text.to_string()))?;
        let disambiguators = &chars[..split];

        let (mut xs, mut ys) = (0..=7, 0..=7);
        for &c in disambiguators {
            if let Some(x) = Square::x_from_char(c) {
                xs = x..=x;
            }
            if let Some(y) = Square::y_from_char(c) {
                ys = y..=y;
            }
        }

        // An undisambiguated pawn move stays on its file
        if kind == PieceKind::Pawn && disambiguators.is_empty() {
            xs = dest.x()..=dest.x();
        }

        let sources = self.find_in(Piece::new(color, kind), xs, ys);
        if sources.is_empty() {
            return Err(NotationError::PieceNotFound);
        }

        let mut valid = sources
            .into_iter()
            .map(|from| Move::new(from, dest))
            .filter(|&mv| self.is_legal(mv))
            .collect::<Vec<_>>();

        match valid.len() {
            0 => Err(NotationError::IllegalMove),
            1 => {
                let mv = valid.remove(0).with_promotion(promotion);
                Ok(self.normalize_move(mv))
            }
            _ => Err(NotationError::AmbiguousMove(valid)),
        }
    }

    /// Renders a legal `mv` in standard algebraic notation, for display only.
    ///
    /// Pieces are disambiguated by file or rank when exactly two of them can reach the destination,
    /// and by their full source square when more can. A `+` is appended when the move gives check.
    /// If the source square is empty, `"??"` is returned.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Move, Position};
    /// let pos: Position = "4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1".parse().unwrap();
    /// assert_eq!(pos.nice_string(Move::from_uci("e1g1").unwrap()), "O-O");
    /// assert_eq!(pos.nice_string(Move::from_uci("a1a8").unwrap()), "Ra8+");
    /// assert_eq!(pos.nice_string(Move::from_uci("h1f1").unwrap()), "Rf1");
    /// ```
    pub fn nice_string(&self, mv: Move) -> String {
        let (source, dest) = (mv.from(), mv.to());

        let Some(piece) = self.piece_at(source) else {
            return String::from("??");
        };

        let opponent = self.side_to_move().opponent();
        let next = self.apply_move(mv);
        let check = if next.is_attacked(self.king(opponent), opponent) {
            "+"
        } else {
            ""
        };

        if piece.is_pawn() {
            let mut ret = if source.x() == dest.x() {
                dest.to_uci()
            } else {
                format!("{}x{dest}", source.file_char())
            };

            // A bare move onto the last rank queens, as in `apply_move`
            let promotion = mv.promotion().or_else(|| {
                (dest.y() == Square::promotion_y(piece.color())).then_some(PieceKind::Queen)
            });
            if let Some(promotion) = promotion {
                ret.push('=');
                ret.push(promotion.letter());
            }

            return ret + check;
        }

        if piece.is_king() && mv.is_castling_hop() {
            let castle = if dest.x() == 6 { "O-O" } else { "O-O-O" };
            return format!("{castle}{check}");
        }

        let letter = piece.kind().letter();
        let capture = if self.is_empty(dest) { "" } else { "x" };

        let valid = self
            .find(piece)
            .into_iter()
            .filter(|&from| self.is_legal(Move::new(from, dest)))
            .collect::<Vec<_>>();

        let disambiguator = match valid[..] {
            [a, b] => {
                // Use the true source, which need not be either candidate
                if a.x() == b.x() {
                    source.rank_char().to_string()
                } else {
                    source.file_char().to_string()
                }
            }
            [_, _, _, ..] => source.to_uci(),
            _ => String::new(),
        };

        format!("{letter}{disambiguator}{capture}{dest}{check}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(fen: &str, san: &str) -> Result<String, NotationError> {
        let pos = Position::from_fen(fen).unwrap();
        pos.resolve_notation(san).map(|mv| mv.to_uci())
    }

    fn nice(fen: &str, uci: &str) -> String {
        let pos = Position::from_fen(fen).unwrap();
        pos.nice_string(Move::from_uci(uci).unwrap())
    }

    #[test]
    fn test_resolve_pawn_moves() {
        let start = crate::FEN_STARTPOS;
        assert_eq!(resolve(start, "e4").unwrap(), "e2e4");
        assert_eq!(resolve(start, "e3").unwrap(), "e2e3");
        assert_eq!(resolve(start, "e5"), Err(NotationError::IllegalMove));

        let capture = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2";
        assert_eq!(resolve(capture, "exd5").unwrap(), "e4d5");
        assert_eq!(resolve(capture, "ed5").unwrap(), "e4d5");
        assert_eq!(resolve(capture, "d5"), Err(NotationError::IllegalMove));
        assert_eq!(resolve(capture, "N5d4"), Err(NotationError::PieceNotFound));

        let ep = "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";
        assert_eq!(resolve(ep, "exd6").unwrap(), "e5d6");
    }

    #[test]
    fn test_resolve_promotions() {
        let fen = "1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1";
        assert_eq!(resolve(fen, "a8=N").unwrap(), "a7a8n");
        assert_eq!(resolve(fen, "a8Q").unwrap(), "a7a8q");
        assert_eq!(resolve(fen, "a8").unwrap(), "a7a8q");
        assert_eq!(resolve(fen, "axb8=R+").unwrap(), "a7b8r");
    }

    #[test]
    fn test_resolve_castling() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(resolve(fen, "O-O").unwrap(), "e1g1");
        assert_eq!(resolve(fen, "0-0-0").unwrap(), "e1c1");
        assert_eq!(resolve(fen, "o-o-o").unwrap(), "e1c1");

        let black = "r3k2r/8/8/8/8/8/8/R3K2R b Kk - 0 1";
        assert_eq!(resolve(black, "O-O+").unwrap(), "e8g8");
        assert_eq!(resolve(black, "O-O-O"), Err(NotationError::IllegalCastling));
    }

    #[test]
    fn test_resolve_disambiguation() {
        // Two knights can reach d2
        let fen = "4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1";
        assert_eq!(
            resolve(fen, "Nd2"),
            Err(NotationError::AmbiguousMove(vec![
                Move::new(Square::B1, Square::D2),
                Move::new(Square::F3, Square::D2),
            ]))
        );
        assert_eq!(
            resolve(fen, "Nd2").unwrap_err().to_string(),
            "ambiguous moves: [b1d2,f3d2]"
        );
        assert_eq!(resolve(fen, "Nbd2").unwrap(), "b1d2");
        assert_eq!(resolve(fen, "N3d2").unwrap(), "f3d2");
        assert_eq!(resolve(fen, "Nf3d2").unwrap(), "f3d2");
        assert_eq!(resolve(fen, "Nf3-d2").unwrap(), "f3d2");

        // A pinned rook does not count as a candidate
        let pinned = "4k3/4r3/8/8/8/8/R3R3/4K3 w - - 0 1";
        assert_eq!(resolve(pinned, "Rd2").unwrap(), "a2d2");
        assert_eq!(resolve(pinned, "Rf2"), Err(NotationError::IllegalMove));
    }

    #[test]
    fn test_resolve_malformed() {
        let start = crate::FEN_STARTPOS;
        assert!(matches!(resolve(start, "N"), Err(NotationError::Malformed(_))));
        assert!(matches!(resolve(start, "Nz9"), Err(NotationError::Malformed(_))));
        assert!(matches!(resolve(start, ""), Err(NotationError::Malformed(_))));
    }

    #[test]
    fn test_nice_string_pieces() {
        let start = crate::FEN_STARTPOS;
        assert_eq!(nice(start, "g1f3"), "Nf3");
        assert_eq!(nice(start, "e2e4"), "e4");
        assert_eq!(nice(start, "e4e5"), "??");

        // Two knights on different files
        let fen = "4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1";
        assert_eq!(nice(fen, "b1d2"), "Nbd2");
        assert_eq!(nice(fen, "f3d2"), "Nfd2");

        // Two rooks on the same file
        let fen = "4k3/R7/8/8/8/8/R7/4K3 w - - 0 1";
        assert_eq!(nice(fen, "a2a5"), "R2a5");
        assert_eq!(nice(fen, "a7a5"), "R7a5");

        // Three queens reaching the same square
        let fen = "k7/8/8/8/Q6Q/8/8/K6Q w - - 0 1";
        assert_eq!(nice(fen, "h4e4"), "Qh4e4+");
        assert_eq!(nice(fen, "a4e4"), "Qa4e4+");
    }

    #[test]
    fn test_nice_string_pawns_and_checks() {
        let capture = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2";
        assert_eq!(nice(capture, "e4d5"), "exd5");

        let promotion = "1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1";
        assert_eq!(nice(promotion, "a7a8q"), "a8=Q");
        assert_eq!(nice(promotion, "a7b8n"), "axb8=N");
        assert_eq!(nice(promotion, "a7b8q"), "axb8=Q+");
        assert_eq!(nice(promotion, "a7a8"), "a8=Q");
        assert_eq!(nice(promotion, "a7b8"), "axb8=Q+");

        let check = "4k3/8/8/8/8/8/8/4K2R w K - 0 1";
        assert_eq!(nice(check, "h1h8"), "Rh8+");
        assert_eq!(nice(check, "e1g1"), "O-O");

        let capture_check = "4k3/8/8/8/8/8/7p/4K2R w K - 0 1";
        assert_eq!(nice(capture_check, "h1h2"), "Rxh2");
    }
}
