/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use thiserror::Error;

use super::{Color, Move, PieceKind, Position, Square};

/// Which way a king castles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastlingSide {
    Kingside,
    Queenside,
}

impl CastlingSide {
    /// Fetches a human-readable name for this [`CastlingSide`].
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Kingside => "kingside",
            Self::Queenside => "queenside",
        }
    }
}

/// The reason a move cannot be played in a position.
///
/// Each variant displays as a short human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("malformed move {0:?}")]
    Malformed(String),

    #[error("off board")]
    OffBoard,

    #[error("wrong colour source")]
    WrongColourSource,

    #[error("source and destination have same colour")]
    SameColour,

    #[error("illegal knight movement")]
    KnightMovement,

    #[error("illegal bishop movement")]
    BishopMovement,

    #[error("illegal rook movement")]
    RookMovement,

    #[error("illegal queen movement")]
    QueenMovement,

    #[error("pawn cannot capture forwards")]
    PawnCapturesForwards,

    #[error("pawn cannot move that far sideways")]
    PawnTooFarSideways,

    #[error("pawn cannot capture thin air")]
    PawnCapturesThinAir,

    #[error("pawn must move 1 forward when capturing")]
    PawnCaptureDistance,

    #[error("pawn must move forwards 1")]
    PawnMustAdvanceOne,

    #[error("pawn must move forwards 1 or 2")]
    PawnMustAdvanceOneOrTwo,

    #[error("illegal king movement")]
    KingMovement,

    #[error("{} lost the right to castle {}", .color.name(), .side.name())]
    NoCastlingRight { color: Color, side: CastlingSide },

    #[error("queenside castling blocked on B-file")]
    QueensideBlocked,

    #[error("no rook to castle with")]
    NoCastlingRook,

    #[error("castling destination occupied")]
    CastlingDestinationOccupied,

    #[error("cannot castle under check")]
    CastleUnderCheck,

    #[error("cannot castle through check")]
    CastleThroughCheck,

    #[error("movement blocked")]
    Blocked,

    #[error("king in check")]
    KingInCheck,
}

/// The eight compass directions, orthogonals first.
const DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

/// Every knight jump.
const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

impl Position {
    /// Checks a move given as a string in coordinate notation.
    ///
    /// Returns `None` if the move is legal, or the reason it is not.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{IllegalMove, Position};
    /// let pos = Position::default();
    /// assert_eq!(pos.is_illegal("e2e4"), None);
    /// assert_eq!(pos.is_illegal("e2e5"), Some(IllegalMove::PawnMustAdvanceOneOrTwo));
    /// assert_eq!(pos.is_illegal("e7e5"), Some(IllegalMove::WrongColourSource));
    /// assert_eq!(pos.is_illegal("i2i4"), Some(IllegalMove::OffBoard));
    /// ```
    pub fn is_illegal(&self, text: &str) -> Option<IllegalMove> {
        let mut chars = text.chars();
        let coords = [chars.next(), chars.next(), chars.next(), chars.next()];
        let [Some(_), Some(_), Some(_), Some(_)] = coords else {
            return Some(IllegalMove::Malformed(text.to_string()));
        };

        match Move::from_uci(text) {
            Ok(mv) => self.illegal_reason(mv),
            Err(_) if text.get(..4).is_some_and(|c| c.is_ascii()) => {
                // Four plausible characters that do not name two squares
                let squares_ok = text
                    .get(0..2)
                    .zip(text.get(2..4))
                    .is_some_and(|(a, b)| a.parse::<Square>().is_ok() && b.parse::<Square>().is_ok());

                if squares_ok {
                    Some(IllegalMove::Malformed(text.to_string()))
                } else {
                    Some(IllegalMove::OffBoard)
                }
            }
            Err(_) => Some(IllegalMove::Malformed(text.to_string())),
        }
    }

    /// Returns `true` if `mv` can be played in this position.
    #[inline(always)]
    pub fn is_legal(&self, mv: Move) -> bool {
        self.illegal_reason(mv).is_none()
    }

    /// Checks whether `mv` is legal, returning the first rule it breaks.
    ///
    /// Rules are checked in this order: ownership of the source square, capture of a friendly piece,
    /// piece geometry (including pawn and castling rules), obstruction, and finally whether the mover's king is left attacked.
    pub fn illegal_reason(&self, mv: Move) -> Option<IllegalMove> {
        use IllegalMove::*;

        let (from, to) = (mv.from(), mv.to());
        let (x1, y1, x2, y2) = (from.x(), from.y(), to.x(), to.y());
        let (dx, dy) = (x2 - x1, y2 - y1);

        let piece = match self.piece_at(from) {
            Some(piece) if piece.color() == self.side_to_move() => piece,
            _ => return Some(WrongColourSource),
        };

        if self.same_color(from, to) {
            return Some(SameColour);
        }

        match piece.kind() {
            PieceKind::Knight => {
                if dx.abs() + dy.abs() != 3 || dx == 0 || dy == 0 {
                    return Some(KnightMovement);
                }
            }

            PieceKind::Bishop => {
                if dx.abs() != dy.abs() {
                    return Some(BishopMovement);
                }
            }

            PieceKind::Rook => {
                if dx != 0 && dy != 0 {
                    return Some(RookMovement);
                }
            }

            PieceKind::Queen => {
                if dx.abs() != dy.abs() && dx != 0 && dy != 0 {
                    return Some(QueenMovement);
                }
            }

            PieceKind::Pawn => {
                if let Some(reason) = self.pawn_geometry(piece.color(), from, to) {
                    return Some(reason);
                }
            }

            PieceKind::King => {
                if dy.abs() > 1 {
                    return Some(KingMovement);
                }

                if dx.abs() > 1 {
                    if let Some(reason) = self.castling_obstacle(mv) {
                        return Some(reason);
                    }
                }
            }
        }

        if !piece.is_knight() && !self.line_of_sight(from, to) {
            return Some(Blocked);
        }

        let next = self.apply_move(mv);
        let king = next.king(piece.color());
        if king.is_some() && next.is_attacked(king, piece.color()) {
            return Some(KingInCheck);
        }

        None
    }

    fn pawn_geometry(&self, color: Color, from: Square, to: Square) -> Option<IllegalMove> {
        use IllegalMove::*;

        let (dx, dy) = (to.x() - from.x(), to.y() - from.y());
        let forward = match color {
            Color::White => -1,
            Color::Black => 1,
        };

        if dx == 0 && !self.is_empty(to) {
            return Some(PawnCapturesForwards);
        }

        if dx.abs() > 1 {
            return Some(PawnTooFarSideways);
        }

        if dx.abs() == 1 {
            if self.is_empty(to) && self.ep_square() != Some(to) {
                return Some(PawnCapturesThinAir);
            }
            if dy.abs() != 1 {
                return Some(PawnCaptureDistance);
            }
        }

        if from.y() != Square::pawn_home_y(color) {
            if dy != forward {
                return Some(PawnMustAdvanceOne);
            }
        } else if dy != forward && dy != 2 * forward {
            return Some(PawnMustAdvanceOneOrTwo);
        }

        None
    }

    /// Everything that can stop a king's two-square hop, other than obstruction and self-check.
    fn castling_obstacle(&self, mv: Move) -> Option<IllegalMove> {
        use IllegalMove::*;

        let (color, side, rook_home) = match mv.with_promotion(None) {
            Move::WHITE_SHORT_CASTLE => (Color::White, CastlingSide::Kingside, Square::H1),
            Move::WHITE_LONG_CASTLE => (Color::White, CastlingSide::Queenside, Square::A1),
            Move::BLACK_SHORT_CASTLE => (Color::Black, CastlingSide::Kingside, Square::H8),
            Move::BLACK_LONG_CASTLE => (Color::Black, CastlingSide::Queenside, Square::A8),
            _ => return Some(KingMovement),
        };

        let rights = self.castling_rights_for(color);
        let permitted = match side {
            CastlingSide::Kingside => rights.short,
            CastlingSide::Queenside => rights.long,
        };
        if !permitted {
            return Some(NoCastlingRight { color, side });
        }

        let (from, to) = (mv.from(), mv.to());

        if side == CastlingSide::Queenside && Square::new(1, from.y()).is_some_and(|b| !self.is_empty(b)) {
            return Some(QueensideBlocked);
        }

        if self.piece_at(rook_home).map(|p| (p.color(), p.kind())) != Some((color, PieceKind::Rook)) {
            return Some(NoCastlingRook);
        }

        if !self.is_empty(to) {
            return Some(CastlingDestinationOccupied);
        }

        if self.is_attacked(from, color) {
            return Some(CastleUnderCheck);
        }

        let transit = Square::new((from.x() + to.x()) / 2, from.y());
        if self.is_attacked(transit, color) {
            return Some(CastleThroughCheck);
        }

        None
    }

    /// Returns `true` if any piece hostile to `defender` attacks `target`.
    ///
    /// An absent target (`None`) is never attacked.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Color, Position, Square};
    /// let pos = Position::default();
    /// assert!(pos.is_attacked(Square::F3, Color::Black));
    /// assert!(!pos.is_attacked(Square::E4, Color::Black));
    /// assert!(!pos.is_attacked(None, Color::White));
    /// ```
    pub fn is_attacked(&self, target: impl Into<Option<Square>>, defender: Color) -> bool {
        let Some(target) = target.into() else {
            return false;
        };

        DIRECTIONS
            .iter()
            .any(|&(step_x, step_y)| self.line_attack(target, step_x, step_y, defender))
            || KNIGHT_OFFSETS.iter().any(|&(dx, dy)| {
                target.offset(dx, dy).and_then(|sq| self.piece_at(sq)).is_some_and(|p| {
                    p.is_knight() && p.color() != defender
                })
            })
    }

    /// Walks outward from `target` and reports whether the first piece met attacks back along the ray.
    fn line_attack(&self, target: Square, step_x: i32, step_y: i32, defender: Color) -> bool {
        let diagonal = step_x != 0 && step_y != 0;
        let mut current = target;

        for distance in 1.. {
            let Some(square) = current.offset(step_x, step_y) else {
                return false;
            };
            current = square;

            let Some(piece) = self.piece_at(square) else {
                continue;
            };

            if piece.color() == defender {
                return false;
            }

            return match piece.kind() {
                PieceKind::Queen => true,
                PieceKind::Rook => !diagonal,
                PieceKind::Bishop => diagonal,
                PieceKind::King => distance == 1,
                // Black pawns attack downward (increasing y), so they sit above the target
                PieceKind::Pawn => {
                    distance == 1
                        && diagonal
                        && match piece.color() {
                            Color::Black => step_y == -1,
                            Color::White => step_y == 1,
                        }
                }
                PieceKind::Knight => false,
            };
        }

        false
    }

    /// Returns `true` if `from` and `to` share a file, rank, or diagonal and every square strictly between them is empty.
    ///
    /// # Example
    /// ```
    /// # use kibitz::{Position, Square};
    /// let pos = Position::default();
    /// assert!(pos.line_of_sight(Square::E2, Square::E4));
    /// assert!(!pos.line_of_sight(Square::A1, Square::A3));
    /// assert!(!pos.line_of_sight(Square::B1, Square::C3));
    /// ```
    pub fn line_of_sight(&self, from: Square, to: Square) -> bool {
        let (dx, dy) = (to.x() - from.x(), to.y() - from.y());
        if dx != 0 && dy != 0 && dx.abs() != dy.abs() {
            return false;
        }

        let (step_x, step_y) = (dx.signum(), dy.signum());
        let mut current = from;

        loop {
            let Some(square) = current.offset(step_x, step_y) else {
                return false;
            };
            if square == to || (step_x == 0 && step_y == 0) {
                return true;
            }
            if !self.is_empty(square) {
                return false;
            }
            current = square;
        }
    }

    /// Returns `true` if the side to move's king is attacked.
    pub fn is_in_check(&self) -> bool {
        let color = self.side_to_move();
        self.is_attacked(self.king(color), color)
    }

    /// Lists every legal move by trying every source and destination pair against [`Position::illegal_reason`].
    ///
    /// Pawn moves to the far rank are listed once per promotion choice.
    ///
    /// This is meant for display and testing; it is far too slow for searching.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();

        for (from, piece) in self.pieces() {
            if piece.color() != self.side_to_move() {
                continue;
            }

            for to in Square::iter() {
                let mv = Move::new(from, to);
                if !self.is_legal(mv) {
                    continue;
                }

                if piece.is_pawn() && to.y() == Square::promotion_y(piece.color()) {
                    moves.extend(
                        PieceKind::PROMOTIONS
                            .map(|kind| Move::new_promotion(from, to, kind)),
                    );
                } else {
                    moves.push(mv);
                }
            }
        }

        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FEN_KIWIPETE;

    fn reason(fen: &str, uci: &str) -> Option<IllegalMove> {
        Position::from_fen(fen).unwrap().is_illegal(uci)
    }

    #[test]
    fn test_piece_geometry() {
        use IllegalMove::*;
        let fen = "4k3/8/8/8/3Q4/8/1B6/R3K1N1 w Q - 0 1";

        assert_eq!(reason(fen, "g1e3"), Some(KnightMovement));
        assert_eq!(reason(fen, "g1f3"), None);
        assert_eq!(reason(fen, "b2b4"), Some(BishopMovement));
        assert_eq!(reason(fen, "a1b3"), Some(RookMovement));
        assert_eq!(reason(fen, "d4e6"), Some(QueenMovement));
        assert_eq!(reason(fen, "d4h8"), None);
        assert_eq!(reason(fen, "b2a1"), Some(SameColour));
        assert_eq!(reason(fen, "e1e3"), Some(KingMovement));
        assert_eq!(reason(fen, "a1a3"), None);
        assert_eq!(reason(fen, "d4a1"), Some(SameColour));
        assert_eq!(reason(fen, "d4d8"), None);
        assert_eq!(reason(fen, "b2h8"), Some(Blocked));
    }

    #[test]
    fn test_pawn_rules() {
        use IllegalMove::*;
        let fen = "4k3/8/8/2p5/3P4/2n5/P3P3/4K3 w - - 0 1";

        assert_eq!(reason(fen, "a2a4"), None);
        assert_eq!(reason(fen, "a2a5"), Some(PawnMustAdvanceOneOrTwo));
        assert_eq!(reason(fen, "a2a1"), Some(PawnMustAdvanceOneOrTwo));
        assert_eq!(reason(fen, "d4d6"), Some(PawnMustAdvanceOne));
        assert_eq!(reason(fen, "d4c5"), None);
        assert_eq!(reason(fen, "d4e5"), Some(PawnCapturesThinAir));
        assert_eq!(reason(fen, "a2c4"), Some(PawnTooFarSideways));
        assert_eq!(reason(fen, "e2d3"), Some(PawnCapturesThinAir));
        assert_eq!(reason(fen, "a2b3"), Some(PawnCapturesThinAir));
        assert_eq!(reason(fen, "e2e4"), None);

        let blocked = "4k3/8/8/8/8/4n3/4P3/4K3 w - - 0 1";
        assert_eq!(reason(blocked, "e2e3"), Some(PawnCapturesForwards));
        assert_eq!(reason(blocked, "e2e4"), Some(Blocked));
    }

    #[test]
    fn test_pawn_capture_distance() {
        let fen = "4k3/8/8/8/1p6/8/P7/4K3 w - - 0 1";
        assert_eq!(reason(fen, "a2b4"), Some(IllegalMove::PawnCaptureDistance));
    }

    #[test]
    fn test_pawn_cannot_capture_backwards() {
        use IllegalMove::*;
        let fen = "4k3/8/8/2p5/3P4/2n5/P3P3/1r2K3 w - - 0 1";

        assert_eq!(reason(fen, "d4c3"), Some(PawnMustAdvanceOne));
        assert_eq!(reason(fen, "a2b1"), Some(PawnMustAdvanceOneOrTwo));
        assert_eq!(
            reason(fen, "d4c3").map(|r| r.to_string()).as_deref(),
            Some("pawn must move forwards 1")
        );
    }

    #[test]
    fn test_en_passant_legality() {
        let fen = "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";
        assert_eq!(reason(fen, "e5d6"), None);
        assert_eq!(reason(fen, "e5f6"), Some(IllegalMove::PawnCapturesThinAir));

        // Capturing en passant would expose the king along the rank
        let pinned = "8/8/8/K2pP2r/8/8/8/4k3 w - d6 0 1";
        assert_eq!(reason(pinned, "e5d6"), Some(IllegalMove::KingInCheck));
    }

    #[test]
    fn test_castling() {
        use IllegalMove::*;
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(reason(fen, "e1g1"), None);
        assert_eq!(reason(fen, "e1c1"), None);
        assert_eq!(reason(fen, "e1h1"), Some(SameColour));
        assert_eq!(reason(fen, "e1b1"), Some(KingMovement));

        let no_rights = "r3k2r/8/8/8/8/8/8/R3K2R b Kk - 0 1";
        assert_eq!(
            reason(no_rights, "e8c8"),
            Some(NoCastlingRight {
                color: Color::Black,
                side: CastlingSide::Queenside
            })
        );
        assert_eq!(
            reason(no_rights, "e8c8").unwrap().to_string(),
            "Black lost the right to castle queenside"
        );
        assert_eq!(reason(no_rights, "e8g8"), None);

        let knight_on_b = "rn2k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1";
        assert_eq!(reason(knight_on_b, "e8c8"), Some(QueensideBlocked));

        let bishop_on_f = "r3kb1r/8/8/8/8/8/8/R3K2R b KQkq - 0 1";
        assert_eq!(reason(bishop_on_f, "e8g8"), Some(Blocked));

        let wrong_rook = "r3k2r/8/8/8/8/8/8/R3K2r w KQkq - 0 1";
        assert_eq!(reason(wrong_rook, "e1g1"), Some(NoCastlingRook));
        assert_eq!(reason(wrong_rook, "e1c1"), Some(CastleUnderCheck));

        let checked = "r3k2r/8/8/8/4r3/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(reason(checked, "e1g1"), Some(CastleUnderCheck));

        let through = "r3k2r/8/8/8/5r2/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(reason(through, "e1g1"), Some(CastleThroughCheck));
        assert_eq!(reason(through, "e1c1"), None);

        let into = "r3k2r/8/8/8/6r1/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(reason(into, "e1g1"), Some(KingInCheck));
    }

    #[test]
    fn test_pinned_piece_cannot_move() {
        let fen = "4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1";
        assert_eq!(reason(fen, "e2c3"), Some(IllegalMove::KingInCheck));
    }

    #[test]
    fn test_malformed_strings() {
        let pos = Position::default();
        assert!(matches!(pos.is_illegal("e2"), Some(IllegalMove::Malformed(_))));
        assert!(matches!(pos.is_illegal("e2e4k"), Some(IllegalMove::Malformed(_))));
        assert_eq!(pos.is_illegal("e2e9"), Some(IllegalMove::OffBoard));
    }

    #[test]
    fn test_attacks() {
        let pos = Position::from_fen("4k3/8/8/3p4/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(pos.is_attacked(Square::C4, Color::White));
        assert!(pos.is_attacked(Square::E4, Color::White));
        assert!(!pos.is_attacked(Square::D4, Color::White));
        assert!(!pos.is_attacked(Square::C6, Color::White));

        let pos = Position::from_fen("4k3/8/8/8/3P4/8/8/4K3 b - - 0 1").unwrap();
        assert!(pos.is_attacked(Square::E5, Color::Black));
        assert!(!pos.is_attacked(Square::E3, Color::Black));

        let pos = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 b - - 0 1").unwrap();
        assert!(pos.is_attacked(Square::A8, Color::Black));
        assert!(pos.is_attacked(Square::D2, Color::Black));
        assert!(!pos.is_attacked(Square::C3, Color::Black));
    }

    #[test]
    fn test_check_detection() {
        let pos = Position::from_fen("4k3/8/8/1B6/8/8/8/4K3 b - - 0 1").unwrap();
        assert!(pos.is_in_check());
        assert!(!Position::default().is_in_check());
    }

    #[test]
    fn test_legal_move_counts() {
        assert_eq!(Position::default().legal_moves().len(), 20);
        assert_eq!(FEN_KIWIPETE.parse::<Position>().unwrap().legal_moves().len(), 48);

        let promotions = "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1";
        assert_eq!(promotions.parse::<Position>().unwrap().legal_moves().len(), 24);
    }
}
