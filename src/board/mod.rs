/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Legality checks, attack detection, and legal move listing.
mod legality;

/// Moves in coordinate form.
mod moves;

/// Conversion between [`Move`]s and standard algebraic notation.
mod notation;

/// Colors, piece kinds, and pieces.
mod piece;

/// The [`Position`] value type and its FEN codec.
mod position;

/// Board coordinates.
mod square;

/// Board-related constants.
mod utils;

pub use legality::*;
pub use moves::*;
pub use notation::*;
pub use piece::*;
pub use position::*;
pub use square::*;
pub use utils::*;
