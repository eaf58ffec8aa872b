/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// The interactive front end: event loop, current node, and analysis control.
mod app;

/// Positions, moves, legality, FEN and algebraic notation.
mod board;

/// Command line arguments and REPL commands.
mod cli;

/// TOML configuration.
mod config;

/// Communication with a UCI engine subprocess.
mod engine;

/// Per-move analysis records.
mod info;

/// Reading and writing PGN.
mod pgn;

/// Analysis table for a single position, and the parser for engine output.
mod table;

/// The game tree of positions and variations.
mod tree;

pub use app::*;
pub use board::*;
pub use cli::*;
pub use config::*;
pub use engine::*;
pub use info::*;
pub use pgn::*;
pub use table::*;
pub use tree::*;
