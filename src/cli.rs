/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use uci_parser::UciCommand;

/// Command line arguments.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the engine executable. Overrides the config file.
    #[arg(short, long, value_name = "PATH")]
    pub engine: Option<PathBuf>,

    /// Start from this position instead of the standard starting position.
    #[arg(long, value_name = "FEN", conflicts_with = "pgn")]
    pub fen: Option<String>,

    /// Load a game from this PGN file on startup.
    #[arg(long, value_name = "PATH")]
    pub pgn: Option<PathBuf>,

    /// Which game of the PGN file to load, counting from 1.
    #[arg(long, value_name = "INDEX", default_value_t = 1)]
    pub game: usize,

    /// Arguments for the engine, given after `--`. Overrides the config file.
    #[arg(last = true, value_name = "ENGINE ARGS")]
    pub engine_args: Vec<String>,
}

/// A command typed into the front end.
#[derive(Debug, Clone, Parser)]
#[command(
    multicall = true,
    about,
    rename_all = "lower",
    override_usage("<COMMAND> | <UCI COMMAND>")
)]
pub enum FrontendCommand {
    /// Print the current board.
    #[command(alias = "d")]
    Display,

    /// Print the FEN of the current position, or start a new game from the provided FEN.
    Fen {
        #[arg(allow_hyphen_values = true)]
        fen: Vec<String>,
    },

    /// Play one or more moves, in algebraic (Nf3) or coordinate (g1f3) notation.
    #[command(alias = "m")]
    Move {
        #[arg(required = true, allow_hyphen_values = true)]
        moves: Vec<String>,
    },

    /// Take back moves.
    #[command(alias = "b")]
    Back {
        #[arg(default_value_t = 1)]
        count: usize,
    },

    /// Step forward along the main line.
    #[command(alias = "f")]
    Forward {
        #[arg(default_value_t = 1)]
        count: usize,
    },

    /// Start a new game from the standard starting position.
    #[command(alias = "new")]
    NewGame,

    /// Go to the starting position.
    Root,

    /// Go to the end of the current line.
    End,

    /// List all legal moves in the current position.
    Moves,

    /// Print the moves leading to the current position, and any continuations from it.
    #[command(alias = "h")]
    History,

    /// Load a game from a PGN file.
    Pgn {
        path: PathBuf,

        /// Which game of the file to load, counting from 1.
        #[arg(default_value_t = 1)]
        index: usize,
    },

    /// List the games in the most recently loaded PGN file.
    Games,

    /// Print the tags of the loaded PGN game.
    Tags,

    /// Load every game of a PGN file, reporting those that cannot be played through.
    #[command(alias = "validate")]
    ValidatePgn { path: PathBuf },

    /// Save the moves leading to the current position as a PGN file.
    Save { path: PathBuf },

    /// Start analysing, following the current position as it changes.
    #[command(aliases = ["a", "analyze"])]
    Analyse,

    /// Stop analysing.
    Halt,

    /// Play the engine's top move in the current position.
    #[command(alias = "best")]
    PlayBest,

    /// Make the engine forget its earlier searches.
    #[command(alias = "reset")]
    ResetCache,

    /// Print the engine's analysis of the current position.
    #[command(alias = "t")]
    Table {
        /// Show every move, not just the top few.
        #[arg(short, long, default_value = "false")]
        all: bool,
    },

    /// Quit.
    Exit,

    /// Wrapper over UCI commands sent to the engine.
    #[command(skip)]
    Uci { cmd: UciCommand, raw: String },
}

impl FromStr for FrontendCommand {
    type Err = clap::Error;
    /// Attempt to parse a [`FrontendCommand`] from a string.
    ///
    /// If this fails, it will attempt to parse the string as a [`UciCommand`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::try_parse_from(s.split_ascii_whitespace()) {
            Ok(cmd) => Ok(cmd),
            Err(e) => {
                // If parsing failed, attempt to parse as a UciCommand
                if let Ok(cmd) = UciCommand::new(s) {
                    Ok(Self::Uci {
                        cmd,
                        raw: s.trim().to_string(),
                    })
                } else {
                    Err(e)
                }
            }
        }
    }
}
