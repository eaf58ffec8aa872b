/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::debug;
use thiserror::Error;

use crate::{FenError, Move, MoveTree, NotationError, Position, FEN_STARTPOS};

/// Maximum width of a line of movetext written by [`write_pgn`].
const LINE_WIDTH: usize = 80;

/// Reasons a PGN game could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PgnError {
    #[error("{token:?} -- {reason}")]
    BadMove {
        token: String,
        reason: NotationError,
    },

    #[error("invalid FEN tag: {0}")]
    BadFen(#[from] FenError),

    #[error("variation opened before any move was played")]
    VariationAtRoot,

    #[error("unmatched closing parenthesis")]
    UnmatchedParenthesis,
}

/// One game from a PGN file: its tags, and its movetext still in raw form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnRecord {
    /// Tag pairs in the order they first appeared. Values are HTML-escaped.
    tags: Vec<(String, String)>,

    /// Raw lines of movetext.
    movebufs: Vec<Vec<u8>>,
}

impl PgnRecord {
    /// The tag pairs of this game, in file order.
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    /// Looks up a tag value by its key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    /// Sets a tag, replacing any earlier value but keeping its position.
    fn set_tag(&mut self, key: String, value: String) {
        match self.tags.iter_mut().find(|(k, _)| *k == key) {
            Some((_, old)) => *old = value,
            None => self.tags.push((key, value)),
        }
    }

    /// A short human-readable description, such as `Carlsen - Nepomniachtchi (1-0)`.
    pub fn description(&self) -> String {
        let white = self.tag("White").unwrap_or("?");
        let black = self.tag("Black").unwrap_or("?");
        let result = self.tag("Result").unwrap_or("*");
        format!("{white} - {black} ({result})")
    }

    /// Builds the move tree described by this game's movetext.
    ///
    /// Variations become siblings of the moves they replace. Comments, move numbers, and numeric annotation glyphs are skipped,
    /// and anything after a game result is ignored. A single bad move aborts the whole load.
    pub fn load(&self) -> Result<MoveTree, PgnError> {
        let root = match self.tag("FEN") {
            Some(fen) => Position::from_fen(fen)?,
            None => Position::default(),
        };

        let mut tree = MoveTree::new(root);
        let mut node = tree.root();

        // Braces do not nest
        let mut inside_brace = false;

        // Where to return to when each open variation closes
        let mut callstack = Vec::new();

        let mut token = Vec::with_capacity(16);

        'lines: for line in &self.movebufs {
            if line.first() == Some(&b'%') {
                continue;
            }

            for (i, &c) in line.iter().enumerate() {
                if c == b'{' {
                    inside_brace = true;
                    continue;
                }

                if inside_brace {
                    if c == b'}' {
                        inside_brace = false;
                    }
                    continue;
                }

                if c == b'(' {
                    let parent = tree.parent(node).ok_or(PgnError::VariationAtRoot)?;
                    callstack.push(node);
                    node = parent;
                    continue;
                }

                if c == b')' {
                    node = callstack.pop().ok_or(PgnError::UnmatchedParenthesis)?;
                    continue;
                }

                token.push(c);

                let peek = line.get(i + 1).copied();
                let complete = match peek {
                    None => true,
                    Some(p) => p <= b' ' || matches!(p, b'(' | b')' | b'.' | b'{'),
                };
                if !complete {
                    continue;
                }

                // Move numbers written flush against the move (`1.e4`) leave dots at the front
                let text = String::from_utf8_lossy(&token)
                    .trim()
                    .trim_start_matches('.')
                    .to_string();
                token.clear();

                if text.ends_with('.')
                    || text.starts_with('$')
                    || text.bytes().all(|b| b.is_ascii_digit())
                    || peek == Some(b'.')
                {
                    continue;
                }

                if matches!(text.as_str(), "1-0" | "0-1" | "1/2-1/2" | "*") {
                    break 'lines;
                }

                let mv = tree
                    .position(node)
                    .resolve_notation(&text)
                    .map_err(|reason| PgnError::BadMove {
                        token: text.clone(),
                        reason,
                    })?;
                node = tree.make_move(node, mv);
            }
        }

        debug!("Loaded PGN game with {} positions", tree.len());
        Ok(tree)
    }
}

/// Splits `buf` into lines on `\n`, dropping a `\r` at the end of each line.
///
/// A final line without a newline is kept.
pub fn split_buffer(buf: &[u8]) -> Vec<&[u8]> {
    let mut lines = buf.split(|&c| c == b'\n').collect::<Vec<_>>();

    // A trailing newline leaves an empty final piece that is not a line
    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    lines
        .into_iter()
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

/// Groups the lines of a PGN file into games.
///
/// A tag line starts a new game only once the current game has movetext,
/// so a file's leading tags and any stray tags between games attach to the following movetext.
pub fn pre_parse(buf: &[u8]) -> Vec<PgnRecord> {
    let mut games = vec![PgnRecord::default()];

    for raw in split_buffer(buf) {
        match raw.first() {
            None | Some(b'%') => continue,

            Some(b'[') => {
                if games.last().is_some_and(|game| !game.movebufs.is_empty()) {
                    games.push(PgnRecord::default());
                }

                if let (Some((key, value)), Some(game)) = (parse_tag(raw), games.last_mut()) {
                    game.set_tag(key, value);
                }
            }

            Some(_) => {
                if let Some(game) = games.last_mut() {
                    game.movebufs.push(raw.to_vec());
                }
            }
        }
    }

    games
}

/// Reads every game from the PGN file at `path`.
pub fn read_pgn_file(path: impl AsRef<Path>) -> Result<Vec<PgnRecord>> {
    let path = path.as_ref();
    let buf = fs::read(path).with_context(|| format!("Failed to read PGN file {path:?}"))?;
    Ok(pre_parse(&buf))
}

/// Loads every game in `games`, returning each failure with its game number, counting from 1.
pub fn validate_games(games: &[PgnRecord]) -> Vec<(usize, PgnError)> {
    games
        .iter()
        .enumerate()
        .filter_map(|(i, game)| game.load().err().map(|err| (i + 1, err)))
        .collect()
}

/// Parses `[Key "Value"]` into an escaped `(key, value)` pair.
fn parse_tag(raw: &[u8]) -> Option<(String, String)> {
    let line = String::from_utf8_lossy(raw);
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;

    let (key, value) = inner.split_once('"')?;
    let value = value.trim();
    let value = value.strip_suffix('"').unwrap_or(value);

    Some((key.trim().to_string(), escape(value)))
}

/// Escapes characters that are unsafe to embed in markup.
fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Writes the line `moves`, played from `start`, as a single PGN game.
///
/// # Example
/// ```
/// # use kibitz::{write_pgn, Move, Position};
/// let moves = ["e2e4", "e7e5", "g1f3"].map(|m| m.parse::<Move>().unwrap());
/// let pgn = write_pgn(&Position::default(), &moves);
/// assert!(pgn.ends_with("\n\n1. e4 e5 2. Nf3 *\n"));
/// ```
pub fn write_pgn(start: &Position, moves: &[Move]) -> String {
    let mut tags = vec![
        String::from(r#"[Event "Kibitz Line"]"#),
        String::from(r#"[Site "?"]"#),
        String::from(r#"[Date "????.??.??"]"#),
        String::from(r#"[Round "?"]"#),
        String::from(r#"[White "White"]"#),
        String::from(r#"[Black "Black"]"#),
        String::from(r#"[Result "*"]"#),
    ];

    let start_fen = start.to_fen();
    if start_fen != FEN_STARTPOS {
        tags.push(format!(r#"[FEN "{start_fen}"]"#));
        tags.push(String::from(r#"[SetUp "1"]"#));
    }

    let mut lines = Vec::new();
    let mut line = String::new();
    for item in numbered_moves(start, moves) {
        if line.len() + item.len() > LINE_WIDTH {
            lines.push(line.trim().to_string());
            line.clear();
        }
        line.push(' ');
        line.push_str(&item);
    }
    line.push_str(" *");
    lines.push(line.trim().to_string());

    format!("{}\n\n{}\n", tags.join("\n"), lines.join("\n"))
}

/// Renders `moves`, played from `start`, as movetext items: `1.`, `e4`, `e5`, `2.`, `Nf3`.
///
/// A line that starts with Black to move gets a `1...`-style number in front of its first move.
pub fn numbered_moves(start: &Position, moves: &[Move]) -> Vec<String> {
    let mut items = Vec::with_capacity(moves.len() * 3 / 2);
    let mut board = *start;
    for (i, &mv) in moves.iter().enumerate() {
        if board.side_to_move().is_white() {
            items.push(format!("{}.", board.fullmove()));
        } else if i == 0 {
            items.push(format!("{}...", board.fullmove()));
        }
        items.push(board.nice_string(mv));
        board = board.apply_move(mv);
    }
    items
}

/// Writes the line `moves`, played from `start`, to `path` as a PGN file.
pub fn save_pgn(path: impl AsRef<Path>, start: &Position, moves: &[Move]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, write_pgn(start, moves))
        .with_context(|| format!("Failed to write PGN file {path:?}"))
}
