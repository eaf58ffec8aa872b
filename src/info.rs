/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::cell::OnceCell;

use serde::{Deserialize, Serialize};

use crate::{Move, Position};

/// Which statistics [`Info::stats_list`] should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsOptions {
    /// Expected value, as a win percentage.
    pub ev: bool,

    /// Visits as a share of all visits.
    pub n: bool,

    /// Visits as an absolute count.
    pub n_abs: bool,

    /// Total visits across all moves.
    pub of_n: bool,

    /// Policy prior.
    pub p: bool,

    /// Raw network value.
    pub v: bool,

    pub q: bool,
    pub u: bool,
    pub s: bool,

    /// Moves left.
    pub m: bool,

    /// Draw probability.
    pub d: bool,

    /// Win/draw/loss percentages.
    pub wdl: bool,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            ev: true,
            n: true,
            n_abs: true,
            of_n: false,
            p: true,
            v: true,
            q: false,
            u: false,
            s: false,
            m: false,
            d: false,
            wdl: false,
        }
    }
}

/// Everything the engine has reported about one move in one position.
///
/// The principal variation is whatever the engine sent, and may not be legal.
#[derive(Debug, Clone)]
pub struct Info {
    /// The position `mv` is played in.
    board: Position,

    mv: Move,

    /// Score in centipawns, from the side to move's perspective.
    pub cp: i32,

    /// Distance to mate in moves. `0` means no mate was reported.
    pub mate: i32,

    pub multipv: u32,

    /// Visits to this move.
    pub n: u64,

    /// Nodes searched by the line that last reported this move.
    pub total_nodes: u64,

    pub depth: u32,
    pub seldepth: u32,

    /// Policy, as a percentage.
    pub p: f64,

    /// Expected score in `[-1, 1]`.
    pub q: f64,

    pub d: f64,
    pub m: f64,
    pub u: f64,
    pub s: f64,
    pub v: Option<f64>,

    pub wdl: String,

    pv: Vec<Move>,

    /// Bumped every time this record changes.
    pub version: u64,

    nice_pv: OnceCell<Vec<String>>,
}

impl Info {
    /// Creates an empty record for `mv` played in `board`.
    pub fn new(board: Position, mv: Move) -> Self {
        Self {
            board,
            mv,
            cp: 0,
            mate: 0,
            multipv: 1,
            n: 0,
            total_nodes: 0,
            depth: 0,
            seldepth: 0,
            p: 0.0,
            q: 0.0,
            d: 0.0,
            m: 0.0,
            u: 1.0,
            s: 1.0,
            v: None,
            wdl: String::from("??"),
            pv: vec![mv],
            version: 0,
            nice_pv: OnceCell::new(),
        }
    }

    /// The position this record's move is played in.
    #[inline(always)]
    pub const fn board(&self) -> &Position {
        &self.board
    }

    /// The move this record describes.
    #[inline(always)]
    pub const fn mv(&self) -> Move {
        self.mv
    }

    /// The principal variation, starting with this record's move.
    #[inline(always)]
    pub fn pv(&self) -> &[Move] {
        &self.pv
    }

    /// Replaces the principal variation and discards its cached rendering.
    ///
    /// An empty `pv` is replaced by this record's move alone.
    pub fn set_pv(&mut self, pv: Vec<Move>) {
        self.pv = if pv.is_empty() { vec![self.mv] } else { pv };
        self.nice_pv = OnceCell::new();
    }

    /// The principal variation in algebraic notation, cut off at the first move that is illegal in its position.
    ///
    /// Rendered once per PV and cached.
    pub fn nice_pv(&self) -> &[String] {
        self.nice_pv.get_or_init(|| {
            let mut board = self.board;
            let mut moves = Vec::with_capacity(self.pv.len());

            for &mv in &self.pv {
                if board.illegal_reason(mv).is_some() {
                    break;
                }
                moves.push(board.nice_string(mv));
                board = board.apply_move(mv);
            }

            moves
        })
    }

    /// Win probability for the side to move, in `[0, 1]`.
    pub fn value(&self) -> f64 {
        win_probability(self.q)
    }

    /// [`Info::value`] as a percentage with `dp` decimal places.
    pub fn value_string(&self, dp: usize) -> String {
        if !self.q.is_finite() {
            return String::from("?");
        }
        format!("{:.dp$}", self.value() * 100.0)
    }

    /// Human-readable statistics for display, filtered by `opts`.
    ///
    /// `nodes_total` is the visit count of the whole search, used for the share of visits.
    pub fn stats_list(&self, opts: &StatsOptions, nodes_total: u64) -> Vec<String> {
        let mut ret = Vec::new();

        if opts.ev {
            ret.push(format!("EV: {}%", self.value_string(1)));
        }

        if nodes_total > 0 {
            let mut n = String::new();

            if opts.n {
                let share = 100.0 * self.n as f64 / nodes_total as f64;
                n += &format!(" N: {share:.2}%");
            }

            if opts.n_abs {
                if opts.n {
                    n += &format!(" [{}]", n_string(self.n));
                } else {
                    n += &format!(" N: {}", n_string(self.n));
                }
            }

            if opts.of_n {
                n += &format!(" of {}", n_string(nodes_total));
            }

            if !n.is_empty() {
                ret.push(n.trim().to_string());
            }
        } else if opts.n || opts.n_abs || opts.of_n {
            ret.push(String::from("N: ?"));
        }

        if opts.p {
            if self.p > 0.0 {
                ret.push(format!("P: {}%", self.p));
            } else {
                ret.push(String::from("P: ?"));
            }
        }

        if opts.v {
            match self.v {
                Some(v) => ret.push(format!("V: {v:.3}")),
                None => ret.push(String::from("V: ?")),
            }
        }

        if opts.q {
            ret.push(format!("Q: {:.3}", self.q));
        }

        // U and S are meaningless before the move has been visited
        if opts.u {
            if self.n > 0 {
                ret.push(format!("U: {:.3}", self.u));
            } else {
                ret.push(String::from("U: ?"));
            }
        }

        if opts.s {
            if self.n > 0 {
                ret.push(format!("S: {:.5}", self.s));
            } else {
                ret.push(String::from("S: ?"));
            }
        }

        if opts.m {
            if self.m > 0.0 {
                ret.push(format!("M: {:.1}", self.m));
            } else {
                ret.push(String::from("M: 0"));
            }
        }

        if opts.d {
            ret.push(format!("D: {:.3}", self.d));
        }

        if opts.wdl {
            ret.push(format!("WDL: {}", self.wdl));
        }

        ret
    }
}

/// Maps an expected score in `[-1, 1]` onto `[0, 1]`.
pub fn win_probability(q: f64) -> f64 {
    ((q + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Compact rendering of a node count: `532`, `12.3k`, `4.5M`.
pub fn n_string(n: u64) -> String {
    if n < 1_000 {
        n.to_string()
    } else if n < 1_000_000 {
        format!("{:.1}k", n as f64 / 1_000.0)
    } else {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    }
}
