/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{collections::HashMap, str::FromStr};

use log::trace;

use crate::{win_probability, Color, Info, Move, Position};

/// Analysis of a single position: one [`Info`] per move the engine has mentioned, plus search-wide statistics.
#[derive(Debug, Clone, Default)]
pub struct Table {
    moveinfo: HashMap<Move, Info>,

    /// Bumped on every change.
    pub version: u64,

    /// Nodes searched, as last reported by the engine.
    pub nodes: u64,

    /// Nodes per second, as last reported by the engine.
    pub nps: u64,

    /// Search time in milliseconds, as last reported by the engine.
    pub time: u64,

    /// White's win probability.
    eval: Option<f64>,

    /// Node count of the search that produced `eval`.
    eval_nodes: u64,
}

impl Table {
    /// Creates an empty [`Table`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards everything, including the cached evaluation.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Discards per-move records and live statistics, but keeps the cached evaluation.
    ///
    /// Called when a new search starts on this position, so an earlier deeper evaluation survives until it is beaten.
    pub fn invalidate(&mut self) {
        self.moveinfo.clear();
        self.nodes = 0;
        self.nps = 0;
        self.time = 0;
        self.version += 1;
    }

    /// Fetches the record for `mv`, if the engine has mentioned it.
    pub fn get(&self, mv: Move) -> Option<&Info> {
        self.moveinfo.get(&mv)
    }

    /// Number of moves with a record.
    pub fn len(&self) -> usize {
        self.moveinfo.len()
    }

    /// Returns `true` if no move has a record.
    pub fn is_empty(&self) -> bool {
        self.moveinfo.is_empty()
    }

    /// All records, ordered by multi-PV rank and then by visits (most first).
    pub fn sorted(&self) -> Vec<&Info> {
        let mut infos = self.moveinfo.values().collect::<Vec<_>>();
        infos.sort_by(|a, b| {
            a.multipv
                .cmp(&b.multipv)
                .then(b.n.cmp(&a.n))
                .then(a.mv().cmp(&b.mv()))
        });
        infos
    }

    /// White's win probability in `[0, 1]`, if one has been recorded.
    #[inline(always)]
    pub const fn eval(&self) -> Option<f64> {
        self.eval
    }

    /// Node count behind [`Table::eval`].
    #[inline(always)]
    pub const fn eval_nodes(&self) -> u64 {
        self.eval_nodes
    }

    /// Takes the cached evaluation from the record for `best`.
    ///
    /// Nothing happens if `best` has no record, or if its node count is behind the one that produced the current evaluation.
    pub fn update_eval_from_move(&mut self, best: Move) {
        let Some(info) = self.moveinfo.get(&best) else {
            return;
        };

        if info.total_nodes < self.eval_nodes {
            return;
        }

        self.eval = Some(match info.board().side_to_move() {
            Color::White => info.value(),
            Color::Black => 1.0 - info.value(),
        });
        self.eval_nodes = info.total_nodes;
    }

    /// Takes the cached evaluation from a raw score `q` (for the side to move, `active`) reached after `nodes` nodes.
    ///
    /// Non-finite scores and node counts behind the current evaluation are ignored.
    pub fn update_eval_from_node_line(&mut self, q: f64, nodes: u64, active: Color) {
        if !q.is_finite() || nodes < self.eval_nodes {
            return;
        }

        self.eval = Some(match active {
            Color::White => win_probability(q),
            Color::Black => 1.0 - win_probability(q),
        });
        self.eval_nodes = nodes;
    }

    /// Handles a single line of engine output about `position`.
    ///
    /// Lines referring to moves that are illegal in `position` are assumed to describe an older position and are dropped.
    /// Returns `true` if the table changed.
    pub fn receive(&mut self, line: &str, position: &Position) -> bool {
        let tokens = line.split_whitespace().collect::<Vec<_>>();

        let changed = match tokens[..] {
            ["info", "string", ref rest @ ..] => self.receive_info_string(rest, position),
            ["info", ref rest @ ..] => self.receive_info(rest, position),
            _ => false,
        };

        if changed {
            self.version += 1;
        }
        changed
    }

    /// `info depth 12 seldepth 20 time 340 nodes 1520 score cp 35 multipv 1 pv e2e4 e7e5`
    fn receive_info(&mut self, tokens: &[&str], position: &Position) -> bool {
        let pv_start = tokens.iter().position(|&t| t == "pv");
        let report = InfoLine::parse(&tokens[..pv_start.unwrap_or(tokens.len())]);

        let pv = pv_start
            .map(|i| {
                tokens[i + 1..]
                    .iter()
                    .map_while(|t| Move::from_uci(t).ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if pv_start.is_some() {
            match pv.first() {
                Some(&first) if position.is_legal(first) => {}
                _ => {
                    trace!("Dropping stale info line with pv {pv:?}");
                    return false;
                }
            }
        }

        if let Some(nodes) = report.nodes {
            self.nodes = nodes;
        }
        if let Some(nps) = report.nps {
            self.nps = nps;
        }
        if let Some(time) = report.time {
            self.time = time;
        }

        let Some(&first) = pv.first() else {
            return report.nodes.is_some() || report.nps.is_some() || report.time.is_some();
        };

        let mv = position.normalize_move(first);
        let info = self
            .moveinfo
            .entry(mv)
            .or_insert_with(|| Info::new(*position, mv));

        if let Some(depth) = report.depth {
            info.depth = depth;
        }
        if let Some(seldepth) = report.seldepth {
            info.seldepth = seldepth;
        }
        if let Some(multipv) = report.multipv {
            info.multipv = multipv;
        }
        if let Some(nodes) = report.nodes {
            info.total_nodes = nodes;
        }
        if let Some(cp) = report.cp {
            info.cp = cp;
            info.mate = 0;
        }
        if let Some(mate) = report.mate {
            info.mate = mate;
        }
        if let Some(wdl) = report.wdl {
            info.wdl = wdl;
        }
        info.set_pv(pv);
        info.version += 1;

        if info.multipv == 1 {
            self.update_eval_from_move(mv);
        }

        true
    }

    /// `info string e2e4  (322 ) N:     532 (+ 4) (P: 10.00%) (WL: -0.01) (D: 0.300) (M: 110.0) (Q: -0.01) (U: 0.123) (S: 0.2) (V: -0.0123)`
    ///
    /// or the same with `node` in place of a move, which describes the position as a whole.
    fn receive_info_string(&mut self, tokens: &[&str], position: &Position) -> bool {
        let Some(&subject) = tokens.first() else {
            return false;
        };
        let stats = stat_pairs(&tokens[1..]);
        let stat = |key: &str| {
            stats
                .iter()
                .find_map(|&(k, v)| (k == key).then_some(v))
        };

        if subject == "node" {
            let q = stat("Q").and_then(parse_stat::<f64>);
            let n = stat("N").and_then(parse_stat::<u64>);
            let (Some(q), Some(n)) = (q, n) else {
                return false;
            };

            let before = (self.eval, self.eval_nodes);
            self.update_eval_from_node_line(q, n, position.side_to_move());
            return before != (self.eval, self.eval_nodes);
        }

        let Ok(mv) = Move::from_uci(subject) else {
            return false;
        };
        if !position.is_legal(mv) {
            trace!("Dropping stale move stats for {mv}");
            return false;
        }

        let mv = position.normalize_move(mv);
        let info = self
            .moveinfo
            .entry(mv)
            .or_insert_with(|| Info::new(*position, mv));

        for (key, value) in stats {
            match key {
                "N" => info.n = parse_stat(value).unwrap_or(info.n),
                "P" => info.p = parse_stat(value).unwrap_or(info.p),
                "D" => info.d = parse_stat(value).unwrap_or(info.d),
                "M" => info.m = parse_stat(value).unwrap_or(info.m),
                "Q" => info.q = parse_stat(value).unwrap_or(info.q),
                "U" => info.u = parse_stat(value).unwrap_or(info.u),
                "S" => info.s = parse_stat(value).unwrap_or(info.s),
                "V" => info.v = parse_stat(value),
                _ => {}
            }
        }
        info.version += 1;

        true
    }
}

/// The search-wide fields of an `info` line, before its `pv`.
#[derive(Debug, Default)]
struct InfoLine {
    depth: Option<u32>,
    seldepth: Option<u32>,
    multipv: Option<u32>,
    nodes: Option<u64>,
    nps: Option<u64>,
    time: Option<u64>,
    cp: Option<i32>,
    mate: Option<i32>,
    wdl: Option<String>,
}

impl InfoLine {
    fn parse(tokens: &[&str]) -> Self {
        let mut line = Self::default();
        let mut tokens = tokens.iter().copied();

        while let Some(key) = tokens.next() {
            match key {
                "depth" => line.depth = next_value(&mut tokens),
                "seldepth" => line.seldepth = next_value(&mut tokens),
                "multipv" => line.multipv = next_value(&mut tokens),
                "nodes" => line.nodes = next_value(&mut tokens),
                "nps" => line.nps = next_value(&mut tokens),
                "time" => line.time = next_value(&mut tokens),
                "score" => match tokens.next() {
                    Some("cp") => line.cp = next_value(&mut tokens),
                    Some("mate") => line.mate = next_value(&mut tokens),
                    _ => {}
                },
                "wdl" => {
                    let w = next_value::<f64>(&mut tokens);
                    let d = next_value::<f64>(&mut tokens);
                    let l = next_value::<f64>(&mut tokens);
                    if let (Some(w), Some(d), Some(l)) = (w, d, l) {
                        line.wdl = Some(format!("{:.1} {:.1} {:.1}", w / 10.0, d / 10.0, l / 10.0));
                    }
                }
                _ => {}
            }
        }

        line
    }
}

fn next_value<'a, T: FromStr>(tokens: &mut impl Iterator<Item = &'a str>) -> Option<T> {
    tokens.next()?.parse().ok()
}

/// Parses a verbose statistic, which may carry a trailing `%` or be `-.----` when unknown.
fn parse_stat<T: FromStr>(value: &str) -> Option<T> {
    value.trim_end_matches('%').parse().ok()
}

/// Splits `N: 532 (P: 10.00%) (Q: -0.01)` into `[("N", "532"), ("P", "10.00%"), ("Q", "-0.01")]`.
///
/// Parentheses are ignored, and tokens not preceded by a `Key:` are skipped.
fn stat_pairs<'a>(tokens: &[&'a str]) -> Vec<(&'a str, &'a str)> {
    let tokens = tokens
        .iter()
        .flat_map(|&t| t.split(|c| c == '(' || c == ')'))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();

    tokens
        .windows(2)
        .filter_map(|pair| {
            let key = pair[0].strip_suffix(':')?;
            (!pair[1].ends_with(':')).then_some((key, pair[1]))
        })
        .collect()
}
