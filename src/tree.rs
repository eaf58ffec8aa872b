/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{cell::OnceCell, fmt};

use log::trace;

use crate::{IllegalMove, Move, Position, Table};

/// Index of a [`Node`] within the [`MoveTree`] that created it.
///
/// A [`NodeId`] is only meaningful for the tree that handed it out.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root of every [`MoveTree`].
    pub const ROOT: Self = Self(0);

    /// Returns the inner index of this [`NodeId`].
    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Running totals of tree growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Number of moves played through [`MoveTree::make_move`], including ones that revisited an existing child.
    pub moves_made: u64,

    /// Number of positions stored in the tree, including the root.
    pub positions_made: u64,
}

impl Counters {
    /// Sets both counters back to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A single position within a [`MoveTree`].
#[derive(Debug, Clone)]
pub struct Node {
    position: Position,
    parent: Option<NodeId>,
    last_move: Option<Move>,

    /// Children in the order their moves were first played.
    children: Vec<(Move, NodeId)>,

    table: Table,

    /// Lazily rendered algebraic form of `last_move`.
    nice_last_move: OnceCell<String>,
}

impl Node {
    fn new(position: Position, parent: Option<NodeId>, last_move: Option<Move>) -> Self {
        Self {
            position,
            parent,
            last_move,
            children: Vec::new(),
            table: Table::default(),
            nice_last_move: OnceCell::new(),
        }
    }

    /// The [`Position`] stored at this node.
    #[inline(always)]
    pub const fn position(&self) -> &Position {
        &self.position
    }

    /// The node this one was reached from, or `None` for the root.
    #[inline(always)]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The move that led to this node, or `None` for the root.
    #[inline(always)]
    pub const fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    /// All `(move, child)` pairs, in the order they were first played.
    #[inline(always)]
    pub fn children(&self) -> &[(Move, NodeId)] {
        &self.children
    }

    /// Finds the child reached by `mv`, if it has been played before.
    pub fn child(&self, mv: Move) -> Option<NodeId> {
        self.children
            .iter()
            .find_map(|&(played, id)| (played == mv).then_some(id))
    }

    /// Analysis gathered for this node's position.
    #[inline(always)]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// Mutable analysis for this node's position.
    #[inline(always)]
    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }
}

/// The history of a game, including all of its variations.
///
/// Nodes are stored in an arena and refer to one another by [`NodeId`].
/// Nodes are never removed, so every [`NodeId`] handed out stays valid for the life of the tree.
#[derive(Debug, Clone)]
pub struct MoveTree {
    nodes: Vec<Node>,
    counters: Counters,
}

impl MoveTree {
    /// Creates a new tree containing only `root`.
    pub fn new(root: Position) -> Self {
        Self {
            nodes: vec![Node::new(root, None, None)],
            counters: Counters {
                moves_made: 0,
                positions_made: 1,
            },
        }
    }

    /// The id of the root node.
    #[inline(always)]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of nodes in the tree.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`, since every tree has a root.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fetches the [`Node`] with `id`.
    ///
    /// # Panics
    /// If `id` did not come from this tree.
    #[inline(always)]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Mutable counterpart of [`MoveTree::node`].
    #[inline(always)]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Shorthand for the [`Position`] at `id`.
    #[inline(always)]
    pub fn position(&self, id: NodeId) -> &Position {
        &self.node(id).position
    }

    /// Shorthand for the [`Table`] at `id`.
    #[inline(always)]
    pub fn table(&self, id: NodeId) -> &Table {
        &self.node(id).table
    }

    /// Shorthand for the mutable [`Table`] at `id`.
    #[inline(always)]
    pub fn table_mut(&mut self, id: NodeId) -> &mut Table {
        &mut self.node_mut(id).table
    }

    /// The parent of `id`, or `None` for the root.
    #[inline(always)]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// The `(move, child)` pairs of `id`, in the order they were first played.
    #[inline(always)]
    pub fn children(&self, id: NodeId) -> &[(Move, NodeId)] {
        &self.node(id).children
    }

    /// Returns a copy of the growth counters.
    #[inline(always)]
    pub const fn counters(&self) -> Counters {
        self.counters
    }

    /// Zeroes the growth counters.
    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    /// Plays `mv` from the node at `id` without checking legality, returning the resulting node.
    ///
    /// The move is normalized first, so `e7e8` and `e7e8q` reach the same child.
    /// If this move has been played from `id` before, the existing child is returned and nothing is added.
    pub fn make_move(&mut self, id: NodeId, mv: Move) -> NodeId {
        let mv = self.position(id).normalize_move(mv);
        self.counters.moves_made += 1;

        if let Some(child) = self.node(id).child(mv) {
            return child;
        }

        let position = self.position(id).apply_move(mv);
        let child = NodeId(self.nodes.len());
        self.nodes.push(Node::new(position, Some(id), Some(mv)));
        self.node_mut(id).children.push((mv, child));
        self.counters.positions_made += 1;

        trace!("Added node {child:?} via {mv} from {id:?}");
        child
    }

    /// Plays `mv` from the node at `id` if it is legal there.
    pub fn try_make_move(&mut self, id: NodeId, mv: Move) -> Result<NodeId, IllegalMove> {
        let mv = self.position(id).normalize_move(mv);
        match self.position(id).illegal_reason(mv) {
            Some(reason) => Err(reason),
            None => Ok(self.make_move(id, mv)),
        }
    }

    /// Iterates from `id` up to the root, following parent links only.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&id| self.parent(id))
    }

    /// Returns `true` if `ancestor` lies strictly above `id` in the tree.
    pub fn has_ancestor(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).skip(1).any(|id| id == ancestor)
    }

    /// The ids of every node from the root down to `id`, inclusive.
    pub fn node_history(&self, id: NodeId) -> Vec<NodeId> {
        let mut line = self.ancestors(id).collect::<Vec<_>>();
        line.reverse();
        line
    }

    /// The moves played from the root to reach `id`.
    pub fn history(&self, id: NodeId) -> Vec<Move> {
        self.node_history(id)
            .into_iter()
            .filter_map(|id| self.node(id).last_move)
            .collect()
    }

    /// The positions from the root down to `id`, inclusive.
    pub fn position_list(&self, id: NodeId) -> Vec<Position> {
        self.node_history(id)
            .into_iter()
            .map(|id| *self.position(id))
            .collect()
    }

    /// FEN of the root position.
    pub fn initial_fen(&self) -> String {
        self.position(self.root()).to_fen()
    }

    /// The move that led to `id` in algebraic notation, or `"??"` for the root.
    ///
    /// Rendered once and cached on the node.
    pub fn nice_last_move(&self, id: NodeId) -> &str {
        let node = self.node(id);
        node.nice_last_move.get_or_init(|| match (node.parent, node.last_move) {
            (Some(parent), Some(mv)) => self.position(parent).nice_string(mv),
            _ => String::from("??"),
        })
    }

    /// The moves from the root to `id` in algebraic notation.
    pub fn nice_history(&self, id: NodeId) -> Vec<&str> {
        self.node_history(id)
            .into_iter()
            .skip(1)
            .map(|id| self.nice_last_move(id))
            .collect()
    }

    /// Follows the first child from `id` until reaching a leaf.
    pub fn end_of_line(&self, id: NodeId) -> NodeId {
        let mut id = id;
        while let Some(&(_, child)) = self.children(id).first() {
            id = child;
        }
        id
    }
}

impl Default for MoveTree {
    /// A tree rooted at the standard starting position.
    fn default() -> Self {
        Self::new(Position::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    #[test]
    fn test_make_move_reuses_children() {
        let mut tree = MoveTree::default();
        let root = tree.root();

        let e4 = tree.make_move(root, mv("e2e4"));
        let d4 = tree.make_move(root, mv("d2d4"));
        let again = tree.make_move(root, mv("e2e4"));

        assert_eq!(e4, again);
        assert_ne!(e4, d4);
        assert_eq!(tree.len(), 3);
        assert_eq!(
            tree.children(root).iter().map(|&(m, _)| m).collect::<Vec<_>>(),
            vec![mv("e2e4"), mv("d2d4")]
        );
        assert_eq!(tree.parent(e4), Some(root));
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn test_promotion_is_normalized() {
        let pos: Position = "8/P7/8/8/8/8/8/k1K5 w - - 0 1".parse().unwrap();
        let mut tree = MoveTree::new(pos);

        let bare = tree.make_move(tree.root(), mv("a7a8"));
        let queen = tree.make_move(tree.root(), mv("a7a8q"));
        let knight = tree.make_move(tree.root(), mv("a7a8n"));

        assert_eq!(bare, queen);
        assert_ne!(bare, knight);
        assert_eq!(tree.node(bare).last_move(), Some(mv("a7a8q")));
    }

    #[test]
    fn test_counters() {
        let mut tree = MoveTree::default();
        assert_eq!(tree.counters().positions_made, 1);

        let e4 = tree.make_move(tree.root(), mv("e2e4"));
        tree.make_move(e4, mv("e7e5"));
        tree.make_move(tree.root(), mv("e2e4"));

        let counters = tree.counters();
        assert_eq!(counters.moves_made, 3);
        assert_eq!(counters.positions_made, 3);

        tree.reset_counters();
        assert_eq!(tree.counters(), Counters::default());
    }

    #[test]
    fn test_try_make_move() {
        let mut tree = MoveTree::default();
        let root = tree.root();

        assert_eq!(
            tree.try_make_move(root, mv("e2e5")),
            Err(IllegalMove::PawnMustAdvanceOneOrTwo)
        );
        assert_eq!(tree.len(), 1);

        let nf3 = tree.try_make_move(root, mv("g1f3")).unwrap();
        assert_eq!(tree.position(nf3).side_to_move(), crate::Color::Black);
    }

    #[test]
    fn test_history_and_ancestry() {
        let mut tree = MoveTree::default();
        let root = tree.root();

        let e4 = tree.make_move(root, mv("e2e4"));
        let e5 = tree.make_move(e4, mv("e7e5"));
        let nf3 = tree.make_move(e5, mv("g1f3"));
        let c5 = tree.make_move(e4, mv("c7c5"));

        assert_eq!(tree.history(nf3), vec![mv("e2e4"), mv("e7e5"), mv("g1f3")]);
        assert!(tree.history(root).is_empty());
        assert_eq!(tree.node_history(c5), vec![root, e4, c5]);
        assert_eq!(tree.position_list(e5).len(), 3);

        assert!(tree.has_ancestor(nf3, root));
        assert!(tree.has_ancestor(nf3, e4));
        assert!(!tree.has_ancestor(nf3, nf3));
        assert!(!tree.has_ancestor(nf3, c5));
        assert!(!tree.has_ancestor(root, root));
    }

    #[test]
    fn test_nice_history() {
        let mut tree = MoveTree::default();
        let mut id = tree.root();
        for m in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"] {
            id = tree.make_move(id, mv(m));
        }

        assert_eq!(tree.nice_last_move(tree.root()), "??");
        assert_eq!(tree.nice_last_move(id), "Bb5");
        assert_eq!(tree.nice_history(id), vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);

        // Cached value is returned on later calls
        assert!(tree.node(id).nice_last_move.get().is_some());
        assert_eq!(tree.nice_last_move(id), "Bb5");
    }

    #[test]
    fn test_end_of_line() {
        let mut tree = MoveTree::default();
        let root = tree.root();
        assert_eq!(tree.end_of_line(root), root);

        let e4 = tree.make_move(root, mv("e2e4"));
        let e5 = tree.make_move(e4, mv("e7e5"));
        tree.make_move(root, mv("d2d4"));
        tree.make_move(e4, mv("c7c5"));

        assert_eq!(tree.end_of_line(root), e5);
    }

    #[test]
    fn test_initial_fen() {
        let fen = "4k3/8/8/8/8/8/8/4K3 b - - 3 40";
        let tree = MoveTree::new(fen.parse().unwrap());
        assert_eq!(tree.initial_fen(), fen);
    }
}
