//! Traversal: depth-first walks in any order, a breadth-first walk, and iterators.
//!
//! Walks use an explicit stack, so deep tries (long shared prefixes) cannot
//! overflow the call stack. Callbacks steer the walk with [`ControlFlow`]: a
//! `Break` ends it at once and its payload is returned to the caller.

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::ops::ControlFlow;

use smallvec::SmallVec;

use crate::arena::{NodeArena, NodeRef};
use crate::bits::CritBit;
use crate::CritBitTrie;

/// When a branch is visited relative to its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Before both children.
    Pre,
    /// Between the left and right child.
    In,
    /// After both children.
    Post,
}

/// Which node kinds a walk reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visit {
    pub branches: bool,
    pub leaves: bool,
}

impl Visit {
    pub const LEAVES: Visit = Visit {
        branches: false,
        leaves: true,
    };
    pub const BRANCHES: Visit = Visit {
        branches: true,
        leaves: false,
    };
    pub const ALL: Visit = Visit {
        branches: true,
        leaves: true,
    };
}

/// A node as seen by a walk callback.
#[derive(Debug)]
pub enum NodeView<'a, K, V> {
    Branch(CritBit),
    Leaf(&'a K, &'a V),
}

impl<K, V> Clone for NodeView<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeView<'_, K, V> {}

/// Position of a node in a breadth-first walk: its depth, and how many reported
/// nodes precede it at that depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level {
    pub depth: usize,
    pub rank: usize,
}

#[derive(Clone, Copy)]
enum Stage {
    Enter,
    Between,
    Exit,
}

impl<K, V> CritBitTrie<K, V> {
    /// Depth-first walk over the whole trie. `f` receives each reported node with
    /// its depth (the root is at depth 0).
    pub fn walk<'a, B>(
        &'a self,
        order: Order,
        visit: Visit,
        mut f: impl FnMut(usize, NodeView<'a, K, V>) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        let Some(root) = self.root else {
            return ControlFlow::Continue(());
        };
        let nodes = &self.nodes;
        self.walk_refs(root, order, visit, |depth, r| f(depth, view(nodes, r)))
    }

    /// Level-order walk, left to right within each level.
    pub fn walk_breadth_first<'a, B>(
        &'a self,
        visit: Visit,
        mut f: impl FnMut(Level, NodeView<'a, K, V>) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        let Some(root) = self.root else {
            return ControlFlow::Continue(());
        };

        let mut queue: VecDeque<(NodeRef, usize)> = VecDeque::new();
        queue.push_back((root, 0));
        let mut level = Level { depth: 0, rank: 0 };

        while let Some((r, depth)) = queue.pop_front() {
            if depth != level.depth {
                level = Level { depth, rank: 0 };
            }

            let reported = if r.is_leaf() {
                visit.leaves
            } else {
                visit.branches
            };
            if reported {
                if let ControlFlow::Break(b) = f(level, view(&self.nodes, r)) {
                    return ControlFlow::Break(b);
                }
                level.rank += 1;
            }

            if !r.is_leaf() {
                let [left, right] = self.nodes.branch(r).children;
                queue.push_back((left, depth + 1));
                queue.push_back((right, depth + 1));
            }
        }
        ControlFlow::Continue(())
    }

    /// Depth-first walk of the subtree at `start`, reporting raw node references.
    pub(crate) fn walk_refs<B>(
        &self,
        start: NodeRef,
        order: Order,
        visit: Visit,
        mut f: impl FnMut(usize, NodeRef) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        let mut stack: SmallVec<[(NodeRef, usize, Stage); 32]> = SmallVec::new();
        stack.push((start, 0, Stage::Enter));

        while let Some((r, depth, stage)) = stack.pop() {
            if r.is_leaf() {
                if visit.leaves {
                    if let ControlFlow::Break(b) = f(depth, r) {
                        return ControlFlow::Break(b);
                    }
                }
                continue;
            }

            let due = matches!(
                (order, stage),
                (Order::Pre, Stage::Enter) | (Order::In, Stage::Between) | (Order::Post, Stage::Exit)
            );
            if due && visit.branches {
                if let ControlFlow::Break(b) = f(depth, r) {
                    return ControlFlow::Break(b);
                }
            }

            let [left, right] = self.nodes.branch(r).children;
            match stage {
                Stage::Enter => {
                    stack.push((r, depth, Stage::Between));
                    stack.push((left, depth + 1, Stage::Enter));
                }
                Stage::Between => {
                    stack.push((r, depth, Stage::Exit));
                    stack.push((right, depth + 1, Stage::Enter));
                }
                Stage::Exit => {}
            }
        }
        ControlFlow::Continue(())
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.subtree_iter(self.root)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub(crate) fn subtree_iter(&self, start: Option<NodeRef>) -> Iter<'_, K, V> {
        let mut stack: SmallVec<[NodeRef; 32]> = SmallVec::new();
        stack.extend(start);
        Iter {
            nodes: &self.nodes,
            stack,
        }
    }
}

fn view<K, V>(nodes: &NodeArena<K, V>, r: NodeRef) -> NodeView<'_, K, V> {
    if r.is_leaf() {
        let leaf = nodes.leaf(r);
        NodeView::Leaf(&leaf.key, &leaf.value)
    } else {
        NodeView::Branch(nodes.branch(r).crit)
    }
}

/// In-order iterator over `(&K, &V)`.
pub struct Iter<'a, K, V> {
    nodes: &'a NodeArena<K, V>,
    stack: SmallVec<[NodeRef; 32]>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(r) = self.stack.pop() {
            if r.is_leaf() {
                let leaf = self.nodes.leaf(r);
                return Some((&leaf.key, &leaf.value));
            }
            let [left, right] = self.nodes.branch(r).children;
            self.stack.push(right);
            self.stack.push(left);
        }
        None
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a CritBitTrie<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
