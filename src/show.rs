//! Diagnostic rendering.

use std::fmt::{self, Write as _};
use std::ops::ControlFlow;

use termtree::Tree;

use crate::walk::{NodeView, Order, Visit};
use crate::CritBitTrie;

fn label<K: AsRef<[u8]>, V: fmt::Debug>(node: NodeView<'_, K, V>) -> String {
    match node {
        NodeView::Branch(cb) => format!("[{}.{}]", cb.byte_offset(), cb.bit_in_byte()),
        NodeView::Leaf(k, v) => format!("\"{}\" = {:?}", k.as_ref().escape_ascii(), v),
    }
}

impl<K: AsRef<[u8]>, V: fmt::Debug> CritBitTrie<K, V> {
    /// Render the trie structure. Branches print as `[byte.bit]`, leaves as their
    /// escaped key and value; the left (0) child is listed first.
    pub fn show(&self) -> Tree<String> {
        // Post-order hands us both children before their parent.
        let mut built: Vec<Tree<String>> = Vec::new();
        let _: ControlFlow<()> = self.walk(Order::Post, Visit::ALL, |_, node| {
            let tree = match node {
                NodeView::Leaf(..) => Tree::new(label(node)),
                NodeView::Branch(_) => {
                    let right = built.pop();
                    let left = built.pop();
                    Tree::new(label(node)).with_leaves(left.into_iter().chain(right))
                }
            };
            built.push(tree);
            ControlFlow::Continue(())
        });
        built
            .pop()
            .unwrap_or_else(|| Tree::new(String::from("(empty)")))
    }

    /// One line per node in level order: `depth rank label`.
    pub fn show_levels(&self) -> String {
        let mut out = String::new();
        let _: ControlFlow<fmt::Error> = self.walk_breadth_first(Visit::ALL, |level, node| {
            match writeln!(out, "{} {} {}", level.depth, level.rank, label(node)) {
                Ok(()) => ControlFlow::Continue(()),
                Err(e) => ControlFlow::Break(e),
            }
        });
        out
    }
}
