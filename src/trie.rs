//! The crit-bit trie: lookup, insert, remove, select and prefix lookup.

use std::fmt;
use std::ops::ControlFlow;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::arena::{Branch, Leaf, NodeArena, NodeRef};
use crate::bits::{crit_bit, padded_starts_with};
use crate::walk::{Order, Visit};
use crate::{Config, Error, InsertError, Result};

/// An ordered map from byte-string keys to values, stored as a crit-bit trie.
///
/// Keys are any owned type exposing bytes through `AsRef<[u8]>`. Keys compare as
/// if zero-padded, so two keys that differ only by trailing zero bytes cannot both
/// be stored: the second insert fails with [`Error::Clashes`].
///
/// Every miss in [`lookup`](Self::lookup) yields the default value given at
/// construction.
pub struct CritBitTrie<K, V> {
    pub(crate) nodes: NodeArena<K, V>,
    pub(crate) root: Option<NodeRef>,
    /// Branch (internal node) count.
    internal: usize,
    /// Leaf (external node) count.
    external: usize,
    default: V,
    config: Config,
}

/// Location of a node reference: the root pointer, or a child slot of a branch.
#[derive(Clone, Copy)]
enum Slot {
    Root,
    Child(NodeRef, usize),
}

impl<K, V> CritBitTrie<K, V> {
    /// Create an empty trie returning `default` for failed lookups.
    pub fn new(default: V) -> Self {
        Self {
            nodes: NodeArena::new(None),
            root: None,
            internal: 0,
            external: 0,
            default,
            config: Config::default(),
        }
    }

    /// Create an empty trie with explicit settings.
    ///
    /// Fails with [`Error::OutOfMemory`] if the initial reservation cannot be made.
    pub fn with_config(default: V, config: Config) -> Result<Self> {
        let mut nodes = NodeArena::new(config.node_limit);
        nodes.try_reserve(config.initial_capacity)?;
        Ok(Self {
            nodes,
            root: None,
            internal: 0,
            external: 0,
            default,
            config,
        })
    }

    /// Number of stored entries (leaves).
    #[inline]
    pub fn len(&self) -> usize {
        self.external
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of branch nodes.
    #[inline]
    pub fn internal_count(&self) -> usize {
        self.internal
    }

    /// Total structural nodes: branches plus leaves.
    #[inline]
    pub fn count(&self) -> usize {
        self.internal + self.external
    }

    /// The value returned by [`lookup`](Self::lookup) on a miss.
    pub fn default_value(&self) -> &V {
        &self.default
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Change the live-node cap. Lowering it below the current node count makes
    /// further inserts of new keys fail; stored entries are kept.
    pub fn set_node_limit(&mut self, limit: Option<usize>) {
        self.config.node_limit = limit;
        self.nodes.set_limit(limit);
    }

    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity_bytes()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Release every node, dropping keys and values in post-order.
    pub fn clear(&mut self) {
        let Some(root) = self.root.take() else {
            return;
        };

        // Post-order, popping as we go: the stack holds at most two pending
        // nodes per level, so teardown needs no memory proportional to the size.
        let mut stack: SmallVec<[(NodeRef, bool); 32]> = SmallVec::new();
        stack.push((root, false));
        while let Some((r, expanded)) = stack.pop() {
            if !r.is_leaf() && !expanded {
                let [left, right] = self.nodes.branch(r).children;
                stack.push((r, true));
                stack.push((right, false));
                stack.push((left, false));
                continue;
            }
            drop(self.nodes.discard(r));
        }
        trace!(
            leaves = self.external,
            branches = self.internal,
            "released trie"
        );

        self.nodes.reset();
        self.internal = 0;
        self.external = 0;
    }

    /// Entry at zero-based rank `k` in ascending key order.
    pub fn select(&self, k: usize) -> Option<(&K, &V)> {
        if k >= self.external {
            return None;
        }
        let root = self.root?;

        let mut rank = 0usize;
        let found = self.walk_refs(root, Order::In, Visit::LEAVES, |_, r| {
            if rank == k {
                ControlFlow::Break(r)
            } else {
                rank += 1;
                ControlFlow::Continue(())
            }
        });

        match found {
            ControlFlow::Break(r) => {
                let leaf = self.nodes.leaf(r);
                Some((&leaf.key, &leaf.value))
            }
            ControlFlow::Continue(()) => None,
        }
    }

    /// Smallest entry.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.edge(0)
    }

    /// Largest entry.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.edge(1)
    }

    fn edge(&self, dir: usize) -> Option<(&K, &V)> {
        let mut r = self.root?;
        while !r.is_leaf() {
            r = self.nodes.branch(r).children[dir];
        }
        let leaf = self.nodes.leaf(r);
        Some((&leaf.key, &leaf.value))
    }

    /// Descend from `r` to a leaf, steering by `key`.
    #[inline]
    fn descend(&self, mut r: NodeRef, key: &[u8]) -> NodeRef {
        while !r.is_leaf() {
            let branch = self.nodes.branch(r);
            r = branch.children[branch.crit.direction(key)];
        }
        r
    }

    fn set_slot(&mut self, slot: Slot, r: NodeRef) {
        match slot {
            Slot::Root => self.root = Some(r),
            Slot::Child(parent, dir) => self.nodes.branch_mut(parent).children[dir] = r,
        }
    }
}

impl<K: AsRef<[u8]>, V> CritBitTrie<K, V> {
    /// Stored value for `key`, or `None`.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let r = self.descend(self.root?, key);
        let leaf = self.nodes.leaf(r);
        (leaf.key.as_ref() == key).then_some(&leaf.value)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let r = self.descend(self.root?, key);
        let leaf = self.nodes.leaf_mut(r);
        (leaf.key.as_ref() == key).then_some(&mut leaf.value)
    }

    /// Stored value for `key`, or the configured default.
    pub fn lookup(&self, key: &[u8]) -> &V {
        self.get(key).unwrap_or(&self.default)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Insert or update an entry.
    ///
    /// On update the stored key is kept, `key` is dropped and the previous value is
    /// dropped. On error the trie is unchanged and `key` and `value` come back
    /// inside the [`InsertError`].
    pub fn insert(&mut self, key: K, value: V) -> Result<(), InsertError<K, V>> {
        let Some(root) = self.root else {
            let leaf = self.alloc_leaf(key, value)?;
            self.root = Some(leaf);
            self.external += 1;
            trace!("created root leaf");
            return Ok(());
        };

        // First pass: the nearest leaf tells us where the new key diverges.
        let nearest = self.descend(root, key.as_ref());
        let stored = self.nodes.leaf(nearest).key.as_ref();
        if stored == key.as_ref() {
            self.nodes.leaf_mut(nearest).value = value;
            return Ok(());
        }
        let Some(crit) = crit_bit(stored, key.as_ref()) else {
            debug!(len = key.as_ref().len(), "rejected clashing key");
            return Err(InsertError::new(Error::Clashes, key, value));
        };

        // Second pass: the splice point is the first node whose bit comes after
        // the new one.
        let mut slot = Slot::Root;
        let mut at = root;
        while !at.is_leaf() {
            let branch = self.nodes.branch(at);
            debug_assert_ne!(branch.crit, crit);
            if branch.crit > crit {
                break;
            }
            let dir = branch.crit.direction(key.as_ref());
            slot = Slot::Child(at, dir);
            at = branch.children[dir];
        }

        let new_dir = crit.direction(key.as_ref());
        let leaf = self.alloc_leaf(key, value)?;
        let mut children = [at, at];
        children[new_dir] = leaf;
        let branch = match self.nodes.alloc_branch(Branch { crit, children }) {
            Ok(branch) => branch,
            Err(kind) => {
                let Leaf { key, value } = self.nodes.free_leaf(leaf);
                debug!("branch allocation failed, insert rolled back");
                return Err(InsertError::new(kind, key, value));
            }
        };

        self.set_slot(slot, branch);
        self.internal += 1;
        self.external += 1;
        trace!(
            byte_offset = crit.byte_offset(),
            bit = crit.bit_in_byte(),
            "spliced branch"
        );
        Ok(())
    }

    /// Insert every entry from `iter`, stopping at the first failure. The failing
    /// entry comes back in the error; the rest of `iter` is not consumed.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<(), InsertError<K, V>>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        iter.into_iter()
            .try_for_each(|(key, value)| self.insert(key, value))
    }

    fn alloc_leaf(&mut self, key: K, value: V) -> Result<NodeRef, InsertError<K, V>> {
        self.nodes
            .alloc_leaf(Leaf { key, value })
            .map_err(|Leaf { key, value }| {
                debug!("leaf allocation failed");
                InsertError::new(Error::OutOfMemory, key, value)
            })
    }

    /// Remove `key`, returning its value. The stored key is dropped.
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        let mut at = self.root?;
        // Slot holding `at`, and the parent branch with the slot holding it.
        let mut slot = Slot::Root;
        let mut parent: Option<(Slot, NodeRef, usize)> = None;
        while !at.is_leaf() {
            let dir = self.nodes.branch(at).crit.direction(key);
            parent = Some((slot, at, dir));
            slot = Slot::Child(at, dir);
            at = self.nodes.branch(at).children[dir];
        }

        if self.nodes.leaf(at).key.as_ref() != key {
            return None;
        }

        let Leaf { value, .. } = self.nodes.free_leaf(at);
        self.external -= 1;

        match parent {
            None => {
                self.root = None;
                trace!("removed root leaf");
            }
            Some((parent_slot, branch_ref, dir)) => {
                let branch = self.nodes.free_branch(branch_ref);
                self.set_slot(parent_slot, branch.children[1 - dir]);
                self.internal -= 1;
                trace!(
                    byte_offset = branch.crit.byte_offset(),
                    bit = branch.crit.bit_in_byte(),
                    "collapsed branch"
                );
            }
        }

        Some(value)
    }

    /// Invoke `f` for every entry whose key starts with `prefix`, in ascending order.
    ///
    /// Returns [`Error::NotFound`] when no key has the prefix. A `Break` from `f`
    /// stops the enumeration and is handed back as `Ok(ControlFlow::Break(_))`.
    pub fn lookup_prefix<'a, B>(
        &'a self,
        prefix: &[u8],
        mut f: impl FnMut(&'a K, &'a V) -> ControlFlow<B>,
    ) -> Result<ControlFlow<B>> {
        let top = self.prefix_top(prefix).ok_or(Error::NotFound)?;
        let nodes = &self.nodes;

        let mut matched = false;
        let flow = self.walk_refs(top, Order::In, Visit::LEAVES, |_, r| {
            let leaf = nodes.leaf(r);
            if leaf.key.as_ref().starts_with(prefix) {
                matched = true;
                f(&leaf.key, &leaf.value)
            } else {
                ControlFlow::Continue(())
            }
        });

        if matched {
            Ok(flow)
        } else {
            Err(Error::NotFound)
        }
    }

    /// Entries whose key starts with `prefix`, in ascending order.
    pub fn prefix_iter<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = (&'a K, &'a V)> + 'a {
        self.subtree_iter(self.prefix_top(prefix))
            .filter(move |(k, _)| k.as_ref().starts_with(prefix))
    }

    /// Root of the subtree holding every key that agrees with `prefix` on its
    /// zero-padded bytes, or `None` when no key does.
    ///
    /// Branches testing a bit inside the prefix are steered by the prefix itself,
    /// so any key outside the subtree differs from the prefix somewhere within it.
    /// Below the first branch testing a bit past the prefix, every key agrees on
    /// all earlier bits, so one leaf decides for the whole subtree.
    fn prefix_top(&self, prefix: &[u8]) -> Option<NodeRef> {
        let mut at = self.root?;
        let mut top = at;
        while !at.is_leaf() {
            let branch = self.nodes.branch(at);
            at = branch.children[branch.crit.direction(prefix)];
            if branch.crit.byte_offset() < prefix.len() {
                top = at;
            }
        }
        padded_starts_with(self.nodes.leaf(at).key.as_ref(), prefix).then_some(top)
    }
}

impl<K, V: Default> Default for CritBitTrie<K, V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<K, V> Drop for CritBitTrie<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Clone, V: Clone> Clone for CritBitTrie<K, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            internal: self.internal,
            external: self.external,
            default: self.default.clone(),
            config: self.config.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CritBitTrie<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
