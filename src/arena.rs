//! Node storage: one arena for branches, one for leaves, addressed by tagged indices.
//!
//! Freed slots are recycled through per-arena free lists, so a steady mix of inserts
//! and removes does not grow either arena.

use crate::bits::CritBit;
use crate::{Error, Result};

/// 4-byte reference into one of the two arenas.
///
/// - Bit 31 = 1: leaf (index into `leaves`)
/// - Bit 31 = 0: branch (index into `branches`)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub(crate) struct NodeRef(u32);

impl NodeRef {
    const LEAF_TAG: u32 = 0x8000_0000;
    const INDEX_MASK: u32 = !Self::LEAF_TAG;

    #[inline]
    fn leaf(idx: u32) -> Self {
        debug_assert!(idx <= Self::INDEX_MASK);
        Self(idx | Self::LEAF_TAG)
    }

    #[inline]
    fn branch(idx: u32) -> Self {
        debug_assert!(idx <= Self::INDEX_MASK);
        Self(idx)
    }

    #[inline]
    pub(crate) fn is_leaf(self) -> bool {
        (self.0 & Self::LEAF_TAG) != 0
    }

    #[inline]
    fn index(self) -> usize {
        (self.0 & Self::INDEX_MASK) as usize
    }
}

/// Internal node: a critical bit and two children.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Branch {
    pub(crate) crit: CritBit,
    pub(crate) children: [NodeRef; 2],
}

/// External node: one stored entry.
#[derive(Clone, Debug)]
pub(crate) struct Leaf<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

#[derive(Clone)]
pub(crate) struct NodeArena<K, V> {
    branches: Vec<Branch>,
    free_branches: Vec<u32>,
    leaves: Vec<Option<Leaf<K, V>>>,
    free_leaves: Vec<u32>,
    /// Live branches plus live leaves.
    live: usize,
    limit: Option<usize>,
}

impl<K, V> NodeArena<K, V> {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            branches: Vec::new(),
            free_branches: Vec::new(),
            leaves: Vec::new(),
            free_leaves: Vec::new(),
            live: 0,
            limit,
        }
    }

    /// Reserve room for `entries` more leaves and the branches they need.
    pub(crate) fn try_reserve(&mut self, entries: usize) -> Result<()> {
        // A trie with n leaves has n - 1 branches.
        self.leaves
            .try_reserve(entries)
            .map_err(|_| Error::OutOfMemory)?;
        self.branches
            .try_reserve(entries.saturating_sub(1))
            .map_err(|_| Error::OutOfMemory)
    }

    #[inline]
    fn check_limit(&self) -> Result<()> {
        match self.limit {
            Some(limit) if self.live >= limit => Err(Error::OutOfMemory),
            _ => Ok(()),
        }
    }

    /// Store `leaf` in a free slot. When no slot can be had the leaf is handed back
    /// untouched; the only cause is running out of memory.
    pub(crate) fn alloc_leaf(&mut self, leaf: Leaf<K, V>) -> Result<NodeRef, Leaf<K, V>> {
        if self.check_limit().is_err() {
            return Err(leaf);
        }
        let idx = match self.free_leaves.pop() {
            Some(idx) => {
                debug_assert!(self.leaves[idx as usize].is_none());
                self.leaves[idx as usize] = Some(leaf);
                idx
            }
            None => {
                let Some(idx) = u32::try_from(self.leaves.len())
                    .ok()
                    .filter(|&i| i <= NodeRef::INDEX_MASK)
                else {
                    return Err(leaf);
                };
                if self.leaves.try_reserve(1).is_err() {
                    return Err(leaf);
                }
                self.leaves.push(Some(leaf));
                idx
            }
        };
        self.live += 1;
        Ok(NodeRef::leaf(idx))
    }

    pub(crate) fn alloc_branch(&mut self, branch: Branch) -> Result<NodeRef> {
        self.check_limit()?;
        let idx = match self.free_branches.pop() {
            Some(idx) => {
                self.branches[idx as usize] = branch;
                idx
            }
            None => {
                let idx = u32::try_from(self.branches.len())
                    .ok()
                    .filter(|&i| i <= NodeRef::INDEX_MASK)
                    .ok_or(Error::OutOfMemory)?;
                self.branches
                    .try_reserve(1)
                    .map_err(|_| Error::OutOfMemory)?;
                self.branches.push(branch);
                idx
            }
        };
        self.live += 1;
        Ok(NodeRef::branch(idx))
    }

    /// Release a leaf slot, handing back its entry.
    pub(crate) fn free_leaf(&mut self, r: NodeRef) -> Leaf<K, V> {
        debug_assert!(r.is_leaf());
        let leaf = self.leaves[r.index()]
            .take()
            .expect("freed leaf must be live");
        self.free_leaves.push(r.index() as u32);
        self.live -= 1;
        leaf
    }

    pub(crate) fn free_branch(&mut self, r: NodeRef) -> Branch {
        debug_assert!(!r.is_leaf());
        self.free_branches.push(r.index() as u32);
        self.live -= 1;
        self.branches[r.index()]
    }

    /// Release a slot without recycling it, handing back the entry if `r` is a
    /// leaf. Only for tearing the whole arena down before [`reset`](Self::reset),
    /// and never allocates.
    pub(crate) fn discard(&mut self, r: NodeRef) -> Option<Leaf<K, V>> {
        self.live -= 1;
        if r.is_leaf() {
            self.leaves[r.index()].take()
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn branch(&self, r: NodeRef) -> &Branch {
        debug_assert!(!r.is_leaf());
        &self.branches[r.index()]
    }

    #[inline]
    pub(crate) fn branch_mut(&mut self, r: NodeRef) -> &mut Branch {
        debug_assert!(!r.is_leaf());
        &mut self.branches[r.index()]
    }

    #[inline]
    pub(crate) fn leaf(&self, r: NodeRef) -> &Leaf<K, V> {
        debug_assert!(r.is_leaf());
        self.leaves[r.index()]
            .as_ref()
            .expect("reachable leaf must be live")
    }

    #[inline]
    pub(crate) fn leaf_mut(&mut self, r: NodeRef) -> &mut Leaf<K, V> {
        debug_assert!(r.is_leaf());
        self.leaves[r.index()]
            .as_mut()
            .expect("reachable leaf must be live")
    }

    pub(crate) fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    #[inline]
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    /// Forget every slot. Callers release live entries first.
    pub(crate) fn reset(&mut self) {
        debug_assert_eq!(self.live, 0);
        self.branches.clear();
        self.free_branches.clear();
        self.leaves.clear();
        self.free_leaves.clear();
    }

    pub(crate) fn capacity_bytes(&self) -> usize {
        self.branches.capacity() * std::mem::size_of::<Branch>()
            + self.leaves.capacity() * std::mem::size_of::<Option<Leaf<K, V>>>()
            + (self.free_branches.capacity() + self.free_leaves.capacity()) * 4
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.branches.shrink_to_fit();
        self.free_branches.shrink_to_fit();
        self.leaves.shrink_to_fit();
        self.free_leaves.shrink_to_fit();
    }
}
