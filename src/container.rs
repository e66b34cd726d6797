//! The associative-array contract, for callers that swap map backends.

use std::ops::ControlFlow;

use crate::{CritBitTrie, InsertError, Result};

/// Operations a swappable associative-array backend provides.
///
/// Keys are addressed by their bytes; stored keys and values are owned by the
/// container.
pub trait AssocArray {
    type Key;
    type Value;

    /// Stored value, or the container's default on a miss.
    fn lookup(&self, key: &[u8]) -> &Self::Value;

    /// Store an entry. A rejected entry is handed back inside the error.
    fn insert(
        &mut self,
        key: Self::Key,
        value: Self::Value,
    ) -> Result<(), InsertError<Self::Key, Self::Value>>;

    fn remove(&mut self, key: &[u8]) -> Option<Self::Value>;

    /// Entry at zero-based rank `k` in ascending key order.
    fn select(&self, k: usize) -> Option<(&Self::Key, &Self::Value)>;

    /// Structural node count.
    fn count(&self) -> usize;

    /// Stored entry count.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup_prefix(
        &self,
        prefix: &[u8],
        f: &mut dyn FnMut(&Self::Key, &Self::Value) -> ControlFlow<()>,
    ) -> Result<ControlFlow<()>>;
}

impl<K: AsRef<[u8]>, V> AssocArray for CritBitTrie<K, V> {
    type Key = K;
    type Value = V;

    fn lookup(&self, key: &[u8]) -> &V {
        CritBitTrie::lookup(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Result<(), InsertError<K, V>> {
        CritBitTrie::insert(self, key, value)
    }

    fn remove(&mut self, key: &[u8]) -> Option<V> {
        CritBitTrie::remove(self, key)
    }

    fn select(&self, k: usize) -> Option<(&K, &V)> {
        CritBitTrie::select(self, k)
    }

    fn count(&self) -> usize {
        CritBitTrie::count(self)
    }

    fn len(&self) -> usize {
        CritBitTrie::len(self)
    }

    fn lookup_prefix(
        &self,
        prefix: &[u8],
        f: &mut dyn FnMut(&K, &V) -> ControlFlow<()>,
    ) -> Result<ControlFlow<()>> {
        CritBitTrie::lookup_prefix(self, prefix, |k, v| f(k, v))
    }
}
