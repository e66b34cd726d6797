//! Error types for trie operations.

use std::fmt;

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by [`CritBitTrie`](crate::CritBitTrie).
///
/// A failed operation never leaves a partial change behind: the trie is exactly as it
/// was before the call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// A node allocation failed, either in the allocator or because the configured
    /// node limit was reached.
    #[error("out of memory while allocating a trie node")]
    OutOfMemory,

    /// The key has no bit that distinguishes it from a stored key. Happens when one
    /// key equals the other followed only by zero bytes.
    #[error("key clashes with a stored key: no distinguishing bit")]
    Clashes,

    /// No stored entry matched.
    #[error("no matching entry")]
    NotFound,
}

/// A rejected insert. The trie never took ownership of the entry, so it is handed
/// back here untouched.
#[derive(Error, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct InsertError<K, V> {
    kind: Error,
    key: K,
    value: V,
}

impl<K, V> InsertError<K, V> {
    pub(crate) fn new(kind: Error, key: K, value: V) -> Self {
        Self { kind, key, value }
    }

    /// Why the insert was rejected: [`Error::Clashes`] or [`Error::OutOfMemory`].
    pub fn kind(&self) -> Error {
        self.kind
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Take back the rejected key and value.
    pub fn into_entry(self) -> (K, V) {
        (self.key, self.value)
    }
}

// Keys and values need not be `Debug` for the error to be reported.
impl<K, V> fmt::Debug for InsertError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertError")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<K, V> From<InsertError<K, V>> for Error {
    fn from(err: InsertError<K, V>) -> Self {
        err.kind
    }
}
