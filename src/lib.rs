//! # critbit-rs
//!
//! An ordered map over byte-string keys, stored as a crit-bit trie.
//!
//! Each branch records the single bit position at which the keys below it first
//! differ; each leaf holds one entry. Lookup, insert and remove touch one
//! root-to-leaf path, so they cost O(key length) with no rebalancing, and an
//! in-order walk yields keys in ascending byte order.
//!
//! Keys compare as if zero-padded: `b"AB"` and `b"AB\0"` have no distinguishing
//! bit, so only one of them can be stored and the other insert fails with
//! [`Error::Clashes`].
//!
//! ## Example
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use critbit_rs::CritBitTrie;
//!
//! let mut trie: CritBitTrie<&str, u32> = CritBitTrie::new(0);
//! trie.insert("car", 1).unwrap();
//! trie.insert("cart", 2).unwrap();
//! trie.insert("dog", 3).unwrap();
//!
//! assert_eq!(*trie.lookup(b"cart"), 2);
//! assert_eq!(*trie.lookup(b"cat"), 0);
//! assert_eq!(trie.select(2), Some((&"dog", &3)));
//!
//! let mut hits = Vec::new();
//! let _: ControlFlow<()> = trie
//!     .lookup_prefix(b"car", |k, _| {
//!         hits.push(*k);
//!         ControlFlow::Continue(())
//!     })
//!     .unwrap();
//! assert_eq!(hits, ["car", "cart"]);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod arena;
pub mod bits;
mod config;
pub mod container;
mod error;
mod show;
mod trie;
pub mod walk;

pub use bits::CritBit;
pub use config::Config;
pub use container::AssocArray;
pub use error::{Error, InsertError, Result};
pub use trie::CritBitTrie;
pub use walk::{Iter, Level, NodeView, Order, Visit};

#[cfg(test)]
mod proptests;
