//! Construction-time settings for [`CritBitTrie`](crate::CritBitTrie).

/// Configuration for a [`CritBitTrie`](crate::CritBitTrie).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Number of entries to reserve arena space for up front.
    pub initial_capacity: usize,
    /// Upper bound on live nodes (branches plus leaves). Allocations past this
    /// limit fail with [`Error::OutOfMemory`](crate::Error::OutOfMemory).
    pub node_limit: Option<usize>,
}

impl Config {
    /// Reserve space for `initial_capacity` entries.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    /// Cap the number of live nodes.
    pub fn node_limit(mut self, limit: usize) -> Self {
        self.node_limit = Some(limit);
        self
    }
}
