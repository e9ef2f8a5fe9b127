use std::collections::HashSet;

/// Names of places already scheduled during one course request.
///
/// Owned by the generator for the whole request and lent to the parser for
/// each batch, so a place is never scheduled twice across batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageTracker {
    used: HashSet<String>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// Returns false when the name was already used.
    pub fn mark_used(&mut self, name: impl Into<String>) -> bool {
        self.used.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn clear(&mut self) {
        self.used.clear();
    }

    /// True once used names take up more than `ratio` of a pool of `pool_size` places.
    pub fn exceeds(&self, pool_size: usize, ratio: f64) -> bool {
        pool_size > 0 && self.used.len() as f64 > pool_size as f64 * ratio
    }
}
