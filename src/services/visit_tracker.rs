use std::collections::HashSet;

use crate::models::TitleId;

/// Ids already handled in the current resolver run, as a seed, a chain member
/// or a dead link. Insert-only; a visited id is never queried as a seed and
/// never added to a chain again.
#[derive(Debug, Default)]
pub struct VisitTracker {
    visited: HashSet<TitleId>,
}

impl VisitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` visited, returning `true` if it was not visited before
    pub fn insert(&mut self, id: TitleId) -> bool {
        self.visited.insert(id)
    }

    pub fn contains(&self, id: &TitleId) -> bool {
        self.visited.contains(id)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}
