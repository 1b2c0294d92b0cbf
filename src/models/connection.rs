use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::TitleId;

/// Side of a franchise link, seen from the title being queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The queried title follows the linked ones (prequels)
    Forward,
    /// The queried title is followed by the linked ones (sequels)
    Backward,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Forward, Direction::Backward];

    /// Anchor name of the connection section on the upstream page
    pub fn section_key(self) -> &'static str {
        match self {
            Direction::Forward => "follows",
            Direction::Backward => "followed_by",
        }
    }

    /// Relation word used when labelling a linked title relative to the seed.
    ///
    /// If the seed follows X, then X is "Followed by" the seed, and the other
    /// way around.
    pub fn relation_label(self) -> &'static str {
        match self {
            Direction::Forward => "Followed by",
            Direction::Backward => "Follows",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.section_key())
    }
}

/// One disclosed page of linked ids for an anchor and direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisclosureBatch {
    pub anchor: TitleId,
    pub direction: Direction,
    pub ids: Vec<TitleId>,
}

impl DisclosureBatch {
    pub fn new(anchor: TitleId, direction: Direction, ids: Vec<TitleId>) -> Self {
        Self {
            anchor,
            direction,
            ids,
        }
    }

    pub fn empty(anchor: TitleId, direction: Direction) -> Self {
        Self::new(anchor, direction, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn last(&self) -> Option<&TitleId> {
        self.ids.last()
    }
}

/// A chain member; `relation` is `None` only for the seed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub title_id: TitleId,
    pub relation: Option<String>,
}

impl ChainEntry {
    pub fn seed(title_id: TitleId) -> Self {
        Self {
            title_id,
            relation: None,
        }
    }

    pub fn linked(title_id: TitleId, direction: Direction, seed_name: &str, seed_id: &TitleId) -> Self {
        Self {
            title_id,
            relation: Some(format!(
                "{} {} ({})",
                direction.relation_label(),
                seed_name,
                seed_id
            )),
        }
    }
}

/// Ordered members of one watch chain, seed first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub seed: TitleId,
    pub entries: Vec<ChainEntry>,
}

impl Chain {
    pub fn new(seed: TitleId) -> Self {
        Self {
            entries: vec![ChainEntry::seed(seed.clone())],
            seed,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &TitleId> {
        self.entries.iter().map(|e| &e.title_id)
    }

    pub fn contains(&self, id: &TitleId) -> bool {
        self.ids().any(|member| member == id)
    }
}
