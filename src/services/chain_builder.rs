//! Chain discovery for a single seed
//!
//! For each direction the builder asks the provider for the declared link
//! count, takes the first disclosed batch, and then keeps chasing the hidden
//! tail with `next_batch(last_id, Backward)` until the declared count is
//! reached. A continuation that brings no new catalog titles ends the
//! direction, so a source that announces more links than it will ever show
//! cannot keep the builder looping.

use std::collections::HashSet;

use crate::{
    catalog::CatalogIndex,
    models::{Chain, ChainEntry, DisclosureBatch, Direction, TitleId},
    services::{providers::ConnectionProvider, visit_tracker::VisitTracker},
};

/// Why expansion of one direction stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionOutcome {
    /// Nothing declared in this direction
    NoLinks,
    /// The declared count was reached
    Complete,
    /// The source returned an empty batch despite a positive count
    BatchEmpty,
    /// A continuation resolved to no new catalog titles
    DisclosureExhausted,
    /// The source failed; whatever was gathered before is kept
    ProviderFailed,
}

/// Rows gathered for one direction
#[derive(Debug)]
pub struct Expansion {
    pub direction: Direction,
    pub declared: usize,
    pub gathered: usize,
    pub entries: Vec<ChainEntry>,
    pub outcome: ExpansionOutcome,
}

pub struct ChainBuilder<'a> {
    catalog: &'a CatalogIndex,
    provider: &'a dyn ConnectionProvider,
}

/// Labelling context shared by every row of one seed
struct Seed<'s> {
    id: &'s TitleId,
    name: &'s str,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(catalog: &'a CatalogIndex, provider: &'a dyn ConnectionProvider) -> Self {
        Self { catalog, provider }
    }

    /// Resolves the full chain around `seed_id`
    pub async fn build(&self, seed_id: &TitleId, visited: &mut VisitTracker) -> Chain {
        visited.insert(seed_id.clone());
        let mut chain = Chain::new(seed_id.clone());

        let seed_name = self
            .catalog
            .get(seed_id)
            .map(|t| t.name.as_str())
            .unwrap_or_else(|| seed_id.as_str());
        let seed = Seed {
            id: seed_id,
            name: seed_name,
        };

        for direction in Direction::ALL {
            let expansion = self.expand(&seed, direction, visited).await;

            tracing::debug!(
                seed = %seed_id,
                %direction,
                declared = expansion.declared,
                gathered = expansion.gathered,
                added = expansion.entries.len(),
                outcome = ?expansion.outcome,
                "Direction expanded"
            );

            chain.entries.extend(expansion.entries);
        }

        chain
    }

    async fn expand(&self, seed: &Seed<'_>, direction: Direction, visited: &mut VisitTracker) -> Expansion {
        let mut expansion = Expansion {
            direction,
            declared: 0,
            gathered: 0,
            entries: Vec::new(),
            outcome: ExpansionOutcome::NoLinks,
        };

        expansion.declared = match self.provider.link_count(seed.id, direction).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(seed = %seed.id, %direction, error = %e, "Link count failed, skipping direction");
                0
            }
        };
        if expansion.declared == 0 {
            return expansion;
        }

        let mut batch = match self.provider.next_batch(seed.id, direction).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(seed = %seed.id, %direction, error = %e, "Batch fetch failed, skipping direction");
                expansion.outcome = ExpansionOutcome::ProviderFailed;
                return expansion;
            }
        };

        // Ids already counted toward this direction; the seed never counts
        let mut counted: HashSet<TitleId> = HashSet::from([seed.id.clone()]);
        expansion.gathered = self.absorb(&batch, seed, direction, &mut counted, visited, &mut expansion.entries);

        while expansion.gathered < expansion.declared {
            let Some(anchor) = batch.last().cloned() else {
                expansion.outcome = ExpansionOutcome::BatchEmpty;
                return expansion;
            };

            let continuation = match self.provider.next_batch(&anchor, Direction::Backward).await {
                Ok(continuation) => continuation,
                Err(e) => {
                    tracing::warn!(
                        seed = %seed.id,
                        %direction,
                        anchor = %anchor,
                        error = %e,
                        "Continuation fetch failed, keeping partial chain"
                    );
                    expansion.outcome = ExpansionOutcome::ProviderFailed;
                    return expansion;
                }
            };

            let resolved = self.absorb(&continuation, seed, direction, &mut counted, visited, &mut expansion.entries);
            if resolved == 0 {
                expansion.outcome = ExpansionOutcome::DisclosureExhausted;
                return expansion;
            }

            expansion.gathered += resolved;
            batch = continuation;
        }

        expansion.outcome = ExpansionOutcome::Complete;
        expansion
    }

    /// Marks every id of `batch` visited and turns the newly visited catalog
    /// titles into rows. Returns how many catalog titles the batch added to
    /// this direction's tally.
    fn absorb(
        &self,
        batch: &DisclosureBatch,
        seed: &Seed<'_>,
        direction: Direction,
        counted: &mut HashSet<TitleId>,
        visited: &mut VisitTracker,
        entries: &mut Vec<ChainEntry>,
    ) -> usize {
        let mut resolved = 0;

        for id in &batch.ids {
            let first_visit = visited.insert(id.clone());

            if !self.catalog.contains(id) {
                tracing::trace!(seed = %seed.id, linked = %id, "Linked title not in catalog");
                continue;
            }
            if !counted.insert(id.clone()) {
                continue;
            }

            resolved += 1;
            if first_visit {
                entries.push(ChainEntry::linked(id.clone(), direction, seed.name, seed.id));
            }
        }

        resolved
    }
}
