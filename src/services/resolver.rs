//! Resolver loop
//!
//! Walks the ranked catalog, building one chain per title that no earlier
//! chain has already covered, and stops once enough unconsumed titles have
//! been surfaced. Chains made entirely of consumed titles are dropped from
//! the output but their members stay visited, so they never resurface as
//! part of a later chain.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use crate::{
    catalog::CatalogIndex,
    models::{Chain, ResolveStats, Title, TitleId, TitleType},
    services::{
        chain_builder::ChainBuilder,
        providers::{ConnectionProvider, MemoProvider},
        visit_tracker::VisitTracker,
    },
};

/// Seed filtering and stop condition for one run
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Distinct unconsumed titles to surface before stopping
    pub quota: usize,
    /// Do not start chains from video games
    pub exclude_video_games: bool,
    /// Only start chains from series that have ended by `current_year`
    pub finished_series_only: bool,
    pub current_year: i32,
}

impl ResolveOptions {
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota,
            exclude_video_games: false,
            finished_series_only: false,
            current_year: i32::MAX,
        }
    }

    fn accepts_seed(&self, title: &Title) -> bool {
        if self.exclude_video_games && title.title_type == TitleType::VideoGame {
            return false;
        }
        if self.finished_series_only
            && title.title_type.is_series()
            && !title.is_finished_series(self.current_year)
        {
            return false;
        }
        true
    }
}

/// Chains in discovery order plus run counters
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverOutput {
    pub chains: Vec<Chain>,
    pub stats: ResolveStats,
}

pub struct Resolver<'a> {
    catalog: &'a CatalogIndex,
    provider: &'a dyn ConnectionProvider,
    cancel: CancellationToken,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a CatalogIndex, provider: &'a dyn ConnectionProvider) -> Self {
        Self {
            catalog,
            provider,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to stop the run early; it is checked between seeds
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs over `ranked` in order until the quota is met or titles run out
    pub async fn resolve<'t, I>(
        &self,
        ranked: I,
        consumed: &HashSet<TitleId>,
        options: &ResolveOptions,
    ) -> ResolverOutput
    where
        I: IntoIterator<Item = &'t Title>,
    {
        let memo = MemoProvider::new(self.provider);
        let builder = ChainBuilder::new(self.catalog, &memo);
        let mut visited = VisitTracker::new();
        let mut chains = Vec::new();
        let mut stats = ResolveStats::default();

        if options.quota == 0 {
            stats.quota_met = true;
            return ResolverOutput { chains, stats };
        }

        tracing::info!(
            quota = options.quota,
            consumed = consumed.len(),
            provider = self.provider.name(),
            "Resolving watch chains"
        );

        for title in ranked {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    seeds_processed = stats.seeds_processed,
                    unconsumed_found = stats.unconsumed_found,
                    "Resolver cancelled, returning partial output"
                );
                stats.cancelled = true;
                break;
            }

            if visited.contains(&title.id) || !options.accepts_seed(title) {
                continue;
            }

            let chain = builder.build(&title.id, &mut visited).await;
            stats.seeds_processed += 1;

            let unconsumed = chain.ids().filter(|id| !consumed.contains(*id)).count();
            if unconsumed == 0 {
                tracing::debug!(seed = %title.id, members = chain.len(), "Chain fully consumed, discarded");
                stats.chains_discarded += 1;
                continue;
            }

            tracing::debug!(
                seed = %title.id,
                members = chain.len(),
                unconsumed,
                "Chain emitted"
            );
            stats.unconsumed_found += unconsumed;
            stats.chains_emitted += 1;
            chains.push(chain);

            if stats.unconsumed_found >= options.quota {
                stats.quota_met = true;
                break;
            }
        }

        stats.upstream_calls = memo.upstream_calls();
        stats.memo_hits = memo.hits();

        tracing::info!(
            chains = stats.chains_emitted,
            discarded = stats.chains_discarded,
            unconsumed_found = stats.unconsumed_found,
            visited = visited.len(),
            upstream_calls = stats.upstream_calls,
            "Resolver finished"
        );

        ResolverOutput { chains, stats }
    }
}
