use std::collections::HashSet;

use chrono::Datelike;
use tokio_util::sync::CancellationToken;

use crate::{
    catalog::CatalogIndex,
    error::{AppError, AppResult},
    models::{Chain, TitleId, WatchNextRequest, WatchNextResponse, WatchNextRow},
    services::{
        providers::ConnectionProvider,
        resolver::{ResolveOptions, Resolver},
    },
};

/// Largest quota a single request may ask for
pub const MAX_QUOTA: usize = 100;

/// Builds the watch-next table for one request
///
/// Validates the request, runs the resolver over the ranked catalog, applies
/// the optional year ordering, and flattens the chains into output rows.
pub async fn watch_next(
    catalog: &CatalogIndex,
    provider: &dyn ConnectionProvider,
    request: WatchNextRequest,
    cancel: CancellationToken,
) -> AppResult<WatchNextResponse> {
    if request.quota == 0 || request.quota > MAX_QUOTA {
        return Err(AppError::InvalidInput(format!(
            "Quota must be between 1 and {}",
            MAX_QUOTA
        )));
    }

    let consumed: HashSet<TitleId> = request.consumed_ids.into_iter().collect();
    let options = ResolveOptions {
        quota: request.quota,
        exclude_video_games: request.exclude_video_games,
        finished_series_only: request.finished_series_only,
        current_year: chrono::Utc::now().year(),
    };

    let output = Resolver::new(catalog, provider)
        .with_cancellation(cancel)
        .resolve(catalog.ranked(), &consumed, &options)
        .await;

    let mut chains = output.chains;
    if request.sort_by_year {
        for chain in chains.iter_mut() {
            sort_by_year(chain, catalog);
        }
    }

    let rows = to_rows(&chains, catalog, &consumed);

    Ok(WatchNextResponse {
        rows,
        chains,
        stats: output.stats,
    })
}

/// Stable sort of chain members by start year, unknown years last
pub fn sort_by_year(chain: &mut Chain, catalog: &CatalogIndex) {
    chain.entries.sort_by_key(|entry| {
        catalog
            .get(&entry.title_id)
            .and_then(|t| t.start_year)
            .unwrap_or(i32::MAX)
    });
}

/// Flattens chains into table rows in output order
pub fn to_rows(chains: &[Chain], catalog: &CatalogIndex, consumed: &HashSet<TitleId>) -> Vec<WatchNextRow> {
    chains
        .iter()
        .flat_map(|chain| chain.entries.iter())
        .filter_map(|entry| {
            let title = catalog.get(&entry.title_id)?;
            Some(WatchNextRow::new(
                title,
                entry.relation.clone(),
                consumed.contains(&entry.title_id),
            ))
        })
        .collect()
}
