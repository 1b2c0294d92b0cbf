use serde::{Deserialize, Serialize};

use super::{Chain, Title, TitleId, TitleType};

/// Request body for `POST /api/v1/watch-next`
#[derive(Debug, Clone, Deserialize)]
pub struct WatchNextRequest {
    /// Number of distinct unconsumed titles to surface
    pub quota: usize,
    /// Titles the user already watched or rated
    #[serde(default)]
    pub consumed_ids: Vec<TitleId>,
    /// Skip video games as chain seeds (they can still be chain members)
    #[serde(default = "default_true")]
    pub exclude_video_games: bool,
    /// Skip series seeds that have not finished airing
    #[serde(default)]
    pub finished_series_only: bool,
    /// Re-order each chain by start year after discovery
    #[serde(default)]
    pub sort_by_year: bool,
}

fn default_true() -> bool {
    true
}

/// One line of the output table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchNextRow {
    pub id: TitleId,
    pub title: String,
    pub relation: Option<String>,
    pub title_type: TitleType,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub runtime_minutes: Option<u32>,
    pub num_votes: u64,
    pub average_rating: f64,
    pub score: f64,
    pub consumed: bool,
}

impl WatchNextRow {
    pub fn new(title: &Title, relation: Option<String>, consumed: bool) -> Self {
        Self {
            id: title.id.clone(),
            title: title.name.clone(),
            relation,
            title_type: title.title_type,
            start_year: title.start_year,
            end_year: title.end_year,
            runtime_minutes: title.runtime_minutes,
            num_votes: title.num_votes,
            average_rating: title.average_rating,
            score: title.score,
            consumed,
        }
    }
}

/// Counters describing one resolver run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStats {
    pub seeds_processed: usize,
    pub chains_emitted: usize,
    pub chains_discarded: usize,
    pub unconsumed_found: usize,
    pub quota_met: bool,
    pub cancelled: bool,
    pub upstream_calls: usize,
    pub memo_hits: usize,
}

/// Response body for `POST /api/v1/watch-next`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchNextResponse {
    pub rows: Vec<WatchNextRow>,
    pub chains: Vec<Chain>,
    pub stats: ResolveStats,
}
