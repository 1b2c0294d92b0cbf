//! Relevance scoring
//!
//! Each content group is scored on its own scale so that series do not
//! compete with films on raw vote volume. Within a group:
//!
//! 1. raw = average rating × vote count
//! 2. raw is min-max scaled to 0..10 and squashed with `10 / (1 + e^-x)`
//! 3. score = (average rating + squashed) / 2, rounded to two decimals
//! 4. perfect-10 ratings are treated as low-volume outliers: every title with
//!    no more votes than the best-scored perfect 10 is dropped

use std::cmp::Ordering;

use crate::models::{ContentGroup, Title};

const GROUPS: [ContentGroup; 3] = [
    ContentGroup::NonSeries,
    ContentGroup::Series,
    ContentGroup::VideoGames,
];

/// Scores every group and merges them into one ranking, best first
pub fn rank_catalog(titles: Vec<Title>) -> Vec<Title> {
    let mut buckets: [Vec<Title>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for title in titles {
        let slot = GROUPS
            .iter()
            .position(|g| *g == title.title_type.content_group())
            .unwrap_or(0);
        buckets[slot].push(title);
    }

    let mut ranked: Vec<Title> = buckets.into_iter().flat_map(score_group).collect();
    ranked.sort_by(|a, b| descending(a.score, b.score));
    ranked
}

/// Scores one content group and returns it sorted by score, best first
pub fn score_group(mut titles: Vec<Title>) -> Vec<Title> {
    if titles.is_empty() {
        return titles;
    }

    let raw = |t: &Title| t.average_rating * t.num_votes as f64;
    titles.sort_by(|a, b| descending(raw(a), raw(b)));

    let (min, max) = titles.iter().map(raw).fold((f64::MAX, f64::MIN), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let range = max - min;

    for title in titles.iter_mut() {
        let scaled = if range > 0.0 {
            10.0 * (raw(&*title) - min) / range
        } else {
            0.0
        };
        let squashed = 10.0 / (1.0 + (-scaled).exp());
        title.score = (title.average_rating + squashed) / 2.0;
    }
    titles.sort_by(|a, b| descending(a.score, b.score));
    for title in titles.iter_mut() {
        title.score = round2(title.score);
    }

    drop_perfect_ten_outliers(titles)
}

fn drop_perfect_ten_outliers(titles: Vec<Title>) -> Vec<Title> {
    let Some(threshold) = titles
        .iter()
        .find(|t| t.average_rating >= 10.0)
        .map(|t| t.num_votes)
    else {
        return titles;
    };

    let before = titles.len();
    let kept: Vec<Title> = titles
        .into_iter()
        .filter(|t| t.num_votes > threshold)
        .collect();

    tracing::debug!(
        threshold_votes = threshold,
        dropped = before - kept.len(),
        "Dropped perfect-ten outliers"
    );

    kept
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
