//! Deterministic in-memory provider
//!
//! Serves links from a fixed table, applying the same bounded disclosure as
//! the live site, and records every call so tests can assert on traffic.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::{
    error::ProviderError,
    models::{DisclosureBatch, Direction, TitleId},
    services::providers::ConnectionProvider,
};

/// Which provider operation a recorded call was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Count,
    Batch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub id: TitleId,
    pub direction: Direction,
}

#[derive(Debug)]
pub struct StubProvider {
    links: HashMap<(TitleId, Direction), Vec<TitleId>>,
    declared: HashMap<(TitleId, Direction), usize>,
    failing: HashSet<(CallKind, TitleId, Direction)>,
    disclosure_cap: usize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new(5)
    }
}

impl StubProvider {
    pub fn new(disclosure_cap: usize) -> Self {
        Self {
            links: HashMap::new(),
            declared: HashMap::new(),
            failing: HashSet::new(),
            disclosure_cap: disclosure_cap.max(1),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sets the ids visible from `id` in `direction`.
    ///
    /// The declared count defaults to the number of links unless overridden
    /// with [`StubProvider::with_declared`].
    ///
    /// # Panics
    ///
    /// Panics if `id` or any link is not a well-formed title id.
    pub fn with_links<I>(mut self, id: &str, direction: Direction, links: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let key = (parse(id), direction);
        let links: Vec<TitleId> = links.into_iter().map(|l| parse(l.as_ref())).collect();
        self.declared.entry(key.clone()).or_insert(links.len());
        self.links.insert(key, links);
        self
    }

    /// Overrides the declared count for `id` in `direction`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a well-formed title id.
    pub fn with_declared(mut self, id: &str, direction: Direction, count: usize) -> Self {
        self.declared.insert((parse(id), direction), count);
        self
    }

    /// Makes the given operation fail with `ProviderError::Unavailable`
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a well-formed title id.
    pub fn failing(mut self, kind: CallKind, id: &str, direction: Direction) -> Self {
        self.failing.insert((kind, parse(id), direction));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of recorded calls of `kind` in `direction`
    pub fn call_count(&self, kind: CallKind, direction: Direction) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.kind == kind && c.direction == direction)
            .count()
    }

    fn record(&self, kind: CallKind, id: &TitleId, direction: Direction) -> Result<(), ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                kind,
                id: id.clone(),
                direction,
            });
        }
        if self.failing.contains(&(kind, id.clone(), direction)) {
            return Err(ProviderError::Unavailable(format!(
                "stub failure for {} {}",
                id, direction
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ConnectionProvider for StubProvider {
    async fn link_count(&self, id: &TitleId, direction: Direction) -> Result<usize, ProviderError> {
        self.record(CallKind::Count, id, direction)?;
        Ok(self
            .declared
            .get(&(id.clone(), direction))
            .copied()
            .unwrap_or(0))
    }

    async fn next_batch(
        &self,
        id: &TitleId,
        direction: Direction,
    ) -> Result<DisclosureBatch, ProviderError> {
        self.record(CallKind::Batch, id, direction)?;
        let ids = self
            .links
            .get(&(id.clone(), direction))
            .map(|l| l.iter().take(self.disclosure_cap).cloned().collect())
            .unwrap_or_default();
        Ok(DisclosureBatch::new(id.clone(), direction, ids))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

// Stub tables are written by hand; a malformed id is a bug in the table
fn parse(raw: &str) -> TitleId {
    raw.parse().expect("stub title ids must be well formed")
}
