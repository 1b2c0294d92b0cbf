//! Per-run response memo
//!
//! Wraps a provider for the lifetime of one resolver run so that the same
//! `(id, direction)` question is asked upstream at most once. Only successful
//! answers are remembered; a failure is retried the next time it is asked.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{
    error::ProviderError,
    models::{DisclosureBatch, Direction, TitleId},
    services::providers::ConnectionProvider,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MemoKey {
    Count(TitleId, Direction),
    Batch(TitleId, Direction),
}

#[derive(Debug, Clone)]
enum MemoValue {
    Count(usize),
    Batch(DisclosureBatch),
}

#[derive(Default)]
struct MemoState {
    entries: HashMap<MemoKey, MemoValue>,
    upstream_calls: usize,
    hits: usize,
}

pub struct MemoProvider<'a> {
    inner: &'a dyn ConnectionProvider,
    state: Mutex<MemoState>,
}

impl<'a> MemoProvider<'a> {
    pub fn new(inner: &'a dyn ConnectionProvider) -> Self {
        Self {
            inner,
            state: Mutex::new(MemoState::default()),
        }
    }

    /// Number of calls forwarded to the wrapped provider
    pub fn upstream_calls(&self) -> usize {
        self.state.lock().map(|s| s.upstream_calls).unwrap_or_default()
    }

    /// Number of calls answered from the memo
    pub fn hits(&self) -> usize {
        self.state.lock().map(|s| s.hits).unwrap_or_default()
    }

    fn lookup(&self, key: &MemoKey) -> Option<MemoValue> {
        let mut state = self.state.lock().ok()?;
        let value = state.entries.get(key).cloned();
        if value.is_some() {
            state.hits += 1;
        } else {
            state.upstream_calls += 1;
        }
        value
    }

    fn remember(&self, key: MemoKey, value: MemoValue) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.insert(key, value);
        }
    }
}

#[async_trait::async_trait]
impl<'a> ConnectionProvider for MemoProvider<'a> {
    async fn link_count(&self, id: &TitleId, direction: Direction) -> Result<usize, ProviderError> {
        let key = MemoKey::Count(id.clone(), direction);
        if let Some(MemoValue::Count(n)) = self.lookup(&key) {
            return Ok(n);
        }

        let n = self.inner.link_count(id, direction).await?;
        self.remember(key, MemoValue::Count(n));
        Ok(n)
    }

    async fn next_batch(
        &self,
        id: &TitleId,
        direction: Direction,
    ) -> Result<DisclosureBatch, ProviderError> {
        let key = MemoKey::Batch(id.clone(), direction);
        if let Some(MemoValue::Batch(batch)) = self.lookup(&key) {
            return Ok(batch);
        }

        let batch = self.inner.next_batch(id, direction).await?;
        self.remember(key, MemoValue::Batch(batch.clone()));
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
