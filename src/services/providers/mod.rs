//! Connection provider abstraction
//!
//! A connection provider answers two questions about a title: how many
//! franchise-linked titles it declares in a direction, and which ones it is
//! willing to disclose right now. Real sources disclose only a bounded prefix
//! per call, so the chain builder chases the rest by re-querying from the
//! last disclosed id.

use crate::{
    error::ProviderError,
    models::{DisclosureBatch, Direction, TitleId},
};

pub mod imdb;
pub mod memo;
pub mod stub;

pub use imdb::ImdbConnectionProvider;
pub use memo::MemoProvider;
pub use stub::StubProvider;

/// Trait for relationship sources
///
/// Implementations should map "nothing to report" to `Ok(0)` / an empty batch
/// and reserve errors for transport or markup failures. Callers never let a
/// provider error abort a resolver run.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Declared number of linked titles in `direction`
    ///
    /// A declaration that cannot be parsed is reported as `Ok(0)`.
    async fn link_count(&self, id: &TitleId, direction: Direction) -> Result<usize, ProviderError>;

    /// Next disclosed batch of linked ids, starting from `id`
    ///
    /// The batch may be empty even when `link_count` is positive.
    async fn next_batch(
        &self,
        id: &TitleId,
        direction: Direction,
    ) -> Result<DisclosureBatch, ProviderError>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
