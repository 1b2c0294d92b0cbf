/// Read-through caching on top of Redis.
///
/// Looks the key up first and returns the cached value on a hit. On a miss
/// the block is awaited, its value is queued for a background write and then
/// returned. A failing cache read is logged and treated as a miss, so an
/// unreachable Redis only costs an upstream fetch.
///
/// # Arguments
/// * `$cache`: a [`Cache`](crate::db::Cache), anything with `get_from_cache`
///   and `set_in_background`.
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) to read and write.
/// * `$ttl`: time-to-live of the written value in seconds.
/// * `$block`: future computing the value on a miss; its error is propagated.
///
/// # Example
/// ```rust,ignore
/// let page: ConnectionsPage = cached!(self.cache, CacheKey::ConnectionsPage(id), TTL, async move {
///     self.fetch_page(&id).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await {
            Ok(Some(hit)) => Ok(hit),
            miss => {
                if let Err(e) = miss {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, fetching live");
                }
                match $block.await {
                    Ok(value) => {
                        $cache.set_in_background(&key, &value, $ttl);
                        Ok(value)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }};
}
