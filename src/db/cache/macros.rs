/// Cache-aside helper: try the cache, fall back to the provided block, then
/// populate the cache in the background.
///
/// The TTL comes from the key's namespace. The block must evaluate to a
/// future of `AppResult<T>`; its value is returned and queued for caching.
///
/// ```ignore
/// let page = cached!(self.cache, options.cache_key(), async {
///     let (items, total) = self.content.find_many(query).await?;
///     Ok(ContentPage { items, total })
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await {
            Some(cached) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(cached)
            }
            None => match $block.await {
                Ok(value) => {
                    $cache.set_in_background(&key, &value);
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
