pub mod cache;
pub mod postgres;

pub use cache::{
    create_redis_client, Cache, CacheBackend, CacheKey, CacheWriterHandle, MemoryBackend,
    OptionToken, RedisBackend,
};
pub use postgres::create_pool;
