pub mod cache;
pub mod memory;
pub mod redis;
pub mod store;

pub use cache::{is_stale, CacheKey, CacheStore, CachedDataset, STALE_AFTER_MS};
pub use memory::MemoryStore;
pub use redis::{create_redis_client, RedisStore};
pub use store::KeyValueStore;
