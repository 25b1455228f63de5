pub use crate::builder::{CacheBuilder, DEFAULT_SHARDS};
pub use crate::ds::{PROMOTION_BUFFER_CAPACITY, ShardKey, ShardSelector};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::policy::lru::{LruCache, MAX_CAPACITY};
pub use crate::policy::sharded_lru::ShardedLruCache;
