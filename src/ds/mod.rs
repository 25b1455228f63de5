pub mod arena_list;
pub mod promotion_buffer;
pub mod shard;

pub use arena_list::{ArenaList, SlotId};
pub use promotion_buffer::{PROMOTION_BUFFER_CAPACITY, PromotionBuffer, PromotionLog};
pub use shard::{ShardKey, ShardSelector};
