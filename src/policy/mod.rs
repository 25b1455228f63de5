pub mod lru;
pub mod sharded_lru;
