//! Custom Resource Definitions for redis-fleet

mod fleet;

pub use fleet::{RedisFleet, RedisFleetSpec};
