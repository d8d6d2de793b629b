pub mod client;
pub mod connection;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use client::Client;
pub use client::Config;
pub use connection::Connection;
pub use deadpool_redis::CreatePoolError;
pub use deadpool_redis::PoolError;
pub use deadpool_redis::redis::RedisError;

pub type Error = RedisError;

#[cfg(feature = "mock")]
pub use redis_test::MockCmd; // re-export MockCmd to avoid having to depend on redis-test directly

#[cfg(any(test, feature = "testing"))]
pub use memory::Entry;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryStore;
