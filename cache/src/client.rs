use deadpool_redis::CreatePoolError;
use deadpool_redis::Pool;
use deadpool_redis::PoolError;
use deadpool_redis::Runtime;
use url::Url;

use crate::connection::Connection;
use crate::connection::ConnectionInner;

pub struct Client {
    inner: ClientInner,
}

pub enum ClientInner {
    Tokio(Pool),
    /// Logs every command instead of sending it. Nothing is ever stored.
    DryRun,
    #[cfg(any(test, feature = "testing"))]
    Memory(crate::memory::MemoryStore),
    #[cfg(feature = "mock")]
    Mock(redis_test::MockRedisConnection),
}

#[derive(Debug, Clone)]
pub enum Config {
    /// Disables writes. This should not be used in production.
    DryRun,
    Redis {
        url: Url,
    },
}

impl Client {
    /// Builds the client without opening any connection
    ///
    /// Use [Connection::ping] on a connection to check the store is actually reachable.
    pub fn new(config: Config) -> Result<Self, CreatePoolError> {
        let inner = match config {
            Config::DryRun => ClientInner::DryRun,
            Config::Redis { url } => ClientInner::Tokio(
                deadpool_redis::Config::from_url(url)
                    // a single connection is shared by every projection handler
                    .builder()
                    .map_err(CreatePoolError::Config)?
                    .max_size(1)
                    .runtime(Runtime::Tokio1)
                    .build()
                    .map_err(CreatePoolError::Build)?,
            ),
        };
        Ok(Self { inner })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn new_memory(store: crate::memory::MemoryStore) -> Self {
        Self {
            inner: ClientInner::Memory(store),
        }
    }

    #[cfg(feature = "mock")]
    pub fn new_mock(commands: Vec<crate::MockCmd>) -> Self {
        Self {
            inner: ClientInner::Mock(redis_test::MockRedisConnection::new(commands)),
        }
    }

    pub async fn get_connection(&self) -> Result<Connection, PoolError> {
        match &self.inner {
            ClientInner::Tokio(pool) => Ok(Connection::new(ConnectionInner::Tokio(
                pool.get().await?,
            ))),
            ClientInner::DryRun => Ok(Connection::new(ConnectionInner::DryRun)),
            #[cfg(any(test, feature = "testing"))]
            ClientInner::Memory(store) => Ok(Connection::new(ConnectionInner::Memory(
                store.clone(),
            ))),
            #[cfg(feature = "mock")]
            ClientInner::Mock(mock_conn) => {
                Ok(Connection::new(ConnectionInner::Mock(mock_conn.clone())))
            }
        }
    }
}
