use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;

use diesel::ConnectionError;
use diesel::ConnectionResult;
use diesel::sql_query;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::ManagerConfig;
use diesel_async::pooled_connection::deadpool::Object;
use diesel_async::pooled_connection::deadpool::Pool;
use futures::future::BoxFuture;
use futures_util::FutureExt as _;
use openssl::ssl::SslConnector;
use openssl::ssl::SslMethod;
use openssl::ssl::SslVerifyMode;
use tokio::sync::OwnedRwLockWriteGuard;
use tokio::sync::RwLock;
use tracing::trace;
use url::Url;

pub type DbConnectionConfig = AsyncDieselConnectionManager<AsyncPgConnection>;

/// A pooled connection, shareable between the reads of a single projection
#[derive(Clone)]
pub struct DbConnection {
    inner: Arc<RwLock<Object<AsyncPgConnection>>>,
}

pub struct WriteHandle {
    guard: OwnedRwLockWriteGuard<Object<AsyncPgConnection>>,
}

impl DbConnection {
    pub fn new(inner: Arc<RwLock<Object<AsyncPgConnection>>>) -> Self {
        Self { inner }
    }

    /// Locks the connection for the duration of one query
    pub async fn write(&self) -> WriteHandle {
        WriteHandle {
            guard: self.inner.clone().write_owned().await,
        }
    }
}

impl Deref for WriteHandle {
    type Target = AsyncPgConnection;

    fn deref(&self) -> &Self::Target {
        self.guard.deref()
    }
}

impl DerefMut for WriteHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.deref_mut()
    }
}

#[derive(Clone)]
pub struct DbConnectionPool {
    pool: Arc<Pool<AsyncPgConnection>>,
}

#[derive(Debug, thiserror::Error)]
#[error("an error occurred while building the database pool: '{0}'")]
pub struct DatabasePoolBuildError(#[from] diesel_async::pooled_connection::deadpool::BuildError);

#[derive(Debug, thiserror::Error)]
#[error("an error occurred while getting a connection from the database pool: '{0}'")]
pub struct DatabasePoolError(#[from] diesel_async::pooled_connection::deadpool::PoolError);

impl DbConnectionPool {
    /// Creates a connection pool with the given settings
    ///
    /// No connection is opened until the first call to [DbConnectionPool::get].
    pub async fn try_initialize(url: Url, max_size: usize) -> Result<Self, DatabasePoolBuildError> {
        let pool = create_connection_pool(url, max_size)?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn max_size(&self) -> usize {
        self.pool.status().max_size
    }

    pub async fn get(&self) -> Result<DbConnection, DatabasePoolError> {
        let connection = self.pool.get().await?;
        Ok(DbConnection::new(Arc::new(RwLock::new(connection))))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("could not ping the database: '{0}'")]
pub struct PingError(#[from] diesel::result::Error);

pub async fn ping_database(conn: &mut DbConnection) -> Result<(), PingError> {
    sql_query("SELECT 1")
        .execute(conn.write().await.deref_mut())
        .await?;
    trace!("Database ping successful");
    Ok(())
}

fn create_connection_pool(
    url: Url,
    max_size: usize,
) -> Result<Pool<AsyncPgConnection>, DatabasePoolBuildError> {
    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup = Box::new(establish_connection);
    let manager = DbConnectionConfig::new_with_config(url, manager_config);
    Ok(Pool::builder(manager).max_size(max_size).build()?)
}

fn establish_connection(config: &str) -> BoxFuture<'_, ConnectionResult<AsyncPgConnection>> {
    let fut = async {
        let mut connector_builder = SslConnector::builder(SslMethod::tls())
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        connector_builder.set_verify(SslVerifyMode::NONE);
        let tls = postgres_openssl::MakeTlsConnector::new(connector_builder.build());
        let (client, conn) = tokio_postgres::connect(config, tls)
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::error!("connection error: {}", e);
            }
        });
        AsyncPgConnection::try_from(client).await
    };
    fut.boxed()
}
