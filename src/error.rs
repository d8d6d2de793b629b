use database::db_connection_pool::DatabasePoolBuildError;
use database::db_connection_pool::DatabasePoolError;
use database::db_connection_pool::PingError;

pub type Result<T, E = ProjectionError> = std::result::Result<T, E>;

/// Failure of a projection handler
///
/// It aborts the handling of one event, the process keeps running.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("store write failed: {0}")]
    Write(#[from] cache::Error),
    #[error("content store read failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("document {0} does not exist")]
    DocumentNotFound(i64),
    #[error("projected value could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ProjectionError {
    pub fn from_source<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self::Source(Box::new(error))
    }
}

/// The process cannot start: nothing has been projected yet
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid store configuration: {0}")]
    StoreConfig(#[from] cache::CreatePoolError),
    #[error("no connection to the store could be opened: {0}")]
    StoreConnection(#[from] cache::PoolError),
    #[error("the store does not answer: {0}")]
    StoreUnreachable(#[source] cache::Error),
    #[error(transparent)]
    DatabaseConfig(#[from] DatabasePoolBuildError),
    #[error(transparent)]
    DatabaseConnection(#[from] DatabasePoolError),
    #[error(transparent)]
    DatabaseUnreachable(#[from] PingError),
}
