pub mod block;
pub mod document;
pub mod metadata;
#[cfg(any(test, feature = "testing"))]
pub mod mock;
pub mod pg;
pub mod source;
pub mod taxonomy;
pub mod user;

pub use block::Block;
pub use document::Document;
pub use metadata::Metadata;
#[cfg(any(test, feature = "testing"))]
pub use mock::MockContentSource;
pub use pg::PgContentSource;
pub use source::ContentSource;
pub use taxonomy::Term;
pub use taxonomy::TermKind;
pub use user::User;

use database::DatabaseError;
use database::db_connection_pool::DatabasePoolError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    DatabaseUnavailable(#[from] DatabasePoolError),
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        Self::Database(e.into())
    }
}
