use crate::Document;
use crate::Metadata;
use crate::Term;
use crate::TermKind;
use crate::User;

/// Read access to the content store
///
/// Implementations only fetch rows: every decision about what gets projected belongs to
/// the caller. Missing entities are `Ok(None)`, never errors.
pub trait ContentSource: Clone + Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn document(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send;

    /// Ids of every document, whatever its status or type, in ascending order
    fn document_ids(&self) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send;

    fn metadata(
        &self,
        document_id: i64,
    ) -> impl Future<Output = Result<Metadata, Self::Error>> + Send;

    /// Terms of `kind` the document is classified with, ordered by term id
    fn document_terms(
        &self,
        document_id: i64,
        kind: TermKind,
    ) -> impl Future<Output = Result<Vec<Term>, Self::Error>> + Send;

    /// Every term of `kind`, ordered by term id
    fn terms(&self, kind: TermKind) -> impl Future<Output = Result<Vec<Term>, Self::Error>> + Send;

    fn user(&self, id: i64) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send;

    fn users(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send;
}
