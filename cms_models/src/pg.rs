use std::ops::DerefMut;
use std::sync::Arc;

use database::DbConnectionPool;
use database::tables::*;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::Level;

use crate::ContentSource;
use crate::Document;
use crate::Error;
use crate::Metadata;
use crate::Term;
use crate::TermKind;
use crate::User;

/// [ContentSource] reading a PostgreSQL database with the CMS schema
#[derive(Clone)]
pub struct PgContentSource {
    pool: Arc<DbConnectionPool>,
}

impl PgContentSource {
    pub fn new(pool: Arc<DbConnectionPool>) -> Self {
        Self { pool }
    }
}

impl ContentSource for PgContentSource {
    type Error = Error;

    #[tracing::instrument(skip_all, fields(%id), err)]
    async fn document(&self, id: i64) -> Result<Option<Document>, Self::Error> {
        let conn = self.pool.get().await?;
        let document = posts::table
            .filter(posts::id.eq(id))
            .select(Document::as_select())
            .first(conn.write().await.deref_mut())
            .await
            .optional()?;
        Ok(document)
    }

    #[tracing::instrument(skip_all, fields(nb_documents), err)]
    async fn document_ids(&self) -> Result<Vec<i64>, Self::Error> {
        let conn = self.pool.get().await?;
        let ids = posts::table
            .select(posts::id)
            .order(posts::id.asc())
            .load::<i64>(conn.write().await.deref_mut())
            .await?;
        tracing::Span::current().record("nb_documents", ids.len());
        Ok(ids)
    }

    #[tracing::instrument(skip_all, fields(%document_id), err)]
    async fn metadata(&self, document_id: i64) -> Result<Metadata, Self::Error> {
        let conn = self.pool.get().await?;
        let rows = postmeta::table
            .filter(postmeta::post_id.eq(document_id))
            .select((postmeta::meta_key, postmeta::meta_value))
            .order(postmeta::meta_id.asc())
            .load::<(Option<String>, Option<String>)>(conn.write().await.deref_mut())
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(key, value)| Some((key?, value.unwrap_or_default())))
            .collect())
    }

    #[tracing::instrument(skip_all, fields(%document_id, %kind), ret(level = Level::DEBUG), err)]
    async fn document_terms(
        &self,
        document_id: i64,
        kind: TermKind,
    ) -> Result<Vec<Term>, Self::Error> {
        let conn = self.pool.get().await?;
        let document_terms = term_relationships::table
            .inner_join(term_taxonomy::table.inner_join(terms::table))
            .filter(term_relationships::object_id.eq(document_id))
            .filter(term_taxonomy::taxonomy.eq(kind.taxonomy()))
            .select(Term::as_select())
            .order(terms::term_id.asc())
            .load(conn.write().await.deref_mut())
            .await?;
        Ok(document_terms)
    }

    #[tracing::instrument(skip_all, fields(%kind), err)]
    async fn terms(&self, kind: TermKind) -> Result<Vec<Term>, Self::Error> {
        let conn = self.pool.get().await?;
        let all_terms = term_taxonomy::table
            .inner_join(terms::table)
            .filter(term_taxonomy::taxonomy.eq(kind.taxonomy()))
            .select(Term::as_select())
            .order(terms::term_id.asc())
            .load(conn.write().await.deref_mut())
            .await?;
        Ok(all_terms)
    }

    #[tracing::instrument(skip_all, fields(%id), err)]
    async fn user(&self, id: i64) -> Result<Option<User>, Self::Error> {
        let conn = self.pool.get().await?;
        let user = users::table
            .filter(users::id.eq(id))
            .select(User::as_select())
            .first(conn.write().await.deref_mut())
            .await
            .optional()?;
        Ok(user)
    }

    #[tracing::instrument(skip_all, err)]
    async fn users(&self) -> Result<Vec<User>, Self::Error> {
        let conn = self.pool.get().await?;
        let all_users = users::table
            .select(User::as_select())
            .order(users::id.asc())
            .load(conn.write().await.deref_mut())
            .await?;
        Ok(all_users)
    }
}
