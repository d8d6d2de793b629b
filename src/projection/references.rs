//! Projection of the entities documents refer to: users and taxonomy terms

use cache::Connection;
use cms_models::ContentSource;
use cms_models::Term;
use cms_models::TermKind;
use cms_models::User;
use strum::IntoEnumIterator;

use super::Projector;
use super::keys;
use crate::error::ProjectionError;
use crate::error::Result;

/// Number of records written by a reference synchronization
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceReport {
    pub users: usize,
    pub categories: usize,
    pub tags: usize,
}

fn user_fields(user: &User) -> Vec<(String, String)> {
    vec![
        ("user_id".to_owned(), user.id.to_string()),
        ("login".to_owned(), user.login.clone()),
        ("display_name".to_owned(), user.display_name.clone()),
        ("email".to_owned(), user.email.clone()),
    ]
}

fn term_fields(kind: TermKind, term: &Term) -> Vec<(String, String)> {
    let mut fields = vec![
        ("term_id".to_owned(), term.term_id.to_string()),
        ("name".to_owned(), term.name.clone()),
    ];
    // category records hold no slug
    if kind == TermKind::Tag {
        fields.push(("slug".to_owned(), term.slug.clone()));
    }
    fields
}

impl<S: ContentSource> Projector<S> {
    /// Writes one record per user and per term
    ///
    /// Records of users or terms that no longer exist are not removed.
    #[tracing::instrument(skip_all, err)]
    pub async fn sync_references(&self, conn: &mut Connection) -> Result<ReferenceReport> {
        let mut report = ReferenceReport::default();

        let users = self
            .source()
            .users()
            .await
            .map_err(ProjectionError::from_source)?;
        for user in &users {
            conn.replace_hash(&keys::user_key(user.id), &user_fields(user))
                .await?;
        }
        report.users = users.len();

        for kind in TermKind::iter() {
            let terms = self
                .source()
                .terms(kind)
                .await
                .map_err(ProjectionError::from_source)?;
            for term in &terms {
                conn.replace_hash(&keys::term_key(kind, term.term_id), &term_fields(kind, term))
                    .await?;
            }
            match kind {
                TermKind::Category => report.categories = terms.len(),
                TermKind::Tag => report.tags = terms.len(),
            }
        }

        Ok(report)
    }
}
