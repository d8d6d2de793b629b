//! In-memory [ContentSource] for tests

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use chrono::NaiveDate;
use chrono::NaiveDateTime;

use crate::ContentSource;
use crate::Document;
use crate::Metadata;
use crate::Term;
use crate::TermKind;
use crate::User;

#[derive(Debug, thiserror::Error)]
#[error("the mocked content store is unavailable")]
pub struct MockSourceError;

#[derive(Debug, Default)]
struct Content {
    documents: BTreeMap<i64, Document>,
    metadata: BTreeMap<i64, Metadata>,
    classification: BTreeMap<(i64, TermKind), Vec<i64>>,
    terms: BTreeMap<TermKind, BTreeMap<i64, Term>>,
    users: BTreeMap<i64, User>,
    unavailable: bool,
}

/// A content store living in memory, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MockContentSource {
    content: Arc<Mutex<Content>>,
}

/// A published page with default values, holding `content` as body
pub fn document(id: i64, content: &str) -> Document {
    let modified: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 5, 17)
        .and_then(|date| date.and_hms_opt(10, 30, 0))
        .unwrap_or_default();
    Document {
        id,
        author: 1,
        title: format!("Document {id}"),
        status: "publish".to_owned(),
        parent: 0,
        comment_status: "open".to_owned(),
        name: format!("document-{id}"),
        modified,
        modified_gmt: modified,
        guid: format!("https://example.org/?p={id}"),
        post_type: "post".to_owned(),
        content: content.to_owned(),
    }
}

pub fn term(term_id: i64, name: &str) -> Term {
    Term {
        term_id,
        name: name.to_owned(),
        slug: name.to_lowercase().replace(' ', "-"),
    }
}

pub fn user(id: i64, display_name: &str) -> User {
    let login = display_name.to_lowercase().replace(' ', ".");
    User {
        id,
        email: format!("{login}@example.org"),
        login,
        display_name: display_name.to_owned(),
    }
}

impl MockContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Content> {
        self.content.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_document(self, document: Document) -> Self {
        self.lock().documents.insert(document.id, document);
        self
    }

    pub fn with_meta(self, document_id: i64, key: &str, value: &str) -> Self {
        self.lock()
            .metadata
            .entry(document_id)
            .or_default()
            .insert(key, value);
        self
    }

    /// Registers `term` and classifies the document with it
    pub fn with_document_term(self, document_id: i64, kind: TermKind, term: Term) -> Self {
        {
            let mut content = self.lock();
            content
                .classification
                .entry((document_id, kind))
                .or_default()
                .push(term.term_id);
            content
                .terms
                .entry(kind)
                .or_default()
                .insert(term.term_id, term);
        }
        self
    }

    pub fn with_term(self, kind: TermKind, term: Term) -> Self {
        self.lock()
            .terms
            .entry(kind)
            .or_default()
            .insert(term.term_id, term);
        self
    }

    pub fn with_user(self, user: User) -> Self {
        self.lock().users.insert(user.id, user);
        self
    }

    /// Makes every following read fail
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    fn read<T>(&self, f: impl FnOnce(&Content) -> T) -> Result<T, MockSourceError> {
        let content = self.lock();
        if content.unavailable {
            return Err(MockSourceError);
        }
        Ok(f(&content))
    }
}

impl ContentSource for MockContentSource {
    type Error = MockSourceError;

    async fn document(&self, id: i64) -> Result<Option<Document>, Self::Error> {
        self.read(|content| content.documents.get(&id).cloned())
    }

    async fn document_ids(&self) -> Result<Vec<i64>, Self::Error> {
        self.read(|content| content.documents.keys().copied().collect())
    }

    async fn metadata(&self, document_id: i64) -> Result<Metadata, Self::Error> {
        self.read(|content| {
            content
                .metadata
                .get(&document_id)
                .cloned()
                .unwrap_or_default()
        })
    }

    async fn document_terms(
        &self,
        document_id: i64,
        kind: TermKind,
    ) -> Result<Vec<Term>, Self::Error> {
        self.read(|content| {
            let mut ids = content
                .classification
                .get(&(document_id, kind))
                .cloned()
                .unwrap_or_default();
            ids.sort_unstable();
            ids.dedup();
            ids.iter()
                .filter_map(|id| content.terms.get(&kind)?.get(id).cloned())
                .collect()
        })
    }

    async fn terms(&self, kind: TermKind) -> Result<Vec<Term>, Self::Error> {
        self.read(|content| {
            content
                .terms
                .get(&kind)
                .map(|terms| terms.values().cloned().collect())
                .unwrap_or_default()
        })
    }

    async fn user(&self, id: i64) -> Result<Option<User>, Self::Error> {
        self.read(|content| content.users.get(&id).cloned())
    }

    async fn users(&self) -> Result<Vec<User>, Self::Error> {
        self.read(|content| content.users.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn document_terms_are_ordered_and_resolved() {
        let source = MockContentSource::new()
            .with_document(document(1, ""))
            .with_document_term(1, TermKind::Tag, term(9, "Rust"))
            .with_document_term(1, TermKind::Tag, term(4, "Redis"))
            .with_document_term(1, TermKind::Category, term(2, "News"));

        let tags = source.document_terms(1, TermKind::Tag).await.unwrap();
        assert_eq!(tags, vec![term(4, "Redis"), term(9, "Rust")]);
        assert_eq!(
            source.terms(TermKind::Category).await.unwrap(),
            vec![term(2, "News")]
        );
        assert!(source.document_terms(2, TermKind::Tag).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_source_fails_every_read() {
        let source = MockContentSource::new().with_document(document(1, ""));
        source.set_unavailable(true);
        assert!(source.document_ids().await.is_err());
        assert!(source.document(1).await.is_err());
        source.set_unavailable(false);
        assert_eq!(source.document_ids().await.unwrap(), vec![1]);
    }
}
