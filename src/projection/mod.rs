//! Projection of content documents into flat store records
//!
//! A document is first decomposed by the [extractor] into a [ProjectionBundle], which the
//! [writer] then applies to the store, replacing every record wholesale. The [Projector]
//! ties both to a [ContentSource] and dispatches [ContentEvent]s to the matching handler.

pub mod deletion;
pub mod extractor;
pub mod keys;
pub mod references;
pub mod sweep;
pub mod writer;

use cms_models::ContentSource;
use url::Url;

use crate::error::ProjectionError;
use crate::error::Result;
use crate::events::ContentEvent;
pub use deletion::DeletionReport;
pub use extractor::ProjectionBundle;
pub use references::ReferenceReport;
pub use sweep::SweepReport;

/// Metadata holding the ids of the issues a document belongs to
pub const ISSUES_META_KEY: &str = "purple_in_issues";
/// Metadata holding the ids of the articles of an issue
pub const ARTICLES_META_KEY: &str = "purple_issue_articles";
/// Metadata holding the display options of an article
pub const ARTICLE_OPTIONS_META_KEY: &str = "purple_content_options";

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSettings {
    /// Base of the permalinks of related articles
    pub site_url: Url,
    /// Block attribute holding the stable block identifier
    pub block_id_attribute: String,
    /// Metadata keys starting with this prefix are projected as custom fields
    pub custom_field_prefix: String,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            site_url: Url::parse("http://localhost/").expect("static URL is valid"),
            block_id_attribute: "purpleId".to_owned(),
            custom_field_prefix: "purple_custom_meta_".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionOutcome {
    Projected { nb_blocks: usize },
    /// The document holds no structured block: the store is left untouched
    Skipped,
}

/// Handles content events against one store connection
#[derive(Clone)]
pub struct Projector<S> {
    source: S,
    settings: ProjectionSettings,
}

impl<S: ContentSource> Projector<S> {
    pub fn new(source: S, settings: ProjectionSettings) -> Self {
        Self { source, settings }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Projects the current state of a document
    #[tracing::instrument(skip(self, conn), err)]
    pub async fn project_document(
        &self,
        conn: &mut cache::Connection,
        id: i64,
    ) -> Result<ProjectionOutcome> {
        let document = self
            .source
            .document(id)
            .await
            .map_err(ProjectionError::from_source)?
            .ok_or(ProjectionError::DocumentNotFound(id))?;
        let Some(bundle) = extractor::extract(&self.source, &self.settings, document).await?
        else {
            tracing::debug!("document holds no block, nothing to project");
            return Ok(ProjectionOutcome::Skipped);
        };
        writer::write(conn, &bundle).await?;
        Ok(ProjectionOutcome::Projected {
            nb_blocks: bundle.blocks.len(),
        })
    }

    /// Runs the handler of `event` to completion
    ///
    /// Returns the events the handler asks to process next.
    #[tracing::instrument(skip(self, conn), err)]
    pub async fn handle(
        &self,
        conn: &mut cache::Connection,
        event: ContentEvent,
    ) -> Result<Vec<ContentEvent>> {
        match event {
            ContentEvent::DocumentSaved { id, is_update } => {
                let outcome = self.project_document(conn, id).await?;
                tracing::info!(id, is_update, ?outcome, "document saved");
                Ok(vec![])
            }
            ContentEvent::DocumentDeleted { id } => {
                let report = deletion::delete_document(conn, id).await?;
                tracing::info!(id, ?report, "document deleted");
                Ok(vec![])
            }
            ContentEvent::ApplicationReady => {
                let report = self.sweep(conn).await?;
                tracing::info!(
                    nb_projected = report.projected.len(),
                    nb_skipped = report.skipped.len(),
                    nb_failed = report.failed.len(),
                    "reconciliation sweep done"
                );
                Ok(vec![ContentEvent::ReferencesChanged])
            }
            ContentEvent::ReferencesChanged => {
                let report = self.sync_references(conn).await?;
                tracing::info!(?report, "references synchronized");
                Ok(vec![])
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use cache::MemoryStore;
    use cms_models::MockContentSource;
    use cms_models::mock;
    use pretty_assertions::assert_eq;

    use super::*;

    pub(crate) const SAMPLE_BODY: &str = concat!(
        "<!-- wp:paragraph {\"purpleId\":\"a1\"} -->\n<p>Hello <em>world</em></p>\n<!-- /wp:paragraph -->\n\n",
        "<p>stray markup</p>",
    );

    pub(crate) async fn memory_connection(store: &MemoryStore) -> cache::Connection {
        cache::Client::new_memory(store.clone())
            .get_connection()
            .await
            .unwrap()
    }

    pub(crate) fn projector(source: MockContentSource) -> Projector<MockContentSource> {
        Projector::new(source, ProjectionSettings::default())
    }

    #[tokio::test]
    async fn document_without_blocks_is_skipped() {
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;
        let projector =
            projector(MockContentSource::new().with_document(mock::document(5, "<p>classic</p>")));

        let outcome = projector.project_document(&mut conn, 5).await.unwrap();

        assert_eq!(outcome, ProjectionOutcome::Skipped);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn unknown_document_is_reported() {
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        let error = projector(MockContentSource::new())
            .project_document(&mut conn, 404)
            .await
            .unwrap_err();

        assert!(matches!(error, ProjectionError::DocumentNotFound(404)));
    }

    #[tokio::test]
    async fn saved_event_projects_the_document() {
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;
        let projector =
            projector(MockContentSource::new().with_document(mock::document(42, SAMPLE_BODY)));

        let follow_ups = projector
            .handle(
                &mut conn,
                ContentEvent::DocumentSaved {
                    id: 42,
                    is_update: false,
                },
            )
            .await
            .unwrap();

        assert!(follow_ups.is_empty());
        assert_eq!(
            store.hash("post:42").and_then(|post| post.get("postId").cloned()),
            Some("42".to_owned())
        );
        assert!(store.contains("block:a1"));
    }

    #[tokio::test]
    async fn application_ready_requests_a_reference_sync() {
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;
        let projector = projector(MockContentSource::new());

        let follow_ups = projector
            .handle(&mut conn, ContentEvent::ApplicationReady)
            .await
            .unwrap();

        assert_eq!(follow_ups, vec![ContentEvent::ReferencesChanged]);
    }
}
