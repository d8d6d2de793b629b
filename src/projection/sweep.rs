use cms_models::ContentSource;

use super::ProjectionOutcome;
use super::Projector;
use crate::error::ProjectionError;
use crate::error::Result;

/// Outcome of a full re-projection
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub projected: Vec<i64>,
    /// Documents without structured block
    pub skipped: Vec<i64>,
    /// Documents whose projection failed, with the reason
    pub failed: Vec<(i64, String)>,
}

impl<S: ContentSource> Projector<S> {
    /// Projects every document again, one after the other
    ///
    /// A failing document does not stop the sweep: it is logged and reported. Only a failure
    /// to list the documents aborts it.
    #[tracing::instrument(skip_all, err)]
    pub async fn sweep(&self, conn: &mut cache::Connection) -> Result<SweepReport> {
        let ids = self
            .source()
            .document_ids()
            .await
            .map_err(ProjectionError::from_source)?;
        tracing::info!(nb_documents = ids.len(), "starting reconciliation sweep");
        let mut report = SweepReport::default();
        for id in ids {
            match self.project_document(conn, id).await {
                Ok(ProjectionOutcome::Projected { .. }) => report.projected.push(id),
                Ok(ProjectionOutcome::Skipped) => report.skipped.push(id),
                Err(error) => {
                    tracing::error!(id, %error, "document projection failed, moving on");
                    report.failed.push((id, error.to_string()));
                }
            }
        }
        Ok(report)
    }
}
