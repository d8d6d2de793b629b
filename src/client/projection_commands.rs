use anyhow::bail;
use cache::Connection;
use clap::Args;
use cms_models::ContentSource;
use colored::Colorize as _;
use itertools::Itertools as _;

use crate::projection::ProjectionOutcome;
use crate::projection::Projector;
use crate::projection::deletion;

#[derive(Args, Debug)]
pub struct DocumentArgs {
    /// Id of the document
    pub id: i64,
}

pub async fn project<S: ContentSource>(
    DocumentArgs { id }: DocumentArgs,
    projector: &Projector<S>,
    conn: &mut Connection,
) -> anyhow::Result<()> {
    match projector.project_document(conn, id).await? {
        ProjectionOutcome::Projected { nb_blocks } => println!(
            "✅ Document {} projected with {nb_blocks} blocks",
            id.to_string().bold()
        ),
        ProjectionOutcome::Skipped => println!(
            "{}",
            format!("Document {id} holds no block, nothing was projected").yellow()
        ),
    }
    Ok(())
}

pub async fn delete(
    DocumentArgs { id }: DocumentArgs,
    conn: &mut Connection,
) -> anyhow::Result<()> {
    let report = deletion::delete_document(conn, id).await?;
    if !report.document_removed {
        println!("{}", format!("Document {id} had no record").yellow());
    }
    for key in &report.removed_children {
        println!("🗑️ {key} removed");
    }
    println!("✅ Document {} deleted", id.to_string().bold());
    Ok(())
}

pub async fn sweep<S: ContentSource>(
    projector: &Projector<S>,
    conn: &mut Connection,
) -> anyhow::Result<()> {
    let report = projector.sweep(conn).await?;
    for (id, reason) in &report.failed {
        println!("❌ Document {}: {}", id.to_string().bold(), reason.red());
    }
    println!(
        "✅ {} documents projected, {} without block",
        report.projected.len().to_string().bold(),
        report.skipped.len()
    );
    if !report.failed.is_empty() {
        let failed_ids = report.failed.iter().map(|(id, _)| id).join(", ");
        bail!("documents {failed_ids} could not be projected");
    }
    Ok(())
}

pub async fn sync_references<S: ContentSource>(
    projector: &Projector<S>,
    conn: &mut Connection,
) -> anyhow::Result<()> {
    let report = projector.sync_references(conn).await?;
    println!(
        "✅ {} users, {} categories and {} tags synchronized",
        report.users.to_string().bold(),
        report.categories.to_string().bold(),
        report.tags.to_string().bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use cache::MemoryStore;
    use cms_models::MockContentSource;
    use cms_models::mock;

    use super::*;
    use crate::projection::tests::SAMPLE_BODY;
    use crate::projection::tests::memory_connection;
    use crate::projection::tests::projector;

    #[tokio::test]
    async fn project_then_delete() {
        let projector =
            projector(MockContentSource::new().with_document(mock::document(3, SAMPLE_BODY)));
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        project(DocumentArgs { id: 3 }, &projector, &mut conn)
            .await
            .unwrap();
        assert!(store.contains("post:3"));

        delete(DocumentArgs { id: 3 }, &mut conn).await.unwrap();
        assert!(!store.contains("post:3"));
    }

    #[tokio::test]
    async fn projecting_an_unknown_document_fails() {
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        let result = project(
            DocumentArgs { id: 12 },
            &projector(MockContentSource::new()),
            &mut conn,
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn sweep_reports_failed_documents() {
        let projector =
            projector(MockContentSource::new().with_document(mock::document(3, SAMPLE_BODY)));
        let store = MemoryStore::new();
        store.reject_writes_to("post:3");
        let mut conn = memory_connection(&store).await;

        assert!(sweep(&projector, &mut conn).await.is_err());
    }
}
