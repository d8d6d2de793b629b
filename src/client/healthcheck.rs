use std::sync::Arc;

use anyhow::anyhow;
use cache::Connection;
use database::DbConnectionPool;
use database::ping_database;

pub async fn healthcheck_cmd(
    db_pool: Arc<DbConnectionPool>,
    conn: &mut Connection,
) -> anyhow::Result<()> {
    conn.ping()
        .await
        .map_err(|e| anyhow!("store healthcheck failed: {e}"))?;
    let mut db_conn = db_pool.get().await?;
    ping_database(&mut db_conn)
        .await
        .map_err(|e| anyhow!("content store healthcheck failed: {e}"))?;

    tracing::info!("✅ Healthcheck passed");
    Ok(())
}
