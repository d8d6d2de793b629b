use cache::Connection;

use super::keys;
use crate::error::Result;

/// Records removed after a document deletion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Whether the document had a record
    pub document_removed: bool,
    /// Keys of the removed records of direct children
    pub removed_children: Vec<String>,
}

/// Removes the record of one document
#[tracing::instrument(skip(conn), err)]
pub async fn delete_one(conn: &mut Connection, id: i64) -> Result<bool> {
    Ok(conn.delete(&keys::document_key(id)).await?)
}

/// Removes the records of the direct children of `parent_id`
///
/// Every document record is scanned and compared on its `post_parent` field. Grandchildren
/// are left untouched.
#[tracing::instrument(skip(conn), err)]
pub async fn delete_children(conn: &mut Connection, parent_id: i64) -> Result<Vec<String>> {
    let parent = parent_id.to_string();
    let mut removed = Vec::new();
    for key in conn.scan_keys(keys::document_key_pattern()).await? {
        let record_parent = conn.hash_field(&key, "post_parent").await?;
        if record_parent.as_deref() == Some(parent.as_str()) && conn.delete(&key).await? {
            removed.push(key);
        }
    }
    Ok(removed)
}

/// Removes the record of a document and of its direct children
///
/// Block, attribute and taxonomy records are not removed.
#[tracing::instrument(skip(conn), err)]
pub async fn delete_document(conn: &mut Connection, id: i64) -> Result<DeletionReport> {
    let document_removed = delete_one(conn, id).await?;
    let removed_children = delete_children(conn, id).await?;
    tracing::debug!("block and taxonomy records are left in place");
    Ok(DeletionReport {
        document_removed,
        removed_children,
    })
}

#[cfg(test)]
mod tests {
    use cache::MemoryStore;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::projection::tests::memory_connection;

    fn store_with_family() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_hash("post:7", [("postId", "7"), ("post_parent", "0")]);
        store.insert_hash("post:9", [("postId", "9"), ("post_parent", "7")]);
        store.insert_hash("post:10", [("postId", "10"), ("post_parent", "9")]);
        store.insert_hash("post:70", [("postId", "70"), ("post_parent", "70")]);
        store.insert_hash("block:b9", [("blockName", "core/paragraph")]);
        store.insert_hash("blockattrs:b9", [("purpleId", "b9")]);
        store.insert_hash("tags:9", [("1", "{}")]);
        store
    }

    #[tokio::test]
    async fn deletes_the_document_and_its_direct_children() {
        let store = store_with_family();
        let mut conn = memory_connection(&store).await;

        let report = delete_document(&mut conn, 7).await.unwrap();

        assert_eq!(
            report,
            DeletionReport {
                document_removed: true,
                removed_children: vec!["post:9".to_owned()],
            }
        );
        assert_eq!(
            store.keys(),
            vec!["block:b9", "blockattrs:b9", "post:10", "post:70", "tags:9"]
        );
    }

    #[tokio::test]
    async fn deleting_an_unknown_document_is_not_an_error() {
        let store = store_with_family();
        let mut conn = memory_connection(&store).await;

        let report = delete_document(&mut conn, 404).await.unwrap();

        assert_eq!(report, DeletionReport::default());
        assert_eq!(store.keys().len(), 7);
    }

    #[tokio::test]
    async fn delete_children_keeps_the_parent_record() {
        let store = store_with_family();
        let mut conn = memory_connection(&store).await;

        let removed = delete_children(&mut conn, 9).await.unwrap();

        assert_eq!(removed, vec!["post:10".to_owned()]);
        assert!(store.contains("post:9"));
    }

    #[tokio::test]
    async fn delete_one_leaves_children() {
        let store = store_with_family();
        let mut conn = memory_connection(&store).await;

        assert!(delete_one(&mut conn, 7).await.unwrap());
        assert!(!delete_one(&mut conn, 7).await.unwrap());
        assert!(store.contains("post:9"));
    }
}
