//! Application of a [ProjectionBundle] to the store
//!
//! Every record is replaced as a whole: the hash is deleted then written again, so writing the
//! same bundle twice leaves the same state and no field of a previous version survives.

use cache::Connection;
use cms_models::Block;
use cms_models::TermKind;
use cms_models::document::TIMESTAMP_FORMAT;
use serde_json::Value;

use super::extractor::ProjectedBlock;
use super::extractor::ProjectionBundle;
use super::keys;
use crate::error::Result;

type Fields = Vec<(String, String)>;

fn document_fields(bundle: &ProjectionBundle) -> Result<Fields> {
    let document = &bundle.document;
    let blocks = bundle
        .blocks
        .iter()
        .map(|projected| &projected.block)
        .collect::<Vec<&Block>>();
    let mut fields = vec![
        ("postId".to_owned(), document.id.to_string()),
        ("author".to_owned(), document.author.to_string()),
        ("post_title".to_owned(), document.title.clone()),
        ("post_status".to_owned(), document.status.clone()),
        ("post_parent".to_owned(), document.parent.to_string()),
        ("comment_status".to_owned(), document.comment_status.clone()),
        ("post_name".to_owned(), document.name.clone()),
        (
            "post_modified".to_owned(),
            document.modified.format(TIMESTAMP_FORMAT).to_string(),
        ),
        (
            "post_modified_gmt".to_owned(),
            document.modified_gmt.format(TIMESTAMP_FORMAT).to_string(),
        ),
        ("guid".to_owned(), document.guid.clone()),
        ("post_type".to_owned(), document.post_type.clone()),
    ];
    if let Some(issue) = bundle.purple_issue {
        fields.push(("purpleIssue".to_owned(), issue.to_string()));
    }
    fields.push(("postContent".to_owned(), serde_json::to_string(&blocks)?));
    Ok(fields)
}

/// Hash of a list, keyed by position
fn positional_fields<T: ToString>(items: impl IntoIterator<Item = T>) -> Fields {
    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| (position.to_string(), item.to_string()))
        .collect()
}

fn term_fields(bundle: &ProjectionBundle, kind: TermKind) -> Result<Fields> {
    bundle
        .terms(kind)
        .iter()
        .map(|term| -> Result<(String, String)> {
            Ok((term.term_id.to_string(), serde_json::to_string(term)?))
        })
        .collect()
}

fn block_fields(block: &Block) -> Fields {
    vec![
        (
            "blockName".to_owned(),
            block.block_name.clone().unwrap_or_default(),
        ),
        ("innerHTML".to_owned(), block.inner_html.clone()),
        ("innerContent".to_owned(), block.leading_content().to_owned()),
    ]
}

/// String attributes are stored as is, any other value as JSON
fn block_attrs_fields(block: &Block) -> Fields {
    block
        .attrs
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(value) => value.clone(),
                other => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect()
}

async fn write_block(conn: &mut Connection, projected: &ProjectedBlock) -> Result<()> {
    conn.replace_hash(&keys::block_key(&projected.id), &block_fields(&projected.block))
        .await?;
    conn.replace_hash(
        &keys::block_attrs_key(&projected.id),
        &block_attrs_fields(&projected.block),
    )
    .await?;
    Ok(())
}

/// Writes every record of the bundle
///
/// Empty lists leave no record behind, except custom fields which are always stored, as `[]`
/// when there is none.
#[tracing::instrument(skip_all, fields(document_id = bundle.document.id), err)]
pub async fn write(conn: &mut Connection, bundle: &ProjectionBundle) -> Result<()> {
    let id = bundle.document.id;
    conn.replace_hash(&keys::document_key(id), &document_fields(bundle)?)
        .await?;
    conn.replace_hash(
        &keys::articles_key(id),
        &positional_fields(bundle.articles.iter().map(|article| article.id)),
    )
    .await?;
    for kind in [TermKind::Category, TermKind::Tag] {
        conn.replace_hash(
            &keys::document_terms_key(kind, id),
            &term_fields(bundle, kind)?,
        )
        .await?;
    }
    conn.replace_hash(&keys::content_key(id), &positional_fields(bundle.block_ids()))
        .await?;
    conn.json_set(&keys::custom_fields_key(id), &bundle.custom_fields)
        .await?;
    for projected in &bundle.blocks {
        write_block(conn, projected).await?;
    }
    tracing::debug!(nb_blocks = bundle.blocks.len(), "document records written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use cache::Entry;
    use cache::MemoryStore;
    use cms_models::ContentSource as _;
    use cms_models::MockContentSource;
    use cms_models::mock;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::projection::ProjectionSettings;
    use crate::projection::extractor::extract;
    use crate::projection::extractor::retain_blocks;
    use crate::projection::tests::SAMPLE_BODY;
    use crate::projection::tests::memory_connection;

    async fn bundle_of(source: &MockContentSource, id: i64) -> ProjectionBundle {
        let document = source.document(id).await.unwrap().unwrap();
        extract(source, &ProjectionSettings::default(), document)
            .await
            .unwrap()
            .unwrap()
    }

    fn hash(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn projects_the_sample_document() {
        let source = MockContentSource::new()
            .with_document(mock::document(42, SAMPLE_BODY))
            .with_document(mock::document(7, ""))
            .with_meta(42, "purple_in_issues", "[7]")
            .with_document_term(42, TermKind::Tag, mock::term(5, "Rust"));
        let bundle = bundle_of(&source, 42).await;
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        write(&mut conn, &bundle).await.unwrap();

        assert_eq!(
            store.keys(),
            vec![
                "block:a1",
                "blockattrs:a1",
                "content:42",
                "custom_fields:42",
                "post:42",
                "tags:42",
            ]
        );
        let post = store.hash("post:42").unwrap();
        assert_eq!(post["postId"], "42");
        assert_eq!(post["post_parent"], "0");
        assert_eq!(post["post_modified"], "2024-05-17 10:30:00");
        assert_eq!(post["purpleIssue"], "7");
        let post_content: serde_json::Value = serde_json::from_str(&post["postContent"]).unwrap();
        assert_eq!(
            post_content,
            json!([{
                "blockName": "core/paragraph",
                "attrs": {"purpleId": "a1", "content": "Hello world"},
                "innerBlocks": [],
                "innerHTML": "\n<p>Hello <em>world</em></p>\n",
                "innerContent": ["\n<p>Hello <em>world</em></p>\n"],
            }])
        );
        assert_eq!(store.hash("content:42"), Some(hash(&[("0", "a1")])));
        assert_eq!(
            store.hash("tags:42"),
            Some(hash(&[("5", r#"{"term_id":5,"name":"Rust","slug":"rust"}"#)]))
        );
        assert_eq!(
            store.hash("block:a1"),
            Some(hash(&[
                ("blockName", "core/paragraph"),
                ("innerHTML", "\n<p>Hello <em>world</em></p>\n"),
                ("innerContent", "\n<p>Hello <em>world</em></p>\n"),
            ]))
        );
        assert_eq!(
            store.hash("blockattrs:a1"),
            Some(hash(&[("content", "Hello world"), ("purpleId", "a1")]))
        );
    }

    #[tokio::test]
    async fn empty_custom_fields_are_stored_as_an_empty_list() {
        let source = MockContentSource::new()
            .with_document(mock::document(42, SAMPLE_BODY))
            .with_meta(42, "unrelated", "x");
        let bundle = bundle_of(&source, 42).await;
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        write(&mut conn, &bundle).await.unwrap();

        assert_eq!(store.value("custom_fields:42"), Some("[]".to_owned()));
    }

    #[tokio::test]
    async fn custom_fields_are_stored_as_json() {
        let source = MockContentSource::new()
            .with_document(mock::document(42, SAMPLE_BODY))
            .with_meta(42, "purple_custom_meta_color", "red")
            .with_meta(42, "unrelated", "x");
        let bundle = bundle_of(&source, 42).await;
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        write(&mut conn, &bundle).await.unwrap();

        assert_eq!(
            store.value("custom_fields:42"),
            Some(r#"[{"field":"color","value":"red"}]"#.to_owned())
        );
    }

    #[tokio::test]
    async fn writing_twice_gives_the_same_state() {
        let source = MockContentSource::new()
            .with_document(mock::document(42, SAMPLE_BODY))
            .with_document_term(42, TermKind::Category, mock::term(3, "News"))
            .with_meta(42, "purple_custom_meta_color", "red");
        let bundle = bundle_of(&source, 42).await;
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        write(&mut conn, &bundle).await.unwrap();
        let first = store.snapshot();
        write(&mut conn, &bundle).await.unwrap();

        assert_eq!(store.snapshot(), first);
    }

    #[tokio::test]
    async fn stale_records_are_replaced() {
        let store = MemoryStore::new();
        store.insert_hash("post:42", [("post_title", "Old"), ("legacy", "field")]);
        store.insert_hash("categories:42", [("3", "{}")]);
        store.insert_hash("content:42", [("0", "old"), ("1", "older")]);
        let source = MockContentSource::new().with_document(mock::document(42, SAMPLE_BODY));
        let bundle = bundle_of(&source, 42).await;
        let mut conn = memory_connection(&store).await;

        write(&mut conn, &bundle).await.unwrap();

        let post = store.hash("post:42").unwrap();
        assert_eq!(post["post_title"], "Document 42");
        assert!(!post.contains_key("legacy"));
        assert!(!post.contains_key("purpleIssue"));
        assert!(!store.contains("categories:42"));
        assert_eq!(store.hash("content:42"), Some(hash(&[("0", "a1")])));
    }

    #[tokio::test]
    async fn documents_without_retained_blocks_have_no_block_records() {
        let body = "<!-- wp:paragraph --><p>no id</p><!-- /wp:paragraph -->";
        let source = MockContentSource::new().with_document(mock::document(3, body));
        let bundle = bundle_of(&source, 3).await;
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        write(&mut conn, &bundle).await.unwrap();

        assert_eq!(store.keys(), vec!["custom_fields:3", "post:3"]);
        assert_eq!(
            store.snapshot().get("custom_fields:3"),
            Some(&Entry::Value("[]".to_owned()))
        );
        assert_eq!(store.hash("post:3").unwrap()["postContent"], "[]");
    }

    #[tokio::test]
    async fn blocks_with_an_empty_name_are_not_projected() {
        let attrs = |id: &str| json!({"purpleId": id}).as_object().unwrap().clone();
        let blocks = vec![
            Block {
                block_name: Some("core/paragraph".to_owned()),
                attrs: attrs("a1"),
                inner_html: "<p>kept</p>".to_owned(),
                inner_content: vec![Some("<p>kept</p>".to_owned())],
                ..Default::default()
            },
            Block {
                block_name: Some(String::new()),
                attrs: attrs("a2"),
                inner_html: "<p>dropped</p>".to_owned(),
                inner_content: vec![Some("<p>dropped</p>".to_owned())],
                ..Default::default()
            },
        ];
        let bundle = ProjectionBundle {
            document: mock::document(42, ""),
            purple_issue: None,
            blocks: retain_blocks(blocks, "purpleId"),
            categories: vec![],
            tags: vec![],
            custom_fields: vec![],
            articles: vec![],
        };
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        write(&mut conn, &bundle).await.unwrap();

        assert_eq!(
            store.keys(),
            vec![
                "block:a1",
                "blockattrs:a1",
                "content:42",
                "custom_fields:42",
                "post:42",
            ]
        );
        assert_eq!(store.hash("content:42"), Some(hash(&[("0", "a1")])));
    }

    #[tokio::test]
    async fn non_string_attributes_are_json_encoded() {
        let body = r#"<!-- wp:image {"purpleId":"i1","width":300,"caption":{"align":"left"}} /-->"#;
        let source = MockContentSource::new().with_document(mock::document(1, body));
        let bundle = bundle_of(&source, 1).await;
        let store = MemoryStore::new();
        let mut conn = memory_connection(&store).await;

        write(&mut conn, &bundle).await.unwrap();

        assert_eq!(
            store.hash("blockattrs:i1"),
            Some(hash(&[
                ("caption", r#"{"align":"left"}"#),
                ("content", ""),
                ("purpleId", "i1"),
                ("width", "300"),
            ]))
        );
        assert_eq!(store.hash("block:i1").unwrap()["innerContent"], "");
    }

    #[tokio::test]
    async fn write_failures_are_reported() {
        let source = MockContentSource::new().with_document(mock::document(42, SAMPLE_BODY));
        let bundle = bundle_of(&source, 42).await;
        let store = MemoryStore::new();
        store.reject_writes_to("content:42");
        let mut conn = memory_connection(&store).await;

        let error = write(&mut conn, &bundle).await.unwrap_err();

        assert!(matches!(error, crate::error::ProjectionError::Write(_)));
    }
}
