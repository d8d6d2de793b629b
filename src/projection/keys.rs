//! Naming of the projected records
//!
//! Every entity type owns a distinct namespace prefix, so keys never collide across types.

use cms_models::TermKind;

pub fn document_key(id: i64) -> String {
    format!("post:{id}")
}

/// Matches every projected document record
pub fn document_key_pattern() -> &'static str {
    "post:*"
}

pub fn block_key(block_id: &str) -> String {
    format!("block:{block_id}")
}

pub fn block_attrs_key(block_id: &str) -> String {
    format!("blockattrs:{block_id}")
}

pub fn categories_key(document_id: i64) -> String {
    format!("categories:{document_id}")
}

pub fn tags_key(document_id: i64) -> String {
    format!("tags:{document_id}")
}

/// Record listing the terms of `kind` a document is classified with
pub fn document_terms_key(kind: TermKind, document_id: i64) -> String {
    match kind {
        TermKind::Category => categories_key(document_id),
        TermKind::Tag => tags_key(document_id),
    }
}

/// Ordered list of the block ids of a document
pub fn content_key(document_id: i64) -> String {
    format!("content:{document_id}")
}

pub fn custom_fields_key(document_id: i64) -> String {
    format!("custom_fields:{document_id}")
}

pub fn articles_key(document_id: i64) -> String {
    format!("purpleIssueArticles:{document_id}")
}

pub fn term_key(kind: TermKind, term_id: i64) -> String {
    match kind {
        TermKind::Category => format!("category:{term_id}"),
        TermKind::Tag => format!("tag:{term_id}"),
    }
}

pub fn user_key(user_id: i64) -> String {
    format!("user:{user_id}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0)]
    #[case(42)]
    #[case(i64::MAX)]
    fn document_key_is_the_post_namespace(#[case] id: i64) {
        assert_eq!(document_key(id), format!("post:{id}"));
    }

    #[test]
    fn namespaces_never_collide() {
        let keys = [
            document_key(1),
            block_key("1"),
            block_attrs_key("1"),
            categories_key(1),
            tags_key(1),
            content_key(1),
            custom_fields_key(1),
            articles_key(1),
            term_key(TermKind::Category, 1),
            term_key(TermKind::Tag, 1),
            user_key(1),
        ];
        let distinct = keys.iter().collect::<HashSet<_>>();
        assert_eq!(distinct.len(), keys.len());
    }

    #[test]
    fn document_terms_keys_follow_the_kind() {
        assert_eq!(document_terms_key(TermKind::Category, 3), "categories:3");
        assert_eq!(document_terms_key(TermKind::Tag, 3), "tags:3");
        assert_eq!(term_key(TermKind::Tag, 3), "tag:3");
    }

    #[test]
    fn pattern_matches_document_keys_only() {
        let prefix = document_key_pattern().trim_end_matches('*');
        assert!(document_key(7).starts_with(prefix));
        assert!(!articles_key(7).starts_with(prefix));
    }
}
