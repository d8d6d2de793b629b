//! Decomposition of a document into the parts projected in the store

use cms_models::Block;
use cms_models::ContentSource;
use cms_models::Document;
use cms_models::Metadata;
use cms_models::Term;
use cms_models::TermKind;
use cms_models::block::strip_tags;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::ARTICLE_OPTIONS_META_KEY;
use super::ARTICLES_META_KEY;
use super::ISSUES_META_KEY;
use super::ProjectionSettings;
use crate::error::ProjectionError;
use crate::error::Result;

/// Attribute receiving the plain text of a block
const TEXT_CONTENT_ATTRIBUTE: &str = "content";

/// A retained block along with its stable identifier
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedBlock {
    pub id: String,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomField {
    pub field: String,
    pub value: String,
}

/// An article of an issue, as referenced by the issue document
///
/// Only the id is stored, under `purpleIssueArticles:{id}`. Permalink, author and options are
/// resolved for the logs of the extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedArticle {
    pub id: i64,
    pub permalink: String,
    pub author_name: Option<String>,
    /// Display options, kept raw when they are not JSON
    pub options: Option<Value>,
}

/// Everything projected for one document
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionBundle {
    pub document: Document,
    /// First resolvable issue the document belongs to
    pub purple_issue: Option<i64>,
    pub blocks: Vec<ProjectedBlock>,
    pub categories: Vec<Term>,
    pub tags: Vec<Term>,
    pub custom_fields: Vec<CustomField>,
    pub articles: Vec<RelatedArticle>,
}

impl ProjectionBundle {
    pub fn block_ids(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|projected| projected.id.as_str())
    }

    pub fn terms(&self, kind: TermKind) -> &[Term] {
        match kind {
            TermKind::Category => &self.categories,
            TermKind::Tag => &self.tags,
        }
    }
}

fn block_id(block: &Block, attribute: &str) -> Option<String> {
    match block.attrs.get(attribute)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Keeps the named blocks carrying an identifier and attaches their plain text
pub fn retain_blocks(blocks: Vec<Block>, id_attribute: &str) -> Vec<ProjectedBlock> {
    blocks
        .into_iter()
        .filter(|block| block.name().is_some())
        .filter_map(|mut block| {
            let Some(id) = block_id(&block, id_attribute) else {
                tracing::warn!(
                    block_name = ?block.block_name,
                    attribute = id_attribute,
                    "dropping a block without identifier"
                );
                return None;
            };
            let text = strip_tags(&block.inner_html);
            block
                .attrs
                .insert(TEXT_CONTENT_ATTRIBUTE.to_owned(), Value::String(text));
            Some(ProjectedBlock { id, block })
        })
        .collect()
}

pub fn custom_fields(metadata: &Metadata, prefix: &str) -> Vec<CustomField> {
    metadata
        .with_prefix(prefix)
        .map(|(field, value)| CustomField {
            field: field.to_owned(),
            value: value.to_owned(),
        })
        .collect()
}

/// Public address of a document
pub fn permalink(site_url: &Url, document: &Document) -> String {
    let base = site_url.as_str().trim_end_matches('/');
    if document.name.is_empty() {
        format!("{base}/?p={}", document.id)
    } else {
        format!("{base}/{}/", document.name)
    }
}

#[tracing::instrument(skip_all, fields(%document_id))]
async fn resolve_issue<S: ContentSource>(
    source: &S,
    document_id: i64,
    metadata: &Metadata,
) -> Result<Option<i64>> {
    for issue_id in metadata.id_list(ISSUES_META_KEY) {
        match source
            .document(issue_id)
            .await
            .map_err(ProjectionError::from_source)?
        {
            Some(issue) => return Ok(Some(issue.id)),
            None => tracing::debug!(issue_id, "referenced issue does not exist"),
        }
    }
    Ok(None)
}

#[tracing::instrument(skip_all, fields(%document_id))]
async fn resolve_articles<S: ContentSource>(
    source: &S,
    site_url: &Url,
    document_id: i64,
    metadata: &Metadata,
) -> Result<Vec<RelatedArticle>> {
    let mut articles = Vec::new();
    for article_id in metadata.id_list(ARTICLES_META_KEY) {
        let Some(article) = source
            .document(article_id)
            .await
            .map_err(ProjectionError::from_source)?
        else {
            tracing::debug!(article_id, "referenced article does not exist");
            continue;
        };
        let author_name = source
            .user(article.author)
            .await
            .map_err(ProjectionError::from_source)?
            .map(|author| author.display_name);
        let options = source
            .metadata(article.id)
            .await
            .map_err(ProjectionError::from_source)?
            .first(ARTICLE_OPTIONS_META_KEY)
            .map(|raw| {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
            });
        let related = RelatedArticle {
            id: article.id,
            permalink: permalink(site_url, &article),
            author_name,
            options,
        };
        tracing::debug!(
            article_id = related.id,
            permalink = %related.permalink,
            author_name = ?related.author_name,
            options = ?related.options,
            "related article resolved"
        );
        articles.push(related);
    }
    Ok(articles)
}

/// Decomposes `document`, `None` when its body holds no structured block
#[tracing::instrument(skip_all, fields(document_id = document.id), err)]
pub async fn extract<S: ContentSource>(
    source: &S,
    settings: &ProjectionSettings,
    document: Document,
) -> Result<Option<ProjectionBundle>> {
    if !document.has_blocks() {
        return Ok(None);
    }
    let blocks = retain_blocks(document.blocks(), &settings.block_id_attribute);
    let metadata = source
        .metadata(document.id)
        .await
        .map_err(ProjectionError::from_source)?;
    let purple_issue = resolve_issue(source, document.id, &metadata).await?;
    let articles = resolve_articles(source, &settings.site_url, document.id, &metadata).await?;
    let categories = source
        .document_terms(document.id, TermKind::Category)
        .await
        .map_err(ProjectionError::from_source)?;
    let tags = source
        .document_terms(document.id, TermKind::Tag)
        .await
        .map_err(ProjectionError::from_source)?;
    let custom_fields = custom_fields(&metadata, &settings.custom_field_prefix);
    tracing::debug!(
        nb_blocks = blocks.len(),
        nb_categories = categories.len(),
        nb_tags = tags.len(),
        nb_custom_fields = custom_fields.len(),
        nb_articles = articles.len(),
        "document decomposed"
    );
    Ok(Some(ProjectionBundle {
        document,
        purple_issue,
        blocks,
        categories,
        tags,
        custom_fields,
        articles,
    }))
}
