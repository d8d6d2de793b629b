mod parser;

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

pub use parser::parse_blocks;

/// Opening sequence shared by every block delimiter
const BLOCK_DELIMITER: &str = "<!-- wp:";

/// A node of the block tree stored in a document body
///
/// Serializes to the shape editors and renderers expect: `blockName`, `attrs`, `innerBlocks`,
/// `innerHTML` and `innerContent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Absent for freeform fragments found between structured blocks
    pub block_name: Option<String>,
    pub attrs: Map<String, Value>,
    pub inner_blocks: Vec<Block>,
    #[serde(rename = "innerHTML")]
    pub inner_html: String,
    /// Markup chunks, `None` marking where an inner block sits
    pub inner_content: Vec<Option<String>>,
}

impl Block {
    pub(crate) fn freeform(html: &str) -> Self {
        Self {
            inner_html: html.to_owned(),
            inner_content: vec![Some(html.to_owned())],
            ..Default::default()
        }
    }

    /// The block name, unless the block is freeform
    pub fn name(&self) -> Option<&str> {
        self.block_name.as_deref().filter(|name| !name.is_empty())
    }

    /// First markup chunk, empty when the block starts with an inner block
    pub fn leading_content(&self) -> &str {
        self.inner_content
            .first()
            .and_then(Option::as_deref)
            .unwrap_or_default()
    }
}

/// Whether `content` holds at least one structured block
pub fn has_blocks(content: &str) -> bool {
    content.contains(BLOCK_DELIMITER)
}

/// Removes every tag from `html`, along with the contents of `<script>` and `<style>` elements
pub fn strip_tags(html: &str) -> String {
    static EMBEDDED: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>").unwrap()
    });
    static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").unwrap());
    let html = EMBEDDED.replace_all(html, "");
    TAG.replace_all(&html, "").trim().to_owned()
}
