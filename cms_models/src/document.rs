use chrono::NaiveDateTime;
use database::tables::posts;
use diesel::prelude::*;

use crate::block;
use crate::block::Block;

/// Rendering of timestamps in projected records, the store's native `DATETIME` layout
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A content document as stored by the CMS
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Document {
    pub id: i64,
    #[diesel(column_name = post_author)]
    pub author: i64,
    #[diesel(column_name = post_title)]
    pub title: String,
    #[diesel(column_name = post_status)]
    pub status: String,
    #[diesel(column_name = post_parent)]
    pub parent: i64,
    pub comment_status: String,
    /// Slug of the document, empty for drafts which were never published
    #[diesel(column_name = post_name)]
    pub name: String,
    #[diesel(column_name = post_modified)]
    pub modified: NaiveDateTime,
    #[diesel(column_name = post_modified_gmt)]
    pub modified_gmt: NaiveDateTime,
    pub guid: String,
    pub post_type: String,
    /// Raw serialized block markup
    #[diesel(column_name = post_content)]
    pub content: String,
}

impl Document {
    pub fn has_blocks(&self) -> bool {
        block::has_blocks(&self.content)
    }

    pub fn blocks(&self) -> Vec<Block> {
        block::parse_blocks(&self.content)
    }
}
