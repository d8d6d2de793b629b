use database::tables::terms;
use diesel::prelude::*;
use serde::Deserialize;
use serde::Serialize;

/// The two taxonomies a document is classified with
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum TermKind {
    Category,
    Tag,
}

impl TermKind {
    /// Name of the taxonomy in the `term_taxonomy` table
    pub fn taxonomy(self) -> &'static str {
        match self {
            TermKind::Category => "category",
            TermKind::Tag => "post_tag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = terms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Term {
    pub term_id: i64,
    pub name: String,
    pub slug: String,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(TermKind::Category, "category", "category")]
    #[case(TermKind::Tag, "tag", "post_tag")]
    fn kind_names(#[case] kind: TermKind, #[case] name: &str, #[case] taxonomy: &str) {
        assert_eq!(kind.to_string(), name);
        assert_eq!(TermKind::from_str(name).unwrap(), kind);
        assert_eq!(kind.taxonomy(), taxonomy);
    }
}
