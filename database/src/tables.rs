//! Tables of the content store, named after the unprefixed WordPress schema
//!
//! Only the columns read by the projection are declared.

diesel::table! {
    posts (id) {
        id -> Int8,
        post_author -> Int8,
        post_title -> Text,
        post_status -> Varchar,
        post_parent -> Int8,
        comment_status -> Varchar,
        post_name -> Varchar,
        post_modified -> Timestamp,
        post_modified_gmt -> Timestamp,
        guid -> Varchar,
        post_type -> Varchar,
        post_content -> Text,
    }
}

diesel::table! {
    postmeta (meta_id) {
        meta_id -> Int8,
        post_id -> Int8,
        meta_key -> Nullable<Varchar>,
        meta_value -> Nullable<Text>,
    }
}

diesel::table! {
    terms (term_id) {
        term_id -> Int8,
        name -> Varchar,
        slug -> Varchar,
    }
}

diesel::table! {
    term_taxonomy (term_taxonomy_id) {
        term_taxonomy_id -> Int8,
        term_id -> Int8,
        taxonomy -> Varchar,
    }
}

diesel::table! {
    term_relationships (object_id, term_taxonomy_id) {
        object_id -> Int8,
        term_taxonomy_id -> Int8,
    }
}

diesel::table! {
    users (id) {
        id -> Int8,
        user_login -> Varchar,
        user_email -> Varchar,
        display_name -> Varchar,
    }
}

diesel::joinable!(postmeta -> posts (post_id));
diesel::joinable!(term_taxonomy -> terms (term_id));
diesel::joinable!(term_relationships -> posts (object_id));
diesel::joinable!(term_relationships -> term_taxonomy (term_taxonomy_id));

diesel::allow_tables_to_appear_in_same_query!(
    posts,
    postmeta,
    terms,
    term_taxonomy,
    term_relationships,
    users,
);
