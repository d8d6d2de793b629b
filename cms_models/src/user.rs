use database::tables::users;
use diesel::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i64,
    #[diesel(column_name = user_login)]
    pub login: String,
    pub display_name: String,
    #[diesel(column_name = user_email)]
    pub email: String,
}
