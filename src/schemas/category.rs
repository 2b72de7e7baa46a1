use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Category;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CategoryWrite {
    #[validate(length(min = 1, max = 100, message = "nama must be 1-100 characters"))]
    pub(crate) nama: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryResponse {
    pub(crate) id: String,
    pub(crate) nama: String,
    pub(crate) user_id: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CategoryResponse {
    pub(crate) fn from_db(category: Category) -> Self {
        Self {
            id: category.id,
            nama: category.nama,
            user_id: category.user_id,
            created_at: format_primitive(category.created_at),
            updated_at: format_primitive(category.updated_at),
        }
    }
}
