use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::services::profile;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserRegister {
    pub(crate) username: String,
    pub(crate) password: String,
    #[validate(length(min = 1, max = 255, message = "nama must not be empty"))]
    pub(crate) nama: String,
    #[serde(default)]
    #[validate(email(message = "email is not valid"))]
    pub(crate) email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserLogin {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AdminUserCreate {
    pub(crate) username: String,
    pub(crate) password: String,
    #[validate(length(min = 1, max = 255, message = "nama must not be empty"))]
    pub(crate) nama: String,
    #[serde(default)]
    #[validate(email(message = "email is not valid"))]
    pub(crate) email: Option<String>,
    #[serde(default = "default_user_role")]
    pub(crate) role: UserRole,
    #[serde(default = "default_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ProfileUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "nama must not be empty"))]
    pub(crate) nama: Option<String>,
    #[serde(default)]
    #[validate(email(message = "email is not valid"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) alamat: Option<String>,
    #[serde(default)]
    #[serde(alias = "noHp")]
    #[validate(length(max = 20, message = "no_hp is too long"))]
    pub(crate) no_hp: Option<String>,
    #[serde(default)]
    pub(crate) prodi: Option<String>,
    #[serde(default)]
    pub(crate) fakultas: Option<String>,
    #[serde(default)]
    pub(crate) universitas: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "npm is too long"))]
    pub(crate) npm: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) role: UserRole,
    pub(crate) nama: String,
    pub(crate) email: Option<String>,
    pub(crate) alamat: Option<String>,
    pub(crate) no_hp: Option<String>,
    pub(crate) prodi: Option<String>,
    pub(crate) fakultas: Option<String>,
    pub(crate) universitas: Option<String>,
    pub(crate) npm: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) profile_complete: bool,
    pub(crate) missing_fields: Vec<&'static str>,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        let missing_fields = profile::missing_fields(&user);
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            nama: user.nama,
            email: user.email,
            alamat: user.alamat,
            no_hp: user.no_hp,
            prodi: user.prodi,
            fakultas: user.fakultas,
            universitas: user.universitas,
            npm: user.npm,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
            profile_complete: missing_fields.is_empty(),
            missing_fields,
        }
    }
}

fn default_user_role() -> UserRole {
    UserRole::Teacher
}

fn default_true() -> bool {
    true
}
