use serde::Deserialize;

use crate::db::types::JadwalStatus;

#[derive(Debug, Deserialize)]
pub(super) struct ListJadwalQuery {
    #[serde(default)]
    pub(super) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(super) limit: i64,
    #[serde(default)]
    pub(super) status: Option<JadwalStatus>,
    #[serde(default)]
    #[serde(alias = "kategoriTesId")]
    pub(super) kategori_tes_id: Option<String>,
    #[serde(default, alias = "q")]
    pub(super) search: Option<String>,
}
