use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::Registration;
use crate::db::types::{AttemptStatus, RegistrationMethod, RegistrationStatus};
use crate::repositories::registrations::{PesertaRegistrationRow, RegistrationRow};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TeacherRegister {
    #[serde(alias = "pesertaIds")]
    #[validate(length(min = 1, max = 500, message = "peserta_ids must contain 1-500 entries"))]
    pub(crate) peserta_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct RejectRequest {
    #[serde(default)]
    #[validate(length(max = 1000, message = "keterangan is too long"))]
    pub(crate) keterangan: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct BulkRegistrationAction {
    #[validate(length(min = 1, max = 500, message = "ids must contain 1-500 entries"))]
    pub(crate) ids: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "keterangan is too long"))]
    pub(crate) keterangan: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationResponse {
    pub(crate) id: String,
    pub(crate) id_jadwal: String,
    pub(crate) id_peserta: String,
    pub(crate) status: RegistrationStatus,
    pub(crate) cara_daftar: RegistrationMethod,
    pub(crate) tanggal_daftar: String,
    pub(crate) tanggal_approval: Option<String>,
    pub(crate) approved_by: Option<String>,
    pub(crate) keterangan: Option<String>,
}

impl RegistrationResponse {
    pub(crate) fn from_db(registration: Registration) -> Self {
        Self {
            id: registration.id,
            id_jadwal: registration.id_jadwal,
            id_peserta: registration.id_peserta,
            status: registration.status,
            cara_daftar: registration.cara_daftar,
            tanggal_daftar: format_primitive(registration.tanggal_daftar),
            tanggal_approval: format_optional(registration.tanggal_approval),
            approved_by: registration.approved_by,
            keterangan: registration.keterangan,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RegistrationListItem {
    #[serde(flatten)]
    pub(crate) registration: RegistrationResponse,
    pub(crate) peserta_nama: String,
    pub(crate) peserta_username: String,
    pub(crate) peserta_npm: Option<String>,
    /// Attempt state, `None` before the participant entered.
    pub(crate) status_tes: Option<AttemptStatus>,
}

impl RegistrationListItem {
    pub(crate) fn from_row(row: RegistrationRow) -> Self {
        Self {
            registration: RegistrationResponse::from_db(row.registration),
            peserta_nama: row.peserta_nama,
            peserta_username: row.peserta_username,
            peserta_npm: row.peserta_npm,
            status_tes: row.status_tes,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MyRegistrationItem {
    #[serde(flatten)]
    pub(crate) registration: RegistrationResponse,
    pub(crate) nama_jadwal: String,
    pub(crate) kode_jadwal: String,
    pub(crate) tanggal_mulai: String,
    pub(crate) tanggal_berakhir: String,
}

impl MyRegistrationItem {
    pub(crate) fn from_row(row: PesertaRegistrationRow) -> Self {
        Self {
            registration: RegistrationResponse::from_db(row.registration),
            nama_jadwal: row.nama_jadwal,
            kode_jadwal: row.kode_jadwal,
            tanggal_mulai: format_primitive(row.tanggal_mulai),
            tanggal_berakhir: format_primitive(row.tanggal_berakhir),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResumePermission {
    pub(crate) id_peserta: String,
    pub(crate) diizinkan_lanjut_pada: String,
    pub(crate) message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct BulkRegisterEntry {
    pub(crate) peserta_id: String,
    pub(crate) reason: String,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct BulkRegisterResponse {
    pub(crate) success_count: u64,
    pub(crate) skipped: Vec<BulkRegisterEntry>,
    pub(crate) failed: Vec<BulkRegisterEntry>,
    pub(crate) message: String,
}

impl BulkRegisterResponse {
    pub(crate) fn summarize(mut self) -> Self {
        self.message = format!(
            "{} peserta berhasil didaftarkan, {} dilewati, {} gagal",
            self.success_count,
            self.skipped.len(),
            self.failed.len()
        );
        self
    }
}

/// Keeps the first occurrence of each id and drops blanks.
pub(crate) fn dedupe_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}
