use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::Jadwal;
use crate::db::types::{AccessMode, JadwalStatus, RegistrationStatus};
use crate::repositories::jadwal::JadwalSummaryRow;
use crate::schemas::datetime::{
    deserialize_flexible, deserialize_nullable, deserialize_nullable_flexible,
    deserialize_option_flexible,
};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct JadwalCreate {
    #[serde(alias = "namaJadwal")]
    #[validate(length(min = 1, max = 255, message = "nama_jadwal must be 1-255 characters"))]
    pub(crate) nama_jadwal: String,
    #[serde(alias = "tanggalMulai", deserialize_with = "deserialize_flexible")]
    pub(crate) tanggal_mulai: OffsetDateTime,
    #[serde(alias = "tanggalBerakhir", deserialize_with = "deserialize_flexible")]
    pub(crate) tanggal_berakhir: OffsetDateTime,
    #[serde(default, alias = "waktuMulaiTes", deserialize_with = "deserialize_option_flexible")]
    pub(crate) waktu_mulai_tes: Option<OffsetDateTime>,
    #[serde(default = "default_true", alias = "autoClose")]
    pub(crate) auto_close: bool,
    #[validate(range(min = 1, max = 1440, message = "durasi must be between 1 and 1440 minutes"))]
    pub(crate) durasi: i32,
    #[serde(default, alias = "idJadwalSebelumnya")]
    pub(crate) id_jadwal_sebelumnya: Option<String>,
    #[serde(default, alias = "kategoriTesId")]
    pub(crate) kategori_tes_id: Option<String>,
    #[serde(default = "default_access_mode", alias = "accessMode")]
    pub(crate) access_mode: AccessMode,
    #[serde(default, alias = "isShuffled")]
    pub(crate) is_shuffled: bool,
}

/// Partial update. Nullable columns use `Some(None)` for an explicit clear.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct JadwalUpdate {
    #[serde(default, alias = "namaJadwal")]
    #[validate(length(min = 1, max = 255, message = "nama_jadwal must be 1-255 characters"))]
    pub(crate) nama_jadwal: Option<String>,
    #[serde(default, alias = "tanggalMulai", deserialize_with = "deserialize_option_flexible")]
    pub(crate) tanggal_mulai: Option<OffsetDateTime>,
    #[serde(default, alias = "tanggalBerakhir", deserialize_with = "deserialize_option_flexible")]
    pub(crate) tanggal_berakhir: Option<OffsetDateTime>,
    #[serde(default, alias = "waktuMulaiTes", deserialize_with = "deserialize_nullable_flexible")]
    pub(crate) waktu_mulai_tes: Option<Option<OffsetDateTime>>,
    #[serde(default, alias = "autoClose")]
    pub(crate) auto_close: Option<bool>,
    #[serde(default)]
    #[validate(range(min = 1, max = 1440, message = "durasi must be between 1 and 1440 minutes"))]
    pub(crate) durasi: Option<i32>,
    #[serde(default, alias = "idJadwalSebelumnya", deserialize_with = "deserialize_nullable")]
    pub(crate) id_jadwal_sebelumnya: Option<Option<String>>,
    #[serde(default, alias = "kategoriTesId", deserialize_with = "deserialize_nullable")]
    pub(crate) kategori_tes_id: Option<Option<String>>,
    #[serde(default, alias = "accessMode")]
    pub(crate) access_mode: Option<AccessMode>,
    #[serde(default, alias = "isShuffled")]
    pub(crate) is_shuffled: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct JadwalBulkDestroy {
    #[validate(length(min = 1, max = 200, message = "ids must contain 1-200 entries"))]
    pub(crate) ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JadwalResponse {
    pub(crate) id: String,
    pub(crate) kode_jadwal: String,
    pub(crate) nama_jadwal: String,
    pub(crate) tanggal_mulai: String,
    pub(crate) tanggal_berakhir: String,
    pub(crate) waktu_mulai_tes: Option<String>,
    pub(crate) status: JadwalStatus,
    pub(crate) auto_close: bool,
    pub(crate) durasi: i32,
    pub(crate) user_id: String,
    pub(crate) id_jadwal_sebelumnya: Option<String>,
    pub(crate) kategori_tes_id: Option<String>,
    pub(crate) access_mode: AccessMode,
    pub(crate) is_shuffled: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl JadwalResponse {
    pub(crate) fn from_db(jadwal: Jadwal) -> Self {
        Self {
            id: jadwal.id,
            kode_jadwal: jadwal.kode_jadwal,
            nama_jadwal: jadwal.nama_jadwal,
            tanggal_mulai: format_primitive(jadwal.tanggal_mulai),
            tanggal_berakhir: format_primitive(jadwal.tanggal_berakhir),
            waktu_mulai_tes: format_optional(jadwal.waktu_mulai_tes),
            status: jadwal.status,
            auto_close: jadwal.auto_close,
            durasi: jadwal.durasi,
            user_id: jadwal.user_id,
            id_jadwal_sebelumnya: jadwal.id_jadwal_sebelumnya,
            kategori_tes_id: jadwal.kategori_tes_id,
            access_mode: jadwal.access_mode,
            is_shuffled: jadwal.is_shuffled,
            created_at: format_primitive(jadwal.created_at),
            updated_at: format_primitive(jadwal.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JadwalSummaryResponse {
    #[serde(flatten)]
    pub(crate) jadwal: JadwalResponse,
    pub(crate) kategori_nama: Option<String>,
    pub(crate) soal_count: i64,
    pub(crate) peserta_count: i64,
    pub(crate) pending_count: i64,
    pub(crate) my_registration_status: Option<RegistrationStatus>,
}

impl JadwalSummaryResponse {
    pub(crate) fn from_row(row: JadwalSummaryRow) -> Self {
        Self {
            jadwal: JadwalResponse::from_db(row.jadwal),
            kategori_nama: row.kategori_nama,
            soal_count: row.soal_count,
            peserta_count: row.peserta_count,
            pending_count: row.pending_count,
            my_registration_status: row.my_registration_status,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_access_mode() -> AccessMode {
    AccessMode::Online
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_distinguishes_absent_from_null() {
        let absent: JadwalUpdate = serde_json::from_value(json!({ "durasi": 30 })).unwrap();
        assert!(absent.waktu_mulai_tes.is_none());
        assert!(absent.id_jadwal_sebelumnya.is_none());

        let cleared: JadwalUpdate = serde_json::from_value(json!({
            "waktu_mulai_tes": null,
            "id_jadwal_sebelumnya": null
        }))
        .unwrap();
        assert_eq!(cleared.waktu_mulai_tes, Some(None));
        assert_eq!(cleared.id_jadwal_sebelumnya, Some(None));
    }

    #[test]
    fn create_defaults_to_online_with_auto_close() {
        let payload: JadwalCreate = serde_json::from_value(json!({
            "nama_jadwal": "UTS Basis Data",
            "tanggal_mulai": "2025-03-01T08:00",
            "tanggal_berakhir": "2025-03-01T10:00",
            "durasi": 90
        }))
        .unwrap();
        assert!(payload.auto_close);
        assert_eq!(payload.access_mode, AccessMode::Online);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn durasi_outside_range_fails_validation() {
        let payload: JadwalCreate = serde_json::from_value(json!({
            "nama_jadwal": "Marathon",
            "tanggal_mulai": "2025-03-01T08:00",
            "tanggal_berakhir": "2025-03-03T08:00",
            "durasi": 1441
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }
}
