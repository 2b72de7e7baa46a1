use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    AccessMode, AttemptStatus, CorrectionStatus, JadwalStatus, QuestionKind, RegistrationMethod,
    RegistrationStatus, UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
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
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Category {
    pub(crate) id: String,
    pub(crate) nama: String,
    pub(crate) user_id: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Jadwal {
    pub(crate) id: String,
    pub(crate) kode_jadwal: String,
    pub(crate) nama_jadwal: String,
    pub(crate) tanggal_mulai: PrimitiveDateTime,
    pub(crate) tanggal_berakhir: PrimitiveDateTime,
    pub(crate) waktu_mulai_tes: Option<PrimitiveDateTime>,
    pub(crate) status: JadwalStatus,
    pub(crate) auto_close: bool,
    pub(crate) durasi: i32,
    pub(crate) user_id: String,
    pub(crate) id_jadwal_sebelumnya: Option<String>,
    pub(crate) kategori_tes_id: Option<String>,
    pub(crate) access_mode: AccessMode,
    pub(crate) is_shuffled: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Registration {
    pub(crate) id: String,
    pub(crate) id_jadwal: String,
    pub(crate) id_peserta: String,
    pub(crate) status: RegistrationStatus,
    pub(crate) cara_daftar: RegistrationMethod,
    pub(crate) tanggal_daftar: PrimitiveDateTime,
    pub(crate) tanggal_approval: Option<PrimitiveDateTime>,
    pub(crate) approved_by: Option<String>,
    pub(crate) keterangan: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Soal {
    pub(crate) id: String,
    pub(crate) id_jadwal: String,
    pub(crate) urutan: i32,
    pub(crate) jenis_soal: QuestionKind,
    pub(crate) pertanyaan: String,
    pub(crate) opsi: Json<Vec<String>>,
    pub(crate) jawaban_benar: Option<String>,
    pub(crate) skor: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestResult {
    pub(crate) id: String,
    pub(crate) id_user: String,
    pub(crate) id_jadwal: String,
    pub(crate) status_tes: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) deadline_at: PrimitiveDateTime,
    pub(crate) sisa_waktu_detik: Option<i32>,
    pub(crate) alasan_terputus: Option<String>,
    pub(crate) boleh_dilanjutkan: bool,
    pub(crate) diizinkan_oleh: Option<String>,
    pub(crate) diizinkan_lanjut_pada: Option<PrimitiveDateTime>,
    pub(crate) total_skor: f64,
    pub(crate) reason: Option<String>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) status_koreksi: CorrectionStatus,
    pub(crate) dikoreksi_oleh: Option<String>,
    pub(crate) dikoreksi_pada: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) id_user: String,
    pub(crate) id_jadwal: String,
    pub(crate) id_soal: String,
    pub(crate) jawaban: Option<String>,
    pub(crate) skor: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Violation {
    pub(crate) id: String,
    pub(crate) jadwal_id: String,
    pub(crate) peserta_id: String,
    pub(crate) violation_type: String,
    pub(crate) detection_method: Option<String>,
    pub(crate) context: Json<serde_json::Value>,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) violation_time: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
}
