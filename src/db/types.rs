use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Teacher,
    Peserta,
}

/// Stored and serialised verbatim as `Buka` / `Tutup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "jadwalstatus")]
pub(crate) enum JadwalStatus {
    Buka,
    Tutup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "accessmode", rename_all = "lowercase")]
pub(crate) enum AccessMode {
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "registrationstatus", rename_all = "lowercase")]
pub(crate) enum RegistrationStatus {
    Menunggu,
    Disetujui,
    Ditolak,
}

impl RegistrationStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RegistrationStatus::Menunggu => "menunggu",
            RegistrationStatus::Disetujui => "disetujui",
            RegistrationStatus::Ditolak => "ditolak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "caradaftar", rename_all = "lowercase")]
pub(crate) enum RegistrationMethod {
    Mandiri,
    Teacher,
}

impl RegistrationMethod {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            RegistrationMethod::Mandiri => "mandiri",
            RegistrationMethod::Teacher => "teacher",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "jenissoal", rename_all = "snake_case")]
pub(crate) enum QuestionKind {
    PilihanGanda,
    MultiChoice,
    Essay,
    Skala,
}

/// Lifecycle of one participant's attempt at a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "statustes", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    SedangMengerjakan,
    Terputus,
    Selesai,
}

impl AttemptStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::SedangMengerjakan => "sedang_mengerjakan",
            AttemptStatus::Terputus => "terputus",
            AttemptStatus::Selesai => "selesai",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "statuskoreksi", rename_all = "lowercase")]
pub(crate) enum CorrectionStatus {
    Draft,
    Submitted,
}

impl QuestionKind {
    pub(crate) fn is_objective(self) -> bool {
        matches!(self, QuestionKind::PilihanGanda | QuestionKind::MultiChoice)
    }
}
