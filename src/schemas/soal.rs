use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Soal;
use crate::db::types::QuestionKind;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SoalCreate {
    #[serde(alias = "jenisSoal")]
    pub(crate) jenis_soal: QuestionKind,
    #[validate(length(min = 1, message = "pertanyaan must not be empty"))]
    pub(crate) pertanyaan: String,
    #[serde(default)]
    pub(crate) opsi: Vec<String>,
    #[serde(default, alias = "jawabanBenar")]
    pub(crate) jawaban_benar: Option<String>,
    #[serde(default = "default_skor")]
    #[validate(range(min = 0.0, message = "skor must be non-negative"))]
    pub(crate) skor: f64,
    #[serde(default)]
    #[validate(range(min = 1, message = "urutan must be positive"))]
    pub(crate) urutan: Option<i32>,
}

impl SoalCreate {
    /// Objective questions need options and a key that names one of them.
    pub(crate) fn check_answer_key(&self) -> Result<(), String> {
        if !self.jenis_soal.is_objective() {
            return Ok(());
        }
        if self.opsi.len() < 2 {
            return Err("opsi must contain at least two choices".to_string());
        }
        let Some(key) = self.jawaban_benar.as_deref().map(str::trim).filter(|key| !key.is_empty())
        else {
            return Err("jawaban_benar is required for objective questions".to_string());
        };

        let known = |value: &str| {
            self.opsi.iter().any(|option| option.trim().eq_ignore_ascii_case(value.trim()))
        };
        let all_known = match self.jenis_soal {
            QuestionKind::MultiChoice => key.split(',').all(known),
            _ => known(key),
        };
        if all_known {
            Ok(())
        } else {
            Err("jawaban_benar must match the listed opsi".to_string())
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SoalResponse {
    pub(crate) id: String,
    pub(crate) id_jadwal: String,
    pub(crate) urutan: i32,
    pub(crate) jenis_soal: QuestionKind,
    pub(crate) pertanyaan: String,
    pub(crate) opsi: Vec<String>,
    pub(crate) jawaban_benar: Option<String>,
    pub(crate) skor: f64,
    pub(crate) created_at: String,
}

impl SoalResponse {
    pub(crate) fn from_db(soal: Soal) -> Self {
        Self {
            id: soal.id,
            id_jadwal: soal.id_jadwal,
            urutan: soal.urutan,
            jenis_soal: soal.jenis_soal,
            pertanyaan: soal.pertanyaan,
            opsi: soal.opsi.0,
            jawaban_benar: soal.jawaban_benar,
            skor: soal.skor,
            created_at: format_primitive(soal.created_at),
        }
    }
}

/// Participant view: the answer key is never sent.
#[derive(Debug, Serialize)]
pub(crate) struct SoalPublic {
    pub(crate) id: String,
    pub(crate) urutan: i32,
    pub(crate) jenis_soal: QuestionKind,
    pub(crate) pertanyaan: String,
    pub(crate) opsi: Vec<String>,
    pub(crate) skor: f64,
}

impl SoalPublic {
    pub(crate) fn from_db(soal: Soal) -> Self {
        Self {
            id: soal.id,
            urutan: soal.urutan,
            jenis_soal: soal.jenis_soal,
            pertanyaan: soal.pertanyaan,
            opsi: soal.opsi.0,
            skor: soal.skor,
        }
    }
}

fn default_skor() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> SoalCreate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn essay_needs_no_key() {
        let soal = payload(json!({ "jenis_soal": "essay", "pertanyaan": "Jelaskan ACID" }));
        assert_eq!(soal.check_answer_key(), Ok(()));
    }

    #[test]
    fn single_choice_key_must_be_an_option() {
        let ok = payload(json!({
            "jenis_soal": "pilihan_ganda",
            "pertanyaan": "2 + 2?",
            "opsi": ["3", "4"],
            "jawaban_benar": "4"
        }));
        assert_eq!(ok.check_answer_key(), Ok(()));

        let unknown = payload(json!({
            "jenis_soal": "pilihan_ganda",
            "pertanyaan": "2 + 2?",
            "opsi": ["3", "4"],
            "jawaban_benar": "5"
        }));
        assert!(unknown.check_answer_key().is_err());
    }

    #[test]
    fn multi_choice_checks_every_key() {
        let soal = payload(json!({
            "jenis_soal": "multi_choice",
            "pertanyaan": "Bilangan prima?",
            "opsi": ["2", "3", "4"],
            "jawaban_benar": "2,3"
        }));
        assert_eq!(soal.check_answer_key(), Ok(()));
    }

    #[test]
    fn objective_without_key_is_rejected() {
        let soal = payload(json!({
            "jenis_soal": "multi_choice",
            "pertanyaan": "?",
            "opsi": ["A", "B"]
        }));
        assert!(soal.check_answer_key().is_err());
    }
}
