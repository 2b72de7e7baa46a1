//! Attempt timing and the outcome of a submission.
//!
//! A submission caused by a proctoring event leaves the attempt `terputus`
//! with the unused time kept, so the owner can let the participant continue.

use std::collections::HashMap;

use serde::Deserialize;
use time::{Duration, PrimitiveDateTime};

use crate::db::models::Jadwal;
use crate::db::types::AttemptStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SubmitReason {
    #[default]
    Manual,
    TimeUp,
    TabSwitch,
    ScreenshotViolation,
}

impl SubmitReason {
    pub(crate) fn code(self) -> &'static str {
        match self {
            SubmitReason::Manual => "manual",
            SubmitReason::TimeUp => "time_up",
            SubmitReason::TabSwitch => "tab_switch",
            SubmitReason::ScreenshotViolation => "screenshot_violation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub(crate) status: AttemptStatus,
    pub(crate) alasan: Option<&'static str>,
    pub(crate) sisa_waktu_detik: Option<i32>,
}

impl Outcome {
    pub(crate) fn message(&self) -> &'static str {
        match self.status {
            AttemptStatus::Terputus => "Jawaban berhasil dikumpulkan namun tes terputus",
            _ => "Jawaban berhasil dikumpulkan dan tes selesai",
        }
    }
}

pub(crate) fn outcome(
    reason: SubmitReason,
    deadline_at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Outcome {
    match reason {
        SubmitReason::Manual => {
            Outcome { status: AttemptStatus::Selesai, alasan: None, sisa_waktu_detik: None }
        }
        SubmitReason::TimeUp => Outcome {
            status: AttemptStatus::Selesai,
            alasan: Some("Waktu habis"),
            sisa_waktu_detik: Some(0),
        },
        SubmitReason::TabSwitch => Outcome {
            status: AttemptStatus::Terputus,
            alasan: Some("Terdeteksi pindah tab atau window"),
            sisa_waktu_detik: Some(remaining_seconds(deadline_at, now)),
        },
        SubmitReason::ScreenshotViolation => Outcome {
            status: AttemptStatus::Terputus,
            alasan: Some("Pelanggaran screenshot berulang"),
            sisa_waktu_detik: Some(remaining_seconds(deadline_at, now)),
        },
    }
}

pub(crate) fn remaining_seconds(deadline_at: PrimitiveDateTime, now: PrimitiveDateTime) -> i32 {
    let seconds = (deadline_at - now).whole_seconds().max(0);
    i32::try_from(seconds).unwrap_or(i32::MAX)
}

/// Deadline after a permitted resume: the time left at the disconnect (the
/// full duration when unknown), still cut off at the end of the window.
pub(crate) fn resume_deadline(
    jadwal: &Jadwal,
    now: PrimitiveDateTime,
    sisa_waktu_detik: Option<i32>,
) -> PrimitiveDateTime {
    let remaining = match sisa_waktu_detik {
        Some(seconds) => Duration::seconds(i64::from(seconds.max(0))),
        None => Duration::minutes(i64::from(jadwal.durasi)),
    };
    (now + remaining).min(jadwal.tanggal_berakhir)
}

/// Score as a 0-100 grade, two decimals.
pub(crate) fn nilai(total_skor: f64, skor_maksimal: f64) -> f64 {
    if skor_maksimal <= 0.0 {
        return 0.0;
    }
    (total_skor / skor_maksimal * 10_000.0).round() / 100.0
}

/// Every corrected answer must belong to the attempt and stay within its
/// question's maximum.
pub(crate) fn check_scores(
    limits: &HashMap<&str, f64>,
    scores: &[(&str, f64)],
) -> Result<(), String> {
    for (id, skor) in scores {
        let Some(max) = limits.get(id) else {
            return Err(format!("Jawaban {id} tidak ditemukan pada hasil tes ini"));
        };
        if !skor.is_finite() || *skor < 0.0 || skor > max {
            return Err(format!("Skor untuk jawaban {id} harus di antara 0 dan {max}"));
        }
    }
    Ok(())
}
