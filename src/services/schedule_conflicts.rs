use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::Jadwal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum WindowError {
    #[error("tanggal_berakhir must be after tanggal_mulai")]
    EndNotAfterStart,
    #[error("waktu_mulai_tes must lie between tanggal_mulai and tanggal_berakhir")]
    TestStartOutsideWindow,
}

impl Window {
    pub(crate) fn new(start: PrimitiveDateTime, end: PrimitiveDateTime) -> Result<Self, WindowError> {
        if end <= start {
            return Err(WindowError::EndNotAfterStart);
        }
        Ok(Self { start, end })
    }

    pub(crate) fn of(jadwal: &Jadwal) -> Self {
        Self { start: jadwal.tanggal_mulai, end: jadwal.tanggal_berakhir }
    }

    pub(crate) fn start(&self) -> PrimitiveDateTime {
        self.start
    }

    pub(crate) fn end(&self) -> PrimitiveDateTime {
        self.end
    }

    /// Bounds are inclusive on both sides.
    pub(crate) fn contains(&self, instant: PrimitiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// A candidate conflicts with `existing` when either of its endpoints falls
    /// inside `existing`, or when it fully encloses `existing`. Touching
    /// endpoints count as a conflict.
    pub(crate) fn conflicts_with(&self, existing: &Window) -> bool {
        existing.contains(self.start)
            || existing.contains(self.end)
            || (existing.start >= self.start && existing.end <= self.end)
    }

    pub(crate) fn check_test_start(&self, test_start: Option<PrimitiveDateTime>) -> Result<(), WindowError> {
        match test_start {
            Some(value) if !self.contains(value) => Err(WindowError::TestStartOutsideWindow),
            _ => Ok(()),
        }
    }
}

/// First schedule in `existing` that conflicts with `candidate`, skipping `exclude_id`.
pub(crate) fn first_conflict<'a>(
    candidate: &Window,
    existing: &'a [Jadwal],
    exclude_id: Option<&str>,
) -> Option<&'a Jadwal> {
    existing
        .iter()
        .filter(|jadwal| Some(jadwal.id.as_str()) != exclude_id)
        .find(|jadwal| candidate.conflicts_with(&Window::of(jadwal)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{AccessMode, JadwalStatus};
    use time::macros::datetime;

    fn jadwal(id: &str, nama: &str, start: PrimitiveDateTime, end: PrimitiveDateTime) -> Jadwal {
        Jadwal {
            id: id.to_string(),
            kode_jadwal: format!("K{id}"),
            nama_jadwal: nama.to_string(),
            tanggal_mulai: start,
            tanggal_berakhir: end,
            waktu_mulai_tes: None,
            status: JadwalStatus::Buka,
            auto_close: true,
            durasi: 60,
            user_id: "teacher".to_string(),
            id_jadwal_sebelumnya: None,
            kategori_tes_id: None,
            access_mode: AccessMode::Online,
            is_shuffled: false,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn rejects_inverted_or_empty_window() {
        let at = datetime!(2025-03-01 09:00);
        assert_eq!(Window::new(at, at), Err(WindowError::EndNotAfterStart));
        assert_eq!(
            Window::new(at, datetime!(2025-03-01 08:00)),
            Err(WindowError::EndNotAfterStart)
        );
    }

    #[test]
    fn makeup_overlapping_midterm_names_midterm() {
        let existing = vec![jadwal(
            "a",
            "Midterm",
            datetime!(2025-03-01 09:00),
            datetime!(2025-03-01 11:00),
        )];
        let candidate =
            Window::new(datetime!(2025-03-01 10:00), datetime!(2025-03-01 12:00)).unwrap();

        let conflict = first_conflict(&candidate, &existing, None).expect("conflict");
        assert_eq!(conflict.nama_jadwal, "Midterm");
    }

    #[test]
    fn enclosing_candidate_conflicts() {
        let existing = vec![jadwal(
            "a",
            "Quiz",
            datetime!(2025-03-01 10:00),
            datetime!(2025-03-01 10:30),
        )];
        let candidate =
            Window::new(datetime!(2025-03-01 09:00), datetime!(2025-03-01 12:00)).unwrap();
        assert!(first_conflict(&candidate, &existing, None).is_some());
    }

    #[test]
    fn candidate_inside_existing_conflicts() {
        let existing = vec![jadwal(
            "a",
            "Marathon",
            datetime!(2025-03-01 08:00),
            datetime!(2025-03-01 18:00),
        )];
        let candidate =
            Window::new(datetime!(2025-03-01 10:00), datetime!(2025-03-01 11:00)).unwrap();
        assert!(first_conflict(&candidate, &existing, None).is_some());
    }

    #[test]
    fn touching_endpoints_conflict() {
        let existing = vec![jadwal(
            "a",
            "Morning",
            datetime!(2025-03-01 08:00),
            datetime!(2025-03-01 10:00),
        )];
        let candidate =
            Window::new(datetime!(2025-03-01 10:00), datetime!(2025-03-01 11:00)).unwrap();
        assert!(first_conflict(&candidate, &existing, None).is_some());
    }

    #[test]
    fn disjoint_windows_do_not_conflict() {
        let existing = vec![jadwal(
            "a",
            "Morning",
            datetime!(2025-03-01 08:00),
            datetime!(2025-03-01 09:59),
        )];
        let candidate =
            Window::new(datetime!(2025-03-01 10:00), datetime!(2025-03-01 11:00)).unwrap();
        assert!(first_conflict(&candidate, &existing, None).is_none());
    }

    #[test]
    fn excluded_schedule_is_ignored_on_update() {
        let existing = vec![jadwal(
            "self",
            "Midterm",
            datetime!(2025-03-01 09:00),
            datetime!(2025-03-01 11:00),
        )];
        let candidate =
            Window::new(datetime!(2025-03-01 09:30), datetime!(2025-03-01 11:30)).unwrap();
        assert!(first_conflict(&candidate, &existing, Some("self")).is_none());
    }

    #[test]
    fn test_start_must_fall_inside_window() {
        let window =
            Window::new(datetime!(2025-03-01 09:00), datetime!(2025-03-01 11:00)).unwrap();
        assert!(window.check_test_start(None).is_ok());
        assert!(window.check_test_start(Some(datetime!(2025-03-01 09:30))).is_ok());
        assert_eq!(
            window.check_test_start(Some(datetime!(2025-03-01 11:01))),
            Err(WindowError::TestStartOutsideWindow)
        );
    }
}
