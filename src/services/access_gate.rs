use std::fmt;
use std::net::IpAddr;

use sqlx::types::ipnetwork::IpNetwork;
use time::{Duration, PrimitiveDateTime};

use crate::core::network;
use crate::db::models::{Jadwal, Registration, TestResult};
use crate::db::types::{AccessMode, AttemptStatus, JadwalStatus, RegistrationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Denial {
    ScheduleClosed,
    NotRegistered,
    RegistrationPending,
    RegistrationRejected,
    NotStarted,
    Ended,
    AlreadySubmitted,
    Disconnected,
    NetworkDenied,
    NotEntered,
    TimeUp,
}

impl Denial {
    pub(crate) fn code(self) -> &'static str {
        match self {
            Denial::ScheduleClosed => "schedule_closed",
            Denial::NotRegistered => "not_registered",
            Denial::RegistrationPending => "registration_pending",
            Denial::RegistrationRejected => "registration_rejected",
            Denial::NotStarted => "not_started",
            Denial::Ended => "ended",
            Denial::AlreadySubmitted => "already_submitted",
            Denial::Disconnected => "disconnected",
            Denial::NetworkDenied => "network_denied",
            Denial::NotEntered => "not_entered",
            Denial::TimeUp => "time_up",
        }
    }

    pub(crate) fn message(self) -> &'static str {
        match self {
            Denial::ScheduleClosed => "Jadwal tes sudah ditutup",
            Denial::NotRegistered => "Anda belum terdaftar pada jadwal ini",
            Denial::RegistrationPending => "Pendaftaran Anda masih menunggu persetujuan",
            Denial::RegistrationRejected => "Pendaftaran Anda ditolak",
            Denial::NotStarted => "Tes belum dimulai",
            Denial::Ended => "Waktu tes sudah berakhir",
            Denial::AlreadySubmitted => "Anda sudah menyelesaikan tes ini",
            Denial::Disconnected => {
                "Tes Anda terputus. Silakan hubungi pengawas untuk mengizinkan melanjutkan tes"
            }
            Denial::NetworkDenied => "Tes ini hanya dapat diakses dari jaringan kampus",
            Denial::NotEntered => "Anda belum memulai tes ini",
            Denial::TimeUp => "Waktu pengerjaan Anda sudah habis",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// How an admitted participant gets into the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    /// No attempt yet.
    Start,
    /// Attempt in progress, e.g. after a page reload.
    Continue,
    /// Disconnected attempt the owner allowed to continue.
    Resume,
}

pub(crate) struct GateInput<'a> {
    pub(crate) jadwal: &'a Jadwal,
    pub(crate) registration: Option<&'a Registration>,
    pub(crate) attempt: Option<&'a TestResult>,
    pub(crate) now: PrimitiveDateTime,
    pub(crate) client_ip: Option<IpAddr>,
    pub(crate) allowed_ranges: &'a [IpNetwork],
}

pub(crate) fn effective_start(jadwal: &Jadwal) -> PrimitiveDateTime {
    jadwal.waktu_mulai_tes.unwrap_or(jadwal.tanggal_mulai)
}

/// Per-participant timer, cut off at the end of the schedule window.
pub(crate) fn attempt_deadline(jadwal: &Jadwal, now: PrimitiveDateTime) -> PrimitiveDateTime {
    let timer = now + Duration::minutes(i64::from(jadwal.durasi));
    timer.min(jadwal.tanggal_berakhir)
}

fn check_registration(registration: Option<&Registration>) -> Result<(), Denial> {
    match registration.map(|registration| registration.status) {
        None => Err(Denial::NotRegistered),
        Some(RegistrationStatus::Menunggu) => Err(Denial::RegistrationPending),
        Some(RegistrationStatus::Ditolak) => Err(Denial::RegistrationRejected),
        Some(RegistrationStatus::Disetujui) => Ok(()),
    }
}

/// Decides whether a participant may open the question set right now.
pub(crate) fn evaluate(input: &GateInput<'_>) -> Result<Entry, Denial> {
    let jadwal = input.jadwal;

    if jadwal.status != JadwalStatus::Buka {
        return Err(Denial::ScheduleClosed);
    }

    check_registration(input.registration)?;

    if input.now < effective_start(jadwal) {
        return Err(Denial::NotStarted);
    }
    if input.now > jadwal.tanggal_berakhir {
        return Err(Denial::Ended);
    }

    let entry = match input.attempt {
        None => Entry::Start,
        Some(attempt) => match attempt.status_tes {
            AttemptStatus::SedangMengerjakan if input.now > attempt.deadline_at => {
                return Err(Denial::TimeUp)
            }
            AttemptStatus::SedangMengerjakan => Entry::Continue,
            AttemptStatus::Selesai => return Err(Denial::AlreadySubmitted),
            AttemptStatus::Terputus if attempt.boleh_dilanjutkan => Entry::Resume,
            AttemptStatus::Terputus => return Err(Denial::Disconnected),
        },
    };

    if jadwal.access_mode == AccessMode::Offline {
        let allowed = input
            .client_ip
            .map(|ip| network::is_allowed(ip, input.allowed_ranges))
            .unwrap_or(false);
        if !allowed {
            return Err(Denial::NetworkDenied);
        }
    }

    Ok(entry)
}

/// Checks for writing answers into an attempt. Schedule status and window are
/// not consulted: the attempt's own deadline, stretched by `grace`, governs.
pub(crate) fn check_answering(
    registration: Option<&Registration>,
    attempt: Option<&TestResult>,
    now: PrimitiveDateTime,
    grace: Duration,
) -> Result<(), Denial> {
    check_registration(registration)?;

    let attempt = attempt.ok_or(Denial::NotEntered)?;
    match attempt.status_tes {
        AttemptStatus::Selesai => Err(Denial::AlreadySubmitted),
        AttemptStatus::Terputus => Err(Denial::Disconnected),
        AttemptStatus::SedangMengerjakan
            if attempt.deadline_at.checked_add(grace).is_some_and(|limit| now > limit) =>
        {
            Err(Denial::TimeUp)
        }
        AttemptStatus::SedangMengerjakan => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{CorrectionStatus, RegistrationMethod};
    use time::macros::datetime;

    fn jadwal() -> Jadwal {
        Jadwal {
            id: "j1".to_string(),
            kode_jadwal: "UJ25001".to_string(),
            nama_jadwal: "Ujian".to_string(),
            tanggal_mulai: datetime!(2025-03-01 08:00),
            tanggal_berakhir: datetime!(2025-03-01 12:00),
            waktu_mulai_tes: None,
            status: JadwalStatus::Buka,
            auto_close: true,
            durasi: 90,
            user_id: "teacher".to_string(),
            id_jadwal_sebelumnya: None,
            kategori_tes_id: None,
            access_mode: AccessMode::Online,
            is_shuffled: false,
            created_at: datetime!(2025-02-01 00:00),
            updated_at: datetime!(2025-02-01 00:00),
        }
    }

    fn registration(status: RegistrationStatus) -> Registration {
        Registration {
            id: "r1".to_string(),
            id_jadwal: "j1".to_string(),
            id_peserta: "p1".to_string(),
            status,
            cara_daftar: RegistrationMethod::Mandiri,
            tanggal_daftar: datetime!(2025-02-10 00:00),
            tanggal_approval: None,
            approved_by: None,
            keterangan: None,
        }
    }

    fn attempt(status: AttemptStatus, deadline_at: PrimitiveDateTime) -> TestResult {
        TestResult {
            id: "h1".to_string(),
            id_user: "p1".to_string(),
            id_jadwal: "j1".to_string(),
            status_tes: status,
            started_at: datetime!(2025-03-01 08:30),
            deadline_at,
            sisa_waktu_detik: None,
            alasan_terputus: None,
            boleh_dilanjutkan: false,
            diizinkan_oleh: None,
            diizinkan_lanjut_pada: None,
            total_skor: 0.0,
            reason: None,
            submitted_at: None,
            status_koreksi: CorrectionStatus::Draft,
            dikoreksi_oleh: None,
            dikoreksi_pada: None,
        }
    }

    fn check(
        jadwal: &Jadwal,
        registration: Option<&Registration>,
        now: PrimitiveDateTime,
    ) -> Result<Entry, Denial> {
        evaluate(&GateInput {
            jadwal,
            registration,
            attempt: None,
            now,
            client_ip: None,
            allowed_ranges: &[],
        })
    }

    #[test]
    fn approved_participant_inside_window_is_admitted() {
        let approved = registration(RegistrationStatus::Disetujui);
        assert_eq!(
            check(&jadwal(), Some(&approved), datetime!(2025-03-01 09:00)),
            Ok(Entry::Start)
        );
    }

    #[test]
    fn closed_schedule_denies_first() {
        let mut closed = jadwal();
        closed.status = JadwalStatus::Tutup;
        assert_eq!(check(&closed, None, datetime!(2025-03-01 09:00)), Err(Denial::ScheduleClosed));
    }

    #[test]
    fn registration_state_is_distinguished() {
        let now = datetime!(2025-03-01 09:00);
        let pending = registration(RegistrationStatus::Menunggu);
        let rejected = registration(RegistrationStatus::Ditolak);

        assert_eq!(check(&jadwal(), None, now), Err(Denial::NotRegistered));
        assert_eq!(check(&jadwal(), Some(&pending), now), Err(Denial::RegistrationPending));
        assert_eq!(check(&jadwal(), Some(&rejected), now), Err(Denial::RegistrationRejected));
    }

    #[test]
    fn test_start_override_moves_the_opening() {
        let mut delayed = jadwal();
        delayed.waktu_mulai_tes = Some(datetime!(2025-03-01 10:00));
        let approved = registration(RegistrationStatus::Disetujui);

        assert_eq!(
            check(&delayed, Some(&approved), datetime!(2025-03-01 09:00)),
            Err(Denial::NotStarted)
        );
        assert_eq!(check(&delayed, Some(&approved), datetime!(2025-03-01 10:00)), Ok(Entry::Start));
    }

    #[test]
    fn window_end_is_inclusive() {
        let approved = registration(RegistrationStatus::Disetujui);
        assert_eq!(
            check(&jadwal(), Some(&approved), datetime!(2025-03-01 12:00)),
            Ok(Entry::Start)
        );
        assert_eq!(
            check(&jadwal(), Some(&approved), datetime!(2025-03-01 12:00:01)),
            Err(Denial::Ended)
        );
    }

    #[test]
    fn existing_attempt_decides_the_entry() {
        let jadwal = jadwal();
        let approved = registration(RegistrationStatus::Disetujui);
        let deadline = datetime!(2025-03-01 10:00);
        let in_progress = attempt(AttemptStatus::SedangMengerjakan, deadline);
        let finished = attempt(AttemptStatus::Selesai, deadline);
        let disconnected = attempt(AttemptStatus::Terputus, deadline);
        let mut allowed = attempt(AttemptStatus::Terputus, deadline);
        allowed.boleh_dilanjutkan = true;

        let entry = |attempt: &TestResult| {
            evaluate(&GateInput {
                jadwal: &jadwal,
                registration: Some(&approved),
                attempt: Some(attempt),
                now: datetime!(2025-03-01 09:00),
                client_ip: None,
                allowed_ranges: &[],
            })
        };

        assert_eq!(entry(&in_progress), Ok(Entry::Continue));
        assert_eq!(entry(&finished), Err(Denial::AlreadySubmitted));
        assert_eq!(entry(&disconnected), Err(Denial::Disconnected));
        assert_eq!(entry(&allowed), Ok(Entry::Resume));

        let expired = attempt(AttemptStatus::SedangMengerjakan, datetime!(2025-03-01 08:45));
        assert_eq!(entry(&expired), Err(Denial::TimeUp));
    }

    #[test]
    fn answering_ignores_schedule_status_and_window() {
        let approved = registration(RegistrationStatus::Disetujui);
        let deadline = datetime!(2025-03-01 12:00);
        let in_progress = attempt(AttemptStatus::SedangMengerjakan, deadline);
        let grace = Duration::minutes(2);

        assert_eq!(
            check_answering(Some(&approved), Some(&in_progress), datetime!(2025-03-01 12:01), grace),
            Ok(())
        );
        assert_eq!(
            check_answering(Some(&approved), Some(&in_progress), datetime!(2025-03-01 12:03), grace),
            Err(Denial::TimeUp)
        );
    }

    #[test]
    fn answering_requires_an_open_attempt() {
        let approved = registration(RegistrationStatus::Disetujui);
        let pending = registration(RegistrationStatus::Menunggu);
        let deadline = datetime!(2025-03-01 12:00);
        let now = datetime!(2025-03-01 09:00);
        let grace = Duration::ZERO;

        assert_eq!(check_answering(Some(&approved), None, now, grace), Err(Denial::NotEntered));
        assert_eq!(
            check_answering(
                Some(&approved),
                Some(&attempt(AttemptStatus::Selesai, deadline)),
                now,
                grace
            ),
            Err(Denial::AlreadySubmitted)
        );
        assert_eq!(
            check_answering(
                Some(&approved),
                Some(&attempt(AttemptStatus::Terputus, deadline)),
                now,
                grace
            ),
            Err(Denial::Disconnected)
        );
        assert_eq!(
            check_answering(
                Some(&pending),
                Some(&attempt(AttemptStatus::SedangMengerjakan, deadline)),
                now,
                grace
            ),
            Err(Denial::RegistrationPending)
        );
    }

    #[test]
    fn offline_mode_checks_client_network() {
        let mut offline = jadwal();
        offline.access_mode = AccessMode::Offline;
        let approved = registration(RegistrationStatus::Disetujui);
        let ranges = network::parse_ranges("10.10.0.0/16").unwrap();

        let enter = |ip: Option<&str>| {
            evaluate(&GateInput {
                jadwal: &offline,
                registration: Some(&approved),
                attempt: None,
                now: datetime!(2025-03-01 09:00),
                client_ip: ip.map(|value| value.parse().unwrap()),
                allowed_ranges: &ranges,
            })
        };

        assert_eq!(enter(Some("10.10.3.4")), Ok(Entry::Start));
        assert_eq!(enter(Some("203.0.113.9")), Err(Denial::NetworkDenied));
        assert_eq!(enter(None), Err(Denial::NetworkDenied));
    }

    #[test]
    fn deadline_is_capped_by_window_end() {
        let jadwal = jadwal();
        assert_eq!(
            attempt_deadline(&jadwal, datetime!(2025-03-01 09:00)),
            datetime!(2025-03-01 10:30)
        );
        assert_eq!(
            attempt_deadline(&jadwal, datetime!(2025-03-01 11:30)),
            datetime!(2025-03-01 12:00)
        );
    }
}
