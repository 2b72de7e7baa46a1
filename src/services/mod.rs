pub(crate) mod access_gate;
pub(crate) mod attempts;
pub(crate) mod jadwal_lifecycle;
pub(crate) mod kode_jadwal;
pub(crate) mod profile;
pub(crate) mod schedule_conflicts;
pub(crate) mod scoring;
