mod create;
mod list;
mod manage;
mod soal;
mod status;

pub(super) use create::create_jadwal;
pub(super) use list::{get_jadwal, list_jadwal};
pub(super) use manage::{bulk_destroy_jadwal, delete_jadwal, update_jadwal};
pub(super) use soal::{create_soal, delete_soal, list_soal};
pub(super) use status::{close_jadwal, reopen_jadwal};
