pub(crate) mod categories;
pub(crate) mod jadwal;
pub(crate) mod registrations;
pub(crate) mod results;
pub(crate) mod soal;
pub(crate) mod users;
pub(crate) mod violations;
