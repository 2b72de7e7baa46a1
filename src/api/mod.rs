pub(crate) mod attempts;
pub(crate) mod auth;
pub(crate) mod categories;
pub(crate) mod client_ip;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod jadwal;
pub(crate) mod pagination;
pub(crate) mod peserta;
pub(crate) mod registrations;
pub(crate) mod router;
pub(crate) mod users;
pub(crate) mod validation;
pub(crate) mod violations;
