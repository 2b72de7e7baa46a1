use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod auth;
pub(crate) mod category;
pub(crate) mod datetime;
pub(crate) mod jadwal;
pub(crate) mod registration;
pub(crate) mod soal;
pub(crate) mod submission;
pub(crate) mod user;
pub(crate) mod violation;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}

/// Result of a bulk mutation that reports how many rows it touched.
#[derive(Debug, Serialize)]
pub(crate) struct AffectedResponse {
    pub(crate) affected: u64,
    pub(crate) message: String,
}
