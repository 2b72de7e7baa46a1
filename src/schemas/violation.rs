use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Violation;
use crate::schemas::datetime::deserialize_option_flexible;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ViolationReport {
    #[serde(alias = "jadwalId")]
    #[validate(length(min = 1, message = "jadwal_id must not be empty"))]
    pub(crate) jadwal_id: String,
    #[serde(alias = "violationType")]
    #[validate(length(min = 1, max = 64, message = "violation_type must be 1-64 characters"))]
    pub(crate) violation_type: String,
    #[serde(default, alias = "detectionMethod")]
    #[validate(length(max = 64, message = "detection_method is too long"))]
    pub(crate) detection_method: Option<String>,
    #[serde(default)]
    pub(crate) context: serde_json::Value,
    #[serde(default, alias = "violationTime", deserialize_with = "deserialize_option_flexible")]
    pub(crate) violation_time: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ViolationResponse {
    pub(crate) id: String,
    pub(crate) jadwal_id: String,
    pub(crate) peserta_id: String,
    pub(crate) violation_type: String,
    pub(crate) detection_method: Option<String>,
    pub(crate) context: serde_json::Value,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) violation_time: String,
}

impl ViolationResponse {
    pub(crate) fn from_db(violation: Violation) -> Self {
        Self {
            id: violation.id,
            jadwal_id: violation.jadwal_id,
            peserta_id: violation.peserta_id,
            violation_type: violation.violation_type,
            detection_method: violation.detection_method,
            context: violation.context.0,
            ip_address: violation.ip_address,
            user_agent: violation.user_agent,
            violation_time: format_primitive(violation.violation_time),
        }
    }
}
