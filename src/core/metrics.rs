use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_auto_closed(count: u64, trigger: &'static str) {
    if count > 0 {
        metrics::counter!("jadwal_auto_closed_total", "trigger" => trigger).increment(count);
    }
}

pub(crate) fn record_registrations(count: u64, method: &'static str) {
    if count > 0 {
        metrics::counter!("registrations_total", "method" => method).increment(count);
    }
}

pub(crate) fn record_submission(outcome: &'static str) {
    metrics::counter!("submissions_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_access_denied(reason: &'static str) {
    metrics::counter!("access_denied_total", "reason" => reason).increment(1);
}
