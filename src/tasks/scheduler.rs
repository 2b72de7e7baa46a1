use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::shutdown;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::services::jadwal_lifecycle;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let shutdown_rx = shutdown::watch_signal();
    let period = Duration::from_secs(state.settings().schedule().sweep_interval_seconds.max(1));

    tracing::info!(interval_seconds = period.as_secs(), "Jadwal sweep worker started");

    let handle = tokio::spawn(sweep_loop(state, period, shutdown_rx));
    if let Err(err) = handle.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    tracing::info!("Jadwal sweep worker stopped");
    Ok(())
}

async fn sweep_loop(state: AppState, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) =
                    jadwal_lifecycle::sweep(state.db(), primitive_now_utc(), "worker").await
                {
                    tracing::error!(error = %err, "jadwal sweep failed");
                }
            }
        }
    }
}
