//! Daily expiry sweep.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use extranet_core::{ExpirySweepApi, ExtranetService, SweepReport};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::SweepConfig;

/// First instant strictly after `now` at `hour:minute` UTC.
///
/// Out-of-range times fall back to midnight; the configuration rejects them
/// before the scheduler starts.
pub fn next_run_after(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Runs one sweep on the blocking pool.
pub async fn sweep_once(service: &ExtranetService) -> anyhow::Result<SweepReport> {
    let service = service.clone();
    let report = tokio::task::spawn_blocking(move || service.sweep_expired(service.now())).await??;
    Ok(report)
}

/// Sweeps every day at the configured time until `shutdown` flips to `true`.
pub async fn run(service: ExtranetService, config: SweepConfig, mut shutdown: watch::Receiver<bool>) {
    if !config.enabled {
        info!("Expiry sweep disabled");
        return;
    }

    loop {
        let now = service.now();
        let next = next_run_after(now, config.hour, config.minute);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_run = %next, "Expiry sweep scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => {
                info!("Expiry sweep scheduler stopped");
                return;
            }
        }

        match sweep_once(&service).await {
            Ok(report) => info!(
                expired = report.expired.len(),
                notified = report.notified,
                "Expiry sweep finished"
            ),
            Err(e) => error!(error = %e, "Expiry sweep failed"),
        }
    }
}
