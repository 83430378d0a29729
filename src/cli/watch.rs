use clap::Parser;
use tokio::sync::watch;

use crate::{
    api::ichijo,
    cli::{
        device::DeviceArgs,
        heartbeat::{Heartbeat, HeartbeatArgs},
    },
    coordinator::{Coordinator, Status},
    prelude::*,
    sensor::sensors,
    snapshot::Snapshot,
};

#[derive(Parser)]
pub struct WatchArgs {
    #[clap(flatten)]
    device: DeviceArgs,

    #[clap(long = "polling-interval", env = "ICHIJO_POLLING_INTERVAL", default_value = "30s")]
    polling_interval: humantime::Duration,

    #[clap(flatten)]
    heartbeat: HeartbeatArgs,
}

impl WatchArgs {
    pub async fn run(self) -> Result {
        let heartbeat = self.heartbeat.new_client()?;
        let coordinator = Coordinator::builder()
            .source(self.device.new_client()?)
            .interval(self.polling_interval)
            .build();

        let snapshot = coordinator.first_refresh().await.context("the device is not ready")?;
        let status = coordinator.status();
        log_readings(&status, Some(&snapshot));
        if let Some(heartbeat) = &heartbeat {
            heartbeat.send(&status).await;
        }

        let outcomes = coordinator.subscribe();
        tokio::select! {
            () = coordinator.run(shutdown_signal()) => {}
            () = report(&coordinator, heartbeat.as_ref(), outcomes) => {}
        }

        let status = coordinator.status();
        info!(
            healthy = coordinator.last_update_success(),
            last_success_at = ?status.last_success_at,
            consecutive_failures = status.consecutive_failures,
            "stopped"
        );
        Ok(())
    }
}

/// Log every refresh outcome as observed by the subscriber.
async fn report(
    coordinator: &Coordinator<ichijo::Client>,
    heartbeat: Option<&Heartbeat>,
    mut outcomes: watch::Receiver<Status>,
) {
    while outcomes.changed().await.is_ok() {
        let status = outcomes.borrow_and_update().clone();
        let snapshot = coordinator.snapshot();
        log_readings(&status, snapshot.as_deref());
        if let Some(error) = &status.last_error {
            warn!(
                consecutive_failures = status.consecutive_failures,
                "sensors are unavailable: {:#}",
                Error::new(error.clone())
            );
        }
        if let Some(heartbeat) = heartbeat {
            heartbeat.send(&status).await;
        }
    }
}

fn log_readings(status: &Status, snapshot: Option<&Snapshot>) {
    if !status.last_update_success() {
        return;
    }
    for sensor in sensors() {
        match sensor.state(status, snapshot) {
            Some(value) => debug!(sensor = %sensor.key, value, unit = %sensor.unit),
            None => debug!(sensor = %sensor.key, "unknown"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {error:#}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                error!("failed to install the signal handler: {error:#}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
