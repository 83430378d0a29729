use std::{error::Error as StdError, future::Future, pin::pin, sync::Arc, time::Duration};

use bon::Builder;
use chrono::{DateTime, Local};
use tokio::{
    sync::{Mutex, MutexGuard, watch},
    time::{MissedTickBehavior, interval},
};

use crate::{prelude::*, snapshot::Snapshot};

/// Source of fresh snapshots.
pub trait Fetch {
    type Error: StdError + Send + Sync + 'static;

    fn fetch(&self) -> impl Future<Output = Result<Snapshot, Self::Error>>;
}

/// The refresh has not produced a snapshot, the previous one is kept.
#[derive(Clone, Debug, thiserror::Error)]
#[error("error communicating with the device")]
pub struct UpdateFailed(#[source] Arc<dyn StdError + Send + Sync>);

impl UpdateFailed {
    pub fn new(source: impl StdError + Send + Sync + 'static) -> Self {
        Self(Arc::new(source))
    }
}

#[must_use]
pub enum Refresh {
    Updated(Arc<Snapshot>),

    /// Another refresh was in flight.
    Skipped,
}

#[must_use]
#[derive(Clone, Debug, Default)]
pub struct Status {
    pub last_success_at: Option<DateTime<Local>>,
    pub last_error: Option<UpdateFailed>,
    pub consecutive_failures: u32,
}

impl Status {
    #[must_use]
    pub const fn last_update_success(&self) -> bool {
        self.last_success_at.is_some() && self.last_error.is_none()
    }
}

/// Polls the source on a fixed interval and caches the last good snapshot.
///
/// At most one fetch is in flight at any time. A failed fetch keeps the cached snapshot
/// and is reported through [`UpdateFailed`] and [`Status`].
#[derive(Builder)]
pub struct Coordinator<S> {
    source: S,

    #[builder(into)]
    interval: Duration,

    #[builder(skip)]
    in_flight: Mutex<()>,

    #[builder(skip = watch::Sender::new(None))]
    snapshot: watch::Sender<Option<Arc<Snapshot>>>,

    #[builder(skip = watch::Sender::new(Status::default()))]
    status: watch::Sender<Status>,
}

impl<S: Fetch> Coordinator<S> {
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.borrow().clone()
    }

    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn last_update_success(&self) -> bool {
        self.status.borrow().last_update_success()
    }

    /// Observe the outcome of every following refresh.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    /// Refresh during the setup: waits for an in-flight fetch instead of skipping.
    #[instrument(skip_all)]
    pub async fn first_refresh(&self) -> Result<Arc<Snapshot>, UpdateFailed> {
        let guard = self.in_flight.lock().await;
        self.perform(guard).await
    }

    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<Refresh, UpdateFailed> {
        let Ok(guard) = self.in_flight.try_lock() else {
            debug!("another refresh is in flight, skipping");
            return Ok(Refresh::Skipped);
        };
        self.perform(guard).await.map(Refresh::Updated)
    }

    /// Refresh on every interval tick until the shutdown future resolves.
    ///
    /// The first tick happens one interval after the start, the first refresh is the caller's.
    #[instrument(skip_all, fields(interval = ?self.interval))]
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut interval = interval(self.interval);
        interval.reset_after(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = pin!(shutdown);

        info!("polling…");
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("stopping…");
                    break;
                }
                _ = interval.tick() => {
                    // Failures are recorded in the status.
                    if let Ok(Refresh::Updated(snapshot)) = self.refresh().await {
                        trace!(fetched_at = %snapshot.fetched_at, "polled");
                    }
                }
            }
        }
    }

    async fn perform(&self, _in_flight: MutexGuard<'_, ()>) -> Result<Arc<Snapshot>, UpdateFailed> {
        match self.source.fetch().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.snapshot.send_replace(Some(Arc::clone(&snapshot)));
                self.status.send_modify(|status| {
                    status.last_success_at = Some(snapshot.fetched_at);
                    status.last_error = None;
                    status.consecutive_failures = 0;
                });
                debug!("refreshed");
                Ok(snapshot)
            }
            Err(error) => {
                let error = UpdateFailed::new(error);
                self.status.send_modify(|status| {
                    status.last_error = Some(error.clone());
                    status.consecutive_failures += 1;
                });
                warn!(
                    consecutive_failures = self.status.borrow().consecutive_failures,
                    "refresh failed: {:#}",
                    Error::new(error.clone())
                );
                Err(error)
            }
        }
    }
}
