use std::time::Duration;

use chrono::{DateTime, Local};
use clap::Parser;
use reqwest::Url;
use serde::Serialize;

use crate::{coordinator::Status, prelude::*};

#[derive(Parser)]
pub struct HeartbeatArgs {
    /// Receives the fetch time after every successful refresh.
    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    url: Option<Url>,
}

impl HeartbeatArgs {
    pub fn new_client(&self) -> Result<Option<Heartbeat>> {
        self.url.clone().map(Heartbeat::new).transpose()
    }
}

/// Dead man's switch: silence means the device has not been read lately.
pub struct Heartbeat {
    inner: reqwest::Client,
    url: Url,
}

impl Heartbeat {
    pub fn new(url: Url) -> Result<Self> {
        let inner = reqwest::Client::builder().timeout(Duration::from_secs(3)).build()?;
        Ok(Self { inner, url })
    }

    /// Report the refresh outcome, failures are reported by staying silent.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn send(&self, status: &Status) {
        let Some(fetched_at) = status.last_success_at.filter(|_| status.last_update_success())
        else {
            return;
        };
        if let Err(error) = self.send_fallible(fetched_at).await {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    async fn send_fallible(&self, fetched_at: DateTime<Local>) -> Result {
        debug!(%fetched_at, "sending a heartbeat…");
        self.inner
            .post(self.url.clone())
            .json(&Beat { fetched_at })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Beat {
    fetched_at: DateTime<Local>,
}
