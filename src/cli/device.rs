use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use crate::{
    api::ichijo::{self, DEFAULT_URL},
    prelude::*,
};

#[derive(Parser)]
pub struct DeviceArgs {
    /// Local API endpoint of the energy monitor.
    #[clap(long = "device-url", env = "ICHIJO_DEVICE_URL", default_value = DEFAULT_URL)]
    pub url: Url,

    /// Timeout of a single request to the device.
    #[clap(long = "device-timeout", env = "ICHIJO_DEVICE_TIMEOUT", default_value = "10s")]
    pub timeout: humantime::Duration,
}

impl DeviceArgs {
    pub fn new_client(&self) -> Result<ichijo::Client> {
        let timeout: Duration = self.timeout.into();
        ichijo::Client::new(self.url.clone(), timeout)
            .with_context(|| format!("failed to create the client for `{}`", self.url))
    }
}
