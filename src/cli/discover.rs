use clap::Parser;

use crate::{cli::device::DeviceArgs, prelude::*};

#[derive(Parser)]
pub struct DiscoverArgs {
    #[clap(flatten)]
    device: DeviceArgs,
}

impl DiscoverArgs {
    pub async fn run(self) -> Result {
        let client = self.device.new_client()?;
        ensure!(client.discover().await, "the device at `{}` is unreachable", client.url());
        info!(url = %client.url(), "found the device");
        Ok(())
    }
}
