mod device;
mod discover;
mod fetch;
mod heartbeat;
mod sensors;
mod watch;

use clap::{Parser, Subcommand};

use crate::{
    cli::{
        discover::DiscoverArgs,
        fetch::FetchArgs,
        sensors::SensorsArgs,
        watch::WatchArgs,
    },
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check that the device answers on its local API.
    #[clap(name = "discover")]
    Discover(DiscoverArgs),

    /// Fetch the readings once and print them.
    #[clap(name = "fetch")]
    Fetch(FetchArgs),

    /// Poll the device until interrupted, logging the readings.
    #[clap(name = "watch")]
    Watch(Box<WatchArgs>),

    /// List the exposed sensors.
    #[clap(name = "sensors")]
    Sensors(SensorsArgs),
}

impl Command {
    pub async fn run(self) -> Result {
        match self {
            Self::Discover(args) => args.run().await,
            Self::Fetch(args) => args.run().await,
            Self::Watch(args) => args.run().await,
            Self::Sensors(args) => {
                args.run();
                Ok(())
            }
        }
    }
}
