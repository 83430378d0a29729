use clap::Parser;
use itertools::Itertools;

use crate::{
    cli::device::DeviceArgs,
    prelude::*,
    sensor::{self, Sensor, sensors},
    tables::build_readings_table,
};

#[derive(Parser)]
pub struct FetchArgs {
    #[clap(flatten)]
    device: DeviceArgs,

    /// Print only these sensors, see `sensors` for the keys.
    #[clap(long = "sensor", value_delimiter = ',', num_args = 1..)]
    sensors: Vec<String>,
}

impl FetchArgs {
    pub async fn run(self) -> Result {
        let sensors = self.selected_sensors()?;
        let snapshot = self.device.new_client()?.fetch().await?;
        println!("{}", build_readings_table(&snapshot, &sensors));
        Ok(())
    }

    fn selected_sensors(&self) -> Result<Vec<Sensor>> {
        if self.sensors.is_empty() {
            return Ok(sensors());
        }
        self.sensors
            .iter()
            .unique()
            .map(|key| sensor::find(key).with_context(|| format!("unknown sensor `{key}`")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sensor_filter_ok() -> Result {
        let args = FetchArgs::try_parse_from([
            "fetch",
            "--sensor",
            "solar_power,grid_power",
            "--sensor",
            "solar_power",
        ])?;
        let keys = args.selected_sensors()?.into_iter().map(|sensor| sensor.key).collect_vec();
        assert_eq!(keys, ["solar_power", "grid_power"]);
        Ok(())
    }

    #[test]
    fn unknown_sensor_fails() -> Result {
        let args = FetchArgs::try_parse_from(["fetch", "--sensor", "wind_power"])?;
        assert!(args.selected_sensors().is_err());
        Ok(())
    }

    #[test]
    fn all_sensors_by_default() -> Result {
        let args = FetchArgs::try_parse_from(["fetch"])?;
        assert_eq!(args.selected_sensors()?.len(), sensors().len());
        Ok(())
    }
}
