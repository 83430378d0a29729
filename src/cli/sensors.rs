use clap::Parser;

use crate::{sensor::sensors, tables::build_sensors_table};

#[derive(Parser)]
pub struct SensorsArgs {}

impl SensorsArgs {
    pub fn run(self) {
        println!("{}", build_sensors_table(&sensors()));
    }
}
