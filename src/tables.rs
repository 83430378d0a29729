use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    sensor::{Metric, Sensor},
    snapshot::Snapshot,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

pub fn build_readings_table(snapshot: &Snapshot, sensors: &[Sensor]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Sensor", "Name", "Value", "Unit"]);
    for sensor in sensors {
        let value = sensor.value(snapshot);
        let value_cell = match value {
            Some(value) => {
                Cell::new(format!("{value:.precision$}", precision = sensor.unit.precision()))
                    .fg(value_color(sensor.metric, value))
            }
            None => Cell::new("unknown").add_attribute(Attribute::Dim),
        };
        table.add_row(vec![
            Cell::new(&sensor.key).add_attribute(Attribute::Dim),
            Cell::new(&sensor.name),
            value_cell.set_alignment(CellAlignment::Right),
            Cell::new(sensor.unit),
        ]);
    }
    table
}

pub fn build_sensors_table(sensors: &[Sensor]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Sensor", "Name", "Window", "Unit", "Device class", "State class"]);
    for sensor in sensors {
        table.add_row(vec![
            Cell::new(&sensor.key),
            Cell::new(&sensor.name),
            Cell::new(sensor.window),
            Cell::new(sensor.unit),
            sensor.device_class.map_or_else(
                || Cell::new("none").add_attribute(Attribute::Dim),
                Cell::new,
            ),
            Cell::new(sensor.state_class),
        ]);
    }
    table
}

/// Highlight the direction of the net flows.
fn value_color(metric: Metric, value: f64) -> Color {
    match metric {
        Metric::Grid if value > 0.0 => Color::Red,
        Metric::Grid if value < 0.0 => Color::Green,
        Metric::Battery if value > 0.0 => Color::Green,
        Metric::Battery if value < 0.0 => Color::DarkYellow,
        _ => Color::Reset,
    }
}
