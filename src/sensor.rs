use std::fmt::{Display, Formatter};

use enumset::EnumSet;

use crate::{
    coordinator::Status,
    quantity::{Zero, energy::KilowattHours, percent::Percent, power::Kilowatts},
    snapshot::{Flows, Snapshot, Window},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Metric {
    Solar,
    Home,
    Grid,
    Battery,
    GridExport,
    GridPurchase,
    BatteryCharge,
    BatteryDischarge,
    SelfSufficiency,
    SelfConsumption,
    StateOfCharge,
}

impl Metric {
    pub const ALL: [Self; 11] = [
        Self::Solar,
        Self::Home,
        Self::Grid,
        Self::Battery,
        Self::GridExport,
        Self::GridPurchase,
        Self::BatteryCharge,
        Self::BatteryDischarge,
        Self::SelfSufficiency,
        Self::SelfConsumption,
        Self::StateOfCharge,
    ];

    const fn slug(self) -> &'static str {
        match self {
            Self::Solar => "solar",
            Self::Home => "home",
            Self::Grid => "grid",
            Self::Battery => "battery",
            Self::GridExport => "grid_export",
            Self::GridPurchase => "grid_purchase",
            Self::BatteryCharge => "battery_charge",
            Self::BatteryDischarge => "battery_discharge",
            Self::SelfSufficiency => "self_sufficiency",
            Self::SelfConsumption => "self_consumption",
            Self::StateOfCharge => "battery_state_of_charge",
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Solar => "Solar",
            Self::Home => "Home",
            Self::Grid => "Grid",
            Self::Battery => "Battery",
            Self::GridExport => "Grid export",
            Self::GridPurchase => "Grid purchase",
            Self::BatteryCharge => "Battery charge",
            Self::BatteryDischarge => "Battery discharge",
            Self::SelfSufficiency => "Self-sufficiency",
            Self::SelfConsumption => "Self-consumption",
            Self::StateOfCharge => "Battery state of charge",
        }
    }

    const fn kind(self) -> Kind {
        match self {
            Self::SelfSufficiency | Self::SelfConsumption => Kind::Ratio,
            Self::StateOfCharge => Kind::StateOfCharge,
            _ => Kind::Flow,
        }
    }

    /// Windows the metric is exposed for.
    ///
    /// Net grid and battery flows make sense only for the instant power.
    pub fn windows(self) -> EnumSet<Window> {
        match self {
            Self::Grid | Self::Battery | Self::StateOfCharge => EnumSet::only(Window::Current),
            _ => EnumSet::all(),
        }
    }

    /// Flow value in the window's native unit, or a ratio in percent.
    fn extract<Q>(self, flows: &Flows<Q>) -> Option<f64>
    where
        Q: Copy + PartialOrd + std::ops::Neg<Output = Q> + Zero + Into<f64>,
    {
        let flow = match self {
            Self::Solar => flows.solar(),
            Self::Home => flows.home(),
            Self::Grid => flows.grid(),
            Self::Battery => flows.battery(),
            Self::GridExport => flows.export,
            Self::GridPurchase => flows.purchase,
            Self::BatteryCharge => flows.charge,
            Self::BatteryDischarge => flows.discharge,
            Self::SelfSufficiency => {
                return flows.self_sufficiency().map(|it| Percent::from_proportion(it).0);
            }
            Self::SelfConsumption => {
                return flows.self_consumption().map(|it| Percent::from_proportion(it).0);
            }
            Self::StateOfCharge => return None,
        };
        Some(flow.into())
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Kind {
    Flow,
    Ratio,
    StateOfCharge,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Unit {
    Kilowatts,
    KilowattHours,
    Percent,
}

impl Unit {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Kilowatts => Kilowatts::UNIT,
            Self::KilowattHours => KilowattHours::UNIT,
            Self::Percent => Percent::UNIT,
        }
    }

    pub const fn precision(self) -> usize {
        match self {
            Self::Kilowatts | Self::KilowattHours => 3,
            Self::Percent => 1,
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum DeviceClass {
    #[display("power")]
    Power,

    #[display("energy")]
    Energy,

    #[display("battery")]
    Battery,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum StateClass {
    #[display("measurement")]
    Measurement,

    /// Monotonically increasing total, a decrease means a reset.
    #[display("total_increasing")]
    TotalIncreasing,
}

/// Read-only measurement point backed by the coordinator's snapshot.
#[must_use]
#[derive(Clone, Debug)]
pub struct Sensor {
    pub key: String,
    pub name: String,
    pub metric: Metric,
    pub window: Window,
    pub unit: Unit,
    pub device_class: Option<DeviceClass>,
    pub state_class: StateClass,
}

impl Sensor {
    pub fn new(metric: Metric, window: Window) -> Self {
        let is_current = window == Window::Current;
        let (key, name) = match (metric.kind(), window) {
            (Kind::Flow, Window::Current) => {
                (format!("{}_power", metric.slug()), format!("{} power", metric.title()))
            }
            (Kind::Flow, _) => (
                format!("{}_energy_{window}", metric.slug()),
                format!("{} energy {}", metric.title(), window_label(window)),
            ),
            (Kind::Ratio, Window::Current) | (Kind::StateOfCharge, _) => {
                (metric.slug().to_owned(), metric.title().to_owned())
            }
            (Kind::Ratio, _) => (
                format!("{}_{window}", metric.slug()),
                format!("{} {}", metric.title(), window_label(window)),
            ),
        };
        let (unit, device_class) = match metric.kind() {
            Kind::Flow if is_current => (Unit::Kilowatts, Some(DeviceClass::Power)),
            Kind::Flow => (Unit::KilowattHours, Some(DeviceClass::Energy)),
            Kind::Ratio => (Unit::Percent, None),
            Kind::StateOfCharge => (Unit::Percent, Some(DeviceClass::Battery)),
        };
        let state_class = if metric.kind() == Kind::Flow && !is_current {
            StateClass::TotalIncreasing
        } else {
            StateClass::Measurement
        };
        Self { key, name, metric, window, unit, device_class, state_class }
    }

    /// Extract the sensor value from the snapshot in the sensor's unit.
    #[must_use]
    pub fn value(&self, snapshot: &Snapshot) -> Option<f64> {
        match (self.metric, self.window) {
            (Metric::StateOfCharge, _) => snapshot.state_of_charge.map(|it| it.0),
            (metric, Window::Current) => metric.extract(&snapshot.power),
            (metric, window) => snapshot.energy(window).and_then(|flows| metric.extract(flows)),
        }
    }

    /// Sensor state as of the refresh outcome, `None` means unavailable.
    ///
    /// The cached snapshot outlives a failed refresh but its values are stale then.
    #[must_use]
    pub fn state(&self, status: &Status, snapshot: Option<&Snapshot>) -> Option<f64> {
        if status.last_update_success() { self.value(snapshot?) } else { None }
    }
}

const fn window_label(window: Window) -> &'static str {
    match window {
        Window::Current => "now",
        Window::Today => "today",
        Window::Month => "this month",
        Window::Lifetime => "lifetime",
    }
}

/// All exposed sensors in the display order.
pub fn sensors() -> Vec<Sensor> {
    Metric::ALL
        .into_iter()
        .flat_map(|metric| metric.windows().into_iter().map(move |window| Sensor::new(metric, window)))
        .collect()
}

pub fn find(key: &str) -> Option<Sensor> {
    sensors().into_iter().find(|sensor| sensor.key == key)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::Local;
    use itertools::Itertools;

    use super::*;
    use crate::{coordinator::UpdateFailed, prelude::*};

    fn snapshot() -> Snapshot {
        let power = Flows {
            generation: Kilowatts(5.0),
            export: Kilowatts(-1.0),
            purchase: Kilowatts(0.0),
            consumption: Kilowatts(4.0),
            charge: Kilowatts(0.0),
            discharge: Kilowatts(1.0),
        };
        let today = Flows {
            generation: KilowattHours(20.0),
            export: KilowattHours(5.0),
            purchase: KilowattHours(3.0),
            consumption: KilowattHours(12.0),
            charge: KilowattHours(4.0),
            discharge: KilowattHours(2.0),
        };
        Snapshot {
            fetched_at: Local::now(),
            power,
            state_of_charge: Some(Percent(64.0)),
            today: Some(today),
            month: None,
            lifetime: None,
        }
    }

    fn succeeded(snapshot: &Snapshot) -> Status {
        Status {
            last_success_at: Some(snapshot.fetched_at),
            last_error: None,
            consecutive_failures: 0,
        }
    }

    fn value(key: &str) -> Result<Option<f64>> {
        Ok(find(key).with_context(|| format!("no sensor `{key}`"))?.value(&snapshot()))
    }

    #[test]
    fn keys_are_unique() {
        assert!(sensors().iter().map(|sensor| &sensor.key).all_unique());
    }

    #[test]
    fn sensor_count_ok() {
        // 8 flows and 2 ratios per window, minus the net flows outside `current`, plus SOC.
        assert_eq!(sensors().len(), 10 * 4 - 2 * 3 + 1);
    }

    #[test]
    fn power_sensors_ok() -> Result {
        assert_eq!(value("solar_power")?, Some(5.0));
        assert_eq!(value("battery_power")?, Some(-1.0));
        assert_eq!(value("grid_power")?, Some(0.0));
        assert_eq!(value("home_power")?, Some(4.0));
        assert_eq!(value("grid_export_power")?, Some(-1.0));
        assert_eq!(value("battery_discharge_power")?, Some(1.0));
        Ok(())
    }

    #[test]
    fn energy_sensors_ok() -> Result {
        assert_eq!(value("solar_energy_today")?, Some(20.0));
        assert_eq!(value("grid_purchase_energy_today")?, Some(3.0));
        assert_eq!(value("battery_charge_energy_today")?, Some(4.0));
        assert_eq!(value("solar_energy_month")?, None);
        assert_eq!(value("home_energy_lifetime")?, None);
        Ok(())
    }

    #[test]
    fn ratio_sensors_ok() -> Result {
        assert_abs_diff_eq!(value("self_sufficiency")?.context("undefined")?, 100.0);
        assert_abs_diff_eq!(value("self_consumption")?.context("undefined")?, 100.0);
        assert_abs_diff_eq!(value("self_sufficiency_today")?.context("undefined")?, 75.0);
        assert_abs_diff_eq!(value("self_consumption_today")?.context("undefined")?, 75.0);
        Ok(())
    }

    #[test]
    fn state_of_charge_ok() -> Result {
        assert_eq!(value("battery_state_of_charge")?, Some(64.0));
        Ok(())
    }

    #[test]
    fn net_flows_only_for_power() {
        assert!(find("grid_energy_today").is_none());
        assert!(find("battery_energy_lifetime").is_none());
    }

    #[test]
    fn descriptors_ok() -> Result {
        let sensor = find("solar_power").context("no solar power")?;
        assert_eq!(sensor.name, "Solar power");
        assert_eq!(sensor.unit, Unit::Kilowatts);
        assert_eq!(sensor.device_class, Some(DeviceClass::Power));
        assert_eq!(sensor.state_class, StateClass::Measurement);

        let sensor = find("grid_export_energy_month").context("no monthly export")?;
        assert_eq!(sensor.name, "Grid export energy this month");
        assert_eq!(sensor.unit, Unit::KilowattHours);
        assert_eq!(sensor.device_class, Some(DeviceClass::Energy));
        assert_eq!(sensor.state_class, StateClass::TotalIncreasing);

        let sensor = find("battery_state_of_charge").context("no SOC")?;
        assert_eq!(sensor.unit, Unit::Percent);
        assert_eq!(sensor.device_class, Some(DeviceClass::Battery));

        let sensor = find("self_sufficiency_lifetime").context("no lifetime ratio")?;
        assert_eq!(sensor.name, "Self-sufficiency lifetime");
        assert_eq!(sensor.device_class, None);
        Ok(())
    }

    #[test]
    fn available_after_success() -> Result {
        let snapshot = snapshot();
        let status = succeeded(&snapshot);
        let sensor = find("solar_power").context("no solar power")?;
        assert_eq!(sensor.state(&status, Some(&snapshot)), Some(5.0));
        Ok(())
    }

    #[test]
    fn unavailable_after_failure() -> Result {
        let snapshot = snapshot();
        let status = Status {
            last_error: Some(UpdateFailed::new(std::io::Error::other("timed out"))),
            consecutive_failures: 1,
            ..succeeded(&snapshot)
        };
        let sensor = find("solar_power").context("no solar power")?;
        assert_eq!(sensor.state(&status, Some(&snapshot)), None);
        Ok(())
    }

    #[test]
    fn unavailable_without_window() -> Result {
        let snapshot = snapshot();
        let status = succeeded(&snapshot);
        let sensor = find("solar_energy_month").context("no monthly solar")?;
        assert_eq!(sensor.state(&status, Some(&snapshot)), None);
        assert_eq!(sensor.state(&Status::default(), None), None);
        Ok(())
    }
}
