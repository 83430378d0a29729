use std::{
    fmt::{Display, Formatter},
    ops::Neg,
};

use chrono::{DateTime, Local};
use enumset::EnumSetType;

use crate::quantity::{Zero, energy::KilowattHours, percent::Percent, power::Kilowatts};

/// Device time window.
#[derive(Debug, EnumSetType)]
pub enum Window {
    Current,
    Today,
    Month,
    Lifetime,
}

impl Window {
    pub const fn key(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Today => "today",
            Self::Month => "month",
            Self::Lifetime => "lifetime",
        }
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Latest successfully parsed device readings.
///
/// Replaced as a whole on every successful poll and never mutated in place.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub fetched_at: DateTime<Local>,

    /// Instant power flows from the `current` window.
    pub power: Flows<Kilowatts>,

    pub state_of_charge: Option<Percent>,

    pub today: Option<Flows<KilowattHours>>,
    pub month: Option<Flows<KilowattHours>>,
    pub lifetime: Option<Flows<KilowattHours>>,
}

impl Snapshot {
    /// Energy totals of the window, `None` for [`Window::Current`] which carries power.
    pub const fn energy(&self, window: Window) -> Option<&Flows<KilowattHours>> {
        match window {
            Window::Current => None,
            Window::Today => self.today.as_ref(),
            Window::Month => self.month.as_ref(),
            Window::Lifetime => self.lifetime.as_ref(),
        }
    }
}

/// Raw device metrics of a single time window.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Flows<Q> {
    pub generation: Q,
    pub export: Q,
    pub purchase: Q,
    pub consumption: Q,
    pub charge: Q,
    pub discharge: Q,
}

impl<Q> Flows<Q>
where
    Q: Copy + PartialOrd + Neg<Output = Q> + Zero + Into<f64>,
{
    pub fn solar(&self) -> Q {
        self.generation
    }

    pub fn home(&self) -> Q {
        self.consumption
    }

    /// Net grid flow: positive when importing, negative when exporting.
    pub fn grid(&self) -> Q {
        if self.export > Q::ZERO { -self.export } else { self.purchase }
    }

    /// Net battery flow: positive when charging, negative when discharging.
    pub fn battery(&self) -> Q {
        if self.discharge > Q::ZERO { -self.discharge } else { self.charge }
    }

    /// Share of the consumption that was not purchased from the grid.
    #[must_use]
    pub fn self_sufficiency(&self) -> Option<f64> {
        let consumption: f64 = self.consumption.into();
        let purchase: f64 = self.purchase.into();
        (consumption > 0.0).then(|| (1.0 - purchase / consumption).clamp(0.0, 1.0))
    }

    /// Share of the generation that was not exported to the grid.
    #[must_use]
    pub fn self_consumption(&self) -> Option<f64> {
        let generation: f64 = self.generation.into();
        let export: f64 = self.export.into();
        (generation > 0.0).then(|| ((generation - export.max(0.0)) / generation).clamp(0.0, 1.0))
    }
}
