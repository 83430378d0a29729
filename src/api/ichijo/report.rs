use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::{
    quantity::percent::Percent,
    snapshot::{Flows, Snapshot, Window},
};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed JSON payload")]
    Json(#[from] serde_json::Error),

    #[error("`{window}.{metric}` is not a finite number")]
    NotFinite { window: Window, metric: &'static str },
}

/// Decrypted `current_data` response.
#[derive(Deserialize)]
pub struct Report {
    current: Current,
    today: Option<RawFlows>,
    month: Option<RawFlows>,
    lifetime: Option<RawFlows>,
}

impl FromStr for Report {
    type Err = ParseError;

    fn from_str(plaintext: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(plaintext)?)
    }
}

impl Report {
    pub fn into_snapshot(self, fetched_at: DateTime<Local>) -> Result<Snapshot, ParseError> {
        let state_of_charge = self
            .current
            .state_of_charge
            .map(|value| finite(Window::Current, "SOC", value).map(Percent))
            .transpose()?;
        Ok(Snapshot {
            fetched_at,
            power: self.current.flows.into_flows(Window::Current)?,
            state_of_charge,
            today: self.today.map(|flows| flows.into_flows(Window::Today)).transpose()?,
            month: self.month.map(|flows| flows.into_flows(Window::Month)).transpose()?,
            lifetime: self.lifetime.map(|flows| flows.into_flows(Window::Lifetime)).transpose()?,
        })
    }
}

#[serde_as]
#[derive(Deserialize)]
struct Current {
    #[serde(flatten)]
    flows: RawFlows,

    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(rename = "SOC")]
    state_of_charge: Option<f64>,
}

/// The firmware sends the values as strings, but plain numbers are accepted too.
#[serde_as]
#[derive(Deserialize)]
struct RawFlows {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(rename = "Genaration")]
    generation: f64,

    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(rename = "Export")]
    export: f64,

    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(rename = "Purchase")]
    purchase: f64,

    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(rename = "Consumption")]
    consumption: f64,

    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(rename = "Charge")]
    charge: f64,

    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(rename = "Discharge")]
    discharge: f64,
}

impl RawFlows {
    fn into_flows<Q: From<f64>>(self, window: Window) -> Result<Flows<Q>, ParseError> {
        Ok(Flows {
            generation: finite(window, "Genaration", self.generation)?.into(),
            export: finite(window, "Export", self.export)?.into(),
            purchase: finite(window, "Purchase", self.purchase)?.into(),
            consumption: finite(window, "Consumption", self.consumption)?.into(),
            charge: finite(window, "Charge", self.charge)?.into(),
            discharge: finite(window, "Discharge", self.discharge)?.into(),
        })
    }
}

fn finite(window: Window, metric: &'static str, value: f64) -> Result<f64, ParseError> {
    if value.is_finite() { Ok(value) } else { Err(ParseError::NotFinite { window, metric }) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        prelude::*,
        quantity::{energy::KilowattHours, power::Kilowatts},
    };

    fn parse(plaintext: &str) -> Result<Snapshot, ParseError> {
        plaintext.parse::<Report>()?.into_snapshot(Local::now())
    }

    #[test]
    fn current_only_ok() -> Result {
        // language=json
        let plaintext = r#"{"current":{"Genaration":"5.0","Export":"-1.0","Purchase":"0.0","Consumption":"4.0","Charge":"0.0","Discharge":"1.0"}}"#;
        let snapshot = parse(plaintext)?;
        assert_eq!(snapshot.power.solar(), Kilowatts(5.0));
        assert_eq!(snapshot.power.battery(), Kilowatts(-1.0));
        assert_eq!(snapshot.power.grid(), Kilowatts(0.0));
        assert_eq!(snapshot.power.home(), Kilowatts(4.0));
        assert_eq!(snapshot.power.export, Kilowatts(-1.0));
        assert_eq!(snapshot.state_of_charge, None);
        assert_eq!(snapshot.today, None);
        assert_eq!(snapshot.lifetime, None);
        Ok(())
    }

    #[test]
    fn all_windows_ok() -> Result {
        // language=json
        let plaintext = r#"{
            "current": {
                "Genaration": "2.5",
                "Export": "0.5",
                "Purchase": "0.0",
                "Consumption": "1.2",
                "Charge": "0.8",
                "Discharge": "0.0",
                "SOC": "76"
            },
            "today": {
                "Genaration": "18.4",
                "Export": "6.1",
                "Purchase": "2.3",
                "Consumption": "11.9",
                "Charge": "4.0",
                "Discharge": "3.2"
            },
            "month": {
                "Genaration": 412.0,
                "Export": 120.5,
                "Purchase": 80.25,
                "Consumption": 350.0,
                "Charge": 90.0,
                "Discharge": 85.0
            },
            "lifetime": {
                "Genaration": "15234.7",
                "Export": "4021.0",
                "Purchase": "3310.2",
                "Consumption": "13880.1",
                "Charge": "2900.4",
                "Discharge": "2711.9"
            }
        }"#;
        let snapshot = parse(plaintext)?;
        assert_eq!(snapshot.power.grid(), Kilowatts(-0.5));
        assert_eq!(snapshot.power.battery(), Kilowatts(0.8));
        assert_eq!(snapshot.state_of_charge, Some(Percent(76.0)));
        let today = snapshot.today.context("no today")?;
        assert_eq!(today.generation, KilowattHours(18.4));
        assert_eq!(today.discharge, KilowattHours(3.2));
        let month = snapshot.month.context("no month")?;
        assert_eq!(month.purchase, KilowattHours(80.25));
        let lifetime = snapshot.lifetime.context("no lifetime")?;
        assert_eq!(lifetime.consumption, KilowattHours(13880.1));
        Ok(())
    }

    #[test]
    fn extra_fields_ignored() -> Result {
        // language=json
        let plaintext = r#"{"status":"ok","current":{"Genaration":"1","Export":"0","Purchase":"0","Consumption":"1","Charge":"0","Discharge":"0","Temperature":"31.5"}}"#;
        let snapshot = parse(plaintext)?;
        assert_eq!(snapshot.power.home(), Kilowatts(1.0));
        Ok(())
    }

    #[test]
    fn missing_metric_fails() {
        // language=json
        let plaintext = r#"{"current":{"Genaration":"5.0","Export":"-1.0","Purchase":"0.0","Consumption":"4.0","Charge":"0.0"}}"#;
        assert!(matches!(parse(plaintext), Err(ParseError::Json(_))));
    }

    #[test]
    fn missing_current_window_fails() {
        // language=json
        let plaintext = r#"{"today":{"Genaration":"5.0","Export":"-1.0","Purchase":"0.0","Consumption":"4.0","Charge":"0.0","Discharge":"1.0"}}"#;
        assert!(matches!(parse(plaintext), Err(ParseError::Json(_))));
    }

    #[test]
    fn incomplete_optional_window_fails() {
        // language=json
        let plaintext = r#"{"current":{"Genaration":"5.0","Export":"-1.0","Purchase":"0.0","Consumption":"4.0","Charge":"0.0","Discharge":"1.0"},"today":{"Genaration":"5.0"}}"#;
        assert!(matches!(parse(plaintext), Err(ParseError::Json(_))));
    }

    #[test]
    fn non_numeric_metric_fails() {
        // language=json
        let plaintext = r#"{"current":{"Genaration":"five","Export":"-1.0","Purchase":"0.0","Consumption":"4.0","Charge":"0.0","Discharge":"1.0"}}"#;
        assert!(matches!(parse(plaintext), Err(ParseError::Json(_))));
    }

    #[test]
    fn non_finite_metric_fails() {
        // language=json
        let plaintext = r#"{"current":{"Genaration":"5.0","Export":"NaN","Purchase":"0.0","Consumption":"4.0","Charge":"0.0","Discharge":"1.0"}}"#;
        assert!(matches!(
            parse(plaintext),
            Err(ParseError::NotFinite { window: Window::Current, metric: "Export" }),
        ));
    }

    #[test]
    fn not_json_fails() {
        assert!(matches!(parse("current_data"), Err(ParseError::Json(_))));
    }
}
