//! Battery property source.
//!
//! Raw battery values change every second and would destroy fingerprint
//! stability, so the shim rounds: level to the nearest 5%, the time fields
//! to the nearest minute. Non-finite times (the host's way of saying
//! "unknown") become unobservable.

use serde::{Deserialize, Serialize};
use tracelight_host::BatteryProbe;

use crate::stabilize::round_to_multiple;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryInfo {
    pub supported: bool,
    /// Multiple of 0.05 when observable.
    pub level: Option<f64>,
    pub charging: Option<bool>,
    /// Multiple of 60 seconds when observable.
    pub charging_time: Option<f64>,
    /// Multiple of 60 seconds when observable.
    pub discharging_time: Option<f64>,
}

impl BatteryInfo {
    fn unsupported() -> Self {
        Self {
            supported: false,
            level: None,
            charging: None,
            charging_time: None,
            discharging_time: None,
        }
    }
}

pub async fn get_battery_info(probe: &impl BatteryProbe) -> BatteryInfo {
    let Some(reading) = probe.read().await else {
        return BatteryInfo::unsupported();
    };
    BatteryInfo {
        supported: true,
        level: finite(reading.level).map(|v| round_to_multiple(v, 0.05)),
        charging: Some(reading.charging),
        charging_time: finite(reading.charging_time).map(|v| round_to_multiple(v, 60.0)),
        discharging_time: finite(reading.discharging_time).map(|v| round_to_multiple(v, 60.0)),
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
