//! Battery and network-information probes.
//!
//! Value-extraction shims: `None` means the API is absent on this host
//! (including misses across the vendor-prefixed `connection` variants,
//! which the probe implementation is expected to walk in order).

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Raw `BatteryManager` snapshot. Times are seconds and may be non-finite,
/// exactly as the host reports them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub level: f64,
    pub charging: bool,
    pub charging_time: f64,
    pub discharging_time: f64,
}

/// `navigator.getBattery()` seam; the read resolves `None` when the API is
/// missing.
pub trait BatteryProbe {
    fn read(&self) -> BoxFuture<'static, Option<BatteryReading>>;
}

/// Raw `NetworkInformation` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionReading {
    pub effective_type: Option<String>,
    pub downlink: Option<f64>,
    pub rtt: Option<f64>,
    pub save_data: Option<bool>,
}

/// `navigator.connection` seam (with `mozConnection`/`webkitConnection`
/// fallbacks host-side).
pub trait NetworkProbe {
    fn read(&self) -> Option<ConnectionReading>;
}
