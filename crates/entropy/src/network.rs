//! Network-information property source.
//!
//! A value-extraction shim over the (possibly vendor-prefixed) connection
//! object; the host-side probe walks the prefixes. Only `rtt` needs
//! stabilizing — it is rounded to the nearest 25 ms.

use serde::{Deserialize, Serialize};
use tracelight_host::NetworkProbe;

use crate::stabilize::round_to_multiple;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInformation {
    pub supported: bool,
    pub effective_type: Option<String>,
    pub downlink: Option<f64>,
    /// Multiple of 25 ms when observable.
    pub rtt: Option<f64>,
    pub save_data: Option<bool>,
}

pub fn get_network_information(probe: &impl NetworkProbe) -> NetworkInformation {
    let Some(reading) = probe.read() else {
        return NetworkInformation {
            supported: false,
            effective_type: None,
            downlink: None,
            rtt: None,
            save_data: None,
        };
    };
    NetworkInformation {
        supported: true,
        effective_type: reading.effective_type,
        downlink: reading.downlink,
        rtt: reading
            .rtt
            .filter(|v| v.is_finite())
            .map(|v| round_to_multiple(v, 25.0)),
        save_data: reading.save_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelight_host::testing::StaticNetworkProbe;
    use tracelight_host::ConnectionReading;

    #[test]
    fn rounds_rtt_to_25ms_grid() {
        let probe = StaticNetworkProbe(Some(ConnectionReading {
            effective_type: Some("4g".to_string()),
            downlink: Some(10.0),
            rtt: Some(63.0),
            save_data: Some(false),
        }));
        let info = get_network_information(&probe);
        assert!(info.supported);
        assert_eq!(info.rtt, Some(75.0));
        assert_eq!(info.effective_type.as_deref(), Some("4g"));
    }

    #[test]
    fn absent_connection_object() {
        let info = get_network_information(&StaticNetworkProbe(None));
        assert!(!info.supported);
        assert_eq!(info.rtt, None);
    }
}
