//! End-to-end trivial property sources: battery/network rounding grids and
//! the TLS-endpoint wire contract against a local server.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracelight_entropy::{
    configure_tls_fingerprint, get_battery_info, get_network_information, get_tls_fingerprint,
    TlsFingerprintOptions,
};
use tracelight_host::testing::{StaticBatteryProbe, StaticNetworkProbe};
use tracelight_host::{BatteryReading, ConnectionReading};

#[tokio::test]
async fn battery_fields_land_on_their_grids() {
    let probe = StaticBatteryProbe(Some(BatteryReading {
        level: 0.4321,
        charging: false,
        charging_time: f64::INFINITY,
        discharging_time: 7312.0,
    }));
    let info = get_battery_info(&probe).await;

    assert!(info.supported);
    let level = info.level.unwrap();
    assert!((level * 20.0 - (level * 20.0).round()).abs() < 1e-9, "level must be a 5% step");
    assert_eq!(info.charging_time, None);
    let discharging = info.discharging_time.unwrap();
    assert_eq!(discharging % 60.0, 0.0, "times must be whole minutes");
}

#[tokio::test]
async fn network_rtt_lands_on_25ms_grid() {
    let probe = StaticNetworkProbe(Some(ConnectionReading {
        effective_type: Some("4g".to_string()),
        downlink: Some(2.5),
        rtt: Some(137.0),
        save_data: Some(true),
    }));
    let info = get_network_information(&probe);
    assert_eq!(info.rtt, Some(125.0));
    assert_eq!(info.save_data, Some(true));
}

async fn serve_json_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 2048];
        let _ = socket.read(&mut request).await;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = socket.write_all(response.as_bytes()).await;
    });
    format!("http://{addr}/fp/tls")
}

// One test owns the whole lifecycle because the options record is
// process-wide state.
#[tokio::test]
async fn tls_source_always_resolves() {
    // unconfigured: structured error, no request anywhere
    configure_tls_fingerprint(TlsFingerprintOptions::default());
    let result = get_tls_fingerprint().await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("endpoint not configured"));

    // happy path with camelCase field spellings
    let endpoint = serve_json_once(r#"{"ja3Hash":"771abc","ja3Full":"771,4865-4866","ja4":"t13d1516h2"}"#).await;
    configure_tls_fingerprint(TlsFingerprintOptions {
        endpoint: Some(endpoint),
        timeout: Duration::from_secs(3),
    });
    let result = get_tls_fingerprint().await;
    assert!(result.success, "fetch failed: {:?}", result.error);
    assert_eq!(result.ja3_hash.as_deref(), Some("771abc"));
    assert_eq!(result.ja3_full.as_deref(), Some("771,4865-4866"));
    assert_eq!(result.ja4.as_deref(), Some("t13d1516h2"));

    // silent endpoint: the configured deadline converts to an error record
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let silent_addr = silent.local_addr().unwrap();
    configure_tls_fingerprint(TlsFingerprintOptions {
        endpoint: Some(format!("http://{silent_addr}/fp/tls")),
        timeout: Duration::from_millis(200),
    });
    let result = get_tls_fingerprint().await;
    assert!(!result.success);
    assert!(result.error.is_some());
    drop(silent);
}
