//! TLS-fingerprint property source.
//!
//! The only source that leaves the machine: a GET against a
//! caller-configured endpoint that echoes the connection's JA3/JA4 values
//! as JSON. The endpoint contract is opaque and permissive — any subset of
//! the known field spellings may appear. The options record is the one
//! piece of process-wide state in the library: set before first use,
//! replaced wholesale on every reconfiguration, read only here.

use std::time::Duration;

use lazy_static::lazy_static;
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Endpoint configuration. No endpoint ships by default; an unconfigured
/// source resolves with a structured error instead of phoning anywhere.
#[derive(Debug, Clone)]
pub struct TlsFingerprintOptions {
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for TlsFingerprintOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

lazy_static! {
    static ref OPTIONS: RwLock<TlsFingerprintOptions> =
        RwLock::new(TlsFingerprintOptions::default());
}

/// Replaces the process-wide options record.
pub fn configure_tls_fingerprint(options: TlsFingerprintOptions) {
    debug!(
        "tls fingerprint endpoint reconfigured (endpoint set: {}, timeout {:?})",
        options.endpoint.is_some(),
        options.timeout
    );
    *OPTIONS.write() = options;
}

/// Accepts every spelling the deployed endpoints use for the same fields.
#[derive(Debug, Default, Deserialize)]
struct EndpointPayload {
    #[serde(default, alias = "ja3Hash", alias = "ja3")]
    ja3_hash: Option<String>,
    #[serde(default, alias = "ja3Full", alias = "ja3_string")]
    ja3_full: Option<String>,
    #[serde(default)]
    ja4: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsFingerprint {
    pub ja3_hash: Option<String>,
    pub ja3_full: Option<String>,
    pub ja4: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Error, Debug)]
enum TlsFetchError {
    #[error("endpoint not configured")]
    NotConfigured,

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Fetches the TLS fingerprint from the configured endpoint. Always
/// resolves: timeouts, non-2xx statuses, and parse failures come back as
/// `success: false` records.
pub async fn get_tls_fingerprint() -> TlsFingerprint {
    let options = OPTIONS.read().clone();
    match fetch_payload(&options).await {
        Ok(payload) => TlsFingerprint {
            ja3_hash: payload.ja3_hash,
            ja3_full: payload.ja3_full,
            ja4: payload.ja4,
            success: true,
            error: None,
        },
        Err(err) => {
            warn!("tls fingerprint fetch failed: {err}");
            TlsFingerprint {
                ja3_hash: None,
                ja3_full: None,
                ja4: None,
                success: false,
                error: Some(err.to_string()),
            }
        }
    }
}

async fn fetch_payload(options: &TlsFingerprintOptions) -> Result<EndpointPayload, TlsFetchError> {
    let endpoint = options
        .endpoint
        .as_deref()
        .ok_or(TlsFetchError::NotConfigured)?;
    let endpoint = Url::parse(endpoint)?;
    let client = reqwest::Client::builder().timeout(options.timeout).build()?;
    let response = client
        .get(endpoint)
        .header(reqwest::header::CACHE_CONTROL, "no-store")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(TlsFetchError::Status(response.status()));
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snake_case_fields() {
        let payload: EndpointPayload =
            serde_json::from_str(r#"{"ja3_hash": "abc", "ja3_full": "771,4865", "ja4": "t13d"}"#)
                .unwrap();
        assert_eq!(payload.ja3_hash.as_deref(), Some("abc"));
        assert_eq!(payload.ja3_full.as_deref(), Some("771,4865"));
        assert_eq!(payload.ja4.as_deref(), Some("t13d"));
    }

    #[test]
    fn parses_camel_case_and_short_aliases() {
        let payload: EndpointPayload =
            serde_json::from_str(r#"{"ja3Hash": "abc", "ja3Full": "771"}"#).unwrap();
        assert_eq!(payload.ja3_hash.as_deref(), Some("abc"));
        assert_eq!(payload.ja3_full.as_deref(), Some("771"));

        let payload: EndpointPayload =
            serde_json::from_str(r#"{"ja3": "abc", "ja3_string": "771"}"#).unwrap();
        assert_eq!(payload.ja3_hash.as_deref(), Some("abc"));
        assert_eq!(payload.ja3_full.as_deref(), Some("771"));
    }

    #[test]
    fn tolerates_partial_and_unknown_fields() {
        let payload: EndpointPayload =
            serde_json::from_str(r#"{"ja4": "t13d", "proto": "h2"}"#).unwrap();
        assert_eq!(payload.ja3_hash, None);
        assert_eq!(payload.ja4.as_deref(), Some("t13d"));
    }
}
