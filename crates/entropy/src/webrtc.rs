//! WebRTC entropy source: private IPs surfaced through ICE gathering.
//!
//! ICE candidate timing is host- and network-dependent, so the collection
//! is a race against a hard one-second deadline: whatever classified
//! addresses have arrived by then are the result. Completion is triggered
//! by the deadline, by end-of-candidates, or by a terminal connection
//! state, and the completion handling is idempotent because those paths
//! race. The peer connection is closed on every path, and the future never
//! fails.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracelight_host::{
    IceConnectionState, IceEvent, IceSession, RtcProvider, RtcSessionAttempt, RtcSessionConfig,
};

/// Hard wall-clock budget for ICE gathering.
pub const ICE_GATHER_DEADLINE: Duration = Duration::from_millis(1000);

lazy_static! {
    static ref IPV4_PATTERN: Regex = Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").unwrap();
    // loose prefilter; std parsing validates whatever it finds
    static ref IPV6_PATTERN: Regex = Regex::new(r"(?i)[0-9a-f:]*:[0-9a-f:]*:[0-9a-f:]+").unwrap();
}

/// Deduplicated local addresses observed during gathering. IPv4 entries are
/// restricted to the private ranges (10/8, 172.16/12, 192.168/16,
/// 169.254/16); IPv6 entries exclude link-local. Public server-reflexive
/// addresses are deliberately discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebRtcIps {
    pub local_ipv4: Vec<String>,
    pub local_ipv6: Vec<String>,
    pub supported: bool,
}

impl WebRtcIps {
    fn empty(supported: bool) -> Self {
        Self {
            local_ipv4: Vec::new(),
            local_ipv6: Vec::new(),
            supported,
        }
    }
}

/// Gathers and classifies ICE candidates, resolving within the deadline
/// under all conditions. Never fails: setup errors yield an empty
/// `supported` record, a missing constructor yields `supported: false`.
pub async fn get_webrtc_ips(provider: &impl RtcProvider) -> WebRtcIps {
    let session = match provider.open_session(&RtcSessionConfig::default()) {
        RtcSessionAttempt::Unsupported => {
            debug!("no peer-connection constructor on this host");
            return WebRtcIps::empty(false);
        }
        RtcSessionAttempt::Failed(err) => {
            warn!("peer-connection setup failed: {err}");
            return WebRtcIps::empty(true);
        }
        RtcSessionAttempt::Started(session) => session,
    };
    gather(session).await
}

async fn gather(mut session: IceSession) -> WebRtcIps {
    let mut seen = HashSet::new();
    let mut result = WebRtcIps::empty(true);
    let deadline = tokio::time::sleep(ICE_GATHER_DEADLINE);
    tokio::pin!(deadline);
    let mut completed = false;
    while !completed {
        tokio::select! {
            _ = &mut deadline => completed = true,
            event = session.next_event() => match event {
                Some(IceEvent::Candidate(line)) => record_candidate(&line, &mut seen, &mut result),
                Some(IceEvent::StateChange(state)) => {
                    completed = matches!(
                        state,
                        IceConnectionState::Completed
                            | IceConnectionState::Failed
                            | IceConnectionState::Closed
                    );
                }
                Some(IceEvent::GatheringComplete) | None => completed = true,
            }
        }
    }
    session.close();
    result
}

fn record_candidate(line: &str, seen: &mut HashSet<IpAddr>, result: &mut WebRtcIps) {
    if line.is_empty() || line.contains(".local") {
        return;
    }
    for found in IPV4_PATTERN.find_iter(line) {
        if let Ok(addr) = found.as_str().parse::<Ipv4Addr>() {
            if is_private_ipv4(addr) && seen.insert(IpAddr::V4(addr)) {
                result.local_ipv4.push(addr.to_string());
            }
        }
    }
    for found in IPV6_PATTERN.find_iter(line) {
        if let Ok(addr) = found.as_str().parse::<Ipv6Addr>() {
            if !is_link_local_ipv6(&addr) && seen.insert(IpAddr::V6(addr)) {
                result.local_ipv6.push(addr.to_string());
            }
        }
    }
}

fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    addr.is_private() || addr.is_link_local()
}

fn is_link_local_ipv6(addr: &Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(lines: &[&str]) -> WebRtcIps {
        let mut seen = HashSet::new();
        let mut result = WebRtcIps::empty(true);
        for line in lines {
            record_candidate(line, &mut seen, &mut result);
        }
        result
    }

    #[test]
    fn keeps_private_ipv4_and_drops_reflexive() {
        let result = classify(&[
            "candidate:842163049 1 udp 2122260223 192.168.1.34 47998 typ host generation 0",
            "candidate:1876313031 1 udp 1686052607 203.0.113.7 47998 typ srflx raddr 192.168.1.34 rport 47998",
            "candidate:99 1 udp 2122260223 10.0.0.8 41234 typ host",
            "candidate:98 1 udp 2122260223 169.254.11.2 41234 typ host",
        ]);
        assert_eq!(
            result.local_ipv4,
            vec!["192.168.1.34", "10.0.0.8", "169.254.11.2"]
        );
        assert!(result.local_ipv6.is_empty());
    }

    #[test]
    fn deduplicates_across_candidate_lines() {
        let result = classify(&[
            "candidate:1 1 udp 2122260223 192.168.1.34 47998 typ host",
            "candidate:1 2 udp 2122260222 192.168.1.34 47999 typ host",
        ]);
        assert_eq!(result.local_ipv4, vec!["192.168.1.34"]);
    }

    #[test]
    fn drops_mdns_and_link_local_ipv6() {
        let result = classify(&[
            "candidate:4 1 udp 2122262783 9b36eaac-bb2e-49bb-b4e4-1f0ad15fee11.local 54596 typ host",
            "candidate:5 1 udp 2122262783 fe80::1c2a:9bff:fe5d:12 54596 typ host",
            "candidate:6 1 udp 2122262783 2001:db8:85a3::8a2e:370:7334 54596 typ host",
        ]);
        assert!(result.local_ipv4.is_empty());
        assert_eq!(result.local_ipv6, vec!["2001:db8:85a3::8a2e:370:7334"]);
    }

    #[test]
    fn ignores_empty_and_garbage_lines() {
        let result = classify(&["", "end-of-candidates", "candidate:1 1 udp 999 not-an-ip 1 typ host"]);
        assert!(result.local_ipv4.is_empty());
        assert!(result.local_ipv6.is_empty());
    }
}
