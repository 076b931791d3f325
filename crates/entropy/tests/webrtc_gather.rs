//! End-to-end ICE gathering: deadline, early completion, classification,
//! and the connection-always-closed guarantee. Clocks are paused, so the
//! one-second deadline costs no wall time and timing assertions are exact.

use std::time::Duration;

use tracelight_entropy::{get_webrtc_ips, ICE_GATHER_DEADLINE};
use tracelight_host::testing::{MockRtcProvider, RtcScript};
use tracelight_host::{IceConnectionState, IceEvent};

fn candidate(line: &str) -> IceEvent {
    IceEvent::Candidate(line.to_string())
}

#[tokio::test(start_paused = true)]
async fn missing_constructor_resolves_immediately() {
    let provider = MockRtcProvider::unsupported();
    let started = tokio::time::Instant::now();
    let result = get_webrtc_ips(&provider).await;
    assert!(started.elapsed() < Duration::from_millis(10));
    assert!(!result.supported);
    assert!(result.local_ipv4.is_empty());
    assert!(result.local_ipv6.is_empty());
}

#[tokio::test(start_paused = true)]
async fn setup_failure_resolves_supported_but_empty() {
    let provider = MockRtcProvider::new(RtcScript::SetupFailure("no datachannel".to_string()));
    let result = get_webrtc_ips(&provider).await;
    assert!(result.supported);
    assert!(result.local_ipv4.is_empty());
    assert!(result.local_ipv6.is_empty());
}

#[tokio::test(start_paused = true)]
async fn classifies_and_completes_on_end_of_candidates() {
    let provider = MockRtcProvider::new(RtcScript::Events(vec![
        (
            Duration::from_millis(10),
            candidate("candidate:1 1 udp 2122260223 192.168.1.34 47998 typ host"),
        ),
        (
            Duration::from_millis(20),
            candidate("candidate:2 1 udp 2122262783 2001:db8:85a3::8a2e:370:7334 54596 typ host"),
        ),
        (
            Duration::from_millis(30),
            candidate("candidate:3 1 udp 1686052607 203.0.113.7 47998 typ srflx raddr 192.168.1.34 rport 47998"),
        ),
        (Duration::from_millis(40), IceEvent::GatheringComplete),
    ]));

    let started = tokio::time::Instant::now();
    let result = get_webrtc_ips(&provider).await;

    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(result.supported);
    assert_eq!(result.local_ipv4, vec!["192.168.1.34"]);
    assert_eq!(result.local_ipv6, vec!["2001:db8:85a3::8a2e:370:7334"]);
    assert!(provider.was_closed(), "peer connection must be closed");
}

#[tokio::test(start_paused = true)]
async fn deadline_returns_partial_results() {
    let provider = MockRtcProvider::new(RtcScript::Events(vec![
        (
            Duration::from_millis(100),
            candidate("candidate:1 1 udp 2122260223 10.1.2.3 47998 typ host"),
        ),
        // this one arrives after the deadline and must not appear
        (
            Duration::from_millis(1500),
            candidate("candidate:2 1 udp 2122260223 10.9.9.9 47998 typ host"),
        ),
    ]));

    let started = tokio::time::Instant::now();
    let result = get_webrtc_ips(&provider).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= ICE_GATHER_DEADLINE);
    assert!(elapsed < Duration::from_millis(1100));
    assert_eq!(result.local_ipv4, vec!["10.1.2.3"]);
    assert!(provider.was_closed());
}

#[tokio::test(start_paused = true)]
async fn terminal_state_change_completes_early() {
    let provider = MockRtcProvider::new(RtcScript::Events(vec![
        (
            Duration::from_millis(5),
            candidate("candidate:1 1 udp 2122260223 172.16.0.5 47998 typ host"),
        ),
        (
            Duration::from_millis(10),
            IceEvent::StateChange(IceConnectionState::Completed),
        ),
    ]));

    let started = tokio::time::Instant::now();
    let result = get_webrtc_ips(&provider).await;

    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(result.local_ipv4, vec!["172.16.0.5"]);
    assert!(provider.was_closed());
}

#[tokio::test(start_paused = true)]
async fn non_terminal_state_changes_keep_gathering() {
    let provider = MockRtcProvider::new(RtcScript::Events(vec![
        (
            Duration::from_millis(5),
            IceEvent::StateChange(IceConnectionState::Checking),
        ),
        (
            Duration::from_millis(50),
            candidate("candidate:1 1 udp 2122260223 192.168.7.7 47998 typ host"),
        ),
        (Duration::from_millis(60), IceEvent::GatheringComplete),
    ]));

    let result = get_webrtc_ips(&provider).await;
    assert_eq!(result.local_ipv4, vec!["192.168.7.7"]);
}

#[tokio::test(start_paused = true)]
async fn mdns_and_link_local_candidates_are_dropped() {
    let provider = MockRtcProvider::new(RtcScript::Events(vec![
        (
            Duration::from_millis(5),
            candidate("candidate:4 1 udp 2122262783 9b36eaac-bb2e-49bb-b4e4-1f0ad15fee11.local 54596 typ host"),
        ),
        (
            Duration::from_millis(6),
            candidate("candidate:5 1 udp 2122262783 fe80::1c2a:9bff:fe5d:12 54596 typ host"),
        ),
        (Duration::from_millis(7), IceEvent::GatheringComplete),
    ]));

    let result = get_webrtc_ips(&provider).await;
    assert!(result.local_ipv4.is_empty());
    assert!(result.local_ipv6.is_empty());
}
