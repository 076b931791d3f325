//! Peer-connection capability.
//!
//! The host performs the ordered vendor-prefixed constructor search and, on
//! success, runs the whole trigger dance (data channel, local offer) before
//! streaming ICE events out. The collector only consumes events under its
//! deadline and closes the session on every completion path.

use log::debug;
use thiserror::Error;
use tokio::sync::mpsc;

/// Configuration for one gathering session.
#[derive(Debug, Clone)]
pub struct RtcSessionConfig {
    /// ICE server URLs, e.g. `stun:stun.l.google.com:19302`.
    pub ice_servers: Vec<String>,
}

impl Default for RtcSessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
        }
    }
}

/// `RTCPeerConnection.iceConnectionState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
}

/// Events produced while ICE gathering runs.
#[derive(Debug, Clone, PartialEq)]
pub enum IceEvent {
    /// A candidate line, e.g.
    /// `candidate:842163049 1 udp 1677729535 192.168.1.34 47998 typ host`.
    Candidate(String),
    StateChange(IceConnectionState),
    GatheringComplete,
}

#[derive(Error, Debug)]
pub enum RtcError {
    #[error("peer connection setup failed: {0}")]
    Setup(String),

    #[error("data channel failed: {0}")]
    DataChannel(String),

    #[error("local offer failed: {0}")]
    Offer(String),
}

/// A live gathering session: an event stream plus the close hook for the
/// underlying peer connection. Closing is idempotent and also happens on
/// drop, so no completion path can leak the connection.
pub struct IceSession {
    events: mpsc::UnboundedReceiver<IceEvent>,
    closer: Option<Box<dyn FnOnce() + Send>>,
}

impl IceSession {
    pub fn new(
        events: mpsc::UnboundedReceiver<IceEvent>,
        closer: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            closer: Some(Box::new(closer)),
        }
    }

    /// The next ICE event, or `None` once the host side has gone away.
    pub async fn next_event(&mut self) -> Option<IceEvent> {
        self.events.recv().await
    }

    /// Closes the peer connection. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(closer) = self.closer.take() {
            debug!("closing peer connection");
            closer();
        }
    }
}

impl Drop for IceSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Outcome of the vendor-prefixed constructor search plus session setup.
pub enum RtcSessionAttempt {
    /// No peer-connection constructor exists on this host.
    Unsupported,
    /// A constructor exists but setup threw.
    Failed(RtcError),
    Started(IceSession),
}

pub trait RtcProvider {
    fn open_session(&self, config: &RtcSessionConfig) -> RtcSessionAttempt;
}
