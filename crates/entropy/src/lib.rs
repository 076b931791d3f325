//! Entropy sources for browser fingerprinting, with the stabilization
//! algorithms that keep them reproducible on hosts that poison their APIs.
//!
//! Each source is a pure function of the host environment (pinned behind
//! the `tracelight-host` traits) returning one high-entropy signal. Sources
//! are leaves: they do not compose with each other, and callers may run
//! them in parallel. The load-bearing contract is that **no source ever
//! fails**: every code path terminates in a structured value of the
//! declared result type, with `Unsupported`/`Unstable` sentinels and
//! `success=false` records standing in for errors.
//!
//! The interesting machinery is the anti-anti-fingerprinting substrate:
//!
//! - the 3×3 canvas-scaling exploit that forces WebKit's
//!   neighbourhood-clamped readback noise back to zero
//!   ([`get_canvas_fingerprint`]),
//! - the memoizing audio producer that trades cross-page-load determinism
//!   for per-session stability on noise-injecting hosts
//!   ([`get_audio_fingerprint`]),
//! - the media-query bisection that reconstructs viewport dimensions
//!   without reading `window.screen` ([`get_screen_media_queries`]),
//! - the deadline-bounded ICE race that surfaces private IPs
//!   ([`get_webrtc_ips`]).

mod audio;
mod battery;
mod canvas;
mod error;
mod network;
mod screen;
mod stabilize;
mod tls;
mod webrtc;

// Re-export the source surface from the modules
pub use audio::{
    fingerprint_graph, get_audio_fingerprint, AudioFingerprint, AudioFingerprintProducer,
};
pub use battery::{get_battery_info, BatteryInfo};
pub use canvas::{get_canvas_fingerprint, CanvasFingerprint, ImageSignal};
pub use network::{get_network_information, NetworkInformation};
pub use screen::{
    get_screen_media_queries, DimensionBracket, DisplayMode, HoverCapability, Orientation,
    OverflowBlock, OverflowInline, PointerAccuracy, Scripting, ScreenMediaQueries,
    UpdateFrequency,
};
pub use stabilize::{round_to_multiple, MemoizedProducer};
pub use tls::{
    configure_tls_fingerprint, get_tls_fingerprint, TlsFingerprint, TlsFingerprintOptions,
};
pub use webrtc::{get_webrtc_ips, WebRtcIps, ICE_GATHER_DEADLINE};
