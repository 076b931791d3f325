//! Host-environment seam for the tracelight entropy collectors.
//!
//! Every browser API the collectors consume is pinned behind a trait in this
//! crate: canvas surfaces, `matchMedia`, offline audio rendering, peer
//! connections, and the battery/network property probes. Collectors stay
//! pure functions of these capabilities, which keeps the stabilization
//! algorithms testable off-browser; a deployment binds the traits to the
//! real host (e.g. over `web-sys`).
//!
//! The `testing` feature exposes deterministic in-memory hosts — including a
//! software rasterizer with configurable readback-noise models — used by the
//! collector test suites.

mod audio;
mod canvas;
mod environment;
mod media;
mod probes;
mod rtc;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export the capability surface from the modules
pub use audio::{AudioRenderError, AudioRenderer, BiquadType, OscillatorGraph, OscillatorType};
pub use canvas::{Canvas, CanvasError, CanvasProvider, CompositeMode, FillRule, Pixmap};
pub use environment::{EnvironmentClass, EnvironmentOracle, UserAgentOracle};
pub use media::{MediaFeature, MediaMatcher, MediaQuery};
pub use probes::{BatteryProbe, BatteryReading, ConnectionReading, NetworkProbe};
pub use rtc::{
    IceConnectionState, IceEvent, IceSession, RtcError, RtcProvider, RtcSessionAttempt,
    RtcSessionConfig,
};
