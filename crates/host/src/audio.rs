//! Offline audio rendering capability.
//!
//! The audio collector fixes one oscillator-through-biquad graph and asks
//! the host to render it; the host owns the DSP (in a browser this is an
//! `OfflineAudioContext`). Rendering may suspend for a long time on broken
//! hosts, which is why the collector wraps the call in a memoized producer
//! instead of rendering eagerly.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Oscillator waveforms, as in `OscillatorNode.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OscillatorType {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Biquad filter classes, as in `BiquadFilterNode.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiquadType {
    Lowpass,
    Highpass,
    Bandpass,
    Allpass,
    Notch,
    Peaking,
}

/// The fixed offline graph: one oscillator driven through one biquad
/// filter, rendered mono for `length` frames at `sample_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorGraph {
    pub sample_rate: u32,
    pub length: u32,
    pub oscillator: OscillatorType,
    pub frequency: f64,
    pub filter: BiquadType,
    pub filter_frequency: f64,
    pub filter_q: f64,
}

#[derive(Error, Debug)]
pub enum AudioRenderError {
    #[error("audio api unavailable")]
    Unsupported,

    #[error("offline context suspended")]
    Suspended,

    #[error("rendering failed: {0}")]
    Render(String),
}

/// Renders the fixed graph to a mono sample buffer of `graph.length`
/// frames. The returned future is the collector's only suspension point.
pub trait AudioRenderer: Send + Sync {
    fn render(&self, graph: &OscillatorGraph) -> BoxFuture<'static, Result<Vec<f32>, AudioRenderError>>;
}
