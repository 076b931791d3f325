//! Audio entropy source.
//!
//! A fixed oscillator-through-biquad graph is rendered offline and reduced
//! to one scalar. Two host defects shape the design:
//!
//! - Mobile WebKit before version 12 suspends the offline context
//!   indefinitely outside a user gesture, so those hosts short-circuit to
//!   [`AudioFingerprint::KnownForSuspending`] without ever touching the
//!   audio API.
//! - Safari 17+ and Samsung Internet 26+ inject sample noise, so the raw
//!   scalar is not reproducible across renders. The source therefore hands
//!   back a *producer* instead of a value: the pipeline runs on the first
//!   `get` and the result is memoized, trading cross-page-load determinism
//!   for per-session stability. That trade is deliberate.

use std::sync::Arc;

use log::{debug, warn};
use tracelight_host::{
    AudioRenderer, BiquadType, EnvironmentClass, OscillatorGraph, OscillatorType,
};

use crate::stabilize::MemoizedProducer;

const SAMPLE_RATE: u32 = 44_100;
const RENDER_FRAMES: u32 = 5_000;

/// The reduction sums |sample| over the buffer tail, past the filter's
/// transient.
const REDUCTION_WINDOW_START: usize = 4_500;

/// The fixed graph every implementation must render to yield comparable
/// scalars.
pub fn fingerprint_graph() -> OscillatorGraph {
    OscillatorGraph {
        sample_rate: SAMPLE_RATE,
        length: RENDER_FRAMES,
        oscillator: OscillatorType::Triangle,
        frequency: 10_000.0,
        filter: BiquadType::Allpass,
        filter_frequency: 1_000.0,
        filter_q: 1.0,
    }
}

/// Audio source result: either the environment is known to hang the
/// pipeline, or a producer that yields the (memoized) scalar.
pub enum AudioFingerprint {
    /// Mobile WebKit < 12: the offline context would suspend forever, so no
    /// work is attempted.
    KnownForSuspending,
    Producer(AudioFingerprintProducer),
}

impl AudioFingerprint {
    pub fn as_producer(&self) -> Option<&AudioFingerprintProducer> {
        match self {
            AudioFingerprint::Producer(producer) => Some(producer),
            AudioFingerprint::KnownForSuspending => None,
        }
    }
}

/// Deferred, memoized fingerprint computation.
///
/// The first `get` renders the graph; every later `get` (including on
/// clones) returns the identical number without re-entering the pipeline.
/// Always yields a non-negative finite value: render failures collapse to
/// `0.0` rather than failing the source.
#[derive(Clone)]
pub struct AudioFingerprintProducer {
    inner: MemoizedProducer<f64>,
}

impl AudioFingerprintProducer {
    fn new(renderer: Arc<dyn AudioRenderer>) -> Self {
        let inner = MemoizedProducer::new(move || {
            let renderer = renderer.clone();
            Box::pin(async move {
                match renderer.render(&fingerprint_graph()).await {
                    Ok(samples) => reduce_samples(&samples),
                    Err(err) => {
                        warn!("audio render failed: {err}");
                        0.0
                    }
                }
            })
        });
        Self { inner }
    }

    pub async fn get(&self) -> f64 {
        self.inner.get().await
    }
}

/// Returns the audio fingerprint handle for this environment.
pub fn get_audio_fingerprint(
    env: &EnvironmentClass,
    renderer: impl AudioRenderer + 'static,
) -> AudioFingerprint {
    if suspends_indefinitely(env) {
        debug!("mobile webkit {:?} suspends offline audio; skipping render", env.major_version);
        return AudioFingerprint::KnownForSuspending;
    }
    AudioFingerprint::Producer(AudioFingerprintProducer::new(Arc::new(renderer)))
}

fn suspends_indefinitely(env: &EnvironmentClass) -> bool {
    env.is_webkit && env.is_mobile && env.major_version.map_or(false, |v| v < 12)
}

fn reduce_samples(samples: &[f32]) -> f64 {
    let start = REDUCTION_WINDOW_START.min(samples.len());
    let sum: f64 = samples[start..].iter().map(|s| f64::from(s.abs())).sum();
    if sum.is_finite() {
        sum
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelight_host::testing::{MockAudioRenderer, StaticOracle};

    fn env_of(oracle: StaticOracle) -> EnvironmentClass {
        EnvironmentClass::detect(&oracle)
    }

    #[test]
    fn reduction_sums_tail_window() {
        let mut samples = vec![0.0f32; 5_000];
        for s in samples[4_500..].iter_mut() {
            *s = -0.5;
        }
        // leading samples are outside the window
        samples[0] = 100.0;
        assert_eq!(reduce_samples(&samples), 250.0);
    }

    #[test]
    fn reduction_absorbs_non_finite_buffers() {
        let samples = vec![f32::NAN; 5_000];
        assert_eq!(reduce_samples(&samples), 0.0);
        assert_eq!(reduce_samples(&[]), 0.0);
    }

    #[test]
    fn old_mobile_webkit_short_circuits_without_rendering() {
        let renderer = MockAudioRenderer::new(1);
        let calls = renderer.call_counter();
        let env = env_of(StaticOracle::ios_safari(11));
        let fingerprint = get_audio_fingerprint(&env, renderer);
        assert!(matches!(fingerprint, AudioFingerprint::KnownForSuspending));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn modern_mobile_webkit_gets_a_producer() {
        let env = env_of(StaticOracle::ios_safari(17));
        let fingerprint = get_audio_fingerprint(&env, MockAudioRenderer::new(1));
        assert!(fingerprint.as_producer().is_some());
    }

    #[test]
    fn suspended_render_collapses_to_zero() {
        let env = env_of(StaticOracle::safari_17_desktop());
        let fingerprint = get_audio_fingerprint(&env, MockAudioRenderer::suspending());
        let producer = fingerprint.as_producer().expect("producer").clone();
        let value = tokio_test::block_on(producer.get());
        assert_eq!(value, 0.0);
    }
}
