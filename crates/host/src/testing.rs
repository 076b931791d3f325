//! Deterministic in-memory hosts for collector tests.
//!
//! These doubles model the host behaviors the collectors are built to
//! survive, not just the happy path: per-device rasterization texture (the
//! signal canvas fingerprinting actually measures), WebKit-style
//! neighbourhood-clamped readback noise, unclamped per-readback noise,
//! scripted ICE gathering with delays, and audio renderers that jitter or
//! suspend. All randomness is `ChaCha20Rng::seed_from_u64`-seeded so every
//! test is reproducible.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tokio::sync::mpsc;

use crate::audio::{AudioRenderError, AudioRenderer, OscillatorGraph, OscillatorType};
use crate::canvas::{Canvas, CanvasError, CanvasProvider, CompositeMode, FillRule, Pixmap};
use crate::environment::EnvironmentOracle;
use crate::media::{MediaFeature, MediaMatcher, MediaQuery};
use crate::probes::{BatteryProbe, BatteryReading, ConnectionReading, NetworkProbe};
use crate::rtc::{IceEvent, IceSession, RtcError, RtcProvider, RtcSessionAttempt, RtcSessionConfig};

fn hash64(parts: &[u64]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for part in parts {
        part.hash(&mut hasher);
    }
    hasher.finish()
}

fn hash_str(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Noise the host applies at `read_pixels`, once per readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadbackNoise {
    /// Faithful readbacks (desktop Chrome and friends).
    None,
    /// WebKit 616 model: each channel moves by at most ±1, clamped into the
    /// min/max of its 8-neighbourhood. Uniform 3×3 blocks are immovable.
    Clamped { seed: u64 },
    /// Per-readback ±1 noise with no clamp; successive readbacks differ.
    Unclamped { seed: u64 },
}

#[derive(Debug, Clone, Copy)]
enum PathShape {
    Rect { x: f64, y: f64, w: f64, h: f64 },
    Circle { cx: f64, cy: f64, r: f64 },
}

impl PathShape {
    fn contains(&self, px: f64, py: f64) -> bool {
        match *self {
            PathShape::Rect { x, y, w, h } => px >= x && px < x + w && py >= y && py < y + h,
            PathShape::Circle { cx, cy, r } => {
                let (dx, dy) = (px - cx, py - cy);
                dx * dx + dy * dy <= r * r
            }
        }
    }
}

fn parse_color(style: &str) -> ([u8; 3], f32) {
    let s = style.trim();
    if let Some(hex) = s.strip_prefix('#') {
        let digit = |c: char| c.to_digit(16).unwrap_or(0) as u8;
        let bytes: Vec<char> = hex.chars().collect();
        return match bytes.len() {
            3 => (
                [
                    digit(bytes[0]) * 17,
                    digit(bytes[1]) * 17,
                    digit(bytes[2]) * 17,
                ],
                1.0,
            ),
            6 => (
                [
                    digit(bytes[0]) * 16 + digit(bytes[1]),
                    digit(bytes[2]) * 16 + digit(bytes[3]),
                    digit(bytes[4]) * 16 + digit(bytes[5]),
                ],
                1.0,
            ),
            _ => ([0, 0, 0], 1.0),
        };
    }
    if let Some(body) = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<f32> = body
            .split(',')
            .filter_map(|p| p.trim().parse().ok())
            .collect();
        if parts.len() >= 3 {
            let alpha = parts.get(3).copied().unwrap_or(1.0).clamp(0.0, 1.0);
            return (
                [parts[0] as u8, parts[1] as u8, parts[2] as u8],
                alpha,
            );
        }
    }
    ([0, 0, 0], 1.0)
}

fn font_size_px(font: &str) -> f64 {
    let digits: String = font
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let size: f64 = digits.parse().unwrap_or(10.0);
    if font.contains("pt") {
        (size * 4.0 / 3.0).round()
    } else {
        size.round()
    }
}

/// Software-rasterized canvas over a real RGBA buffer.
///
/// Text is rendered as deterministic pseudo-glyph coverage (a hash of
/// character, font, and cell position), and every painted pixel carries a
/// ±1 per-device texture derived from the provider's seed — the same
/// device-specific rasterization entropy a GPU canvas exhibits, which is
/// what keeps encoded scenes incompressible and device-distinct.
pub struct MockCanvas {
    width: u32,
    height: u32,
    pixels: Pixmap,
    fill_style: String,
    font: String,
    composite: CompositeMode,
    smoothing: bool,
    path: Vec<PathShape>,
    device_seed: u64,
    noise: ReadbackNoise,
    /// Shared across every canvas of one device, like the host's noise
    /// stream: no two readbacks anywhere see the same perturbation.
    readbacks: Arc<AtomicU64>,
}

impl MockCanvas {
    fn new(
        width: u32,
        height: u32,
        device_seed: u64,
        noise: ReadbackNoise,
        readbacks: Arc<AtomicU64>,
    ) -> Self {
        Self {
            width,
            height,
            pixels: Pixmap::new(width, height),
            fill_style: "#000".to_string(),
            font: "10px sans-serif".to_string(),
            composite: CompositeMode::SourceOver,
            smoothing: true,
            path: Vec::new(),
            device_seed,
            noise,
            readbacks,
        }
    }

    fn blend_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3], alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let dst = self.pixels.rgba_at(x, y);
        let dst_alpha = dst[3] as f32 / 255.0;
        let mut out = [0u8; 4];
        for c in 0..3 {
            let texture = (hash64(&[self.device_seed, x as u64, y as u64, c as u64]) % 3) as i16 - 1;
            let src = (rgb[c] as i16 + texture).clamp(0, 255) as f32;
            let blended = match self.composite {
                CompositeMode::SourceOver => src,
                CompositeMode::Multiply => {
                    src * (1.0 - dst_alpha) + (src * dst[c] as f32 / 255.0) * dst_alpha
                }
            };
            out[c] = (blended * alpha + dst[c] as f32 * (1.0 - alpha))
                .round()
                .clamp(0.0, 255.0) as u8;
        }
        out[3] = ((alpha + dst_alpha * (1.0 - alpha)) * 255.0).round().clamp(0.0, 255.0) as u8;
        self.pixels.set_rgba(x, y, out);
    }

    fn path_contains(&self, px: f64, py: f64, rule: FillRule) -> bool {
        match rule {
            FillRule::EvenOdd => {
                self.path.iter().filter(|s| s.contains(px, py)).count() % 2 == 1
            }
            FillRule::NonZero => self.path.iter().any(|s| s.contains(px, py)),
        }
    }
}

impl Canvas for MockCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_fill_style(&mut self, style: &str) {
        self.fill_style = style.to_string();
    }

    fn set_font(&mut self, font: &str) {
        self.font = font.to_string();
    }

    fn set_composite(&mut self, mode: CompositeMode) {
        self.composite = mode;
    }

    fn set_image_smoothing(&mut self, enabled: bool) {
        self.smoothing = enabled;
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let (rgb, alpha) = parse_color(&self.fill_style);
        for py in y.floor() as i64..(y + height).ceil() as i64 {
            for px in x.floor() as i64..(x + width).ceil() as i64 {
                self.blend_pixel(px, py, rgb, alpha);
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let (rgb, alpha) = parse_color(&self.fill_style);
        let size = font_size_px(&self.font);
        let font_seed = hash_str(&self.font);
        let mut pen_x = x;
        for ch in text.chars() {
            if ch == ' ' {
                pen_x += size * 0.35;
                continue;
            }
            let color_glyph = (ch as u32) > 0xFFFF;
            let advance = size * if color_glyph { 1.0 } else { 0.55 };
            let top = y - size * 0.75;
            for gy in 0..size.ceil() as i64 {
                for gx in 0..advance.ceil() as i64 {
                    let coverage = hash64(&[font_seed, ch as u64, gx as u64, gy as u64]);
                    if coverage % 4 == 0 {
                        continue;
                    }
                    let (px, py) = (pen_x.floor() as i64 + gx, top.floor() as i64 + gy);
                    if color_glyph {
                        let bytes = coverage.to_le_bytes();
                        self.blend_pixel(px, py, [bytes[0], bytes[1], bytes[2]], 1.0);
                    } else {
                        self.blend_pixel(px, py, rgb, alpha);
                    }
                }
            }
            pen_x += advance + 1.0;
        }
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.path.push(PathShape::Rect {
            x,
            y,
            w: width,
            h: height,
        });
    }

    fn arc(&mut self, cx: f64, cy: f64, radius: f64, _start_angle: f64, _end_angle: f64) {
        // The scenes only declare full circles; partial sweeps are not modeled.
        self.path.push(PathShape::Circle { cx, cy, r: radius });
    }

    fn fill(&mut self, rule: FillRule) {
        let (rgb, alpha) = parse_color(&self.fill_style);
        let shapes = self.path.clone();
        if shapes.is_empty() {
            return;
        }
        const OFFSETS: [(f64, f64); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];
        for py in 0..self.height as i64 {
            for px in 0..self.width as i64 {
                let mut covered = 0;
                for (ox, oy) in OFFSETS {
                    let inside = match rule {
                        FillRule::EvenOdd => {
                            shapes
                                .iter()
                                .filter(|s| s.contains(px as f64 + ox, py as f64 + oy))
                                .count()
                                % 2
                                == 1
                        }
                        FillRule::NonZero => {
                            shapes.iter().any(|s| s.contains(px as f64 + ox, py as f64 + oy))
                        }
                    };
                    if inside {
                        covered += 1;
                    }
                }
                if covered > 0 {
                    self.blend_pixel(px, py, rgb, alpha * covered as f32 / 4.0);
                }
            }
        }
    }

    fn is_point_in_path(&self, x: f64, y: f64, rule: FillRule) -> bool {
        self.path_contains(x, y, rule)
    }

    fn draw_canvas(
        &mut self,
        source: &dyn Canvas,
        dest_width: u32,
        dest_height: u32,
    ) -> Result<(), CanvasError> {
        let src = source
            .as_any()
            .downcast_ref::<MockCanvas>()
            .ok_or_else(|| CanvasError::Upload("foreign canvas source".to_string()))?;
        if src.width == 0 || src.height == 0 {
            return Ok(());
        }
        for dy in 0..dest_height.min(self.height) {
            for dx in 0..dest_width.min(self.width) {
                let sx = (dx as u64 * src.width as u64 / dest_width as u64) as u32;
                let sy = (dy as u64 * src.height as u64 / dest_height as u64) as u32;
                let rgba = if self.smoothing {
                    // crude box filter; the denoiser always disables smoothing
                    let sx2 = (sx + 1).min(src.width - 1);
                    let sy2 = (sy + 1).min(src.height - 1);
                    let mut acc = [0u32; 4];
                    for p in [
                        src.pixels.rgba_at(sx, sy),
                        src.pixels.rgba_at(sx2, sy),
                        src.pixels.rgba_at(sx, sy2),
                        src.pixels.rgba_at(sx2, sy2),
                    ] {
                        for c in 0..4 {
                            acc[c] += p[c] as u32;
                        }
                    }
                    [
                        (acc[0] / 4) as u8,
                        (acc[1] / 4) as u8,
                        (acc[2] / 4) as u8,
                        (acc[3] / 4) as u8,
                    ]
                } else {
                    src.pixels.rgba_at(sx, sy)
                };
                self.pixels.set_rgba(dx, dy, rgba);
            }
        }
        Ok(())
    }

    fn read_pixels(&self) -> Result<Pixmap, CanvasError> {
        let call = self.readbacks.fetch_add(1, Ordering::SeqCst);
        let mut out = self.pixels.clone();
        match self.noise {
            ReadbackNoise::None => {}
            ReadbackNoise::Clamped { seed } => {
                apply_clamped_noise(&self.pixels, &mut out, hash64(&[seed, call]));
            }
            ReadbackNoise::Unclamped { seed } => {
                apply_unclamped_noise(&mut out, hash64(&[seed, call]));
            }
        }
        Ok(out)
    }

    fn write_pixels(&mut self, pixels: &Pixmap) -> Result<(), CanvasError> {
        if pixels.width != self.width || pixels.height != self.height {
            return Err(CanvasError::Upload(format!(
                "dimension mismatch: {}x{} into {}x{}",
                pixels.width, pixels.height, self.width, self.height
            )));
        }
        self.pixels = pixels.clone();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn apply_clamped_noise(original: &Pixmap, out: &mut Pixmap, seed: u64) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    for y in 0..original.height {
        for x in 0..original.width {
            let rgba = original.rgba_at(x, y);
            let mut noised = rgba;
            for c in 0..3 {
                let delta: i16 = rng.gen_range(-1..=1);
                let mut lo = rgba[c];
                let mut hi = rgba[c];
                for ny in y.saturating_sub(1)..=(y + 1).min(original.height - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(original.width - 1) {
                        let n = original.rgba_at(nx, ny)[c];
                        lo = lo.min(n);
                        hi = hi.max(n);
                    }
                }
                noised[c] = ((rgba[c] as i16 + delta).clamp(lo as i16, hi as i16)) as u8;
            }
            out.set_rgba(x, y, noised);
        }
    }
}

fn apply_unclamped_noise(out: &mut Pixmap, seed: u64) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    for y in 0..out.height {
        for x in 0..out.width {
            let mut rgba = out.rgba_at(x, y);
            for c in 0..3 {
                if rng.gen_bool(0.5) {
                    let delta: i16 = if rng.gen_bool(0.5) { 1 } else { -1 };
                    rgba[c] = (rgba[c] as i16 + delta).clamp(0, 255) as u8;
                }
            }
            out.set_rgba(x, y, rgba);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ProvisionMode {
    Normal,
    Unsupported,
    FailWiderThan(u32),
}

/// Canvas factory double. One provider models one device: its seed fixes
/// the rasterization texture, its noise model fixes readback behavior.
pub struct MockCanvasProvider {
    device_seed: u64,
    noise: ReadbackNoise,
    mode: ProvisionMode,
    readbacks: Arc<AtomicU64>,
}

impl MockCanvasProvider {
    pub fn new(device_seed: u64) -> Self {
        Self::with_noise(device_seed, ReadbackNoise::None)
    }

    pub fn with_noise(device_seed: u64, noise: ReadbackNoise) -> Self {
        Self {
            device_seed,
            noise,
            mode: ProvisionMode::Normal,
            readbacks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A host with no canvas support at all.
    pub fn unsupported() -> Self {
        Self {
            mode: ProvisionMode::Unsupported,
            ..Self::new(0)
        }
    }

    /// A host whose allocations fail above `max_width` — the scratch-canvas
    /// failure mode (scratch surfaces are 3× wider than their sources).
    pub fn failing_scratch(device_seed: u64, noise: ReadbackNoise, max_width: u32) -> Self {
        Self {
            mode: ProvisionMode::FailWiderThan(max_width),
            ..Self::with_noise(device_seed, noise)
        }
    }
}

impl CanvasProvider for MockCanvasProvider {
    fn create_canvas(&self, width: u32, height: u32) -> Result<Box<dyn Canvas>, CanvasError> {
        match self.mode {
            ProvisionMode::Unsupported => Err(CanvasError::ContextUnavailable),
            ProvisionMode::FailWiderThan(max) if width > max => Err(CanvasError::Allocation(
                format!("{width}x{height} exceeds surface budget"),
            )),
            _ => Ok(Box::new(MockCanvas::new(
                width,
                height,
                self.device_seed,
                self.noise,
                self.readbacks.clone(),
            ))),
        }
    }
}

/// `matchMedia` double answering from a fixed viewport description.
pub struct MockMediaMatcher {
    width: u32,
    height: u32,
    dppx: f64,
    color_bits: u32,
    features: HashMap<MediaFeature, &'static str>,
    reported_dpr: Option<f64>,
}

impl MockMediaMatcher {
    /// A conventional desktop host: fine pointer, hover, landscape, 8-bit
    /// color, 1 dppx.
    pub fn desktop(width: u32, height: u32) -> Self {
        let mut features = HashMap::new();
        features.insert(MediaFeature::Orientation, "landscape");
        features.insert(MediaFeature::DisplayMode, "browser");
        features.insert(MediaFeature::Pointer, "fine");
        features.insert(MediaFeature::Hover, "hover");
        features.insert(MediaFeature::AnyPointer, "fine");
        features.insert(MediaFeature::AnyHover, "hover");
        features.insert(MediaFeature::OverflowBlock, "scroll");
        features.insert(MediaFeature::OverflowInline, "scroll");
        features.insert(MediaFeature::Update, "fast");
        features.insert(MediaFeature::Scripting, "enabled");
        Self {
            width,
            height,
            dppx: 1.0,
            color_bits: 8,
            features,
            reported_dpr: Some(1.0),
        }
    }

    /// A host that refuses every discrete probe and reports no dimensions —
    /// the "lying about `window.screen`" case.
    pub fn opaque() -> Self {
        Self {
            width: 0,
            height: 0,
            dppx: 0.0,
            color_bits: 0,
            features: HashMap::new(),
            reported_dpr: None,
        }
    }

    pub fn with_pixel_ratio(mut self, dppx: f64) -> Self {
        self.dppx = dppx;
        self.reported_dpr = Some(dppx);
        self
    }

    pub fn with_color_bits(mut self, bits: u32) -> Self {
        self.color_bits = bits;
        self
    }

    pub fn with_feature(mut self, feature: MediaFeature, value: &'static str) -> Self {
        self.features.insert(feature, value);
        self
    }

    pub fn with_reported_dpr(mut self, dpr: Option<f64>) -> Self {
        self.reported_dpr = dpr;
        self
    }
}

impl MediaMatcher for MockMediaMatcher {
    fn matches(&self, query: &MediaQuery) -> bool {
        match *query {
            MediaQuery::MinWidth(m) => self.width >= m,
            MediaQuery::MaxWidth(m) => self.width <= m,
            MediaQuery::MinHeight(m) => self.height >= m,
            MediaQuery::MaxHeight(m) => self.height <= m,
            MediaQuery::MinResolution(r) => self.dppx + 1e-9 >= r,
            MediaQuery::MinColor(bits) => self.color_bits >= bits,
            MediaQuery::Feature(feature, value) => self.features.get(&feature) == Some(&value),
        }
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        self.reported_dpr
    }
}

/// Offline-audio double: closed-form synthesis with a per-device gain, an
/// optional per-call jitter (the Safari 17 / Samsung Internet 26 noise
/// model), and a render-call counter so tests can prove the pipeline ran
/// exactly once.
pub struct MockAudioRenderer {
    device_seed: u64,
    jitter: Option<u64>,
    suspended: bool,
    calls: Arc<AtomicU32>,
}

impl MockAudioRenderer {
    pub fn new(device_seed: u64) -> Self {
        Self {
            device_seed,
            jitter: None,
            suspended: false,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_jitter(device_seed: u64, jitter_seed: u64) -> Self {
        Self {
            jitter: Some(jitter_seed),
            ..Self::new(device_seed)
        }
    }

    /// A renderer whose offline context never runs.
    pub fn suspending() -> Self {
        Self {
            suspended: true,
            ..Self::new(0)
        }
    }

    pub fn render_calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared call counter, for asserting on a renderer after it has been
    /// moved into a producer.
    pub fn call_counter(&self) -> Arc<AtomicU32> {
        self.calls.clone()
    }
}

impl AudioRenderer for MockAudioRenderer {
    fn render(&self, graph: &OscillatorGraph) -> BoxFuture<'static, Result<Vec<f32>, AudioRenderError>> {
        let graph = graph.clone();
        let device_seed = self.device_seed;
        let jitter = self.jitter;
        let suspended = self.suspended;
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if suspended {
                return Err(AudioRenderError::Suspended);
            }
            Ok(synthesize(&graph, device_seed, jitter, call))
        })
    }
}

fn synthesize(graph: &OscillatorGraph, device_seed: u64, jitter: Option<u64>, call: u32) -> Vec<f32> {
    let device_gain = 1.0 + ((hash64(&[device_seed]) % 1000) as f64 - 500.0) * 1e-6;
    let raw: Vec<f64> = (0..graph.length)
        .map(|i| {
            let phase = (i as f64 * graph.frequency / graph.sample_rate as f64).fract();
            match graph.oscillator {
                OscillatorType::Sine => (std::f64::consts::TAU * phase).sin(),
                OscillatorType::Square => {
                    if phase < 0.5 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                OscillatorType::Sawtooth => 2.0 * phase - 1.0,
                OscillatorType::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
            }
        })
        .collect();
    let mut jitter_rng = jitter.map(|seed| ChaCha20Rng::seed_from_u64(hash64(&[seed, call as u64])));
    (0..raw.len())
        .map(|i| {
            // 3-tap lowpass in place of the host's biquad
            let prev = raw[i.saturating_sub(1)];
            let next = raw[(i + 1).min(raw.len() - 1)];
            let mut sample = (0.25 * prev + 0.5 * raw[i] + 0.25 * next) * device_gain;
            if let Some(rng) = jitter_rng.as_mut() {
                sample += (rng.gen::<f64>() - 0.5) * 1e-6;
            }
            sample as f32
        })
        .collect()
}

/// What a scripted peer-connection host should do.
#[derive(Debug, Clone)]
pub enum RtcScript {
    /// No constructor at any vendor-prefixed key.
    Unsupported,
    /// Constructor exists but setup throws.
    SetupFailure(String),
    /// Deliver each event after its delay, then hold the channel open until
    /// the session closes (script a `GatheringComplete` event to end early).
    Events(Vec<(Duration, IceEvent)>),
}

/// Scripted peer-connection host. `was_closed` observes whether the
/// collector released the connection.
pub struct MockRtcProvider {
    script: RtcScript,
    closed: Arc<AtomicBool>,
}

impl MockRtcProvider {
    pub fn new(script: RtcScript) -> Self {
        Self {
            script,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn unsupported() -> Self {
        Self::new(RtcScript::Unsupported)
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl RtcProvider for MockRtcProvider {
    fn open_session(&self, _config: &RtcSessionConfig) -> RtcSessionAttempt {
        match &self.script {
            RtcScript::Unsupported => RtcSessionAttempt::Unsupported,
            RtcScript::SetupFailure(message) => {
                RtcSessionAttempt::Failed(RtcError::Setup(message.clone()))
            }
            RtcScript::Events(events) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let events = events.clone();
                let handle = tokio::spawn(async move {
                    for (delay, event) in events {
                        tokio::time::sleep(delay).await;
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                    futures::future::pending::<()>().await;
                });
                let closed = self.closed.clone();
                RtcSessionAttempt::Started(IceSession::new(rx, move || {
                    closed.store(true, Ordering::SeqCst);
                    handle.abort();
                }))
            }
        }
    }
}

/// Environment oracle answering from fixed flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticOracle {
    pub webkit: bool,
    pub safari: bool,
    pub safari_webkit: bool,
    pub webkit616: bool,
    pub samsung: bool,
    pub mobile: bool,
    pub major_version: Option<u32>,
}

impl StaticOracle {
    pub fn chrome_desktop() -> Self {
        Self {
            webkit: true,
            major_version: Some(121),
            ..Self::default()
        }
    }

    pub fn safari_17_desktop() -> Self {
        Self {
            webkit: true,
            safari: true,
            safari_webkit: true,
            webkit616: true,
            major_version: Some(17),
            ..Self::default()
        }
    }

    pub fn ios_safari(major_version: u32) -> Self {
        Self {
            webkit: true,
            safari: true,
            safari_webkit: true,
            mobile: true,
            major_version: Some(major_version),
            ..Self::default()
        }
    }

    pub fn samsung_internet(major_version: u32) -> Self {
        Self {
            webkit: true,
            samsung: true,
            mobile: true,
            major_version: Some(major_version),
            ..Self::default()
        }
    }
}

impl EnvironmentOracle for StaticOracle {
    fn is_webkit(&self) -> bool {
        self.webkit
    }

    fn is_safari(&self) -> bool {
        self.safari
    }

    fn is_safari_webkit(&self) -> bool {
        self.safari_webkit
    }

    fn is_webkit616_or_newer(&self) -> bool {
        self.webkit616
    }

    fn is_samsung_internet(&self) -> bool {
        self.samsung
    }

    fn is_mobile(&self) -> bool {
        self.mobile
    }

    fn browser_major_version(&self) -> Option<u32> {
        self.major_version
    }
}

/// Battery probe answering a fixed reading.
pub struct StaticBatteryProbe(pub Option<BatteryReading>);

impl BatteryProbe for StaticBatteryProbe {
    fn read(&self) -> BoxFuture<'static, Option<BatteryReading>> {
        let reading = self.0;
        Box::pin(async move { reading })
    }
}

/// Network probe answering a fixed reading.
pub struct StaticNetworkProbe(pub Option<ConnectionReading>);

impl NetworkProbe for StaticNetworkProbe {
    fn read(&self) -> Option<ConnectionReading> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn blank_canvas(device_seed: u64, width: u32, height: u32, noise: ReadbackNoise) -> MockCanvas {
        MockCanvas::new(width, height, device_seed, noise, Arc::new(AtomicU64::new(0)))
    }

    fn textured_canvas(device_seed: u64, noise: ReadbackNoise) -> MockCanvas {
        let mut canvas = blank_canvas(device_seed, 12, 9, noise);
        canvas.set_fill_style("#f60");
        canvas.fill_rect(0.0, 0.0, 12.0, 9.0);
        canvas.set_fill_style("#069");
        canvas.fill_text("ab", 1.0, 6.0);
        canvas
    }

    #[test]
    fn rasterization_is_deterministic_per_device() {
        let a = textured_canvas(7, ReadbackNoise::None).read_pixels().unwrap();
        let b = textured_canvas(7, ReadbackNoise::None).read_pixels().unwrap();
        assert_eq!(a, b);

        let other_device = textured_canvas(8, ReadbackNoise::None);
        assert_ne!(a, other_device.read_pixels().unwrap());
    }

    #[test]
    fn nearest_neighbour_blit_replicates_3x3_blocks() {
        let source = textured_canvas(7, ReadbackNoise::None);
        let original = source.pixels.clone();
        let mut scratch = blank_canvas(7, 36, 27, ReadbackNoise::None);
        scratch.set_image_smoothing(false);
        scratch.draw_canvas(&source, 36, 27).unwrap();
        for y in 0..9 {
            for x in 0..12 {
                let expected = original.rgba_at(x, y);
                for by in 0..3 {
                    for bx in 0..3 {
                        assert_eq!(scratch.pixels.rgba_at(3 * x + bx, 3 * y + by), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn clamped_noise_cannot_move_uniform_block_centers() {
        let source = textured_canvas(7, ReadbackNoise::None);
        let original = source.pixels.clone();
        let mut scratch = blank_canvas(7, 36, 27, ReadbackNoise::Clamped { seed: 99 });
        scratch.set_image_smoothing(false);
        scratch.draw_canvas(&source, 36, 27).unwrap();
        let noisy = scratch.read_pixels().unwrap();
        for y in 0..9 {
            for x in 0..12 {
                assert_eq!(noisy.rgba_at(3 * x + 1, 3 * y + 1), original.rgba_at(x, y));
            }
        }
    }

    #[test]
    fn clamped_noise_perturbs_direct_readbacks() {
        let canvas = textured_canvas(7, ReadbackNoise::Clamped { seed: 99 });
        let first = canvas.read_pixels().unwrap();
        let second = canvas.read_pixels().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn unclamped_noise_differs_per_readback() {
        let canvas = textured_canvas(7, ReadbackNoise::Unclamped { seed: 5 });
        let first = canvas.read_pixels().unwrap();
        let second = canvas.read_pixels().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn noise_stream_is_shared_across_canvases() {
        let provider = MockCanvasProvider::with_noise(7, ReadbackNoise::Clamped { seed: 99 });
        let mut first = provider.create_canvas(12, 9).unwrap();
        first.set_fill_style("#f60");
        first.fill_rect(0.0, 0.0, 12.0, 9.0);
        let mut second = provider.create_canvas(12, 9).unwrap();
        second.set_fill_style("#f60");
        second.fill_rect(0.0, 0.0, 12.0, 9.0);
        // same content, but separate canvases never replay the same noise
        assert_ne!(
            first.read_pixels().unwrap(),
            second.read_pixels().unwrap()
        );
    }

    #[test]
    fn nested_rects_resolve_even_odd_winding() {
        let mut canvas = blank_canvas(0, 10, 10, ReadbackNoise::None);
        canvas.begin_path();
        canvas.rect(0.0, 0.0, 10.0, 10.0);
        canvas.rect(2.0, 2.0, 6.0, 6.0);
        assert!(!canvas.is_point_in_path(5.0, 5.0, FillRule::EvenOdd));
        assert!(canvas.is_point_in_path(5.0, 5.0, FillRule::NonZero));
        assert!(canvas.is_point_in_path(1.0, 1.0, FillRule::EvenOdd));
    }

    #[test]
    fn synthesis_is_stable_without_jitter() {
        let graph = OscillatorGraph {
            sample_rate: 44_100,
            length: 5_000,
            oscillator: OscillatorType::Triangle,
            frequency: 10_000.0,
            filter: crate::audio::BiquadType::Allpass,
            filter_frequency: 1_000.0,
            filter_q: 1.0,
        };
        assert_eq!(synthesize(&graph, 3, None, 0), synthesize(&graph, 3, None, 1));
        assert_ne!(
            synthesize(&graph, 3, Some(11), 0),
            synthesize(&graph, 3, Some(11), 1)
        );
    }
}
