//! Canvas entropy source.
//!
//! Two fixed scenes are rasterized off-screen and encoded as PNG data-URLs.
//! The signal is the host's device-specific rasterization (font shaping,
//! anti-aliasing, compositing), so the scenes never change and always name
//! built-in fonts — otherwise the font-preference source would bleed into
//! this one.
//!
//! Hosts fight back two ways and each gets its own countermeasure:
//!
//! - **Unclamped per-readback noise** cannot be defeated; it is detected by
//!   encoding the same surface twice and reported as [`ImageSignal::Unstable`].
//! - **WebKit 616+ (Safari 17) clamps each pixel's readback noise into the
//!   min/max of its 8-neighbourhood.** Upscaling the scene 3× with
//!   smoothing disabled turns every source pixel into a 3×3 block of
//!   bit-identical neighbours, so the clamp pins the block's center pixel
//!   to its true value. One readback of the scaled surface plus
//!   center-pixel extraction reconstructs the exact original.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tracelight_host::{
    Canvas, CanvasProvider, CompositeMode, EnvironmentClass, FillRule, Pixmap,
};

use crate::error::SourceError;

const TEXT_WIDTH: u32 = 240;
const TEXT_HEIGHT: u32 = 60;
const GEOMETRY_WIDTH: u32 = 122;
const GEOMETRY_HEIGHT: u32 = 110;

/// 3× oversampling: small enough to keep the scratch surface cheap, large
/// enough that every block center has a full ring of identical neighbours.
const DENOISE_SCALE: u32 = 3;

/// Ends with U+1F603; nothing may render to the right of the emoji (some
/// engines misplace trailing glyphs there).
const SCENE_TEXT: &str = "Cwm fjordbank gly \u{1F603}";

const TAU: f64 = std::f64::consts::TAU;

/// One rendered scene: a PNG data-URL when the host could be read
/// faithfully, otherwise a sentinel naming why not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSignal {
    DataUrl(String),
    /// The host lacks canvas or 2D-context support.
    Unsupported,
    /// Image capture was disabled by the caller.
    Skipped,
    /// The host injects per-readback noise this source cannot clamp away.
    Unstable,
}

impl ImageSignal {
    pub fn is_data_url(&self) -> bool {
        matches!(self, ImageSignal::DataUrl(_))
    }
}

/// Result record of the canvas source. `geometry` and `text` are always
/// both data-URLs or both the same sentinel class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasFingerprint {
    pub winding: bool,
    pub geometry: ImageSignal,
    pub text: ImageSignal,
}

impl CanvasFingerprint {
    fn unsupported() -> Self {
        Self {
            winding: false,
            geometry: ImageSignal::Unsupported,
            text: ImageSignal::Unsupported,
        }
    }
}

/// Renders the reference scenes and returns the canvas fingerprint.
///
/// Deterministic across repeated invocations within a page load on every
/// supported engine, including Safari 17+ where the denoise path is taken.
/// Never fails: every host defect maps to a sentinel.
pub fn get_canvas_fingerprint(
    env: &EnvironmentClass,
    provider: &impl CanvasProvider,
) -> CanvasFingerprint {
    let mut probe = match provider.create_canvas(TEXT_WIDTH, TEXT_HEIGHT) {
        Ok(canvas) => canvas,
        Err(err) => {
            debug!("canvas unavailable: {err}");
            return CanvasFingerprint::unsupported();
        }
    };
    let winding = detect_winding(&mut *probe);
    let (text, geometry) = match render_images(env, provider, &mut *probe) {
        Ok(images) => images,
        Err(err) => {
            warn!("canvas pipeline failed: {err}");
            (ImageSignal::Unsupported, ImageSignal::Unsupported)
        }
    };
    CanvasFingerprint {
        winding,
        geometry,
        text,
    }
}

/// Declares a 10×10 outer and 6×6 inner rect on one path; an engine with
/// winding-rule support excludes the doubly-covered center under `evenodd`.
fn detect_winding(canvas: &mut dyn Canvas) -> bool {
    canvas.begin_path();
    canvas.rect(0.0, 0.0, 10.0, 10.0);
    canvas.rect(2.0, 2.0, 6.0, 6.0);
    !canvas.is_point_in_path(5.0, 5.0, FillRule::EvenOdd)
}

fn render_images(
    env: &EnvironmentClass,
    provider: &impl CanvasProvider,
    text_canvas: &mut dyn Canvas,
) -> Result<(ImageSignal, ImageSignal), SourceError> {
    draw_text_scene(text_canvas);
    if env.is_safari_webkit && env.is_webkit616_or_newer {
        let text = capture_denoised(provider, text_canvas)?;
        let mut geometry_canvas = provider.create_canvas(GEOMETRY_WIDTH, GEOMETRY_HEIGHT)?;
        draw_geometry_scene(&mut *geometry_canvas);
        let geometry = capture_denoised(provider, &*geometry_canvas)?;
        return Ok((text, geometry));
    }
    let first = encode_data_url(&text_canvas.read_pixels()?)?;
    let second = encode_data_url(&text_canvas.read_pixels()?)?;
    if first != second {
        debug!("canvas readbacks differ; host injects unclampable noise");
        return Ok((ImageSignal::Unstable, ImageSignal::Unstable));
    }
    let mut geometry_canvas = provider.create_canvas(GEOMETRY_WIDTH, GEOMETRY_HEIGHT)?;
    draw_geometry_scene(&mut *geometry_canvas);
    let geometry = encode_data_url(&geometry_canvas.read_pixels()?)?;
    Ok((ImageSignal::DataUrl(first), ImageSignal::DataUrl(geometry)))
}

fn draw_text_scene(canvas: &mut dyn Canvas) {
    canvas.set_fill_style("#f60");
    canvas.fill_rect(100.0, 1.0, 62.0, 20.0);
    canvas.set_fill_style("#069");
    canvas.set_font("11pt \"Times New Roman\"");
    canvas.fill_text(SCENE_TEXT, 2.0, 15.0);
    canvas.set_fill_style("rgba(102, 204, 0, 0.2)");
    canvas.set_font("18pt Arial");
    canvas.fill_text(SCENE_TEXT, 4.0, 45.0);
}

fn draw_geometry_scene(canvas: &mut dyn Canvas) {
    canvas.set_composite(CompositeMode::Multiply);
    for (style, cx, cy) in [("#f2f", 40.0, 40.0), ("#2ff", 80.0, 40.0), ("#ff2", 60.0, 80.0)] {
        canvas.set_fill_style(style);
        canvas.begin_path();
        canvas.arc(cx, cy, 40.0, 0.0, TAU);
        canvas.fill(FillRule::NonZero);
    }
    canvas.set_fill_style("#f9c");
    canvas.begin_path();
    canvas.arc(60.0, 60.0, 60.0, 0.0, TAU);
    canvas.arc(60.0, 60.0, 20.0, 0.0, TAU);
    canvas.fill(FillRule::EvenOdd);
}

/// The Safari 17 path: one noisy readback of the 3×-scaled surface, then
/// center-pixel extraction. A failed scratch allocation downgrades to the
/// direct (noisy) readback rather than failing the source.
fn capture_denoised(
    provider: &impl CanvasProvider,
    source: &dyn Canvas,
) -> Result<ImageSignal, SourceError> {
    let (width, height) = (source.width(), source.height());
    let scaled = (width * DENOISE_SCALE, height * DENOISE_SCALE);
    let mut scratch = match provider.create_canvas(scaled.0, scaled.1) {
        Ok(canvas) => canvas,
        Err(err) => {
            warn!("scratch canvas allocation failed, keeping noisy readback: {err}");
            return Ok(ImageSignal::DataUrl(encode_data_url(&source.read_pixels()?)?));
        }
    };
    scratch.set_image_smoothing(false);
    scratch.draw_canvas(source, scaled.0, scaled.1)?;
    let noisy = scratch.read_pixels()?;
    if noisy.width < scaled.0 || noisy.height < scaled.1 {
        warn!(
            "scratch readback came back {}x{}, expected {}x{}; keeping noisy readback",
            noisy.width, noisy.height, scaled.0, scaled.1
        );
        return Ok(ImageSignal::DataUrl(encode_data_url(&source.read_pixels()?)?));
    }
    let clean = extract_centers(&noisy, width, height);
    Ok(ImageSignal::DataUrl(encode_data_url(&clean)?))
}

/// Reads pixel `(3x+1, 3y+1)` of the scaled surface for every original
/// pixel `(x, y)`: the center of its 3×3 block, whose eight identical
/// neighbours forced the clamped noise back to the true value.
fn extract_centers(scaled: &Pixmap, width: u32, height: u32) -> Pixmap {
    let mut clean = Pixmap::new(width, height);
    for y in 0..height {
        for x in 0..width {
            clean.set_rgba(
                x,
                y,
                scaled.rgba_at(DENOISE_SCALE * x + 1, DENOISE_SCALE * y + 1),
            );
        }
    }
    clean
}

fn encode_data_url(pixels: &Pixmap) -> Result<String, SourceError> {
    let mut bytes = Vec::new();
    let mut encoder = png::Encoder::new(&mut bytes, pixels.width, pixels.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&pixels.data)?;
    writer.finish()?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&bytes)))
}
