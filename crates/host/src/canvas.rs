//! Canvas surface capability.
//!
//! The 2D operation set here is exactly what the reference scenes need:
//! styled rect/text/arc fills, even-odd winding, the `multiply` composite,
//! scaled canvas-to-canvas blits with smoothing control, and RGBA readback.
//! `read_pixels` is the trust boundary — a hostile host injects its
//! readback noise there and nowhere else, which is what the collectors'
//! denoising is built around.

use std::any::Any;

use thiserror::Error;

/// Errors surfaced by canvas hosts.
#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("2d context unavailable")]
    ContextUnavailable,

    #[error("canvas allocation failed: {0}")]
    Allocation(String),

    #[error("pixel readback failed: {0}")]
    Readback(String),

    #[error("pixel upload failed: {0}")]
    Upload(String),
}

/// Path fill rule, as in `CanvasRenderingContext2D.fill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

/// Subset of `globalCompositeOperation` the scenes use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    SourceOver,
    Multiply,
}

/// An owned RGBA8 pixel buffer, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Pixmap {
    /// A transparent-black pixmap of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn set_rgba(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }
}

/// One off-screen 2D canvas with its graphics state.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// CSS color string, e.g. `#f60` or `rgba(102, 204, 0, 0.2)`.
    fn set_fill_style(&mut self, style: &str);

    /// CSS font shorthand, e.g. `11pt "Times New Roman"`.
    fn set_font(&mut self, font: &str);

    fn set_composite(&mut self, mode: CompositeMode);

    /// Toggles interpolation for subsequent [`Canvas::draw_canvas`] calls.
    fn set_image_smoothing(&mut self, enabled: bool);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn fill_text(&mut self, text: &str, x: f64, y: f64);

    fn begin_path(&mut self);

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn arc(&mut self, cx: f64, cy: f64, radius: f64, start_angle: f64, end_angle: f64);

    fn fill(&mut self, rule: FillRule);

    fn is_point_in_path(&self, x: f64, y: f64, rule: FillRule) -> bool;

    /// Draws the whole of `source` scaled to `dest_width × dest_height` at
    /// the origin. This is a canvas-to-canvas transfer: no readback noise is
    /// involved on either side.
    fn draw_canvas(
        &mut self,
        source: &dyn Canvas,
        dest_width: u32,
        dest_height: u32,
    ) -> Result<(), CanvasError>;

    /// Reads the full surface back as RGBA8. Hosts that poison readbacks
    /// apply their per-pixel noise here, once per call.
    fn read_pixels(&self) -> Result<Pixmap, CanvasError>;

    /// Replaces the full surface content. Dimensions must match.
    fn write_pixels(&mut self, pixels: &Pixmap) -> Result<(), CanvasError>;

    /// Concrete-type escape hatch for canvas-to-canvas blits.
    fn as_any(&self) -> &dyn Any;
}

/// Creates off-screen canvases. A host without canvas support (or whose 2D
/// context allocation fails) returns `Err` and the collectors report the
/// `Unsupported` sentinel.
pub trait CanvasProvider {
    fn create_canvas(&self, width: u32, height: u32) -> Result<Box<dyn Canvas>, CanvasError>;
}
