//! Internal error plumbing.
//!
//! These errors never cross the public boundary: each source absorbs them
//! into its sentinel or structured-record vocabulary. They exist so the
//! pipelines inside a source can use `?` instead of threading sentinel
//! logic through every step.

use thiserror::Error;
use tracelight_host::CanvasError;

#[derive(Error, Debug)]
pub(crate) enum SourceError {
    #[error("canvas host error: {0}")]
    Canvas(#[from] CanvasError),

    #[error("png encoding failed: {0}")]
    PngEncode(#[from] png::EncodingError),
}
