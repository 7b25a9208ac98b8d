//! Error taxonomy for calibration operations.

use thiserror::Error;

use crate::image_buffer::Shape;
use crate::store::StoreError;

/// Errors that abort the operation (and the frame) that raised them.
///
/// Alignment failures are deliberately absent: they are reported per frame
/// through [`crate::AlignFailed`] and never abort a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: Shape,
        actual: Shape,
    },

    #[error("Unsupported Bayer pattern '{0}'")]
    UnsupportedPattern(String),

    #[error("Missing metadata key '{key}' in '{origin}'")]
    MissingMetadata { key: String, origin: String },

    #[error("Degenerate value in {operation} of '{origin}': {reason}")]
    DegenerateValue {
        operation: &'static str,
        origin: String,
        reason: String,
    },

    #[error("Frame set is empty")]
    EmptyFrameSet,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to write preview '{path}': {source}")]
    Preview {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
