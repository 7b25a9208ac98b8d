//! Umbra - calibration of raw astronomical camera frames.
//!
//! Turns dark, flat and science exposures into color-corrected, aligned and
//! optionally stacked images:
//! - Master frames by median or sigma-clipped mean stacking
//! - Bilinear Bayer demosaicing
//! - Dark subtraction, flat normalization and flat division
//! - Star-based frame alignment
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use umbra::{FitsStore, PipelineConfig, PipelineInputs};
//!
//! let inputs = PipelineInputs::under(Path::new("/data/2024-03-02"));
//! let output = umbra::run(&FitsStore::new(), &inputs, &PipelineConfig::default())?;
//!
//! println!("{} frames, {} skipped", output.frames.len(), output.skipped_count());
//! ```

pub mod calibration;
pub mod demosaic;
mod error;
mod image_buffer;
pub(crate) mod math;
pub mod pipeline;
pub mod preview;
pub mod registration;
pub mod stacking;
pub mod store;

#[cfg(test)]
pub mod testing;

// ============================================================================
// Core types
// ============================================================================

pub use error::{Error, Result};
pub use image_buffer::{
    BAYER_PATTERN_KEY, Channel, ColorTriple, FILTER_KEY, FrameKind, FrameSet, HeaderValue,
    ImageBuffer, Metadata, Shape, TYPE_KEYS,
};

// ============================================================================
// Stages
// ============================================================================

pub use demosaic::{BayerPattern, demosaic, demosaic_from_header};
pub use registration::{
    AlignConfig, AlignFailed, FrameAligner, NotFoundReason, StarTriangleEstimator, Transform,
    TransformEstimate, TransformEstimator, TransformModel, WarpMethod,
};
pub use stacking::{StackMethod, stack};

// ============================================================================
// Pipeline and storage
// ============================================================================

pub use pipeline::{
    CalibrationOrder, FrameStatus, PipelineConfig, PipelineInputs, PipelineOutput, PreviewConfig,
    RunConfig, calibrate, run,
};
#[cfg(feature = "fits")]
pub use store::FitsStore;
pub use store::{FilterGroups, FrameStore, MemoryStore, StoreError, group_by_filter};
