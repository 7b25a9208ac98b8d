//! Sequencing of the calibration stages over one run.
//!
//! [`calibrate`] is the in-memory core: master frames, per-exposure correction,
//! alignment and the combined stack. [`run`] wraps it with loading, persisting
//! and the preview image.

mod config;

use std::path::Path;

use rayon::prelude::*;

use crate::calibration;
use crate::demosaic::{self, BayerPattern};
use crate::error::Result;
use crate::image_buffer::{
    BAYER_PATTERN_KEY, Channel, ColorTriple, FrameKind, FrameSet, ImageBuffer,
};
use crate::preview;
use crate::registration::{FrameAligner, Transform};
use crate::stacking;
use crate::store::FrameStore;

pub use config::{CalibrationOrder, PipelineConfig, PipelineInputs, PreviewConfig, RunConfig};

pub const FRAME_EXTENSION: &str = "fits";
pub const PREVIEW_FILE_NAME: &str = "preview.png";

/// Alignment outcome of one science exposure.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    /// The frame every other one is aligned onto.
    Reference,
    Aligned(Transform),
    /// Alignment disabled.
    Unaligned,
    /// Alignment failed; the frame is left out of the stack.
    AlignmentSkipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct CalibratedFrame {
    pub triple: ColorTriple,
    pub status: FrameStatus,
}

impl CalibratedFrame {
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, FrameStatus::AlignmentSkipped { .. })
    }
}

/// Master calibration frames of a run.
#[derive(Debug, Clone)]
pub struct MasterFrames {
    pub dark: ImageBuffer,
    pub flat: ImageBuffer,
    /// Demosaiced master dark. Absent when subtraction happens on the mosaic.
    pub dark_rgb: Option<ColorTriple>,
    /// Dark-subtracted, demosaiced and median-normalized master flat.
    pub flat_rgb: ColorTriple,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub masters: MasterFrames,
    /// Calibrated science frames in input order.
    pub frames: Vec<CalibratedFrame>,
    pub stacked: Option<ColorTriple>,
}

impl PipelineOutput {
    pub fn skipped_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_skipped()).count()
    }

    /// The stack when one was produced, otherwise the reference frame.
    pub fn final_image(&self) -> Option<&ColorTriple> {
        self.stacked
            .as_ref()
            .or_else(|| self.frames.first().map(|f| &f.triple))
    }
}

/// Calibrate every science frame against masters built from `darks` and `flats`.
///
/// Shape and metadata errors abort the run. Alignment failures only mark the
/// affected frame as skipped.
pub fn calibrate(
    darks: &FrameSet,
    flats: &FrameSet,
    science: &FrameSet,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let _span = tracing::info_span!("calibrate", order = ?config.order).entered();

    let masters = build_masters(darks, flats, config)?;
    calibration_shape_check(&masters, science)?;

    let calibrated = science
        .frames()
        .par_iter()
        .map(|frame| calibrate_frame(frame, &masters, config))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(frames = calibrated.len(), "Calibrated science frames");

    let frames = align_frames(calibrated, config);
    let stacked = if config.stack_science {
        stack_frames(&frames, config)?
    } else {
        None
    };

    Ok(PipelineOutput {
        masters,
        frames,
        stacked,
    })
}

/// Load inputs through `store`, [`calibrate`], then persist outputs and the preview.
pub fn run(
    store: &dyn FrameStore,
    inputs: &PipelineInputs,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    let kind = |kind: FrameKind| inputs.filter_by_type.then_some(kind);

    let darks = store.load_frame_set(&inputs.dark_dir, kind(FrameKind::Dark))?;
    let flats = store.load_frame_set(&inputs.flat_dir, kind(FrameKind::Flat))?;
    let science = store.load_frame_set(&inputs.science_dir, None)?;

    let output = calibrate(&darks, &flats, &science, config)?;

    let out_dir = inputs.output_dir.as_path();
    if config.persist_intermediates {
        persist(store, &output.masters.dark, out_dir)?;
        persist(store, &output.masters.flat, out_dir)?;
        persist_triple(store, &output.masters.flat_rgb, out_dir)?;
        for frame in &output.frames {
            persist_triple(store, &frame.triple, out_dir)?;
        }
    }
    if let Some(stacked) = &output.stacked {
        persist_triple(store, stacked, out_dir)?;
    }

    if config.preview.enabled {
        if let Some(image) = output.final_image() {
            let path = out_dir.join(PREVIEW_FILE_NAME);
            preview::write_preview(image, &config.preview, &path)?;
            tracing::info!(path = %path.display(), "Wrote preview");
        }
    }

    if output.skipped_count() > 0 {
        tracing::warn!(
            skipped = output.skipped_count(),
            total = output.frames.len(),
            "Some frames could not be aligned"
        );
    }
    Ok(output)
}

/// Pattern from the frame header, or `fallback` when the header has none.
fn bayer_pattern(frame: &ImageBuffer, fallback: Option<BayerPattern>) -> Result<BayerPattern> {
    match (frame.header(BAYER_PATTERN_KEY), fallback) {
        (None, Some(pattern)) => Ok(pattern),
        _ => frame.bayer_pattern(),
    }
}

fn build_masters(
    darks: &FrameSet,
    flats: &FrameSet,
    config: &PipelineConfig,
) -> Result<MasterFrames> {
    let dark = stacking::stack(darks, config.stack_method)?;
    let flat = stacking::stack(flats, config.stack_method)?;
    flat.ensure_same_shape(&dark, "master flat vs master dark")?;
    let flat_pattern = bayer_pattern(&flat, config.bayer_pattern)?;

    let (dark_rgb, mut flat_rgb) = match config.order {
        CalibrationOrder::DemosaicFirst => {
            let dark_rgb = demosaic::demosaic(&dark, bayer_pattern(&dark, config.bayer_pattern)?);
            let mut flat_rgb = demosaic::demosaic(&flat, flat_pattern);
            calibration::subtract_triple_in_place(&mut flat_rgb, &dark_rgb)?;
            (Some(dark_rgb), flat_rgb)
        }
        CalibrationOrder::SubtractFirst => {
            let flat_sub = calibration::subtract(&flat, &dark)?;
            (None, demosaic::demosaic(&flat_sub, flat_pattern))
        }
    };
    calibration::normalize_triple_in_place(&mut flat_rgb)?;

    tracing::info!(dark = %dark.origin, flat = %flat.origin, "Built master frames");
    Ok(MasterFrames {
        dark,
        flat,
        dark_rgb,
        flat_rgb,
    })
}

fn calibration_shape_check(masters: &MasterFrames, science: &FrameSet) -> Result<()> {
    crate::image_buffer::ensure_shape(
        masters.dark.shape(),
        science.shape(),
        "science frames vs master dark",
    )
}

fn calibrate_frame(
    frame: &ImageBuffer,
    masters: &MasterFrames,
    config: &PipelineConfig,
) -> Result<ColorTriple> {
    let pattern = bayer_pattern(frame, config.bayer_pattern)?;
    let mut triple = match (&masters.dark_rgb, config.order) {
        (Some(dark_rgb), CalibrationOrder::DemosaicFirst) => {
            let mut triple = demosaic::demosaic(frame, pattern);
            calibration::subtract_triple_in_place(&mut triple, dark_rgb)?;
            triple
        }
        _ => {
            let mut mosaic = frame.clone();
            calibration::subtract_in_place(&mut mosaic, &masters.dark)?;
            demosaic::demosaic(&mosaic, pattern)
        }
    };
    calibration::divide_triple_in_place(&mut triple, &masters.flat_rgb)?;
    if config.equalize_color {
        calibration::equalize_to_green(&mut triple);
    }
    tracing::debug!(origin = %frame.origin, %pattern, "Calibrated frame");
    Ok(triple)
}

/// First frame is the reference. Failures are logged and the frame kept unaligned.
fn align_frames(calibrated: Vec<ColorTriple>, config: &PipelineConfig) -> Vec<CalibratedFrame> {
    let mut iter = calibrated.into_iter();
    let Some(reference) = iter.next() else {
        return Vec::new();
    };
    let rest: Vec<ColorTriple> = iter.collect();

    let statuses: Vec<CalibratedFrame> = if config.align {
        let aligner = FrameAligner::new(config.alignment);
        rest.into_par_iter()
            .map(|triple| match aligner.align_triple(&triple, &reference) {
                Ok((aligned, transform)) => {
                    tracing::info!(origin = %triple.green.origin, %transform, "Aligned frame");
                    CalibratedFrame {
                        triple: aligned,
                        status: FrameStatus::Aligned(transform),
                    }
                }
                Err(err) => {
                    tracing::warn!("Skipping frame: {err}");
                    CalibratedFrame {
                        triple,
                        status: FrameStatus::AlignmentSkipped {
                            reason: err.to_string(),
                        },
                    }
                }
            })
            .collect()
    } else {
        rest.into_iter()
            .map(|triple| CalibratedFrame {
                triple,
                status: FrameStatus::Unaligned,
            })
            .collect()
    };

    let mut frames = Vec::with_capacity(statuses.len() + 1);
    frames.push(CalibratedFrame {
        triple: reference,
        status: FrameStatus::Reference,
    });
    frames.extend(statuses);
    frames
}

/// Per-channel stack of every frame not skipped by alignment.
fn stack_frames(frames: &[CalibratedFrame], config: &PipelineConfig) -> Result<Option<ColorTriple>> {
    let usable: Vec<&ColorTriple> = frames
        .iter()
        .filter(|f| !f.is_skipped())
        .map(|f| &f.triple)
        .collect();
    if usable.len() < 2 {
        tracing::info!(usable = usable.len(), "Not enough frames to stack science");
        return Ok(None);
    }

    let stack_channel = |channel: Channel| -> Result<ImageBuffer> {
        let set = FrameSet::new(usable.iter().map(|t| t.channel(channel).clone()).collect())?;
        stacking::stack(&set, config.stack_method)
    };
    let triple = ColorTriple::new(
        stack_channel(Channel::Red)?,
        stack_channel(Channel::Green)?,
        stack_channel(Channel::Blue)?,
    )?;
    Ok(Some(triple))
}

fn persist(store: &dyn FrameStore, frame: &ImageBuffer, dir: &Path) -> Result<()> {
    let path = dir.join(format!("{}.{FRAME_EXTENSION}", frame.origin));
    store.persist(frame, &path)?;
    tracing::debug!(path = %path.display(), "Persisted frame");
    Ok(())
}

fn persist_triple(store: &dyn FrameStore, triple: &ColorTriple, dir: &Path) -> Result<()> {
    for (_, plane) in triple.iter() {
        persist(store, plane, dir)?;
    }
    Ok(())
}
