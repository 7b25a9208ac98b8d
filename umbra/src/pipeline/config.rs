//! Pipeline settings, loadable from YAML or JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::demosaic::BayerPattern;
pub use crate::preview::PreviewConfig;
use crate::registration::AlignConfig;
use crate::stacking::StackMethod;

/// Where dark subtraction happens relative to demosaicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationOrder {
    /// stack → demosaic → per-channel subtract / normalize / divide.
    #[default]
    DemosaicFirst,
    /// stack → subtract on the mosaic → demosaic → per-channel normalize / divide.
    SubtractFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub order: CalibrationOrder,
    /// Used for master darks, master flats and the science stack.
    pub stack_method: StackMethod,
    pub align: bool,
    pub alignment: AlignConfig,
    /// Combine the calibrated science frames into one stack.
    pub stack_science: bool,
    /// Match red and blue statistics to green after flat correction.
    pub equalize_color: bool,
    /// Also persist master frames and per-frame calibrated planes.
    pub persist_intermediates: bool,
    pub preview: PreviewConfig,
    /// Pattern to use when a frame has no `BAYERPAT` header.
    pub bayer_pattern: Option<BayerPattern>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            order: CalibrationOrder::DemosaicFirst,
            stack_method: StackMethod::Median,
            align: true,
            alignment: AlignConfig::default(),
            stack_science: true,
            equalize_color: false,
            persist_intermediates: false,
            preview: PreviewConfig::default(),
            bayer_pattern: None,
        }
    }
}

/// Directory layout of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInputs {
    pub dark_dir: PathBuf,
    pub flat_dir: PathBuf,
    pub science_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Keep only darks typed `dark` and flats typed `flat`. Science frames
    /// are never filtered since their type keys usually hold the object name.
    #[serde(default = "default_true")]
    pub filter_by_type: bool,
}

fn default_true() -> bool {
    true
}

impl PipelineInputs {
    /// Conventional `darks/`, `flats/`, `lights/` and `output/` under `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            dark_dir: root.join("darks"),
            flat_dir: root.join("flats"),
            science_dir: root.join("lights"),
            output_dir: root.join("output"),
            filter_by_type: true,
        }
    }
}

/// Everything one invocation needs: inputs plus pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub inputs: PipelineInputs,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Base tracing filter, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RunConfig {
    pub fn load(path: &Path) -> common::SerdeFormatResult<Self> {
        common::load_file(path)
    }
}
