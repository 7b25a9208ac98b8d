use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, Command};

use umbra::{FitsStore, FrameStatus, RunConfig};

fn main() -> Result<()> {
    let matches = Command::new("umbra")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("config")
                .value_name("RUN_CONFIG")
                .help("YAML or JSON file with `inputs` and optional `pipeline` settings.")
                .required(true),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .help("Directory for rolling log files.")
                .default_value("logs"),
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .context("Missing run config argument")?;
    let log_dir = matches
        .get_one::<String>("log-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"));

    let run_config = RunConfig::load(&config_path)
        .with_context(|| format!("Failed to load run config '{}'", config_path.display()))?;
    common::log_setup::setup_logging(&run_config.log_level, &log_dir)
        .context("Failed to set up logging")?;

    tracing::info!(config = %config_path.display(), "Starting calibration run");
    let output = umbra::run(&FitsStore::new(), &run_config.inputs, &run_config.pipeline)
        .context("Calibration run failed")?;

    for frame in &output.frames {
        let origin = &frame.triple.green.origin;
        match &frame.status {
            FrameStatus::Reference => tracing::info!("{origin}: reference"),
            FrameStatus::Aligned(transform) => tracing::info!("{origin}: {transform}"),
            FrameStatus::Unaligned => tracing::info!("{origin}: not aligned"),
            FrameStatus::AlignmentSkipped { reason } => tracing::warn!("{origin}: skipped, {reason}"),
        }
    }
    tracing::info!(
        frames = output.frames.len(),
        skipped = output.skipped_count(),
        stacked = output.stacked.is_some(),
        "Done"
    );
    Ok(())
}
