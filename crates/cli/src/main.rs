use std::path::PathBuf;
use std::process;

use clap::Parser;

use facedetect_core::pipeline::detection_pipeline::{DetectionPipeline, PipelineConfig};
use facedetect_core::pipeline::error::PipelineError;
use facedetect_core::shared::constants::{
    DEFAULT_CASCADE_PATH, DEFAULT_INPUT_PATH, DEFAULT_OUTPUT_PATH,
};
use facedetect_core::{ENGINE_NAME, ENGINE_VERSION};

/// Detect faces in a still image and outline them.
#[derive(Parser)]
#[command(name = "facedetect", version)]
struct Cli {
    /// Input image file.
    #[arg(default_value = DEFAULT_INPUT_PATH)]
    input: PathBuf,

    /// Output image file; the format follows the extension.
    #[arg(default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Haar-cascade classifier definition (OpenCV XML).
    #[arg(long, default_value = DEFAULT_CASCADE_PATH)]
    cascade: PathBuf,
}

impl From<Cli> for PipelineConfig {
    fn from(cli: Cli) -> Self {
        Self {
            cascade_path: cli.cascade,
            input_path: cli.input,
            output_path: cli.output,
        }
    }
}

fn main() {
    let config = PipelineConfig::from(Cli::parse());

    if let Err(e) = init_logging() {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    if let Err(e) = run(&config) {
        // Run-local failures were already logged by the pipeline.
        if e.is_fatal() {
            log::error!("{e}");
        }
        process::exit(1);
    }
}

fn init_logging() -> Result<(), PipelineError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()
        .map_err(|e| PipelineError::Startup(e.to_string()))?;
    log::info!("Cascade engine ready ({ENGINE_NAME} v{ENGINE_VERSION})");
    Ok(())
}

fn run(config: &PipelineConfig) -> Result<(), PipelineError> {
    let mut pipeline = DetectionPipeline::from_config(config)?;
    pipeline.run(&config.input_path, &config.output_path)?;
    Ok(())
}
