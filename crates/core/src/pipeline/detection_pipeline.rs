use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::cascade_face_detector::CascadeFaceDetector;
use crate::drawing::domain::box_renderer::BoxRenderer;
use crate::drawing::infrastructure::outline_renderer::OutlineRenderer;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::imaging::infrastructure::image_file_reader::ImageFileReader;
use crate::imaging::infrastructure::image_file_writer::ImageFileWriter;
use crate::pipeline::error::PipelineError;
use crate::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use crate::shared::constants::{DEFAULT_CASCADE_PATH, DEFAULT_INPUT_PATH, DEFAULT_OUTPUT_PATH};
use crate::shared::region::Region;

/// File locations for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub cascade_path: PathBuf,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cascade_path: PathBuf::from(DEFAULT_CASCADE_PATH),
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionReport {
    pub regions: Vec<Region>,
    pub width: u32,
    pub height: u32,
    pub output_path: PathBuf,
}

impl DetectionReport {
    pub fn face_count(&self) -> usize {
        self.regions.len()
    }
}

/// Single-image pipeline: read → detect → draw → write.
pub struct DetectionPipeline {
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
    detector: Box<dyn FaceDetector>,
    renderer: Box<dyn BoxRenderer>,
    logger: Box<dyn PipelineLogger>,
}

impl DetectionPipeline {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
        detector: Box<dyn FaceDetector>,
        renderer: Box<dyn BoxRenderer>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            writer,
            detector,
            renderer,
            logger,
        }
    }

    /// Builds the file-backed pipeline, loading the cascade named in
    /// `config`. No image is read or written here.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let detector = CascadeFaceDetector::from_file(&config.cascade_path)?;
        Ok(Self::new(
            Box::new(ImageFileReader::new()),
            Box::new(ImageFileWriter::new()),
            Box::new(detector),
            Box::new(OutlineRenderer::default()),
            Box::new(LogPipelineLogger::new()),
        ))
    }

    /// Marks every face found in `input_path` and saves the result to
    /// `output_path`. Failures are logged before being returned.
    pub fn run(
        &mut self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<DetectionReport, PipelineError> {
        let result = self.execute(input_path, output_path);
        if let Err(e) = &result {
            log::error!("{e}");
        }
        self.logger.summary();
        result
    }

    fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<DetectionReport, PipelineError> {
        let t0 = Instant::now();
        let mut frame = self
            .reader
            .read(input_path)
            .map_err(|e| PipelineError::Input {
                path: input_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.logger.timing("read", elapsed_ms(t0));
        self.logger.info(&format!(
            "Loaded image {} ({}x{})",
            input_path.display(),
            frame.width(),
            frame.height()
        ));

        let t0 = Instant::now();
        let regions = self
            .detector
            .detect(&frame)
            .map_err(|e| PipelineError::Detection(e.to_string()))?;
        self.logger.timing("detect", elapsed_ms(t0));
        self.logger
            .info(&format!("{} face(s) detected.", regions.len()));

        let t0 = Instant::now();
        self.renderer
            .draw(&mut frame, &regions)
            .map_err(|e| PipelineError::Drawing(e.to_string()))?;
        self.logger.timing("draw", elapsed_ms(t0));

        let t0 = Instant::now();
        self.writer
            .write(output_path, &frame)
            .map_err(|e| PipelineError::Output {
                path: output_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.logger.timing("write", elapsed_ms(t0));
        self.logger.info(&format!(
            "Result saved successfully to: {}",
            output_path.display()
        ));

        Ok(DetectionReport {
            regions,
            width: frame.width(),
            height: frame.height(),
            output_path: output_path.to_path_buf(),
        })
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
