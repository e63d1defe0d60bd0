use std::path::PathBuf;

use image::GrayImage;
use tracing::debug;

use crate::detection::preprocessing::PreprocessConfig;
use crate::detection::steps::{BlurStep, EdgeDetectionStep, EqualizeStep, ThresholdStep};
use crate::error::{Result, ScanError};
use crate::models::Frame;
use crate::ops::ImageOps;

/// Output of frame preprocessing
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Grayscale frame before any filtering, used for intensity sampling
    pub gray: GrayImage,
    /// Binary edge map with the same dimensions as the frame
    pub edges: GrayImage,
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
pub struct PipelineContext<'a> {
    pub ops: &'a dyn ImageOps,
}

/// A single stage that turns one grayscale buffer into a new one
pub trait PipelineStep: Send + Sync {
    fn process(&self, image: GrayImage, context: &PipelineContext) -> Result<GrayImage>;

    /// Human-readable name for this step (used in logs and debug directories)
    fn name(&self) -> &str;
}

/// Composable preprocessing pipeline: grayscale conversion followed by the configured steps
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    debug: Option<DebugConfig>,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            debug: None,
        }
    }

    /// Build the fixed-order preprocessing chain described by `config`:
    /// blur, optional equalization, optional threshold, edge detection.
    pub fn from_config(config: &PreprocessConfig) -> Self {
        let mut pipeline = Self::new().add_step(Box::new(BlurStep {
            kernel_size: config.blur_kernel,
        }));
        if config.equalize {
            pipeline = pipeline.add_step(Box::new(EqualizeStep));
        }
        if let Some(mode) = config.threshold {
            pipeline = pipeline.add_step(Box::new(ThresholdStep { mode }));
        }
        pipeline.add_step(Box::new(EdgeDetectionStep {
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
        }))
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(ScanError::Precondition(format!(
                    "debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run grayscale conversion and every step on `frame`
    pub fn run(&self, frame: &Frame, ops: &dyn ImageOps) -> Result<Preprocessed> {
        if frame.is_empty() {
            return Err(ScanError::InputUnavailable(format!(
                "frame has zero dimensions ({}x{})",
                frame.width(),
                frame.height()
            )));
        }

        let context = PipelineContext { ops };

        let gray = ops.grayscale(&frame.image);
        self.save_debug_output(0, "grayscale", &gray)?;

        let mut image = gray.clone();
        for (step_idx, step) in self.steps.iter().enumerate() {
            image = step.process(image, &context)?;
            debug!(step = step.name(), "Preprocessing step complete");
            self.save_debug_output(step_idx + 1, step.name(), &image)?;
        }

        Ok(Preprocessed { gray, edges: image })
    }

    fn save_debug_output(&self, index: usize, step_name: &str, image: &GrayImage) -> Result<()> {
        let Some(debug_config) = &self.debug else {
            return Ok(());
        };

        let filename = format!(
            "{:02}_{}.png",
            index,
            step_name.to_lowercase().replace(' ', "_")
        );
        let output_path = debug_config.output_dir.join(&filename);
        image.save(&output_path)?;
        debug!(path = %output_path.display(), "Saved debug image");
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
