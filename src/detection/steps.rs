use image::GrayImage;

use crate::detection::preprocessing::ThresholdMode;
use crate::error::{Result, ScanError};
use crate::pipeline::{PipelineContext, PipelineStep};

/// Apply Gaussian blur
pub struct BlurStep {
    pub kernel_size: u32,
}

impl PipelineStep for BlurStep {
    fn process(&self, image: GrayImage, context: &PipelineContext) -> Result<GrayImage> {
        Ok(context.ops.gaussian_blur(&image, self.kernel_size))
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }
}

/// Spread the intensity histogram over the full range
pub struct EqualizeStep;

impl PipelineStep for EqualizeStep {
    fn process(&self, image: GrayImage, context: &PipelineContext) -> Result<GrayImage> {
        Ok(context.ops.equalize_histogram(&image))
    }

    fn name(&self) -> &str {
        "Histogram Equalization"
    }
}

/// Binarize with a fixed, Otsu or adaptive threshold
pub struct ThresholdStep {
    pub mode: ThresholdMode,
}

impl PipelineStep for ThresholdStep {
    fn process(&self, image: GrayImage, context: &PipelineContext) -> Result<GrayImage> {
        Ok(context.ops.threshold(&image, &self.mode))
    }

    fn name(&self) -> &str {
        "Threshold"
    }
}

/// Detect edges using Canny
pub struct EdgeDetectionStep {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl PipelineStep for EdgeDetectionStep {
    fn process(&self, image: GrayImage, context: &PipelineContext) -> Result<GrayImage> {
        if self.high_threshold < self.low_threshold {
            return Err(ScanError::Precondition(format!(
                "Canny high threshold {} is below low threshold {}",
                self.high_threshold, self.low_threshold
            )));
        }
        Ok(context
            .ops
            .detect_edges(&image, self.low_threshold, self.high_threshold))
    }

    fn name(&self) -> &str {
        "Edge Detection"
    }
}
