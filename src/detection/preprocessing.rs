use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Frame;
use crate::ops::ImageOps;
use crate::pipeline::{Pipeline, Preprocessed};

/// Binarization applied between blur/equalization and edge detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Global threshold at `level`
    Fixed { level: u8, invert: bool },
    /// Global threshold picked by Otsu's method
    Otsu { invert: bool },
    /// Local mean over a `block_size` window minus `c`
    Adaptive { block_size: u32, c: f32, invert: bool },
}

/// Parameters of the grayscale → blur → equalize → threshold → Canny chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Odd Gaussian kernel size; below 3 disables blurring
    pub blur_kernel: u32,
    pub equalize: bool,
    pub threshold: Option<ThresholdMode>,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl PreprocessConfig {
    /// Whole-document detection: blur, Otsu binarization, Canny
    pub fn document() -> Self {
        Self {
            blur_kernel: 5,
            equalize: false,
            threshold: Some(ThresholdMode::Otsu { invert: false }),
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }

    /// Dark corner markers: blur, equalize, inverted adaptive threshold, Canny
    pub fn markers() -> Self {
        Self {
            blur_kernel: 5,
            equalize: true,
            threshold: Some(ThresholdMode::Adaptive {
                block_size: 11,
                c: 2.0,
                invert: true,
            }),
            canny_low: 80.0,
            canny_high: 200.0,
        }
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self::document()
    }
}

/// Convert a frame into its grayscale image and binary edge map
pub fn preprocess(frame: &Frame, config: &PreprocessConfig, ops: &dyn ImageOps) -> Result<Preprocessed> {
    Pipeline::from_config(config).run(frame, ops)
}
