pub mod contours;
pub mod guides;
pub mod preprocessing;
pub mod steps;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::models::{Candidate, Frame, GuideRegion};
use crate::ops::ImageOps;
use crate::pipeline::Pipeline;
use contours::RejectionCounts;
use guides::GuideAssignment;
use preprocessing::PreprocessConfig;

/// Reject candidates whose interior is not dark enough
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityFilter {
    /// Mean grayscale inside the bounding box must be strictly below this
    pub max_mean: f32,
}

impl Default for IntensityFilter {
    fn default() -> Self {
        Self { max_mean: 50.0 }
    }
}

/// Quadrilateral filter thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Polygon area must exceed this (square pixels)
    pub min_area: f32,
    /// Bounding-box width/height must lie strictly between the two bounds
    pub aspect_min: f32,
    pub aspect_max: f32,
    pub require_convex: bool,
    /// Polygon approximation tolerance as a fraction of the contour perimeter
    pub approx_factor: f32,
    pub intensity: Option<IntensityFilter>,
    pub assignment: GuideAssignment,
}

impl DetectorConfig {
    /// Dark square markers inside guide boxes
    pub fn markers() -> Self {
        Self {
            intensity: Some(IntensityFilter::default()),
            ..Self::default()
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_area: 20.0,
            aspect_min: 0.5,
            aspect_max: 2.0,
            require_convex: true,
            approx_factor: 0.02,
            intensity: None,
            assignment: GuideAssignment::Centroid,
        }
    }
}

/// Per-frame detector output
#[derive(Debug, Clone, Default)]
pub struct Detections {
    /// One entry per guide region, or a single entry when no guides are used
    pub per_guide: Vec<Option<Candidate>>,
    /// Candidates that passed the shape filters before guide assignment
    pub total_candidates: usize,
    /// Contours dropped by each filter
    pub rejected: RejectionCounts,
}

impl Detections {
    pub fn found(&self) -> usize {
        self.per_guide.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        !self.per_guide.is_empty() && self.per_guide.iter().all(Option::is_some)
    }
}

/// Finds rectangles in frames: preprocessing, quadrilateral filtering and guide assignment
pub struct RectangleDetector {
    pipeline: Pipeline,
    pub config: DetectorConfig,
}

impl RectangleDetector {
    pub fn new(preprocess: &PreprocessConfig, config: DetectorConfig) -> Self {
        Self {
            pipeline: Pipeline::from_config(preprocess),
            config,
        }
    }

    /// Run the full detection on one frame.
    ///
    /// With an empty `guides` slice the whole frame is one guide and the
    /// single largest candidate is reported.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height(), guides = guides.len()))]
    pub fn detect(&self, frame: &Frame, guides: &[GuideRegion], ops: &dyn ImageOps) -> Result<Detections> {
        let preprocessed = self.pipeline.run(frame, ops)?;
        let (candidates, rejected) = contours::find_candidates(&preprocessed, &self.config, ops);

        let per_guide = if guides.is_empty() {
            vec![guides::largest(&candidates).cloned()]
        } else {
            guides::assign_to_guides(&candidates, guides, self.config.assignment)
        };

        let detections = Detections {
            per_guide,
            total_candidates: candidates.len(),
            rejected,
        };
        debug!(
            found = detections.found(),
            candidates = detections.total_candidates,
            "Detection complete"
        );
        Ok(detections)
    }
}
