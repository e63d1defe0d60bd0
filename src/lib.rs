pub mod config;
pub mod corners;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod models;
pub mod ops;
pub mod pipeline;
pub mod rectify;
pub mod session;
pub mod stabilizer;

pub use config::ScannerConfig;
pub use corners::{order_corners, order_points};
pub use detection::{Detections, DetectorConfig, RectangleDetector};
pub use error::{Result, ScanError};
pub use models::{Anchor, Candidate, Frame, GuideRegion, Point, Quad, Rect};
pub use ops::{ImageOps, ImageprocOps};
pub use pipeline::{Pipeline, PipelineContext, PipelineStep, Preprocessed};
pub use rectify::{Homography, Rectified, encode_png, rectify};
pub use session::{
    CapturedDocument, FrameOutcome, FramePacer, FrameReport, ScanSession, SessionConfig,
    SessionState, SkipReason, StopHandle, Warning,
};
pub use stabilizer::{DetectionSlot, SlotView, StabilizerConfig, TemporalStabilizer};
