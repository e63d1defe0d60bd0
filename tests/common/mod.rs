#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from docscan for tests
pub use docscan::{
    Anchor, Candidate, Frame, FrameOutcome, GuideRegion, ImageOps, ImageprocOps, Point, Quad,
    Rect, ScanSession, ScannerConfig, SessionState, SkipReason, Warning,
};
