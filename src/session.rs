use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ScannerConfig;
use crate::corners::order_corners;
use crate::detection::RectangleDetector;
use crate::error::{Result, ScanError};
use crate::models::{Frame, GuideRegion, Point, Quad};
use crate::ops::{ImageOps, ImageprocOps};
use crate::rectify::{encode_png, rectify};
use crate::stabilizer::{SlotView, TemporalStabilizer};

/// Capture policy and pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Consecutive frames every slot must be detected in before capturing
    pub stable_frames: u32,
    /// Frames arriving faster than this rate are dropped; zero disables pacing
    pub target_fps: f32,
    /// Also produce a PNG encoding of the captured document
    pub encode_png: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stable_frames: 5,
            target_fps: 10.0,
            encode_png: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    Captured,
}

/// Cooperative cancellation flag shared with the frame source
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drops frames that arrive faster than the target rate, based on frame timestamps
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    last: Option<Duration>,
}

impl FramePacer {
    pub fn new(target_fps: f32) -> Self {
        let interval = (target_fps.is_finite() && target_fps > 0.0)
            .then(|| Duration::from_secs_f64(1.0 / target_fps as f64));
        Self { interval, last: None }
    }

    /// Whether a frame captured at `timestamp` should be processed
    pub fn admit(&mut self, timestamp: Duration) -> bool {
        let Some(interval) = self.interval else {
            return true;
        };
        // 1ms slack so frames delivered exactly on the period are not dropped
        let min_gap = interval.saturating_sub(Duration::from_millis(1));
        let admitted = match self.last {
            None => true,
            Some(last) if timestamp < last => true,
            Some(last) => timestamp - last >= min_gap,
        };
        if admitted {
            self.last = Some(timestamp);
        }
        admitted
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Why a frame was not processed
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Arrived sooner than the target frame rate allows
    Paced,
    /// Session is idle or already captured
    NotScanning,
    /// Frame missing or zero-sized
    InputUnavailable(String),
}

/// Recovered failures reported alongside a frame result
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Detection aborted for this frame
    DetectionFailed(String),
    /// Stable detections did not form a usable quadrilateral
    MalformedCandidate(String),
    /// Homography or warp failed
    RectificationFailed(String),
}

/// Per-frame tracking state for overlay rendering
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub slots: Vec<SlotView>,
    /// Every slot currently holds a stable detection
    pub complete: bool,
    pub warnings: Vec<Warning>,
}

/// The session's output artifact
#[derive(Debug, Clone)]
pub struct CapturedDocument {
    pub session_id: Uuid,
    pub image: RgbaImage,
    pub png: Option<Vec<u8>>,
    /// Ordered source corners in frame coordinates
    pub quad: Quad,
    pub frame_timestamp: Duration,
    /// Reissued from an earlier capture because rectification of this frame failed
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub enum FrameOutcome {
    Skipped(SkipReason),
    /// Stop was requested; the session is now idle
    Stopped,
    Tracking(FrameReport),
    Captured {
        document: CapturedDocument,
        report: FrameReport,
    },
}

/// Frame-driven scan controller: Idle → Scanning → Captured → Idle
pub struct ScanSession<O: ImageOps = ImageprocOps> {
    id: Uuid,
    config: ScannerConfig,
    ops: O,
    detector: RectangleDetector,
    state: SessionState,
    guides: Vec<GuideRegion>,
    stabilizer: TemporalStabilizer,
    pacer: FramePacer,
    stop: StopHandle,
    last_quad: Option<Quad>,
    last_artifact: Option<CapturedDocument>,
}

impl ScanSession<ImageprocOps> {
    pub fn new(config: ScannerConfig) -> Self {
        Self::with_ops(config, ImageprocOps)
    }
}

impl<O: ImageOps> ScanSession<O> {
    /// Create an idle session using a custom vision backend
    pub fn with_ops(config: ScannerConfig, ops: O) -> Self {
        let detector = RectangleDetector::new(&config.preprocess, config.detector.clone());
        let stabilizer = TemporalStabilizer::new(config.stabilizer.clone(), 0);
        let pacer = FramePacer::new(config.session.target_fps);
        Self {
            id: Uuid::new_v4(),
            config,
            ops,
            detector,
            state: SessionState::Idle,
            guides: Vec::new(),
            stabilizer,
            pacer,
            stop: StopHandle::default(),
            last_quad: None,
            last_artifact: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Guide regions fixed at session start; empty when the whole frame is tracked
    pub fn guides(&self) -> &[GuideRegion] {
        &self.guides
    }

    pub fn slots(&self) -> Vec<SlotView> {
        self.stabilizer.views()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Quad used for the most recent successful capture
    pub fn last_quad(&self) -> Option<&Quad> {
        self.last_quad.as_ref()
    }

    pub fn last_artifact(&self) -> Option<&CapturedDocument> {
        self.last_artifact.as_ref()
    }

    /// Begin scanning frames of the given size; guide regions are derived once here
    pub fn start(&mut self, width: u32, height: u32) {
        self.guides = self.config.layout.regions(width, height);
        let slot_count = self.guides.len().max(1);
        self.stabilizer = TemporalStabilizer::new(self.config.stabilizer.clone(), slot_count);
        self.pacer.reset();
        self.stop.clear();
        self.state = SessionState::Scanning;
        info!(session = %self.id, width, height, slots = slot_count, "Scan session started");
    }

    /// Drop all tracking state and return to idle; the last artifact is kept as a fallback
    pub fn reset(&mut self) {
        self.stabilizer.reset();
        self.pacer.reset();
        self.last_quad = None;
        self.state = SessionState::Idle;
        info!(session = %self.id, "Scan session reset");
    }

    /// Run one frame through detection, stabilization and, once every slot is stable, capture
    #[instrument(skip_all, fields(session = %self.id, ts = ?frame.timestamp))]
    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutcome {
        if self.stop.is_stopped() {
            if self.state != SessionState::Idle {
                info!("Stop requested, session going idle");
                self.stabilizer.reset();
                self.state = SessionState::Idle;
            }
            return FrameOutcome::Stopped;
        }

        if self.state != SessionState::Scanning {
            return FrameOutcome::Skipped(SkipReason::NotScanning);
        }

        if frame.is_empty() {
            warn!(width = frame.width(), height = frame.height(), "Skipping empty frame");
            return FrameOutcome::Skipped(SkipReason::InputUnavailable(
                "frame has zero dimensions".to_string(),
            ));
        }

        if !self.pacer.admit(frame.timestamp) {
            return FrameOutcome::Skipped(SkipReason::Paced);
        }

        let detections = match self.detector.detect(frame, &self.guides, &self.ops) {
            Ok(detections) => detections,
            Err(ScanError::InputUnavailable(msg)) => {
                warn!(%msg, "Skipping frame");
                return FrameOutcome::Skipped(SkipReason::InputUnavailable(msg));
            }
            Err(err) => {
                warn!(error = %err, "Detection failed for this frame");
                return FrameOutcome::Tracking(FrameReport {
                    slots: self.stabilizer.views(),
                    complete: false,
                    warnings: vec![Warning::DetectionFailed(err.to_string())],
                });
            }
        };

        let slots = self.stabilizer.update(&detections.per_guide);
        let complete = self.stabilizer.all_stable(self.config.session.stable_frames);
        let mut report = FrameReport {
            slots,
            complete,
            warnings: Vec::new(),
        };
        debug!(found = detections.found(), complete, "Frame tracked");

        if !complete {
            return FrameOutcome::Tracking(report);
        }

        match self.capture(frame) {
            Ok(document) => {
                info!(
                    width = document.image.width(),
                    height = document.image.height(),
                    "Document captured"
                );
                self.last_quad = Some(document.quad);
                self.last_artifact = Some(document.clone());
                self.state = SessionState::Captured;
                FrameOutcome::Captured { document, report }
            }
            Err(err @ (ScanError::MalformedQuad(_) | ScanError::Precondition(_))) => {
                warn!(error = %err, "Stable detections do not form a usable quad");
                report.warnings.push(Warning::MalformedCandidate(err.to_string()));
                FrameOutcome::Tracking(report)
            }
            Err(err) => {
                warn!(error = %err, "Rectification failed");
                report.warnings.push(Warning::RectificationFailed(err.to_string()));
                match &self.last_artifact {
                    Some(previous) => {
                        info!("Falling back to previous capture");
                        let document = CapturedDocument {
                            fallback: true,
                            ..previous.clone()
                        };
                        self.state = SessionState::Captured;
                        FrameOutcome::Captured { document, report }
                    }
                    None => FrameOutcome::Tracking(report),
                }
            }
        }
    }

    /// Corner points from the stabilized slots: one anchor corner per guide,
    /// or the four raw corners of the single tracked quad.
    fn capture_corners(&self) -> Result<[Point; 4]> {
        let slots = self.stabilizer.slots();
        if self.guides.is_empty() {
            let candidate = slots.first().and_then(|s| s.latest()).ok_or_else(|| {
                ScanError::MalformedQuad("no tracked quad to capture".to_string())
            })?;
            return Ok(candidate.corners);
        }

        let points = self
            .guides
            .iter()
            .zip(slots)
            .map(|(guide, slot)| {
                slot.smoothed()
                    .map(|rect| rect.corner(guide.anchor))
                    .ok_or_else(|| {
                        ScanError::MalformedQuad(format!("guide '{}' has no detection", guide.name))
                    })
            })
            .collect::<Result<Vec<Point>>>()?;

        points.as_slice().try_into().map_err(|_| {
            ScanError::MalformedQuad(format!(
                "{} guide regions cannot define a quadrilateral, 4 are needed",
                points.len()
            ))
        })
    }

    fn capture(&self, frame: &Frame) -> Result<CapturedDocument> {
        let corners = self.capture_corners()?;
        Quad::new(corners).validate()?;
        let quad = order_corners(corners);

        let rectified = rectify(&frame.image, &quad, &self.ops)?;
        let png = if self.config.session.encode_png {
            Some(encode_png(&rectified.image)?)
        } else {
            None
        };

        Ok(CapturedDocument {
            session_id: self.id,
            image: rectified.image,
            png,
            quad,
            frame_timestamp: frame.timestamp,
            fallback: false,
        })
    }
}
