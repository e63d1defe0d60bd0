mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use common::*;
use docscan::detection::guides::GuideLayout;
use docscan::detection::preprocessing::ThresholdMode;
use docscan::{Homography, ScanError};
use image::{DynamicImage, GrayImage, RgbaImage};

/// Real backend whose perspective warp can be switched to fail
struct FlakyWarp {
    inner: ImageprocOps,
    fail: Rc<Cell<bool>>,
}

impl ImageOps for FlakyWarp {
    fn grayscale(&self, image: &DynamicImage) -> GrayImage {
        self.inner.grayscale(image)
    }

    fn gaussian_blur(&self, image: &GrayImage, kernel_size: u32) -> GrayImage {
        self.inner.gaussian_blur(image, kernel_size)
    }

    fn equalize_histogram(&self, image: &GrayImage) -> GrayImage {
        self.inner.equalize_histogram(image)
    }

    fn threshold(&self, image: &GrayImage, mode: &ThresholdMode) -> GrayImage {
        self.inner.threshold(image, mode)
    }

    fn detect_edges(&self, image: &GrayImage, low: f32, high: f32) -> GrayImage {
        self.inner.detect_edges(image, low, high)
    }

    fn find_external_contours(&self, edges: &GrayImage) -> Vec<Vec<Point>> {
        self.inner.find_external_contours(edges)
    }

    fn warp_perspective(
        &self,
        image: &RgbaImage,
        homography: &Homography,
        width: u32,
        height: u32,
    ) -> docscan::Result<RgbaImage> {
        if self.fail.get() {
            return Err(ScanError::Rectification("warp disabled".to_string()));
        }
        self.inner.warp_perspective(image, homography, width, height)
    }
}

fn flaky_session(config: ScannerConfig) -> (ScanSession<FlakyWarp>, Rc<Cell<bool>>) {
    let fail = Rc::new(Cell::new(false));
    let ops = FlakyWarp {
        inner: ImageprocOps,
        fail: Rc::clone(&fail),
    };
    (ScanSession::with_ops(config, ops), fail)
}

fn is_tracking(outcome: &FrameOutcome) -> bool {
    matches!(outcome, FrameOutcome::Tracking(_))
}

#[test]
fn test_markers_session_captures_once() -> anyhow::Result<()> {
    let mut session = ScanSession::new(ScannerConfig::markers());
    session.start(320, 240);
    assert_eq!(session.state(), SessionState::Scanning);
    assert_eq!(session.guides().len(), 4);

    let mut captures = Vec::new();
    for index in 0..60 {
        let frame = if index < 55 {
            blank_frame(320, 240, index)
        } else {
            markers_frame(index)
        };
        match session.process_frame(&frame) {
            FrameOutcome::Captured { document, report } => {
                assert!(report.complete);
                assert!(report.warnings.is_empty(), "{:?}", report.warnings);
                captures.push((index, document));
            }
            FrameOutcome::Tracking(report) => {
                assert!(!report.complete);
                assert_eq!(report.slots.len(), 4);
            }
            other => panic!("frame {}: unexpected outcome {:?}", index, other),
        }
    }

    assert_eq!(captures.len(), 1);
    let (index, document) = &captures[0];
    assert_eq!(*index, 59);
    assert_eq!(document.session_id, session.id());
    assert!(!document.fallback);
    assert_eq!(document.frame_timestamp, timestamp(59));
    assert!(document.png.is_some());

    // Outer corners of the four markers: (12, 4) to (308, 200)
    assert_close(document.quad.top_left().x, 12.0, 3.0, "top-left x");
    assert_close(document.quad.top_left().y, 4.0, 3.0, "top-left y");
    assert_close(document.quad.bottom_right().x, 308.0, 3.0, "bottom-right x");
    assert_close(document.quad.bottom_right().y, 200.0, 3.0, "bottom-right y");
    assert_close(document.image.width() as f32, 296.0, 4.0, "document width");
    assert_close(document.image.height() as f32, 196.0, 4.0, "document height");

    assert_eq!(session.state(), SessionState::Captured);
    assert_eq!(session.last_quad(), Some(&document.quad));

    let after = session.process_frame(&markers_frame(60));
    assert!(matches!(after, FrameOutcome::Skipped(SkipReason::NotScanning)));
    Ok(())
}

#[test]
fn test_document_session_captures_square() {
    let mut session = ScanSession::new(ScannerConfig::document());
    session.start(640, 480);
    assert!(session.guides().is_empty());

    for index in 0..4 {
        assert!(is_tracking(&session.process_frame(&square_frame(index))));
    }
    let FrameOutcome::Captured { document, .. } = session.process_frame(&square_frame(4)) else {
        panic!("fifth stable frame should capture");
    };
    assert_close(document.image.width() as f32, 200.0, 3.0, "width");
    assert_close(document.image.height() as f32, 200.0, 3.0, "height");

    let png = document.png.expect("png requested by default");
    let decoded = image::load_from_memory(&png).expect("valid png");
    assert_eq!(decoded.width(), document.image.width());
}

#[test]
fn test_frames_before_start_are_skipped() {
    let mut session = ScanSession::new(ScannerConfig::document());
    assert_eq!(session.state(), SessionState::Idle);
    let outcome = session.process_frame(&square_frame(0));
    assert!(matches!(outcome, FrameOutcome::Skipped(SkipReason::NotScanning)));
}

#[test]
fn test_stop_handle_ends_scanning() {
    let mut session = ScanSession::new(ScannerConfig::document());
    session.start(320, 240);
    let handle = session.stop_handle();

    assert!(is_tracking(&session.process_frame(&blank_frame(320, 240, 0))));
    handle.stop();
    assert!(handle.is_stopped());
    assert!(matches!(session.process_frame(&blank_frame(320, 240, 1)), FrameOutcome::Stopped));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(matches!(session.process_frame(&blank_frame(320, 240, 2)), FrameOutcome::Stopped));

    session.start(320, 240);
    assert!(!handle.is_stopped());
    assert!(is_tracking(&session.process_frame(&blank_frame(320, 240, 3))));
}

#[test]
fn test_frames_are_paced() {
    let mut session = ScanSession::new(ScannerConfig::document());
    session.start(320, 240);
    let blank = canvas_with_rects(320, 240, &[], BLACK);
    let at = |ms: u64| Frame::new(DynamicImage::ImageRgba8(blank.clone()), Duration::from_millis(ms));

    assert!(is_tracking(&session.process_frame(&at(0))));
    assert!(matches!(session.process_frame(&at(30)), FrameOutcome::Skipped(SkipReason::Paced)));
    assert!(matches!(session.process_frame(&at(60)), FrameOutcome::Skipped(SkipReason::Paced)));
    assert!(is_tracking(&session.process_frame(&at(100))));

    let mut unpaced = ScannerConfig::document();
    unpaced.session.target_fps = 0.0;
    let mut session = ScanSession::new(unpaced);
    session.start(320, 240);
    assert!(is_tracking(&session.process_frame(&at(0))));
    assert!(is_tracking(&session.process_frame(&at(0))));
}

#[test]
fn test_empty_frame_is_skipped() {
    let mut session = ScanSession::new(ScannerConfig::document());
    session.start(320, 240);
    let empty = Frame::new(DynamicImage::new_rgba8(0, 0), Duration::ZERO);
    let outcome = session.process_frame(&empty);
    assert!(matches!(outcome, FrameOutcome::Skipped(SkipReason::InputUnavailable(_))));
    assert_eq!(session.state(), SessionState::Scanning);

    let short_buffer = Frame::from_rgba(4, 4, vec![0; 10], Duration::ZERO);
    assert!(matches!(short_buffer, Err(docscan::ScanError::InputUnavailable(_))));
}

#[test]
fn test_reset_keeps_last_artifact() {
    let mut session = ScanSession::new(ScannerConfig::document());
    session.start(640, 480);
    for index in 0..5 {
        session.process_frame(&square_frame(index));
    }
    assert_eq!(session.state(), SessionState::Captured);

    session.reset();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.last_quad().is_none());
    assert!(session.last_artifact().is_some());
    assert!(session.slots().iter().all(|slot| slot.rect.is_none()));
}

#[test]
fn test_rectification_failure_without_fallback_keeps_scanning() {
    let (mut session, fail) = flaky_session(ScannerConfig::document());
    fail.set(true);
    session.start(640, 480);

    let mut last = None;
    for index in 0..5 {
        last = Some(session.process_frame(&square_frame(index)));
    }
    let report = match last {
        Some(FrameOutcome::Tracking(report)) => report,
        other => panic!("expected tracking, got {:?}", other),
    };
    assert!(report.complete);
    assert!(matches!(report.warnings.as_slice(), [Warning::RectificationFailed(_)]));
    assert_eq!(session.state(), SessionState::Scanning);
}

#[test]
fn test_rectification_failure_reissues_previous_capture() {
    let (mut session, fail) = flaky_session(ScannerConfig::document());
    session.start(640, 480);
    for index in 0..5 {
        session.process_frame(&square_frame(index));
    }
    let first = session.last_artifact().expect("first capture").clone();

    session.reset();
    fail.set(true);
    session.start(640, 480);
    let mut last = None;
    for index in 5..10 {
        last = Some(session.process_frame(&square_frame(index)));
    }
    let (document, report) = match last {
        Some(FrameOutcome::Captured { document, report }) => (document, report),
        other => panic!("expected fallback capture, got {:?}", other),
    };
    assert!(document.fallback);
    assert_eq!(document.image, first.image);
    assert!(matches!(report.warnings.as_slice(), [Warning::RectificationFailed(_)]));
    assert_eq!(session.state(), SessionState::Captured);
}

#[test]
fn test_two_guides_cannot_form_quad() {
    let mut config = ScannerConfig::markers();
    config.layout = GuideLayout::Custom {
        regions: vec![
            GuideRegion::new("left", Rect::new(0.0, 0.0, 64.0, 48.0), Anchor::TopLeft),
            GuideRegion::new("right", Rect::new(256.0, 0.0, 64.0, 48.0), Anchor::TopRight),
        ],
    };
    let mut session = ScanSession::new(config);
    session.start(320, 240);

    let mut last = None;
    for index in 0..5 {
        last = Some(session.process_frame(&markers_frame(index)));
    }
    let report = match last {
        Some(FrameOutcome::Tracking(report)) => report,
        other => panic!("expected tracking, got {:?}", other),
    };
    assert!(matches!(report.warnings.as_slice(), [Warning::MalformedCandidate(_)]));
    assert_eq!(session.state(), SessionState::Scanning);
}

#[test]
fn test_png_encoding_can_be_disabled() {
    let mut config = ScannerConfig::document();
    config.session.encode_png = false;
    let mut session = ScanSession::new(config);
    session.start(640, 480);

    let mut captured = None;
    for index in 0..5 {
        if let FrameOutcome::Captured { document, .. } = session.process_frame(&square_frame(index)) {
            captured = Some(document);
        }
    }
    let document = captured.expect("captured on the fifth frame");
    assert!(document.png.is_none());
}
