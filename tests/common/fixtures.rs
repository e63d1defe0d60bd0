use std::time::Duration;

use docscan::{Candidate, Frame, Point, Rect};
use image::{DynamicImage, Rgba, RgbaImage};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Frame interval at the default 10 fps pacing
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Marker boxes for a 320x240 frame, each centered in its corner guide
/// (guides are 64x48, bottom pair starting at y = 156).
pub const MARKERS_320X240: [(u32, u32, u32, u32); 4] = [
    (12, 4, 40, 40),
    (268, 4, 40, 40),
    (12, 160, 40, 40),
    (268, 160, 40, 40),
];

/// White canvas with filled rectangles `(x, y, width, height)` painted in `color`
pub fn canvas_with_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)], color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let inside = rects
            .iter()
            .any(|&(rx, ry, rw, rh)| x >= rx && x < rx + rw && y >= ry && y < ry + rh);
        if inside { color } else { WHITE }
    })
}

/// Timestamp of the `index`-th frame at the default frame rate
pub fn timestamp(index: u32) -> Duration {
    FRAME_INTERVAL * index
}

pub fn frame(image: RgbaImage, index: u32) -> Frame {
    Frame::new(DynamicImage::ImageRgba8(image), timestamp(index))
}

pub fn blank_frame(width: u32, height: u32, index: u32) -> Frame {
    frame(canvas_with_rects(width, height, &[], BLACK), index)
}

/// 640x480 white frame with a black square spanning (100,100)-(300,300)
pub fn square_frame(index: u32) -> Frame {
    frame(canvas_with_rects(640, 480, &[(100, 100, 200, 200)], BLACK), index)
}

/// 320x240 white frame with one black square marker inside each corner guide
pub fn markers_frame(index: u32) -> Frame {
    frame(canvas_with_rects(320, 240, &MARKERS_320X240, BLACK), index)
}

/// Axis-aligned candidate as the detector would report it
pub fn candidate(x: f32, y: f32, width: f32, height: f32) -> Candidate {
    let rect = Rect::new(x, y, width, height);
    Candidate {
        rect,
        corners: [
            Point::new(x, y),
            Point::new(x, y + height),
            Point::new(x + width, y + height),
            Point::new(x + width, y),
        ],
        area: width * height,
        mean_intensity: None,
    }
}

pub fn assert_close(actual: f32, expected: f32, tolerance: f32, what: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{}: expected {} ± {}, got {}",
        what,
        expected,
        tolerance,
        actual
    );
}
