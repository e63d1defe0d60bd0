use std::time::Duration;

use image::{DynamicImage, GenericImageView, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// A point in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Which corner of a rectangle to pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

/// Axis-aligned rectangle in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Negative dimensions are clamped to zero
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0.0 {
            return 0.0;
        }
        self.width / self.height
    }

    /// Inclusive on all four edges
    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Exponential smoothing towards `target`: `alpha * target + (1 - alpha) * self`
    pub fn lerp(&self, target: &Rect, alpha: f32) -> Rect {
        let mix = |old: f32, new: f32| alpha * new + (1.0 - alpha) * old;
        Rect {
            x: mix(self.x, target.x),
            y: mix(self.y, target.y),
            width: mix(self.width, target.width),
            height: mix(self.height, target.height),
        }
    }

    pub fn corner(&self, anchor: Anchor) -> Point {
        match anchor {
            Anchor::TopLeft => Point::new(self.x, self.y),
            Anchor::TopRight => Point::new(self.right(), self.y),
            Anchor::BottomLeft => Point::new(self.x, self.bottom()),
            Anchor::BottomRight => Point::new(self.right(), self.bottom()),
            Anchor::Center => self.center(),
        }
    }
}

/// Four points, canonically ordered [top-left, top-right, bottom-left, bottom-right]
/// once they have been through [`crate::corners::order_corners`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub points: [Point; 4],
}

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    pub fn top_left(&self) -> Point {
        self.points[0]
    }

    pub fn top_right(&self) -> Point {
        self.points[1]
    }

    pub fn bottom_left(&self) -> Point {
        self.points[2]
    }

    pub fn bottom_right(&self) -> Point {
        self.points[3]
    }

    /// Check that the four points can form a convex, simple quadrilateral:
    /// all distinct, no three collinear, and none inside the triangle of the other three.
    pub fn validate(&self) -> Result<()> {
        let pts = &self.points;
        for i in 0..4 {
            for j in (i + 1)..4 {
                if pts[i].distance(&pts[j]) < 1e-3 {
                    return Err(ScanError::MalformedQuad(format!(
                        "corners {} and {} coincide at ({:.1}, {:.1})",
                        i, j, pts[i].x, pts[i].y
                    )));
                }
            }
        }

        for (a, b, c) in [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)] {
            if nearly_collinear(&pts[a], &pts[b], &pts[c]) {
                return Err(ScanError::MalformedQuad(format!(
                    "corners {}, {} and {} are collinear",
                    a, b, c
                )));
            }
        }

        for i in 0..4 {
            let others: Vec<Point> = (0..4).filter(|&j| j != i).map(|j| pts[j]).collect();
            if inside_triangle(&pts[i], &others[0], &others[1], &others[2]) {
                return Err(ScanError::MalformedQuad(format!(
                    "corner {} lies inside the other three, quad is not convex",
                    i
                )));
            }
        }

        Ok(())
    }
}

fn cross(o: &Point, a: &Point, b: &Point) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn nearly_collinear(a: &Point, b: &Point, c: &Point) -> bool {
    let scale = a.distance(b) * a.distance(c);
    cross(a, b, c).abs() <= 1e-4 * scale
}

fn inside_triangle(p: &Point, a: &Point, b: &Point, c: &Point) -> bool {
    let d1 = cross(a, b, p);
    let d2 = cross(b, c, p);
    let d3 = cross(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// A named region of the frame a detection must fall into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideRegion {
    pub name: String,
    pub bounds: Rect,
    /// Corner of a marker found in this region that becomes a document corner
    pub anchor: Anchor,
}

impl GuideRegion {
    pub fn new(name: impl Into<String>, bounds: Rect, anchor: Anchor) -> Self {
        Self {
            name: name.into(),
            bounds,
            anchor,
        }
    }
}

/// A single camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    /// Capture time relative to the start of the stream
    pub timestamp: Duration,
}

impl Frame {
    pub fn new(image: DynamicImage, timestamp: Duration) -> Self {
        Self { image, timestamp }
    }

    /// Wrap a raw RGBA buffer as delivered by a camera or canvas
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>, timestamp: Duration) -> Result<Self> {
        let buffer = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            ScanError::InputUnavailable(format!(
                "RGBA buffer does not match {}x{} frame",
                width, height
            ))
        })?;
        Ok(Self::new(DynamicImage::ImageRgba8(buffer), timestamp))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// A quadrilateral found by the detector
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Bounding box of the corner points
    pub rect: Rect,
    /// Corner points in contour order (not canonically ordered)
    pub corners: [Point; 4],
    /// Polygon area of the corners
    pub area: f32,
    /// Mean grayscale intensity inside `rect`, when sampled
    pub mean_intensity: Option<f32>,
}

impl Candidate {
    pub fn quad(&self) -> Quad {
        Quad::new(self.corners)
    }
}
