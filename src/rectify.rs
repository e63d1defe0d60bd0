use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};
use imageproc::geometric_transformations::Projection;
use tracing::{debug, instrument};

use crate::error::{Result, ScanError};
use crate::models::{Point, Quad};
use crate::ops::ImageOps;

/// Projective transform from frame coordinates onto output coordinates
#[derive(Debug, Clone, Copy)]
pub struct Homography {
    projection: Projection,
}

impl Homography {
    /// Exact homography mapping each `src[i]` onto `dst[i]`.
    ///
    /// Degenerate correspondences (coincident or collinear points) have no
    /// solution and are reported as [`ScanError::Rectification`].
    pub fn from_correspondences(src: &[Point; 4], dst: &[Point; 4]) -> Result<Self> {
        Projection::from_control_points(src.map(|p| (p.x, p.y)), dst.map(|p| (p.x, p.y)))
            .map(|projection| Self { projection })
            .ok_or_else(|| {
                ScanError::Rectification("corner correspondences are degenerate".to_string())
            })
    }

    /// Homography from an ordered quad onto the `[0, width] x [0, height]` rectangle
    pub fn from_quad_to_rect(quad: &Quad, width: f32, height: f32) -> Result<Self> {
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(width, 0.0),
            Point::new(0.0, height),
            Point::new(width, height),
        ];
        Self::from_correspondences(&quad.points, &dst)
    }

    /// Map a point; `None` when it lands on the line at infinity
    pub fn apply(&self, p: &Point) -> Option<Point> {
        let (x, y) = self.projection * (p.x, p.y);
        (x.is_finite() && y.is_finite()).then(|| Point::new(x, y))
    }

    pub fn inverse(&self) -> Self {
        Self {
            projection: self.projection.invert(),
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }
}

/// Output size inferred from an ordered quad: the longer of each pair of opposite edges
pub fn output_size(quad: &Quad) -> (f32, f32) {
    let top = quad.top_left().distance(&quad.top_right());
    let bottom = quad.bottom_left().distance(&quad.bottom_right());
    let left = quad.top_left().distance(&quad.bottom_left());
    let right = quad.top_right().distance(&quad.bottom_right());
    (top.max(bottom), left.max(right))
}

/// Result of a successful rectification
#[derive(Debug, Clone)]
pub struct Rectified {
    pub image: RgbaImage,
    /// Ordered source corners that were mapped onto the output corners
    pub quad: Quad,
    pub homography: Homography,
}

/// Warp the region bounded by an ordered `quad` into an upright image.
///
/// Degenerate quads (coincident or collinear corners, zero-length edges)
/// are reported as [`ScanError::Rectification`].
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn rectify(image: &DynamicImage, quad: &Quad, ops: &dyn ImageOps) -> Result<Rectified> {
    quad.validate()
        .map_err(|err| ScanError::Rectification(err.to_string()))?;

    let (width, height) = output_size(quad);
    let (out_w, out_h) = (width.round() as u32, height.round() as u32);
    if out_w == 0 || out_h == 0 {
        return Err(ScanError::Rectification(format!(
            "inferred output size {}x{} is empty",
            out_w, out_h
        )));
    }

    let homography = Homography::from_quad_to_rect(quad, out_w as f32, out_h as f32)?;
    let warped = ops.warp_perspective(&image.to_rgba8(), &homography, out_w, out_h)?;
    debug!(out_w, out_h, "Perspective warp complete");

    Ok(Rectified {
        image: warped,
        quad: *quad,
        homography,
    })
}

/// Encode an RGBA buffer as PNG bytes
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
