use image::GrayImage;
use tracing::debug;

use crate::detection::DetectorConfig;
use crate::geometry::{arc_length, bounding_rect, is_convex, polygon_area};
use crate::models::{Candidate, Rect};
use crate::ops::ImageOps;
use crate::pipeline::Preprocessed;

/// Why a contour did not become a candidate
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RejectionCounts {
    pub not_quad: usize,
    pub too_small: usize,
    pub aspect: usize,
    pub not_convex: usize,
    pub too_bright: usize,
}

/// Extract quadrilateral candidates from an edge map, in contour order
pub fn find_candidates(
    frame: &Preprocessed,
    config: &DetectorConfig,
    ops: &dyn ImageOps,
) -> (Vec<Candidate>, RejectionCounts) {
    let contours = ops.find_external_contours(&frame.edges);
    let mut rejected = RejectionCounts::default();
    let mut candidates = Vec::new();

    for contour in &contours {
        if contour.len() < 4 {
            rejected.not_quad += 1;
            continue;
        }

        let epsilon = config.approx_factor * arc_length(contour, true);
        let polygon = ops.approximate_polygon(contour, epsilon);
        if polygon.len() != 4 {
            rejected.not_quad += 1;
            continue;
        }

        let area = polygon_area(&polygon);
        if area <= config.min_area {
            rejected.too_small += 1;
            continue;
        }

        let rect = bounding_rect(&polygon);
        let aspect = rect.aspect_ratio();
        if aspect <= config.aspect_min || aspect >= config.aspect_max {
            rejected.aspect += 1;
            continue;
        }

        if config.require_convex && !is_convex(&polygon) {
            rejected.not_convex += 1;
            continue;
        }

        let mean_intensity = match &config.intensity {
            Some(filter) => {
                let mean = mean_intensity(&frame.gray, &rect);
                if mean >= filter.max_mean {
                    rejected.too_bright += 1;
                    continue;
                }
                Some(mean)
            }
            None => None,
        };

        candidates.push(Candidate {
            rect,
            corners: [polygon[0], polygon[1], polygon[2], polygon[3]],
            area,
            mean_intensity,
        });
    }

    debug!(
        contours = contours.len(),
        candidates = candidates.len(),
        ?rejected,
        "Quadrilateral filtering complete"
    );

    (candidates, rejected)
}

/// Mean grayscale value of the pixels covered by `rect`, clamped to the image
pub fn mean_intensity(gray: &GrayImage, rect: &Rect) -> f32 {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let min_x = rect.x.floor().max(0.0) as u32;
    let min_y = rect.y.floor().max(0.0) as u32;
    let max_x = (rect.right().ceil().max(0.0) as u32).min(width - 1);
    let max_y = (rect.bottom().ceil().max(0.0) as u32).min(height - 1);

    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            sum += gray.get_pixel(x, y)[0] as u64;
            count += 1;
        }
    }

    if count > 0 {
        sum as f32 / count as f32
    } else {
        0.0
    }
}
