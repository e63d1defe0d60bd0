use crate::error::{Result, ScanError};
use crate::models::{Point, Quad};

/// Order four points as [top-left, top-right, bottom-left, bottom-right].
///
/// The two points with the smallest y form the top pair and each pair is
/// then split by x. This is a heuristic for near-axis-aligned quads only:
/// once a quad is rotated far enough that a bottom corner rises above a top
/// corner (around 45 degrees), the y split picks the wrong pair and the
/// result is not a valid corner order. Callers must reject degenerate input
/// (coincident or collinear points) beforehand, see [`Quad::validate`].
pub fn order_corners(points: [Point; 4]) -> Quad {
    let mut sorted = points;
    sorted.sort_by(|a, b| a.y.total_cmp(&b.y));

    let (top, bottom) = sorted.split_at_mut(2);
    top.sort_by(|a, b| a.x.total_cmp(&b.x));
    bottom.sort_by(|a, b| a.x.total_cmp(&b.x));

    Quad::new([top[0], top[1], bottom[0], bottom[1]])
}

/// Checked variant of [`order_corners`] for slices of unknown length
pub fn order_points(points: &[Point]) -> Result<Quad> {
    let points: [Point; 4] = points.try_into().map_err(|_| {
        ScanError::Precondition(format!(
            "corner ordering needs exactly 4 points, got {}",
            points.len()
        ))
    })?;
    Ok(order_corners(points))
}
