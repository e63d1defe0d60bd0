use crate::models::{Point, Rect};

/// Ramer–Douglas–Peucker simplification of an open polyline.
///
/// Sequences shorter than 3 points are returned unchanged. The result is
/// never longer than the input and always keeps both endpoints.
pub fn simplify_polygon(points: &[Point], epsilon: f32) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let end = points.len() - 1;
    let mut dmax = 0.0f32;
    let mut index = 0;
    for i in 1..end {
        let d = perpendicular_distance(&points[i], &points[0], &points[end]);
        if d > dmax {
            index = i;
            dmax = d;
        }
    }

    if index > 0 && dmax > epsilon {
        let mut left = simplify_polygon(&points[..=index], epsilon);
        let right = simplify_polygon(&points[index..], epsilon);
        // shared endpoint appears at the end of `left` and the start of `right`
        left.pop();
        left.extend(right);
        left
    } else {
        vec![points[0], points[end]]
    }
}

/// Distance from `point` to the line through `line_start` and `line_end`.
///
/// Falls back to the plain Euclidean distance when the two line points coincide.
pub fn perpendicular_distance(point: &Point, line_start: &Point, line_end: &Point) -> f32 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;
    if dx == 0.0 && dy == 0.0 {
        return point.distance(line_start);
    }
    let t = ((point.x - line_start.x) * dx + (point.y - line_start.y) * dy) / (dx * dx + dy * dy);
    let nearest = Point::new(line_start.x + t * dx, line_start.y + t * dy);
    point.distance(&nearest)
}

/// RDP simplification of a closed contour.
///
/// The contour is split at two mutually distant points so that the arbitrary
/// start point of a traced border does not survive as a spurious vertex.
pub fn simplify_closed(points: &[Point], epsilon: f32) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let far_a = farthest_from(points, &points[0]);
    let far_b = farthest_from(points, &points[far_a]);
    if points[far_a].distance(&points[far_b]) == 0.0 {
        return vec![points[0]];
    }

    let (start, end) = (far_a.min(far_b), far_a.max(far_b));
    let first = &points[start..=end];
    let second: Vec<Point> = points[end..]
        .iter()
        .chain(points[..=start].iter())
        .copied()
        .collect();

    let mut result = simplify_polygon(first, epsilon);
    let mut tail = simplify_polygon(&second, epsilon);
    result.pop();
    tail.pop();
    result.extend(tail);
    result
}

fn farthest_from(points: &[Point], origin: &Point) -> usize {
    let mut best = 0;
    let mut best_dist = -1.0f32;
    for (i, p) in points.iter().enumerate() {
        let d = p.distance(origin);
        if d > best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// Length of a polyline, including the closing segment when `closed`
pub fn arc_length(points: &[Point], closed: bool) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }
    let open: f32 = points.windows(2).map(|w| w[0].distance(&w[1])).sum();
    if closed {
        open + points[points.len() - 1].distance(&points[0])
    } else {
        open
    }
}

/// Absolute polygon area (shoelace formula)
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut area = 0.0f32;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area.abs() / 2.0
}

/// True when every turn of the closed polygon bends the same way.
///
/// A zero turn (collinear consecutive vertices) counts as not convex.
pub fn is_convex(points: &[Point]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f32;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let turn = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if turn == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return false;
        }
    }
    true
}

/// Smallest axis-aligned rectangle enclosing the points
pub fn bounding_rect(points: &[Point]) -> Rect {
    if points.is_empty() {
        return Rect::default();
    }
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}
