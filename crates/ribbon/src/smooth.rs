use glam::Vec3;

/// Knot spacings shorter than this are treated as degenerate.
const MIN_KNOT_SPACING: f32 = 1e-4;

/// Resamples `points` into `samples` evenly parameterised points on an open
/// centripetal Catmull-Rom spline passing through every input point.
///
/// Inputs with fewer than two points are returned unchanged.
pub fn smooth_points(points: &[Vec3], samples: usize) -> Vec<Vec3> {
    if points.len() < 2 {
        return points.to_vec();
    }

    match samples {
        0 => Vec::new(),
        1 => vec![points[0]],
        _ => {
            let last = (samples - 1) as f32;
            (0..samples)
                .map(|index| centripetal_point(points, index as f32 / last))
                .collect()
        }
    }
}

/// Evaluates the open centripetal Catmull-Rom curve through `points` at `t`.
///
/// Requires at least two points.
pub fn centripetal_point(points: &[Vec3], t: f32) -> Vec3 {
    let count = points.len();
    debug_assert!(count >= 2, "spline needs at least two control points");

    let scaled = (count - 1) as f32 * t.clamp(0.0, 1.0);
    let mut segment = scaled.floor() as usize;
    let mut weight = scaled - segment as f32;
    if segment >= count - 1 {
        segment = count - 2;
        weight = 1.0;
    }

    let p1 = points[segment];
    let p2 = points[segment + 1];
    let p0 = if segment > 0 {
        points[segment - 1]
    } else {
        p1 + (p1 - p2)
    };
    let p3 = if segment + 2 < count {
        points[segment + 2]
    } else {
        p2 + (p2 - p1)
    };

    // alpha = 0.5: knot spacing is the square root of the chord length.
    let mut dt1 = p1.distance_squared(p2).powf(0.25);
    let mut dt0 = p0.distance_squared(p1).powf(0.25);
    let mut dt2 = p2.distance_squared(p3).powf(0.25);
    if dt1 < MIN_KNOT_SPACING {
        dt1 = 1.0;
    }
    if dt0 < MIN_KNOT_SPACING {
        dt0 = dt1;
    }
    if dt2 < MIN_KNOT_SPACING {
        dt2 = dt1;
    }

    let m1 = ((p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1) * dt1;
    let m2 = ((p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2) * dt1;

    hermite(p1, p2, m1, m2, weight)
}

fn hermite(p1: Vec3, p2: Vec3, m1: Vec3, m2: Vec3, t: f32) -> Vec3 {
    let c2 = -3.0 * p1 + 3.0 * p2 - 2.0 * m1 - m2;
    let c3 = 2.0 * p1 - 2.0 * p2 + m1 + m2;
    p1 + m1 * t + c2 * (t * t) + c3 * (t * t * t)
}
