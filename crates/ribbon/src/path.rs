//! Backbone sources: the built-in "W" curve and freehand pointer strokes.
//!
//! Both produce points in the same world-space range (roughly `[-4, 4]` on the
//! longer axis) so either can feed the smoother and mesh builder directly.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};

/// Span, in world units, that the longer side of a drawing is scaled to.
pub const DRAWING_SPAN: f32 = 8.0;

/// Generates a "W" from two superimposed sine waves spread along the x axis.
pub fn initial_w(num_points: usize, width: f32, height: f32, z: f32) -> Vec<Vec3> {
    let denominator = num_points.saturating_sub(1).max(1) as f32;
    (0..num_points)
        .map(|i| {
            let phase = i as f32 / denominator;
            let x = (phase - 0.5) * width;
            let dips = (phase * TAU * 2.0).sin() * 0.6 + (phase * TAU).sin() * 0.4;
            let y = dips * height * 0.5;
            Vec3::new(x, y, z)
        })
        .collect()
}

/// The default backbone shown before anything has been drawn.
pub fn default_w() -> Vec<Vec3> {
    initial_w(80, 8.0, 5.0, 0.0)
}

/// Centres a screen-space drawing and scales its longer side to
/// [`DRAWING_SPAN`], flipping y so "up" on screen is +y in world space.
pub fn normalize_drawing(points: &[Vec2]) -> Vec<Vec2> {
    if points.len() < 2 {
        return points.to_vec();
    }

    let (min, max) = points.iter().fold(
        (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
        |(min, max), point| (min.min(*point), max.max(*point)),
    );
    let size = max - min;
    let center = min + size / 2.0;
    let longest = size.max_element();
    let scale = if longest > 0.0 {
        DRAWING_SPAN / longest
    } else {
        1.0
    };

    points
        .iter()
        .map(|point| {
            let offset = (*point - center) * scale;
            Vec2::new(offset.x, -offset.y)
        })
        .collect()
}

/// Lifts 2D points onto the `z = 0` plane.
pub fn lift(points: &[Vec2]) -> Vec<Vec3> {
    points.iter().map(|point| point.extend(0.0)).collect()
}

/// Collects one freehand stroke from pointer events.
#[derive(Debug, Clone, Default)]
pub struct Stroke {
    points: Vec<Vec2>,
    active: bool,
}

impl Stroke {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh stroke, discarding any unfinished one.
    pub fn pointer_down(&mut self, position: Vec2) {
        self.points.clear();
        self.points.push(position);
        self.active = true;
    }

    /// Extends the stroke while the primary button is held.
    pub fn pointer_move(&mut self, position: Vec2, primary_held: bool) {
        if self.active && primary_held {
            self.points.push(position);
        }
    }

    /// Ends the stroke; yields the raw points when there are enough to build
    /// a ribbon from.
    pub fn pointer_up(&mut self) -> Option<Vec<Vec2>> {
        if !self.active {
            return None;
        }
        self.active = false;
        let points = std::mem::take(&mut self.points);
        (points.len() >= 2).then_some(points)
    }

    /// Pointer cancellation finishes the stroke the same way a release does.
    pub fn pointer_cancel(&mut self) -> Option<Vec<Vec2>> {
        self.pointer_up()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn w_spans_requested_width_and_starts_at_rest() {
        let points = initial_w(80, 8.0, 5.0, 0.5);
        assert_eq!(points.len(), 80);
        assert!((points[0].x + 4.0).abs() < 1e-6);
        assert!((points[79].x - 4.0).abs() < 1e-5);
        assert!(points[0].y.abs() < 1e-6);
        assert!(points.iter().all(|p| p.z == 0.5));
        assert!(points.iter().all(|p| p.y.abs() <= 2.5));
    }

    #[test]
    fn normalizes_longer_side_to_span() {
        let drawing = [
            Vec2::new(100.0, 100.0),
            Vec2::new(300.0, 150.0),
            Vec2::new(500.0, 200.0),
        ];
        let normalized = normalize_drawing(&drawing);
        assert!(normalized[0].abs_diff_eq(Vec2::new(-4.0, 1.0), 1e-5));
        assert!(normalized[1].abs_diff_eq(Vec2::ZERO, 1e-5));
        assert!(normalized[2].abs_diff_eq(Vec2::new(4.0, -1.0), 1e-5));
    }

    #[test]
    fn zero_extent_drawing_keeps_unit_scale() {
        let drawing = [Vec2::new(3.0, 3.0), Vec2::new(3.0, 3.0)];
        assert_eq!(normalize_drawing(&drawing), vec![Vec2::ZERO, Vec2::ZERO]);
    }

    #[test]
    fn stroke_records_only_while_pressed() {
        let mut stroke = Stroke::new();
        stroke.pointer_move(Vec2::ONE, true);
        assert!(stroke.points().is_empty());

        stroke.pointer_down(Vec2::ZERO);
        stroke.pointer_move(Vec2::X, true);
        stroke.pointer_move(Vec2::Y, false);
        stroke.pointer_move(Vec2::ONE, true);
        assert!(stroke.is_active());

        let points = stroke.pointer_up().expect("stroke");
        assert_eq!(points, vec![Vec2::ZERO, Vec2::X, Vec2::ONE]);
        assert!(!stroke.is_active());
        assert!(stroke.pointer_up().is_none());
    }

    #[test]
    fn single_tap_is_not_a_stroke() {
        let mut stroke = Stroke::new();
        stroke.pointer_down(Vec2::ZERO);
        assert!(stroke.pointer_cancel().is_none());
    }
}
