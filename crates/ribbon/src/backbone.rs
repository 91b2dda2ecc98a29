use glam::Vec3;

/// Parameter offset used for the central-difference tangent.
pub const TANGENT_DELTA: f32 = 0.001;

/// Piecewise-linear curve over a polyline, parameterised by point index.
///
/// `t` maps linearly onto index space, so every input segment occupies an
/// equal share of `[0, 1]` regardless of its length.
#[derive(Debug, Clone, Copy)]
pub struct Backbone<'a> {
    points: &'a [Vec3],
}

impl<'a> Backbone<'a> {
    /// Wraps `points`; returns `None` when there are fewer than two.
    pub fn new(points: &'a [Vec3]) -> Option<Self> {
        (points.len() >= 2).then_some(Self { points })
    }

    pub fn points(&self) -> &'a [Vec3] {
        self.points
    }

    pub fn position(&self, t: f32) -> Vec3 {
        let last = self.points.len() - 1;
        let index = t.clamp(0.0, 1.0) * last as f32;
        let a = (index.floor() as usize).min(last);
        let b = (index.ceil() as usize).min(last);
        self.points[a].lerp(self.points[b], index - a as f32)
    }

    /// Unit tangent by central difference; zero when both samples coincide.
    pub fn tangent(&self, t: f32) -> Vec3 {
        let behind = self.position((t - TANGENT_DELTA).max(0.0));
        let ahead = self.position((t + TANGENT_DELTA).min(1.0));
        (ahead - behind).normalize_or_zero()
    }
}
