//! Ribbon tessellation.
//!
//! A ribbon is a quad strip swept along a [`Backbone`]. Each of the
//! [`SEGMENTS`]` + 1` samples contributes a left/right vertex pair offset
//! along a smoothed normal, and the normal is twisted about the tangent by a
//! travelling sine wave so the strip keeps moving even when the backbone is
//! static.
//!
//! The frame is not a true rotation-minimising frame: each sample's normal is
//! a lerp between the previous normal and `cross(+Y, tangent)`, which lags
//! behind sharp turns but never flips.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

use crate::backbone::Backbone;

/// Fixed tessellation density, independent of the input point count.
pub const SEGMENTS: usize = 600;

/// Number of vertices produced by every build.
pub const VERTEX_COUNT: usize = 2 * (SEGMENTS + 1);

/// Number of indices produced by every build.
pub const INDEX_COUNT: usize = 6 * SEGMENTS;

/// Blend factor between the previous and the freshly computed normal.
pub const NORMAL_SMOOTHING: f32 = 0.05;

/// Travelling twist applied to the ribbon normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    /// Peak twist in radians.
    pub amplitude: f32,
    /// Wave crests along the ribbon length.
    pub frequency: f32,
    /// Phase advance per second of animation time.
    pub speed: f32,
}

impl WaveParams {
    pub fn phase(&self, t: f32, time: f32) -> f32 {
        (t * TAU * self.frequency + time * self.speed).sin() * self.amplitude
    }
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            amplitude: 0.2,
            frequency: 2.0,
            speed: 2.0,
        }
    }
}

/// Interleaved vertex layout for GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RibbonVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Flat vertex/index buffers for one ribbon frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RibbonGeometry {
    /// Three floats per vertex.
    pub positions: Vec<f32>,
    /// Two floats per vertex.
    pub uvs: Vec<f32>,
    /// Three indices per triangle.
    pub indices: Vec<u32>,
}

impl RibbonGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, vertex: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[vertex * 3..vertex * 3 + 3])
    }

    /// Packs positions and UVs into a single vertex stream.
    pub fn interleaved(&self) -> Vec<RibbonVertex> {
        self.positions
            .chunks_exact(3)
            .zip(self.uvs.chunks_exact(2))
            .map(|(position, uv)| RibbonVertex {
                position: [position[0], position[1], position[2]],
                uv: [uv[0], uv[1]],
            })
            .collect()
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Sweeps a ribbon of `width` along `points` at animation `time`.
///
/// Returns `None` when fewer than two points are supplied.
pub fn build_geometry(
    points: &[Vec3],
    width: f32,
    time: f32,
    wave: &WaveParams,
) -> Option<RibbonGeometry> {
    let backbone = Backbone::new(points)?;
    let half_width = width / 2.0;

    let mut positions = Vec::with_capacity(VERTEX_COUNT * 3);
    let mut uvs = Vec::with_capacity(VERTEX_COUNT * 2);
    let mut indices = Vec::with_capacity(INDEX_COUNT);
    let mut previous_normal: Option<Vec3> = None;

    for i in 0..=SEGMENTS {
        let t = i as f32 / SEGMENTS as f32;
        let point = backbone.position(t);
        let tangent = backbone.tangent(t);

        let mut normal = Vec3::Y.cross(tangent).normalize_or_zero();
        if let Some(previous) = previous_normal {
            normal = previous.lerp(normal, NORMAL_SMOOTHING).normalize_or_zero();
        }
        previous_normal = Some(normal);

        // A zero tangent has no rotation axis; leave the normal untwisted.
        if tangent != Vec3::ZERO {
            normal = Quat::from_axis_angle(tangent, wave.phase(t, time)) * normal;
        }

        let left = point - normal * half_width;
        let right = point + normal * half_width;
        positions.extend_from_slice(&left.to_array());
        positions.extend_from_slice(&right.to_array());
        uvs.extend_from_slice(&[0.0, t, 1.0, t]);

        if i < SEGMENTS {
            let base = (i * 2) as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2]);
            indices.extend_from_slice(&[base + 1, base + 3, base + 2]);
        }
    }

    Some(RibbonGeometry {
        positions,
        uvs,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::initial_w;

    fn line(count: usize) -> Vec<Vec3> {
        (0..count)
            .map(|i| Vec3::new(i as f32 / count as f32 * 8.0 - 4.0, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn topology_is_fixed_regardless_of_input_density() {
        for count in [2, 80, 600] {
            let geometry = build_geometry(&line(count), 1.0, 0.0, &WaveParams::default())
                .expect("geometry");
            assert_eq!(geometry.vertex_count(), VERTEX_COUNT);
            assert_eq!(geometry.uvs.len(), VERTEX_COUNT * 2);
            assert_eq!(geometry.index_count(), INDEX_COUNT);
            assert_eq!(geometry.triangle_count(), 2 * SEGMENTS);
        }
    }

    #[test]
    fn degenerate_input_builds_nothing() {
        let wave = WaveParams::default();
        assert!(build_geometry(&[], 1.0, 0.0, &wave).is_none());
        assert!(build_geometry(&[Vec3::ONE], 1.0, 0.0, &wave).is_none());
    }

    #[test]
    fn follows_quad_strip_index_pattern() {
        let geometry = build_geometry(&line(4), 1.0, 0.0, &WaveParams::default()).unwrap();
        assert_eq!(&geometry.indices[..6], &[0, 1, 2, 1, 3, 2]);
        assert_eq!(&geometry.indices[6..12], &[2, 3, 4, 3, 5, 4]);
        let max = *geometry.indices.iter().max().unwrap() as usize;
        assert_eq!(max, VERTEX_COUNT - 1);
    }

    #[test]
    fn uvs_run_across_and_along_the_strip() {
        let geometry = build_geometry(&line(2), 1.0, 0.0, &WaveParams::default()).unwrap();
        assert_eq!(&geometry.uvs[..4], &[0.0, 0.0, 1.0, 0.0]);
        let tail = &geometry.uvs[geometry.uvs.len() - 4..];
        assert_eq!(tail, &[0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn vertex_pairs_are_width_apart() {
        let width = 1.2;
        let points = initial_w(80, 8.0, 5.0, 0.0);
        let geometry = build_geometry(&points, width, 0.7, &WaveParams::default()).unwrap();
        for pair in 0..=SEGMENTS {
            let left = geometry.position(pair * 2);
            let right = geometry.position(pair * 2 + 1);
            assert!((left.distance(right) - width).abs() < 1e-4);
        }
    }

    #[test]
    fn straight_backbone_without_wave_lies_flat() {
        let flat = WaveParams {
            amplitude: 0.0,
            ..WaveParams::default()
        };
        let geometry = build_geometry(&line(10), 2.0, 3.0, &flat).unwrap();
        // cross(+Y, +X) = -Z, so the strip spans z = ±1 in the y = 0 plane.
        for pair in 0..=SEGMENTS {
            let left = geometry.position(pair * 2);
            let right = geometry.position(pair * 2 + 1);
            assert!(left.y.abs() < 1e-6 && right.y.abs() < 1e-6);
            assert!((left.z - 1.0).abs() < 1e-5);
            assert!((right.z + 1.0).abs() < 1e-5);
        }
    }

    fn pair_normal(geometry: &RibbonGeometry, pair: usize, width: f32) -> Vec3 {
        (geometry.position(pair * 2 + 1) - geometry.position(pair * 2)) / width
    }

    #[test]
    fn normal_lags_behind_a_sharp_corner() {
        let still = WaveParams {
            amplitude: 0.0,
            ..WaveParams::default()
        };
        // +X leg then +Z leg; the corner sits at t = 0.5.
        let points = [Vec3::new(-2.0, 0.0, 0.0), Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0)];
        let geometry = build_geometry(&points, 1.0, 0.0, &still).unwrap();
        let backbone = Backbone::new(&points).unwrap();

        let corner = SEGMENTS / 2;
        assert!((pair_normal(&geometry, corner - 1, 1.0) + Vec3::Z).length() < 1e-4);

        for pair in corner..corner + 5 {
            let t = pair as f32 / SEGMENTS as f32;
            let fresh = Vec3::Y.cross(backbone.tangent(t)).normalize();
            let previous = pair_normal(&geometry, pair - 1, 1.0);
            let expected = previous.lerp(fresh, 0.05).normalize();
            let actual = pair_normal(&geometry, pair, 1.0);
            assert!(actual.distance(expected) < 1e-4, "pair {pair}: {actual:?}");
        }

        // Just past the corner the fresh normal is +X, but the strip still
        // faces mostly along -Z.
        let after = pair_normal(&geometry, corner + 1, 1.0);
        assert!(after.dot(Vec3::X) < 0.2, "{after:?}");
        assert!(after.dot(-Vec3::Z) > 0.9, "{after:?}");
    }

    #[test]
    fn twist_angle_travels_along_the_strip() {
        let wave = WaveParams {
            amplitude: 0.3,
            frequency: 2.0,
            speed: 1.5,
        };
        let time = 0.4;
        let width = 2.0;
        let geometry = build_geometry(&line(10), width, time, &wave).unwrap();

        let mut angles = Vec::new();
        for pair in (0..=SEGMENTS).step_by(25) {
            let t = pair as f32 / SEGMENTS as f32;
            // The untwisted normal is -Z; rotating it about +X by `a` gives
            // (0, sin a, -cos a).
            let normal = pair_normal(&geometry, pair, width);
            let angle = normal.y.atan2(-normal.z);
            let expected = (t * TAU * 2.0 + time * 1.5).sin() * 0.3;
            assert!((angle - expected).abs() < 1e-4, "t {t}: {angle} != {expected}");
            assert!((wave.phase(t, time) - expected).abs() < 1e-6);
            angles.push(angle);
        }
        let spread = angles.iter().cloned().fold(f32::MIN, f32::max)
            - angles.iter().cloned().fold(f32::MAX, f32::min);
        assert!(spread > 0.5, "twist should vary along the strip");
    }

    #[test]
    fn animation_moves_vertices_but_not_topology() {
        let points = initial_w(80, 8.0, 5.0, 0.0);
        let wave = WaveParams::default();
        let early = build_geometry(&points, 1.0, 0.0, &wave).unwrap();
        let late = build_geometry(&points, 1.0, 1.3, &wave).unwrap();
        assert_ne!(early.positions, late.positions);
        assert_eq!(early.indices, late.indices);
        assert_eq!(early.uvs, late.uvs);
    }

    #[test]
    fn interleaved_view_matches_flat_buffers() {
        let geometry = build_geometry(&line(3), 1.0, 0.0, &WaveParams::default()).unwrap();
        let vertices = geometry.interleaved();
        assert_eq!(vertices.len(), VERTEX_COUNT);
        assert_eq!(vertices[3].position, geometry.position(3).to_array());
        assert_eq!(vertices[3].uv, [1.0, geometry.uvs[7]]);
        assert_eq!(geometry.index_bytes().len(), INDEX_COUNT * 4);
        assert_eq!(
            bytemuck::cast_slice::<RibbonVertex, u8>(&vertices).len(),
            VERTEX_COUNT * std::mem::size_of::<RibbonVertex>()
        );
    }
}
