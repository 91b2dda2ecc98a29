use glam::{Vec2, Vec3};
use tracing::{debug, trace};

use crate::mesh::{build_geometry, WaveParams};
use crate::path::{lift, normalize_drawing};
use crate::smooth::smooth_points;
use crate::surface::{MeshId, RenderSurface, RibbonMaterial, RibbonMesh};

/// Samples a freehand stroke is resampled to before tessellation.
pub const DRAWING_SAMPLES: usize = 150;

/// Ribbon width used for strokes and the initial "W".
pub const DRAWING_WIDTH: f32 = 1.2;

/// Inputs of the most recent successful build, replayed on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RibbonState {
    pub points: Vec<Vec3>,
    pub width: f32,
}

/// The single ribbon on screen.
///
/// Owns its cached backbone and the id of the mesh currently attached to the
/// surface. Each build releases the previous mesh before attaching the new
/// one, so at most one ribbon mesh is ever live.
pub struct Ribbon<S: RenderSurface> {
    surface: S,
    mesh: Option<MeshId>,
    texture: Option<S::Texture>,
    state: Option<RibbonState>,
    wave: WaveParams,
}

impl<S: RenderSurface> Ribbon<S> {
    pub fn new(surface: S, wave: WaveParams) -> Self {
        Self {
            surface,
            mesh: None,
            texture: None,
            state: None,
            wave,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn mesh(&self) -> Option<MeshId> {
        self.mesh
    }

    pub fn state(&self) -> Option<&RibbonState> {
        self.state.as_ref()
    }

    pub fn wave(&self) -> &WaveParams {
        &self.wave
    }

    pub fn set_wave(&mut self, wave: WaveParams) {
        self.wave = wave;
    }

    /// Points the ribbon material at `texture`, including the live mesh.
    pub fn set_texture(&mut self, texture: Option<S::Texture>) {
        self.texture = texture;
        if let Some(id) = self.mesh {
            self.surface.set_texture(id, self.texture.clone());
        }
    }

    /// Rebuilds the ribbon around `points`.
    ///
    /// Fewer than two points is a no-op that keeps the current mesh.
    pub fn build_from_points(&mut self, points: &[Vec3], width: f32, time: f32) -> Option<MeshId> {
        let Some(geometry) = build_geometry(points, width, time, &self.wave) else {
            debug!(points = points.len(), "ignoring ribbon build with fewer than two points");
            return None;
        };

        self.state = Some(RibbonState {
            points: points.to_vec(),
            width,
        });

        self.release_mesh();
        let id = self.surface.attach(RibbonMesh {
            geometry,
            material: RibbonMaterial::new(self.texture.clone()),
        });
        trace!(mesh = id.0, time, "attached ribbon mesh");
        self.mesh = Some(id);
        Some(id)
    }

    /// Re-tessellates the cached backbone at `time`.
    pub fn update(&mut self, time: f32) -> Option<MeshId> {
        let state = self.state.take()?;
        let id = self.build_from_points(&state.points, state.width, time);
        if id.is_none() {
            self.state = Some(state);
        }
        id
    }

    /// Turns a raw screen-space stroke into a ribbon.
    pub fn create_from_drawing(&mut self, drawing: &[Vec2]) -> Option<MeshId> {
        self.create_from_drawing_with(drawing, DRAWING_SAMPLES, DRAWING_WIDTH)
    }

    /// [`Ribbon::create_from_drawing`] with an explicit sample count and width.
    pub fn create_from_drawing_with(
        &mut self,
        drawing: &[Vec2],
        samples: usize,
        width: f32,
    ) -> Option<MeshId> {
        if drawing.len() < 2 {
            return None;
        }
        let backbone = smooth_points(&lift(&normalize_drawing(drawing)), samples);
        debug!(
            raw = drawing.len(),
            smoothed = backbone.len(),
            "building ribbon from drawing"
        );
        self.build_from_points(&backbone, width, 0.0)
    }

    /// Releases the live mesh and forgets the cached backbone.
    pub fn dispose(&mut self) {
        self.release_mesh();
        self.state = None;
    }

    fn release_mesh(&mut self) {
        if let Some(id) = self.mesh.take() {
            // Dropping the returned mesh frees its geometry and material.
            drop(self.surface.release(id));
        }
    }
}
