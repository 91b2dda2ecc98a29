//! Ribbon geometry for Rivvon.
//!
//! The crate turns a backbone polyline into an animated, textured strip:
//!
//! ```text
//!   path source (W / stroke)
//!          │ Vec<Vec3>
//!          ▼
//!   smooth_points ──▶ Ribbon::build_from_points ──▶ build_geometry ──▶ RenderSurface
//!                             ▲                                            │
//!                             └──────── Ribbon::update(time) ◀── render tick
//! ```
//!
//! `Ribbon` caches the last backbone so the render loop can re-tessellate it
//! every tick with a new animation time. Geometry is rebuilt from scratch each
//! time; the previous mesh is released from the surface before the new one is
//! attached.

mod backbone;
mod clock;
mod mesh;
mod path;
mod ribbon;
mod smooth;
mod surface;

pub use backbone::{Backbone, TANGENT_DELTA};
pub use clock::{FixedStepTimeSource, TimeSample, TimeSource};
pub use mesh::{
    build_geometry, RibbonGeometry, RibbonVertex, WaveParams, INDEX_COUNT, NORMAL_SMOOTHING,
    SEGMENTS, VERTEX_COUNT,
};
pub use path::{default_w, initial_w, lift, normalize_drawing, Stroke, DRAWING_SPAN};
pub use ribbon::{Ribbon, RibbonState, DRAWING_SAMPLES, DRAWING_WIDTH};
pub use smooth::{centripetal_point, smooth_points};
pub use surface::{MeshId, MeshLedger, RenderSurface, RibbonMaterial, RibbonMesh};

pub use glam::{Vec2, Vec3};
