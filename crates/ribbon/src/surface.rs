use std::collections::BTreeMap;

use crate::mesh::RibbonGeometry;

/// Identifier handed out by a [`RenderSurface`] for an attached mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshId(pub u64);

/// Unlit, double-sided material sampling an optional texture.
#[derive(Debug, Clone, PartialEq)]
pub struct RibbonMaterial<T> {
    pub texture: Option<T>,
    pub double_sided: bool,
}

impl<T> RibbonMaterial<T> {
    pub fn new(texture: Option<T>) -> Self {
        Self {
            texture,
            double_sided: true,
        }
    }
}

/// Geometry/material pair owned by the surface while attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RibbonMesh<T> {
    pub geometry: RibbonGeometry,
    pub material: RibbonMaterial<T>,
}

/// Whatever draws ribbons: a GPU scene, a recorder, or a test double.
///
/// Attached meshes belong to the surface until [`RenderSurface::release`]
/// hands them back; callers must release a mesh before replacing it.
pub trait RenderSurface {
    type Texture: Clone;

    fn attach(&mut self, mesh: RibbonMesh<Self::Texture>) -> MeshId;

    /// Detaches and frees the mesh, returning it if it was still attached.
    fn release(&mut self, id: MeshId) -> Option<RibbonMesh<Self::Texture>>;

    fn set_texture(&mut self, id: MeshId, texture: Option<Self::Texture>);
}

/// In-memory surface that keeps attached meshes and counts their lifecycle.
#[derive(Debug, Clone)]
pub struct MeshLedger<T> {
    meshes: BTreeMap<MeshId, RibbonMesh<T>>,
    next_id: u64,
    attached_total: u64,
    released_total: u64,
}

impl<T> MeshLedger<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meshes currently attached (each owns one geometry and one material).
    pub fn live(&self) -> usize {
        self.meshes.len()
    }

    pub fn attached_total(&self) -> u64 {
        self.attached_total
    }

    pub fn released_total(&self) -> u64 {
        self.released_total
    }

    pub fn get(&self, id: MeshId) -> Option<&RibbonMesh<T>> {
        self.meshes.get(&id)
    }

    pub fn meshes(&self) -> impl Iterator<Item = (&MeshId, &RibbonMesh<T>)> {
        self.meshes.iter()
    }
}

impl<T> Default for MeshLedger<T> {
    fn default() -> Self {
        Self {
            meshes: BTreeMap::new(),
            next_id: 0,
            attached_total: 0,
            released_total: 0,
        }
    }
}

impl<T: Clone> RenderSurface for MeshLedger<T> {
    type Texture = T;

    fn attach(&mut self, mesh: RibbonMesh<T>) -> MeshId {
        let id = MeshId(self.next_id);
        self.next_id += 1;
        self.attached_total += 1;
        self.meshes.insert(id, mesh);
        id
    }

    fn release(&mut self, id: MeshId) -> Option<RibbonMesh<T>> {
        let mesh = self.meshes.remove(&id)?;
        self.released_total += 1;
        Some(mesh)
    }

    fn set_texture(&mut self, id: MeshId, texture: Option<T>) {
        if let Some(mesh) = self.meshes.get_mut(&id) {
            mesh.material.texture = texture;
        }
    }
}
