pub mod bvh;
mod material;
mod triangle;
pub use material::Material;
pub use triangle::Triangle;

use crate::error::Result;
use crate::geometry::{Aabb, Mesh};
use crate::gpu::{self, PackedScene};
use bvh::{BuildOptions, Tree};
use glam::{Mat4, Vec3};
use std::path::Path;

/// One loaded asset: triangles and materials plus the BVH derived from them.
/// Any edit to the triangles drops the BVH; call [`Scene::build_bvh`] again
/// before packing.
#[derive(Clone, Debug)]
pub struct Scene {
    triangles: Vec<Triangle>,
    materials: Vec<Material>,
    tree: Tree,
    options: BuildOptions,
}

impl Default for Scene {
    fn default() -> Self {
        Self::from_mesh(Mesh::default())
    }
}

impl From<Mesh> for Scene {
    fn from(mesh: Mesh) -> Self {
        Self::from_mesh(mesh)
    }
}

impl Scene {
    pub fn from_mesh(mesh: Mesh) -> Self {
        let (triangles, materials) = mesh.into_parts();
        Self {
            triangles,
            materials,
            tree: Tree::default(),
            options: BuildOptions::default(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_mesh(Mesh::load(path)?))
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Appends another mesh. Its default material folds into ours; the rest
    /// are appended and its triangles remapped to the new indices.
    pub fn add_mesh(&mut self, mesh: Mesh) {
        let (triangles, materials) = mesh.into_parts();
        let base = self.materials.len() as u32;
        self.materials.extend(materials.into_iter().skip(1));
        self.triangles.extend(triangles.into_iter().map(|mut t| {
            if t.material != 0 {
                t.material = base + t.material - 1;
            }
            t
        }));
        self.invalidate();
    }

    pub fn build_bvh(&mut self) {
        self.tree = Tree::build_with(&self.triangles, &self.options);
    }

    /// GPU-ready copy of the scene; fails if the BVH is out of date.
    pub fn pack(&self) -> Result<PackedScene> {
        gpu::pack(&self.triangles, &self.materials, &self.tree)
    }

    /// Union of all triangle bounds; degenerate triangles are ignored.
    pub fn bounds(&self) -> Aabb {
        self.triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, t| acc.union(&t.bounds()))
    }

    pub fn transform(&mut self, matrix: &Mat4) {
        for t in self.triangles.iter_mut() {
            *t = t.transformed(matrix);
        }
        self.invalidate();
    }

    /// Moves the bounds' center to the origin.
    pub fn center_at_origin(&mut self) {
        let bounds = self.bounds();
        if bounds.is_empty() {
            return;
        }
        self.transform(&Mat4::from_translation(-bounds.center()));
    }

    /// Scales about the origin so the largest extent becomes 2.
    pub fn normalize_size(&mut self) {
        let bounds = self.bounds();
        if bounds.is_empty() {
            return;
        }
        let largest = bounds.extent().max_element();
        if largest > 0.0 {
            self.transform(&Mat4::from_scale(Vec3::splat(2.0 / largest)));
        }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn bvh(&self) -> &Tree {
        &self.tree
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn node_count(&self) -> usize {
        self.tree.nodes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    fn invalidate(&mut self) {
        if !self.tree.is_empty() {
            log::debug!("Scene edited, dropping BVH of {} nodes", self.tree.nodes.len());
        }
        self.tree = Tree::default();
    }
}
