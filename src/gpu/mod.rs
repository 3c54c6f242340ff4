mod layout;
mod upload;
pub use layout::{
    GpuMaterial, GpuNode, GpuSceneInfo, GpuTriangle, GpuVertex, NODE_INTERNAL, NODE_LEAF,
};
pub use upload::{headless_device, GpuScene, SceneBuffers};

use crate::error::{Error, Result};
use crate::scene::bvh::Tree;
use crate::scene::{Material, Triangle};

/// WGSL declarations matching the layouts above, for inclusion in kernels.
pub const SCENE_WGSL: &str = include_str!("scene.wgsl");

pub const BINDING_SCENE_INFO: u32 = 0;
pub const BINDING_NODES: u32 = 1;
pub const BINDING_TRIANGLES: u32 = 2;
pub const BINDING_MATERIALS: u32 = 3;

/// CPU-side copy of the three storage buffers plus the scene info uniform.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedScene {
    pub info: GpuSceneInfo,
    pub nodes: Vec<GpuNode>,
    /// In BVH leaf order.
    pub triangles: Vec<GpuTriangle>,
    pub materials: Vec<GpuMaterial>,
}

impl PackedScene {
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    pub fn triangle_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    pub fn material_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.materials)
    }
}

/// Reorders triangles by `tree.permutation` so leaf ranges are contiguous;
/// materials and nodes keep their order.
pub fn pack(triangles: &[Triangle], materials: &[Material], tree: &Tree) -> Result<PackedScene> {
    if tree.permutation.len() != triangles.len() {
        return Err(Error::StaleBvh {
            triangles: triangles.len(),
            permutation: tree.permutation.len(),
        });
    }
    let triangles = tree
        .permutation
        .iter()
        .map(|&i| GpuTriangle::from(&triangles[i as usize]))
        .collect::<Vec<_>>();
    let materials = materials.iter().map(GpuMaterial::from).collect::<Vec<_>>();
    let nodes = tree.nodes.iter().map(GpuNode::from).collect::<Vec<_>>();
    Ok(PackedScene {
        info: GpuSceneInfo::new(triangles.len() as u32, nodes.len() as u32, materials.len() as u32),
        nodes,
        triangles,
        materials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vertex;
    use glam::{Vec2, Vec3};

    fn tri_at(x: f32, material: u32) -> Triangle {
        let v = |p: Vec3| Vertex::new(p, Vec3::Z, Vec2::ZERO);
        let o = Vec3::new(x, 0.0, 0.0);
        Triangle::new(v(o), v(o + Vec3::X), v(o + Vec3::Y), material)
    }

    #[test]
    fn triangles_follow_permutation() {
        let tris: Vec<_> = [8.0, 0.0, 6.0, 2.0, 4.0]
            .into_iter()
            .enumerate()
            .map(|(i, x)| tri_at(x, i as u32))
            .collect();
        let tree = Tree::build(&tris);
        let packed = pack(&tris, &[Material::default()], &tree).unwrap();
        let order: Vec<_> = packed.triangles.iter().map(|t| t.material).collect();
        assert_eq!(order, tree.permutation);
        for (i, t) in packed.triangles.iter().enumerate() {
            assert_eq!(t.v0.position, tris[tree.permutation[i] as usize].vertices[0].position);
        }
        assert_eq!(packed.info, GpuSceneInfo::new(5, 3, 1));
        assert_eq!(packed.triangle_bytes().len(), 5 * 160);
        assert_eq!(packed.node_bytes().len(), 3 * 48);
        assert_eq!(packed.material_bytes().len(), 80);
    }

    #[test]
    fn stale_tree_is_rejected() {
        let tris = vec![tri_at(0.0, 0), tri_at(1.0, 0)];
        let tree = Tree::build(&tris[..1]);
        let err = pack(&tris, &[Material::default()], &tree).unwrap_err();
        assert!(matches!(err, Error::StaleBvh { triangles: 2, permutation: 1 }));
    }

    #[test]
    fn wgsl_declares_every_struct() {
        for name in [
            "struct Vertex",
            "struct Triangle",
            "struct Material",
            "struct BvhNode",
            "struct SceneInfo",
        ] {
            assert!(SCENE_WGSL.contains(name), "missing {name}");
        }
    }
}
