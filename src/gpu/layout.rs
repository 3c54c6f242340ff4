//! Byte layouts shared with the compute kernel. Every struct follows WGSL
//! storage layout rules (`vec3<f32>` aligned to 16 bytes), so element `i`
//! lives at `base + i * size_of::<T>()`. Keep `scene.wgsl` in lock-step.

use crate::geometry::Vertex;
use crate::scene::bvh::{Node, NodeKind};
use crate::scene::{Material, Triangle};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use std::mem::size_of;

pub const NODE_INTERNAL: u32 = 0;
pub const NODE_LEAF: u32 = 1;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: Vec3,
    _padding0: f32,
    pub normal: Vec3,
    _padding1: f32,
    pub tex_coord: Vec2,
    _padding2: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    pub v0: GpuVertex,
    pub v1: GpuVertex,
    pub v2: GpuVertex,
    pub material: u32,
    _padding: [u32; 3],
}

/// Scalars fill the tail slot of the preceding `vec3`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub albedo: Vec3,
    pub specular_chance: f32,
    pub emissive: Vec3,
    pub specular_roughness: f32,
    pub specular_color: Vec3,
    pub ior: f32,
    pub refraction_color: Vec3,
    pub refraction_chance: f32,
    pub refraction_roughness: f32,
    _padding: [f32; 3],
}

/// `kind == NODE_INTERNAL`: `first`/`second` are the child node indices.
/// `kind == NODE_LEAF`: `first` is the triangle offset, `second` the count.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuNode {
    pub min: Vec3,
    pub first: u32,
    pub max: Vec3,
    pub second: u32,
    pub kind: u32,
    _padding: [u32; 3],
}

/// Uniform handed to the kernel alongside the three storage buffers.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuSceneInfo {
    pub triangle_count: u32,
    pub node_count: u32,
    pub material_count: u32,
    _padding: u32,
}

const _: () = assert!(size_of::<GpuVertex>() == 48);
const _: () = assert!(size_of::<GpuTriangle>() == 160);
const _: () = assert!(size_of::<GpuMaterial>() == 80);
const _: () = assert!(size_of::<GpuNode>() == 48);
const _: () = assert!(size_of::<GpuSceneInfo>() == 16);

impl From<&Vertex> for GpuVertex {
    fn from(v: &Vertex) -> Self {
        Self {
            position: v.position,
            normal: v.normal,
            tex_coord: v.tex_coord,
            ..Default::default()
        }
    }
}

impl From<&Triangle> for GpuTriangle {
    fn from(t: &Triangle) -> Self {
        let [v0, v1, v2] = &t.vertices;
        Self {
            v0: v0.into(),
            v1: v1.into(),
            v2: v2.into(),
            material: t.material,
            ..Default::default()
        }
    }
}

impl From<&Material> for GpuMaterial {
    fn from(m: &Material) -> Self {
        Self {
            albedo: m.albedo,
            specular_chance: m.specular_chance,
            emissive: m.emissive,
            specular_roughness: m.specular_roughness,
            specular_color: m.specular_color,
            ior: m.ior,
            refraction_color: m.refraction_color,
            refraction_chance: m.refraction_chance,
            refraction_roughness: m.refraction_roughness,
            ..Default::default()
        }
    }
}

impl From<&Node> for GpuNode {
    fn from(node: &Node) -> Self {
        let (kind, first, second) = match node.kind {
            NodeKind::Internal { left, right } => (NODE_INTERNAL, left, right),
            NodeKind::Leaf { offset, count } => (NODE_LEAF, offset, count),
        };
        Self {
            min: node.bounds.min,
            first,
            max: node.bounds.max,
            second,
            kind,
            ..Default::default()
        }
    }
}

impl GpuSceneInfo {
    pub fn new(triangle_count: u32, node_count: u32, material_count: u32) -> Self {
        Self {
            triangle_count,
            node_count,
            material_count,
            _padding: 0,
        }
    }
}
