use crate::geometry::{Aabb, Vertex};
use glam::{Mat3, Mat4, Vec3};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
    pub material: u32,
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex, material: u32) -> Self {
        Self {
            vertices: [v0, v1, v2],
            material,
        }
    }

    pub fn positions(&self) -> [Vec3; 3] {
        self.vertices.map(|v| v.position)
    }

    /// A triangle with any non-finite position component.
    pub fn is_degenerate(&self) -> bool {
        !self.positions().iter().all(|p| p.is_finite())
    }

    /// Bounds of the three positions, or [`Aabb::EMPTY`] for a degenerate
    /// triangle so it never widens an enclosing box.
    pub fn bounds(&self) -> Aabb {
        if self.is_degenerate() {
            return Aabb::EMPTY;
        }
        Aabb::from_points(self.positions())
    }

    pub fn centroid(&self) -> Vec3 {
        let [a, b, c] = self.positions();
        (a + b + c) / 3.0
    }

    /// Normalized `(v1 - v0) x (v2 - v0)`; zero for zero-area triangles.
    pub fn face_normal(&self) -> Vec3 {
        let [a, b, c] = self.positions();
        (b - a).cross(c - a).normalize_or_zero()
    }

    pub fn with_flat_normal(mut self) -> Self {
        let normal = self.face_normal();
        for v in self.vertices.iter_mut() {
            v.normal = normal;
        }
        self
    }

    /// Positions by `matrix`, normals by its inverse transpose.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let normal_matrix = Mat3::from_mat4(*matrix).inverse().transpose();
        let mut ret = *self;
        for v in ret.vertices.iter_mut() {
            v.position = matrix.transform_point3(v.position);
            v.normal = (normal_matrix * v.normal).normalize_or_zero();
        }
        ret
    }
}
