use crate::geometry::Aabb;
use crate::scene::bvh::{Node, NodeKind};
use crate::scene::Triangle;
use glam::Vec3;
use std::time::Instant;

/// Tunables for [`Tree::build_with`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    /// Ranges with at most this many triangles become leaves.
    pub max_leaf_size: usize,
    /// Nodes deeper than this become leaves regardless of size.
    pub max_depth: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_leaf_size: 4,
            max_depth: 20,
        }
    }
}

/// Flat BVH: `nodes[0]` is the root, nodes are stored in pre-order with the
/// left subtree first, and leaf ranges index the triangle list reordered by
/// `permutation` (`reordered[i] = triangles[permutation[i]]`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub permutation: Vec<u32>,
}

#[derive(Copy, Clone)]
enum Side {
    Left,
    Right,
}

struct Pending {
    start: usize,
    end: usize,
    depth: usize,
    parent: Option<(usize, Side)>,
}

impl Tree {
    pub fn build(triangles: &[Triangle]) -> Self {
        Self::build_with(triangles, &BuildOptions::default())
    }

    /// Object-median build: each range is sorted by centroid along the
    /// largest axis of its bounds and split in half. Uses an explicit work
    /// stack, so depth is bounded only by `max_depth`, not by the call stack.
    pub fn build_with(triangles: &[Triangle], options: &BuildOptions) -> Self {
        if triangles.is_empty() {
            return Self::default();
        }
        let started = Instant::now();
        let max_leaf_size = options.max_leaf_size.max(1);
        let bounds: Vec<Aabb> = triangles.iter().map(Triangle::bounds).collect();
        let centroids: Vec<Vec3> = triangles.iter().map(Triangle::centroid).collect();
        let mut permutation: Vec<u32> = (0..triangles.len() as u32).collect();
        let mut nodes: Vec<Node> = Vec::with_capacity(2 * triangles.len() - 1);

        let mut stack = vec![Pending {
            start: 0,
            end: triangles.len(),
            depth: 0,
            parent: None,
        }];
        while let Some(Pending {
            start,
            end,
            depth,
            parent,
        }) = stack.pop()
        {
            let index = nodes.len() as u32;
            if let Some((parent, side)) = parent {
                if let NodeKind::Internal { left, right } = &mut nodes[parent].kind {
                    match side {
                        Side::Left => *left = index,
                        Side::Right => *right = index,
                    }
                }
            }

            let node_bounds = permutation[start..end]
                .iter()
                .fold(Aabb::EMPTY, |acc, &i| acc.union(&bounds[i as usize]));
            let count = end - start;
            if count <= max_leaf_size || depth > options.max_depth {
                nodes.push(Node::leaf(node_bounds, start as u32, count as u32));
                continue;
            }

            let axis = node_bounds.largest_axis();
            permutation[start..end].sort_by(|&a, &b| {
                centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
            });
            let mid = start + count / 2;
            nodes.push(Node::internal(node_bounds, 0, 0));
            // right first so the left subtree is popped, and numbered, first
            stack.push(Pending {
                start: mid,
                end,
                depth: depth + 1,
                parent: Some((index as usize, Side::Right)),
            });
            stack.push(Pending {
                start,
                end: mid,
                depth: depth + 1,
                parent: Some((index as usize, Side::Left)),
            });
        }

        let ret = Self { nodes, permutation };
        log::info!(
            "Built BVH: {} nodes, {} leaves, depth {} over {} triangles in {:?}",
            ret.nodes.len(),
            ret.leaf_count(),
            ret.depth(),
            triangles.len(),
            started.elapsed()
        );
        ret
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_bounds(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, |n| n.bounds)
    }

    /// Leaf nodes in node-array order.
    pub fn leaves(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Depth of the deepest node, root being 0. An empty tree has depth 0.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut deepest = 0;
        let mut stack = vec![(0u32, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some([left, right]) = self.nodes[index as usize].children() {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Mesh, Vertex};
    use glam::Vec2;

    fn tri_at(origin: Vec3) -> Triangle {
        let v = |p: Vec3| Vertex::new(p, Vec3::Z, Vec2::ZERO);
        Triangle::new(v(origin), v(origin + Vec3::X), v(origin + Vec3::Y), 0)
    }

    #[test]
    fn empty() {
        let tree = Tree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.permutation.is_empty());
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn single_triangle() {
        let tree = Tree::build(&[tri_at(Vec3::ZERO)]);
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].kind, NodeKind::Leaf { offset: 0, count: 1 });
        assert_eq!(tree.nodes[0].bounds, Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)));
        assert_eq!(tree.permutation, vec![0]);
    }

    #[test]
    fn five_along_x() {
        let tris: Vec<_> = [8.0, 0.0, 6.0, 2.0, 4.0]
            .into_iter()
            .map(|x| tri_at(Vec3::new(x, 0.0, 0.0)))
            .collect();
        let tree = Tree::build(&tris);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[0].kind, NodeKind::Internal { left: 1, right: 2 });
        assert_eq!(tree.nodes[1].kind, NodeKind::Leaf { offset: 0, count: 2 });
        assert_eq!(tree.nodes[2].kind, NodeKind::Leaf { offset: 2, count: 3 });
        assert_eq!(tree.permutation, vec![1, 3, 4, 2, 0]);
        assert!(tree.nodes[1].bounds.max.x < tree.nodes[2].bounds.min.x);
        assert_eq!(tree.root_bounds(), Aabb::new(Vec3::ZERO, Vec3::new(9.0, 1.0, 0.0)));
    }

    #[test]
    fn nan_triangle_does_not_grow_bounds() {
        let mut tris: Vec<_> = (0..8).map(|i| tri_at(Vec3::new(i as f32, 0.0, 0.0))).collect();
        let mut broken = tri_at(Vec3::new(3.0, 0.0, 0.0));
        broken.vertices[1].position.y = f32::NAN;
        tris.insert(4, broken);
        let tree = Tree::build(&tris);
        let finite = Aabb::new(Vec3::ZERO, Vec3::new(8.0, 1.0, 0.0));
        assert_eq!(tree.root_bounds(), finite);
        for node in &tree.nodes {
            assert!(finite.contains(&node.bounds, 0.0));
        }
        let covered: usize = tree.leaves().filter_map(Node::triangle_range).map(|r| r.len()).sum();
        assert_eq!(covered, 9);
    }

    #[test]
    fn depth_limit_forces_leaves() {
        let tris: Vec<_> = (0..100).map(|i| tri_at(Vec3::new(i as f32, 0.0, 0.0))).collect();
        let tree = Tree::build_with(
            &tris,
            &BuildOptions {
                max_depth: 0,
                ..Default::default()
            },
        );
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[1].kind, NodeKind::Leaf { offset: 0, count: 50 });
        assert_eq!(tree.nodes[2].kind, NodeKind::Leaf { offset: 50, count: 50 });
    }

    #[test]
    fn zero_leaf_size_is_treated_as_one() {
        let tris: Vec<_> = (0..3).map(|i| tri_at(Vec3::new(i as f32, 0.0, 0.0))).collect();
        let tree = Tree::build_with(
            &tris,
            &BuildOptions {
                max_leaf_size: 0,
                ..Default::default()
            },
        );
        assert!(tree.leaves().all(|n| n.triangle_range().is_some_and(|r| r.len() == 1)));
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn simple_cube() {
        let mesh = Mesh::load_obj_buf(include_bytes!("../../../assets/cube.obj"), None).unwrap();
        let tree = Tree::build(mesh.triangles());
        assert_eq!(tree.nodes.len(), 7);
        assert_eq!(tree.leaf_count(), 4);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.root_bounds(), Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)));
    }

    #[test]
    fn rebuild_is_identical() {
        let mesh = Mesh::load_obj_buf(include_bytes!("../../../assets/cube.obj"), None).unwrap();
        assert_eq!(Tree::build(mesh.triangles()), Tree::build(mesh.triangles()));
    }
}
