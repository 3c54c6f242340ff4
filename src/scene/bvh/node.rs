use crate::geometry::Aabb;
use std::ops::Range;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Triangles `[offset, offset + count)` of the reordered triangle list.
    Leaf { offset: u32, count: u32 },
    /// Indices of both children in the node array.
    Internal { left: u32, right: u32 },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Node {
    pub bounds: Aabb,
    pub kind: NodeKind,
}

impl Node {
    pub fn leaf(bounds: Aabb, offset: u32, count: u32) -> Self {
        Self {
            bounds,
            kind: NodeKind::Leaf { offset, count },
        }
    }

    pub fn internal(bounds: Aabb, left: u32, right: u32) -> Self {
        Self {
            bounds,
            kind: NodeKind::Internal { left, right },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn triangle_range(&self) -> Option<Range<usize>> {
        match self.kind {
            NodeKind::Leaf { offset, count } => Some(offset as usize..(offset + count) as usize),
            NodeKind::Internal { .. } => None,
        }
    }

    pub fn children(&self) -> Option<[u32; 2]> {
        match self.kind {
            NodeKind::Internal { left, right } => Some([left, right]),
            NodeKind::Leaf { .. } => None,
        }
    }
}
