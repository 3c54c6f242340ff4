use glam::Vec3;

/// Axis-aligned bounding box. The empty box (`min = +inf`, `max = -inf`) is
/// the identity for [`Aabb::union`], so empty inputs never widen a parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut bb, p| {
            bb.grow(p);
            bb
        })
    }

    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Axis with the largest extent; ties go to the lower axis.
    pub fn largest_axis(&self) -> usize {
        let extent = self.extent();
        let mut axis = 0;
        for i in 1..3 {
            if extent[i] > extent[axis] {
                axis = i;
            }
        }
        axis
    }

    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let e = self.extent();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Whether `other` lies inside `self`, allowing `epsilon` of slack.
    /// An empty box is contained by anything.
    pub fn contains(&self, other: &Self, epsilon: f32) -> bool {
        if other.is_empty() {
            return true;
        }
        (other.min + epsilon).cmpge(self.min).all() && (other.max - epsilon).cmple(self.max).all()
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
