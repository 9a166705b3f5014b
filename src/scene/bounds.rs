use glam::{DMat4, DVec3};

use crate::scene::camera::Frustum;

/// Axis-aligned bounding box in double precision.
///
/// An empty box has `min > max` on every axis (`+inf` / `-inf`), so that a
/// union with any box yields that box. Empty boxes never intersect a frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    #[inline]
    #[must_use]
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Box centered at `center` with the given half extents.
    #[inline]
    #[must_use]
    pub fn from_center_half_extents(center: DVec3, half: DVec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box enclosing `points`. Empty for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.extend_with_point(p);
        }
        aabb
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend_with_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn extend_with_box(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    #[must_use]
    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        out.extend_with_box(other);
        out
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// The 8 corners, min-x first.
    #[must_use]
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }

    /// Re-derives an axis-aligned box from all 8 transformed corners.
    ///
    /// Rotation breaks axis alignment, so transforming only `min`/`max` would
    /// be wrong. Empty boxes stay empty.
    #[must_use]
    pub fn transformed(&self, matrix: &DMat4) -> Aabb {
        if self.is_empty() {
            return Self::EMPTY;
        }
        Self::from_points(self.corners().into_iter().map(|c| matrix.transform_point3(c)))
    }

    /// Overlap test against another box (touching counts).
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// `false` when the box lies entirely outside any frustum plane.
    #[inline]
    #[must_use]
    pub fn in_frustum(&self, frustum: &Frustum) -> bool {
        frustum.intersects_aabb(self)
    }

    #[must_use]
    pub fn contains_point(&self, p: DVec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }
}
