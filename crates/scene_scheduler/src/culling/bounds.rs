//! Bounding volumes consumed by the culling stages
//!
//! Culling only needs a narrow capability from a bounding volume, captured by
//! [`BoundingVolume`]. The three shapes used by scene content share it and
//! are unified by the [`Bounds`] enum so commands can carry any of them
//! without boxing.

use crate::culling::occluder::Occluder;
use crate::culling::plane::{Intersect, Plane};
use crate::foundation::math::{Mat3, Vec3};

/// Depth interval of a volume measured along a view direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthInterval {
    /// Nearest distance along the direction
    pub start: f64,
    /// Farthest distance along the direction
    pub stop: f64,
}

impl DepthInterval {
    /// Create an interval
    pub fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    /// True when the two closed intervals share at least one point
    pub fn overlaps(&self, near: f64, far: f64) -> bool {
        self.start <= far && self.stop >= near
    }
}

/// Capability a bounding volume offers to the culling stages
pub trait BoundingVolume {
    /// Classify the volume against a plane
    fn intersect_plane(&self, plane: &Plane) -> Intersect;

    /// Whether the occluder hides the volume entirely from its camera
    fn is_occluded_by(&self, occluder: &Occluder) -> bool;

    /// Center used for distance sorting
    fn center(&self) -> Vec3;

    /// Extent of the volume along `direction`, measured from `position`
    fn compute_plane_distances(&self, position: &Vec3, direction: &Vec3) -> DepthInterval;

    /// Squared distance from `point` to the center
    fn distance_squared_to_center(&self, point: &Vec3) -> f64 {
        (self.center() - point).norm_squared()
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Sphere center
    pub center: Vec3,
    /// Sphere radius
    pub radius: f64,
}

impl BoundingSphere {
    /// Create a new bounding sphere
    pub fn new(center: Vec3, radius: f64) -> Self {
        debug_assert!(radius >= 0.0, "bounding sphere radius must be non-negative");
        Self { center, radius }
    }

    /// Smallest sphere centered on the box that contains all its corners
    pub fn from_oriented_box(obb: &OrientedBox) -> Self {
        let u = obb.half_axes.column(0).into_owned();
        let v = obb.half_axes.column(1).into_owned();
        let w = obb.half_axes.column(2).into_owned();

        // Corners pair up through the center, so four diagonals cover all eight
        let radius = [u + v + w, u + v - w, u - v + w, -u + v + w]
            .iter()
            .map(|diagonal| diagonal.norm())
            .fold(0.0, f64::max);

        Self::new(obb.center, radius)
    }
}

impl BoundingVolume for BoundingSphere {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let distance_to_plane = plane.distance_to_point(&self.center);

        if distance_to_plane < -self.radius {
            Intersect::Outside
        } else if distance_to_plane < self.radius {
            Intersect::Intersecting
        } else {
            Intersect::Inside
        }
    }

    fn is_occluded_by(&self, occluder: &Occluder) -> bool {
        !occluder.is_bounding_sphere_visible(self)
    }

    fn center(&self) -> Vec3 {
        self.center
    }

    fn compute_plane_distances(&self, position: &Vec3, direction: &Vec3) -> DepthInterval {
        let projected = direction.dot(&(self.center - position));
        DepthInterval::new(projected - self.radius, projected + self.radius)
    }
}

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAlignedBox {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AxisAlignedBox {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

impl BoundingVolume for AxisAlignedBox {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let h = self.extents();
        let n = plane.normal;
        let effective_radius = h.x * n.x.abs() + h.y * n.y.abs() + h.z * n.z.abs();
        let distance_to_plane = plane.distance_to_point(&BoundingVolume::center(self));

        if distance_to_plane - effective_radius > 0.0 {
            Intersect::Inside
        } else if distance_to_plane + effective_radius < 0.0 {
            Intersect::Outside
        } else {
            Intersect::Intersecting
        }
    }

    fn is_occluded_by(&self, occluder: &Occluder) -> bool {
        let sphere = BoundingSphere::new(BoundingVolume::center(self), self.extents().norm());
        !occluder.is_bounding_sphere_visible(&sphere)
    }

    fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    fn compute_plane_distances(&self, position: &Vec3, direction: &Vec3) -> DepthInterval {
        let h = self.extents();
        let projected = direction.dot(&(BoundingVolume::center(self) - position));
        let reach = h.x * direction.x.abs() + h.y * direction.y.abs() + h.z * direction.z.abs();
        DepthInterval::new(projected - reach, projected + reach)
    }
}

/// Oriented bounding box
///
/// The columns of `half_axes` are the box's half-extent vectors in world
/// space: the box is `center + a·u + b·v + c·w` for `a, b, c` in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// Box center
    pub center: Vec3,
    /// Half-extent vectors as columns
    pub half_axes: Mat3,
}

impl OrientedBox {
    /// Create a new oriented box
    pub fn new(center: Vec3, half_axes: Mat3) -> Self {
        Self { center, half_axes }
    }

    /// Box projected radius along a unit direction
    fn effective_radius(&self, direction: &Vec3) -> f64 {
        (0..3)
            .map(|i| self.half_axes.column(i).dot(direction).abs())
            .sum()
    }
}

impl From<AxisAlignedBox> for OrientedBox {
    fn from(aabb: AxisAlignedBox) -> Self {
        Self::new(BoundingVolume::center(&aabb), Mat3::from_diagonal(&aabb.extents()))
    }
}

impl BoundingVolume for OrientedBox {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        let effective_radius = self.effective_radius(&plane.normal);
        let distance_to_plane = plane.distance_to_point(&self.center);

        if distance_to_plane <= -effective_radius {
            Intersect::Outside
        } else if distance_to_plane >= effective_radius {
            Intersect::Inside
        } else {
            Intersect::Intersecting
        }
    }

    fn is_occluded_by(&self, occluder: &Occluder) -> bool {
        !occluder.is_bounding_sphere_visible(&BoundingSphere::from_oriented_box(self))
    }

    fn center(&self) -> Vec3 {
        self.center
    }

    fn compute_plane_distances(&self, position: &Vec3, direction: &Vec3) -> DepthInterval {
        let projected = direction.dot(&(self.center - position));
        let reach = self.effective_radius(direction);
        DepthInterval::new(projected - reach, projected + reach)
    }
}

/// Any of the supported bounding volume shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    /// Bounding sphere
    Sphere(BoundingSphere),
    /// Axis-aligned box
    AxisAligned(AxisAlignedBox),
    /// Oriented box
    Oriented(OrientedBox),
}

impl BoundingVolume for Bounds {
    fn intersect_plane(&self, plane: &Plane) -> Intersect {
        match self {
            Self::Sphere(s) => s.intersect_plane(plane),
            Self::AxisAligned(b) => b.intersect_plane(plane),
            Self::Oriented(b) => b.intersect_plane(plane),
        }
    }

    fn is_occluded_by(&self, occluder: &Occluder) -> bool {
        match self {
            Self::Sphere(s) => s.is_occluded_by(occluder),
            Self::AxisAligned(b) => b.is_occluded_by(occluder),
            Self::Oriented(b) => b.is_occluded_by(occluder),
        }
    }

    fn center(&self) -> Vec3 {
        match self {
            Self::Sphere(s) => s.center,
            Self::AxisAligned(b) => BoundingVolume::center(b),
            Self::Oriented(b) => b.center,
        }
    }

    fn compute_plane_distances(&self, position: &Vec3, direction: &Vec3) -> DepthInterval {
        match self {
            Self::Sphere(s) => s.compute_plane_distances(position, direction),
            Self::AxisAligned(b) => b.compute_plane_distances(position, direction),
            Self::Oriented(b) => b.compute_plane_distances(position, direction),
        }
    }
}

impl From<BoundingSphere> for Bounds {
    fn from(sphere: BoundingSphere) -> Self {
        Self::Sphere(sphere)
    }
}

impl From<AxisAlignedBox> for Bounds {
    fn from(aabb: AxisAlignedBox) -> Self {
        Self::AxisAligned(aabb)
    }
}

impl From<OrientedBox> for Bounds {
    fn from(obb: OrientedBox) -> Self {
        Self::Oriented(obb)
    }
}
