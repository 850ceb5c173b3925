//! Plane in Hessian normal form

use crate::foundation::math::Vec3;

/// Result of testing a volume against a plane or a set of planes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intersect {
    /// Entirely on the negative side
    Outside,
    /// Straddles the boundary
    Intersecting,
    /// Entirely on the positive (interior) side
    Inside,
}

/// Plane defined by a unit normal and a distance from the origin
///
/// The signed distance of a point `p` is `normal · p + distance`; positive
/// values lie on the side the normal points to, which culling volumes treat
/// as the interior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal vector
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f64,
}

impl Plane {
    /// Create a new plane from a unit normal and distance
    pub fn new(normal: Vec3, distance: f64) -> Self {
        debug_assert!(
            (normal.norm_squared() - 1.0).abs() < 1.0e-6,
            "plane normal must be unit length, got {normal:?}"
        );
        Self { normal, distance }
    }

    /// Create a plane through `point` with the given unit normal
    pub fn from_point_normal(point: &Vec3, normal: Vec3) -> Self {
        Self::new(normal, -normal.dot(point))
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f64 {
        self.normal.dot(point) + self.distance
    }
}
