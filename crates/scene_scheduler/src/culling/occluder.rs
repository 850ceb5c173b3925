//! Horizon occlusion against a spherical body
//!
//! A planet hides everything behind its horizon. Modelling the body as a
//! sphere (the minimum radius plus the lowest surface height nearby) gives a
//! cheap, conservative test layered on top of plane culling: anything the
//! sphere reports as hidden is certainly hidden by the real surface.

use crate::culling::bounds::BoundingSphere;
use crate::foundation::math::Vec3;

/// Parameters of the occluding body, supplied with the camera each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccluderParameters {
    /// Body center in world space
    pub center: Vec3,
    /// Smallest radius of the body
    pub minimum_radius: f64,
    /// Lowest surface height in the visible area (may be negative)
    pub minimum_surface_height: f64,
}

impl OccluderParameters {
    /// Sphere standing in for the solid body
    pub fn occluding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.center, (self.minimum_radius + self.minimum_surface_height).max(0.0))
    }
}

/// Occluding sphere as seen from a camera position
#[derive(Debug, Clone, Copy)]
pub struct Occluder {
    occluder_position: Vec3,
    occluder_radius: f64,
    camera_position: Vec3,
    /// Distance from the camera to the horizon; `None` while the camera is
    /// inside the sphere, where the test is not valid
    horizon_distance: Option<f64>,
}

impl Occluder {
    /// Create an occluder for a sphere viewed from `camera_position`
    pub fn new(occluder: &BoundingSphere, camera_position: Vec3) -> Self {
        let camera_to_occluder_squared = (occluder.center - camera_position).norm_squared();
        let radius_squared = occluder.radius * occluder.radius;

        let horizon_distance = (camera_to_occluder_squared > radius_squared)
            .then(|| (camera_to_occluder_squared - radius_squared).sqrt());

        Self {
            occluder_position: occluder.center,
            occluder_radius: occluder.radius,
            camera_position,
            horizon_distance,
        }
    }

    /// Create an occluder from body parameters, or `None` when the camera is
    /// inside the body and horizon culling must be skipped
    pub fn from_parameters(parameters: &OccluderParameters, camera_position: Vec3) -> Option<Self> {
        let occluder = Self::new(&parameters.occluding_sphere(), camera_position);
        occluder.is_valid().then_some(occluder)
    }

    /// Whether the camera is outside the occluding sphere
    pub fn is_valid(&self) -> bool {
        self.horizon_distance.is_some()
    }

    /// Distance from the camera to the horizon, if the camera is outside
    pub fn horizon_distance(&self) -> Option<f64> {
        self.horizon_distance
    }

    /// Whether a point can be seen past the occluder
    pub fn is_point_visible(&self, point: &Vec3) -> bool {
        self.is_bounding_sphere_visible(&BoundingSphere::new(*point, 0.0))
    }

    /// Whether any part of the sphere can be seen past the occluder
    pub fn is_bounding_sphere_visible(&self, occludee: &BoundingSphere) -> bool {
        let Some(horizon_distance) = self.horizon_distance else {
            return true;
        };

        let occludee_radius = occludee.radius;
        let tangent = self.occluder_radius - occludee_radius;
        let temp = (self.occluder_position - occludee.center).norm_squared() - tangent * tangent;
        let camera_to_occludee_squared = (self.camera_position - occludee.center).norm_squared();

        if occludee_radius < self.occluder_radius {
            if temp > 0.0 {
                // Visible when closer than the horizon tangent distance
                let reach = temp.sqrt() + horizon_distance;
                return reach * reach + occludee_radius * occludee_radius > camera_to_occludee_squared;
            }
            // Occludee sits inside the occluder
            return false;
        }

        if temp > 0.0 {
            let occluder_radius_squared = self.occluder_radius * self.occluder_radius;
            let occludee_radius_squared = occludee_radius * occludee_radius;

            // Close enough that the occluder cannot hide it
            if (horizon_distance * horizon_distance + occluder_radius_squared) * occludee_radius_squared
                > camera_to_occludee_squared * occluder_radius_squared
            {
                return true;
            }

            let reach = temp.sqrt() + horizon_distance;
            return reach * reach + occludee_radius_squared > camera_to_occludee_squared;
        }

        // Occludee encloses the occluder
        true
    }
}
