//! Per-frame camera input

use crate::culling::{Occluder, OccluderParameters};
use crate::foundation::math::Vec3;
use crate::frustum::Frustum;

/// Camera pose and frustum for one frame
#[derive(Debug, Clone)]
pub struct CameraState {
    /// Eye position in world space
    pub position: Vec3,
    /// View direction
    pub direction: Vec3,
    /// Up hint; need not be exactly perpendicular to `direction`
    pub up: Vec3,
    /// Camera frustum
    pub frustum: Frustum,
    /// Body used for horizon culling, if any
    pub occluder: Option<OccluderParameters>,
}

impl CameraState {
    /// Create a camera state without an occluder
    pub fn new(position: Vec3, direction: Vec3, up: Vec3, frustum: impl Into<Frustum>) -> Self {
        Self {
            position,
            direction,
            up,
            frustum: frustum.into(),
            occluder: None,
        }
    }

    /// Create a camera at `position` looking at `target`
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, frustum: impl Into<Frustum>) -> Self {
        Self::new(position, target - position, up, frustum)
    }

    /// Enable horizon culling against a body
    pub fn with_occluder(mut self, occluder: OccluderParameters) -> Self {
        self.occluder = Some(occluder);
        self
    }

    /// Horizon occluder for this frame, or `None` when the camera is inside the body
    pub fn horizon_occluder(&self) -> Option<Occluder> {
        self.occluder
            .as_ref()
            .and_then(|parameters| Occluder::from_parameters(parameters, self.position))
    }
}
