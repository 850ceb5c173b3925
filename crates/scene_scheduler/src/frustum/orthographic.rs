//! Orthographic frustums

use crate::culling::{CullingVolume, Plane};
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::frustum::{
    require_finite, validate_buffer, validate_extents, CullingVolumeCache, FrustumError, FrustumExtents, FrustumResult,
    ViewBasis,
};

/// Orthographic frustum with explicit extents
///
/// Side planes are parallel to the view direction, so pixel size does not
/// depend on distance.
#[derive(Debug, Clone)]
pub struct OrthographicOffCenterFrustum {
    extents: FrustumExtents,
    near: f64,
    far: f64,
    projection: Mat4,
    revision: u64,
    volume_cache: CullingVolumeCache,
}

impl OrthographicOffCenterFrustum {
    /// Create a new off-center orthographic frustum
    pub fn new(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> FrustumResult<Self> {
        let extents = FrustumExtents { left, right, bottom, top };
        Self::validate(&extents, near, far)?;

        let mut frustum = Self {
            extents,
            near,
            far,
            projection: Mat4::identity(),
            revision: 0,
            volume_cache: CullingVolumeCache::default(),
        };
        frustum.recompute();
        Ok(frustum)
    }

    fn validate(extents: &FrustumExtents, near: f64, far: f64) -> FrustumResult<()> {
        require_finite("near", near)?;
        require_finite("far", far)?;
        if near < 0.0 {
            return Err(FrustumError::NegativeNear(near));
        }
        if near > far {
            return Err(FrustumError::NearBeyondFar { near, far });
        }

        validate_extents(extents.left, extents.right, extents.bottom, extents.top)
    }

    pub(crate) fn reshape(&mut self, extents: FrustumExtents, near: f64, far: f64) -> FrustumResult<()> {
        if extents == self.extents && near == self.near && far == self.far {
            return Ok(());
        }
        Self::validate(&extents, near, far)?;
        self.extents = extents;
        self.near = near;
        self.far = far;
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        let FrustumExtents { left, right, bottom, top } = self.extents;
        self.projection = Mat4::orthographic_off_center(left, right, bottom, top, self.near, self.far);
        self.revision += 1;
    }

    /// Extents in eye space
    pub fn extents(&self) -> FrustumExtents {
        self.extents
    }

    /// Near plane distance
    pub fn near(&self) -> f64 {
        self.near
    }

    /// Far plane distance
    pub fn far(&self) -> f64 {
        self.far
    }

    /// Number of times the projection has been recomputed
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Change the extents; a no-op when nothing changes
    pub fn set_extents(&mut self, left: f64, right: f64, bottom: f64, top: f64) -> FrustumResult<()> {
        self.reshape(FrustumExtents { left, right, bottom, top }, self.near, self.far)
    }

    /// Change the depth range; a no-op when nothing changes
    pub fn set_near_far(&mut self, near: f64, far: f64) -> FrustumResult<()> {
        self.reshape(self.extents, near, far)
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Culling volume for an eye transform
    ///
    /// Planes are ordered left, right, bottom, top, near, far.
    pub fn compute_culling_volume(&self, position: &Vec3, direction: &Vec3, up: &Vec3) -> CullingVolume {
        let Some(basis) = ViewBasis::new(position, direction, up) else {
            log::warn!("Degenerate eye transform, culling everything: direction={direction:?} up={up:?}");
            return CullingVolume::degenerate();
        };
        if self.near == self.far {
            return CullingVolume::degenerate();
        }

        let ViewBasis { position, direction, up, right } = basis;
        let extents = self.extents;
        let near_center = position + direction * self.near;

        CullingVolume::new(vec![
            Plane::from_point_normal(&(near_center + right * extents.left), right),
            Plane::from_point_normal(&(near_center + right * extents.right), -right),
            Plane::from_point_normal(&(near_center + up * extents.bottom), up),
            Plane::from_point_normal(&(near_center + up * extents.top), -up),
            Plane::from_point_normal(&near_center, direction),
            Plane::from_point_normal(&(position + direction * self.far), -direction),
        ])
    }

    /// Culling volume for an eye transform, reused until the eye or the shape changes
    pub fn culling_volume(&mut self, position: &Vec3, direction: &Vec3, up: &Vec3) -> &CullingVolume {
        if !self.volume_cache.is_current(position, direction, up, self.revision) {
            let volume = self.compute_culling_volume(position, direction, up);
            self.volume_cache.store(position, direction, up, self.revision, volume);
        }
        self.volume_cache.volume()
    }

    /// Cached culling volume state
    pub fn culling_volume_cache(&self) -> &CullingVolumeCache {
        &self.volume_cache
    }

    /// World-space size of one pixel; `distance` has no effect
    pub fn pixel_dimensions(&self, width: u32, height: u32, _distance: f64, pixel_ratio: f64) -> FrustumResult<(f64, f64)> {
        validate_buffer(width, height, pixel_ratio)?;

        let FrustumExtents { left, right, bottom, top } = self.extents;
        let pixel_width = pixel_ratio * (right - left) / f64::from(width);
        let pixel_height = pixel_ratio * (top - bottom) / f64::from(height);
        Ok((pixel_width, pixel_height))
    }
}

/// Orthographic frustum defined by a width and aspect ratio
#[derive(Debug, Clone)]
pub struct OrthographicFrustum {
    width: f64,
    aspect_ratio: f64,
    off_center: OrthographicOffCenterFrustum,
}

impl OrthographicFrustum {
    /// Create a new orthographic frustum
    ///
    /// `width` is the horizontal extent in world units; the height follows
    /// from `aspect_ratio` (width / height).
    pub fn new(width: f64, aspect_ratio: f64, near: f64, far: f64) -> FrustumResult<Self> {
        let extents = Self::compute_extents(width, aspect_ratio)?;
        let off_center = OrthographicOffCenterFrustum::new(
            extents.left, extents.right, extents.bottom, extents.top, near, far,
        )?;
        Ok(Self { width, aspect_ratio, off_center })
    }

    fn compute_extents(width: f64, aspect_ratio: f64) -> FrustumResult<FrustumExtents> {
        require_finite("width", width)?;
        require_finite("aspect_ratio", aspect_ratio)?;
        if width < 0.0 {
            return Err(FrustumError::NegativeWidth(width));
        }
        if aspect_ratio < 0.0 {
            return Err(FrustumError::NegativeAspectRatio(aspect_ratio));
        }
        if aspect_ratio == 0.0 {
            return Err(FrustumError::ZeroAspectRatio);
        }

        let right = 0.5 * width;
        let top = right / aspect_ratio;
        Ok(FrustumExtents { left: -right, right, bottom: -top, top })
    }

    /// Horizontal extent in world units
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Aspect ratio
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Near plane distance
    pub fn near(&self) -> f64 {
        self.off_center.near()
    }

    /// Far plane distance
    pub fn far(&self) -> f64 {
        self.off_center.far()
    }

    /// Number of times the projection has been recomputed
    pub fn revision(&self) -> u64 {
        self.off_center.revision()
    }

    /// Underlying off-center frustum
    pub fn off_center(&self) -> &OrthographicOffCenterFrustum {
        &self.off_center
    }

    /// Change the width
    pub fn set_width(&mut self, width: f64) -> FrustumResult<()> {
        let extents = Self::compute_extents(width, self.aspect_ratio)?;
        self.off_center.set_extents(extents.left, extents.right, extents.bottom, extents.top)?;
        self.width = width;
        Ok(())
    }

    /// Change the aspect ratio
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f64) -> FrustumResult<()> {
        let extents = Self::compute_extents(self.width, aspect_ratio)?;
        self.off_center.set_extents(extents.left, extents.right, extents.bottom, extents.top)?;
        self.aspect_ratio = aspect_ratio;
        Ok(())
    }

    /// Change the depth range
    pub fn set_near_far(&mut self, near: f64, far: f64) -> FrustumResult<()> {
        self.off_center.set_near_far(near, far)
    }

    pub(crate) fn set_slice_of(&mut self, source: &Self, near: f64, far: f64) -> FrustumResult<()> {
        self.off_center.reshape(source.off_center.extents, near, far)?;
        self.width = source.width;
        self.aspect_ratio = source.aspect_ratio;
        Ok(())
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        self.off_center.projection_matrix()
    }

    /// Culling volume for an eye transform
    pub fn compute_culling_volume(&self, position: &Vec3, direction: &Vec3, up: &Vec3) -> CullingVolume {
        self.off_center.compute_culling_volume(position, direction, up)
    }

    /// Culling volume for an eye transform, reused until the eye or the shape changes
    pub fn culling_volume(&mut self, position: &Vec3, direction: &Vec3, up: &Vec3) -> &CullingVolume {
        self.off_center.culling_volume(position, direction, up)
    }

    /// World-space size of one pixel
    pub fn pixel_dimensions(&self, width: u32, height: u32, distance: f64, pixel_ratio: f64) -> FrustumResult<(f64, f64)> {
        self.off_center.pixel_dimensions(width, height, distance, pixel_ratio)
    }
}
