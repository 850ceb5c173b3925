//! Perspective frustums
//!
//! The off-center form holds the math; the centered form derives its
//! extents from a field of view and aspect ratio and delegates.

use crate::culling::{CullingVolume, Plane};
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::frustum::{
    require_finite, validate_buffer, validate_extents, CullingVolumeCache, FrustumError, FrustumExtents, FrustumResult,
    ViewBasis,
};

/// Perspective frustum with explicit near-plane extents
///
/// `left`, `right`, `bottom` and `top` are measured on the near plane in eye
/// space. All four side planes pass through the eye.
#[derive(Debug, Clone)]
pub struct PerspectiveOffCenterFrustum {
    extents: FrustumExtents,
    near: f64,
    far: f64,
    projection: Mat4,
    infinite_projection: Mat4,
    revision: u64,
    volume_cache: CullingVolumeCache,
}

impl PerspectiveOffCenterFrustum {
    /// Create a new off-center perspective frustum
    pub fn new(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> FrustumResult<Self> {
        let extents = FrustumExtents { left, right, bottom, top };
        Self::validate(&extents, near, far)?;

        let mut frustum = Self {
            extents,
            near,
            far,
            projection: Mat4::identity(),
            infinite_projection: Mat4::identity(),
            revision: 0,
            volume_cache: CullingVolumeCache::default(),
        };
        frustum.recompute();
        Ok(frustum)
    }

    fn validate(extents: &FrustumExtents, near: f64, far: f64) -> FrustumResult<()> {
        // Depth first: extents derived from a bad near plane are meaningless
        require_finite("near", near)?;
        require_finite("far", far)?;
        if near <= 0.0 {
            return Err(FrustumError::NearNotPositive(near));
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
        self.projection = Mat4::perspective_off_center(left, right, bottom, top, self.near, self.far);
        self.infinite_projection = Mat4::infinite_perspective_off_center(left, right, bottom, top, self.near);
        self.revision += 1;
        log::trace!(
            "Perspective frustum recomputed (revision {}): l={left} r={right} b={bottom} t={top} n={} f={}",
            self.revision, self.near, self.far
        );
    }

    /// Near-plane extents
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

    /// Change the near-plane extents; a no-op when nothing changes
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

    /// Projection matrix with the far plane at infinity
    pub fn infinite_projection_matrix(&self) -> &Mat4 {
        &self.infinite_projection
    }

    /// Culling volume for an eye transform
    ///
    /// Planes are ordered left, right, bottom, top, near, far. Degenerate eye
    /// transforms or a zero-depth frustum yield a volume that culls everything.
    pub fn compute_culling_volume(&self, position: &Vec3, direction: &Vec3, up: &Vec3) -> CullingVolume {
        let Some(basis) = ViewBasis::new(position, direction, up) else {
            log::warn!("Degenerate eye transform, culling everything: direction={direction:?} up={up:?}");
            return CullingVolume::degenerate();
        };
        if self.near == self.far {
            return CullingVolume::degenerate();
        }

        let ViewBasis { position, direction, up, right } = basis;
        let FrustumExtents { left, right: r, bottom, top } = self.extents;
        let near_center = position + direction * self.near;
        let far_center = position + direction * self.far;

        // Side planes all contain the eye: normal from the edge ray crossed with the edge axis
        let edge = |offset: Vec3| (near_center + offset - position).normalize();
        let through_eye = |normal: Vec3| {
            let normal = normal.normalize();
            Plane::from_point_normal(&position, normal)
        };

        let left_plane = through_eye(edge(right * left).cross(&up));
        let right_plane = through_eye(up.cross(&edge(right * r)));
        let bottom_plane = through_eye(right.cross(&edge(up * bottom)));
        let top_plane = through_eye(edge(up * top).cross(&right));
        let near_plane = Plane::from_point_normal(&near_center, direction);
        let far_plane = Plane::from_point_normal(&far_center, -direction);

        CullingVolume::new(vec![left_plane, right_plane, bottom_plane, top_plane, near_plane, far_plane])
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

    /// World-space size of one pixel at `distance` along the view direction
    ///
    /// Grows linearly with distance (similar triangles from the near plane).
    pub fn pixel_dimensions(&self, width: u32, height: u32, distance: f64, pixel_ratio: f64) -> FrustumResult<(f64, f64)> {
        validate_buffer(width, height, pixel_ratio)?;

        let inverse_near = 1.0 / self.near;
        let pixel_height = 2.0 * pixel_ratio * distance * self.extents.top * inverse_near / f64::from(height);
        let pixel_width = 2.0 * pixel_ratio * distance * self.extents.right * inverse_near / f64::from(width);
        Ok((pixel_width, pixel_height))
    }
}

/// Perspective frustum defined by a field of view and aspect ratio
///
/// The field of view applies to the larger of the two viewport dimensions.
/// Optional offsets shift the frustum off-axis without changing its size.
#[derive(Debug, Clone)]
pub struct PerspectiveFrustum {
    fov: f64,
    aspect_ratio: f64,
    x_offset: f64,
    y_offset: f64,
    off_center: PerspectiveOffCenterFrustum,
}

impl PerspectiveFrustum {
    /// Create a new perspective frustum
    ///
    /// # Arguments
    /// * `fov` - Field of view in radians, in (0, pi)
    /// * `aspect_ratio` - Viewport width / height, non-negative
    /// * `near` - Near plane distance, greater than zero
    /// * `far` - Far plane distance, not less than `near`
    pub fn new(fov: f64, aspect_ratio: f64, near: f64, far: f64) -> FrustumResult<Self> {
        Self::validate_shape(fov, aspect_ratio)?;
        let extents = Self::compute_extents(fov, aspect_ratio, 0.0, 0.0, near);
        let off_center = PerspectiveOffCenterFrustum::new(
            extents.left, extents.right, extents.bottom, extents.top, near, far,
        )?;

        Ok(Self { fov, aspect_ratio, x_offset: 0.0, y_offset: 0.0, off_center })
    }

    fn validate_shape(fov: f64, aspect_ratio: f64) -> FrustumResult<()> {
        require_finite("fov", fov)?;
        require_finite("aspect_ratio", aspect_ratio)?;

        if fov <= 0.0 || fov >= std::f64::consts::PI {
            return Err(FrustumError::FieldOfViewOutOfRange(fov));
        }
        if aspect_ratio < 0.0 {
            return Err(FrustumError::NegativeAspectRatio(aspect_ratio));
        }
        Ok(())
    }

    fn compute_extents(fov: f64, aspect_ratio: f64, x_offset: f64, y_offset: f64, near: f64) -> FrustumExtents {
        let fovy = Self::compute_fovy(fov, aspect_ratio);
        let top = near * (0.5 * fovy).tan();
        let right = aspect_ratio * top;

        FrustumExtents {
            left: -right + x_offset,
            right: right + x_offset,
            bottom: -top + y_offset,
            top: top + y_offset,
        }
    }

    fn compute_fovy(fov: f64, aspect_ratio: f64) -> f64 {
        if aspect_ratio <= 1.0 {
            fov
        } else {
            ((0.5 * fov).tan() / aspect_ratio).atan() * 2.0
        }
    }

    fn update(&mut self, fov: f64, aspect_ratio: f64, x_offset: f64, y_offset: f64) -> FrustumResult<()> {
        Self::validate_shape(fov, aspect_ratio)?;
        require_finite("x_offset", x_offset)?;
        require_finite("y_offset", y_offset)?;

        let extents = Self::compute_extents(fov, aspect_ratio, x_offset, y_offset, self.off_center.near());
        self.off_center.set_extents(extents.left, extents.right, extents.bottom, extents.top)?;
        self.fov = fov;
        self.aspect_ratio = aspect_ratio;
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        Ok(())
    }

    /// Field of view in radians
    pub fn fov(&self) -> f64 {
        self.fov
    }

    /// Vertical field of view in radians
    pub fn fovy(&self) -> f64 {
        Self::compute_fovy(self.fov, self.aspect_ratio)
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
    pub fn off_center(&self) -> &PerspectiveOffCenterFrustum {
        &self.off_center
    }

    /// Change the field of view
    pub fn set_fov(&mut self, fov: f64) -> FrustumResult<()> {
        self.update(fov, self.aspect_ratio, self.x_offset, self.y_offset)
    }

    /// Change the aspect ratio
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f64) -> FrustumResult<()> {
        self.update(self.fov, aspect_ratio, self.x_offset, self.y_offset)
    }

    /// Shift the frustum off-axis, in near-plane units
    pub fn set_offset(&mut self, x_offset: f64, y_offset: f64) -> FrustumResult<()> {
        self.update(self.fov, self.aspect_ratio, x_offset, y_offset)
    }

    /// Change the depth range
    pub fn set_near_far(&mut self, near: f64, far: f64) -> FrustumResult<()> {
        // Extents live on the near plane, so they scale with it
        let extents = Self::compute_extents(self.fov, self.aspect_ratio, self.x_offset, self.y_offset, near);
        self.off_center.reshape(extents, near, far)
    }

    pub(crate) fn set_slice_of(&mut self, source: &Self, near: f64, far: f64) -> FrustumResult<()> {
        let extents = Self::compute_extents(source.fov, source.aspect_ratio, source.x_offset, source.y_offset, near);
        self.off_center.reshape(extents, near, far)?;
        self.fov = source.fov;
        self.aspect_ratio = source.aspect_ratio;
        self.x_offset = source.x_offset;
        self.y_offset = source.y_offset;
        Ok(())
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        self.off_center.projection_matrix()
    }

    /// Projection matrix with the far plane at infinity
    pub fn infinite_projection_matrix(&self) -> &Mat4 {
        self.off_center.infinite_projection_matrix()
    }

    /// Culling volume for an eye transform
    pub fn compute_culling_volume(&self, position: &Vec3, direction: &Vec3, up: &Vec3) -> CullingVolume {
        self.off_center.compute_culling_volume(position, direction, up)
    }

    /// Culling volume for an eye transform, reused until the eye or the shape changes
    pub fn culling_volume(&mut self, position: &Vec3, direction: &Vec3, up: &Vec3) -> &CullingVolume {
        self.off_center.culling_volume(position, direction, up)
    }

    /// World-space size of one pixel at `distance` along the view direction
    pub fn pixel_dimensions(&self, width: u32, height: u32, distance: f64, pixel_ratio: f64) -> FrustumResult<(f64, f64)> {
        self.off_center.pixel_dimensions(width, height, distance, pixel_ratio)
    }
}
