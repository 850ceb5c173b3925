//! # View Frustums
//!
//! Perspective and orthographic frustums, each in a centered and an
//! off-center form. A frustum turns its shape parameters into a projection
//! matrix and, for a given eye transform, a [`CullingVolume`].
//!
//! ## Shapes
//!
//! - [`PerspectiveFrustum`]: field of view + aspect ratio, wraps an off-center frustum
//! - [`PerspectiveOffCenterFrustum`]: explicit near-plane extents; side planes meet at the eye
//! - [`OrthographicFrustum`]: width + aspect ratio, wraps an off-center frustum
//! - [`OrthographicOffCenterFrustum`]: explicit extents; side planes are parallel
//!
//! Shape setters validate eagerly and never clamp. Derived state is only
//! recomputed when an input actually changes value; [`Frustum::revision`]
//! counts those recomputes. The culling volume is cached the same way, keyed
//! by the eye transform and the shape revision.

pub mod perspective;
pub mod orthographic;

pub use perspective::{PerspectiveFrustum, PerspectiveOffCenterFrustum};
pub use orthographic::{OrthographicFrustum, OrthographicOffCenterFrustum};

use crate::culling::CullingVolume;
use crate::foundation::math::{utils, Mat4, Vec3};
use thiserror::Error;

/// Frustum configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrustumError {
    /// A parameter is NaN or infinite
    #[error("Frustum parameter `{parameter}` must be finite, got {value}")]
    NonFinite {
        /// Parameter name
        parameter: &'static str,
        /// Offending value
        value: f64,
    },

    /// Perspective near plane at or behind the eye
    #[error("Perspective near plane must be greater than zero, got {0}")]
    NearNotPositive(f64),

    /// Orthographic near plane behind the eye
    #[error("Orthographic near plane must not be negative, got {0}")]
    NegativeNear(f64),

    /// Near plane beyond the far plane
    #[error("Near plane ({near}) must not be beyond the far plane ({far})")]
    NearBeyondFar {
        /// Near distance
        near: f64,
        /// Far distance
        far: f64,
    },

    /// Field of view outside (0, pi)
    #[error("Field of view must be in (0, pi) radians, got {0}")]
    FieldOfViewOutOfRange(f64),

    /// Negative aspect ratio
    #[error("Aspect ratio must not be negative, got {0}")]
    NegativeAspectRatio(f64),

    /// Orthographic aspect ratio of zero, which leaves the height unbounded
    #[error("Orthographic aspect ratio must be greater than zero")]
    ZeroAspectRatio,

    /// Negative orthographic width
    #[error("Orthographic width must not be negative, got {0}")]
    NegativeWidth(f64),

    /// Left extent beyond right extent
    #[error("Left extent ({left}) must not exceed right extent ({right})")]
    InvalidHorizontalBounds {
        /// Left extent
        left: f64,
        /// Right extent
        right: f64,
    },

    /// Bottom extent above top extent
    #[error("Bottom extent ({bottom}) must not exceed top extent ({top})")]
    InvalidVerticalBounds {
        /// Bottom extent
        bottom: f64,
        /// Top extent
        top: f64,
    },

    /// Drawing buffer with a zero dimension
    #[error("Drawing buffer dimensions must be non-zero, got {width}x{height}")]
    InvalidBufferDimensions {
        /// Buffer width in pixels
        width: u32,
        /// Buffer height in pixels
        height: u32,
    },

    /// Non-positive pixel ratio
    #[error("Pixel ratio must be greater than zero, got {0}")]
    InvalidPixelRatio(f64),
}

/// Result type for frustum operations
pub type FrustumResult<T> = Result<T, FrustumError>;

pub(crate) fn require_finite(parameter: &'static str, value: f64) -> FrustumResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FrustumError::NonFinite { parameter, value })
    }
}

pub(crate) fn validate_extents(left: f64, right: f64, bottom: f64, top: f64) -> FrustumResult<()> {
    require_finite("left", left)?;
    require_finite("right", right)?;
    require_finite("bottom", bottom)?;
    require_finite("top", top)?;

    if left > right {
        return Err(FrustumError::InvalidHorizontalBounds { left, right });
    }
    if bottom > top {
        return Err(FrustumError::InvalidVerticalBounds { bottom, top });
    }
    Ok(())
}

pub(crate) fn validate_buffer(width: u32, height: u32, pixel_ratio: f64) -> FrustumResult<()> {
    if width == 0 || height == 0 {
        return Err(FrustumError::InvalidBufferDimensions { width, height });
    }
    if !(pixel_ratio.is_finite() && pixel_ratio > 0.0) {
        return Err(FrustumError::InvalidPixelRatio(pixel_ratio));
    }
    Ok(())
}

/// Orthonormal eye basis derived from a view direction and up hint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBasis {
    /// Eye position
    pub position: Vec3,
    /// Unit view direction
    pub direction: Vec3,
    /// Unit up vector, perpendicular to `direction`
    pub up: Vec3,
    /// Unit right vector, `direction × up`
    pub right: Vec3,
}

impl ViewBasis {
    /// Build the basis, or `None` when the inputs cannot define one
    /// (zero-length or non-finite vectors, direction parallel to up)
    pub fn new(position: &Vec3, direction: &Vec3, up: &Vec3) -> Option<Self> {
        if !utils::is_finite(position) {
            return None;
        }
        let direction = utils::try_normalize(direction)?;
        let up = utils::try_normalize(up)?;
        let right = utils::try_normalize(&direction.cross(&up))?;
        // Re-derive up so a slightly skewed hint still yields square side planes
        let up = right.cross(&direction);

        Some(Self { position: *position, direction, up, right })
    }
}

/// Near-plane extents of an off-center frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumExtents {
    /// Left extent
    pub left: f64,
    /// Right extent
    pub right: f64,
    /// Bottom extent
    pub bottom: f64,
    /// Top extent
    pub top: f64,
}

impl FrustumExtents {
    fn scaled(self, factor: f64) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
            bottom: self.bottom * factor,
            top: self.top * factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EyeKey {
    position: Vec3,
    direction: Vec3,
    up: Vec3,
    shape_revision: u64,
}

/// Last culling volume built by a frustum
///
/// Valid while the eye transform and the frustum's shape revision match the
/// ones it was built for.
#[derive(Debug, Clone)]
pub struct CullingVolumeCache {
    key: Option<EyeKey>,
    volume: CullingVolume,
    revision: u64,
}

impl Default for CullingVolumeCache {
    fn default() -> Self {
        Self { key: None, volume: CullingVolume::degenerate(), revision: 0 }
    }
}

impl CullingVolumeCache {
    pub(crate) fn is_current(&self, position: &Vec3, direction: &Vec3, up: &Vec3, shape_revision: u64) -> bool {
        self.key == Some(EyeKey { position: *position, direction: *direction, up: *up, shape_revision })
    }

    pub(crate) fn store(&mut self, position: &Vec3, direction: &Vec3, up: &Vec3, shape_revision: u64, volume: CullingVolume) {
        self.key = Some(EyeKey { position: *position, direction: *direction, up: *up, shape_revision });
        self.volume = volume;
        self.revision += 1;
    }

    /// Most recently built volume; culls everything before the first build
    pub fn volume(&self) -> &CullingVolume {
        &self.volume
    }

    /// Number of times a volume has been built
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Any frustum shape
#[derive(Debug, Clone)]
pub enum Frustum {
    /// Centered perspective
    Perspective(PerspectiveFrustum),
    /// Off-center perspective
    PerspectiveOffCenter(PerspectiveOffCenterFrustum),
    /// Centered orthographic
    Orthographic(OrthographicFrustum),
    /// Off-center orthographic
    OrthographicOffCenter(OrthographicOffCenterFrustum),
}

impl Frustum {
    /// Near plane distance
    pub fn near(&self) -> f64 {
        match self {
            Self::Perspective(f) => f.near(),
            Self::PerspectiveOffCenter(f) => f.near(),
            Self::Orthographic(f) => f.near(),
            Self::OrthographicOffCenter(f) => f.near(),
        }
    }

    /// Far plane distance
    pub fn far(&self) -> f64 {
        match self {
            Self::Perspective(f) => f.far(),
            Self::PerspectiveOffCenter(f) => f.far(),
            Self::Orthographic(f) => f.far(),
            Self::OrthographicOffCenter(f) => f.far(),
        }
    }

    /// Whether side planes are parallel
    pub fn is_orthographic(&self) -> bool {
        matches!(self, Self::Orthographic(_) | Self::OrthographicOffCenter(_))
    }

    /// Near-plane extents
    pub fn extents(&self) -> FrustumExtents {
        match self {
            Self::Perspective(f) => f.off_center().extents(),
            Self::PerspectiveOffCenter(f) => f.extents(),
            Self::Orthographic(f) => f.off_center().extents(),
            Self::OrthographicOffCenter(f) => f.extents(),
        }
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        match self {
            Self::Perspective(f) => f.projection_matrix(),
            Self::PerspectiveOffCenter(f) => f.projection_matrix(),
            Self::Orthographic(f) => f.projection_matrix(),
            Self::OrthographicOffCenter(f) => f.projection_matrix(),
        }
    }

    /// Number of times derived state has been recomputed
    pub fn revision(&self) -> u64 {
        match self {
            Self::Perspective(f) => f.revision(),
            Self::PerspectiveOffCenter(f) => f.revision(),
            Self::Orthographic(f) => f.revision(),
            Self::OrthographicOffCenter(f) => f.revision(),
        }
    }

    /// Culling volume for an eye transform
    pub fn compute_culling_volume(&self, position: &Vec3, direction: &Vec3, up: &Vec3) -> CullingVolume {
        match self {
            Self::Perspective(f) => f.compute_culling_volume(position, direction, up),
            Self::PerspectiveOffCenter(f) => f.compute_culling_volume(position, direction, up),
            Self::Orthographic(f) => f.compute_culling_volume(position, direction, up),
            Self::OrthographicOffCenter(f) => f.compute_culling_volume(position, direction, up),
        }
    }

    /// Culling volume for an eye transform, rebuilt only when the eye or the shape changed
    pub fn culling_volume(&mut self, position: &Vec3, direction: &Vec3, up: &Vec3) -> &CullingVolume {
        match self {
            Self::Perspective(f) => f.culling_volume(position, direction, up),
            Self::PerspectiveOffCenter(f) => f.culling_volume(position, direction, up),
            Self::Orthographic(f) => f.culling_volume(position, direction, up),
            Self::OrthographicOffCenter(f) => f.culling_volume(position, direction, up),
        }
    }

    /// Cached culling volume state
    pub fn culling_volume_cache(&self) -> &CullingVolumeCache {
        match self {
            Self::Perspective(f) => f.off_center().culling_volume_cache(),
            Self::PerspectiveOffCenter(f) => f.culling_volume_cache(),
            Self::Orthographic(f) => f.off_center().culling_volume_cache(),
            Self::OrthographicOffCenter(f) => f.culling_volume_cache(),
        }
    }

    /// World-space size of one pixel at `distance` along the view direction
    pub fn pixel_dimensions(&self, width: u32, height: u32, distance: f64, pixel_ratio: f64) -> FrustumResult<(f64, f64)> {
        match self {
            Self::Perspective(f) => f.pixel_dimensions(width, height, distance, pixel_ratio),
            Self::PerspectiveOffCenter(f) => f.pixel_dimensions(width, height, distance, pixel_ratio),
            Self::Orthographic(f) => f.pixel_dimensions(width, height, distance, pixel_ratio),
            Self::OrthographicOffCenter(f) => f.pixel_dimensions(width, height, distance, pixel_ratio),
        }
    }

    /// Change the depth range in place
    pub fn set_near_far(&mut self, near: f64, far: f64) -> FrustumResult<()> {
        match self {
            Self::Perspective(f) => f.set_near_far(near, far),
            Self::PerspectiveOffCenter(f) => f.set_near_far(near, far),
            Self::Orthographic(f) => f.set_near_far(near, far),
            Self::OrthographicOffCenter(f) => f.set_near_far(near, far),
        }
    }

    /// Copy of this frustum with a different depth range and the same side planes
    ///
    /// Off-center perspective extents live on the near plane, so they are
    /// rescaled to keep the field of view. [`Frustum::set_near_far`] keeps
    /// the extents as given instead.
    pub fn with_near_far(&self, near: f64, far: f64) -> FrustumResult<Self> {
        let mut frustum = self.clone();
        frustum.set_slice_of(self, near, far)?;
        Ok(frustum)
    }

    /// Turn this frustum into the `[near, far]` slice of `source`
    ///
    /// Side planes match `source`. When this frustum already is that slice
    /// nothing is recomputed, so its revision and cached culling volume
    /// survive. A frustum of another shape is replaced.
    pub fn set_slice_of(&mut self, source: &Self, near: f64, far: f64) -> FrustumResult<()> {
        match (self, source) {
            (Self::Perspective(slice), Self::Perspective(source)) => slice.set_slice_of(source, near, far),
            (Self::PerspectiveOffCenter(slice), Self::PerspectiveOffCenter(source)) => {
                require_finite("near", near)?;
                let extents = source.extents().scaled(near / source.near());
                slice.reshape(extents, near, far)
            }
            (Self::Orthographic(slice), Self::Orthographic(source)) => slice.set_slice_of(source, near, far),
            (Self::OrthographicOffCenter(slice), Self::OrthographicOffCenter(source)) => {
                slice.reshape(source.extents(), near, far)
            }
            (slice, source) => {
                let mut replacement = source.clone();
                replacement.set_slice_of(source, near, far)?;
                *slice = replacement;
                Ok(())
            }
        }
    }

    /// World-space corners of the depth slice `[near, far]` of this frustum
    ///
    /// Near corners come first, each face ordered left-bottom, right-bottom,
    /// right-top, left-top. Returns `None` for a degenerate eye basis.
    pub fn corners(&self, position: &Vec3, direction: &Vec3, up: &Vec3, near: f64, far: f64) -> Option<[Vec3; 8]> {
        let basis = ViewBasis::new(position, direction, up)?;
        let extents = self.extents();
        let frustum_near = self.near();
        let orthographic = self.is_orthographic();

        let face = |distance: f64| {
            // Perspective extents grow linearly with distance, orthographic ones do not
            let scale = if orthographic || frustum_near <= 0.0 { 1.0 } else { distance / frustum_near };
            let center = basis.position + basis.direction * distance;
            let corner = |x: f64, y: f64| center + basis.right * (x * scale) + basis.up * (y * scale);
            [
                corner(extents.left, extents.bottom),
                corner(extents.right, extents.bottom),
                corner(extents.right, extents.top),
                corner(extents.left, extents.top),
            ]
        };

        let near_face = face(near);
        let far_face = face(far);
        Some([
            near_face[0], near_face[1], near_face[2], near_face[3],
            far_face[0], far_face[1], far_face[2], far_face[3],
        ])
    }
}

impl From<PerspectiveFrustum> for Frustum {
    fn from(frustum: PerspectiveFrustum) -> Self {
        Self::Perspective(frustum)
    }
}

impl From<PerspectiveOffCenterFrustum> for Frustum {
    fn from(frustum: PerspectiveOffCenterFrustum) -> Self {
        Self::PerspectiveOffCenter(frustum)
    }
}

impl From<OrthographicFrustum> for Frustum {
    fn from(frustum: OrthographicFrustum) -> Self {
        Self::Orthographic(frustum)
    }
}

impl From<OrthographicOffCenterFrustum> for Frustum {
    fn from(frustum: OrthographicOffCenterFrustum) -> Self {
        Self::OrthographicOffCenter(frustum)
    }
}
