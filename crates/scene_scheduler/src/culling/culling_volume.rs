//! Plane-set culling volume with hierarchical plane masks
//!
//! A culling volume is an ordered list of planes whose normals point inward.
//! Two tests are offered:
//!
//! - [`CullingVolume::compute_visibility`] classifies a volume against every
//!   plane, stopping at the first plane it lies outside of.
//! - [`CullingVolume::compute_visibility_with_plane_mask`] supports nested
//!   volumes (bounding volume hierarchies, tile quad-trees). The returned
//!   [`PlaneMask`] records which planes are still unresolved and is passed to
//!   the children as their parent mask, so each node only pays for the planes
//!   its ancestors straddled.

use crate::culling::bounds::{BoundingSphere, BoundingVolume};
use crate::culling::plane::{Intersect, Plane};
use crate::foundation::math::Vec3;

/// Bitmask of unresolved planes; bit k cleared means "inside plane k"
pub type PlaneMask = u32;

/// The volume is outside at least one plane; descendants are culled too
pub const MASK_OUTSIDE: PlaneMask = 0xffff_ffff;

/// The volume is inside every plane; descendants need no tests
pub const MASK_INSIDE: PlaneMask = 0;

/// Nothing resolved yet; start value for a root
pub const MASK_INDETERMINATE: PlaneMask = 0x7fff_ffff;

/// Planes at or past this index cannot be represented and are always tested
pub const MAX_MASKED_PLANES: usize = 31;

static CULL_EVERYTHING: CullingVolume = CullingVolume { planes: Vec::new(), degenerate: true };

/// Set of planes bounding a convex region
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CullingVolume {
    planes: Vec<Plane>,
    degenerate: bool,
}

impl CullingVolume {
    /// Create a culling volume from inward-facing planes
    pub fn new(planes: Vec<Plane>) -> Self {
        Self { planes, degenerate: false }
    }

    /// A volume that reports everything as outside
    ///
    /// Produced for degenerate cameras so the frame renders empty instead of
    /// drawing garbage.
    pub fn degenerate() -> Self {
        Self { planes: Vec::new(), degenerate: true }
    }

    /// Shared degenerate volume
    pub fn cull_everything() -> &'static Self {
        &CULL_EVERYTHING
    }

    /// Six axis-aligned planes tangent to a sphere, facing its center
    pub fn from_bounding_sphere(sphere: &BoundingSphere) -> Self {
        let mut planes = Vec::with_capacity(6);

        for axis in [Vec3::x(), Vec3::y(), Vec3::z()] {
            let low = sphere.center - axis * sphere.radius;
            let high = sphere.center + axis * sphere.radius;
            planes.push(Plane::from_point_normal(&low, axis));
            planes.push(Plane::from_point_normal(&high, -axis));
        }

        Self::new(planes)
    }

    /// Planes in test order
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Number of planes
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Whether this volume rejects everything
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Classify a bounding volume against every plane
    pub fn compute_visibility<B: BoundingVolume + ?Sized>(&self, bounding_volume: &B) -> Intersect {
        if self.degenerate {
            return Intersect::Outside;
        }
        debug_assert!(!self.planes.is_empty(), "culling volume has no planes");

        let mut intersecting = false;
        for plane in &self.planes {
            match bounding_volume.intersect_plane(plane) {
                Intersect::Outside => return Intersect::Outside,
                Intersect::Intersecting => intersecting = true,
                Intersect::Inside => {}
            }
        }

        if intersecting {
            Intersect::Intersecting
        } else {
            Intersect::Inside
        }
    }

    /// Classify a bounding volume nested inside a parent that was tested
    /// against this same volume, skipping planes the parent is inside of
    ///
    /// Returns [`MASK_OUTSIDE`], [`MASK_INSIDE`], or the mask of planes the
    /// volume straddles, to be passed down as the children's parent mask.
    pub fn compute_visibility_with_plane_mask<B: BoundingVolume + ?Sized>(
        &self,
        bounding_volume: &B,
        parent_mask: PlaneMask,
    ) -> PlaneMask {
        if parent_mask == MASK_OUTSIDE || parent_mask == MASK_INSIDE {
            return parent_mask;
        }
        if self.degenerate {
            return MASK_OUTSIDE;
        }
        debug_assert!(!self.planes.is_empty(), "culling volume has no planes");

        let mut mask = MASK_INSIDE;
        for (k, plane) in self.planes.iter().enumerate() {
            let bit = if k < MAX_MASKED_PLANES { 1 << k } else { 0 };
            if k < MAX_MASKED_PLANES && parent_mask & bit == 0 {
                continue;
            }

            match bounding_volume.intersect_plane(plane) {
                Intersect::Outside => return MASK_OUTSIDE,
                Intersect::Intersecting if bit != 0 => mask |= bit,
                // Unrepresentable plane straddled: keep the mask off MASK_INSIDE
                // so children still run their tests. Re-testing plane 30 is harmless.
                Intersect::Intersecting => mask |= 1 << (MAX_MASKED_PLANES - 1),
                Intersect::Inside => {}
            }
        }

        mask
    }
}

/// Collapse a plane mask to the three-way classification
pub fn mask_to_intersect(mask: PlaneMask) -> Intersect {
    match mask {
        MASK_OUTSIDE => Intersect::Outside,
        MASK_INSIDE => Intersect::Inside,
        _ => Intersect::Intersecting,
    }
}
