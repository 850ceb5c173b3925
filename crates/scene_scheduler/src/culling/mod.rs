//! Visibility primitives
//!
//! Planes, bounding volumes, the horizon occluder and the culling volume that
//! ties them together.

pub mod plane;
pub mod bounds;
pub mod occluder;
pub mod culling_volume;
pub mod hierarchy;

pub use plane::{Plane, Intersect};
pub use bounds::{BoundingVolume, BoundingSphere, AxisAlignedBox, OrientedBox, Bounds, DepthInterval};
pub use occluder::{Occluder, OccluderParameters};
pub use culling_volume::{
    CullingVolume, PlaneMask, mask_to_intersect,
    MASK_OUTSIDE, MASK_INSIDE, MASK_INDETERMINATE, MAX_MASKED_PLANES,
};
pub use hierarchy::{CullingNode, TraversalStats, traverse_with_plane_mask};
