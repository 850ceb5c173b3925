//! Draw command descriptors
//!
//! The scheduler never touches GPU state. A [`DrawCommand`] carries just
//! enough to decide where and whether the command runs; the `owner` handle
//! lets the execution layer find the real GPU work again.

use bitflags::bitflags;

use crate::culling::{Bounds, BoundingVolume, CullingVolume, Intersect};
use crate::foundation::math::Vec3;
use crate::scheduler::pass::Pass;

/// Position of a command in the frame's input slice
pub type CommandIndex = usize;

bitflags! {
    /// Per-command scheduling flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandFlags: u32 {
        /// Test the bounding volume against culling volumes
        const CULL = 1 << 0;
        /// Test the bounding volume against the horizon occluder
        const OCCLUDE = 1 << 1;
        /// Draw into shadow maps
        const CAST_SHADOWS = 1 << 2;
        /// Sample shadow maps when drawn
        const RECEIVE_SHADOWS = 1 << 3;
        /// Draw only in the nearest sub-frustum that contains the command
        const EXECUTE_IN_CLOSEST_FRUSTUM = 1 << 4;
    }
}

impl Default for CommandFlags {
    fn default() -> Self {
        Self::CULL | Self::OCCLUDE
    }
}

bitflags! {
    /// Buffers reset by a clear step
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        /// Color attachment
        const COLOR = 1 << 0;
        /// Depth attachment
        const DEPTH = 1 << 1;
        /// Stencil attachment
        const STENCIL = 1 << 2;
    }
}

/// Clear step issued at the start of every sub-frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearCommand {
    /// Buffers to clear
    pub flags: ClearFlags,
    /// Depth clear value
    pub depth: f32,
    /// Stencil clear value
    pub stencil: u32,
}

impl ClearCommand {
    /// Depth to 1.0 and stencil to 0; color is kept
    pub const DEPTH_STENCIL: Self = Self {
        flags: ClearFlags::DEPTH.union(ClearFlags::STENCIL),
        depth: 1.0,
        stencil: 0,
    };
}

/// A prepared draw, as seen by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Pass the command is drawn in
    pub pass: Pass,
    /// World-space bounds; `None` means "everywhere"
    pub bounding_volume: Option<Bounds>,
    /// Scheduling flags
    pub flags: CommandFlags,
    /// Opaque handle for the execution layer
    pub owner: u64,
}

impl DrawCommand {
    /// Create a command with default flags and no bounding volume
    pub fn new(pass: Pass, owner: u64) -> Self {
        Self {
            pass,
            bounding_volume: None,
            flags: CommandFlags::default(),
            owner,
        }
    }

    /// Set the bounding volume
    pub fn with_bounding_volume(mut self, bounding_volume: impl Into<Bounds>) -> Self {
        self.bounding_volume = Some(bounding_volume.into());
        self
    }

    /// Replace the flags
    pub fn with_flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Add flags to the current set
    pub fn with_added_flags(mut self, flags: CommandFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Bounding volume used for culling, if the command is culled at all
    ///
    /// A command flagged [`CommandFlags::CULL`] without a bounding volume is
    /// a caller bug; release builds draw it unculled.
    pub fn culling_bounds(&self) -> Option<&Bounds> {
        if !self.flags.contains(CommandFlags::CULL) {
            return None;
        }
        debug_assert!(
            self.bounding_volume.is_some(),
            "command {} in pass {} is flagged CULL but has no bounding volume",
            self.owner,
            self.pass
        );
        self.bounding_volume.as_ref()
    }

    /// Whether the command survives a plain test against `volume`
    pub fn is_visible_in(&self, volume: &CullingVolume) -> bool {
        self.culling_bounds()
            .map_or(true, |bounds| volume.compute_visibility(bounds) != Intersect::Outside)
    }

    /// Whether the command may be drawn into shadow maps
    pub fn is_shadow_caster(&self) -> bool {
        self.flags.contains(CommandFlags::CAST_SHADOWS) && self.pass.casts_shadows()
    }

    /// Squared distance from `point` to the bounding volume center, or 0
    pub fn distance_squared_to(&self, point: &Vec3) -> f64 {
        self.bounding_volume
            .as_ref()
            .map_or(0.0, |bounds| bounds.distance_squared_to_center(point))
    }
}
