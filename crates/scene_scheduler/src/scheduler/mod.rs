//! # Frame Scheduling
//!
//! Everything that runs once per frame: classifying draw commands into
//! sub-frustums and passes, ordering translucent work, assigning shadow
//! casters, and walking the result into an execution backend.
//!
//! ## Organization
//!
//! - **Pass / Command**: What the scheduler is given
//! - **Partition**: Depth range splitting
//! - **Frustum commands**: Per sub-frustum buckets and the classifier
//! - **Translucency / Shadows**: Ordering and shadow pass assignment
//! - **Frame**: The [`FrameScheduler`] driving all of the above
//! - **Executor**: The [`CommandExecutor`] seam to the GPU layer

pub mod pass;
pub mod command;
pub mod camera;
pub mod partition;
pub mod frustum_commands;
pub mod translucency;
pub mod shadows;
pub mod frame;
pub mod executor;
pub mod error;

#[cfg(test)]
mod tests;

pub use pass::{Pass, PASS_COUNT};
pub use command::{DrawCommand, CommandFlags, CommandIndex, ClearCommand, ClearFlags};
pub use camera::CameraState;
pub use partition::{
    partition_depth_range, partition_depth_range_into, partition_fixed_distance, partition_fixed_distance_into,
    DepthRange, FrustumSplitList, PartitionError,
};
pub use frustum_commands::{FrustumCommands, Candidate, classify_commands, NEAR_FAR_BITS};
pub use translucency::{SortContext, TranslucencySorter};
pub use shadows::{
    assign_shadow_casters, cascade_splits, CubeFace, LightView, ShadowMapDescriptor, ShadowPass, ShadowPassKind,
    ShadowPassList,
};
pub use frame::{FrameScheduler, FrameSchedule, FrameStatistics};
pub use executor::{CommandExecutor, PassBatch};
pub use error::{SchedulerError, SchedulerResult};
