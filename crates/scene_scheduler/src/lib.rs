//! # Scene Scheduler
//!
//! CPU-side visibility and pass scheduling for a geospatial renderer.
//!
//! Every frame the scheduler takes the camera and a flat list of prepared
//! draw commands and decides what is visible and in which order it must be
//! drawn. It never touches GPU state; the result is walked into a
//! [`CommandExecutor`](scheduler::CommandExecutor) owned by the renderer.
//!
//! ## Features
//!
//! - **Culling**: Plane-set culling volumes with hierarchical plane masks and
//!   horizon occlusion
//! - **Frustums**: Perspective and orthographic, centered and off-center
//! - **Multi-frustum rendering**: Depth ranges split into sub-frustums with a
//!   bounded far/near ratio, drawn far to near
//! - **Passes**: Fixed pass order, back-to-front translucency, cascaded,
//!   spot and point light shadow assignment
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_scheduler::prelude::*;
//!
//! fn main() -> Result<(), SchedulerError> {
//!     let frustum = PerspectiveFrustum::new(60f64.to_radians(), 16.0 / 9.0, 1.0, 1.0e7)?;
//!     let camera = CameraState::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::z(), Vec3::y(), frustum);
//!
//!     let commands = vec![
//!         DrawCommand::new(Pass::Globe, 1)
//!             .with_bounding_volume(BoundingSphere::new(Vec3::new(0.0, 0.0, -1.0e6), 1.0e6)),
//!         DrawCommand::new(Pass::Translucent, 2)
//!             .with_bounding_volume(BoundingSphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0)),
//!     ];
//!
//!     let mut scheduler = FrameScheduler::new(SchedulerConfig::default())?;
//!     let schedule = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render)?;
//!     assert!(schedule.frustums().len() >= 2);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod foundation;
pub mod config;
pub mod core;
pub mod culling;
pub mod frustum;
pub mod scheduler;

/// Common imports for scheduler users
pub mod prelude {
    pub use crate::{
        core::{Config, ConfigError, DepthMode, SceneMode, SchedulerConfig},
        culling::{
            AxisAlignedBox, BoundingSphere, BoundingVolume, Bounds, CullingVolume, Intersect, OccluderParameters,
            OrientedBox, Plane,
        },
        foundation::math::{Mat3, Mat4, Vec3},
        frustum::{
            Frustum, FrustumError, OrthographicFrustum, OrthographicOffCenterFrustum, PerspectiveFrustum,
            PerspectiveOffCenterFrustum,
        },
        scheduler::{
            CameraState, CommandExecutor, CommandFlags, DrawCommand, FrameSchedule, FrameScheduler, FrameStatistics,
            Pass, PassBatch, SchedulerError, ShadowMapDescriptor, SortContext,
        },
    };
}
