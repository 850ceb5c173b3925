//! Scheduler error type

use thiserror::Error;

use crate::config::ConfigError;
use crate::frustum::FrustumError;
use crate::scheduler::partition::PartitionError;

/// Errors surfaced by [`FrameScheduler`](crate::scheduler::FrameScheduler)
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Camera or light frustum rejected
    #[error("Frustum error: {0}")]
    Frustum(#[from] FrustumError),

    /// Depth range could not be partitioned
    #[error("Partition error: {0}")]
    Partition(#[from] PartitionError),

    /// Shadow map descriptor rejected
    #[error("Invalid shadow map {map}: {reason}")]
    InvalidShadowMap {
        /// Position of the descriptor in the frame's shadow map list
        map: usize,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
