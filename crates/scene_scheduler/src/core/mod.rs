//! # Core Scheduler Module
//!
//! Shared abstractions used by every scheduling stage.
//!
//! ## Organization
//!
//! - **Config**: Scheduler configuration with validation
//! - **Foundation**: Low-level utilities (math, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    SchedulerConfig,
    DepthMode,
    SceneMode,
    Config,
    ConfigError,
};
