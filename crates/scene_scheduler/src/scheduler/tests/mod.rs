//! End-to-end scheduler tests

mod scenarios;
mod execution;

use std::convert::Infallible;

use crate::culling::BoundingSphere;
use crate::foundation::math::Vec3;
use crate::frustum::PerspectiveFrustum;
use crate::scheduler::{
    CameraState, ClearCommand, CommandExecutor, CommandIndex, DepthRange, DrawCommand, FrustumCommands, Pass,
    PassBatch, ShadowPass, ShadowPassKind,
};

/// Everything an executor was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    BeginFrustum(usize),
    Clear(ClearCommand),
    Pass(Pass, DepthRange, Vec<CommandIndex>),
    BeginShadowPass(ShadowPassKind),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingExecutor {
    pub events: Vec<Event>,
}

impl CommandExecutor for RecordingExecutor {
    type Error = Infallible;

    fn begin_frustum(&mut self, index: usize, _frustum: &FrustumCommands) -> Result<(), Self::Error> {
        self.events.push(Event::BeginFrustum(index));
        Ok(())
    }

    fn clear(&mut self, clear: &ClearCommand) -> Result<(), Self::Error> {
        self.events.push(Event::Clear(*clear));
        Ok(())
    }

    fn execute_pass(&mut self, batch: PassBatch<'_>) -> Result<(), Self::Error> {
        self.events.push(Event::Pass(batch.pass, batch.depth_range, batch.indices().to_vec()));
        Ok(())
    }

    fn begin_shadow_pass(&mut self, pass: &ShadowPass) -> Result<(), Self::Error> {
        self.events.push(Event::BeginShadowPass(pass.kind()));
        Ok(())
    }
}

/// 60 degree square camera at the origin looking down -Z
pub(crate) fn camera(near: f64, far: f64) -> CameraState {
    let frustum = PerspectiveFrustum::new(60f64.to_radians(), 1.0, near, far).unwrap();
    CameraState::new(Vec3::zeros(), -Vec3::z(), Vec3::y(), frustum)
}

/// Command centered on the view axis at `depth`
pub(crate) fn at_depth(pass: Pass, depth: f64, radius: f64) -> DrawCommand {
    DrawCommand::new(pass, depth.to_bits()).with_bounding_volume(BoundingSphere::new(Vec3::new(0.0, 0.0, -depth), radius))
}
