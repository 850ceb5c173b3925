//! Walking a frame schedule into an execution backend
//!
//! The scheduler only decides order. Something else owns the GPU; it
//! implements [`CommandExecutor`] and receives the frame as a sequence of
//! calls in the exact order work must be submitted.

use crate::scheduler::command::{ClearCommand, CommandIndex, DrawCommand};
use crate::scheduler::frame::FrameSchedule;
use crate::scheduler::frustum_commands::FrustumCommands;
use crate::scheduler::partition::DepthRange;
use crate::scheduler::pass::Pass;
use crate::scheduler::shadows::ShadowPass;

/// Ordered commands of one pass, ready to submit
#[derive(Debug, Clone, Copy)]
pub struct PassBatch<'a> {
    /// Pass being drawn
    pub pass: Pass,
    /// Depth range to draw with
    pub depth_range: DepthRange,
    commands: &'a [DrawCommand],
    indices: &'a [CommandIndex],
}

impl<'a> PassBatch<'a> {
    /// Create a batch over `indices` into `commands`
    pub fn new(pass: Pass, depth_range: DepthRange, commands: &'a [DrawCommand], indices: &'a [CommandIndex]) -> Self {
        Self { pass, depth_range, commands, indices }
    }

    /// Command indices in submission order
    pub fn indices(&self) -> &'a [CommandIndex] {
        self.indices
    }

    /// Commands in submission order
    pub fn iter(&self) -> impl Iterator<Item = &'a DrawCommand> + 'a {
        let commands = self.commands;
        self.indices.iter().map(move |&index| &commands[index])
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Receiver of a scheduled frame
pub trait CommandExecutor {
    /// Error raised by the backend; aborts the walk
    type Error;

    /// A sub-frustum starts; `index` 0 is nearest the camera
    fn begin_frustum(&mut self, index: usize, frustum: &FrustumCommands) -> Result<(), Self::Error>;

    /// Clear buffers between sub-frustums
    fn clear(&mut self, clear: &ClearCommand) -> Result<(), Self::Error>;

    /// Submit one pass worth of commands
    fn execute_pass(&mut self, batch: PassBatch<'_>) -> Result<(), Self::Error>;

    /// A shadow pass starts; its casters follow through [`CommandExecutor::execute_pass`]
    fn begin_shadow_pass(&mut self, pass: &ShadowPass) -> Result<(), Self::Error>;
}

impl FrameSchedule {
    /// Submit the camera passes of this frame
    ///
    /// Order: compute, environment, then every sub-frustum far to near (clear
    /// first, then each non-empty bucket in pass order), then overlay.
    pub fn execute<E: CommandExecutor>(&self, commands: &[DrawCommand], executor: &mut E) -> Result<(), E::Error> {
        let full_range = self.depth_range();

        for pass in [Pass::Compute, Pass::Environment] {
            self.execute_once(pass, full_range, commands, executor)?;
        }

        for (index, frustum) in self.frustums().iter().enumerate().rev() {
            executor.begin_frustum(index, frustum)?;
            executor.clear(&ClearCommand::DEPTH_STENCIL)?;

            for pass in Pass::FRUSTUM_PASSES {
                let indices = frustum.commands(pass);
                if !indices.is_empty() {
                    executor.execute_pass(PassBatch::new(pass, frustum.range_for(pass), commands, indices))?;
                }
            }
        }

        self.execute_once(Pass::Overlay, full_range, commands, executor)
    }

    /// Submit the shadow passes of this frame
    pub fn execute_shadows<E: CommandExecutor>(&self, commands: &[DrawCommand], executor: &mut E) -> Result<(), E::Error> {
        for shadow_pass in self.shadow_passes() {
            executor.begin_shadow_pass(shadow_pass)?;

            let range = shadow_pass.depth_range().unwrap_or(self.depth_range());
            for pass in Pass::SHADOW_CASTERS {
                let indices = shadow_pass.casters(pass);
                if !indices.is_empty() {
                    executor.execute_pass(PassBatch::new(pass, range, commands, indices))?;
                }
            }
        }
        Ok(())
    }

    fn execute_once<E: CommandExecutor>(
        &self,
        pass: Pass,
        range: DepthRange,
        commands: &[DrawCommand],
        executor: &mut E,
    ) -> Result<(), E::Error> {
        let indices = self.once_per_frame(pass);
        if indices.is_empty() {
            return Ok(());
        }
        executor.execute_pass(PassBatch::new(pass, range, commands, indices))
    }
}
