//! Frame scheduler demo
//!
//! Orbits a camera low over a synthetic globe, schedules each frame and walks
//! the result with a counting executor. Pass a `.toml` or `.ron` file to
//! override the scheduler settings:
//!
//! ```text
//! cargo run -p scheduler_demo -- scheduler_demo/scheduler.toml
//! ```

mod globe;

use std::convert::Infallible;

use globe::{surface_point, GlobeScene, BODY_RADIUS};
use scene_scheduler::prelude::*;
use scene_scheduler::scheduler::{ClearCommand, FrustumCommands, ShadowPass, PASS_COUNT};

const FRAME_COUNT: u32 = 8;
const SCENE_SEED: u64 = 0x5eed;

/// Counts what a renderer would have been asked to do
#[derive(Debug, Default)]
struct DrawCallCounter {
    frustums: usize,
    clears: usize,
    shadow_passes: usize,
    draws: [usize; PASS_COUNT],
}

impl DrawCallCounter {
    fn total_draws(&self) -> usize {
        self.draws.iter().sum()
    }
}

impl CommandExecutor for DrawCallCounter {
    type Error = Infallible;

    fn begin_frustum(&mut self, index: usize, frustum: &FrustumCommands) -> Result<(), Self::Error> {
        let range = frustum.range();
        log::trace!("Frustum {index}: [{:.3}, {:.3}]", range.near, range.far);
        self.frustums += 1;
        Ok(())
    }

    fn clear(&mut self, _clear: &ClearCommand) -> Result<(), Self::Error> {
        self.clears += 1;
        Ok(())
    }

    fn execute_pass(&mut self, batch: PassBatch<'_>) -> Result<(), Self::Error> {
        self.draws[batch.pass.index()] += batch.len();
        Ok(())
    }

    fn begin_shadow_pass(&mut self, _pass: &ShadowPass) -> Result<(), Self::Error> {
        self.shadow_passes += 1;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    scene_scheduler::foundation::logging::init_with_level("info");

    println!("🌍 Frame Scheduler Demo");
    println!("=======================");

    let mut scheduler = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading scheduler settings from {path}");
            FrameScheduler::from_config_file(&path)?
        }
        None => FrameScheduler::new(SchedulerConfig::default())?,
    };

    let scene = GlobeScene::new(SCENE_SEED);
    let sun = scheduler.directional_shadow_map(Vec3::new(-1.0, -0.3, -0.2));
    let occluder = OccluderParameters {
        center: Vec3::zeros(),
        minimum_radius: BODY_RADIUS,
        minimum_surface_height: -100.0,
    };

    let frustum = PerspectiveFrustum::new(60f64.to_radians(), 16.0 / 9.0, 1.0, 5.0e8)?;
    let mut commands = Vec::new();

    for frame in 0..FRAME_COUNT {
        // Sweep east while descending toward the building cluster
        let t = f64::from(frame) / f64::from(FRAME_COUNT);
        let altitude = 20_000.0 * (1.0 - t) + 1_500.0;
        let eye = surface_point(-0.01 + 0.02 * t, -0.03, altitude);
        let camera = CameraState::look_at(eye, surface_point(0.0, 0.0, 0.0), eye.normalize(), frustum.clone())
            .with_occluder(occluder);

        let traversal = scene.frame_commands(&camera, &mut commands);
        log::info!(
            "Frame {frame}: altitude {altitude:.0} m, {} tiles tested, {} culled, {} commands",
            traversal.nodes_tested,
            traversal.nodes_culled,
            commands.len()
        );

        let schedule = scheduler.schedule_frame(&camera, &commands, std::slice::from_ref(&sun), SortContext::Render)?;

        let mut counter = DrawCallCounter::default();
        schedule.execute_shadows(&commands, &mut counter)?;
        schedule.execute(&commands, &mut counter)?;

        let stats = schedule.statistics();
        log::info!(
            "  {} frustums, {} shadow passes, {} draws ({} globe, {} tileset, {} translucent)",
            counter.frustums,
            counter.shadow_passes,
            counter.total_draws(),
            counter.draws[Pass::Globe.index()],
            counter.draws[Pass::Tileset.index()],
            counter.draws[Pass::Translucent.index()],
        );
        log::info!("  {stats}");
    }

    println!("✅ Scheduled {FRAME_COUNT} frames");
    Ok(())
}
