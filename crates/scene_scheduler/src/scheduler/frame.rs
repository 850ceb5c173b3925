//! # Frame Scheduler
//!
//! Turns a camera and a flat list of draw commands into a [`FrameSchedule`]:
//!
//! 1. Once-per-frame passes (compute, environment, overlay) are set aside.
//! 2. Every other command is tested against the camera volume, then against
//!    the horizon occluder.
//! 3. The depth range is shrunk to the surviving content and partitioned.
//! 4. Survivors are bucketed per sub-frustum and pass.
//! 5. Translucent buckets are sorted and shadow casters assigned.
//!
//! All per-frame storage lives in the scheduler and is cleared, not freed,
//! between frames.

use std::fmt;

use crate::core::config::{Config, DepthMode, SceneMode, SchedulerConfig};
use crate::culling::{BoundingVolume, CullingVolume, MASK_INDETERMINATE, MASK_OUTSIDE};
use crate::foundation::math::Vec3;
use crate::frustum::{Frustum, ViewBasis};
use crate::scheduler::camera::CameraState;
use crate::scheduler::command::{CommandFlags, CommandIndex, DrawCommand};
use crate::scheduler::error::SchedulerResult;
use crate::scheduler::frustum_commands::{classify_commands, Candidate, FrustumCommands};
use crate::scheduler::partition::{
    partition_depth_range_into, partition_fixed_distance_into, DepthRange, FrustumSplitList,
};
use crate::scheduler::pass::{Pass, PASS_COUNT};
use crate::scheduler::shadows::{assign_shadow_casters, ShadowMapDescriptor, ShadowPass, ShadowPassList};
use crate::scheduler::translucency::{SortContext, TranslucencySorter};

/// Counters for one scheduled frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStatistics {
    /// Frame number, starting at 1
    pub frame_number: u64,
    /// Commands considered for per-frustum passes
    pub candidates: usize,
    /// Commands outside the camera volume
    pub plane_culled: usize,
    /// Commands behind the horizon
    pub occluded: usize,
    /// Scheduled commands per pass, counting each sub-frustum a command lands in
    pub per_pass: [usize; PASS_COUNT],
    /// Number of sub-frustums
    pub frustum_count: usize,
    /// Number of shadow passes
    pub shadow_passes: usize,
    /// Caster assignments, counted once per shadow map
    pub shadow_casters: usize,
    /// Camera depth range after fitting to content
    pub depth_range: DepthRange,
}

impl FrameStatistics {
    /// Scheduled commands in `pass`
    pub fn commands_in(&self, pass: Pass) -> usize {
        self.per_pass[pass.index()]
    }

    /// Scheduled commands across all passes
    pub fn total_commands(&self) -> usize {
        self.per_pass.iter().sum()
    }
}

impl fmt::Display for FrameStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {}: {} candidates, {} culled, {} occluded, {} scheduled in {} frustums over [{:.3}, {:.3}], \
             {} shadow passes with {} casters",
            self.frame_number,
            self.candidates,
            self.plane_culled,
            self.occluded,
            self.total_commands(),
            self.frustum_count,
            self.depth_range.near,
            self.depth_range.far,
            self.shadow_passes,
            self.shadow_casters
        )
    }
}

/// Scheduled work for one frame
#[derive(Debug)]
pub struct FrameSchedule {
    context: SortContext,
    camera_position: Vec3,
    depth_range: DepthRange,
    compute: Vec<CommandIndex>,
    environment: Vec<CommandIndex>,
    overlay: Vec<CommandIndex>,
    frustums: Vec<FrustumCommands>,
    active_frustums: usize,
    shadow_passes: ShadowPassList,
    statistics: FrameStatistics,
}

impl FrameSchedule {
    fn new() -> Self {
        Self {
            context: SortContext::default(),
            camera_position: Vec3::zeros(),
            depth_range: DepthRange::default(),
            compute: Vec::new(),
            environment: Vec::new(),
            overlay: Vec::new(),
            frustums: Vec::new(),
            active_frustums: 0,
            shadow_passes: ShadowPassList::new(),
            statistics: FrameStatistics::default(),
        }
    }

    fn reset(&mut self, frame_number: u64, context: SortContext, camera: &CameraState) {
        self.context = context;
        self.camera_position = camera.position;
        self.depth_range = DepthRange::new(camera.frustum.near(), camera.frustum.far());
        self.compute.clear();
        self.environment.clear();
        self.overlay.clear();
        self.active_frustums = 0;
        self.shadow_passes.clear();
        self.statistics = FrameStatistics { frame_number, ..FrameStatistics::default() };
    }

    /// Context the frame was scheduled for
    pub fn context(&self) -> SortContext {
        self.context
    }

    /// Camera position the frame was scheduled from
    pub fn camera_position(&self) -> &Vec3 {
        &self.camera_position
    }

    /// Camera depth range after fitting to content
    pub fn depth_range(&self) -> DepthRange {
        self.depth_range
    }

    /// Commands of an unculled pass (compute, environment, overlay)
    ///
    /// Empty for per-frustum passes; see [`FrameSchedule::frustums`].
    pub fn once_per_frame(&self, pass: Pass) -> &[CommandIndex] {
        match pass {
            Pass::Compute => &self.compute,
            Pass::Environment => &self.environment,
            Pass::Overlay => &self.overlay,
            _ => &[],
        }
    }

    /// Sub-frustums, nearest first; execution runs this list in reverse
    pub fn frustums(&self) -> &[FrustumCommands] {
        &self.frustums[..self.active_frustums]
    }

    /// Shadow passes in execution order
    pub fn shadow_passes(&self) -> &[ShadowPass] {
        self.shadow_passes.as_slice()
    }

    /// Counters for this frame
    pub fn statistics(&self) -> &FrameStatistics {
        &self.statistics
    }

    /// Whether nothing at all will be drawn
    pub fn is_empty(&self) -> bool {
        self.active_frustums == 0
            && self.compute.is_empty()
            && self.environment.is_empty()
            && self.overlay.is_empty()
            && self.shadow_passes.is_empty()
    }

    fn activate_frustums(&mut self, count: usize) -> &mut [FrustumCommands] {
        if self.frustums.len() < count {
            self.frustums.resize_with(count, FrustumCommands::new);
        }
        self.active_frustums = count;
        &mut self.frustums[..count]
    }

    fn count_passes(&mut self) {
        let mut per_pass = [0; PASS_COUNT];
        for pass in [Pass::Compute, Pass::Environment, Pass::Overlay] {
            per_pass[pass.index()] = self.once_per_frame(pass).len();
        }
        for frustum in self.frustums() {
            for pass in Pass::FRUSTUM_PASSES {
                per_pass[pass.index()] += frustum.commands(pass).len();
            }
        }

        self.statistics.per_pass = per_pass;
        self.statistics.frustum_count = self.active_frustums;
        self.statistics.shadow_passes = self.shadow_passes.len();
        self.statistics.depth_range = self.depth_range;
    }
}

/// Smallest fitted depth range, relative to its near distance
const MIN_FITTED_DEPTH_FRACTION: f64 = 1.0e-6;

/// Smallest fitted depth range in world units, for content at the eye
const MIN_FITTED_DEPTH: f64 = 1.0e-6;

/// Per-frame visibility and pass scheduling
///
/// # Example
/// ```
/// use scene_scheduler::prelude::*;
///
/// let frustum = PerspectiveFrustum::new(60f64.to_radians(), 1.0, 1.0, 1000.0).unwrap();
/// let camera = CameraState::new(Vec3::zeros(), -Vec3::z(), Vec3::y(), frustum);
/// let commands = vec![DrawCommand::new(Pass::Opaque, 1)
///     .with_bounding_volume(BoundingSphere::new(Vec3::new(0.0, 0.0, -50.0), 1.0))];
///
/// let mut scheduler = FrameScheduler::new(SchedulerConfig::default()).unwrap();
/// let schedule = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();
/// assert_eq!(schedule.statistics().commands_in(Pass::Opaque), 1);
/// ```
#[derive(Debug)]
pub struct FrameScheduler {
    config: SchedulerConfig,
    frame_number: u64,
    schedule: FrameSchedule,
    view_frustum: Option<Frustum>,
    candidates: Vec<Candidate>,
    splits: FrustumSplitList,
    sorter: TranslucencySorter,
}

impl FrameScheduler {
    /// Create a scheduler; the configuration is validated first
    pub fn new(config: SchedulerConfig) -> SchedulerResult<Self> {
        config.validate()?;
        log::info!(
            "Frame scheduler created: {:?} depth, ratio {}, {} shadow cascades",
            config.depth_mode,
            config.effective_far_to_near_ratio(),
            config.shadow_cascade_count
        );

        Ok(Self {
            config,
            frame_number: 0,
            schedule: FrameSchedule::new(),
            view_frustum: None,
            candidates: Vec::new(),
            splits: Vec::new(),
            sorter: TranslucencySorter::new(),
        })
    }

    /// Load the configuration from a `.toml` or `.ron` file
    pub fn from_config_file(path: &str) -> SchedulerResult<Self> {
        Self::new(SchedulerConfig::load_from_file(path)?)
    }

    /// Current configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Replace the configuration; rejected values leave the current one in place
    pub fn set_config(&mut self, config: SchedulerConfig) -> SchedulerResult<()> {
        config.validate()?;
        if config != self.config {
            log::info!("Scheduler configuration updated: {config:?}");
            self.config = config;
        }
        Ok(())
    }

    /// Select the depth buffer encoding, which picks the far/near ratio
    pub fn set_depth_mode(&mut self, depth_mode: DepthMode) {
        if depth_mode != self.config.depth_mode {
            log::info!("Depth mode set to {depth_mode:?}");
            self.config.depth_mode = depth_mode;
        }
    }

    /// Select the scene projection mode
    pub fn set_scene_mode(&mut self, scene_mode: SceneMode) {
        if scene_mode != self.config.scene_mode {
            log::info!("Scene mode set to {scene_mode:?}");
            self.config.scene_mode = scene_mode;
        }
    }

    /// Set the linear-depth far/near ratio; must be greater than one
    pub fn set_far_to_near_ratio(&mut self, ratio: f64) -> SchedulerResult<()> {
        let config = self.config.clone().with_far_to_near_ratio(ratio);
        self.set_config(config)
    }

    /// Enable or disable order-independent transparency
    pub fn set_oit_enabled(&mut self, enabled: bool) {
        if enabled != self.config.oit_enabled {
            log::info!("Order-independent transparency {}", if enabled { "enabled" } else { "disabled" });
            self.config.oit_enabled = enabled;
        }
    }

    /// Directional shadow map using the configured cascade count
    pub fn directional_shadow_map(&self, direction: Vec3) -> ShadowMapDescriptor {
        ShadowMapDescriptor::directional(direction, self.config.shadow_cascade_count)
    }

    /// Frames scheduled so far
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Most recent schedule
    pub fn schedule(&self) -> &FrameSchedule {
        &self.schedule
    }

    /// Schedule one frame
    ///
    /// Shadow maps are only rendered for [`SortContext::Render`]. On error the
    /// returned schedule would be incomplete, so the stored one is left empty.
    pub fn schedule_frame(
        &mut self,
        camera: &CameraState,
        commands: &[DrawCommand],
        shadow_maps: &[ShadowMapDescriptor],
        context: SortContext,
    ) -> SchedulerResult<&FrameSchedule> {
        self.frame_number += 1;
        self.schedule.reset(self.frame_number, context, camera);

        if let Err(error) = self.fill_schedule(camera, commands, shadow_maps, context) {
            log::warn!("Frame {} could not be scheduled: {error}", self.frame_number);
            self.schedule.reset(self.frame_number, context, camera);
            return Err(error);
        }

        self.schedule.count_passes();
        log::debug!("{}", self.schedule.statistics);
        Ok(&self.schedule)
    }

    fn fill_schedule(
        &mut self,
        camera: &CameraState,
        commands: &[DrawCommand],
        shadow_maps: &[ShadowMapDescriptor],
        context: SortContext,
    ) -> SchedulerResult<()> {
        for (map, descriptor) in shadow_maps.iter().enumerate() {
            descriptor.validate(map)?;
        }

        let Some(basis) = ViewBasis::new(&camera.position, &camera.direction, &camera.up) else {
            return Ok(());
        };

        let view = self.view_frustum.get_or_insert_with(|| camera.frustum.clone());
        view.set_slice_of(&camera.frustum, camera.frustum.near(), camera.frustum.far())?;
        let volume = view.culling_volume(&camera.position, &camera.direction, &camera.up);
        if volume.is_degenerate() {
            log::debug!("Frame {}: degenerate camera volume, nothing scheduled", self.frame_number);
            return Ok(());
        }

        let range = collect_candidates(&self.config, &mut self.schedule, &mut self.candidates, camera, &basis, volume, commands);
        self.schedule.depth_range = range;

        let splits = &mut self.splits;
        if self.config.scene_mode == SceneMode::Scene2D || camera.frustum.is_orthographic() {
            partition_fixed_distance_into(range.near, range.far, self.config.near_to_far_distance_2d, splits)?;
        } else {
            partition_depth_range_into(range.near, range.far, self.config.effective_far_to_near_ratio(), splits)?;
        }

        let seam_offset = self.config.opaque_frustum_near_offset;
        let frustums = self.schedule.activate_frustums(self.splits.len());
        for (k, (split, frustum_commands)) in self.splits.iter().zip(frustums.iter_mut()).enumerate() {
            let opaque_near = if k == 0 { split.near } else { split.near * seam_offset };
            frustum_commands.reset(*split, opaque_near, camera)?;
        }

        classify_commands(frustums, commands, &self.candidates);

        for frustum_commands in frustums.iter_mut() {
            self.sorter.sort(
                frustum_commands.commands_mut(Pass::Translucent),
                commands,
                &camera.position,
                context,
                self.config.oit_enabled,
            );
        }

        if context == SortContext::Render && !shadow_maps.is_empty() {
            self.schedule.statistics.shadow_casters = assign_shadow_casters(
                &mut self.schedule.shadow_passes,
                shadow_maps,
                camera,
                range,
                commands,
                &self.config,
            )?;
        }

        Ok(())
    }
}

/// Camera-cull and occlude commands; returns the depth range to partition
fn collect_candidates(
    config: &SchedulerConfig,
    schedule: &mut FrameSchedule,
    candidates: &mut Vec<Candidate>,
    camera: &CameraState,
    basis: &ViewBasis,
    volume: &CullingVolume,
    commands: &[DrawCommand],
) -> DepthRange {
    let occluder = match config.scene_mode {
        SceneMode::Scene3D => camera.horizon_occluder(),
        SceneMode::Scene2D => None,
    };
    let statistics = &mut schedule.statistics;
    candidates.clear();

    let mut near = f64::INFINITY;
    let mut far = f64::NEG_INFINITY;
    let mut full_range = !config.fit_depth_range_to_content;

    for (index, command) in commands.iter().enumerate() {
        match command.pass {
            Pass::Compute => schedule.compute.push(index),
            Pass::Environment => schedule.environment.push(index),
            Pass::Overlay => schedule.overlay.push(index),
            _ => {}
        }
        if !command.pass.is_per_frustum() {
            continue;
        }
        statistics.candidates += 1;

        let Some(bounds) = command.culling_bounds() else {
            full_range = true;
            candidates.push(Candidate {
                index,
                mask: MASK_INDETERMINATE,
                interval: command
                    .bounding_volume
                    .as_ref()
                    .map(|b| b.compute_plane_distances(&basis.position, &basis.direction)),
                culled: false,
            });
            continue;
        };

        let mask = volume.compute_visibility_with_plane_mask(bounds, MASK_INDETERMINATE);
        if mask == MASK_OUTSIDE {
            log::trace!("Command {index} ({}) outside the camera volume", command.pass);
            statistics.plane_culled += 1;
            continue;
        }
        if command.flags.contains(CommandFlags::OCCLUDE)
            && occluder.as_ref().is_some_and(|occluder| bounds.is_occluded_by(occluder))
        {
            log::trace!("Command {index} ({}) below the horizon", command.pass);
            statistics.occluded += 1;
            continue;
        }

        let interval = bounds.compute_plane_distances(&basis.position, &basis.direction);
        near = near.min(interval.start);
        far = far.max(interval.stop);
        candidates.push(Candidate { index, mask, interval: Some(interval), culled: true });
    }

    let camera_near = camera.frustum.near();
    let camera_far = camera.frustum.far();
    if full_range || candidates.is_empty() {
        return DepthRange::new(camera_near, camera_far);
    }

    let near = near.max(camera_near);
    let far = far.min(camera_far).max(near);
    if far - near > 0.0 {
        return DepthRange::new(near, far);
    }

    // Flat content facing the camera has no depth; a zero-width slice would cull it
    let pad = (near * MIN_FITTED_DEPTH_FRACTION).max(MIN_FITTED_DEPTH);
    let padded = DepthRange::new((near - pad).max(camera_near), (far + pad).min(camera_far));
    if padded.far > padded.near {
        padded
    } else {
        DepthRange::new(camera_near, camera_far)
    }
}
