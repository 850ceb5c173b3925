//! Per sub-frustum command buckets and the classifier that fills them

use crate::culling::{BoundingVolume, CullingVolume, DepthInterval, PlaneMask, MASK_OUTSIDE};
use crate::frustum::{Frustum, FrustumResult};
use crate::scheduler::camera::CameraState;
use crate::scheduler::command::{CommandFlags, CommandIndex, DrawCommand};
use crate::scheduler::partition::DepthRange;
use crate::scheduler::pass::{Pass, PASS_COUNT};

/// Index of the near plane in a frustum culling volume
pub const NEAR_PLANE_INDEX: usize = 4;

/// Index of the far plane in a frustum culling volume
pub const FAR_PLANE_INDEX: usize = 5;

/// Mask bits forcing a re-test of near and far
///
/// Sub-frustums share their side planes with the camera frustum, so a
/// command's camera mask is still valid for them; only near and far differ.
pub const NEAR_FAR_BITS: PlaneMask = (1 << NEAR_PLANE_INDEX) | (1 << FAR_PLANE_INDEX);

/// Commands scheduled into one sub-frustum
#[derive(Debug, Clone)]
pub struct FrustumCommands {
    range: DepthRange,
    opaque_near: f64,
    frustum: Option<Frustum>,
    buckets: [Vec<CommandIndex>; PASS_COUNT],
}

impl FrustumCommands {
    /// Create an empty sub-frustum schedule
    pub fn new() -> Self {
        Self {
            range: DepthRange::default(),
            opaque_near: 0.0,
            frustum: None,
            buckets: Default::default(),
        }
    }

    /// Prepare for a new frame as the `range` slice of the camera, keeping bucket capacity
    ///
    /// The slice frustum and its culling volume carry over from the last
    /// frame and are only rebuilt when the camera shape, eye or range moved.
    pub fn reset(&mut self, range: DepthRange, opaque_near: f64, camera: &CameraState) -> FrustumResult<()> {
        if let Some(frustum) = &mut self.frustum {
            frustum.set_slice_of(&camera.frustum, range.near, range.far)?;
        } else {
            self.frustum = Some(camera.frustum.with_near_far(range.near, range.far)?);
        }
        if let Some(frustum) = &mut self.frustum {
            frustum.culling_volume(&camera.position, &camera.direction, &camera.up);
        }

        self.range = range;
        self.opaque_near = opaque_near;
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        Ok(())
    }

    /// Exact depth range; used by translucent passes
    pub fn range(&self) -> DepthRange {
        self.range
    }

    /// Depth range with the seam-offset near plane; used by opaque passes
    pub fn opaque_range(&self) -> DepthRange {
        DepthRange::new(self.opaque_near, self.range.far)
    }

    /// Depth range a pass is drawn with
    pub fn range_for(&self, pass: Pass) -> DepthRange {
        if pass.is_translucent() {
            self.range()
        } else {
            self.opaque_range()
        }
    }

    /// Camera frustum restricted to this depth range
    pub fn frustum(&self) -> Option<&Frustum> {
        self.frustum.as_ref()
    }

    /// Culling volume of this sub-frustum; culls everything before the first reset
    pub fn culling_volume(&self) -> &CullingVolume {
        match &self.frustum {
            Some(frustum) => frustum.culling_volume_cache().volume(),
            None => CullingVolume::cull_everything(),
        }
    }

    /// Commands bucketed into `pass`, in scheduled order
    pub fn commands(&self, pass: Pass) -> &[CommandIndex] {
        &self.buckets[pass.index()]
    }

    pub(crate) fn commands_mut(&mut self, pass: Pass) -> &mut Vec<CommandIndex> {
        &mut self.buckets[pass.index()]
    }

    /// Append a command to the bucket of `pass`
    pub fn push(&mut self, pass: Pass, index: CommandIndex) {
        self.buckets[pass.index()].push(index);
    }

    /// Total commands across all buckets
    pub fn command_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Whether no command was scheduled here
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

impl Default for FrustumCommands {
    fn default() -> Self {
        Self::new()
    }
}

/// A command that survived camera culling and occlusion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Command position in the frame's input
    pub index: CommandIndex,
    /// Plane mask from the camera volume test; meaningful only for culled commands
    pub mask: PlaneMask,
    /// Depth extent along the view direction, when the command has bounds
    pub interval: Option<DepthInterval>,
    /// Whether the command is re-tested against sub-frustum planes
    pub culled: bool,
}

/// Bucket candidates into sub-frustums (`frustums` nearest first)
///
/// Culled commands are re-tested against each sub-frustum, starting from
/// their camera mask. Unculled commands go to every sub-frustum their depth
/// interval touches, or to all of them when they have no bounds. Returns the
/// number of bucket insertions.
pub fn classify_commands(frustums: &mut [FrustumCommands], commands: &[DrawCommand], candidates: &[Candidate]) -> usize {
    let mut inserted = 0;

    for candidate in candidates {
        let command = &commands[candidate.index];
        let closest_only = command.flags.contains(CommandFlags::EXECUTE_IN_CLOSEST_FRUSTUM);

        for frustum in frustums.iter_mut() {
            let accepted = match (candidate.culled, command.bounding_volume.as_ref()) {
                (true, Some(bounds)) => {
                    let mask = candidate.mask | NEAR_FAR_BITS;
                    frustum.culling_volume().compute_visibility_with_plane_mask(bounds, mask) != MASK_OUTSIDE
                }
                _ => {
                    let range = frustum.range();
                    candidate.interval.map_or(true, |interval| interval.overlaps(range.near, range.far))
                }
            };

            if accepted {
                log::trace!(
                    "Command {} ({}) -> sub-frustum [{}, {}]",
                    candidate.index, command.pass, frustum.range().near, frustum.range().far
                );
                frustum.push(command.pass, candidate.index);
                inserted += 1;
                if closest_only {
                    break;
                }
            }
        }
    }

    inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::{BoundingSphere, MASK_INDETERMINATE};
    use crate::foundation::math::Vec3;
    use crate::frustum::PerspectiveFrustum;
    use crate::scheduler::partition::partition_depth_range;

    struct Setup {
        frustums: Vec<FrustumCommands>,
        camera_volume: CullingVolume,
    }

    fn camera() -> CameraState {
        let frustum = PerspectiveFrustum::new(60f64.to_radians(), 1.0, 1.0, 1000.0).unwrap();
        CameraState::new(Vec3::zeros(), -Vec3::z(), Vec3::y(), frustum)
    }

    /// Camera at the origin looking down -Z, split at 10 and 100
    fn setup() -> Setup {
        let camera = camera();

        let frustums = partition_depth_range(1.0, 1000.0, 10.0)
            .unwrap()
            .into_iter()
            .map(|range| {
                let mut commands = FrustumCommands::new();
                commands.reset(range, range.near, &camera).unwrap();
                commands
            })
            .collect();

        let camera_volume = camera.frustum.compute_culling_volume(&camera.position, &camera.direction, &camera.up);
        Setup { frustums, camera_volume }
    }

    fn candidate_for(setup: &Setup, commands: &[DrawCommand], index: CommandIndex) -> Candidate {
        let command = &commands[index];
        let bounds = command.bounding_volume.as_ref();
        let culled = command.culling_bounds().is_some();
        Candidate {
            index,
            mask: bounds.map_or(MASK_INDETERMINATE, |b| {
                setup.camera_volume.compute_visibility_with_plane_mask(b, MASK_INDETERMINATE)
            }),
            interval: bounds.map(|b| b.compute_plane_distances(&Vec3::zeros(), &-Vec3::z())),
            culled,
        }
    }

    fn sphere_at_depth(depth: f64, radius: f64) -> BoundingSphere {
        BoundingSphere::new(Vec3::new(0.0, 0.0, -depth), radius)
    }

    fn bucket_sizes(frustums: &[FrustumCommands], pass: Pass) -> Vec<usize> {
        frustums.iter().map(|f| f.commands(pass).len()).collect()
    }

    #[test]
    fn test_culled_commands_land_in_overlapping_frustums() {
        let mut setup = setup();
        let commands = vec![
            DrawCommand::new(Pass::Opaque, 0).with_bounding_volume(sphere_at_depth(5.0, 1.0)),
            DrawCommand::new(Pass::Opaque, 1).with_bounding_volume(sphere_at_depth(100.0, 5.0)),
            DrawCommand::new(Pass::Globe, 2).with_bounding_volume(sphere_at_depth(500.0, 1.0)),
        ];
        let candidates: Vec<Candidate> = (0..commands.len()).map(|k| candidate_for(&setup, &commands, k)).collect();

        let inserted = classify_commands(&mut setup.frustums, &commands, &candidates);

        assert_eq!(inserted, 4);
        assert_eq!(bucket_sizes(&setup.frustums, Pass::Opaque), vec![1, 1, 1]);
        assert_eq!(bucket_sizes(&setup.frustums, Pass::Globe), vec![0, 0, 1]);
        assert_eq!(setup.frustums[2].commands(Pass::Opaque), &[1]);
    }

    #[test]
    fn test_closest_frustum_flag_stops_at_first_match() {
        let mut setup = setup();
        let commands = vec![DrawCommand::new(Pass::Opaque, 0)
            .with_bounding_volume(sphere_at_depth(100.0, 5.0))
            .with_added_flags(CommandFlags::EXECUTE_IN_CLOSEST_FRUSTUM)];
        let candidates = vec![candidate_for(&setup, &commands, 0)];

        classify_commands(&mut setup.frustums, &commands, &candidates);
        assert_eq!(bucket_sizes(&setup.frustums, Pass::Opaque), vec![0, 1, 0]);
    }

    #[test]
    fn test_unculled_commands_bin_by_interval() {
        let mut setup = setup();
        let commands = vec![
            DrawCommand::new(Pass::Translucent, 0)
                .with_bounding_volume(sphere_at_depth(50.0, 1.0))
                .with_flags(CommandFlags::empty()),
            DrawCommand::new(Pass::Translucent, 1).with_flags(CommandFlags::empty()),
        ];
        let candidates: Vec<Candidate> = (0..commands.len()).map(|k| candidate_for(&setup, &commands, k)).collect();

        classify_commands(&mut setup.frustums, &commands, &candidates);

        assert_eq!(setup.frustums[0].commands(Pass::Translucent), &[1]);
        assert_eq!(setup.frustums[1].commands(Pass::Translucent), &[0, 1]);
        assert_eq!(setup.frustums[2].commands(Pass::Translucent), &[1]);
    }

    #[test]
    fn test_opaque_range_uses_seam_offset() {
        let mut commands = FrustumCommands::new();
        commands.reset(DepthRange::new(10.0, 100.0), 9.999, &camera()).unwrap();

        assert_eq!(commands.range_for(Pass::Opaque), DepthRange::new(9.999, 100.0));
        assert_eq!(commands.range_for(Pass::Globe), DepthRange::new(9.999, 100.0));
        assert_eq!(commands.range_for(Pass::Translucent), DepthRange::new(10.0, 100.0));
    }

    #[test]
    fn test_reset_reuses_slice_until_camera_moves() {
        let mut camera = camera();
        let range = DepthRange::new(10.0, 100.0);
        let mut commands = FrustumCommands::new();
        assert!(commands.culling_volume().is_degenerate());

        commands.reset(range, range.near, &camera).unwrap();
        let frustum = commands.frustum().unwrap();
        let (revision, volume_revision) = (frustum.revision(), frustum.culling_volume_cache().revision());
        assert!(!commands.culling_volume().is_degenerate());

        commands.push(Pass::Opaque, 3);
        commands.reset(range, range.near, &camera).unwrap();
        let frustum = commands.frustum().unwrap();
        assert_eq!(frustum.revision(), revision);
        assert_eq!(frustum.culling_volume_cache().revision(), volume_revision);
        assert!(commands.is_empty());

        camera.position = Vec3::new(0.0, 0.0, 5.0);
        commands.reset(range, range.near, &camera).unwrap();
        let frustum = commands.frustum().unwrap();
        assert_eq!(frustum.revision(), revision);
        assert_eq!(frustum.culling_volume_cache().revision(), volume_revision + 1);
        assert_eq!(
            commands.culling_volume(),
            &camera.frustum.with_near_far(10.0, 100.0).unwrap().compute_culling_volume(
                &camera.position,
                &camera.direction,
                &camera.up
            )
        );
    }
}

