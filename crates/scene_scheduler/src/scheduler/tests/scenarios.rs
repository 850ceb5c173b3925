//! Frame scheduling scenarios

use super::*;
use crate::core::{DepthMode, SceneMode, SchedulerConfig};
use crate::culling::{AxisAlignedBox, OccluderParameters};
use crate::frustum::OrthographicFrustum;
use crate::scheduler::{
    CommandFlags, FrameScheduler, SchedulerError, ShadowMapDescriptor, SortContext,
};
use approx::assert_relative_eq;

fn scheduler(config: SchedulerConfig) -> FrameScheduler {
    FrameScheduler::new(config).unwrap()
}

fn ranges(scheduler: &FrameScheduler) -> Vec<DepthRange> {
    scheduler.schedule().frustums().iter().map(FrustumCommands::range).collect()
}

#[test]
fn test_decade_ratio_gives_three_sub_frustums() {
    let config = SchedulerConfig::default().with_far_to_near_ratio(10.0).with_depth_range_fitting(false);
    let mut scheduler = scheduler(config);
    let commands = vec![at_depth(Pass::Opaque, 50.0, 1.0)];

    scheduler.schedule_frame(&camera(1.0, 1000.0), &commands, &[], SortContext::Render).unwrap();

    assert_eq!(
        ranges(&scheduler),
        vec![DepthRange::new(1.0, 10.0), DepthRange::new(10.0, 100.0), DepthRange::new(100.0, 1000.0)]
    );
    assert_eq!(scheduler.schedule().frustums()[1].commands(Pass::Opaque), &[0]);
}

#[test]
fn test_depth_range_fits_visible_content() {
    let mut scheduler = scheduler(SchedulerConfig::default());
    let commands = vec![
        at_depth(Pass::Opaque, 55.0, 5.0),
        at_depth(Pass::Globe, 52.0, 1.0),
        // Behind the camera: culled, so it must not widen the range
        DrawCommand::new(Pass::Opaque, 9).with_bounding_volume(BoundingSphere::new(Vec3::new(0.0, 0.0, 500.0), 1.0)),
    ];

    let schedule = scheduler.schedule_frame(&camera(1.0, 1.0e4), &commands, &[], SortContext::Render).unwrap();

    assert_eq!(schedule.depth_range(), DepthRange::new(50.0, 60.0));
    assert_eq!(schedule.frustums().len(), 1);
    assert_eq!(schedule.statistics().plane_culled, 1);
    assert_eq!(schedule.statistics().candidates, 3);
}

#[test]
fn test_unbounded_command_forces_full_range() {
    let mut scheduler = scheduler(SchedulerConfig::default());
    let commands = vec![
        at_depth(Pass::Opaque, 55.0, 5.0),
        DrawCommand::new(Pass::Translucent, 1).with_flags(CommandFlags::empty()),
    ];

    let schedule = scheduler.schedule_frame(&camera(1.0, 1.0e4), &commands, &[], SortContext::Render).unwrap();

    assert_eq!(schedule.depth_range(), DepthRange::new(1.0, 1.0e4));
    assert_eq!(schedule.frustums().len(), 2);
    // Unbounded commands land in every sub-frustum
    assert_eq!(schedule.statistics().commands_in(Pass::Translucent), 2);
}

#[test]
fn test_seam_offset_applies_to_opaque_near_only() {
    let config = SchedulerConfig::default().with_far_to_near_ratio(10.0).with_depth_range_fitting(false);
    let mut scheduler = scheduler(config);

    let schedule = scheduler.schedule_frame(&camera(1.0, 1000.0), &[], &[], SortContext::Render).unwrap();
    let frustums = schedule.frustums();

    assert_eq!(frustums[0].opaque_range().near, 1.0);
    assert_relative_eq!(frustums[1].opaque_range().near, 10.0 * 0.9999);
    assert_relative_eq!(frustums[2].opaque_range().near, 100.0 * 0.9999);
    assert_eq!(frustums[2].range().near, 100.0);
}

#[test]
fn test_logarithmic_depth_uses_single_frustum() {
    let mut scheduler = scheduler(SchedulerConfig::default().with_depth_range_fitting(false));
    let camera = camera(1.0, 1.0e8);

    scheduler.schedule_frame(&camera, &[], &[], SortContext::Render).unwrap();
    assert_eq!(scheduler.schedule().frustums().len(), 3);

    scheduler.set_depth_mode(DepthMode::Logarithmic);
    scheduler.schedule_frame(&camera, &[], &[], SortContext::Render).unwrap();
    assert_eq!(scheduler.schedule().frustums().len(), 1);
}

#[test]
fn test_scene_2d_uses_fixed_depth_slices() {
    let config = SchedulerConfig::default()
        .with_scene_mode(SceneMode::Scene2D)
        .with_depth_range_fitting(false);
    let mut scheduler = scheduler(config);
    let frustum = OrthographicFrustum::new(1.0e6, 1.0, 0.0, 4.0e6).unwrap();
    let camera = CameraState::new(Vec3::new(0.0, 0.0, 4.0e6), -Vec3::z(), Vec3::y(), frustum);

    scheduler.schedule_frame(&camera, &[], &[], SortContext::Render).unwrap();

    let ranges = ranges(&scheduler);
    assert_eq!(ranges.len(), 3);
    assert_relative_eq!(ranges[1].near, 1.75e6);
}

#[test]
fn test_flat_content_facing_the_camera_is_scheduled() {
    let mut scheduler = scheduler(SchedulerConfig::default());
    let tile = AxisAlignedBox::new(Vec3::new(-1.0, -1.0, -50.0), Vec3::new(1.0, 1.0, -50.0));
    let commands = vec![DrawCommand::new(Pass::Globe, 0).with_bounding_volume(tile)];

    let schedule = scheduler.schedule_frame(&camera(1.0, 1000.0), &commands, &[], SortContext::Render).unwrap();

    let range = schedule.depth_range();
    assert!(range.near < 50.0 && range.far > 50.0);
    assert_eq!(schedule.frustums().len(), 1);
    assert_eq!(schedule.frustums()[0].commands(Pass::Globe), &[0]);
    assert_eq!(schedule.statistics().plane_culled, 0);
}

#[test]
fn test_flat_map_tile_is_scheduled_in_2d() {
    let mut scheduler = scheduler(SchedulerConfig::default().with_scene_mode(SceneMode::Scene2D));
    let frustum = OrthographicFrustum::new(1000.0, 1.0, 0.0, 1.0e4).unwrap();
    let camera = CameraState::new(Vec3::new(0.0, 0.0, 100.0), -Vec3::z(), Vec3::y(), frustum);
    let tile = AxisAlignedBox::new(Vec3::new(-100.0, -100.0, 0.0), Vec3::new(100.0, 100.0, 0.0));
    let commands = vec![DrawCommand::new(Pass::Globe, 0).with_bounding_volume(tile)];

    let schedule = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();

    let range = schedule.depth_range();
    assert!(range.near < 100.0 && range.far > 100.0);
    assert_eq!(schedule.statistics().commands_in(Pass::Globe), 1);
}

#[test]
fn test_unchanged_camera_reuses_sub_frustums() {
    let config = SchedulerConfig::default().with_far_to_near_ratio(10.0).with_depth_range_fitting(false);
    let mut scheduler = scheduler(config);
    let mut camera = camera(1.0, 1000.0);
    let commands = vec![at_depth(Pass::Opaque, 50.0, 1.0)];

    let revisions = |scheduler: &FrameScheduler| -> Vec<(u64, u64)> {
        scheduler
            .schedule()
            .frustums()
            .iter()
            .filter_map(FrustumCommands::frustum)
            .map(|f| (f.revision(), f.culling_volume_cache().revision()))
            .collect()
    };

    scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();
    let first = revisions(&scheduler);
    assert_eq!(first.len(), 3);

    scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();
    assert_eq!(revisions(&scheduler), first);

    // Moving the eye rebuilds volumes but keeps every projection
    camera.position = Vec3::new(0.0, 0.0, -1.0);
    scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();
    let moved = revisions(&scheduler);
    for ((revision, volume), (moved_revision, moved_volume)) in first.iter().zip(&moved) {
        assert_eq!(moved_revision, revision);
        assert_eq!(*moved_volume, volume + 1);
    }
    assert_eq!(scheduler.schedule().frustums()[1].commands(Pass::Opaque), &[0]);
}

#[test]
fn test_degenerate_camera_schedules_nothing() {
    let mut scheduler = scheduler(SchedulerConfig::default());
    let mut camera = camera(1.0, 1000.0);
    camera.direction = Vec3::zeros();
    let commands = vec![
        at_depth(Pass::Opaque, 50.0, 1.0),
        DrawCommand::new(Pass::Overlay, 1).with_flags(CommandFlags::empty()),
    ];

    let schedule = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();

    assert!(schedule.is_empty());
    assert_eq!(schedule.statistics().total_commands(), 0);
}

#[test]
fn test_horizon_hides_far_side_of_globe() {
    let mut scheduler = scheduler(SchedulerConfig::default());
    let radius = 6.0e6;
    let frustum = PerspectiveFrustum::new(60f64.to_radians(), 1.0, 1.0, 1.0e8).unwrap();
    let camera = CameraState::look_at(Vec3::new(0.0, 0.0, 3.0 * radius), Vec3::zeros(), Vec3::y(), frustum)
        .with_occluder(OccluderParameters { center: Vec3::zeros(), minimum_radius: radius, minimum_surface_height: 0.0 });

    let near_side = Vec3::new(0.0, 0.0, radius);
    let far_side = Vec3::new(0.0, 0.0, -radius);
    let commands = vec![
        DrawCommand::new(Pass::Globe, 0).with_bounding_volume(BoundingSphere::new(near_side, 1000.0)),
        DrawCommand::new(Pass::Globe, 1).with_bounding_volume(BoundingSphere::new(far_side, 1000.0)),
        // Same position, but opted out of horizon culling
        DrawCommand::new(Pass::Globe, 2)
            .with_bounding_volume(BoundingSphere::new(far_side, 1000.0))
            .with_flags(CommandFlags::CULL),
    ];

    let schedule = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();

    assert_eq!(schedule.statistics().occluded, 1);
    let scheduled: Vec<CommandIndex> = schedule
        .frustums()
        .iter()
        .flat_map(|frustum| frustum.commands(Pass::Globe).iter().copied())
        .collect();
    assert!(scheduled.contains(&0));
    assert!(!scheduled.contains(&1));
    assert!(scheduled.contains(&2));
}

#[test]
fn test_occlusion_is_skipped_inside_the_body() {
    let mut scheduler = scheduler(SchedulerConfig::default());
    let camera = camera(1.0, 1.0e4).with_occluder(OccluderParameters {
        center: Vec3::zeros(),
        minimum_radius: 100.0,
        minimum_surface_height: 0.0,
    });
    let commands = vec![at_depth(Pass::Opaque, 500.0, 1.0)];

    let schedule = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();
    assert_eq!(schedule.statistics().occluded, 0);
    assert_eq!(schedule.statistics().commands_in(Pass::Opaque), 1);
}

#[test]
fn test_translucent_order_depends_on_context() {
    let mut scheduler = scheduler(SchedulerConfig::default().with_depth_range_fitting(false));
    let camera = camera(1.0, 1000.0);
    let commands = vec![
        at_depth(Pass::Translucent, 5.0, 0.5),
        at_depth(Pass::Translucent, 50.0, 0.5),
        at_depth(Pass::Translucent, 1.5, 0.4),
    ];

    let schedule = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();
    assert_eq!(schedule.frustums()[0].commands(Pass::Translucent), &[1, 0, 2]);

    scheduler.set_oit_enabled(true);
    let schedule = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap();
    assert_eq!(schedule.frustums()[0].commands(Pass::Translucent), &[0, 1, 2]);

    let schedule = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Pick).unwrap();
    assert_eq!(schedule.frustums()[0].commands(Pass::Translucent), &[2, 0, 1]);
}

#[test]
fn test_storage_is_reused_without_accumulating() {
    let mut scheduler = scheduler(SchedulerConfig::default());
    let camera = camera(1.0, 1.0e4);
    let commands = vec![at_depth(Pass::Opaque, 10.0, 1.0), at_depth(Pass::Opaque, 5000.0, 1.0)];

    let first = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap().statistics().clone();
    let second = scheduler.schedule_frame(&camera, &commands, &[], SortContext::Render).unwrap().statistics().clone();

    assert_eq!(first.frame_number + 1, second.frame_number);
    assert_eq!(first.per_pass, second.per_pass);
    assert_eq!(second.commands_in(Pass::Opaque), 2);

    let third = scheduler.schedule_frame(&camera, &commands[..1], &[], SortContext::Render).unwrap();
    assert_eq!(third.frustums().len(), 1);
    assert_eq!(third.statistics().commands_in(Pass::Opaque), 1);
}

#[test]
fn test_shadows_follow_context() {
    let mut scheduler = scheduler(SchedulerConfig::default());
    let camera = camera(1.0, 1.0e4);
    let commands = vec![at_depth(Pass::Opaque, 20.0, 1.0).with_added_flags(CommandFlags::CAST_SHADOWS)];
    let maps = [scheduler.directional_shadow_map(Vec3::new(0.2, -1.0, 0.1))];

    let schedule = scheduler.schedule_frame(&camera, &commands, &maps, SortContext::Render).unwrap();
    assert_eq!(schedule.shadow_passes().len(), 4);
    assert_eq!(schedule.statistics().shadow_casters, 1);

    let schedule = scheduler.schedule_frame(&camera, &commands, &maps, SortContext::Pick).unwrap();
    assert!(schedule.shadow_passes().is_empty());
}

#[test]
fn test_invalid_shadow_map_fails_the_frame() {
    let mut scheduler = scheduler(SchedulerConfig::default());
    let commands = vec![at_depth(Pass::Opaque, 20.0, 1.0)];
    let maps = [ShadowMapDescriptor::point(Vec3::zeros(), -1.0)];

    let result = scheduler.schedule_frame(&camera(1.0, 100.0), &commands, &maps, SortContext::Render);
    assert!(matches!(result, Err(SchedulerError::InvalidShadowMap { map: 0, .. })));
    assert!(scheduler.schedule().frustums().is_empty());
}

#[test]
fn test_configuration_is_validated_eagerly() {
    assert!(matches!(
        FrameScheduler::new(SchedulerConfig::default().with_shadow_cascade_count(0)),
        Err(SchedulerError::Config(_))
    ));

    let mut scheduler = scheduler(SchedulerConfig::default());
    assert!(scheduler.set_far_to_near_ratio(0.5).is_err());
    assert_eq!(scheduler.config().far_to_near_ratio, 1000.0);

    scheduler.set_far_to_near_ratio(50.0).unwrap();
    assert_eq!(scheduler.config().far_to_near_ratio, 50.0);
}
