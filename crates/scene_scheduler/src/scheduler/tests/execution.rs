//! Walking schedules into an executor

use super::*;
use crate::core::SchedulerConfig;
use crate::scheduler::{CommandFlags, FrameScheduler, ShadowMapDescriptor, SortContext};

fn scheduled(commands: &[DrawCommand], config: SchedulerConfig) -> Vec<Event> {
    let mut scheduler = FrameScheduler::new(config).unwrap();
    let schedule = scheduler.schedule_frame(&camera(1.0, 1000.0), commands, &[], SortContext::Render).unwrap();

    let mut executor = RecordingExecutor::default();
    schedule.execute(commands, &mut executor).unwrap();
    executor.events
}

#[test]
fn test_sub_frustums_run_far_to_near_with_clear_first() {
    let config = SchedulerConfig::default().with_far_to_near_ratio(10.0).with_depth_range_fitting(false);
    let commands = vec![at_depth(Pass::Opaque, 5.0, 1.0), at_depth(Pass::Opaque, 500.0, 1.0)];

    let events = scheduled(&commands, config);

    let begins: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            Event::BeginFrustum(index) => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(begins, vec![2, 1, 0]);

    for (position, event) in events.iter().enumerate() {
        if matches!(event, Event::BeginFrustum(_)) {
            assert_eq!(events[position + 1], Event::Clear(ClearCommand::DEPTH_STENCIL));
        }
    }

    let opaque: Vec<&Vec<CommandIndex>> = events
        .iter()
        .filter_map(|event| match event {
            Event::Pass(Pass::Opaque, _, indices) => Some(indices),
            _ => None,
        })
        .collect();
    assert_eq!(opaque, vec![&vec![1], &vec![0]]);
}

#[test]
fn test_clear_resets_depth_and_stencil() {
    let clear = ClearCommand::DEPTH_STENCIL;
    assert_eq!(clear.depth, 1.0);
    assert_eq!(clear.stencil, 0);
    assert!(!clear.flags.contains(crate::scheduler::ClearFlags::COLOR));
}

#[test]
fn test_once_per_frame_passes_bracket_the_frustums() {
    let unculled = CommandFlags::empty();
    let commands = vec![
        DrawCommand::new(Pass::Overlay, 0).with_flags(unculled),
        at_depth(Pass::Translucent, 20.0, 1.0),
        DrawCommand::new(Pass::Environment, 2).with_flags(unculled),
        at_depth(Pass::Globe, 30.0, 1.0),
        DrawCommand::new(Pass::Compute, 4).with_flags(unculled),
    ];

    let events = scheduled(&commands, SchedulerConfig::default());
    let passes: Vec<Pass> = events
        .iter()
        .filter_map(|event| match event {
            Event::Pass(pass, _, _) => Some(*pass),
            _ => None,
        })
        .collect();

    assert_eq!(passes, vec![Pass::Compute, Pass::Environment, Pass::Globe, Pass::Translucent, Pass::Overlay]);
    assert_eq!(events.first(), Some(&Event::Pass(Pass::Compute, DepthRange::new(19.0, 31.0), vec![4])));
}

#[test]
fn test_opaque_and_translucent_use_their_own_near() {
    let config = SchedulerConfig::default().with_far_to_near_ratio(10.0).with_depth_range_fitting(false);
    let commands = vec![at_depth(Pass::Globe, 50.0, 1.0), at_depth(Pass::Translucent, 60.0, 1.0)];

    let events = scheduled(&commands, config);

    let globe_range = events.iter().find_map(|event| match event {
        Event::Pass(Pass::Globe, range, _) => Some(*range),
        _ => None,
    });
    let translucent_range = events.iter().find_map(|event| match event {
        Event::Pass(Pass::Translucent, range, _) => Some(*range),
        _ => None,
    });

    assert_eq!(globe_range, Some(DepthRange::new(10.0 * 0.9999, 100.0)));
    assert_eq!(translucent_range, Some(DepthRange::new(10.0, 100.0)));
}

#[test]
fn test_shadow_passes_walk_casters_by_pass() {
    let mut scheduler = FrameScheduler::new(SchedulerConfig::default()).unwrap();
    let commands = vec![
        at_depth(Pass::Opaque, 20.0, 1.0).with_added_flags(CommandFlags::CAST_SHADOWS),
        at_depth(Pass::Globe, 22.0, 1.0).with_added_flags(CommandFlags::CAST_SHADOWS),
    ];
    let maps = [ShadowMapDescriptor::point(Vec3::new(0.0, 0.0, -21.0), 10.0)];

    let schedule = scheduler.schedule_frame(&camera(1.0, 1000.0), &commands, &maps, SortContext::Render).unwrap();
    let mut executor = RecordingExecutor::default();
    schedule.execute_shadows(&commands, &mut executor).unwrap();

    let begins = executor.events.iter().filter(|e| matches!(e, Event::BeginShadowPass(_))).count();
    assert_eq!(begins, 6);
    assert!(matches!(executor.events[0], Event::BeginShadowPass(ShadowPassKind::CubeFace { map: 0, .. })));
    assert!(matches!(&executor.events[1], Event::Pass(Pass::Globe, _, indices) if indices == &vec![1]));
    assert!(matches!(&executor.events[2], Event::Pass(Pass::Opaque, _, indices) if indices == &vec![0]));
}

#[test]
fn test_executor_errors_abort_the_walk() {
    struct FailOnTranslucent {
        passes: usize,
    }

    impl CommandExecutor for FailOnTranslucent {
        type Error = String;

        fn begin_frustum(&mut self, _index: usize, _frustum: &FrustumCommands) -> Result<(), String> {
            Ok(())
        }

        fn clear(&mut self, _clear: &ClearCommand) -> Result<(), String> {
            Ok(())
        }

        fn execute_pass(&mut self, batch: PassBatch<'_>) -> Result<(), String> {
            self.passes += 1;
            if batch.pass == Pass::Translucent {
                return Err(format!("{} translucent commands rejected", batch.len()));
            }
            Ok(())
        }

        fn begin_shadow_pass(&mut self, _pass: &ShadowPass) -> Result<(), String> {
            Ok(())
        }
    }

    let commands = vec![
        at_depth(Pass::Opaque, 20.0, 1.0),
        at_depth(Pass::Translucent, 25.0, 1.0),
        DrawCommand::new(Pass::Overlay, 2).with_flags(CommandFlags::empty()),
    ];
    let mut scheduler = FrameScheduler::new(SchedulerConfig::default()).unwrap();
    let schedule = scheduler.schedule_frame(&camera(1.0, 1000.0), &commands, &[], SortContext::Render).unwrap();

    let mut executor = FailOnTranslucent { passes: 0 };
    assert_eq!(schedule.execute(&commands, &mut executor), Err("1 translucent commands rejected".to_string()));
    // Overlay never ran
    assert_eq!(executor.passes, 2);
}
