//! Distance ordering for translucent commands
//!
//! Blending needs back-to-front order; picking wants the nearest hit first.
//! Keys are squared distances from the camera to the bounding volume center,
//! compared with `f64::total_cmp` and tie-broken by insertion position so the
//! order is total and stable across frames.

use std::cmp::Ordering;

use crate::foundation::math::Vec3;
use crate::scheduler::command::{CommandIndex, DrawCommand};

/// Why the frame is being scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortContext {
    /// Drawing to the screen: translucent commands back to front
    #[default]
    Render,
    /// Picking: translucent commands front to back
    Pick,
}

#[derive(Debug, Clone, Copy)]
struct SortKey {
    distance_squared: f64,
    insertion: usize,
    index: CommandIndex,
}

/// Sorts translucent buckets, reusing its key storage between calls
#[derive(Debug, Default)]
pub struct TranslucencySorter {
    keys: Vec<SortKey>,
}

impl TranslucencySorter {
    /// Create a sorter
    pub fn new() -> Self {
        Self::default()
    }

    /// Reorder `bucket` for `context`
    ///
    /// With order-independent transparency the render order does not matter
    /// and the sort is skipped; picking always sorts. Returns whether the
    /// bucket was sorted.
    pub fn sort(
        &mut self,
        bucket: &mut [CommandIndex],
        commands: &[DrawCommand],
        camera_position: &Vec3,
        context: SortContext,
        oit_enabled: bool,
    ) -> bool {
        if context == SortContext::Render && oit_enabled {
            return false;
        }
        if bucket.len() < 2 {
            return true;
        }

        self.keys.clear();
        self.keys.extend(bucket.iter().enumerate().map(|(insertion, &index)| SortKey {
            distance_squared: commands[index].distance_squared_to(camera_position),
            insertion,
            index,
        }));

        let compare: fn(&SortKey, &SortKey) -> Ordering = match context {
            SortContext::Render => back_to_front,
            SortContext::Pick => front_to_back,
        };
        self.keys.sort_unstable_by(compare);

        for (slot, key) in bucket.iter_mut().zip(&self.keys) {
            *slot = key.index;
        }
        true
    }
}

/// Farthest first; equal distances keep insertion order
fn back_to_front(a: &SortKey, b: &SortKey) -> Ordering {
    b.distance_squared
        .total_cmp(&a.distance_squared)
        .then(a.insertion.cmp(&b.insertion))
}

/// Nearest first; equal distances favour the later-inserted command
fn front_to_back(a: &SortKey, b: &SortKey) -> Ordering {
    a.distance_squared
        .total_cmp(&b.distance_squared)
        .then(b.insertion.cmp(&a.insertion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::BoundingSphere;
    use crate::scheduler::command::CommandFlags;
    use crate::scheduler::pass::Pass;

    fn at_distances(distances: &[f64]) -> Vec<DrawCommand> {
        distances
            .iter()
            .zip(0u64..)
            .map(|(&d, owner)| {
                DrawCommand::new(Pass::Translucent, owner)
                    .with_bounding_volume(BoundingSphere::new(Vec3::new(0.0, 0.0, -d), 0.5))
            })
            .collect()
    }

    fn distances_of(bucket: &[CommandIndex], commands: &[DrawCommand]) -> Vec<f64> {
        bucket.iter().map(|&k| commands[k].distance_squared_to(&Vec3::zeros()).sqrt()).collect()
    }

    #[test]
    fn test_render_sorts_back_to_front() {
        let commands = at_distances(&[5.0, 50.0, 1.0]);
        let mut bucket = vec![0, 1, 2];

        assert!(TranslucencySorter::new().sort(&mut bucket, &commands, &Vec3::zeros(), SortContext::Render, false));
        assert_eq!(distances_of(&bucket, &commands), vec![50.0, 5.0, 1.0]);
    }

    #[test]
    fn test_pick_sorts_front_to_back_even_with_oit() {
        let commands = at_distances(&[5.0, 50.0, 1.0]);
        let mut bucket = vec![0, 1, 2];

        assert!(TranslucencySorter::new().sort(&mut bucket, &commands, &Vec3::zeros(), SortContext::Pick, true));
        assert_eq!(bucket, vec![2, 0, 1]);
    }

    #[test]
    fn test_oit_skips_render_sort() {
        let commands = at_distances(&[5.0, 50.0, 1.0]);
        let mut bucket = vec![0, 1, 2];

        assert!(!TranslucencySorter::new().sort(&mut bucket, &commands, &Vec3::zeros(), SortContext::Render, true));
        assert_eq!(bucket, vec![0, 1, 2]);
    }

    #[test]
    fn test_ties_break_by_insertion() {
        let commands = at_distances(&[10.0, 10.0, 10.0, 20.0]);
        let mut sorter = TranslucencySorter::new();

        let mut render = vec![2, 0, 3, 1];
        sorter.sort(&mut render, &commands, &Vec3::zeros(), SortContext::Render, false);
        assert_eq!(render, vec![3, 2, 0, 1]);

        let mut pick = vec![2, 0, 3, 1];
        sorter.sort(&mut pick, &commands, &Vec3::zeros(), SortContext::Pick, false);
        assert_eq!(pick, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_unbounded_commands_sort_as_nearest() {
        let mut commands = at_distances(&[5.0]);
        commands.push(DrawCommand::new(Pass::Translucent, 9).with_flags(CommandFlags::empty()));
        let mut bucket = vec![1, 0];

        TranslucencySorter::new().sort(&mut bucket, &commands, &Vec3::zeros(), SortContext::Render, false);
        assert_eq!(bucket, vec![0, 1]);
    }
}
