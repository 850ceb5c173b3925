//! Multi-frustum depth partitioning
//!
//! A single depth buffer cannot resolve a scene spanning from a meter in
//! front of the camera to the far side of a planet. The visible depth range
//! is cut into consecutive sub-frustums, each with a bounded far/near ratio,
//! and drawn far to near with a depth clear between them.

use thiserror::Error;

use crate::foundation::math::constants::EPSILON12;

/// Depth partitioning errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
    /// Near or far is NaN or infinite
    #[error("Depth range must be finite, got [{near}, {far}]")]
    NonFinite {
        /// Near distance
        near: f64,
        /// Far distance
        far: f64,
    },

    /// Ratio partitioning needs a near plane in front of the eye
    #[error("Near distance must be greater than zero, got {0}")]
    NearNotPositive(f64),

    /// Fixed-distance partitioning needs a near plane not behind the eye
    #[error("Near distance must not be negative, got {0}")]
    NegativeNear(f64),

    /// Near beyond far
    #[error("Near distance ({near}) must not be beyond far distance ({far})")]
    NearBeyondFar {
        /// Near distance
        near: f64,
        /// Far distance
        far: f64,
    },

    /// Far/near ratio that cannot make progress
    #[error("Far/near ratio must be a finite value greater than one, got {0}")]
    InvalidRatio(f64),

    /// Fixed distance that cannot make progress
    #[error("Sub-frustum depth must be a positive finite distance, got {0}")]
    InvalidDistance(f64),
}

/// Depth range `[near, far]` of one sub-frustum or cascade
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthRange {
    /// Near distance
    pub near: f64,
    /// Far distance
    pub far: f64,
}

impl DepthRange {
    /// Create a depth range
    pub fn new(near: f64, far: f64) -> Self {
        Self { near, far }
    }

    /// `far / near`
    pub fn ratio(&self) -> f64 {
        self.far / self.near
    }
}

/// Consecutive depth ranges, nearest first
pub type FrustumSplitList = Vec<DepthRange>;

fn validate_range(near: f64, far: f64) -> Result<(), PartitionError> {
    if !(near.is_finite() && far.is_finite()) {
        return Err(PartitionError::NonFinite { near, far });
    }
    if near > far {
        return Err(PartitionError::NearBeyondFar { near, far });
    }
    Ok(())
}

/// Split `[near, far]` so that no piece exceeds `ratio`
///
/// Returns the split list nearest first.
pub fn partition_depth_range(near: f64, far: f64, ratio: f64) -> Result<FrustumSplitList, PartitionError> {
    let mut splits = Vec::new();
    partition_depth_range_into(near, far, ratio, &mut splits)?;
    Ok(splits)
}

/// Like [`partition_depth_range`], writing into reused storage
///
/// `splits` is cleared first; on error it is left empty.
pub fn partition_depth_range_into(
    near: f64,
    far: f64,
    ratio: f64,
    splits: &mut FrustumSplitList,
) -> Result<(), PartitionError> {
    splits.clear();
    validate_range(near, far)?;
    if near <= 0.0 {
        return Err(PartitionError::NearNotPositive(near));
    }
    if !(ratio.is_finite() && ratio > 1.0) {
        return Err(PartitionError::InvalidRatio(ratio));
    }

    let mut current = near;
    loop {
        let mut next = (current * ratio).min(far);
        if far - next <= EPSILON12 * far {
            next = far;
        }
        splits.push(DepthRange::new(current, next));
        if next >= far {
            return Ok(());
        }
        current = next;
    }
}

/// Split `[near, far]` into pieces of at most `distance` world units
///
/// Used for top-down orthographic views where depth precision is uniform.
pub fn partition_fixed_distance(near: f64, far: f64, distance: f64) -> Result<FrustumSplitList, PartitionError> {
    let mut splits = Vec::new();
    partition_fixed_distance_into(near, far, distance, &mut splits)?;
    Ok(splits)
}

/// Like [`partition_fixed_distance`], writing into reused storage
pub fn partition_fixed_distance_into(
    near: f64,
    far: f64,
    distance: f64,
    splits: &mut FrustumSplitList,
) -> Result<(), PartitionError> {
    splits.clear();
    validate_range(near, far)?;
    if near < 0.0 {
        return Err(PartitionError::NegativeNear(near));
    }
    if !(distance.is_finite() && distance > 0.0) {
        return Err(PartitionError::InvalidDistance(distance));
    }

    let mut current = near;
    loop {
        let mut next = (current + distance).min(far);
        if far - next <= EPSILON12 * far.max(distance) {
            next = far;
        }
        splits.push(DepthRange::new(current, next));
        if next >= far {
            return Ok(());
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_chain(splits: &[DepthRange], near: f64, far: f64) {
        assert_eq!(splits.first().map(|s| s.near), Some(near));
        assert_eq!(splits.last().map(|s| s.far), Some(far));
        for pair in splits.windows(2) {
            assert_eq!(pair[0].far, pair[1].near);
        }
    }

    #[test]
    fn test_decade_ratio_splits_into_three() {
        let splits = partition_depth_range(1.0, 1000.0, 10.0).unwrap();
        assert_eq!(
            splits,
            vec![DepthRange::new(1.0, 10.0), DepthRange::new(10.0, 100.0), DepthRange::new(100.0, 1000.0)]
        );
    }

    #[test]
    fn test_every_piece_respects_ratio() {
        let (near, far, ratio) = (0.3, 2.7e7, 1000.0);
        let splits = partition_depth_range(near, far, ratio).unwrap();

        assert_chain(&splits, near, far);
        for split in &splits {
            assert!(split.ratio() <= ratio * (1.0 + 1e-12), "{split:?}");
        }
        let minimum = ((far / near).ln() / ratio.ln()).ceil() as usize;
        assert_eq!(splits.len(), minimum);
    }

    #[test]
    fn test_small_range_is_one_piece() {
        assert_eq!(partition_depth_range(5.0, 40.0, 1000.0).unwrap(), vec![DepthRange::new(5.0, 40.0)]);
        assert_eq!(partition_depth_range(5.0, 5.0, 1000.0).unwrap(), vec![DepthRange::new(5.0, 5.0)]);
    }

    #[test]
    fn test_nearly_reached_far_snaps() {
        // Repeated products of 0.3 may land a hair short of 300
        let splits = partition_depth_range(0.3, 300.0, 10.0).unwrap();
        assert_eq!(splits.len(), 3);
        assert_eq!(splits[2].far, 300.0);
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        assert_eq!(partition_depth_range(0.0, 10.0, 10.0), Err(PartitionError::NearNotPositive(0.0)));
        assert_eq!(
            partition_depth_range(20.0, 10.0, 10.0),
            Err(PartitionError::NearBeyondFar { near: 20.0, far: 10.0 })
        );
        assert_eq!(partition_depth_range(1.0, 10.0, 1.0), Err(PartitionError::InvalidRatio(1.0)));
        assert!(matches!(partition_depth_range(1.0, f64::INFINITY, 10.0), Err(PartitionError::NonFinite { .. })));
    }

    #[test]
    fn test_reused_storage_is_cleared() {
        let mut splits = vec![DepthRange::new(-1.0, -1.0); 8];
        partition_depth_range_into(1.0, 50.0, 100.0, &mut splits).unwrap();
        assert_eq!(splits.len(), 1);

        assert!(partition_depth_range_into(-1.0, 50.0, 100.0, &mut splits).is_err());
        assert!(splits.is_empty());
    }

    #[test]
    fn test_fixed_distance_spacing() {
        let splits = partition_fixed_distance(0.0, 4.0e6, 1.75e6).unwrap();

        assert_chain(&splits, 0.0, 4.0e6);
        assert_eq!(splits.len(), 3);
        assert_relative_eq!(splits[1].near, 1.75e6);
        assert_relative_eq!(splits[2].near, 3.5e6);

        assert_eq!(partition_fixed_distance(0.0, 1.0, 0.0), Err(PartitionError::InvalidDistance(0.0)));
        assert_eq!(partition_fixed_distance(-1.0, 1.0, 1.0), Err(PartitionError::NegativeNear(-1.0)));
    }
}
