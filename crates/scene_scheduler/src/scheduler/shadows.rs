//! Shadow pass assignment
//!
//! Each shadow map turns into one or more shadow passes, each with its own
//! culling volume and caster list.
//!
//! - Directional lights cover the camera's depth range with cascades. Each
//!   cascade is an orthographic box in light space fitted around a slice of
//!   the camera frustum and stretched toward the light so off-screen casters
//!   still land in it.
//! - Spot lights use a single perspective pass.
//! - Point lights use six cube faces sharing one volume around the light.

use std::ops::RangeInclusive;

use crate::core::config::{SchedulerConfig, MAX_SHADOW_CASCADES};
use crate::culling::{BoundingSphere, CullingVolume};
use crate::foundation::math::{utils, Vec3};
use crate::frustum::{Frustum, OrthographicOffCenterFrustum, PerspectiveFrustum};
use crate::scheduler::camera::CameraState;
use crate::scheduler::command::{CommandIndex, DrawCommand};
use crate::scheduler::error::{SchedulerError, SchedulerResult};
use crate::scheduler::partition::DepthRange;
use crate::scheduler::pass::Pass;

const SHADOW_CASTER_PASS_COUNT: usize = Pass::SHADOW_CASTERS.len();

/// A light that renders into a shadow map this frame
#[derive(Debug, Clone, PartialEq)]
pub enum ShadowMapDescriptor {
    /// Sun-like light; cascaded over the camera's depth range
    Directional {
        /// Direction the light travels
        direction: Vec3,
        /// Number of cascades, 1 to 4
        cascade_count: u32,
    },
    /// Cone light; one perspective pass
    Spot {
        /// Light position
        position: Vec3,
        /// Cone axis
        direction: Vec3,
        /// Up hint for the light view
        up: Vec3,
        /// Cone angle in radians
        fov: f64,
        /// Near distance
        near: f64,
        /// Far distance
        far: f64,
    },
    /// Omnidirectional light; six cube faces
    Point {
        /// Light position
        position: Vec3,
        /// Range of the light
        radius: f64,
    },
}

impl ShadowMapDescriptor {
    /// Directional light with the given cascade count
    pub fn directional(direction: Vec3, cascade_count: u32) -> Self {
        Self::Directional { direction, cascade_count }
    }

    /// Point light
    pub fn point(position: Vec3, radius: f64) -> Self {
        Self::Point { position, radius }
    }

    /// Check the descriptor before any pass is built; `map` labels errors
    pub fn validate(&self, map: usize) -> SchedulerResult<()> {
        let invalid = |reason: String| SchedulerError::InvalidShadowMap { map, reason };

        match self {
            Self::Directional { direction, cascade_count } => {
                if utils::try_normalize(direction).is_none() {
                    return Err(invalid(format!("light direction {direction:?} cannot be normalized")));
                }
                if *cascade_count == 0 || *cascade_count > MAX_SHADOW_CASCADES {
                    return Err(invalid(format!(
                        "cascade count must be between 1 and {MAX_SHADOW_CASCADES}, got {cascade_count}"
                    )));
                }
            }
            Self::Spot { position, fov, near, far, .. } => {
                if !utils::is_finite(position) {
                    return Err(invalid(format!("light position {position:?} is not finite")));
                }
                PerspectiveFrustum::new(*fov, 1.0, *near, *far)?;
            }
            Self::Point { position, radius } => {
                if !utils::is_finite(position) {
                    return Err(invalid(format!("light position {position:?} is not finite")));
                }
                if !(radius.is_finite() && *radius > 0.0) {
                    return Err(invalid(format!("radius must be a positive finite distance, got {radius}")));
                }
            }
        }
        Ok(())
    }
}

/// Cube map face of a point light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    /// +X
    PositiveX,
    /// -X
    NegativeX,
    /// +Y
    PositiveY,
    /// -Y
    NegativeY,
    /// +Z
    PositiveZ,
    /// -Z
    NegativeZ,
}

impl CubeFace {
    /// All faces in cube map layer order
    pub const ALL: [Self; 6] = [
        Self::PositiveX,
        Self::NegativeX,
        Self::PositiveY,
        Self::NegativeY,
        Self::PositiveZ,
        Self::NegativeZ,
    ];

    /// View direction and up vector of the face
    pub fn view_axes(self) -> (Vec3, Vec3) {
        match self {
            Self::PositiveX => (Vec3::x(), -Vec3::y()),
            Self::NegativeX => (-Vec3::x(), -Vec3::y()),
            Self::PositiveY => (Vec3::y(), Vec3::z()),
            Self::NegativeY => (-Vec3::y(), -Vec3::z()),
            Self::PositiveZ => (Vec3::z(), -Vec3::y()),
            Self::NegativeZ => (-Vec3::z(), -Vec3::y()),
        }
    }
}

/// Which light and which part of its shadow map a pass renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowPassKind {
    /// Directional light cascade; cascade 0 is nearest the camera
    Cascade {
        /// Shadow map index
        map: usize,
        /// Cascade index
        cascade: usize,
    },
    /// Spot light
    Spot {
        /// Shadow map index
        map: usize,
    },
    /// Point light cube face
    CubeFace {
        /// Shadow map index
        map: usize,
        /// Face
        face: CubeFace,
    },
}

/// Eye transform a shadow pass renders from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightView {
    /// Eye position
    pub position: Vec3,
    /// View direction
    pub direction: Vec3,
    /// Up vector
    pub up: Vec3,
}

/// One shadow-map render with its casters
#[derive(Debug, Clone)]
pub struct ShadowPass {
    kind: ShadowPassKind,
    view: LightView,
    frustum: Option<Frustum>,
    depth_range: Option<DepthRange>,
    culling_volume: CullingVolume,
    casters: [Vec<CommandIndex>; SHADOW_CASTER_PASS_COUNT],
}

impl ShadowPass {
    fn new(kind: ShadowPassKind, view: LightView) -> Self {
        Self {
            kind,
            view,
            frustum: None,
            depth_range: None,
            culling_volume: CullingVolume::degenerate(),
            casters: Default::default(),
        }
    }

    /// Light and map region this pass renders
    pub fn kind(&self) -> ShadowPassKind {
        self.kind
    }

    /// Eye transform
    pub fn view(&self) -> &LightView {
        &self.view
    }

    /// Light frustum; `None` for cube faces, which use a fixed 90 degree projection
    pub fn frustum(&self) -> Option<&Frustum> {
        self.frustum.as_ref()
    }

    /// Camera depth range covered by this pass (cascades only)
    pub fn depth_range(&self) -> Option<DepthRange> {
        self.depth_range
    }

    /// Volume casters are tested against
    pub fn culling_volume(&self) -> &CullingVolume {
        &self.culling_volume
    }

    /// Casters of one pass; empty for passes that never cast
    pub fn casters(&self, pass: Pass) -> &[CommandIndex] {
        Pass::SHADOW_CASTERS
            .iter()
            .position(|&caster| caster == pass)
            .map_or(&[], |slot| &self.casters[slot])
    }

    /// Total casters across passes
    pub fn caster_count(&self) -> usize {
        self.casters.iter().map(Vec::len).sum()
    }

    fn push(&mut self, pass: Pass, index: CommandIndex) {
        if let Some(slot) = Pass::SHADOW_CASTERS.iter().position(|&caster| caster == pass) {
            self.casters[slot].push(index);
        }
    }
}

/// Shadow passes of a frame; pass storage is reused between frames
#[derive(Debug, Default)]
pub struct ShadowPassList {
    passes: Vec<ShadowPass>,
    active: usize,
}

impl ShadowPassList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every pass, keeping storage
    pub fn clear(&mut self) {
        self.active = 0;
    }

    /// Active passes in execution order
    pub fn as_slice(&self) -> &[ShadowPass] {
        &self.passes[..self.active]
    }

    /// Number of active passes
    pub fn len(&self) -> usize {
        self.active
    }

    /// Whether there are no active passes
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    fn begin(&mut self, kind: ShadowPassKind, view: LightView) -> &mut ShadowPass {
        if self.active == self.passes.len() {
            self.passes.push(ShadowPass::new(kind, view));
        }
        let pass = &mut self.passes[self.active];
        self.active += 1;

        pass.kind = kind;
        pass.view = view;
        pass.frustum = None;
        pass.depth_range = None;
        for casters in &mut pass.casters {
            casters.clear();
        }
        pass
    }
}

/// Cascade boundaries over `[near, far]`, `count + 1` values
///
/// Blends logarithmic and uniform spacing by `lambda`:
/// `split_i = lambda * n * (f / n)^(i / N) + (1 - lambda) * (n + (f - n) * i / N)`.
/// A near of zero falls back to uniform spacing.
pub fn cascade_splits(near: f64, far: f64, count: usize, lambda: f64) -> Vec<f64> {
    let count = count.max(1);
    let lambda = if near > 0.0 { lambda } else { 0.0 };

    let mut splits = Vec::with_capacity(count + 1);
    splits.push(near);
    for i in 1..count {
        let t = i as f64 / count as f64;
        let logarithmic = if lambda > 0.0 { near * (far / near).powf(t) } else { 0.0 };
        let uniform = near + (far - near) * t;
        splits.push(lambda * logarithmic + (1.0 - lambda) * uniform);
    }
    splits.push(far);
    splits
}

/// Orthonormal light basis: `(direction, up, right)` with `right = direction × up`
fn light_basis(direction: &Vec3) -> Option<(Vec3, Vec3, Vec3)> {
    let direction = utils::try_normalize(direction)?;
    let up = utils::any_perpendicular(&direction);
    Some((direction, up, direction.cross(&up)))
}

/// Orthographic light box enclosing `corners`, extended toward the light
fn fit_light_box(
    corners: &[Vec3],
    origin: &Vec3,
    (direction, up, right): (Vec3, Vec3, Vec3),
    extension: f64,
) -> SchedulerResult<(OrthographicOffCenterFrustum, LightView)> {
    let mut min = Vec3::repeat(f64::INFINITY);
    let mut max = Vec3::repeat(f64::NEG_INFINITY);
    for corner in corners {
        let offset = corner - origin;
        let light_space = Vec3::new(offset.dot(&right), offset.dot(&up), offset.dot(&direction));
        min = min.inf(&light_space);
        max = max.sup(&light_space);
    }

    // Eye sits on the light side of the box, so the near plane is at zero
    let eye = origin + direction * (min.z - extension);
    let depth = max.z - min.z + extension;
    let frustum = OrthographicOffCenterFrustum::new(min.x, max.x, min.y, max.y, 0.0, depth)?;

    Ok((frustum, LightView { position: eye, direction, up }))
}

/// Build shadow passes for `maps` and assign casters to them
///
/// `range` is the camera depth range fitted to this frame's content.
/// Returns the number of (map, command) caster assignments.
pub fn assign_shadow_casters(
    passes: &mut ShadowPassList,
    maps: &[ShadowMapDescriptor],
    camera: &CameraState,
    range: DepthRange,
    commands: &[DrawCommand],
    config: &SchedulerConfig,
) -> SchedulerResult<usize> {
    passes.clear();
    let mut casters = 0;

    for (map, descriptor) in maps.iter().enumerate() {
        descriptor.validate(map)?;

        casters += match *descriptor {
            ShadowMapDescriptor::Directional { direction, cascade_count } => {
                assign_directional(passes, map, &direction, cascade_count as usize, camera, range, commands, config)?
            }
            ShadowMapDescriptor::Spot { position, direction, up, fov, near, far } => {
                let frustum: Frustum = PerspectiveFrustum::new(fov, 1.0, near, far)?.into();
                let volume = frustum.compute_culling_volume(&position, &direction, &up);

                let pass = passes.begin(ShadowPassKind::Spot { map }, LightView { position, direction, up });
                pass.frustum = Some(frustum);
                pass.culling_volume = volume;

                let mut assigned = 0;
                for (index, command) in commands.iter().enumerate() {
                    if command.is_shadow_caster() && command.is_visible_in(&pass.culling_volume) {
                        pass.push(command.pass, index);
                        assigned += 1;
                    }
                }
                assigned
            }
            ShadowMapDescriptor::Point { position, radius } => {
                assign_point(passes, map, position, radius, commands)
            }
        };
    }

    Ok(casters)
}

fn assign_directional(
    passes: &mut ShadowPassList,
    map: usize,
    direction: &Vec3,
    cascade_count: usize,
    camera: &CameraState,
    range: DepthRange,
    commands: &[DrawCommand],
    config: &SchedulerConfig,
) -> SchedulerResult<usize> {
    let near = range.near;
    let far = range.far.min(config.shadow_maximum_distance);
    if far <= near {
        log::trace!("Shadow map {map}: nothing within {} of the camera", config.shadow_maximum_distance);
        return Ok(0);
    }
    let Some(basis) = light_basis(direction) else {
        return Ok(0);
    };

    let frustum = &camera.frustum;
    let corners_of = |slice_near: f64, slice_far: f64| {
        frustum.corners(&camera.position, &camera.direction, &camera.up, slice_near, slice_far)
    };
    let Some(shadowed) = corners_of(near, far) else {
        return Ok(0);
    };

    let (global_box, global_view) = fit_light_box(&shadowed, &camera.position, basis, config.shadow_caster_extension)?;
    let global_volume = global_box.compute_culling_volume(&global_view.position, &global_view.direction, &global_view.up);

    let splits = cascade_splits(near, far, cascade_count, config.cascade_split_lambda);
    let first = passes.len();
    for (cascade, bounds) in splits.windows(2).enumerate() {
        let Some(corners) = corners_of(bounds[0], bounds[1]) else {
            return Ok(0);
        };
        let (light_box, view) = fit_light_box(&corners, &camera.position, basis, config.shadow_caster_extension)?;
        let volume = light_box.compute_culling_volume(&view.position, &view.direction, &view.up);

        let pass = passes.begin(ShadowPassKind::Cascade { map, cascade }, view);
        pass.frustum = Some(light_box.into());
        pass.depth_range = Some(DepthRange::new(bounds[0], bounds[1]));
        pass.culling_volume = volume;
    }

    let cascades = &mut passes.passes[first..passes.active];
    let mut assigned = 0;
    for (index, command) in commands.iter().enumerate() {
        if !command.is_shadow_caster() || !command.is_visible_in(&global_volume) {
            continue;
        }

        let Some(run) = caster_cascades(cascades.len(), |cascade| command.is_visible_in(&cascades[cascade].culling_volume))
        else {
            continue;
        };
        for pass in &mut cascades[run] {
            pass.push(command.pass, index);
        }
        assigned += 1;
    }

    Ok(assigned)
}

/// Cascades a caster lands in, scanning from the farthest
///
/// Cascades are ordered along the view direction: once a caster seen by a
/// farther cascade misses the next nearer one, it misses them all, so nearer
/// cascades are never tested.
fn caster_cascades(count: usize, mut is_visible: impl FnMut(usize) -> bool) -> Option<RangeInclusive<usize>> {
    let mut run: Option<RangeInclusive<usize>> = None;
    for cascade in (0..count).rev() {
        if is_visible(cascade) {
            run = Some(cascade..=run.map_or(cascade, |run| *run.end()));
        } else if run.is_some() {
            break;
        }
    }
    run
}

fn assign_point(passes: &mut ShadowPassList, map: usize, position: Vec3, radius: f64, commands: &[DrawCommand]) -> usize {
    let volume = CullingVolume::from_bounding_sphere(&BoundingSphere::new(position, radius));

    let first = passes.len();
    for face in CubeFace::ALL {
        let (direction, up) = face.view_axes();
        let pass = passes.begin(ShadowPassKind::CubeFace { map, face }, LightView { position, direction, up });
        pass.depth_range = Some(DepthRange::new(0.0, radius));
        pass.culling_volume = volume.clone();
    }

    let faces = &mut passes.passes[first..passes.active];
    let mut assigned = 0;
    for (index, command) in commands.iter().enumerate() {
        if command.is_shadow_caster() && command.is_visible_in(&volume) {
            for pass in faces.iter_mut() {
                pass.push(command.pass, index);
            }
            assigned += 1;
        }
    }
    assigned
}
