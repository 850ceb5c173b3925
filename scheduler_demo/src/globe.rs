//! Synthetic globe scene
//!
//! A quad-tree of surface tiles over a spherical body plus scattered
//! buildings, labels and the usual once-per-frame work.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_scheduler::culling::{traverse_with_plane_mask, CullingNode, TraversalStats};
use scene_scheduler::prelude::*;

/// Mean radius of the body in meters
pub const BODY_RADIUS: f64 = 6_371_000.0;

/// Depth of the tile quad-tree
const TILE_LEVELS: u32 = 5;

const BUILDING_COUNT: usize = 400;
const LABEL_COUNT: usize = 60;

/// A surface tile covering a longitude/latitude rectangle
pub struct GlobeTile {
    bounds: Bounds,
    children: Vec<GlobeTile>,
    id: u64,
}

impl GlobeTile {
    fn new(west: f64, south: f64, east: f64, north: f64, level: u32, id: u64) -> Self {
        let bounds = Bounds::from(tile_sphere(west, south, east, north));

        let children = if level + 1 < TILE_LEVELS {
            let (mid_lon, mid_lat) = (0.5 * (west + east), 0.5 * (south + north));
            vec![
                Self::new(west, south, mid_lon, mid_lat, level + 1, id * 4 + 1),
                Self::new(mid_lon, south, east, mid_lat, level + 1, id * 4 + 2),
                Self::new(west, mid_lat, mid_lon, north, level + 1, id * 4 + 3),
                Self::new(mid_lon, mid_lat, east, north, level + 1, id * 4 + 4),
            ]
        } else {
            Vec::new()
        };

        Self { bounds, children, id }
    }
}

impl CullingNode for GlobeTile {
    fn bounding_volume(&self) -> &Bounds {
        &self.bounds
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

/// Point on the body surface at `height` meters, angles in radians
pub fn surface_point(longitude: f64, latitude: f64, height: f64) -> Vec3 {
    let r = BODY_RADIUS + height;
    Vec3::new(
        r * latitude.cos() * longitude.cos(),
        r * latitude.cos() * longitude.sin(),
        r * latitude.sin(),
    )
}

/// Sphere around a tile, from a 3x3 grid of surface samples
fn tile_sphere(west: f64, south: f64, east: f64, north: f64) -> BoundingSphere {
    let mut samples = Vec::with_capacity(9);
    for i in 0..3 {
        for j in 0..3 {
            let lon = west + (east - west) * f64::from(i) * 0.5;
            let lat = south + (north - south) * f64::from(j) * 0.5;
            samples.push(surface_point(lon, lat, 0.0));
        }
    }

    let center = samples.iter().sum::<Vec3>() / samples.len() as f64;
    let radius = samples.iter().map(|p| (p - center).norm()).fold(0.0, f64::max);
    BoundingSphere::new(center, radius)
}

/// Everything the demo draws
pub struct GlobeScene {
    roots: Vec<GlobeTile>,
    static_commands: Vec<DrawCommand>,
}

impl GlobeScene {
    /// Build the tile tree and scatter content with a fixed seed
    pub fn new(seed: u64) -> Self {
        use std::f64::consts::{FRAC_PI_2, PI};

        let roots = vec![
            GlobeTile::new(-PI, -FRAC_PI_2, 0.0, FRAC_PI_2, 0, 1),
            GlobeTile::new(0.0, -FRAC_PI_2, PI, FRAC_PI_2, 0, 2),
        ];

        let mut rng = StdRng::seed_from_u64(seed);
        let mut static_commands = Vec::with_capacity(BUILDING_COUNT + LABEL_COUNT + 3);
        let mut owner = 1_000_000;
        let mut next_owner = || {
            owner += 1;
            owner
        };

        static_commands.push(DrawCommand::new(Pass::Compute, next_owner()).with_flags(CommandFlags::empty()));
        static_commands.push(DrawCommand::new(Pass::Environment, next_owner()).with_flags(CommandFlags::empty()));

        // Buildings cluster around the area the camera orbits
        for _ in 0..BUILDING_COUNT {
            let lon = rng.gen_range(-0.02..0.02);
            let lat = rng.gen_range(-0.02..0.02);
            let half_size = rng.gen_range(5.0..40.0);
            let center = surface_point(lon, lat, half_size);
            let command = DrawCommand::new(Pass::Tileset, next_owner())
                .with_bounding_volume(AxisAlignedBox::from_center_extents(center, Vec3::repeat(half_size)))
                .with_added_flags(CommandFlags::CAST_SHADOWS | CommandFlags::RECEIVE_SHADOWS);
            static_commands.push(command);
        }

        for _ in 0..LABEL_COUNT {
            let lon = rng.gen_range(-0.5..0.5);
            let lat = rng.gen_range(-0.5..0.5);
            let center = surface_point(lon, lat, rng.gen_range(100.0..2000.0));
            static_commands.push(
                DrawCommand::new(Pass::Translucent, next_owner()).with_bounding_volume(BoundingSphere::new(center, 50.0)),
            );
        }

        static_commands.push(DrawCommand::new(Pass::Overlay, next_owner()).with_flags(CommandFlags::empty()));

        Self { roots, static_commands }
    }

    /// Commands for one frame: visible leaf tiles plus the static content
    pub fn frame_commands(&self, camera: &CameraState, commands: &mut Vec<DrawCommand>) -> TraversalStats {
        commands.clear();
        let volume = camera.frustum.compute_culling_volume(&camera.position, &camera.direction, &camera.up);

        let mut stats = TraversalStats::default();
        for root in &self.roots {
            let root_stats = traverse_with_plane_mask(&volume, root, |tile, _mask| {
                if tile.children.is_empty() {
                    commands.push(
                        DrawCommand::new(Pass::Globe, tile.id)
                            .with_bounding_volume(tile.bounds)
                            .with_added_flags(CommandFlags::CAST_SHADOWS | CommandFlags::RECEIVE_SHADOWS),
                    );
                }
            });
            stats.nodes_tested += root_stats.nodes_tested;
            stats.nodes_inherited += root_stats.nodes_inherited;
            stats.nodes_culled += root_stats.nodes_culled;
        }

        commands.extend(self.static_commands.iter().cloned());
        stats
    }
}
