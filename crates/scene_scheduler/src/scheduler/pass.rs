//! Render passes in execution order

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of [`Pass`] variants
pub const PASS_COUNT: usize = 11;

/// Render pass a draw command belongs to
///
/// Declaration order is the order buckets are executed within a sub-frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// GPU compute work; once per frame before anything else, unculled
    Compute,
    /// Sky, sun and atmosphere; once per frame, unculled
    Environment,
    /// Globe surface tiles
    Globe,
    /// Classification drawn onto terrain
    TerrainClassification,
    /// 3D tiles
    Tileset,
    /// Classification drawn onto 3D tiles
    TilesetClassification,
    /// General opaque geometry
    Opaque,
    /// Volumetric content
    Voxels,
    /// Blended geometry
    Translucent,
    /// Classification drawn onto translucent geometry
    TranslucentClassification,
    /// Screen-space overlays; once per frame after everything else, unculled
    Overlay,
}

impl Pass {
    /// Every pass in declaration order
    pub const ALL: [Self; PASS_COUNT] = [
        Self::Compute,
        Self::Environment,
        Self::Globe,
        Self::TerrainClassification,
        Self::Tileset,
        Self::TilesetClassification,
        Self::Opaque,
        Self::Voxels,
        Self::Translucent,
        Self::TranslucentClassification,
        Self::Overlay,
    ];

    /// Passes bucketed per sub-frustum, in execution order
    pub const FRUSTUM_PASSES: [Self; 8] = [
        Self::Globe,
        Self::TerrainClassification,
        Self::Tileset,
        Self::TilesetClassification,
        Self::Opaque,
        Self::Voxels,
        Self::Translucent,
        Self::TranslucentClassification,
    ];

    /// Passes whose commands may cast shadows, in execution order
    pub const SHADOW_CASTERS: [Self; 3] = [Self::Globe, Self::Tileset, Self::Opaque];

    /// Position in [`Pass::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether commands of this pass are culled and bucketed per sub-frustum
    pub const fn is_per_frustum(self) -> bool {
        !matches!(self, Self::Environment | Self::Compute | Self::Overlay)
    }

    /// Whether this pass draws with the exact sub-frustum near plane
    pub const fn is_translucent(self) -> bool {
        matches!(self, Self::Translucent | Self::TranslucentClassification)
    }

    /// Whether this pass is drawn with the seam-offset near plane
    pub const fn is_opaque_family(self) -> bool {
        self.is_per_frustum() && !self.is_translucent()
    }

    /// Whether commands of this pass are eligible shadow casters
    pub const fn casts_shadows(self) -> bool {
        matches!(self, Self::Globe | Self::Tileset | Self::Opaque)
    }

    /// Short lowercase name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Environment => "environment",
            Self::Globe => "globe",
            Self::TerrainClassification => "terrain_classification",
            Self::Tileset => "tileset",
            Self::TilesetClassification => "tileset_classification",
            Self::Opaque => "opaque",
            Self::Voxels => "voxels",
            Self::Translucent => "translucent",
            Self::TranslucentClassification => "translucent_classification",
            Self::Overlay => "overlay",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_declaration_order() {
        for (k, pass) in Pass::ALL.iter().enumerate() {
            assert_eq!(pass.index(), k);
        }
        assert!(Pass::FRUSTUM_PASSES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_once_per_frame_passes_bracket_frustum_passes() {
        assert!(Pass::Compute < Pass::Environment);
        assert!(Pass::Environment < Pass::FRUSTUM_PASSES[0]);
        assert!(Pass::FRUSTUM_PASSES.iter().all(|&pass| pass < Pass::Overlay));
        assert_eq!(Pass::ALL[0], Pass::Compute);
    }

    #[test]
    fn test_pass_families() {
        let per_frustum: Vec<Pass> = Pass::ALL.into_iter().filter(|p| p.is_per_frustum()).collect();
        assert_eq!(per_frustum, Pass::FRUSTUM_PASSES);

        assert!(Pass::Voxels.is_opaque_family());
        assert!(!Pass::Translucent.is_opaque_family());
        assert!(!Pass::Overlay.is_opaque_family());

        let casters: Vec<Pass> = Pass::ALL.into_iter().filter(|p| p.casts_shadows()).collect();
        assert_eq!(casters, Pass::SHADOW_CASTERS);
    }
}
