//! Depth-first hierarchical culling
//!
//! Walks any tree whose nodes nest inside their parents (bounding volume
//! hierarchies, tile quad-trees, octrees) and threads the plane mask from
//! parent to child as an explicit argument. No mask is stored on the nodes,
//! so separate branches never observe each other's state.

use crate::culling::bounds::Bounds;
use crate::culling::culling_volume::{CullingVolume, PlaneMask, MASK_INDETERMINATE, MASK_INSIDE, MASK_OUTSIDE};

/// A node in a spatial hierarchy whose children are contained in it
pub trait CullingNode {
    /// Bounding volume enclosing this node and all its descendants
    fn bounding_volume(&self) -> &Bounds;

    /// Child nodes
    fn children(&self) -> &[Self]
    where
        Self: Sized;
}

/// Counters collected during a traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Nodes whose bounding volume was tested against at least one plane
    pub nodes_tested: usize,
    /// Nodes accepted without testing because an ancestor was fully inside
    pub nodes_inherited: usize,
    /// Nodes culled (their subtrees are not visited)
    pub nodes_culled: usize,
}

/// Visit every node of `root` not culled by `volume`, depth first
///
/// `visit` receives each surviving node with its plane mask. Culled nodes
/// prune their whole subtree.
pub fn traverse_with_plane_mask<N, F>(volume: &CullingVolume, root: &N, mut visit: F) -> TraversalStats
where
    N: CullingNode,
    F: FnMut(&N, PlaneMask),
{
    let mut stats = TraversalStats::default();
    visit_node(volume, root, MASK_INDETERMINATE, &mut visit, &mut stats);
    stats
}

fn visit_node<N, F>(volume: &CullingVolume, node: &N, parent_mask: PlaneMask, visit: &mut F, stats: &mut TraversalStats)
where
    N: CullingNode,
    F: FnMut(&N, PlaneMask),
{
    let mask = volume.compute_visibility_with_plane_mask(node.bounding_volume(), parent_mask);
    if parent_mask == MASK_INSIDE {
        stats.nodes_inherited += 1;
    } else {
        stats.nodes_tested += 1;
    }

    if mask == MASK_OUTSIDE {
        stats.nodes_culled += 1;
        return;
    }

    visit(node, mask);
    for child in node.children() {
        visit_node(volume, child, mask, visit, stats);
    }
}
