//! Light Assignment Module
//!
//! Contains the per-frame CPU pipeline that assigns view-space light sources
//! to screen tiles and depth slices: frustum culling, screen-space extent
//! computation, tile/slice binning, and per-cell light tree construction.
//!
//! Data flow per frame:
//!
//! camera + lights → frustum cull + depth intervals (parallel)
//!   → screen extents + slice ranges + per-cell counting (parallel)
//!   → prefix-sum offsets (sequential)
//!   → atomic scatter into per-cell regions (parallel)
//!   → [tree builder] per-cell depth sort + tree build (parallel)
//!   → flat arrays ready for GPU upload

pub mod binning;
pub mod camera;
pub mod clustered;
pub mod distribution;
pub mod frustum;
pub mod gpu_upload;
pub mod light_gen;
pub mod light_source;
pub mod light_tree;
pub mod mode;
pub mod screen_bounds;
pub mod slicing;
pub mod stats;
pub mod tile_frustum_cache;
pub mod tree_builder;
pub mod tree_lut;

// Re-export commonly used types for convenience
pub use binning::{
    LightBuildParams, LightDepthInterval, LightScreenSpaceExtents, TileFrustumCulling,
};
pub use camera::CameraParams;
pub use clustered::{ClusteredBuildParams, ClusteredBuildStats, ClusteredLightBuilder, LightGridCell};
pub use distribution::DiscreteDistribution;
pub use frustum::Frustum;
pub use gpu_upload::{LightingBuffers, LightingUploadStats};
pub use light_gen::{LightBounds, animate_lights, generate_lights, generate_lights_on_surface};
pub use light_source::{AnimatedLightSource, LightSource, to_view_space};
pub use light_tree::{
    LightTreeNode, PackedLightTreeNode, TreeBuildParams, MAX_LEAF_NODES, MAX_TOTAL_NODES,
};
pub use mode::LightingMode;
pub use slicing::{DepthExtentsCalculator, LightSliceRange};
pub use stats::MovingAverage;
pub use tile_frustum_cache::TileFrustumCache;
pub use tree_builder::{
    TiledLightTreeBuilder, TiledTreeBuildParams, TiledTreeBuildStats, TreeLightGridCell,
};

/// Integer division rounding up.
#[inline]
pub const fn div_up(value: u32, divisor: u32) -> u32 {
    (value + divisor - 1) / divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_up() {
        assert_eq!(div_up(1920, 48), 40);
        assert_eq!(div_up(1080, 48), 23); // 22.5 rounds up
        assert_eq!(div_up(0, 16), 0);
        assert_eq!(div_up(16, 16), 1);
        assert_eq!(div_up(17, 16), 2);
    }
}
