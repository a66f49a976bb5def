//! Lightcull Engine Library
//!
//! CPU-side light assignment for a tiled/clustered renderer. Every frame the
//! pipeline decides which light sources affect which screen tiles and depth
//! slices, so a shading pass only reads the lights relevant to each pixel.
//!
//! Two builders share a common culling and binning front end:
//!
//! - [`lighting::ClusteredLightBuilder`] - flat per-cell light index lists
//!   (tile × depth-slice grid, offset + count per cell)
//! - [`lighting::TiledLightTreeBuilder`] - per-cell balanced binary trees over
//!   depth-sorted lights, flattened into a depth-first array with skip
//!   pointers for GPU traversal; falls back to flat lists per cell when a
//!   heuristic predicts a tree is not worthwhile (hybrid mode)
//!
//! # Example
//!
//! ```ignore
//! use glam::UVec2;
//! use lightcull_engine::lighting::{
//!     CameraParams, ClusteredBuildParams, ClusteredLightBuilder,
//! };
//!
//! let camera = CameraParams::default();
//! let mut builder = ClusteredLightBuilder::new(65536);
//! let mut params = ClusteredBuildParams::default();
//! params.common.resolution = UVec2::new(1920, 1080);
//! params.common.tile_size = 48;
//!
//! let stats = builder.build(&camera, &view_space_lights, &params);
//! // builder.light_grid() and builder.light_indices() are ready for upload
//! ```

pub mod lighting;

// Re-export the most commonly used types at crate level for convenience
pub use lighting::{
    CameraParams, ClusteredBuildParams, ClusteredLightBuilder, LightBuildParams, LightSource,
    LightingMode, TiledLightTreeBuilder, TiledTreeBuildParams,
};
