//! Per-Tile Frustum Cache
//!
//! Corner rays and side planes for every tile in the grid, rebuilt only
//! when the camera projection or tile layout actually changes. Both
//! builders consult this cache on the binning hot path, so the per-tile
//! normalizations are worth hoisting out of the frame loop.

use glam::{Vec2, Vec3};

use super::frustum::compute_tile_frustum_parameters;

#[derive(Debug, Default)]
pub struct TileFrustumCache {
    /// Corner rays per tile (top-left, top-right, bottom-left, bottom-right)
    corners: Vec<[Vec3; 4]>,
    /// Side plane normals per tile (left, top, right, bottom)
    planes: Vec<[Vec3; 4]>,

    // build key
    tile_frustum_step_size: f32,
    tile_step: Vec2,
    tile_size: u32,
    tile_count_x: u32,
    tile_count_y: u32,
    resolution_x: u32,
    valid: bool,
}

impl TileFrustumCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the cache if any input changed; otherwise a no-op.
    pub fn build(
        &mut self,
        fov_y: f32,
        aspect: f32,
        tile_size: u32,
        tile_count_x: u32,
        tile_count_y: u32,
        resolution_x: u32,
    ) {
        let height = (fov_y / 2.0).tan() * 2.0;
        let width = height * aspect;
        let camera_frustum_top_left = Vec2::new(-width / 2.0, height / 2.0);
        let tile_frustum_step_size = width * tile_size as f32 / resolution_x as f32;
        let tile_step = Vec2::new(tile_frustum_step_size, -tile_frustum_step_size);

        if self.valid
            && self.tile_frustum_step_size == tile_frustum_step_size
            && self.tile_step == tile_step
            && self.tile_size == tile_size
            && self.tile_count_x == tile_count_x
            && self.tile_count_y == tile_count_y
            && self.resolution_x == resolution_x
        {
            return;
        }

        self.tile_frustum_step_size = tile_frustum_step_size;
        self.tile_step = tile_step;
        self.tile_size = tile_size;
        self.tile_count_x = tile_count_x;
        self.tile_count_y = tile_count_y;
        self.resolution_x = resolution_x;
        self.valid = true;

        let tile_count = (tile_count_x * tile_count_y) as usize;
        self.corners.resize(tile_count, [Vec3::ZERO; 4]);
        self.planes.resize(tile_count, [Vec3::ZERO; 4]);

        for y in 0..tile_count_y {
            for x in 0..tile_count_x {
                let tile_top_left = Vec2::new(x as f32, y as f32);
                let tile_id = (x + y * tile_count_x) as usize;
                let (corners, planes) = compute_tile_frustum_parameters(
                    camera_frustum_top_left,
                    tile_step,
                    tile_top_left,
                );
                self.corners[tile_id] = corners;
                self.planes[tile_id] = planes;
            }
        }
    }

    /// Corner rays for one tile.
    #[inline]
    pub fn corners(&self, tile_id: u32) -> &[Vec3; 4] {
        &self.corners[tile_id as usize]
    }

    /// Side plane normals for one tile.
    #[inline]
    pub fn planes(&self, tile_id: u32) -> &[Vec3; 4] {
        &self.planes[tile_id as usize]
    }

    /// Per-tile step in frustum space, (positive x, negative y).
    #[inline]
    pub fn tile_step(&self) -> Vec2 {
        self.tile_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_populates_all_tiles() {
        let mut cache = TileFrustumCache::new();
        cache.build(1.0, 16.0 / 9.0, 48, 40, 23, 1920);
        for tile_id in 0..40 * 23 {
            for plane in cache.planes(tile_id) {
                assert!((plane.length() - 1.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_rebuild_with_same_inputs_is_identity() {
        let mut cache = TileFrustumCache::new();
        cache.build(1.0, 16.0 / 9.0, 48, 40, 23, 1920);
        let before = *cache.corners(123);
        cache.build(1.0, 16.0 / 9.0, 48, 40, 23, 1920);
        assert_eq!(*cache.corners(123), before);
    }

    #[test]
    fn test_adjacent_tiles_share_an_edge() {
        let mut cache = TileFrustumCache::new();
        cache.build(1.0, 16.0 / 9.0, 48, 40, 23, 1920);
        // right edge corners of tile 0 equal left edge corners of tile 1
        let a = cache.corners(0);
        let b = cache.corners(1);
        assert_eq!(a[1], b[0]); // top-right == top-left
        assert_eq!(a[3], b[2]); // bottom-right == bottom-left
    }

    #[test]
    fn test_resize_invalidates_cache() {
        let mut cache = TileFrustumCache::new();
        cache.build(1.0, 16.0 / 9.0, 48, 40, 23, 1920);
        let before = *cache.corners(0);
        cache.build(1.0, 16.0 / 9.0, 24, 80, 45, 1920);
        assert_ne!(*cache.corners(0), before);
    }
}
