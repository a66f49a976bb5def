//! Clustered Light Builder
//!
//! Produces a flat light grid: one cell per (tile, depth slice) with an
//! offset and count into a shared u16 light index array. The shading pass
//! addresses its cell directly and iterates the indices.
//!
//! Build phases per frame:
//! 1. frustum cull + depth intervals (parallel)
//! 2. screen/slice extents + conservative per-cell counts (parallel then
//!    sequential count)
//! 3. prefix sum over cells, reserving index ranges (sequential)
//! 4. scatter light indices into the reserved ranges, with optional
//!    per-tile frustum culling (parallel, atomic cursors)
//!
//! Cell counts after the scatter may be below the reserved capacity when
//! tile frustum culling drops lights; the slack slots are simply unused.

use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::time::Instant;

use glam::Vec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::binning::{
    LightBuildParams, LightDepthInterval, LightScreenSpaceExtents, TileFrustumCulling, bin_lights,
    cull_and_compute_depth_intervals,
};
use super::camera::CameraParams;
use super::frustum::{Frustum, test_tile_frustum_sphere, test_tile_frustum_sphere_fast};
use super::light_source::LightSource;
use super::slicing::DepthExtentsCalculator;
use super::tile_frustum_cache::TileFrustumCache;

/// One grid cell (16 bytes, GPU-compatible).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightGridCell {
    pub light_offset: u32,
    pub light_count: u32,
    pub _pad0: u32,
    pub _pad1: u32,
}

const _: () = {
    assert!(
        std::mem::size_of::<LightGridCell>() == 16,
        "LightGridCell must be 16 bytes for GPU layout"
    );
};

#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClusteredBuildParams {
    pub common: LightBuildParams,
}

/// CPU timings and counters from one build. Times are seconds.
#[derive(Copy, Clone, Debug, Default)]
pub struct ClusteredBuildStats {
    pub visible_light_count: u32,
    /// Conservative light-cell assignments reserved by the prefix sum
    pub assigned_light_count: u32,
    pub light_cull_time: f64,
    pub light_assign_time: f64,
    pub build_total_time: f64,
}

pub struct ClusteredLightBuilder {
    max_lights: u32,

    intervals: Vec<LightDepthInterval>,
    extents: Vec<LightScreenSpaceExtents>,
    cell_light_count: Vec<AtomicU32>,
    tile_light_count: Vec<u32>,
    scatter_cursors: Vec<AtomicU32>,
    index_slots: Vec<AtomicU16>,

    light_grid: Vec<LightGridCell>,
    gpu_light_indices: Vec<u16>,

    tile_frustum_cache: TileFrustumCache,
}

impl ClusteredLightBuilder {
    pub fn new(max_lights: u32) -> Self {
        Self {
            max_lights,
            intervals: Vec::with_capacity(max_lights as usize),
            extents: Vec::with_capacity(max_lights as usize),
            cell_light_count: Vec::new(),
            tile_light_count: Vec::new(),
            scatter_cursors: Vec::new(),
            index_slots: Vec::new(),
            light_grid: Vec::new(),
            gpu_light_indices: Vec::new(),
            tile_frustum_cache: TileFrustumCache::new(),
        }
    }

    /// Cell array, one entry per (tile, slice), slice-major.
    pub fn light_grid(&self) -> &[LightGridCell] {
        &self.light_grid
    }

    /// Light index slots addressed by the grid cells. Never empty after a
    /// build; degenerate builds hold a single zero entry.
    pub fn light_indices(&self) -> &[u16] {
        &self.gpu_light_indices
    }

    /// Per-tile light counts summed over slices; empty unless
    /// `calculate_tile_light_count` was set.
    pub fn tile_light_count(&self) -> &[u32] {
        &self.tile_light_count
    }

    pub fn build(
        &mut self,
        camera: &CameraParams,
        view_space_lights: &[LightSource],
        params: &ClusteredBuildParams,
    ) -> ClusteredBuildStats {
        assert!(view_space_lights.len() <= self.max_lights as usize);

        let mut stats = ClusteredBuildStats::default();
        let build_start = Instant::now();

        let common = &params.common;
        let mat_proj = camera.proj_matrix();
        let frustum = Frustum::from_projection(&mat_proj);

        let tile_count_x = common.tile_count_x();
        let tile_count_y = common.tile_count_y();
        let tiles_per_slice = tile_count_x * tile_count_y;
        let cell_count = (tiles_per_slice * common.slice_count) as usize;

        // ====================================================================
        // Cull
        // ====================================================================

        let cull_start = Instant::now();
        stats.visible_light_count =
            cull_and_compute_depth_intervals(&frustum, view_space_lights, &mut self.intervals);
        stats.light_cull_time = cull_start.elapsed().as_secs_f64();

        // ====================================================================
        // Bin
        // ====================================================================

        let assign_start = Instant::now();

        reset_atomic_u32(&mut self.cell_light_count, cell_count);

        let depth_extents_calculator = DepthExtentsCalculator::new(common);
        let mat_proj_screen = camera.screen_space_proj_matrix(common.resolution);

        bin_lights(
            &depth_extents_calculator,
            &mat_proj_screen,
            camera.near_z,
            common.tile_size,
            tile_count_x,
            tile_count_y,
            view_space_lights,
            &mut self.intervals,
            &mut self.extents,
            &self.cell_light_count[..cell_count],
        );

        self.tile_light_count.clear();
        if common.calculate_tile_light_count {
            self.tile_light_count.resize(tiles_per_slice as usize, 0);
            super::binning::accumulate_tile_light_counts(
                &self.cell_light_count[..cell_count],
                tiles_per_slice,
                &mut self.tile_light_count,
            );
        }

        // Prefix sum: reserve an index range per cell

        self.light_grid.clear();
        self.light_grid.resize(cell_count, LightGridCell::default());

        let mut assigned_light_count = 0u32;
        for (cell, count) in self.light_grid.iter_mut().zip(&self.cell_light_count) {
            cell.light_offset = assigned_light_count;
            assigned_light_count += count.load(Ordering::Relaxed);
        }
        stats.assigned_light_count = assigned_light_count;

        // ====================================================================
        // Scatter
        // ====================================================================

        self.tile_frustum_cache.build(
            camera.fov_y,
            camera.aspect,
            common.tile_size,
            tile_count_x,
            tile_count_y,
            common.resolution.x,
        );
        let camera_frustum_top_left = camera.frustum_top_left_corner();
        let tile_step = self.tile_frustum_cache.tile_step();

        reset_atomic_u32(&mut self.scatter_cursors, cell_count);
        reset_atomic_u16(&mut self.index_slots, assigned_light_count as usize);

        let light_grid = &self.light_grid;
        let scatter_cursors = &self.scatter_cursors;
        let index_slots = &self.index_slots;
        let tile_frustum_cache = &self.tile_frustum_cache;

        self.intervals
            .par_iter()
            .zip(self.extents.par_iter())
            .for_each(|(interval, extents)| {
                let light = &view_space_lights[interval.light_index as usize];
                let light_center = light.position_vec();
                let light_radius = light.attenuation_radius;
                let tile_space_light_center =
                    extents.screen_box.center() / common.tile_size as f32;

                for y in extents.tile_min.y..=extents.tile_max.y {
                    for x in extents.tile_min.x..=extents.tile_max.x {
                        let tile_id = x + y * tile_count_x;

                        let survives = match common.tile_frustum_culling {
                            TileFrustumCulling::Off => true,
                            TileFrustumCulling::Fast => test_tile_frustum_sphere_fast(
                                camera_frustum_top_left,
                                tile_step,
                                Vec2::new(x as f32, y as f32),
                                tile_space_light_center,
                                light_center,
                                light_radius,
                            ),
                            TileFrustumCulling::Exact => test_tile_frustum_sphere(
                                tile_frustum_cache.corners(tile_id),
                                tile_frustum_cache.planes(tile_id),
                                light_center,
                                light_radius,
                            ),
                        };
                        if !survives {
                            continue;
                        }

                        for z in interval.slice_range.slice_min..=interval.slice_range.slice_max {
                            let cell_index = (tile_id + z as u32 * tiles_per_slice) as usize;
                            let write_index =
                                scatter_cursors[cell_index].fetch_add(1, Ordering::Relaxed);
                            let offset = light_grid[cell_index].light_offset + write_index;
                            index_slots[offset as usize]
                                .store(interval.light_index, Ordering::Relaxed);
                        }
                    }
                }
            });

        // Final counts are whatever the cursors claimed

        for (cell, cursor) in self.light_grid.iter_mut().zip(&self.scatter_cursors) {
            cell.light_count = cursor.load(Ordering::Relaxed);
        }

        self.gpu_light_indices.clear();
        self.gpu_light_indices
            .extend(self.index_slots.iter().map(|slot| slot.load(Ordering::Relaxed)));
        if self.gpu_light_indices.is_empty() {
            // keep the GPU buffer non-empty
            self.gpu_light_indices.push(0);
        }

        stats.light_assign_time = assign_start.elapsed().as_secs_f64();
        stats.build_total_time = build_start.elapsed().as_secs_f64();

        log::trace!(
            "clustered build: {} visible, {} assignments, {:.3} ms",
            stats.visible_light_count,
            stats.assigned_light_count,
            stats.build_total_time * 1000.0
        );

        stats
    }
}

/// Grow if needed and zero the active range. Atomics are not `Clone`, so
/// plain `resize` does not apply.
pub(crate) fn reset_atomic_u32(storage: &mut Vec<AtomicU32>, len: usize) {
    if storage.len() < len {
        storage.resize_with(len, || AtomicU32::new(0));
    }
    for slot in &storage[..len] {
        slot.store(0, Ordering::Relaxed);
    }
}

pub(crate) fn reset_atomic_u16(storage: &mut Vec<AtomicU16>, len: usize) {
    if storage.len() < len {
        storage.resize_with(len, || AtomicU16::new(0));
    }
    for slot in &storage[..len] {
        slot.store(0, Ordering::Relaxed);
    }
    storage.truncate(len);
}
