//! Tiled Light Tree Builder
//!
//! Extends the clustered grid with per-cell light trees: each populated
//! cell either stores a flat light list (one unbounded list node) or a
//! depth-sorted binary tree the GPU traverses with skip pointers. A
//! heuristic picks per cell, comparing the average light depth extent
//! against the cell's slice extent; long lights make trees pointless since
//! every branch would be taken anyway.
//!
//! Build phases per frame:
//! 1. frustum cull + depth intervals (parallel)
//! 2. bin + prefix sum + scatter of interval indices (parallel scatter,
//!    atomic cursors)
//! 3. queue pass: run the heuristic per cell, emit list nodes, reserve
//!    tree node ranges (sequential)
//! 4. per-cell approximate depth sort into reserved ranges (parallel)
//! 5. per-cell bottom-up tree build + flatten + final index writes
//!    (parallel)
//!
//! Phases 4 and 5 run over disjoint `&mut` sub-slices carved out of the
//! shared output arrays up front; cells never alias because their offsets
//! were assigned in queue order.

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
use super::clustered::{reset_atomic_u16, reset_atomic_u32};
use super::frustum::{Frustum, test_tile_frustum_sphere, test_tile_frustum_sphere_fast};
use super::light_source::LightSource;
use super::light_tree::{
    MAX_LEAF_NODES, PackedLightTreeNode, TreeBuildParams, build_light_tree_bottom_up,
    build_light_tree_info, pack_list_node,
};
use super::slicing::{
    DepthExtentsCalculator, compute_exponential_slice_depth, compute_linear_slice_depth,
};
use super::tile_frustum_cache::TileFrustumCache;

/// One grid cell (16 bytes, GPU-compatible). `tree_offset` addresses the
/// packed node array; a list cell has `tree_node_count == 1`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TreeLightGridCell {
    pub light_offset: u32,
    pub light_count: u32,
    pub tree_offset: u32,
    pub tree_node_count: u32,
}

const _: () = {
    assert!(
        std::mem::size_of::<TreeLightGridCell>() == 16,
        "TreeLightGridCell must be 16 bytes for GPU layout"
    );
};

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct TiledTreeBuildParams {
    pub common: LightBuildParams,
    /// Cells at or below this light count always use a flat list;
    /// experimentally found to be a good default
    pub target_lights_per_leaf: u32,
    /// Use a light tree if the average light extent is less than this
    /// proportion of the cell extent
    pub light_tree_heuristic: f32,
    /// Heuristic measures only the part of each light overlapping the
    /// cell instead of the full extent
    pub use_clipped_light_extents: bool,
    pub max_leaf_nodes: u32,
}

impl Default for TiledTreeBuildParams {
    fn default() -> Self {
        Self {
            common: LightBuildParams::default(),
            target_lights_per_leaf: 6,
            light_tree_heuristic: 1.0,
            use_clipped_light_extents: false,
            max_leaf_nodes: MAX_LEAF_NODES,
        }
    }
}

impl TiledTreeBuildParams {
    /// Variant for pure tree mode: a single slice covering all depth, so
    /// every populated tile holds one tree over its full light list.
    pub fn for_tree_mode(mut self) -> Self {
        self.common.slice_count = 1;
        self.common.max_slice_depth = 0.0;
        self
    }
}

/// CPU timings and counters from one build. Times are seconds.
#[derive(Copy, Clone, Debug, Default)]
pub struct TiledTreeBuildStats {
    pub visible_light_count: u32,
    pub tree_cell_count: u32,
    pub list_cell_count: u32,
    /// Size of the light index output
    pub light_index_count: u32,
    /// Size of the packed node output
    pub tree_node_count: u32,
    /// Echoed grid shape for shader constants
    pub slice_count: u32,
    pub max_slice_depth: f32,
    pub light_cull_time: f64,
    pub light_assign_time: f64,
    pub light_sort_time: f64,
    pub build_tree_time: f64,
    pub build_total_time: f64,
}

pub struct TiledLightTreeBuilder {
    max_lights: u32,

    intervals: Vec<LightDepthInterval>,
    extents: Vec<LightScreenSpaceExtents>,
    cell_light_count: Vec<AtomicU32>,
    tile_light_count: Vec<u32>,
    scatter_cursors: Vec<AtomicU32>,
    interval_slots: Vec<AtomicU16>,
    tile_interval_indices: Vec<u16>,
    sorted_interval_indices: Vec<u16>,
    tree_build_queue: Vec<u32>,

    light_grid: Vec<TreeLightGridCell>,
    gpu_light_tree: Vec<PackedLightTreeNode>,
    gpu_light_indices: Vec<u16>,

    tile_frustum_cache: TileFrustumCache,
}

impl TiledLightTreeBuilder {
    pub fn new(max_lights: u32) -> Self {
        Self {
            max_lights,
            intervals: Vec::with_capacity(max_lights as usize),
            extents: Vec::with_capacity(max_lights as usize),
            cell_light_count: Vec::new(),
            tile_light_count: Vec::new(),
            scatter_cursors: Vec::new(),
            interval_slots: Vec::new(),
            tile_interval_indices: Vec::new(),
            sorted_interval_indices: Vec::new(),
            tree_build_queue: Vec::new(),
            light_grid: Vec::new(),
            gpu_light_tree: Vec::new(),
            gpu_light_indices: Vec::new(),
            tile_frustum_cache: TileFrustumCache::new(),
        }
    }

    /// Cell array, one entry per (tile, slice), slice-major.
    pub fn light_grid(&self) -> &[TreeLightGridCell] {
        &self.light_grid
    }

    /// Packed tree nodes for all cells. Never empty after a build.
    pub fn tree_nodes(&self) -> &[PackedLightTreeNode] {
        &self.gpu_light_tree
    }

    /// Light index slots addressed by the grid cells, depth-sorted within
    /// tree cells. Never empty after a build.
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
        params: &TiledTreeBuildParams,
    ) -> TiledTreeBuildStats {
        assert!(params.max_leaf_nodes <= MAX_LEAF_NODES);
        assert!(view_space_lights.len() <= self.max_lights as usize);

        let mut stats = TiledTreeBuildStats {
            slice_count: params.common.slice_count,
            max_slice_depth: params.common.max_slice_depth,
            ..Default::default()
        };
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

        // light intervals only need to be sorted once per cell; trees for
        // all cells can then assume pre-sorted data

        // ====================================================================
        // Bin and scatter
        // ====================================================================

        let assign_start = Instant::now();

        reset_atomic_u32(&mut self.cell_light_count, cell_count);

        let depth_extents_calculator = DepthExtentsCalculator::new(common);
        let mat_proj_screen = camera.screen_space_proj_matrix(common.resolution);

        let total_binned_light_count = bin_lights(
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
        self.light_grid.resize(cell_count, TreeLightGridCell::default());

        let mut assigned_light_count = 0u32;
        for (cell, count) in self.light_grid.iter_mut().zip(&self.cell_light_count) {
            cell.light_offset = assigned_light_count;
            assigned_light_count += count.load(Ordering::Relaxed);
        }

        // Scatter interval indices into the reserved ranges

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
        reset_atomic_u16(&mut self.interval_slots, total_binned_light_count as usize);

        {
            let light_grid = &self.light_grid;
            let scatter_cursors = &self.scatter_cursors;
            let interval_slots = &self.interval_slots;
            let tile_frustum_cache = &self.tile_frustum_cache;

            self.intervals
                .par_iter()
                .enumerate()
                .zip(self.extents.par_iter())
                .for_each(|((interval_index, interval), extents)| {
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

                            for z in
                                interval.slice_range.slice_min..=interval.slice_range.slice_max
                            {
                                let cell_index = (tile_id + z as u32 * tiles_per_slice) as usize;
                                let write_index =
                                    scatter_cursors[cell_index].fetch_add(1, Ordering::Relaxed);
                                let offset = light_grid[cell_index].light_offset + write_index;
                                interval_slots[offset as usize]
                                    .store(interval_index as u16, Ordering::Relaxed);
                            }
                        }
                    }
                });
        }

        for (cell, cursor) in self.light_grid.iter_mut().zip(&self.scatter_cursors) {
            cell.light_count = cursor.load(Ordering::Relaxed);
        }

        self.tile_interval_indices.clear();
        self.tile_interval_indices
            .extend(self.interval_slots.iter().map(|slot| slot.load(Ordering::Relaxed)));

        stats.light_assign_time = assign_start.elapsed().as_secs_f64();

        // ====================================================================
        // Queue pass: list vs tree per cell
        // ====================================================================

        let queue_start = Instant::now();

        self.gpu_light_tree.clear();
        self.gpu_light_tree
            .reserve((self.intervals.len() * 4) / 3);
        self.gpu_light_indices.clear();
        self.gpu_light_indices
            .resize(self.tile_interval_indices.len(), 0);
        self.sorted_interval_indices.clear();
        self.sorted_interval_indices
            .resize(self.tile_interval_indices.len(), 0);

        self.tree_build_queue.clear();
        self.tree_build_queue.reserve(cell_count);

        let tree_build_params = TreeBuildParams {
            min_lights_per_leaf: params.target_lights_per_leaf,
            max_leaf_nodes: params.max_leaf_nodes,
        };

        let compute_slice_depth = |slice: u32| -> f32 {
            if slice == 0 {
                return 0.0;
            }
            if slice >= common.slice_count {
                return 100_000.0;
            }
            if common.use_exponential_slices {
                compute_exponential_slice_depth(slice, common.max_slice_depth, common.slice_count)
            } else {
                compute_linear_slice_depth(slice, common.max_slice_depth, common.slice_count)
            }
        };

        for z in 0..common.slice_count {
            let slice_depth_min = compute_slice_depth(z);
            let slice_depth_max = compute_slice_depth(z + 1);
            let slice_depth_extent = slice_depth_max - slice_depth_min;

            let tree_heuristic_extents_threshold = if params.use_clipped_light_extents {
                // clipped extents measure radii, not diameters
                slice_depth_extent * params.light_tree_heuristic * 0.5
            } else {
                slice_depth_extent * params.light_tree_heuristic
            };

            for tile in 0..tiles_per_slice {
                let cell_index = (tile + z * tiles_per_slice) as usize;
                let cell_light_count = self.light_grid[cell_index].light_count;

                if cell_light_count == 0 {
                    continue;
                }

                let mut use_light_list = true;

                if cell_light_count > params.target_lights_per_leaf {
                    let cell_offset = self.light_grid[cell_index].light_offset;
                    let mut light_extents_sum = 0.0f32;
                    for i in 0..cell_light_count {
                        let interval_index =
                            self.tile_interval_indices[(cell_offset + i) as usize];
                        let interval = &self.intervals[interval_index as usize];

                        if params.use_clipped_light_extents {
                            let light_depth_min =
                                (interval.center - interval.radius).max(slice_depth_min);
                            let light_depth_max =
                                (interval.center + interval.radius).min(slice_depth_max);
                            light_extents_sum += light_depth_max - light_depth_min;
                        } else {
                            light_extents_sum += interval.radius * 2.0;
                        }
                    }

                    let average_light_extents = light_extents_sum / cell_light_count as f32;
                    if average_light_extents <= tree_heuristic_extents_threshold {
                        use_light_list = false;
                    }
                }

                let cell = &mut self.light_grid[cell_index];

                if use_light_list {
                    cell.tree_node_count = 1;
                    cell.tree_offset = self.gpu_light_tree.len() as u32;
                    self.gpu_light_tree
                        .push(pack_list_node(cell.light_offset, cell_light_count));

                    // list cells keep scatter order
                    for i in 0..cell_light_count {
                        let interval_index =
                            self.tile_interval_indices[(cell.light_offset + i) as usize];
                        let interval = &self.intervals[interval_index as usize];
                        self.gpu_light_indices[(cell.light_offset + i) as usize] =
                            interval.light_index;
                    }

                    stats.list_cell_count += 1;
                } else {
                    let build_info = build_light_tree_info(&tree_build_params, cell_light_count);

                    cell.tree_node_count = build_info.total_node_count;
                    cell.tree_offset = self.gpu_light_tree.len() as u32;

                    self.gpu_light_tree.resize(
                        self.gpu_light_tree.len() + build_info.total_node_count as usize,
                        PackedLightTreeNode::default(),
                    );
                    self.tree_build_queue.push(cell_index as u32);

                    stats.tree_cell_count += 1;
                }
            }
        }

        let queue_time = queue_start.elapsed().as_secs_f64();

        // ====================================================================
        // Per-cell sort (parallel, disjoint output regions)
        // ====================================================================

        let sort_start = Instant::now();

        let sort_jobs = carve_index_regions(
            &self.light_grid,
            &self.tree_build_queue,
            &mut self.sorted_interval_indices,
        );

        let intervals = &self.intervals;
        let tile_interval_indices = &self.tile_interval_indices;

        sort_jobs.into_par_iter().for_each(|(cell, sorted)| {
            let first = cell.light_offset as usize;
            let unsorted = &tile_interval_indices[first..first + cell.light_count as usize];
            bucket_sort_by_depth(intervals, unsorted, sorted);
        });

        stats.light_sort_time = sort_start.elapsed().as_secs_f64();

        // ====================================================================
        // Per-cell tree build (parallel, disjoint output regions)
        // ====================================================================

        let tree_start = Instant::now();

        let build_jobs = carve_tree_regions(
            &self.light_grid,
            &self.tree_build_queue,
            &mut self.gpu_light_tree,
            &mut self.gpu_light_indices,
        );

        let sorted_interval_indices = &self.sorted_interval_indices;

        build_jobs
            .into_par_iter()
            .for_each(|(cell, tree_nodes, light_indices)| {
                let first = cell.light_offset as usize;
                let sorted = &sorted_interval_indices[first..first + cell.light_count as usize];

                build_light_tree_bottom_up(
                    &tree_build_params,
                    intervals,
                    sorted,
                    cell.light_offset,
                    cell.light_count,
                    tree_nodes,
                );

                for (slot, &interval_index) in light_indices.iter_mut().zip(sorted) {
                    *slot = intervals[interval_index as usize].light_index;
                }
            });

        if self.gpu_light_tree.is_empty() {
            self.gpu_light_tree.push(PackedLightTreeNode::default());
        }
        if self.gpu_light_indices.is_empty() {
            self.gpu_light_indices.push(0);
        }

        stats.light_index_count = self.gpu_light_indices.len() as u32;
        stats.tree_node_count = self.gpu_light_tree.len() as u32;
        stats.build_tree_time = queue_time + tree_start.elapsed().as_secs_f64();
        stats.build_total_time = build_start.elapsed().as_secs_f64();

        log::trace!(
            "tree build: {} visible, {} tree cells, {} list cells, {:.3} ms",
            stats.visible_light_count,
            stats.tree_cell_count,
            stats.list_cell_count,
            stats.build_total_time * 1000.0
        );

        stats
    }
}

/// Approximate counting sort of one cell's interval indices by depth.
///
/// 512 buckets over `[0, max depth in cell]`; entries in the same bucket
/// keep their input order. Good enough for leaf grouping, far cheaper than
/// a comparison sort.
fn bucket_sort_by_depth(intervals: &[LightDepthInterval], unsorted: &[u16], sorted: &mut [u16]) {
    const BUCKET_COUNT: usize = 512;
    let mut buckets = [0u32; BUCKET_COUNT];

    let mut light_depth_max = 0.0f32;
    for &interval_index in unsorted {
        light_depth_max = light_depth_max.max(intervals[interval_index as usize].center);
    }

    let depth_scale = BUCKET_COUNT as f32 / light_depth_max;
    let compute_bucket = |depth: f32| -> usize {
        ((depth_scale * depth) as i32).clamp(0, BUCKET_COUNT as i32 - 1) as usize
    };

    // histogram
    for &interval_index in unsorted {
        buckets[compute_bucket(intervals[interval_index as usize].center)] += 1;
    }

    // prefix scan
    let mut offset = 0u32;
    for bucket in &mut buckets {
        let count = *bucket;
        *bucket = offset;
        offset += count;
    }

    // stable scatter
    for &interval_index in unsorted {
        let bucket = compute_bucket(intervals[interval_index as usize].center);
        sorted[buckets[bucket] as usize] = interval_index;
        buckets[bucket] += 1;
    }
}

/// Split the sorted-index array into per-queued-cell `&mut` regions.
///
/// Queue order follows cell index order, and cell offsets are monotonic in
/// cell index, so walking the queue while splitting off (gap, region)
/// pairs yields disjoint slices covering every queued cell.
fn carve_index_regions<'a>(
    light_grid: &[TreeLightGridCell],
    queue: &[u32],
    sorted: &'a mut [u16],
) -> Vec<(TreeLightGridCell, &'a mut [u16])> {
    let mut jobs = Vec::with_capacity(queue.len());
    let mut rest = sorted;
    let mut base = 0u32;

    for &cell_index in queue {
        let cell = light_grid[cell_index as usize];
        let (_, after_gap) = rest.split_at_mut((cell.light_offset - base) as usize);
        let (region, after_region) = after_gap.split_at_mut(cell.light_count as usize);
        jobs.push((cell, region));
        rest = after_region;
        base = cell.light_offset + cell.light_count;
    }

    jobs
}

/// Split the packed node and light index arrays into per-queued-cell
/// `&mut` regions, same scheme as [`carve_index_regions`].
fn carve_tree_regions<'a>(
    light_grid: &[TreeLightGridCell],
    queue: &[u32],
    tree_nodes: &'a mut [PackedLightTreeNode],
    light_indices: &'a mut [u16],
) -> Vec<(TreeLightGridCell, &'a mut [PackedLightTreeNode], &'a mut [u16])> {
    let mut jobs = Vec::with_capacity(queue.len());
    let mut tree_rest = tree_nodes;
    let mut tree_base = 0u32;
    let mut index_rest = light_indices;
    let mut index_base = 0u32;

    for &cell_index in queue {
        let cell = light_grid[cell_index as usize];

        let (_, after_gap) = tree_rest.split_at_mut((cell.tree_offset - tree_base) as usize);
        let (tree_region, after_region) = after_gap.split_at_mut(cell.tree_node_count as usize);
        tree_rest = after_region;
        tree_base = cell.tree_offset + cell.tree_node_count;

        let (_, after_gap) = index_rest.split_at_mut((cell.light_offset - index_base) as usize);
        let (index_region, after_region) = after_gap.split_at_mut(cell.light_count as usize);
        index_rest = after_region;
        index_base = cell.light_offset + cell.light_count;

        jobs.push((cell, tree_region, index_region));
    }

    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{UVec2, Vec3};

    fn test_params(tile_frustum_culling: TileFrustumCulling) -> TiledTreeBuildParams {
        TiledTreeBuildParams {
            common: LightBuildParams {
                resolution: UVec2::new(1280, 720),
                tile_size: 64,
                tile_frustum_culling,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn tight_light(z: f32) -> LightSource {
        // small radius relative to the 31.25-unit linear slices, so tree
        // cells pass the heuristic
        LightSource::new(Vec3::new(0.0, 0.0, z), 2.0, Vec3::ONE)
    }

    #[test]
    fn test_empty_scene_produces_padded_outputs() {
        let mut builder = TiledLightTreeBuilder::new(1024);
        let stats = builder.build(
            &CameraParams::default(),
            &[],
            &test_params(TileFrustumCulling::Off),
        );
        assert_eq!(stats.visible_light_count, 0);
        assert_eq!(builder.tree_nodes().len(), 1);
        assert_eq!(builder.light_indices(), &[0]);
        assert!(builder.light_grid().iter().all(|c| c.light_count == 0));
    }

    #[test]
    fn test_small_cells_become_lists() {
        // few overlapping lights, all below target_lights_per_leaf per cell
        let lights: Vec<_> = (0..3).map(|i| tight_light(50.0 + i as f32)).collect();

        let mut builder = TiledLightTreeBuilder::new(1024);
        let stats = builder.build(
            &CameraParams::default(),
            &lights,
            &test_params(TileFrustumCulling::Off),
        );

        assert!(stats.list_cell_count > 0);
        assert_eq!(stats.tree_cell_count, 0);

        for cell in builder.light_grid().iter().filter(|c| c.light_count > 0) {
            assert_eq!(cell.tree_node_count, 1);
            let node = &builder.tree_nodes()[cell.tree_offset as usize];
            assert!(node.is_leaf());
            assert_eq!(node.light_count(), cell.light_count);
            assert_eq!(node.light_offset, cell.light_offset);
            assert_eq!(node.skip_count(), 0x7FFF);
        }
    }

    #[test]
    fn test_crowded_cells_become_trees() {
        // 20 tight lights stacked in the same cell: above the leaf target,
        // extents far below the slice extent
        let lights: Vec<_> = (0..20).map(|i| tight_light(40.0 + 0.5 * i as f32)).collect();

        let mut builder = TiledLightTreeBuilder::new(1024);
        let stats = builder.build(
            &CameraParams::default(),
            &lights,
            &test_params(TileFrustumCulling::Off),
        );

        assert!(stats.tree_cell_count > 0, "expected tree cells");

        for cell in builder.light_grid().iter().filter(|c| c.tree_node_count > 1) {
            let root = &builder.tree_nodes()[cell.tree_offset as usize];
            assert!(!root.is_leaf());
            assert_eq!(root.light_count(), cell.light_count);
            assert_eq!(root.skip_count(), cell.tree_node_count);
        }
    }

    #[test]
    fn test_heuristic_boundary_at_target_lights_per_leaf() {
        let params = test_params(TileFrustumCulling::Off);
        let camera = CameraParams::default();

        // exactly target_lights_per_leaf lights in a cell: stays a list
        let lights: Vec<_> = (0..params.target_lights_per_leaf)
            .map(|i| tight_light(40.0 + 0.1 * i as f32))
            .collect();
        let mut builder = TiledLightTreeBuilder::new(1024);
        let stats = builder.build(&camera, &lights, &params);
        assert_eq!(stats.tree_cell_count, 0);

        // one more tips cells with tight lights into trees
        let lights: Vec<_> = (0..params.target_lights_per_leaf + 1)
            .map(|i| tight_light(40.0 + 0.1 * i as f32))
            .collect();
        let stats = builder.build(&camera, &lights, &params);
        assert!(stats.tree_cell_count > 0);
    }

    #[test]
    fn test_tree_cell_indices_are_depth_sorted() {
        let lights: Vec<_> = (0..24)
            .map(|i| tight_light(70.0 - 0.9 * i as f32)) // descending depths
            .collect();

        let mut builder = TiledLightTreeBuilder::new(1024);
        builder.build(
            &CameraParams::default(),
            &lights,
            &test_params(TileFrustumCulling::Off),
        );

        for cell in builder.light_grid().iter().filter(|c| c.tree_node_count > 1) {
            let first = cell.light_offset as usize;
            let indices = &builder.light_indices()[first..first + cell.light_count as usize];
            for pair in indices.windows(2) {
                let depth_a = lights[pair[0] as usize].position[2];
                let depth_b = lights[pair[1] as usize].position[2];
                // bucket sort is approximate; these depths are > 1 bucket apart
                assert!(depth_a <= depth_b, "indices not sorted: {depth_a} > {depth_b}");
            }
        }
    }

    #[test]
    fn test_every_cell_light_is_covered_by_its_tree() {
        let lights: Vec<_> = (0..40)
            .map(|i| tight_light(30.0 + 1.5 * (i % 25) as f32))
            .collect();

        let mut builder = TiledLightTreeBuilder::new(1024);
        builder.build(
            &CameraParams::default(),
            &lights,
            &test_params(TileFrustumCulling::Off),
        );

        for cell in builder.light_grid().iter().filter(|c| c.light_count > 0) {
            let nodes = &builder.tree_nodes()
                [cell.tree_offset as usize..(cell.tree_offset + cell.tree_node_count) as usize];

            // leaves partition the cell's index range
            let leaf_light_sum: u32 = nodes
                .iter()
                .filter(|n| n.is_leaf())
                .map(|n| n.light_count())
                .sum();
            assert_eq!(leaf_light_sum, cell.light_count);

            // root covers every light interval in the cell
            let root = &nodes[0];
            let first = cell.light_offset as usize;
            for &light_index in
                &builder.light_indices()[first..first + cell.light_count as usize]
            {
                let light = &lights[light_index as usize];
                let light_min = light.position[2] - light.attenuation_radius;
                let light_max = light.position[2] + light.attenuation_radius;
                assert!(root.center - root.radius <= light_min + 1e-3);
                assert!(root.center + root.radius >= light_max - 1e-3);
            }
        }
    }

    #[test]
    fn test_tree_mode_uses_single_slice() {
        let lights: Vec<_> = (0..30).map(|i| tight_light(20.0 + 10.0 * i as f32)).collect();

        let params = test_params(TileFrustumCulling::Off).for_tree_mode();
        assert_eq!(params.common.slice_count, 1);

        let mut builder = TiledLightTreeBuilder::new(1024);
        let stats = builder.build(&CameraParams::default(), &lights, &params);

        assert_eq!(stats.slice_count, 1);
        // a single degenerate slice forces trees for populated tiles above
        // the leaf target
        assert!(stats.tree_cell_count > 0);
        assert_eq!(
            builder.light_grid().len(),
            (params.common.tile_count_x() * params.common.tile_count_y()) as usize
        );
    }
}
