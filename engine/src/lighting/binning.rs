//! Light Culling and Binning
//!
//! The shared front end of both builders:
//!
//! 1. frustum-cull the view-space lights and record a depth interval per
//!    survivor (parallel, order-preserving)
//! 2. compute each survivor's screen-space box, tile range and slice range,
//!    and bump every touched grid cell's atomic counter (parallel), giving
//!    the conservative per-cell capacities the prefix sum turns into offsets
//!
//! The counting ignores tile frustum culling on purpose: the later scatter
//! pass may drop lights from individual tiles, so real cell counts are at
//! most the conservative counts and the reserved index ranges never
//! overflow.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Mat4, UVec2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::frustum::Frustum;
use super::light_source::LightSource;
use super::screen_bounds::{ScreenSpaceBox, clamp_to_tile_range, compute_projected_bounding_box};
use super::slicing::{DepthExtentsCalculator, LightSliceRange};

/// Hard cap on the light set; light index slots are 16 bits.
pub const MAX_LIGHTS: usize = 65536;

/// Per-tile sphere test used during the scatter pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileFrustumCulling {
    /// Bin by screen-space box alone
    Off,
    /// Quadrant mask plus a single corner ray test
    Fast,
    /// Nearest-plane classification with corner ray fallback
    #[default]
    Exact,
}

/// Parameters shared by both builders.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct LightBuildParams {
    pub resolution: UVec2,
    pub tile_size: u32,
    pub slice_count: u32,
    pub max_slice_depth: f32,
    pub use_exponential_slices: bool,
    pub tile_frustum_culling: TileFrustumCulling,
    /// Also accumulate per-tile light counts (summed over slices) for
    /// debug overlays
    pub calculate_tile_light_count: bool,
}

impl Default for LightBuildParams {
    fn default() -> Self {
        Self {
            resolution: UVec2::ONE,
            tile_size: 1,
            slice_count: 16,
            max_slice_depth: 500.0,
            use_exponential_slices: false,
            tile_frustum_culling: TileFrustumCulling::Exact,
            calculate_tile_light_count: true,
        }
    }
}

impl LightBuildParams {
    #[inline]
    pub fn tile_count_x(&self) -> u32 {
        super::div_up(self.resolution.x, self.tile_size)
    }

    #[inline]
    pub fn tile_count_y(&self) -> u32 {
        super::div_up(self.resolution.y, self.tile_size)
    }
}

/// Depth interval of one visible light (16 bytes, GPU-compatible).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightDepthInterval {
    /// View-space depth of the light center
    pub center: f32,
    /// Attenuation radius
    pub radius: f32,
    /// Index into the view-space light array
    pub light_index: u16,
    /// Inclusive depth slice range, filled during binning
    pub slice_range: LightSliceRange,
    pub _pad: [u8; 4],
}

const _: () = {
    assert!(
        std::mem::size_of::<LightDepthInterval>() == 16,
        "LightDepthInterval must be 16 bytes for GPU layout"
    );
};

/// Screen-space footprint of one visible light, stored parallel to the
/// interval array.
#[derive(Copy, Clone, Debug, Default)]
pub struct LightScreenSpaceExtents {
    pub screen_box: ScreenSpaceBox,
    /// Inclusive tile range
    pub tile_min: UVec2,
    pub tile_max: UVec2,
}

impl LightScreenSpaceExtents {
    /// Tiles covered, inclusive of both ends.
    #[inline]
    pub fn tile_count(&self) -> u32 {
        let x = 1 + self.tile_max.x - self.tile_min.x;
        let y = 1 + self.tile_max.y - self.tile_min.y;
        x * y
    }
}

/// Cull lights against the camera frustum and record a depth interval for
/// each survivor. Returns the visible light count.
///
/// Output order matches input order, so repeated builds over the same
/// light set produce identical index buffers.
pub fn cull_and_compute_depth_intervals(
    frustum: &Frustum,
    view_space_lights: &[LightSource],
    out_intervals: &mut Vec<LightDepthInterval>,
) -> u32 {
    assert!(view_space_lights.len() <= MAX_LIGHTS);

    out_intervals.clear();
    out_intervals.par_extend(
        view_space_lights
            .par_iter()
            .enumerate()
            .filter_map(|(light_index, light)| {
                if frustum.intersect_sphere_conservative(light.position_vec(), light.attenuation_radius)
                {
                    Some(LightDepthInterval {
                        center: light.position[2],
                        radius: light.attenuation_radius,
                        light_index: light_index as u16,
                        slice_range: LightSliceRange::default(),
                        _pad: [0; 4],
                    })
                } else {
                    None
                }
            }),
    );

    out_intervals.len() as u32
}

/// Compute screen-space and depth-slice extents for every visible light
/// and count lights per grid cell, in one parallel pass.
///
/// `out_extents[i]` describes `intervals[i]`; `cell_light_count` must hold
/// `tile_count_x * tile_count_y * slice_count` zeroed counters. Returns the
/// total number of light-cell assignments.
pub fn bin_lights(
    depth_extents_calculator: &DepthExtentsCalculator,
    mat_proj_screen: &Mat4,
    camera_near_z: f32,
    tile_size: u32,
    tile_count_x: u32,
    tile_count_y: u32,
    lights: &[LightSource],
    intervals: &mut [LightDepthInterval],
    out_extents: &mut Vec<LightScreenSpaceExtents>,
    cell_light_count: &[AtomicU32],
) -> u32 {
    let tiles_per_slice = tile_count_x * tile_count_y;

    out_extents.clear();
    out_extents.par_extend(intervals.par_iter_mut().map(|interval| {
        let light = &lights[interval.light_index as usize];

        let screen_box = compute_projected_bounding_box(
            mat_proj_screen,
            light.position_vec(),
            light.attenuation_radius,
            camera_near_z,
        );
        let (tile_min, tile_max) = clamp_to_tile_range(
            &screen_box,
            tile_size as i32,
            tile_count_x as i32,
            tile_count_y as i32,
        );

        interval.slice_range = depth_extents_calculator.calculate_depth_extents(interval);

        for z in interval.slice_range.slice_min..=interval.slice_range.slice_max {
            for y in tile_min.y..=tile_max.y {
                for x in tile_min.x..=tile_max.x {
                    let tile_index = x + y * tile_count_x;
                    let cell_index = tile_index + z as u32 * tiles_per_slice;
                    cell_light_count[cell_index as usize].fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        LightScreenSpaceExtents {
            screen_box,
            tile_min,
            tile_max,
        }
    }));

    cell_light_count
        .iter()
        .map(|count| count.load(Ordering::Relaxed))
        .sum()
}

/// Fold per-cell counts down to per-tile counts for debug display.
pub fn accumulate_tile_light_counts(
    cell_light_count: &[AtomicU32],
    tiles_per_slice: u32,
    out_tile_light_count: &mut [u32],
) {
    for (cell_index, count) in cell_light_count.iter().enumerate() {
        let tile_index = cell_index % tiles_per_slice as usize;
        out_tile_light_count[tile_index] += count.load(Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::camera::CameraParams;
    use glam::Vec3;

    fn camera_setup(resolution: UVec2) -> (CameraParams, Frustum, Mat4) {
        let camera = CameraParams::default();
        let frustum = Frustum::from_projection(&camera.proj_matrix());
        let mat = camera.screen_space_proj_matrix(resolution);
        (camera, frustum, mat)
    }

    #[test]
    fn test_cull_preserves_light_order() {
        let (_, frustum, _) = camera_setup(UVec2::new(1920, 1080));

        let mut lights = Vec::new();
        for i in 0..200 {
            let visible = i % 3 != 0;
            let x = if visible { 0.0 } else { 100_000.0 };
            lights.push(LightSource::new(
                Vec3::new(x, 0.0, 10.0 + i as f32),
                1.0,
                Vec3::ONE,
            ));
        }

        let mut intervals = Vec::new();
        let count = cull_and_compute_depth_intervals(&frustum, &lights, &mut intervals);

        assert_eq!(count as usize, intervals.len());
        // survivors keep their relative order
        for pair in intervals.windows(2) {
            assert!(pair[0].light_index < pair[1].light_index);
        }
        // every survivor is one of the visible lights
        for interval in &intervals {
            assert!(interval.light_index % 3 != 0);
            assert_eq!(interval.center, 10.0 + interval.light_index as f32);
        }
    }

    #[test]
    fn test_cull_is_conservative_not_exact() {
        let (_, frustum, _) = camera_setup(UVec2::new(1920, 1080));
        // clearly outside
        let lights = [LightSource::new(Vec3::new(0.0, 10_000.0, 10.0), 1.0, Vec3::ONE)];
        let mut intervals = Vec::new();
        assert_eq!(cull_and_compute_depth_intervals(&frustum, &lights, &mut intervals), 0);
    }

    #[test]
    fn test_bin_lights_counts_cover_all_assignments() {
        let resolution = UVec2::new(1920, 1080);
        let (camera, frustum, mat) = camera_setup(resolution);
        let params = LightBuildParams {
            resolution,
            tile_size: 48,
            ..Default::default()
        };
        let tile_count_x = params.tile_count_x();
        let tile_count_y = params.tile_count_y();
        let cell_count = (tile_count_x * tile_count_y * params.slice_count) as usize;

        let lights = [
            LightSource::new(Vec3::new(0.0, 0.0, 50.0), 10.0, Vec3::ONE),
            LightSource::new(Vec3::new(20.0, -5.0, 120.0), 25.0, Vec3::ONE),
        ];

        let mut intervals = Vec::new();
        cull_and_compute_depth_intervals(&frustum, &lights, &mut intervals);
        assert_eq!(intervals.len(), 2);

        let calc = DepthExtentsCalculator::new(&params);
        let mut extents = Vec::new();
        let cell_light_count: Vec<AtomicU32> =
            (0..cell_count).map(|_| AtomicU32::new(0)).collect();

        let total = bin_lights(
            &calc,
            &mat,
            camera.near_z,
            params.tile_size,
            tile_count_x,
            tile_count_y,
            &lights,
            &mut intervals,
            &mut extents,
            &cell_light_count,
        );

        let counted: u32 = cell_light_count
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum();
        assert_eq!(counted, total);
        assert!(total >= 2);

        // the first light spans [40, 60], entirely inside linear slice 1
        assert_eq!(intervals[0].slice_range.slice_min, 1);
        assert_eq!(intervals[0].slice_range.slice_max, 1);

        // its screen box is centered, so its tile range must contain the
        // center tile
        let center_tile = UVec2::new(tile_count_x / 2, tile_count_y / 2);
        assert!(extents[0].tile_min.x <= center_tile.x && center_tile.x <= extents[0].tile_max.x);
        assert!(extents[0].tile_min.y <= center_tile.y && center_tile.y <= extents[0].tile_max.y);
    }

    #[test]
    fn test_accumulate_tile_light_counts() {
        // 2 tiles, 2 slices
        let cell_counts: Vec<AtomicU32> = [1u32, 2, 3, 4].iter().map(|&c| AtomicU32::new(c)).collect();
        let mut tile_counts = [0u32; 2];
        accumulate_tile_light_counts(&cell_counts, 2, &mut tile_counts);
        assert_eq!(tile_counts, [4, 6]);
    }
}
