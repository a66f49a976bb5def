//! Depth Slice Math
//!
//! The view frustum is partitioned along view-space Z into `slice_count`
//! slices, either linearly spaced or exponentially spaced in log2 depth.
//! Slice indices saturate: any depth at or beyond `max_slice_depth` lands in
//! the last slice, so far-away lights are never dropped by slicing alone.

use super::binning::{LightBuildParams, LightDepthInterval};

/// Fixed near boundary for exponential slice spacing. Depths below this all
/// map to slice 0.
pub const MIN_SLICE_DEPTH: f32 = 5.0;

/// Inclusive slice range covered by one light, stored inside
/// [`LightDepthInterval`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightSliceRange {
    pub slice_min: u8,
    pub slice_max: u8,
}

impl LightSliceRange {
    /// Number of slices covered, inclusive of both ends.
    #[inline]
    pub fn slice_count(self) -> u32 {
        1 + (self.slice_max - self.slice_min) as u32
    }
}

#[inline]
pub fn compute_linear_slice_index(depth: f32, max_depth: f32, slice_count: u32) -> u32 {
    let t = slice_count as f32 * depth / max_depth;
    t.min((slice_count - 1) as f32) as u32
}

#[inline]
pub fn compute_linear_slice_depth(slice_index: u32, max_depth: f32, slice_count: u32) -> f32 {
    slice_index as f32 * (max_depth / slice_count as f32)
}

#[inline]
pub fn compute_exponential_slice_index_log(
    log_depth: f32,
    log_min_depth: f32,
    log_max_depth: f32,
    slice_count: u32,
) -> u32 {
    let scale = 1.0 / (log_max_depth - log_min_depth) * (slice_count as f32 - 1.0);
    let bias = 1.0 - log_min_depth * scale;
    let slice = (log_depth * scale + bias).max(0.0) as u32;
    slice.min(slice_count - 1)
}

#[inline]
pub fn compute_exponential_slice_index(depth: f32, max_depth: f32, slice_count: u32) -> u32 {
    compute_exponential_slice_index_log(
        depth.log2(),
        MIN_SLICE_DEPTH.log2(),
        max_depth.log2(),
        slice_count,
    )
}

#[inline]
pub fn compute_exponential_slice_depth(slice_index: u32, max_depth: f32, slice_count: u32) -> f32 {
    let log_min = MIN_SLICE_DEPTH.log2();
    let log_max = max_depth.log2();
    let scale = 1.0 / (log_max - log_min) * (slice_count as f32 - 1.0);
    let bias = 1.0 - log_min * scale;
    ((slice_index as f32 - bias) / scale).exp2()
}

/// Maps clamped light depth intervals to inclusive slice ranges.
///
/// For exponential spacing the slice boundaries are precomputed once per
/// build and looked up by binary search, which sidesteps the per-light
/// `log2` calls of the closed-form index.
pub struct DepthExtentsCalculator {
    slice_boundaries: Vec<f32>,
    max_slice_depth: f32,
    slice_count: u32,
    use_exponential_slices: bool,
}

impl DepthExtentsCalculator {
    pub fn new(params: &LightBuildParams) -> Self {
        let slice_count = params.slice_count;
        let max_slice_depth = params.max_slice_depth;

        let mut slice_boundaries = Vec::with_capacity(slice_count as usize);
        for i in 1..slice_count {
            let d = if params.use_exponential_slices {
                compute_exponential_slice_depth(i, max_slice_depth, slice_count)
            } else {
                compute_linear_slice_depth(i, max_slice_depth, slice_count)
            };
            slice_boundaries.push(d);
        }
        // Sentinel so lower_bound never walks off the end
        slice_boundaries.push(f32::MAX);

        Self {
            slice_boundaries,
            max_slice_depth,
            slice_count,
            use_exponential_slices: params.use_exponential_slices,
        }
    }

    pub fn calculate_depth_extents(&self, interval: &LightDepthInterval) -> LightSliceRange {
        let depth_min = (interval.center - interval.radius).max(0.0);
        let depth_max = (interval.center + interval.radius).min(self.max_slice_depth);

        if self.use_exponential_slices {
            let slice_min = self.slice_boundaries.partition_point(|&d| d < depth_min);
            let slice_max = slice_min
                + self.slice_boundaries[slice_min..].partition_point(|&d| d < depth_max);
            LightSliceRange {
                slice_min: slice_min as u8,
                slice_max: slice_max as u8,
            }
        } else {
            LightSliceRange {
                slice_min: compute_linear_slice_index(depth_min, self.max_slice_depth, self.slice_count)
                    as u8,
                slice_max: compute_linear_slice_index(depth_max, self.max_slice_depth, self.slice_count)
                    as u8,
            }
        }
    }
}
