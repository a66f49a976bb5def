//! Light Tree Nodes
//!
//! Per-cell light trees are perfect binary trees over depth-sorted light
//! intervals. They are built bottom-up in breadth-first order (leaves
//! first, root last) and then flattened into the depth-first,
//! skip-pointer layout the GPU traverses, using the precomputed templates
//! in [`tree_lut`](super::tree_lut).
//!
//! Packed node layout (16 bytes):
//! - center:       f32 - interval midpoint in view-space depth
//! - radius:       f32 - interval half extent
//! - light_offset: u32 - first light index slot covered by the node
//! - params:       u32 - bit 31 leaf flag, bits 15..31 light count,
//!   bits 0..15 skip count

use super::binning::LightDepthInterval;
use super::div_up;
use super::tree_lut::traversal_lut;

/// Depth of the deepest supported tree, counting the leaf level.
pub const MAX_BOTTOM_UP_TREE_LEVELS: u32 = 7;
/// Limit tree size to something sensible that fits into LDS.
pub const MAX_LEAF_NODES: u32 = 1 << (MAX_BOTTOM_UP_TREE_LEVELS - 1);
pub const MAX_TOTAL_NODES: u32 = MAX_LEAF_NODES * 2 - 1;

/// Working node during bottom-up construction.
#[derive(Copy, Clone, Debug)]
pub struct LightTreeNode {
    pub light_offset: u32,
    pub light_count: u32,
    pub is_leaf: bool,
    pub depth_min: f32,
    pub depth_max: f32,
}

impl Default for LightTreeNode {
    fn default() -> Self {
        Self {
            light_offset: 0,
            light_count: 0,
            is_leaf: true,
            // inverted interval, so min/max folds just work
            depth_min: f32::MAX / 2.0,
            depth_max: -f32::MAX / 2.0,
        }
    }
}

/// GPU node: depth interval plus packed traversal metadata.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedLightTreeNode {
    pub center: f32,
    pub radius: f32,
    pub light_offset: u32,
    pub params: u32,
}

const _: () = {
    assert!(
        std::mem::size_of::<PackedLightTreeNode>() == 16,
        "PackedLightTreeNode must be 16 bytes for GPU layout"
    );
};

#[inline]
pub fn pack_node_params(light_count: u32, is_leaf: bool, skip_count: u32) -> u32 {
    debug_assert!(light_count < 1 << 16);
    debug_assert!(skip_count <= 0x7FFF);
    ((is_leaf as u32) << 31) | (light_count << 15) | (skip_count & 0x7FFF)
}

impl PackedLightTreeNode {
    #[inline]
    pub fn light_count(&self) -> u32 {
        (self.params >> 15) & 0xFFFF
    }

    #[inline]
    pub fn skip_count(&self) -> u32 {
        self.params & 0x7FFF
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        (self.params & 0x8000_0000) != 0
    }
}

/// A single-node "tree" holding a flat light list. The unbounded depth
/// interval makes GPU traversal visit every light, and the saturated skip
/// count terminates it immediately after.
pub fn pack_list_node(light_offset: u32, light_count: u32) -> PackedLightTreeNode {
    let depth_min = -f32::MAX / 2.0;
    let depth_max = f32::MAX / 2.0;
    PackedLightTreeNode {
        center: (depth_min + depth_max) / 2.0,
        radius: (depth_max - depth_min) / 2.0,
        light_offset,
        params: pack_node_params(light_count, true, 0x7FFF),
    }
}

/// Tree dimensions for a given cell light count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LightTreeInfo {
    pub total_node_count: u32,
    pub leaf_node_count: u32,
}

/// Knobs for per-cell tree construction.
#[derive(Copy, Clone, Debug)]
pub struct TreeBuildParams {
    pub max_leaf_nodes: u32,
    pub min_lights_per_leaf: u32,
}

impl Default for TreeBuildParams {
    fn default() -> Self {
        Self {
            max_leaf_nodes: MAX_LEAF_NODES,
            min_lights_per_leaf: 8,
        }
    }
}

/// Leaf count is the light count divided by the per-leaf target, rounded
/// up to a power of two and clamped to the configured maximum.
pub fn build_light_tree_info(params: &TreeBuildParams, light_count: u32) -> LightTreeInfo {
    let target_leaf_node_count = div_up(light_count, params.min_lights_per_leaf);
    let leaf_node_count = target_leaf_node_count
        .next_power_of_two()
        .min(params.max_leaf_nodes);

    LightTreeInfo {
        leaf_node_count,
        total_node_count: leaf_node_count * 2 - 1,
    }
}

/// Build one cell's tree, writing the depth-first flattened nodes into
/// `out_depth_first_tree`. Returns the node count written.
///
/// `interval_indices` is this cell's slice of sorted interval indices
/// (`light_count` entries addressing `intervals`); `light_offset` is where
/// that slice starts in the global index array and only lands in the
/// nodes' `light_offset` fields. Lights must already be approximately
/// sorted by depth so that leaf ranges form tight intervals.
pub fn build_light_tree_bottom_up(
    params: &TreeBuildParams,
    intervals: &[LightDepthInterval],
    interval_indices: &[u16],
    light_offset: u32,
    light_count: u32,
    out_depth_first_tree: &mut [PackedLightTreeNode],
) -> u32 {
    let tree_info = build_light_tree_info(params, light_count);
    debug_assert!(tree_info.total_node_count <= MAX_TOTAL_NODES);
    debug_assert!(out_depth_first_tree.len() >= tree_info.total_node_count as usize);

    let mut breadth_first_tree = [LightTreeNode::default(); MAX_TOTAL_NODES as usize];

    // Assign lights to leaf nodes

    let lights_per_node = div_up(light_count, tree_info.leaf_node_count);
    let used_leaf_node_count = div_up(light_count, lights_per_node);

    let mut assigned_lights = 0;

    for leaf_node_index in 0..used_leaf_node_count {
        let node_light_count = lights_per_node.min(light_count - assigned_lights);

        let local_offset = leaf_node_index * lights_per_node;
        let leaf_node = &mut breadth_first_tree[leaf_node_index as usize];
        leaf_node.light_offset = light_offset + local_offset;
        leaf_node.light_count = node_light_count;

        for i in 0..node_light_count {
            let interval = &intervals[interval_indices[(local_offset + i) as usize] as usize];
            leaf_node.depth_min = leaf_node.depth_min.min(interval.center - interval.radius);
            leaf_node.depth_max = leaf_node.depth_max.max(interval.center + interval.radius);
        }

        assigned_lights += node_light_count;
    }

    debug_assert_eq!(assigned_lights, light_count);

    // Ensure that all leaf level nodes are initialized

    for leaf_node_index in used_leaf_node_count..tree_info.leaf_node_count {
        let mut leaf_node = breadth_first_tree[used_leaf_node_count as usize - 1];
        leaf_node.light_count = 0;
        leaf_node.depth_max = leaf_node.depth_min;
        breadth_first_tree[leaf_node_index as usize] = leaf_node;
    }

    // Go through upper levels of the tree and compute their metadata

    for current_node_index in tree_info.leaf_node_count..tree_info.total_node_count {
        let left_index = (current_node_index << 1) & tree_info.total_node_count;
        let right_index = left_index + 1;

        let left_node = breadth_first_tree[left_index as usize];
        let right_node = breadth_first_tree[right_index as usize];

        debug_assert!(left_node.light_offset <= right_node.light_offset);

        breadth_first_tree[current_node_index as usize] = LightTreeNode {
            light_offset: left_node.light_offset,
            light_count: left_node.light_count + right_node.light_count,
            is_leaf: false,
            depth_min: left_node.depth_min.min(right_node.depth_min),
            depth_max: left_node.depth_max.max(right_node.depth_max),
        };
    }

    // Convert breadth-first tree into depth-first with skip pointers using
    // the precomputed LUT

    let lut = traversal_lut(tree_info.total_node_count.ilog2());

    for (df_node, template) in out_depth_first_tree[..tree_info.total_node_count as usize]
        .iter_mut()
        .zip(lut)
    {
        let bf_node = &breadth_first_tree[template.breadth_first_index as usize];
        df_node.center = (bf_node.depth_min + bf_node.depth_max) / 2.0;
        df_node.radius = (bf_node.depth_max - bf_node.depth_min) / 2.0;
        df_node.light_offset = bf_node.light_offset;
        df_node.params = pack_node_params(bf_node.light_count, false, 0) | template.params;
    }

    tree_info.total_node_count
}
