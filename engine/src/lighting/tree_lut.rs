//! Breadth-First to Depth-First Traversal Tables
//!
//! A perfect binary tree of a given size always flattens into the same
//! depth-first order with the same skip pointers, regardless of its
//! contents. These tables precompute that mapping for every supported tree
//! size, so flattening a built tree is a single pass: copy the node named
//! by `breadth_first_index` into the next output slot and OR in the
//! template `params` (leaf flag and skip count).
//!
//! Entry `params` uses the packed node layout: bit 31 is the leaf flag and
//! the low 15 bits hold the skip count (the node's subtree size, which is
//! the distance to its depth-first successor outside the subtree). The
//! light count field is zero in the template and comes from the tree node
//! during flattening.

/// One node template of a depth-first linearization.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TreeLutEntry {
    /// Index of the source node in the breadth-first tree
    pub breadth_first_index: u32,
    /// Leaf flag and skip count, pre-packed
    pub params: u32,
}

const fn lut(breadth_first_index: u32, params: u32) -> TreeLutEntry {
    TreeLutEntry {
        breadth_first_index,
        params,
    }
}

/// Start of each level's sub-table inside [`TRAVERSAL_LUT`]. Level `i`
/// covers trees with `2^(i + 1) - 1` nodes.
const LUT_OFFSETS: [usize; 7] = [0, 1, 4, 11, 26, 57, 120];

/// Depth-first templates for all seven tree sizes, concatenated.
const TRAVERSAL_LUT: [TreeLutEntry; 247] = [
    lut(0x00, 0x80000001), lut(0x02, 0x00000003), lut(0x00, 0x80000001), lut(0x01, 0x80000001),
    lut(0x06, 0x00000007), lut(0x04, 0x00000003), lut(0x00, 0x80000001), lut(0x01, 0x80000001),
    lut(0x05, 0x00000003), lut(0x02, 0x80000001), lut(0x03, 0x80000001), lut(0x0e, 0x0000000f),
    lut(0x0c, 0x00000007), lut(0x08, 0x00000003), lut(0x00, 0x80000001), lut(0x01, 0x80000001),
    lut(0x09, 0x00000003), lut(0x02, 0x80000001), lut(0x03, 0x80000001), lut(0x0d, 0x00000007),
    lut(0x0a, 0x00000003), lut(0x04, 0x80000001), lut(0x05, 0x80000001), lut(0x0b, 0x00000003),
    lut(0x06, 0x80000001), lut(0x07, 0x80000001), lut(0x1e, 0x0000001f), lut(0x1c, 0x0000000f),
    lut(0x18, 0x00000007), lut(0x10, 0x00000003), lut(0x00, 0x80000001), lut(0x01, 0x80000001),
    lut(0x11, 0x00000003), lut(0x02, 0x80000001), lut(0x03, 0x80000001), lut(0x19, 0x00000007),
    lut(0x12, 0x00000003), lut(0x04, 0x80000001), lut(0x05, 0x80000001), lut(0x13, 0x00000003),
    lut(0x06, 0x80000001), lut(0x07, 0x80000001), lut(0x1d, 0x0000000f), lut(0x1a, 0x00000007),
    lut(0x14, 0x00000003), lut(0x08, 0x80000001), lut(0x09, 0x80000001), lut(0x15, 0x00000003),
    lut(0x0a, 0x80000001), lut(0x0b, 0x80000001), lut(0x1b, 0x00000007), lut(0x16, 0x00000003),
    lut(0x0c, 0x80000001), lut(0x0d, 0x80000001), lut(0x17, 0x00000003), lut(0x0e, 0x80000001),
    lut(0x0f, 0x80000001), lut(0x3e, 0x0000003f), lut(0x3c, 0x0000001f), lut(0x38, 0x0000000f),
    lut(0x30, 0x00000007), lut(0x20, 0x00000003), lut(0x00, 0x80000001), lut(0x01, 0x80000001),
    lut(0x21, 0x00000003), lut(0x02, 0x80000001), lut(0x03, 0x80000001), lut(0x31, 0x00000007),
    lut(0x22, 0x00000003), lut(0x04, 0x80000001), lut(0x05, 0x80000001), lut(0x23, 0x00000003),
    lut(0x06, 0x80000001), lut(0x07, 0x80000001), lut(0x39, 0x0000000f), lut(0x32, 0x00000007),
    lut(0x24, 0x00000003), lut(0x08, 0x80000001), lut(0x09, 0x80000001), lut(0x25, 0x00000003),
    lut(0x0a, 0x80000001), lut(0x0b, 0x80000001), lut(0x33, 0x00000007), lut(0x26, 0x00000003),
    lut(0x0c, 0x80000001), lut(0x0d, 0x80000001), lut(0x27, 0x00000003), lut(0x0e, 0x80000001),
    lut(0x0f, 0x80000001), lut(0x3d, 0x0000001f), lut(0x3a, 0x0000000f), lut(0x34, 0x00000007),
    lut(0x28, 0x00000003), lut(0x10, 0x80000001), lut(0x11, 0x80000001), lut(0x29, 0x00000003),
    lut(0x12, 0x80000001), lut(0x13, 0x80000001), lut(0x35, 0x00000007), lut(0x2a, 0x00000003),
    lut(0x14, 0x80000001), lut(0x15, 0x80000001), lut(0x2b, 0x00000003), lut(0x16, 0x80000001),
    lut(0x17, 0x80000001), lut(0x3b, 0x0000000f), lut(0x36, 0x00000007), lut(0x2c, 0x00000003),
    lut(0x18, 0x80000001), lut(0x19, 0x80000001), lut(0x2d, 0x00000003), lut(0x1a, 0x80000001),
    lut(0x1b, 0x80000001), lut(0x37, 0x00000007), lut(0x2e, 0x00000003), lut(0x1c, 0x80000001),
    lut(0x1d, 0x80000001), lut(0x2f, 0x00000003), lut(0x1e, 0x80000001), lut(0x1f, 0x80000001),
    lut(0x7e, 0x0000007f), lut(0x7c, 0x0000003f), lut(0x78, 0x0000001f), lut(0x70, 0x0000000f),
    lut(0x60, 0x00000007), lut(0x40, 0x00000003), lut(0x00, 0x80000001), lut(0x01, 0x80000001),
    lut(0x41, 0x00000003), lut(0x02, 0x80000001), lut(0x03, 0x80000001), lut(0x61, 0x00000007),
    lut(0x42, 0x00000003), lut(0x04, 0x80000001), lut(0x05, 0x80000001), lut(0x43, 0x00000003),
    lut(0x06, 0x80000001), lut(0x07, 0x80000001), lut(0x71, 0x0000000f), lut(0x62, 0x00000007),
    lut(0x44, 0x00000003), lut(0x08, 0x80000001), lut(0x09, 0x80000001), lut(0x45, 0x00000003),
    lut(0x0a, 0x80000001), lut(0x0b, 0x80000001), lut(0x63, 0x00000007), lut(0x46, 0x00000003),
    lut(0x0c, 0x80000001), lut(0x0d, 0x80000001), lut(0x47, 0x00000003), lut(0x0e, 0x80000001),
    lut(0x0f, 0x80000001), lut(0x79, 0x0000001f), lut(0x72, 0x0000000f), lut(0x64, 0x00000007),
    lut(0x48, 0x00000003), lut(0x10, 0x80000001), lut(0x11, 0x80000001), lut(0x49, 0x00000003),
    lut(0x12, 0x80000001), lut(0x13, 0x80000001), lut(0x65, 0x00000007), lut(0x4a, 0x00000003),
    lut(0x14, 0x80000001), lut(0x15, 0x80000001), lut(0x4b, 0x00000003), lut(0x16, 0x80000001),
    lut(0x17, 0x80000001), lut(0x73, 0x0000000f), lut(0x66, 0x00000007), lut(0x4c, 0x00000003),
    lut(0x18, 0x80000001), lut(0x19, 0x80000001), lut(0x4d, 0x00000003), lut(0x1a, 0x80000001),
    lut(0x1b, 0x80000001), lut(0x67, 0x00000007), lut(0x4e, 0x00000003), lut(0x1c, 0x80000001),
    lut(0x1d, 0x80000001), lut(0x4f, 0x00000003), lut(0x1e, 0x80000001), lut(0x1f, 0x80000001),
    lut(0x7d, 0x0000003f), lut(0x7a, 0x0000001f), lut(0x74, 0x0000000f), lut(0x68, 0x00000007),
    lut(0x50, 0x00000003), lut(0x20, 0x80000001), lut(0x21, 0x80000001), lut(0x51, 0x00000003),
    lut(0x22, 0x80000001), lut(0x23, 0x80000001), lut(0x69, 0x00000007), lut(0x52, 0x00000003),
    lut(0x24, 0x80000001), lut(0x25, 0x80000001), lut(0x53, 0x00000003), lut(0x26, 0x80000001),
    lut(0x27, 0x80000001), lut(0x75, 0x0000000f), lut(0x6a, 0x00000007), lut(0x54, 0x00000003),
    lut(0x28, 0x80000001), lut(0x29, 0x80000001), lut(0x55, 0x00000003), lut(0x2a, 0x80000001),
    lut(0x2b, 0x80000001), lut(0x6b, 0x00000007), lut(0x56, 0x00000003), lut(0x2c, 0x80000001),
    lut(0x2d, 0x80000001), lut(0x57, 0x00000003), lut(0x2e, 0x80000001), lut(0x2f, 0x80000001),
    lut(0x7b, 0x0000001f), lut(0x76, 0x0000000f), lut(0x6c, 0x00000007), lut(0x58, 0x00000003),
    lut(0x30, 0x80000001), lut(0x31, 0x80000001), lut(0x59, 0x00000003), lut(0x32, 0x80000001),
    lut(0x33, 0x80000001), lut(0x6d, 0x00000007), lut(0x5a, 0x00000003), lut(0x34, 0x80000001),
    lut(0x35, 0x80000001), lut(0x5b, 0x00000003), lut(0x36, 0x80000001), lut(0x37, 0x80000001),
    lut(0x77, 0x0000000f), lut(0x6e, 0x00000007), lut(0x5c, 0x00000003), lut(0x38, 0x80000001),
    lut(0x39, 0x80000001), lut(0x5d, 0x00000003), lut(0x3a, 0x80000001), lut(0x3b, 0x80000001),
    lut(0x6f, 0x00000007), lut(0x5e, 0x00000003), lut(0x3c, 0x80000001), lut(0x3d, 0x80000001),
    lut(0x5f, 0x00000003), lut(0x3e, 0x80000001), lut(0x3f, 0x80000001),];

/// Sub-table for a tree with `total_node_count = 2^(level + 1) - 1` nodes.
pub fn traversal_lut(level: u32) -> &'static [TreeLutEntry] {
    assert!((level as usize) < LUT_OFFSETS.len());
    let offset = LUT_OFFSETS[level as usize];
    let len = (1usize << (level + 1)) - 1;
    &TRAVERSAL_LUT[offset..offset + len]
}
