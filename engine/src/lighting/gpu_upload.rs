//! Lighting Shader Bindings and Buffer Upload
//!
//! Storage buffers and bind group plumbing for the shading pass that
//! consumes the CPU-built light structures. Both builders feed the same
//! four bindings; clustered output leaves the tree buffer holding its
//! single padding node.
//!
//! ## Bind Group Layout
//!
//! | Binding | Type | Access | Description |
//! |---------|------|--------|-------------|
//! | 0 | Storage Buffer | Read-only | View-space lights (32 bytes each) |
//! | 1 | Storage Buffer | Read-only | Light grid cells (16 bytes each) |
//! | 2 | Storage Buffer | Read-only | Light index slots (u16, tightly packed) |
//! | 3 | Storage Buffer | Read-only | Packed tree nodes (16 bytes each) |
//!
//! Buffer contents change size every frame, so each buffer grows on demand
//! and the caller recreates the bind group whenever an upload reports a
//! reallocation.

use std::borrow::Cow;

use super::clustered::LightGridCell;
use super::light_source::LightSource;
use super::light_tree::PackedLightTreeNode;
use super::tree_builder::TreeLightGridCell;

// ============================================================================
// Element Size Constants
// ============================================================================

/// Size of one light in bytes (32 bytes, 2 rows of 16)
pub const LIGHT_SOURCE_SIZE: usize = std::mem::size_of::<LightSource>();

/// Size of one grid cell in bytes (16 bytes, both builders)
pub const LIGHT_GRID_CELL_SIZE: usize = std::mem::size_of::<LightGridCell>();

/// Size of one packed tree node in bytes (16 bytes)
pub const TREE_NODE_SIZE: usize = std::mem::size_of::<PackedLightTreeNode>();

const _: () = {
    assert!(LIGHT_SOURCE_SIZE == 32);
    assert!(LIGHT_GRID_CELL_SIZE == 16);
    assert!(std::mem::size_of::<TreeLightGridCell>() == LIGHT_GRID_CELL_SIZE);
    assert!(TREE_NODE_SIZE == 16);
};

// ============================================================================
// Upload Payload Preparation
// ============================================================================

/// Bytes of `data` ready for `write_buffer`: never empty (one zeroed
/// element instead) and always a multiple of 4 bytes, padding with zeros
/// when the element size leaves a remainder (u16 index slots).
fn upload_bytes<T: bytemuck::Pod>(data: &[T]) -> Cow<'_, [u8]> {
    if data.is_empty() {
        return Cow::Owned(vec![0u8; std::mem::size_of::<T>().next_multiple_of(4)]);
    }

    let bytes = bytemuck::cast_slice(data);
    if bytes.len() % 4 == 0 {
        Cow::Borrowed(bytes)
    } else {
        let mut padded = bytes.to_vec();
        padded.resize(bytes.len().next_multiple_of(4), 0);
        Cow::Owned(padded)
    }
}

// ============================================================================
// Growable Storage Buffer
// ============================================================================

/// A storage buffer that reallocates to the next power of two when an
/// upload does not fit.
pub struct GrowableStorageBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    label: &'static str,
}

impl GrowableStorageBuffer {
    pub fn new(device: &wgpu::Device, label: &'static str, capacity: u64) -> Self {
        Self {
            buffer: Self::create(device, label, capacity),
            capacity,
            label,
        }
    }

    fn create(device: &wgpu::Device, label: &'static str, capacity: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Upload `data`, growing the buffer first if needed. Returns the byte
    /// count written and whether the buffer was reallocated (stale bind
    /// groups must be recreated).
    pub fn write<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
    ) -> (u64, bool) {
        let bytes = upload_bytes(data);
        let size = bytes.len() as u64;

        let reallocated = size > self.capacity;
        if reallocated {
            self.capacity = size.next_power_of_two();
            self.buffer = Self::create(device, self.label, self.capacity);
            log::debug!("{} grown to {} bytes", self.label, self.capacity);
        }

        queue.write_buffer(&self.buffer, 0, &bytes);
        (size, reallocated)
    }
}

// ============================================================================
// Lighting Buffer Set
// ============================================================================

/// Bytes uploaded in one frame, for the stats overlay.
#[derive(Copy, Clone, Debug, Default)]
pub struct LightingUploadStats {
    pub light_bytes: u64,
    pub grid_bytes: u64,
    pub index_bytes: u64,
    pub tree_bytes: u64,
    /// Any buffer was reallocated; the bind group is stale
    pub reallocated: bool,
}

impl LightingUploadStats {
    pub fn total_bytes(&self) -> u64 {
        self.light_bytes + self.grid_bytes + self.index_bytes + self.tree_bytes
    }
}

/// The four storage buffers behind the lighting bind group.
pub struct LightingBuffers {
    pub lights: GrowableStorageBuffer,
    pub light_grid: GrowableStorageBuffer,
    pub light_indices: GrowableStorageBuffer,
    pub tree_nodes: GrowableStorageBuffer,
}

impl LightingBuffers {
    /// Allocate initial buffers sized for `max_lights` lights and
    /// `cell_count` grid cells; index and tree buffers start small and
    /// grow with the scene.
    pub fn new(device: &wgpu::Device, max_lights: u32, cell_count: u32) -> Self {
        Self {
            lights: GrowableStorageBuffer::new(
                device,
                "Light Buffer",
                (max_lights as u64).max(1) * LIGHT_SOURCE_SIZE as u64,
            ),
            light_grid: GrowableStorageBuffer::new(
                device,
                "Light Grid Buffer",
                (cell_count as u64).max(1) * LIGHT_GRID_CELL_SIZE as u64,
            ),
            light_indices: GrowableStorageBuffer::new(
                device,
                "Light Index Buffer",
                (max_lights as u64).max(1) * 8 * std::mem::size_of::<u16>() as u64,
            ),
            tree_nodes: GrowableStorageBuffer::new(
                device,
                "Light Tree Buffer",
                (max_lights as u64).max(1) * TREE_NODE_SIZE as u64,
            ),
        }
    }

    /// Upload one frame of clustered builder output. The tree buffer is
    /// left untouched; the shading shader ignores it in clustered mode.
    pub fn upload_clustered(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view_space_lights: &[LightSource],
        light_grid: &[LightGridCell],
        light_indices: &[u16],
    ) -> LightingUploadStats {
        let mut stats = LightingUploadStats::default();
        let mut reallocated = false;

        let (bytes, grown) = self.lights.write(device, queue, view_space_lights);
        stats.light_bytes = bytes;
        reallocated |= grown;

        let (bytes, grown) = self.light_grid.write(device, queue, light_grid);
        stats.grid_bytes = bytes;
        reallocated |= grown;

        let (bytes, grown) = self.light_indices.write(device, queue, light_indices);
        stats.index_bytes = bytes;
        reallocated |= grown;

        stats.reallocated = reallocated;
        stats
    }

    /// Upload one frame of tiled tree builder output.
    pub fn upload_tree(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view_space_lights: &[LightSource],
        light_grid: &[TreeLightGridCell],
        light_indices: &[u16],
        tree_nodes: &[PackedLightTreeNode],
    ) -> LightingUploadStats {
        let mut stats = LightingUploadStats::default();
        let mut reallocated = false;

        let (bytes, grown) = self.lights.write(device, queue, view_space_lights);
        stats.light_bytes = bytes;
        reallocated |= grown;

        let (bytes, grown) = self.light_grid.write(device, queue, light_grid);
        stats.grid_bytes = bytes;
        reallocated |= grown;

        let (bytes, grown) = self.light_indices.write(device, queue, light_indices);
        stats.index_bytes = bytes;
        reallocated |= grown;

        let (bytes, grown) = self.tree_nodes.write(device, queue, tree_nodes);
        stats.tree_bytes = bytes;
        reallocated |= grown;

        stats.reallocated = reallocated;
        stats
    }
}

// ============================================================================
// Bind Group Layout and Creation
// ============================================================================

fn read_only_storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Create the bind group layout for the lighting shading pass.
pub fn create_lighting_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Lighting Bind Group Layout"),
        entries: &[
            read_only_storage_entry(0),
            read_only_storage_entry(1),
            read_only_storage_entry(2),
            read_only_storage_entry(3),
        ],
    })
}

/// Create the bind group tying the lighting buffers to the shading pass.
/// Must be re-created after any upload that reports `reallocated`.
pub fn create_lighting_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffers: &LightingBuffers,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Lighting Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffers.lights.buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: buffers.light_grid.buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: buffers.light_indices.buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: buffers.tree_nodes.buffer().as_entire_binding(),
            },
        ],
    })
}
