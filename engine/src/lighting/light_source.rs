//! Light Source Data Structures
//!
//! GPU-compatible light source representation shared by both light builders.
//! Lights live in a persistent world-space array (`AnimatedLightSource`) and
//! are transformed into a view-space `LightSource` list once per frame; the
//! builders only ever see the view-space list.

use glam::{Mat4, Vec3};
use rayon::prelude::*;

/// GPU-compatible point light source in view space.
///
/// Layout (32 bytes, two 16-byte rows):
/// - position:           vec3<f32> (12 bytes) - view-space position
/// - attenuation_radius: f32 (4 bytes) - distance at which contribution ends
/// - intensity:          vec3<f32> (12 bytes) - RGB intensity
/// - _pad:               f32 (4 bytes) - row alignment padding
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightSource {
    /// Position in view space (x, y, z with +z into the screen)
    pub position: [f32; 3],
    /// Attenuation end radius; the light's sphere of influence
    pub attenuation_radius: f32,
    /// RGB intensity
    pub intensity: [f32; 3],
    /// Padding for 16-byte row alignment
    pub _pad: f32,
}

const _: () = {
    assert!(
        std::mem::size_of::<LightSource>() == 32,
        "LightSource must be 32 bytes for GPU layout"
    );
};

static_assertions::assert_eq_align!(LightSource, f32);

impl Default for LightSource {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            attenuation_radius: 0.0,
            intensity: [0.0; 3],
            _pad: 0.0,
        }
    }
}

impl LightSource {
    /// Create a light at a position with the given radius and intensity.
    pub fn new(position: Vec3, attenuation_radius: f32, intensity: Vec3) -> Self {
        Self {
            position: position.to_array(),
            attenuation_radius,
            intensity: intensity.to_array(),
            _pad: 0.0,
        }
    }

    /// Position as a vector.
    #[inline]
    pub fn position_vec(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// A world-space light plus the state needed to animate it.
///
/// The shared light data is embedded by value rather than inherited; the
/// animation fields never reach the GPU.
#[derive(Copy, Clone, Debug)]
pub struct AnimatedLightSource {
    /// Current world-space light state (position is world space here)
    pub light: LightSource,
    /// Spawn position the animation is relative to
    pub original_position: Vec3,
    /// Normalized movement direction; zero means the light is static
    pub movement_direction: Vec3,
}

impl AnimatedLightSource {
    pub fn new(light: LightSource) -> Self {
        Self {
            light,
            original_position: light.position_vec(),
            movement_direction: Vec3::ZERO,
        }
    }
}

/// Refresh the per-frame view-space light list from the world-space set.
///
/// Runs in parallel; output order matches input order. The output vector is
/// cleared and refilled, reusing its allocation across frames.
pub fn to_view_space(
    world_lights: &[AnimatedLightSource],
    mat_view: &Mat4,
    out_view_lights: &mut Vec<LightSource>,
) {
    out_view_lights.clear();
    out_view_lights.par_extend(world_lights.par_iter().map(|world| {
        let mut light = world.light;
        light.position = mat_view
            .transform_point3(world.light.position_vec())
            .to_array();
        light
    }));
}
