//! Procedural Light Set Generation
//!
//! Seeded generators for benchmark light sets: uniform placement inside an
//! animation volume, or area-weighted placement on mesh surface triangles.
//! Both derive the attenuation radius from the light's mean intensity, so
//! bright lights reach further.
//!
//! Volume-generated lights bounce around the animation volume along a fixed
//! random direction; `animate_lights` evaluates the bounce analytically from
//! the elapsed time, so any frame is reproducible without integrating.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::binning::MAX_LIGHTS;
use super::distribution::DiscreteDistribution;
use super::light_source::{AnimatedLightSource, LightSource};

/// Attenuation reaches the radius where perceived intensity falls below
/// this threshold.
const ATTENUATION_INTENSITY_THRESHOLD: f32 = 0.025;

/// Axis-aligned volume the animated lights live in.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl LightBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Uniform direction on the unit sphere.
fn generate_direction(rng: &mut StdRng) -> Vec3 {
    let u1: f32 = rng.r#gen();
    let u2: f32 = rng.r#gen();

    let z = 1.0 - 2.0 * u1;
    let r = (1.0f32 - z * z).max(0.0).sqrt();
    let phi = std::f32::consts::TAU * u2;

    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

fn generate_intensity(rng: &mut StdRng, min_intensity: f32, max_intensity: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(min_intensity..=max_intensity),
        rng.gen_range(min_intensity..=max_intensity),
        rng.gen_range(min_intensity..=max_intensity),
    )
}

fn attenuation_radius(intensity: Vec3) -> f32 {
    let mean_intensity = intensity.dot(Vec3::splat(1.0 / 3.0));
    mean_intensity / ATTENUATION_INTENSITY_THRESHOLD.sqrt()
}

fn log_radius_stats(lights: &[AnimatedLightSource]) {
    if lights.is_empty() {
        return;
    }

    let mut min_radius = f32::MAX;
    let mut max_radius = -f32::MAX;
    let mut radius_sum = 0.0f32;
    for light in lights {
        min_radius = min_radius.min(light.light.attenuation_radius);
        max_radius = max_radius.max(light.light.attenuation_radius);
        radius_sum += light.light.attenuation_radius;
    }

    log::info!("Light radius range: {min_radius} .. {max_radius}");
    log::info!("Average light radius: {}", radius_sum / lights.len() as f32);
}

/// Generate `count` lights uniformly inside `bounds`, each with a random
/// bounce direction and a random RGB intensity in
/// `[min_intensity, max_intensity]` per channel.
pub fn generate_lights(
    seed: u64,
    count: u32,
    bounds: &LightBounds,
    min_intensity: f32,
    max_intensity: f32,
) -> Vec<AnimatedLightSource> {
    let mut rng = StdRng::seed_from_u64(seed);

    let light_count = (count as usize).min(MAX_LIGHTS);
    let mut lights = Vec::with_capacity(light_count);

    for _ in 0..light_count {
        let position = Vec3::new(
            rng.gen_range(bounds.min.x..=bounds.max.x),
            rng.gen_range(bounds.min.y..=bounds.max.y),
            rng.gen_range(bounds.min.z..=bounds.max.z),
        );

        // all-positive direction so the mirrored wrap below stays in range
        let movement_direction = generate_direction(&mut rng).abs();

        let intensity = generate_intensity(&mut rng, min_intensity, max_intensity);

        let mut light = AnimatedLightSource::new(LightSource::new(
            position,
            attenuation_radius(intensity),
            intensity,
        ));
        light.movement_direction = movement_direction;
        lights.push(light);
    }

    log_radius_stats(&lights);

    lights
}

/// Generate `count` static lights on a triangle mesh, picking triangles
/// with probability proportional to their area and offsetting each light
/// along the triangle normal by a quarter of its attenuation radius.
///
/// `indices` is a flat triangle list; degenerate triangles are never
/// selected but a selected zero-area triangle is skipped, so the result may
/// hold fewer than `count` lights.
pub fn generate_lights_on_surface(
    seed: u64,
    count: u32,
    positions: &[Vec3],
    indices: &[u32],
    min_intensity: f32,
    max_intensity: f32,
) -> Vec<AnimatedLightSource> {
    let mut rng = StdRng::seed_from_u64(seed);

    let triangle_count = indices.len() / 3;
    if triangle_count == 0 {
        return Vec::new();
    }

    let get_triangle = |triangle_index: usize| -> (Vec3, Vec3, Vec3) {
        let a = positions[indices[triangle_index * 3] as usize];
        let b = positions[indices[triangle_index * 3 + 1] as usize];
        let c = positions[indices[triangle_index * 3 + 2] as usize];
        (a, b, c)
    };

    let (triangle_areas, triangle_normals): (Vec<f32>, Vec<Vec3>) = (0..triangle_count)
        .into_par_iter()
        .map(|triangle_index| {
            let (a, b, c) = get_triangle(triangle_index);
            let cross = (c - a).cross(c - b);
            (cross.length() * 0.5, cross.normalize_or_zero())
        })
        .unzip();

    let triangle_area_sum: f32 = triangle_areas.iter().sum();
    let distribution = DiscreteDistribution::new(&triangle_areas, triangle_area_sum);

    let light_count = (count as usize).min(MAX_LIGHTS);
    let mut lights = Vec::with_capacity(light_count);

    for _ in 0..light_count {
        let triangle_index = distribution.sample(rng.r#gen(), rng.r#gen());
        if triangle_areas[triangle_index] == 0.0 {
            continue;
        }

        let (a, b, c) = get_triangle(triangle_index);

        let intensity = generate_intensity(&mut rng, min_intensity, max_intensity);
        let radius = attenuation_radius(intensity);

        // rejection-sampled barycentrics, uniform over the triangle
        let (u, v) = loop {
            let u: f32 = rng.r#gen();
            let v: f32 = rng.r#gen();
            if u + v <= 1.0 {
                break (u, v);
            }
        };
        let w = 1.0 - u - v;

        let position =
            a * u + b * v + c * w + triangle_normals[triangle_index] * radius * 0.25;

        lights.push(AnimatedLightSource::new(LightSource::new(
            position, radius, intensity,
        )));
    }

    log_radius_stats(&lights);

    lights
}

#[inline]
fn frac(value: f32) -> f32 {
    value - value.floor()
}

/// Move every animated light to its bounced position at `elapsed_time`.
///
/// The original position is normalized into the unit cube, advanced along
/// the movement direction, and folded back with a mirrored wrap whose
/// parity comes from the integer part, giving a continuous ping-pong
/// between the volume walls. Lights with a zero movement direction
/// (surface-generated) stay put.
pub fn animate_lights(lights: &mut [AnimatedLightSource], bounds: &LightBounds, elapsed_time: f32) {
    let world_size = bounds.dimensions();
    let world_offset = bounds.min;

    // y moves far slower than x/z so the swarm mostly sweeps the floor plan
    let animation_speed = Vec3::new(10.0, 0.01, 10.0);

    for light in lights.iter_mut() {
        if light.movement_direction == Vec3::ZERO {
            continue;
        }

        let o = (light.original_position - world_offset) / world_size;
        let p = o + (light.movement_direction * (elapsed_time * animation_speed)) / world_size;

        let fold = |v: f32| -> f32 {
            if (v as i32) % 2 != 0 { frac(v) } else { 1.0 - frac(v) }
        };
        let p = Vec3::new(fold(p.x), fold(p.y), fold(p.z));

        light.light.position = (p * world_size + world_offset).to_array();
    }
}
