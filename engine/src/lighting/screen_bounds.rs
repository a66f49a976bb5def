//! Projected Sphere Bounds
//!
//! Computes a tight screen-space bounding box for a view-space sphere using
//! the tangent-line method from "2D Polyhedral Bounds of a Clipped,
//! Perspective-Projected 3D Sphere" (<http://jcgt.org/published/0002/02/05/>).
//! The box is exact up to near-plane clipping, much tighter than projecting
//! an axis-aligned box around the sphere, which matters directly for how
//! many tiles each light gets binned into.

use glam::{IVec2, Mat4, UVec2, Vec2, Vec3};

/// Screen-space rectangle in pixel coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ScreenSpaceBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl ScreenSpaceBox {
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// View-space bounds of a sphere along one screen axis.
///
/// Returns `(lower, upper)` points on the sphere silhouette, in view space,
/// whose projections bound the sphere on that axis. `axis` must be the
/// view-space X or Y unit vector.
fn bounds_for_axis(axis: Vec3, center: Vec3, radius: f32, near_z: f32) -> (Vec3, Vec3) {
    // 2D problem in the axis-z plane
    let c = Vec2::new(axis.dot(center), center.z);

    let radius_squared = radius * radius;
    let t_squared = c.dot(c) - radius_squared;
    let camera_inside_sphere = t_squared <= 0.0;

    // (cos, sin) of the angle between c and a tangent vector
    let mut v = if camera_inside_sphere {
        Vec2::ZERO
    } else {
        Vec2::new(t_squared.sqrt(), radius) / c.length()
    };

    // does the near plane intersect the sphere?
    let clip_sphere = center.z - radius <= near_z;

    // square root of the discriminant; NaN (and unused) if the camera is
    // inside the sphere
    let mut k = (radius_squared - (center.z - near_z) * (center.z - near_z)).sqrt();

    let mut bounds = [Vec2::ZERO; 2];
    for bound in &mut bounds {
        if !camera_inside_sphere {
            // rotate c by -/+ theta and scale down to the tangent point;
            // the first pass (v.y > 0) yields the upper bound
            *bound = Vec2::new(v.x * c.x + v.y * c.y, -v.y * c.x + v.x * c.y) * v.x;
        }

        let clip_bound = camera_inside_sphere || bound.y < near_z;
        if clip_sphere && clip_bound {
            *bound = Vec2::new(c.x + k, near_z);
        }

        // set up for the lower bound
        v.y = -v.y;
        k = -k;
    }

    let mut lower = bounds[1].x * axis;
    lower.z = bounds[1].y;
    let mut upper = bounds[0].x * axis;
    upper.z = bounds[0].y;

    (lower, upper)
}

/// Screen-space box of a view-space sphere.
///
/// `mat_proj_screen` maps view space directly to pixel coordinates (+Y
/// down), so the upper view-space Y bound yields the top of the box.
pub fn compute_projected_bounding_box(
    mat_proj_screen: &Mat4,
    center: Vec3,
    radius: f32,
    near_z: f32,
) -> ScreenSpaceBox {
    let (left, right) = bounds_for_axis(Vec3::X, center, radius, near_z);
    let (bottom, top) = bounds_for_axis(Vec3::Y, center, radius, near_z);

    ScreenSpaceBox {
        min: Vec2::new(
            mat_proj_screen.project_point3(left).x,
            mat_proj_screen.project_point3(top).y,
        ),
        max: Vec2::new(
            mat_proj_screen.project_point3(right).x,
            mat_proj_screen.project_point3(bottom).y,
        ),
    }
}

/// Clamp a screen-space box to an inclusive tile index range.
///
/// Pixel coordinates truncate toward zero before the divide, matching the
/// GPU-side tile addressing.
pub fn clamp_to_tile_range(
    screen_box: &ScreenSpaceBox,
    tile_size: i32,
    tile_count_x: i32,
    tile_count_y: i32,
) -> (UVec2, UVec2) {
    let clamp = |value: f32, count: i32| (value as i32 / tile_size).clamp(0, count - 1);

    let tile_min = IVec2::new(
        clamp(screen_box.min.x, tile_count_x),
        clamp(screen_box.min.y, tile_count_y),
    );
    let tile_max = IVec2::new(
        clamp(screen_box.max.x, tile_count_x),
        clamp(screen_box.max.y, tile_count_y),
    );

    (tile_min.as_uvec2(), tile_max.as_uvec2())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::camera::CameraParams;
    use glam::UVec2;

    fn setup() -> (CameraParams, Mat4) {
        let camera = CameraParams::default();
        let mat = camera.screen_space_proj_matrix(UVec2::new(1920, 1080));
        (camera, mat)
    }

    #[test]
    fn test_centered_sphere_box_is_symmetric() {
        let (camera, mat) = setup();
        let b = compute_projected_bounding_box(&mat, Vec3::new(0.0, 0.0, 100.0), 10.0, camera.near_z);
        assert!((b.center().x - 960.0).abs() < 0.5);
        assert!((b.center().y - 540.0).abs() < 0.5);
        assert!(b.max.x > b.min.x);
        assert!(b.max.y > b.min.y);
    }

    #[test]
    fn test_box_contains_all_sphere_point_projections() {
        let (camera, mat) = setup();

        let spheres = [
            (Vec3::new(0.0, 0.0, 100.0), 10.0),
            (Vec3::new(30.0, -12.0, 80.0), 7.5),
            (Vec3::new(-25.0, 18.0, 60.0), 15.0),
            (Vec3::new(5.0, 5.0, 12.0), 3.0),
        ];

        for (center, radius) in spheres {
            let b = compute_projected_bounding_box(&mat, center, radius, camera.near_z);
            // dense sampling of the sphere surface
            for i in 0..64 {
                for j in 0..32 {
                    let phi = std::f32::consts::TAU * i as f32 / 64.0;
                    let theta = std::f32::consts::PI * j as f32 / 32.0;
                    let p = center
                        + radius
                            * Vec3::new(
                                theta.sin() * phi.cos(),
                                theta.sin() * phi.sin(),
                                theta.cos(),
                            );
                    if p.z <= camera.near_z {
                        continue;
                    }
                    let s = mat.project_point3(p);
                    assert!(
                        s.x >= b.min.x - 0.1 && s.x <= b.max.x + 0.1,
                        "x {} outside [{}, {}] for sphere {center:?} r={radius}",
                        s.x,
                        b.min.x,
                        b.max.x
                    );
                    assert!(
                        s.y >= b.min.y - 0.1 && s.y <= b.max.y + 0.1,
                        "y {} outside [{}, {}] for sphere {center:?} r={radius}",
                        s.y,
                        b.min.y,
                        b.max.y
                    );
                }
            }
        }
    }

    #[test]
    fn test_box_is_ordered_for_off_axis_spheres() {
        let (camera, mat) = setup();
        // min must stay below max on both axes wherever the sphere sits,
        // otherwise the tile range collapses and the light bins nowhere
        let spheres = [
            (Vec3::new(0.0, 0.0, 100.0), 10.0),
            (Vec3::new(40.0, 0.0, 60.0), 10.0),
            (Vec3::new(-35.0, 22.0, 90.0), 6.0),
            (Vec3::new(12.0, -30.0, 45.0), 4.0),
        ];
        for (center, radius) in spheres {
            let b = compute_projected_bounding_box(&mat, center, radius, camera.near_z);
            assert!(b.min.x < b.max.x, "inverted x box for {center:?}");
            assert!(b.min.y < b.max.y, "inverted y box for {center:?}");

            let (tile_min, tile_max) = clamp_to_tile_range(&b, 48, 40, 23);
            assert!(tile_min.x <= tile_max.x && tile_min.y <= tile_max.y);
        }
    }

    #[test]
    fn test_tangent_bounds_sit_between_chord_and_cube() {
        let (camera, mat) = setup();
        // the chord projection (center +/- radius along the axis)
        // under-estimates the silhouette of an off-axis sphere; the
        // projected bounding cube over-estimates it
        let center = Vec3::new(40.0, 0.0, 60.0);
        let radius = 10.0;
        let b = compute_projected_bounding_box(&mat, center, radius, camera.near_z);

        let chord_left = mat.project_point3(center - Vec3::new(radius, 0.0, 0.0)).x;
        let chord_right = mat.project_point3(center + Vec3::new(radius, 0.0, 0.0)).x;
        assert!(b.min.x <= chord_left + 0.5);
        assert!(b.max.x >= chord_right - 0.5);

        let mut cube_left = f32::MAX;
        let mut cube_right = -f32::MAX;
        for corner in 0..8 {
            let offset = Vec3::new(
                if corner & 1 != 0 { radius } else { -radius },
                if corner & 2 != 0 { radius } else { -radius },
                if corner & 4 != 0 { radius } else { -radius },
            );
            let s = mat.project_point3(center + offset).x;
            cube_left = cube_left.min(s);
            cube_right = cube_right.max(s);
        }
        assert!(b.min.x >= cube_left - 0.5);
        assert!(b.max.x <= cube_right + 0.5);
    }

    #[test]
    fn test_near_clipped_sphere_stays_finite() {
        let (camera, mat) = setup();
        // sphere straddling the near plane
        let center = Vec3::new(0.0, 0.0, camera.near_z + 1.0);
        let b = compute_projected_bounding_box(&mat, center, 5.0, camera.near_z);
        assert!(b.min.x.is_finite() && b.max.x.is_finite());
        assert!(b.min.y.is_finite() && b.max.y.is_finite());
        assert!(b.min.x < b.max.x);
    }

    #[test]
    fn test_tile_range_clamps_to_grid() {
        let screen_box = ScreenSpaceBox {
            min: Vec2::new(-100.0, 30.0),
            max: Vec2::new(5000.0, 70.0),
        };
        let (tile_min, tile_max) = clamp_to_tile_range(&screen_box, 48, 40, 23);
        assert_eq!(tile_min, UVec2::new(0, 0));
        assert_eq!(tile_max, UVec2::new(39, 1));
    }
}
