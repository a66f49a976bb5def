//! Frustum and Sphere Intersection Tests
//!
//! Two levels of culling share this module: a conservative 6-plane camera
//! frustum test used to reject lights before binning, and per-tile frustum
//! tests used to drop lights from individual tiles their screen-space box
//! touches but their sphere does not.
//!
//! Tile frustums are described in view space by four unnormalized corner
//! rays (top-left, top-right, bottom-left, bottom-right at unit depth) and
//! four side plane normals (left, top, right, bottom) passing through the
//! camera origin.

use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};

// ============================================================================
// Camera frustum
// ============================================================================

/// View-space frustum as six planes extracted from a projection matrix.
///
/// Plane equation is `normal . p + d >= 0` for points inside.
#[derive(Copy, Clone, Debug)]
pub struct Frustum {
    /// left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract planes from a projection matrix with [0, 1] depth range.
    pub fn from_projection(mat_proj: &Mat4) -> Self {
        let r0 = mat_proj.row(0);
        let r1 = mat_proj.row(1);
        let r2 = mat_proj.row(2);
        let r3 = mat_proj.row(3);

        let planes = [
            normalize_plane(r3 + r0),
            normalize_plane(r3 - r0),
            normalize_plane(r3 + r1),
            normalize_plane(r3 - r1),
            normalize_plane(r2),
            normalize_plane(r3 - r2),
        ];

        Self { planes }
    }

    /// True if the sphere may intersect the frustum. Conservative: never
    /// rejects an intersecting sphere, may accept a near miss outside a
    /// frustum corner.
    pub fn intersect_sphere_conservative(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.dot(center.extend(1.0)) >= -radius)
    }
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    plane / plane.xyz().length()
}

// ============================================================================
// Tile frustums
// ============================================================================

#[inline]
pub fn dot_xz(a: Vec3, b: Vec3) -> f32 {
    a.x * b.x + a.z * b.z
}

#[inline]
pub fn dot_yz(a: Vec3, b: Vec3) -> f32 {
    a.y * b.y + a.z * b.z
}

/// Sphere vs ray from the origin along an unnormalized direction: true if
/// the closest point on the forward half of the ray is inside the sphere.
#[inline]
pub fn test_unnorm_ray_sphere(ray: Vec3, center: Vec3, radius: f32) -> bool {
    let projected = ray * (center.dot(ray).max(0.0) / ray.dot(ray));
    let to_center = center - projected;
    to_center.dot(to_center) < radius * radius
}

/// Corner rays and side planes for one tile.
///
/// `camera_top_left` is the frustum top-left corner direction at unit depth,
/// `tile_step` the per-tile step in that space (negative y, screen y grows
/// down), `tile_top_left` the tile coordinate.
pub fn compute_tile_frustum_parameters(
    camera_top_left: Vec2,
    tile_step: Vec2,
    tile_top_left: Vec2,
) -> ([Vec3; 4], [Vec3; 4]) {
    let corner = |offset: Vec2| {
        let xy = camera_top_left + tile_step * (tile_top_left + offset);
        Vec3::new(xy.x, xy.y, 1.0)
    };

    let corners = [
        corner(Vec2::new(0.0, 0.0)), // top-left
        corner(Vec2::new(1.0, 0.0)), // top-right
        corner(Vec2::new(0.0, 1.0)), // bottom-left
        corner(Vec2::new(1.0, 1.0)), // bottom-right
    ];

    let planes = [
        corners[0].cross(corners[2]).normalize(), // left
        corners[1].cross(corners[0]).normalize(), // top
        corners[3].cross(corners[1]).normalize(), // right
        corners[2].cross(corners[3]).normalize(), // bottom
    ];

    (corners, planes)
}

/// Exact sphere vs tile frustum test.
///
/// Classifies the sphere center against the four side planes, finds the
/// nearest plane, and projects the center onto it to decide between a
/// single plane distance test and a corner ray test. Side planes are
/// axis-aligned enough that 2D dot products suffice.
pub fn test_tile_frustum_sphere(
    corner_rays: &[Vec3; 4],
    side_planes: &[Vec3; 4],
    center: Vec3,
    radius: f32,
) -> bool {
    let dp = [
        dot_xz(side_planes[0], center),
        dot_yz(side_planes[1], center),
        dot_xz(side_planes[2], center),
        dot_yz(side_planes[3], center),
    ];

    let min_dot_a = dp[0].min(dp[1]).min(dp[2].min(dp[3]));

    let (min_dot_b, corner_ray);
    if min_dot_a == dp[0] {
        // sphere is on the left, check top and bottom planes
        let mut projected = center;
        projected.x -= min_dot_a * side_planes[0].x;
        projected.z -= min_dot_a * side_planes[0].z;
        let dp0 = dot_yz(side_planes[1], projected);
        let dp1 = dot_yz(side_planes[3], projected);
        min_dot_b = dp0.min(dp1);
        corner_ray = if min_dot_b == dp0 { corner_rays[0] } else { corner_rays[2] };
    } else if min_dot_a == dp[1] {
        // sphere is on the top, check left and right
        let mut projected = center;
        projected.y -= min_dot_a * side_planes[1].y;
        projected.z -= min_dot_a * side_planes[1].z;
        let dp0 = dot_xz(side_planes[0], projected);
        let dp1 = dot_xz(side_planes[2], projected);
        min_dot_b = dp0.min(dp1);
        corner_ray = if min_dot_b == dp0 { corner_rays[0] } else { corner_rays[1] };
    } else if min_dot_a == dp[2] {
        // sphere is on the right, check top and bottom
        let mut projected = center;
        projected.x -= min_dot_a * side_planes[2].x;
        projected.z -= min_dot_a * side_planes[2].z;
        let dp0 = dot_yz(side_planes[1], projected);
        let dp1 = dot_yz(side_planes[3], projected);
        min_dot_b = dp0.min(dp1);
        corner_ray = if min_dot_b == dp0 { corner_rays[1] } else { corner_rays[3] };
    } else {
        // sphere is on the bottom, check left and right
        let mut projected = center;
        projected.y -= min_dot_a * side_planes[3].y;
        projected.z -= min_dot_a * side_planes[3].z;
        let dp0 = dot_xz(side_planes[0], projected);
        let dp1 = dot_xz(side_planes[2], projected);
        min_dot_b = dp0.min(dp1);
        corner_ray = if min_dot_b == dp0 { corner_rays[2] } else { corner_rays[3] };
    }

    if min_dot_b > 0.0 {
        // center is not past a corner, the nearest plane decides
        return -min_dot_a < radius;
    }

    // center is outside a corner, test against the ray through that corner
    test_unnorm_ray_sphere(corner_ray, center, radius)
}

/// Approximate sphere vs tile frustum test.
///
/// Builds a quadrant mask of the sphere center relative to the tile in
/// tile space. Only when the center is diagonally outside (mask has two
/// bits) does a corner ray test run; otherwise the test accepts. Cheaper
/// than the exact test but keeps some corner-adjacent false positives.
pub fn test_tile_frustum_sphere_fast(
    camera_top_left: Vec2,
    tile_step: Vec2,
    tile_top_left: Vec2,
    tile_space_sphere_center: Vec2,
    center: Vec3,
    radius: f32,
) -> bool {
    let tl = tile_top_left;
    let br = tl + Vec2::ONE;

    let mut mask = 0u32;
    mask |= if tile_space_sphere_center.x < tl.x { 1 << 0 } else { 0 };
    mask |= if tile_space_sphere_center.y < tl.y { 1 << 1 } else { 0 };
    mask |= if tile_space_sphere_center.x > br.x { 1 << 2 } else { 0 };
    mask |= if tile_space_sphere_center.y > br.y { 1 << 3 } else { 0 };

    let delta = Vec2::new(((mask >> 2) & 1) as f32, ((mask >> 3) & 1) as f32);

    let ray_xy = camera_top_left + (tile_top_left + delta) * tile_step;
    let ray = Vec3::new(ray_xy.x, ray_xy.y, 1.0);

    if mask.count_ones() == 2 && !test_unnorm_ray_sphere(ray, center, radius) {
        false
    } else {
        true
    }
}
