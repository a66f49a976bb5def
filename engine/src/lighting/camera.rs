//! Camera Parameters
//!
//! Minimal camera description the builders need: a left-handed view space
//! with +Z into the screen, a perspective projection, and a combined
//! view-to-screen transform that lands projected points directly in pixel
//! coordinates (origin top-left, +Y down).

use glam::{Mat4, UVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct CameraParams {
    /// World-space position
    pub position: Vec3,
    /// World-space view direction, normalized
    pub forward: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width over height
    pub aspect: f32,
    /// Near clip plane distance
    pub near_z: f32,
    /// Far clip plane distance
    pub far_z: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            fov_y: 1.0,
            aspect: 16.0 / 9.0,
            near_z: 0.25,
            far_z: 10_000.0,
        }
    }
}

impl CameraParams {
    /// World-to-view transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_lh(self.position, self.forward, Vec3::Y)
    }

    /// View-to-clip perspective transform (depth range [0, 1]).
    pub fn proj_matrix(&self) -> Mat4 {
        Mat4::perspective_lh(self.fov_y, self.aspect, self.near_z, self.far_z)
    }

    /// View-to-screen transform: projection followed by viewport mapping,
    /// so `project_point3` yields pixel coordinates for the given
    /// resolution.
    pub fn screen_space_proj_matrix(&self, resolution: UVec2) -> Mat4 {
        let res = Vec2::new(resolution.x as f32, resolution.y as f32);
        Mat4::from_translation(Vec3::new(0.5 * res.x, 0.5 * res.y, 0.0))
            * Mat4::from_scale(Vec3::new(0.5 * res.x, -0.5 * res.y, 1.0))
            * self.proj_matrix()
    }

    /// View-space direction to the top-left corner of the frustum at unit
    /// depth, as (x, y). The frustum spans `[-w/2, w/2] x [-h/2, h/2]`
    /// where `h = 2 tan(fov_y / 2)` and `w = h * aspect`.
    pub fn frustum_top_left_corner(&self) -> Vec2 {
        let height = (self.fov_y / 2.0).tan() * 2.0;
        let width = height * self.aspect;
        Vec2::new(-width / 2.0, height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_projects_to_screen_center() {
        let camera = CameraParams::default();
        let mat = camera.screen_space_proj_matrix(UVec2::new(1920, 1080));
        let p = mat.project_point3(Vec3::new(0.0, 0.0, 100.0));
        assert!((p.x - 960.0).abs() < 1e-2);
        assert!((p.y - 540.0).abs() < 1e-2);
    }

    #[test]
    fn test_top_of_frustum_projects_to_screen_top() {
        let camera = CameraParams::default();
        let mat = camera.screen_space_proj_matrix(UVec2::new(1920, 1080));
        let z = 100.0f32;
        let top_y = (camera.fov_y / 2.0).tan() * z;
        let p = mat.project_point3(Vec3::new(0.0, top_y, z));
        // +Y in view space is up, which is y = 0 in screen space
        assert!(p.y.abs() < 1e-2, "top edge projected to y = {}", p.y);
    }

    #[test]
    fn test_frustum_corner_matches_projection() {
        let camera = CameraParams::default();
        let corner = camera.frustum_top_left_corner();
        let mat = camera.screen_space_proj_matrix(UVec2::new(1280, 720));
        // a point along the corner ray lands on the top-left pixel corner
        let p = mat.project_point3(Vec3::new(corner.x * 10.0, corner.y * 10.0, 10.0));
        assert!(p.x.abs() < 1e-2);
        assert!(p.y.abs() < 1e-2);
    }
}
