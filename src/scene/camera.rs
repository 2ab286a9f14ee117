use glam::{Mat4, Vec3};

pub const FOV_Y_DEGREES: f32 = 75.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 1000.0;
pub const HOME_POSITION: Vec3 = Vec3::new(0.0, 1.0, 3.0);

/// Fixed-orientation perspective camera looking down -Z.
///
/// Zoom moves the camera along Z only, so `distance` is the z coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl PerspectiveCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            fov_y_degrees: FOV_Y_DEGREES,
            aspect: aspect_ratio(width, height),
            near: NEAR_PLANE,
            far: FAR_PLANE,
            position: HOME_POSITION,
        }
    }

    pub fn distance(&self) -> f32 {
        self.position.z
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.position.z = distance;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, Vec3::NEG_Z, Vec3::Y)
    }

    /// Right-handed projection with a 0..1 depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}
