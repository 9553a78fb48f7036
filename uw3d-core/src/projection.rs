/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
const PITCH_LIMIT: f32 = 89.0;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    Orthographic,
    #[default]
    Perspective,
}

/// Where the eye sits relative to the followed target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// Eye at the target, looking along the camera front
    FirstPerson,
    /// Eye orbiting the target at `radius`, looking at it
    #[default]
    ThirdPerson,
}

/// Yaw/pitch camera following a target point
#[derive(Debug, Clone)]
pub struct Camera {
    /// Degrees
    pub yaw: f32,
    /// Degrees, clamped to +-89 by mouse input
    pub pitch: f32,
    pub world_up: Vector3<f32>,
    pub sensitivity: f32,
    pub radius: f32,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Half-size of the orthographic view volume
    pub ortho_extent: f32,
    pub ortho_depth: f32,
    pub mode: ProjectionMode,
    pub view: CameraMode,
    front: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self {
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            world_up: Vector3::y(),
            sensitivity: DEFAULT_SENSITIVITY,
            radius: 10.0,
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
            ortho_extent: 15.0,
            ortho_depth: 1000.0,
            mode: ProjectionMode::Perspective,
            view: CameraMode::ThirdPerson,
            front: -Vector3::z(),
            right: Vector3::x(),
            up: Vector3::y(),
        };
        camera.set_viewport(width, height);
        camera.update_vectors();
        camera
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    /// Apply a mouse delta (in pixels) scaled by the sensitivity
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32, constrain_pitch: bool) {
        self.yaw += dx * self.sensitivity;
        self.pitch += dy * self.sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_vectors();
    }

    /// Point the camera by absolute yaw and pitch in degrees
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            CameraMode::FirstPerson => CameraMode::ThirdPerson,
            CameraMode::ThirdPerson => CameraMode::FirstPerson,
        };
    }

    pub fn toggle_projection(&mut self) {
        self.mode = match self.mode {
            ProjectionMode::Perspective => ProjectionMode::Orthographic,
            ProjectionMode::Orthographic => ProjectionMode::Perspective,
        };
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(&self.world_up).normalize();
        self.up = self.right.cross(&self.front).normalize();
    }

    /// Eye position when following `target`
    pub fn eye(&self, target: &Point3<f32>) -> Point3<f32> {
        match self.view {
            CameraMode::FirstPerson => *target,
            CameraMode::ThirdPerson => target - self.front * self.radius,
        }
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self, target: &Point3<f32>) -> Matrix4<f32> {
        let eye = self.eye(target);
        match self.view {
            CameraMode::FirstPerson => Matrix4::look_at_rh(&eye, &(eye + self.front), &self.up),
            CameraMode::ThirdPerson => Matrix4::look_at_rh(&eye, target, &self.up),
        }
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_height = self.ortho_extent;
                let half_width = half_height * self.aspect;
                Matrix4::new_orthographic(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    -self.ortho_depth,
                    self.ortho_depth,
                )
            }
        }
    }

    /// Project a 3D point to 2D screen space.
    ///
    /// Returns `None` for points behind the eye or outside the depth range.
    /// Points beside the viewport are still returned so triangles crossing
    /// the border can be clipped by the rasterizer.
    pub fn project_to_screen(
        point: &Point3<f32>,
        mvp: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let clip = mvp * point.to_homogeneous();

        // Prevent division by near-zero depth values
        if clip.w < 1e-6 {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        let depth = clip.z / clip.w;

        if !(-1.0..=1.0).contains(&depth) {
            return None;
        }

        // Convert to screen space
        let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

        Some((screen_x, screen_y, depth))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert_relative_eq!(camera.front(), -Vector3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 5000.0, true);
        assert_eq!(camera.pitch, 89.0);
        camera.process_mouse_movement(0.0, -5000.0, false);
        assert!(camera.pitch < -89.0);
    }

    #[test]
    fn test_mouse_uses_sensitivity() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(100.0, 0.0, true);
        assert_relative_eq!(camera.yaw, DEFAULT_YAW + 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_third_person_orbits_target() {
        let camera = Camera::default();
        let target = Point3::new(1.0, 2.0, 3.0);
        let eye = camera.eye(&target);
        assert_relative_eq!(eye, Point3::new(1.0, 2.0, 13.0), epsilon = 1e-5);
        // The target lands in the middle of the screen
        let view = camera.view_matrix(&target);
        let in_view = view.transform_point(&target);
        assert_relative_eq!(in_view, Point3::new(0.0, 0.0, -10.0), epsilon = 1e-4);
    }

    #[test]
    fn test_first_person_sits_on_target() {
        let mut camera = Camera::default();
        camera.toggle_view();
        assert_eq!(camera.view, CameraMode::FirstPerson);
        let target = Point3::new(4.0, 0.0, 0.0);
        let view = camera.view_matrix(&target);
        assert_relative_eq!(view.transform_point(&target), Point3::origin(), epsilon = 1e-5);
    }

    #[test]
    fn test_project_center() {
        let camera = Camera::new(100, 100);
        let target = Point3::origin();
        let mvp = camera.projection_matrix() * camera.view_matrix(&target);
        let (x, y, depth) = Camera::project_to_screen(&target, &mvp, 100, 100).unwrap();
        assert_relative_eq!(x, 50.0, epsilon = 1e-3);
        assert_relative_eq!(y, 50.0, epsilon = 1e-3);
        assert!(depth > -1.0 && depth < 1.0);
    }

    #[test]
    fn test_points_behind_eye_are_rejected() {
        let camera = Camera::new(100, 100);
        let mvp = camera.projection_matrix() * camera.view_matrix(&Point3::origin());
        assert!(Camera::project_to_screen(&Point3::new(0.0, 0.0, 20.0), &mvp, 100, 100).is_none());
    }

    #[test]
    fn test_orthographic_keeps_far_points() {
        let mut camera = Camera::new(100, 100);
        camera.toggle_projection();
        let mvp = camera.projection_matrix() * camera.view_matrix(&Point3::origin());
        let far_point = Point3::new(0.0, 0.0, -500.0);
        assert!(Camera::project_to_screen(&far_point, &mvp, 100, 100).is_some());
    }
}
