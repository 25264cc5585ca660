use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Vec2, Vec3};
use winit::event::MouseButton;

use crate::controls::input::Input;
use crate::scene::camera::Camera;

/// 轨道相机控制
///
/// Keeps the camera on a sphere around `center`: left drag orbits, right drag
/// pans the center, the wheel zooms. The camera always looks at `center`.
///
/// `theta` is the azimuth around +Y measured from +Z, `phi` the polar angle
/// from +Y.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub damping_factor: f32,
    pub enable_damping: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,

    pub center: Vec3,
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,

    rotate_delta: Vec2,
}

impl OrbitControls {
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        const EPS: f32 = 1e-4;
        Self {
            rotate_speed: 1.0,
            zoom_speed: 0.05,
            pan_speed: 1.0,
            damping_factor: 0.05,
            enable_damping: true,
            min_distance: 0.1,
            max_distance: 1000.0,
            min_polar_angle: EPS,
            max_polar_angle: PI - EPS,

            center,
            radius,
            theta: 0.0,
            phi: FRAC_PI_2,

            rotate_delta: Vec2::ZERO,
        }
    }

    /// Starts from the camera's current placement relative to `center`.
    #[must_use]
    pub fn from_camera(camera: &Camera, center: Vec3) -> Self {
        let offset = camera.position() - center;
        let radius = offset.length();
        let mut controls = Self::new(center, radius);
        if radius > f32::EPSILON {
            controls.theta = offset.x.atan2(offset.z);
            controls.phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        }
        controls
    }

    /// Camera position for the current angles and radius.
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        self.center + Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta) * self.radius
    }

    /// Applies this frame's input and moves `camera`. `dt` is in seconds.
    pub fn update(&mut self, camera: &mut Camera, input: &Input, dt: f32) {
        let screen_height = input.screen_size.y.max(1.0);

        if input.is_button_pressed(MouseButton::Left) {
            let rotate_per_pixel = 2.0 * PI / screen_height;
            self.rotate_delta -= input.cursor_delta * rotate_per_pixel * self.rotate_speed;
        }

        if self.enable_damping {
            // 以 60fps 为基准，帧率无关的指数衰减
            let retention = (1.0 - self.damping_factor).powf(dt * 60.0);
            let applied = self.rotate_delta * (1.0 - retention);
            self.theta += applied.x;
            self.phi += applied.y;
            self.rotate_delta *= retention;
        } else {
            self.theta += self.rotate_delta.x;
            self.phi += self.rotate_delta.y;
            self.rotate_delta = Vec2::ZERO;
        }
        self.phi = self.phi.clamp(self.min_polar_angle, self.max_polar_angle);

        if input.scroll_delta.y != 0.0 {
            let scale = (1.0 - self.zoom_speed).powf(input.scroll_delta.y.abs());
            if input.scroll_delta.y > 0.0 {
                self.radius *= scale;
            } else {
                self.radius /= scale;
            }
        }
        self.radius = self.radius.clamp(self.min_distance, self.max_distance);

        if input.is_button_pressed(MouseButton::Right) {
            self.pan(input.cursor_delta, screen_height, camera.fov);
        }

        camera.transform.position = self.eye();
        camera.look_at(self.center);
    }

    /// 平移：按当前距离把像素位移换算到世界空间
    fn pan(&mut self, cursor_delta: Vec2, screen_height: f32, fov_degrees: f32) {
        let half_fov = fov_degrees.to_radians() * 0.5;
        let world_per_pixel = 2.0 * self.radius * half_fov.tan() / screen_height;

        let forward = (self.center - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);

        self.center += (right * -cursor_delta.x + up * cursor_delta.y) * world_per_pixel * self.pan_speed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::ElementState;

    fn camera() -> Camera {
        Camera::new_perspective(60.0, 1.0, 0.1, 100.0)
    }

    fn undamped(center: Vec3, radius: f32) -> OrbitControls {
        let mut controls = OrbitControls::new(center, radius);
        controls.enable_damping = false;
        controls
    }

    #[test]
    fn idle_update_places_camera_on_positive_z() {
        let mut cam = camera();
        let mut controls = undamped(Vec3::ZERO, 5.0);
        controls.update(&mut cam, &Input::new(800, 600), 0.016);

        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-5));
        cam.update_view_matrix().unwrap();
        let center_in_view = cam.view_matrix().transform_point3(Vec3::ZERO);
        assert!(center_in_view.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-4), "{center_in_view:?}");
    }

    #[test]
    fn left_drag_orbits_around_center() {
        let mut cam = camera();
        let mut controls = undamped(Vec3::new(1.0, 0.0, 0.0), 4.0);
        let mut input = Input::new(600, 600);
        input.handle_mouse_input(ElementState::Pressed, MouseButton::Left);
        input.handle_cursor_move(300.0, 300.0);
        input.handle_cursor_move(150.0, 300.0);

        controls.update(&mut cam, &input, 0.016);

        // 150px of 600px is a quarter of a full turn
        assert!((controls.theta - FRAC_PI_2).abs() < 1e-4, "{}", controls.theta);
        assert!((cam.position().distance(controls.center) - 4.0).abs() < 1e-4);

        cam.update_view_matrix().unwrap();
        let center_in_view = cam.view_matrix().transform_point3(controls.center);
        assert!(center_in_view.truncate().length() < 1e-3, "{center_in_view:?}");
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut cam = camera();
        let mut controls = undamped(Vec3::ZERO, 3.0);
        controls.max_polar_angle = 2.0;
        let mut input = Input::new(100, 100);
        input.handle_mouse_input(ElementState::Pressed, MouseButton::Left);
        input.handle_cursor_move(50.0, 50.0);
        input.handle_cursor_move(50.0, 0.0);

        controls.update(&mut cam, &input, 0.016);
        assert_eq!(controls.phi, 2.0);
        assert!(cam.transform.rotation.is_finite());
    }

    #[test]
    fn wheel_zooms_within_limits() {
        let mut cam = camera();
        let mut controls = undamped(Vec3::ZERO, 10.0);
        controls.min_distance = 9.0;
        let mut input = Input::new(100, 100);

        input.handle_mouse_wheel(winit::event::MouseScrollDelta::LineDelta(0.0, 1.0));
        controls.update(&mut cam, &input, 0.016);
        assert!((controls.radius - 9.5).abs() < 1e-4);

        input.end_frame();
        input.handle_mouse_wheel(winit::event::MouseScrollDelta::LineDelta(0.0, 10.0));
        controls.update(&mut cam, &input, 0.016);
        assert_eq!(controls.radius, 9.0);
    }

    #[test]
    fn damping_spreads_rotation_over_frames() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO, 5.0);
        let mut input = Input::new(600, 600);
        input.handle_mouse_input(ElementState::Pressed, MouseButton::Left);
        input.handle_cursor_move(300.0, 300.0);
        input.handle_cursor_move(150.0, 300.0);

        controls.update(&mut cam, &input, 1.0 / 60.0);
        let first = controls.theta;
        assert!(first > 0.0 && first < FRAC_PI_2);

        input.handle_mouse_input(ElementState::Released, MouseButton::Left);
        input.end_frame();
        controls.update(&mut cam, &input, 1.0 / 60.0);
        assert!(controls.theta > first);
    }

    #[test]
    fn from_camera_recovers_angles() {
        let mut cam = camera();
        cam.transform.position = Vec3::new(3.0, 0.0, 0.0);
        let controls = OrbitControls::from_camera(&cam, Vec3::ZERO);
        assert!((controls.radius - 3.0).abs() < 1e-5);
        assert!((controls.theta - FRAC_PI_2).abs() < 1e-5);
        assert!((controls.phi - FRAC_PI_2).abs() < 1e-5);
        assert!(controls.eye().abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5));
    }
}
