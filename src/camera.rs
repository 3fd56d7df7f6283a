//! Free-fly and orbiting ("cinema") camera.
//!
//! The camera never reads the window directly. Hosts feed an [`InputState`]
//! from winit events and hand it to [`Camera::update_with_mode`] once per
//! frame.

use std::collections::HashSet;

use cgmath::{Deg, EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Zero, perspective};
use winit::{
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::pipelines::shader::ShaderProgram;

/// cgmath builds OpenGL style clip space with z in [-1, 1], wgpu expects [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

/// Scroll lines per pixel of touchpad scrolling.
const LINES_PER_PIXEL: f32 = 1.0 / 20.0;

/// Camera tunables. Angles are in degrees, speeds in units per second.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraSettings {
    pub speed: f32,
    pub sensitivity: f32,
    pub sprint_multiplier: f32,
    pub default_fov: f32,
    pub min_fov: f32,
    pub max_fov: f32,
    pub zoom_speed: f32,
    /// Radians per second.
    pub orbit_speed: f32,
    /// Orbit radius used when the camera starts (almost) above the center.
    pub default_orbit_radius: f32,
    pub pitch_limit: f32,
    /// Yaw grows with rightward mouse motion when set. Off by default, where
    /// moving the mouse right decreases yaw.
    pub natural_yaw: bool,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            speed: 2.5,
            sensitivity: 0.1,
            sprint_multiplier: 2.5,
            default_fov: 50.0,
            min_fov: 25.0,
            max_fov: 75.0,
            zoom_speed: 2.0,
            orbit_speed: 0.25,
            default_orbit_radius: 40.0,
            pitch_limit: 85.0,
            natural_yaw: false,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Keyboard and mouse state gathered between two camera updates.
#[derive(Debug, Default)]
pub struct InputState {
    pressed: HashSet<KeyCode>,
    looking: bool,
    cursor_delta: (f32, f32),
    scroll: f32,
}

impl InputState {
    /// Returns true if the event was consumed.
    pub fn process_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                match state {
                    ElementState::Pressed => self.press(*code),
                    ElementState::Released => self.release(*code),
                }
                true
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                self.set_looking(*state == ElementState::Pressed);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 * LINES_PER_PIXEL,
                };
                true
            }
            WindowEvent::Focused(false) => {
                self.pressed.clear();
                self.looking = false;
                false
            }
            _ => false,
        }
    }

    /// Raw mouse motion counts only while looking around.
    pub fn process_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.looking {
                self.add_cursor_delta(delta.0 as f32, delta.1 as f32);
            }
        }
    }

    pub fn press(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn set_looking(&mut self, looking: bool) {
        self.looking = looking;
    }

    pub fn is_looking(&self) -> bool {
        self.looking
    }

    pub fn add_cursor_delta(&mut self, dx: f32, dy: f32) {
        self.cursor_delta.0 += dx;
        self.cursor_delta.1 += dy;
    }

    pub fn cursor_delta(&self) -> (f32, f32) {
        self.cursor_delta
    }

    /// Scroll lines accumulated since the last call.
    pub fn take_scroll(&mut self) -> f32 {
        std::mem::take(&mut self.scroll)
    }

    /// Forget the per-frame deltas. Held keys stay held.
    pub fn end_frame(&mut self) {
        self.cursor_delta = (0.0, 0.0);
        self.scroll = 0.0;
    }
}

/// Free-fly pose kept while orbiting, restored verbatim afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SavedPose {
    position: Vector3<f32>,
    orientation: Vector3<f32>,
    up: Vector3<f32>,
    yaw: f32,
    pitch: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orbit {
    pub center: Vector3<f32>,
    pub radius: f32,
    /// Radians in the XZ plane, measured from +X towards +Z.
    pub angle: f32,
    /// Height of the camera above the center.
    pub height: f32,
    saved: SavedPose,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraMode {
    Free,
    Cinema(Orbit),
}

#[derive(Debug)]
pub struct Camera {
    pub position: Vector3<f32>,
    orientation: Vector3<f32>,
    up: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    fov: f32,
    width: u32,
    height: u32,
    mode: CameraMode,
    pub settings: CameraSettings,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    camera_matrix: Matrix4<f32>,
}

impl Camera {
    /// A free camera at `position` looking down -Z.
    pub fn new(width: u32, height: u32, position: Vector3<f32>) -> Self {
        Self::with_settings(width, height, position, CameraSettings::default())
    }

    pub fn with_settings(width: u32, height: u32, position: Vector3<f32>, settings: CameraSettings) -> Self {
        let mut camera = Self {
            position,
            orientation: -Vector3::unit_z(),
            up: WORLD_UP,
            yaw: -90.0,
            pitch: 0.0,
            fov: settings.default_fov,
            width: width.max(1),
            height: height.max(1),
            mode: CameraMode::Free,
            settings,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            camera_matrix: Matrix4::identity(),
        };
        camera.update_from_angles();
        camera.update_matrix();
        camera
    }

    pub fn orientation(&self) -> Vector3<f32> {
        self.orientation
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn mode(&self) -> &CameraMode {
        &self.mode
    }

    pub fn is_cinema(&self) -> bool {
        matches!(self.mode, CameraMode::Cinema(_))
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    /// `projection * view` as of the last [`update_matrix`](Self::update_matrix).
    pub fn camera_matrix(&self) -> Matrix4<f32> {
        self.camera_matrix
    }

    /// Zero sizes are replaced by 1.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Positive `dy` (scrolling up) zooms in.
    pub fn on_scroll(&mut self, dy: f32) {
        self.fov = (self.fov - dy * self.settings.zoom_speed)
            .clamp(self.settings.min_fov, self.settings.max_fov);
    }

    /// Switch between free flight and orbiting `center`.
    ///
    /// Leaving cinema mode puts the camera back exactly where it was when
    /// cinema mode was entered.
    pub fn toggle_cinema(&mut self, center: Vector3<f32>) {
        match self.mode {
            CameraMode::Free => {
                let saved = SavedPose {
                    position: self.position,
                    orientation: self.orientation,
                    up: self.up,
                    yaw: self.yaw,
                    pitch: self.pitch,
                };
                let dx = self.position.x - center.x;
                let dz = self.position.z - center.z;
                let mut radius = (dx * dx + dz * dz).sqrt();
                if radius < 1.0 {
                    radius = self.settings.default_orbit_radius;
                }
                self.mode = CameraMode::Cinema(Orbit {
                    center,
                    radius,
                    angle: dz.atan2(dx),
                    height: self.position.y - center.y,
                    saved,
                });
                log::debug!("Camera orbiting {:?} at radius {}", center, radius);
            }
            CameraMode::Cinema(orbit) => {
                let saved = orbit.saved;
                self.position = saved.position;
                self.orientation = saved.orientation;
                self.up = saved.up;
                self.yaw = saved.yaw;
                self.pitch = saved.pitch;
                self.mode = CameraMode::Free;
                log::debug!("Camera back to free flight");
            }
        }
    }

    /// Advance the camera by `dt` seconds in its current mode.
    pub fn update_with_mode(&mut self, input: &InputState, dt: f32) {
        match self.mode {
            CameraMode::Free => self.update_free(input, dt),
            CameraMode::Cinema(_) => self.update_cinema(dt),
        }
    }

    fn update_free(&mut self, input: &InputState, dt: f32) {
        let right = self.orientation.cross(self.up).normalize();
        let mut direction = Vector3::zero();
        if input.is_pressed(KeyCode::KeyW) {
            direction += self.orientation;
        }
        if input.is_pressed(KeyCode::KeyS) {
            direction -= self.orientation;
        }
        if input.is_pressed(KeyCode::KeyD) {
            direction += right;
        }
        if input.is_pressed(KeyCode::KeyA) {
            direction -= right;
        }
        if input.is_pressed(KeyCode::Space) {
            direction += self.up;
        }
        if input.is_pressed(KeyCode::KeyC) {
            direction -= self.up;
        }

        if direction.magnitude2() > f32::EPSILON {
            let sprint = if input.is_pressed(KeyCode::ShiftLeft) || input.is_pressed(KeyCode::ShiftRight) {
                self.settings.sprint_multiplier
            } else {
                1.0
            };
            self.position += direction.normalize() * self.settings.speed * sprint * dt;
        }

        if input.is_pressed(KeyCode::KeyR) {
            self.fov = self.settings.default_fov;
        }

        if input.is_looking() {
            let (dx, dy) = input.cursor_delta();
            let yaw_delta = dx * self.settings.sensitivity;
            if self.settings.natural_yaw {
                self.yaw += yaw_delta;
            } else {
                self.yaw -= yaw_delta;
            }
            self.pitch = (self.pitch - dy * self.settings.sensitivity)
                .clamp(-self.settings.pitch_limit, self.settings.pitch_limit);
            self.update_from_angles();
        }
    }

    fn update_cinema(&mut self, dt: f32) {
        let CameraMode::Cinema(orbit) = &mut self.mode else {
            return;
        };
        orbit.angle += self.settings.orbit_speed * dt;
        let center = orbit.center;
        let offset = Vector3::new(
            orbit.radius * orbit.angle.cos(),
            orbit.height,
            orbit.radius * orbit.angle.sin(),
        );
        self.position = center + offset;
        self.look_at(center);
    }

    /// Rebuild orientation and up from yaw and pitch.
    fn update_from_angles(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.to_radians().sin_cos();
        self.orientation = Vector3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize();
        let right = self.orientation.cross(WORLD_UP).normalize();
        self.up = right.cross(self.orientation).normalize();
    }

    fn look_at(&mut self, target: Vector3<f32>) {
        let to_target = target - self.position;
        if to_target.magnitude2() <= f32::EPSILON {
            return;
        }
        self.orientation = to_target.normalize();
        let right = self.orientation.cross(WORLD_UP);
        if right.magnitude2() > f32::EPSILON {
            self.up = right.normalize().cross(self.orientation).normalize();
        }
    }

    /// Recompute view, projection and their product from the current state.
    pub fn update_matrix(&mut self) {
        self.view = Matrix4::look_to_rh(Point3::from_vec(self.position), self.orientation, self.up);
        let aspect = self.width as f32 / self.height as f32;
        self.projection = OPENGL_TO_WGPU_MATRIX
            * perspective(Deg(self.fov), aspect, self.settings.near, self.settings.far);
        self.camera_matrix = self.projection * self.view;
    }

    /// Export the combined matrix to the uniform `name` of `program`.
    pub fn matrix(&self, program: &mut ShaderProgram, name: &str) {
        program.set_mat4(name, &self.camera_matrix);
    }
}
