//! Free flight camera controls
//!
//! WASD moves in the view plane, Q/E move down/up along the world up axis.
//! Holding left shift multiplies the speed by the boost factor. Space toggles
//! mouse look; while it is on, cursor travel turns the camera.

use bitflags::bitflags;

use crate::core::FlightConfig;
use crate::events::{Event, EventKind, Key};
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

bitflags! {
    /// Movement keys currently held
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MovementKeys: u8 {
        /// W
        const FORWARD = 1 << 0;
        /// S
        const BACK = 1 << 1;
        /// A
        const LEFT = 1 << 2;
        /// D
        const RIGHT = 1 << 3;
        /// Q
        const DOWN = 1 << 4;
        /// E
        const UP = 1 << 5;
    }
}

impl MovementKeys {
    fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::W => Some(Self::FORWARD),
            Key::S => Some(Self::BACK),
            Key::A => Some(Self::LEFT),
            Key::D => Some(Self::RIGHT),
            Key::Q => Some(Self::DOWN),
            Key::E => Some(Self::UP),
            _ => None,
        }
    }
}

/// Yaw/pitch flight camera state
#[derive(Debug, Clone)]
pub struct FreeFlightController {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    yaw_degrees: f32,
    pitch_degrees: f32,
    config: FlightConfig,
    keys: MovementKeys,
    boosted: bool,
    mouse_look: bool,
    last_cursor: Option<(f32, f32)>,
}

impl FreeFlightController {
    /// Controller at `position` looking down -Z
    pub fn new(position: Vec3, config: FlightConfig) -> Self {
        let mut controller = Self {
            position,
            front: -Vec3::z(),
            up: Vec3::y(),
            yaw_degrees: -90.0,
            pitch_degrees: 0.0,
            config,
            keys: MovementKeys::empty(),
            boosted: false,
            mouse_look: false,
            last_cursor: None,
        };
        controller.update_front();
        controller
    }

    /// Controller at `eye` facing `target`
    pub fn looking_at(eye: Vec3, target: Vec3, config: FlightConfig) -> Self {
        let mut controller = Self::new(eye, config);
        let direction = target - eye;
        if direction.norm_squared() > f32::EPSILON {
            let direction = direction.normalize();
            controller.pitch_degrees = direction.y.clamp(-1.0, 1.0).asin().to_degrees();
            controller.yaw_degrees = direction.z.atan2(direction.x).to_degrees();
            controller.clamp_pitch();
            controller.update_front();
        }
        controller
    }

    /// Camera position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit view direction
    pub fn front(&self) -> Vec3 {
        self.front
    }

    /// Pitch in degrees
    pub fn pitch_degrees(&self) -> f32 {
        self.pitch_degrees
    }

    /// Yaw in degrees
    pub fn yaw_degrees(&self) -> f32 {
        self.yaw_degrees
    }

    /// Whether cursor travel currently turns the camera
    pub fn mouse_look(&self) -> bool {
        self.mouse_look
    }

    /// Keys currently held
    pub fn keys(&self) -> MovementKeys {
        self.keys
    }

    /// Current speed in units per second
    pub fn speed(&self) -> f32 {
        if self.boosted {
            self.config.speed * self.config.boost_factor
        } else {
            self.config.speed
        }
    }

    /// Feed an input event; returns whether it changed the controller
    pub fn handle_event(&mut self, event: &Event) -> bool {
        match event.kind {
            EventKind::Key { key: Key::Space, pressed } => {
                if pressed {
                    self.mouse_look = !self.mouse_look;
                    self.last_cursor = None;
                }
                pressed
            }
            EventKind::Key { key: Key::LeftShift, pressed } => {
                let changed = self.boosted != pressed;
                self.boosted = pressed;
                changed
            }
            EventKind::Key { key, pressed } => match MovementKeys::from_key(key) {
                Some(flag) => {
                    self.keys.set(flag, pressed);
                    true
                }
                None => false,
            },
            EventKind::MouseMoved { x, y } => self.mouse_moved(x, y),
            _ => false,
        }
    }

    fn mouse_moved(&mut self, x: f32, y: f32) -> bool {
        if !self.mouse_look {
            return false;
        }
        // The first sample after enabling only anchors the cursor
        let Some((last_x, last_y)) = self.last_cursor.replace((x, y)) else {
            return false;
        };

        self.yaw_degrees += (x - last_x) * self.config.mouse_sensitivity;
        self.pitch_degrees += (last_y - y) * self.config.mouse_sensitivity;
        self.clamp_pitch();
        self.update_front();
        true
    }

    /// Move according to the held keys
    pub fn update(&mut self, delta_seconds: f32) {
        let step = self.speed() * delta_seconds;
        let right = self.front.cross(&self.up).normalize();

        let mut motion = Vec3::zeros();
        if self.keys.contains(MovementKeys::FORWARD) {
            motion += self.front;
        }
        if self.keys.contains(MovementKeys::BACK) {
            motion -= self.front;
        }
        if self.keys.contains(MovementKeys::RIGHT) {
            motion += right;
        }
        if self.keys.contains(MovementKeys::LEFT) {
            motion -= right;
        }
        if self.keys.contains(MovementKeys::UP) {
            motion += self.up;
        }
        if self.keys.contains(MovementKeys::DOWN) {
            motion -= self.up;
        }
        self.position += motion * step;
    }

    /// View matrix for the current pose
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.position + self.front, self.up)
    }

    fn clamp_pitch(&mut self) {
        let limit = self.config.max_pitch_degrees;
        self.pitch_degrees = self.pitch_degrees.clamp(-limit, limit);
    }

    fn update_front(&mut self) {
        let (yaw, pitch) = (self.yaw_degrees.to_radians(), self.pitch_degrees.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn controller() -> FreeFlightController {
        FreeFlightController::new(Vec3::zeros(), FlightConfig::default())
    }

    #[test]
    fn test_starts_facing_negative_z() {
        assert_relative_eq!(controller().front(), -Vec3::z(), epsilon = 1e-5);
    }

    #[test]
    fn test_forward_and_boost() {
        let mut flight = controller();
        flight.handle_event(&Event::key_pressed(Key::W, 0.0));
        flight.update(1.0);
        assert_relative_eq!(flight.position(), Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-4);

        flight.handle_event(&Event::key_pressed(Key::LeftShift, 0.0));
        flight.update(1.0);
        assert_relative_eq!(flight.position(), Vec3::new(0.0, 0.0, -20.0), epsilon = 1e-4);

        flight.handle_event(&Event::key_released(Key::LeftShift, 0.0));
        flight.handle_event(&Event::key_released(Key::W, 0.0));
        assert_relative_eq!(flight.speed(), 5.0);
        assert!(flight.keys().is_empty());
    }

    #[test]
    fn test_mouse_look_toggle_and_pitch_clamp() {
        let mut flight = controller();
        assert!(!flight.handle_event(&Event::mouse_moved(10.0, 10.0, 0.0)));

        flight.handle_event(&Event::key_pressed(Key::Space, 0.0));
        assert!(flight.mouse_look());
        assert!(!flight.handle_event(&Event::mouse_moved(0.0, 0.0, 0.0)));
        assert!(flight.handle_event(&Event::mouse_moved(0.0, -10_000.0, 0.0)));
        assert_relative_eq!(flight.pitch_degrees(), 89.0);

        flight.handle_event(&Event::key_pressed(Key::Space, 0.0));
        assert!(!flight.mouse_look());
    }

    #[test]
    fn test_looking_at_target() {
        let flight = FreeFlightController::looking_at(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), FlightConfig::default());
        assert_relative_eq!(flight.front(), Vec3::x(), epsilon = 1e-5);
    }
}
