//! First person camera driven by mouse deltas.
//!
//! The camera keeps a look direction and an up vector rather than angles.
//! Pitch is tracked separately so it can be clamped.

use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::config::CameraConfig;
use crate::collision::EPSILON_MEDIUM;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    /// Unit view direction.
    pub lookat: Vec3,
    pub up: Vec3,
    /// Accumulated pitch in radians, positive is looking up.
    pitch: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::facing(Vec3::ZERO, 0.0)
    }
}

impl Camera {
    /// Camera at `position` looking toward `target`.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self {
            position,
            lookat: (target - position).try_normalize().unwrap_or(Vec3::NEG_Z),
            up: up.try_normalize().unwrap_or(Vec3::Y),
            pitch: 0.0,
        }
    }

    /// Camera looking along -Z rotated by `angle` radians about the up axis.
    pub fn facing(position: Vec3, angle: f32) -> Self {
        let direction = Mat3::from_rotation_y(angle) * Vec3::NEG_Z;
        Self::look_at(position, position + direction, Vec3::Y)
    }

    /// Back to the origin looking down -Z.
    pub fn reset(&mut self) {
        *self = Self::facing(Vec3::ZERO, 0.0);
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Horizontal right vector, not normalised. Zero when looking straight
    /// up or down with a vertical up vector.
    pub fn right_xz(&self) -> Vec3 {
        let mut right = self.up.cross(-self.lookat);
        right.y = 0.0;
        right
    }

    /// Horizontal forward direction, `None` when looking straight up or down.
    pub fn forward_xz(&self) -> Option<Vec3> {
        let forward = Vec3::new(self.lookat.x, 0.0, self.lookat.z);
        let length = forward.length();
        (length > EPSILON_MEDIUM).then(|| forward / length)
    }

    /// Apply a mouse delta in pixels: yaw about world Y, pitch about the
    /// horizontal right axis, pitch clamped to the configured limit.
    pub fn rotate(&mut self, mouse_delta: Vec2, config: &CameraConfig) {
        let right = self.right_xz();

        // Rebuild the look direction from up and right to stop drift
        if right.length() > EPSILON_MEDIUM {
            if let Some(lookat) = self.up.cross(right).try_normalize() {
                self.lookat = lookat;
            }
        }

        let limit = config.vertical_limit_degrees.to_radians();
        let frame_dy = (-mouse_delta.y * config.vertical_sensitivity)
            .clamp(-limit - self.pitch, limit - self.pitch);
        self.pitch += frame_dy;

        let yaw = Mat3::from_rotation_y(-mouse_delta.x * config.horizontal_sensitivity);
        let pitch = match right.try_normalize() {
            Some(axis) => Mat3::from_axis_angle(axis, frame_dy),
            None => Mat3::IDENTITY,
        };

        let rotation = yaw * pitch;
        self.lookat = (rotation * self.lookat).normalize_or_zero();
        self.up = (rotation * self.up).normalize_or_zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_facing() {
        let camera = Camera::facing(Vec3::ZERO, 0.0);
        assert!((camera.lookat - Vec3::NEG_Z).length() < 1e-6);
        assert!((camera.right_xz() - Vec3::X).length() < 1e-6);

        let turned = Camera::facing(Vec3::ZERO, FRAC_PI_2);
        assert!((turned.lookat - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_yaw_right() {
        let mut camera = Camera::default();
        camera.rotate(Vec2::new(FRAC_PI_2 * 1000.0, 0.0), &CameraConfig::default());

        assert!((camera.lookat - Vec3::X).length() < 1e-4, "lookat = {}", camera.lookat);
        assert!(camera.pitch().abs() < 1e-6);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let config = CameraConfig::default();
        let mut camera = Camera::default();

        // Mouse up a long way, twice
        camera.rotate(Vec2::new(0.0, -2000.0), &config);
        camera.rotate(Vec2::new(0.0, -2000.0), &config);

        let limit = 60f32.to_radians();
        assert!((camera.pitch() - limit).abs() < 1e-5);
        assert!((camera.lookat.y - limit.sin()).abs() < 1e-4);
        assert!(camera.forward_xz().is_some());

        camera.rotate(Vec2::new(0.0, 4000.0), &config);
        assert!((camera.pitch() + limit).abs() < 1e-5);
        assert!((camera.lookat.y + limit.sin()).abs() < 1e-4);
    }

    #[test]
    fn test_reset() {
        let mut camera = Camera::facing(Vec3::new(5.0, 5.0, 5.0), 1.0);
        camera.rotate(Vec2::new(10.0, -300.0), &CameraConfig::default());
        camera.reset();

        assert_eq!(camera.position, Vec3::ZERO);
        assert!((camera.lookat - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(camera.pitch(), 0.0);
    }
}
