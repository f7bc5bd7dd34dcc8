//! Contract components shared with the host's 2D physics and level code.
//!
//! The replay engine never steps physics. It reads and writes `PhysicsBody2d`
//! as the authoritative planar pose and expects the host's physics bridge to
//! sync it with `Transform`.

use bevy::prelude::*;

/// Handle to a 2D rigid body.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBody2d {
    /// World-plane position (x, y).
    pub position: Vec2,
    /// Degrees about Z.
    pub rotation: f32,
    /// When false the body is excluded from simulation and playback writes go
    /// straight to the `Transform`.
    pub simulated: bool,
    /// Kinematic bodies ignore forces. Playback switches dynamic bodies to
    /// kinematic for the session and restores them afterwards.
    pub kinematic: bool,
}

impl PhysicsBody2d {
    pub fn dynamic(position: Vec2, rotation: f32) -> Self {
        Self {
            position,
            rotation,
            simulated: true,
            kinematic: false,
        }
    }
}

impl Default for PhysicsBody2d {
    fn default() -> Self {
        Self::dynamic(Vec2::ZERO, 0.0)
    }
}

/// Marks the primary player-controlled entity. The first one found is always
/// recorded and becomes the camera's follow target during playback.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct PlayerControlled;

/// Opt an entity into recording.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct ReplayTarget {
    /// Also record every descendant.
    pub include_children: bool,
}

/// Level-assigned tag, matched against `ReplayConfig::tags`.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct EntityTag(pub String);

impl EntityTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

/// Z rotation of a transform, in degrees.
pub fn transform_angle_deg(transform: &Transform) -> f32 {
    let (z, _, _) = transform.rotation.to_euler(EulerRot::ZYX);
    z.to_degrees()
}

/// Rotation about Z from degrees.
pub fn rotation_from_deg(degrees: f32) -> Quat {
    Quat::from_rotation_z(degrees.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_roundtrip_through_quat() {
        let transform = Transform::from_rotation(rotation_from_deg(30.0));
        assert!((transform_angle_deg(&transform) - 30.0).abs() < 1e-4);
    }

    #[test]
    fn dynamic_body_defaults() {
        let body = PhysicsBody2d::dynamic(Vec2::new(1.0, 2.0), 45.0);
        assert!(body.simulated);
        assert!(!body.kinematic);
    }
}
