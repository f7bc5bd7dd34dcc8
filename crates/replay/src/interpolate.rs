//! Frame selection and pose blending for playback.

use bevy::math::Vec3;

use crate::session::{Pose, ReplayData};

/// Where playback is at a given elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBlend {
    pub f0: usize,
    pub f1: usize,
    /// In `[0, 1]`.
    pub blend: f32,
    /// `f0` has reached the last frame; the pose snaps to it.
    pub finished: bool,
}

impl FrameBlend {
    /// `frame_count` must be at least 1.
    pub fn at(elapsed: f64, step: f32, frame_count: usize) -> Self {
        let last = frame_count.saturating_sub(1);
        let position = (elapsed.max(0.0) / f64::from(step)).max(0.0);
        let whole = position.floor();
        // Saturating float-to-int cast; very long elapsed times clamp to last.
        let f0 = whole as usize;
        if f0 >= last {
            return Self {
                f0: last,
                f1: last,
                blend: 0.0,
                finished: true,
            };
        }
        Self {
            f0,
            f1: (f0 + 1).min(last),
            blend: ((position - whole) as f32).clamp(0.0, 1.0),
            finished: false,
        }
    }
}

/// Interpolate between two angles in degrees along the shorter arc.
///
/// The result is exactly `from` at `t <= 0` and exactly `to` at `t >= 1`.
/// In between it is `from` plus a fraction of the signed shortest delta, so
/// it may leave `[0, 360)` (350 → 10 passes through 360, not 180).
pub fn lerp_angle_deg(from: f32, to: f32, t: f32) -> f32 {
    if t <= 0.0 {
        return from;
    }
    if t >= 1.0 {
        return to;
    }
    from + shortest_delta_deg(from, to) * t
}

/// Signed difference `to - from` wrapped into `[-180, 180)`.
pub fn shortest_delta_deg(from: f32, to: f32) -> f32 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

pub fn lerp_position(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    from.lerp(to, t)
}

/// Interpolated pose of `track` for the given frame blend.
pub fn blended_pose(data: &ReplayData, frame: FrameBlend, track: usize) -> Pose {
    let a = data.pose(frame.f0, track);
    if frame.finished || frame.f0 == frame.f1 {
        return a;
    }
    let b = data.pose(frame.f1, track);
    Pose {
        position: lerp_position(a.position, b.position, frame.blend),
        rotation: lerp_angle_deg(a.rotation, b.rotation, frame.blend),
    }
}
