//! In-memory replay session: a fixed-step time series of poses for every
//! recorded track.
//!
//! Samples are stored frame-major: the pose of track `t` at frame `f` lives at
//! index `f * track_count + t` of both `positions` and `rotations`.

use bevy::prelude::*;

/// One sampled pose. Rotation is a single angle in degrees about Z.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: f32,
}

impl Pose {
    pub fn new(position: Vec3, rotation: f32) -> Self {
        Self { position, rotation }
    }
}

/// A complete recording, as written to and read from the cache file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayData {
    /// Sample interval in seconds. Always > 0.
    pub step: f32,
    pub track_count: i32,
    /// `<name-path>#<short-id>` per track.
    pub identifiers: Vec<String>,
    /// Sample timestamps, one per frame.
    pub times: Vec<f32>,
    pub positions: Vec<Vec3>,
    /// Degrees.
    pub rotations: Vec<f32>,
}

impl ReplayData {
    /// Empty session for the given tracks, ready for `push_frame`.
    pub fn new(step: f32, identifiers: Vec<String>) -> Self {
        Self {
            step,
            track_count: identifiers.len() as i32,
            identifiers,
            times: Vec::new(),
            positions: Vec::new(),
            rotations: Vec::new(),
        }
    }

    /// Append one frame. `poses` must hold exactly one pose per track.
    pub fn push_frame(&mut self, time: f32, poses: &[Pose]) {
        debug_assert_eq!(poses.len(), self.track_count.max(0) as usize);
        self.times.push(time);
        for pose in poses {
            self.positions.push(pose.position);
            self.rotations.push(pose.rotation);
        }
    }

    /// Number of recorded frames. Zero-track sessions report their sample
    /// count from `times`.
    pub fn frame_count(&self) -> usize {
        if self.track_count > 0 {
            self.positions.len() / self.track_count as usize
        } else {
            self.times.len()
        }
    }

    /// Pose of `track` at `frame`. Callers guarantee both are in range.
    pub fn pose(&self, frame: usize, track: usize) -> Pose {
        let index = frame * self.track_count as usize + track;
        Pose {
            position: self.positions[index],
            rotation: self.rotations[index],
        }
    }

    /// Check the structural invariants shared by the codec and the player:
    /// - `step` is finite and positive, `track_count` is not negative
    /// - `positions` and `rotations` hold whole frames of equal count
    /// - with tracks present, one identifier per track and one time per frame
    pub fn validate(&self) -> Result<(), String> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(format!("step must be positive, found {}", self.step));
        }
        if self.track_count < 0 {
            return Err(format!("negative track count {}", self.track_count));
        }
        if self.track_count == 0 {
            if !self.positions.is_empty() || !self.rotations.is_empty() {
                return Err(format!(
                    "zero tracks but {} positions and {} rotations",
                    self.positions.len(),
                    self.rotations.len()
                ));
            }
            if !self.identifiers.is_empty() {
                return Err(format!(
                    "zero tracks but {} identifiers",
                    self.identifiers.len()
                ));
            }
            return Ok(());
        }

        let tracks = self.track_count as usize;
        if self.positions.len() % tracks != 0 || self.rotations.len() % tracks != 0 {
            return Err(format!(
                "{} positions / {} rotations are not whole frames of {} tracks",
                self.positions.len(),
                self.rotations.len(),
                tracks
            ));
        }
        let position_frames = self.positions.len() / tracks;
        let rotation_frames = self.rotations.len() / tracks;
        if position_frames != rotation_frames {
            return Err(format!(
                "frame count mismatch: {position_frames} position frames vs {rotation_frames} rotation frames"
            ));
        }
        if self.identifiers.len() != tracks {
            return Err(format!(
                "{} identifiers for {} tracks",
                self.identifiers.len(),
                tracks
            ));
        }
        if self.times.len() != position_frames {
            return Err(format!(
                "{} timestamps for {} frames",
                self.times.len(),
                position_frames
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_track_session() -> ReplayData {
        let mut data = ReplayData::new(0.5, vec!["A#aaaaaaaa".into(), "B#bbbbbbbb".into()]);
        data.push_frame(
            0.0,
            &[Pose::new(Vec3::ZERO, 0.0), Pose::new(Vec3::ONE, 90.0)],
        );
        data.push_frame(
            0.5,
            &[Pose::new(Vec3::X, 10.0), Pose::new(Vec3::Y, 180.0)],
        );
        data
    }

    #[test]
    fn frame_major_layout() {
        let data = two_track_session();
        assert_eq!(data.frame_count(), 2);
        assert_eq!(data.pose(1, 0), Pose::new(Vec3::X, 10.0));
        assert_eq!(data.pose(0, 1), Pose::new(Vec3::ONE, 90.0));
        assert!(data.validate().is_ok());
    }

    #[test]
    fn zero_track_session_is_valid() {
        let mut data = ReplayData::new(0.1, Vec::new());
        data.push_frame(0.0, &[]);
        data.push_frame(0.1, &[]);
        assert_eq!(data.frame_count(), 2);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn zero_track_session_with_identifiers_rejected() {
        let mut data = ReplayData::new(0.1, Vec::new());
        data.identifiers.push("Stray#strayid1".into());
        data.push_frame(0.0, &[]);
        let err = data.validate().unwrap_err();
        assert!(err.contains("zero tracks but 1 identifiers"), "got: {err}");
    }

    #[test]
    fn rotation_frame_mismatch_rejected() {
        let mut data = two_track_session();
        data.rotations.truncate(2);
        let err = data.validate().unwrap_err();
        assert!(err.contains("frame count mismatch"), "got: {err}");
    }

    #[test]
    fn partial_frame_rejected() {
        let mut data = two_track_session();
        data.positions.pop();
        let err = data.validate().unwrap_err();
        assert!(err.contains("whole frames"), "got: {err}");
    }

    #[test]
    fn identifier_count_checked() {
        let mut data = two_track_session();
        data.identifiers.pop();
        assert!(data.validate().is_err());
    }
}
