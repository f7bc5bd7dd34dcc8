//! Replay recorder: samples track poses on a fixed real-time cadence.
//!
//! `sample_recording` runs every `Update` and feeds the frame's real (unscaled)
//! duration into the catch-up `SampleClock`, so virtual-time pause and
//! slow-motion never change the recorded cadence.

use std::time::Duration;

use bevy::prelude::*;

use crate::physics::{transform_angle_deg, PhysicsBody2d};
use crate::sampler::SampleClock;
use crate::session::{Pose, ReplayData};

/// One entity being recorded.
#[derive(Debug, Clone)]
pub struct Track {
    pub entity: Entity,
    /// `<name-path>#<short-id>`.
    pub identifier: String,
    pub has_body: bool,
    /// Held if the entity disappears mid-recording.
    last_pose: Pose,
}

impl Track {
    pub fn new(entity: Entity, identifier: String, has_body: bool) -> Self {
        Self {
            entity,
            identifier,
            has_body,
            last_pose: Pose::default(),
        }
    }
}

/// Active capture state. At most one session exists at a time.
#[derive(Resource, Default)]
pub struct ReplayRecorder {
    tracks: Vec<Track>,
    session: Option<ReplayData>,
    clock: Option<SampleClock>,
    /// `Time<Real>::elapsed()` when the clock was last advanced.
    last_real: Duration,
}

impl ReplayRecorder {
    /// Begin a new session, dropping any unsaved one.
    pub fn start(&mut self, step: f32, tracks: Vec<Track>, now: Duration) {
        let identifiers = tracks.iter().map(|t| t.identifier.clone()).collect();
        self.session = Some(ReplayData::new(step, identifiers));
        self.clock = Some(SampleClock::new(step));
        self.tracks = tracks;
        self.last_real = now;
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Frames captured so far in the active session.
    pub fn frame_count(&self) -> usize {
        self.session.as_ref().map_or(0, ReplayData::frame_count)
    }

    /// Advance the clock to `now`, returning the sample times now due.
    pub fn due_samples(&mut self, now: Duration) -> Vec<f64> {
        let Some(clock) = self.clock.as_mut() else {
            return Vec::new();
        };
        let dt = now.saturating_sub(self.last_real);
        self.last_real = now;
        clock.advance(dt.as_secs_f64())
    }

    /// Append one frame. `poses` yields the current pose of each track, or
    /// `None` if the entity is gone (its last pose is repeated).
    pub fn record_frame<F>(&mut self, time: f64, mut current: F)
    where
        F: FnMut(&Track) -> Option<Pose>,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut poses = Vec::with_capacity(self.tracks.len());
        for track in &mut self.tracks {
            if let Some(pose) = current(track) {
                track.last_pose = pose;
            }
            poses.push(track.last_pose);
        }
        session.push_frame(time as f32, &poses);
    }

    /// Stop sampling and hand back the finished session.
    pub fn stop(&mut self) -> Option<ReplayData> {
        self.tracks.clear();
        self.clock = None;
        self.session.take()
    }
}

/// Pose of one entity. Bodies are authoritative for x, y and rotation; z
/// always comes from the transform because the body is planar.
pub fn read_pose(transform: &Transform, body: Option<&PhysicsBody2d>) -> Pose {
    match body {
        Some(body) => Pose {
            position: Vec3::new(body.position.x, body.position.y, transform.translation.z),
            rotation: body.rotation,
        },
        None => Pose {
            position: transform.translation,
            rotation: transform_angle_deg(transform),
        },
    }
}

/// System that emits every sample due this frame for all tracks.
pub fn sample_recording(
    time: Res<Time<Real>>,
    mut recorder: ResMut<ReplayRecorder>,
    poses: Query<(&Transform, Option<&PhysicsBody2d>)>,
) {
    if !recorder.is_recording() {
        return;
    }
    // Poses are read once per frame; catch-up samples within a frame share them.
    for sample_time in recorder.due_samples(time.elapsed()) {
        recorder.record_frame(sample_time, |track| {
            poses
                .get(track.entity)
                .ok()
                .map(|(transform, body)| read_pose(transform, body.filter(|_| track.has_body)))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder_with_tracks(n: usize) -> ReplayRecorder {
        let mut world = World::new();
        let tracks = (0..n)
            .map(|i| {
                let entity = world.spawn_empty().id();
                Track::new(entity, format!("T{i}#0000000{i}"), false)
            })
            .collect();
        let mut recorder = ReplayRecorder::default();
        recorder.start(0.5, tracks, Duration::ZERO);
        recorder
    }

    #[test]
    fn start_record_stop_produces_valid_session() {
        let mut recorder = recorder_with_tracks(2);
        assert!(recorder.is_recording());

        for t in recorder.due_samples(Duration::from_millis(1000)) {
            recorder.record_frame(t, |_| Some(Pose::new(Vec3::ONE, 5.0)));
        }
        assert_eq!(recorder.frame_count(), 3);

        let data = recorder.stop().unwrap();
        assert!(!recorder.is_recording());
        assert_eq!(recorder.track_count(), 0);
        assert_eq!(data.times, vec![0.0, 0.5, 1.0]);
        assert_eq!(data.positions.len(), 6);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn missing_entity_repeats_last_pose() {
        let mut recorder = recorder_with_tracks(1);
        recorder.record_frame(0.0, |_| Some(Pose::new(Vec3::X, 30.0)));
        recorder.record_frame(0.5, |_| None);
        let data = recorder.stop().unwrap();
        assert_eq!(data.pose(1, 0), Pose::new(Vec3::X, 30.0));
    }

    #[test]
    fn record_while_stopped_is_noop() {
        let mut recorder = ReplayRecorder::default();
        recorder.record_frame(0.0, |_| Some(Pose::default()));
        assert!(recorder.due_samples(Duration::from_secs(5)).is_empty());
        assert!(recorder.stop().is_none());
    }

    #[test]
    fn hybrid_read_takes_z_from_transform() {
        let transform = Transform::from_xyz(100.0, 200.0, -3.5);
        let body = PhysicsBody2d::dynamic(Vec2::new(1.0, 2.0), 270.0);

        let pose = read_pose(&transform, Some(&body));
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, -3.5));
        assert_eq!(pose.rotation, 270.0);

        let pose = read_pose(&transform, None);
        assert_eq!(pose.position, Vec3::new(100.0, 200.0, -3.5));
    }

    #[test]
    fn restart_discards_previous_session() {
        let mut recorder = recorder_with_tracks(1);
        recorder.record_frame(0.0, |_| Some(Pose::default()));
        recorder.start(0.25, Vec::new(), Duration::from_secs(3));
        assert_eq!(recorder.frame_count(), 0);
        assert_eq!(recorder.track_count(), 0);
    }
}
