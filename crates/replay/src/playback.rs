//! Replay player: binds a decoded session to live entities and drives
//! interpolated poses in real time until the last frame.
//!
//! State machine: `Idle → Loading → Bound → Playing → Idle`. Validation of the
//! session completes before any entity is touched; a rejected session leaves
//! the world unchanged and the player `Idle`.

use std::time::Duration;

use bevy::prelude::*;

use crate::camera::{CameraBridge, CameraTargets};
use crate::identity::{resolve, IdentityIndex, ResolvedTarget};
use crate::interpolate::{blended_pose, FrameBlend};
use crate::physics::{rotation_from_deg, PhysicsBody2d, PlayerControlled};
use crate::replay_error::ReplayError;
use crate::session::{Pose, ReplayData};

/// One-shot callback run with world access when playback completes.
pub type OnPlaybackFinished = Box<dyn FnOnce(&mut World) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Bound,
    Playing,
}

/// Sent once when a playback reaches its final frame.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackFinished {
    pub tracks: usize,
    pub ghosts: usize,
}

/// A session track bound to a live entity.
#[derive(Debug, Clone, Copy)]
pub struct BoundTrack {
    pub target: ResolvedTarget,
    /// The body was switched to kinematic for this playback.
    suspended_body: bool,
}

#[derive(Resource, Default)]
pub struct ReplayPlayer {
    state: PlaybackState,
    session: Option<ReplayData>,
    tracks: Vec<BoundTrack>,
    /// `Time<Real>::elapsed()` at the start of playback.
    start: Duration,
    camera_restore: Option<CameraTargets>,
    on_finished: Option<OnPlaybackFinished>,
}

impl ReplayPlayer {
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn tracks(&self) -> &[BoundTrack] {
        &self.tracks
    }

    pub fn session(&self) -> Option<&ReplayData> {
        self.session.as_ref()
    }

    pub(crate) fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
    }

    /// Write the poses for real time `now`. Returns whether the last frame
    /// was reached.
    fn apply_frame(&self, world: &mut World, now: Duration) -> bool {
        let Some(session) = self.session.as_ref() else {
            return true;
        };
        let elapsed = now.saturating_sub(self.start).as_secs_f64();
        let frame = FrameBlend::at(elapsed, session.step, session.frame_count());
        for (index, track) in self.tracks.iter().enumerate() {
            let pose = blended_pose(session, frame, index);
            write_pose(world, track.target.entity(), pose);
        }
        frame.finished
    }
}

/// Reject sessions the player cannot drive.
pub fn validate_playable(data: &ReplayData) -> Result<(), ReplayError> {
    if data.track_count <= 0 {
        return Err(ReplayError::InvalidSession(format!(
            "track count is {}",
            data.track_count
        )));
    }
    data.validate().map_err(ReplayError::InvalidSession)?;
    if data.frame_count() == 0 {
        return Err(ReplayError::InvalidSession("session has no frames".to_string()));
    }
    Ok(())
}

pub(crate) fn real_elapsed(world: &World) -> Duration {
    world
        .get_resource::<Time<Real>>()
        .map(|time| time.elapsed())
        .unwrap_or_default()
}

/// Bodies are preferred so physics queries see the replayed pose; z stays on
/// the transform. Without an active body the transform is written directly.
fn write_pose(world: &mut World, entity: Entity, pose: Pose) {
    let body_active = world
        .get::<PhysicsBody2d>(entity)
        .is_some_and(|body| body.simulated);
    if body_active {
        if let Some(mut body) = world.get_mut::<PhysicsBody2d>(entity) {
            body.position = pose.position.truncate();
            body.rotation = pose.rotation;
        }
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation.z = pose.position.z;
        }
    } else if let Some(mut transform) = world.get_mut::<Transform>(entity) {
        transform.translation = pose.position;
        transform.rotation = rotation_from_deg(pose.rotation);
    }
}

/// Switch a simulated dynamic body to kinematic. Returns whether it changed.
fn suspend_body(world: &mut World, entity: Entity) -> bool {
    match world.get_mut::<PhysicsBody2d>(entity) {
        Some(mut body) if body.simulated && !body.kinematic => {
            body.kinematic = true;
            true
        }
        _ => false,
    }
}

/// Validate `data`, bind every track and enter `Playing`. The first frame is
/// applied immediately.
pub(crate) fn start_playback(
    world: &mut World,
    data: ReplayData,
    ghost_name: &str,
    on_finished: Option<OnPlaybackFinished>,
) -> Result<(), ReplayError> {
    validate_playable(&data)?;

    let index = IdentityIndex::build(world);
    let mut tracks = Vec::with_capacity(data.identifiers.len());
    for identifier in &data.identifiers {
        let target = resolve(world, &index, identifier, ghost_name);
        let suspended_body = suspend_body(world, target.entity());
        tracks.push(BoundTrack {
            target,
            suspended_body,
        });
    }
    world.resource_mut::<ReplayPlayer>().set_state(PlaybackState::Bound);

    let primary = tracks
        .iter()
        .map(|t| t.target.entity())
        .find(|e| world.get::<PlayerControlled>(*e).is_some())
        .unwrap_or_else(|| tracks[0].target.entity());
    let camera_restore = world
        .get_resource::<CameraBridge>()
        .copied()
        .and_then(|bridge| bridge.take_over(world, primary));

    let ghosts = tracks.iter().filter(|t| t.target.is_ghost()).count();
    let start = real_elapsed(world);
    info!(
        "Replay playback started: {} tracks ({} ghosts), {} frames at {}s",
        tracks.len(),
        ghosts,
        data.frame_count(),
        data.step
    );

    let finished = world.resource_scope(|world, mut player: Mut<ReplayPlayer>| {
        player.session = Some(data);
        player.tracks = tracks;
        player.start = start;
        player.camera_restore = camera_restore;
        player.on_finished = on_finished;
        player.state = PlaybackState::Playing;
        player.apply_frame(world, start)
    });
    if finished {
        finish_playback(world);
    }
    Ok(())
}

/// Restore bodies, ghosts and camera, then fire the completion callback and
/// `PlaybackFinished`.
fn finish_playback(world: &mut World) {
    let (tracks, camera_restore, on_finished) = {
        let mut player = world.resource_mut::<ReplayPlayer>();
        player.state = PlaybackState::Idle;
        player.session = None;
        (
            std::mem::take(&mut player.tracks),
            player.camera_restore.take(),
            player.on_finished.take(),
        )
    };

    let mut ghosts = 0;
    for track in &tracks {
        let entity = track.target.entity();
        if track.suspended_body {
            if let Some(mut body) = world.get_mut::<PhysicsBody2d>(entity) {
                body.kinematic = false;
            }
        }
        if track.target.is_ghost() {
            ghosts += 1;
            world.despawn(entity);
        }
    }

    if let (Some(bridge), Some(previous)) =
        (world.get_resource::<CameraBridge>().copied(), camera_restore)
    {
        bridge.release(world, previous);
    }

    info!("Replay playback finished ({} tracks)", tracks.len());

    if let Some(callback) = on_finished {
        callback(world);
    }
    if world.contains_resource::<Events<PlaybackFinished>>() {
        world.send_event(PlaybackFinished {
            tracks: tracks.len(),
            ghosts,
        });
    }
}

/// Exclusive system advancing an active playback by one frame.
pub fn drive_playback(world: &mut World) {
    let playing = world
        .get_resource::<ReplayPlayer>()
        .is_some_and(ReplayPlayer::is_playing);
    if !playing {
        return;
    }
    let now = real_elapsed(world);
    let finished =
        world.resource_scope(|world, player: Mut<ReplayPlayer>| player.apply_frame(world, now));
    if finished {
        finish_playback(world);
    }
}
