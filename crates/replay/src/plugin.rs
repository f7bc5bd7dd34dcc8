//! Bevy plugin that registers replay resources, request events and systems.

use bevy::prelude::*;

use crate::cache::ReplayCache;
use crate::camera::{CameraBridge, CameraHandoff};
use crate::config::ReplayConfig;
use crate::operations::ReplayWorldExt;
use crate::playback::{drive_playback, PlaybackFinished, ReplayPlayer};
use crate::recorder::{sample_recording, ReplayRecorder};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Start a new recording. `extra_targets` are recorded after tagged entities.
#[derive(Event, Debug, Clone, Default)]
pub struct BeginRecordingRequest {
    pub extra_targets: Vec<Entity>,
}

/// Stop the current recording, keeping or discarding it.
#[derive(Event, Debug, Clone, Copy)]
pub struct EndRecordingRequest {
    pub keep_file: bool,
}

/// Play the cached recording. Completion is reported by `PlaybackFinished`.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct PlayCachedRequest;

/// Sent by the host's stage rules when an attempt ends. The replay engine
/// keeps the recording on success and discards it on failure; it never
/// decides which one happened.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
}

impl AttemptOutcome {
    pub fn keeps_recording(self) -> bool {
        self == AttemptOutcome::Succeeded
    }
}

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Recording and playback of attempts.
///
/// Systems run in `Update`, chained: request handling, then sampling, then
/// playback. Register the host camera with `with_camera` to have playback
/// take it over.
pub struct ReplayPlugin {
    config: ReplayConfig,
    camera: Option<CameraBridge>,
}

impl Default for ReplayPlugin {
    fn default() -> Self {
        Self::new(ReplayConfig::default())
    }
}

impl ReplayPlugin {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            camera: None,
        }
    }

    pub fn with_camera<C: CameraHandoff>(mut self) -> Self {
        self.camera = Some(CameraBridge::new::<C>());
        self
    }
}

impl Plugin for ReplayPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ReplayCache::new(self.config.cache_path.clone()))
            .insert_resource(self.config.clone())
            .init_resource::<ReplayRecorder>()
            .init_resource::<ReplayPlayer>()
            .add_event::<BeginRecordingRequest>()
            .add_event::<EndRecordingRequest>()
            .add_event::<PlayCachedRequest>()
            .add_event::<AttemptOutcome>()
            .add_event::<PlaybackFinished>();

        if let Some(bridge) = self.camera {
            app.insert_resource(bridge);
        }

        app.add_systems(
            Update,
            (handle_replay_requests, sample_recording, drive_playback).chain(),
        );
    }
}

/// Turns request events into world operations, applied at the next sync
/// point. Within one frame, stops (`EndRecordingRequest`, `AttemptOutcome`)
/// run before starts, and starts before playback: a respawn that reports
/// `Failed` and begins the next attempt in the same frame keeps the new
/// recording.
fn handle_replay_requests(
    mut begin: EventReader<BeginRecordingRequest>,
    mut end: EventReader<EndRecordingRequest>,
    mut outcomes: EventReader<AttemptOutcome>,
    mut play: EventReader<PlayCachedRequest>,
    mut commands: Commands,
) {
    for request in end.read() {
        let keep_file = request.keep_file;
        commands.queue(move |world: &mut World| {
            world.end_recording(keep_file);
        });
    }
    for outcome in outcomes.read() {
        let keep_file = outcome.keeps_recording();
        commands.queue(move |world: &mut World| {
            world.end_recording(keep_file);
        });
    }
    for request in begin.read() {
        let extra_targets = request.extra_targets.clone();
        commands.queue(move |world: &mut World| world.begin_recording(&extra_targets));
    }
    if play.read().next().is_some() {
        // Only one playback can run; extra requests this frame are dropped.
        play.read().for_each(drop);
        commands.queue(|world: &mut World| {
            world.play_cached(None);
        });
    }
}
