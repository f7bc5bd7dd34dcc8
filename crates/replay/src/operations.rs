// ---------------------------------------------------------------------------
// ReplayWorldExt – the replay engine's public operations
// ---------------------------------------------------------------------------
//
// Every operation resolves failures to `false`/`None` plus a log line; no
// error escapes to the caller.

use bevy::prelude::*;

use crate::cache::ReplayCache;
use crate::collector::collect_targets;
use crate::config::{is_valid_step, ReplayConfig};
use crate::identity::identifier_for;
use crate::playback::{
    real_elapsed, start_playback, OnPlaybackFinished, PlaybackState, ReplayPlayer,
};
use crate::recorder::{ReplayRecorder, Track};
use crate::replay_error::ReplayError;
use crate::session::ReplayData;

/// Extension trait on `World` exposing recording and playback.
///
/// # Example
///
/// ```ignore
/// use replay::ReplayWorldExt;
///
/// world.begin_recording(&[]);
/// // ... attempt runs ...
/// world.end_recording(true);
/// world.play_cached(Some(Box::new(|world: &mut World| {
///     world.send_event(ShowRetryButton);
/// })));
/// ```
pub trait ReplayWorldExt {
    /// Collect targets and start a new session, discarding any unsaved one.
    /// Refused, with an error log, when the configured step is not positive;
    /// any session already running is left alone.
    fn begin_recording(&mut self, extra_targets: &[Entity]);

    /// Stop sampling. With `keep_file` the session is written to the cache;
    /// otherwise it is dropped and any cache file deleted. Returns whether a
    /// file was written.
    fn end_recording(&mut self, keep_file: bool) -> bool;

    fn has_replay_cache(&self) -> bool;

    /// Read and decode the cache. Missing and corrupt caches are both `None`.
    fn load_replay_from_cache(&self) -> Option<ReplayData>;

    /// Load the cache and start playback. Returns whether playback started.
    fn play_cached(&mut self, on_finished: Option<OnPlaybackFinished>) -> bool;
}

fn config(world: &World) -> ReplayConfig {
    world
        .get_resource::<ReplayConfig>()
        .cloned()
        .unwrap_or_default()
}

fn cache(world: &World) -> ReplayCache {
    world
        .get_resource::<ReplayCache>()
        .cloned()
        .unwrap_or_else(|| ReplayCache::new(config(world).cache_path))
}

impl ReplayWorldExt for World {
    fn begin_recording(&mut self, extra_targets: &[Entity]) {
        let config = config(self);
        if !is_valid_step(config.step) {
            error!(
                "Replay recording not started: step must be positive, got {}",
                config.step
            );
            return;
        }
        let targets = collect_targets(self, &config, extra_targets);
        if targets.is_empty() {
            warn!("No replay targets found; recording an empty session");
        }

        let tracks: Vec<Track> = targets
            .into_iter()
            .map(|target| {
                let identifier = identifier_for(self, target.entity);
                Track::new(target.entity, identifier, target.has_body)
            })
            .collect();
        let track_count = tracks.len();
        let now = real_elapsed(self);

        let mut recorder = self.get_resource_or_insert_with(ReplayRecorder::default);
        if recorder.is_recording() {
            debug!(
                "Discarding unsaved replay session ({} frames)",
                recorder.frame_count()
            );
        }
        recorder.start(config.step, tracks, now);
        info!(
            "Replay recording started: {} tracks at {}s",
            track_count, config.step
        );
    }

    fn end_recording(&mut self, keep_file: bool) -> bool {
        let session = self
            .get_resource_mut::<ReplayRecorder>()
            .and_then(|mut recorder| recorder.stop());
        let cache = cache(self);

        if !keep_file {
            if let Some(session) = &session {
                info!(
                    "Replay recording discarded ({} frames)",
                    session.frame_count()
                );
            }
            if let Err(e) = cache.delete() {
                error!("Failed to delete replay cache {}: {e}", cache.path().display());
            }
            return false;
        }

        let Some(session) = session else {
            debug!("end_recording(true) with no active recording");
            return false;
        };
        match cache.write(&session) {
            Ok(()) => {
                info!(
                    "Replay saved to {}: {} tracks, {} frames",
                    cache.path().display(),
                    session.track_count,
                    session.frame_count()
                );
                true
            }
            Err(e) => {
                error!("Replay save failed: {e}");
                false
            }
        }
    }

    fn has_replay_cache(&self) -> bool {
        cache(self).exists()
    }

    fn load_replay_from_cache(&self) -> Option<ReplayData> {
        let cache = cache(self);
        match cache.read() {
            Ok(data) => Some(data),
            Err(ReplayError::NoCache) => {
                debug!("No replay cache at {}", cache.path().display());
                None
            }
            Err(e) if e.is_corrupt() => {
                warn!("Ignoring replay cache {}: {e}", cache.path().display());
                None
            }
            Err(e) => {
                error!("Replay load failed: {e}");
                None
            }
        }
    }

    fn play_cached(&mut self, on_finished: Option<OnPlaybackFinished>) -> bool {
        let ghost_name = config(self).ghost_name;
        {
            let mut player = self.get_resource_or_insert_with(ReplayPlayer::default);
            if player.state() != PlaybackState::Idle {
                warn!("Replay playback already running; request ignored");
                return false;
            }
            player.set_state(PlaybackState::Loading);
        }

        let Some(data) = self.load_replay_from_cache() else {
            self.resource_mut::<ReplayPlayer>()
                .set_state(PlaybackState::Idle);
            return false;
        };

        match start_playback(self, data, &ghost_name, on_finished) {
            Ok(()) => true,
            Err(e) => {
                warn!("Replay playback rejected: {e}");
                self.resource_mut::<ReplayPlayer>()
                    .set_state(PlaybackState::Idle);
                false
            }
        }
    }
}
