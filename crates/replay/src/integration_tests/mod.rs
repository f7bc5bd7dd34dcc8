//! Headless `App` tests for the replay plugin.
//!
//! `ReplayTestApp` wraps `MinimalPlugins` with a manual real-time clock so
//! every `tick()` advances `Time<Real>` by a fixed frame duration.


use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use tempfile::TempDir;

use crate::cache::ReplayCache;
use crate::camera::{CameraHandoff, CameraTargets};
use crate::config::ReplayConfig;
use crate::plugin::ReplayPlugin;
use crate::session::ReplayData;

/// Camera stand-in that records handoff calls.
#[derive(Resource, Default, Debug)]
pub(crate) struct TestCamera {
    pub targets: CameraTargets,
    pub taken_over: bool,
    pub transition_timer: f32,
    pub take_over_calls: u32,
}

impl CameraHandoff for TestCamera {
    fn targets(&self) -> CameraTargets {
        self.targets
    }

    fn take_over(&mut self, follow: Entity) {
        self.taken_over = true;
        self.take_over_calls += 1;
        self.targets.follow = Some(follow);
    }

    fn release(&mut self, previous: CameraTargets) {
        self.taken_over = false;
        self.targets = previous;
        self.transition_timer = 0.0;
    }
}

pub(crate) struct ReplayTestApp {
    app: App,
    _cache_dir: TempDir,
    cache_path: std::path::PathBuf,
}

impl ReplayTestApp {
    /// App with the replay plugin, a `TestCamera`, capture tag `Crate` and a
    /// private cache file. Each tick advances real time by `frame`.
    pub fn new(frame: Duration) -> Self {
        Self::with_config(frame, ReplayConfig::default().with_tags(["Crate"]))
    }

    pub fn with_config(frame: Duration, config: ReplayConfig) -> Self {
        let cache_dir = tempfile::tempdir().expect("temp dir");
        let cache_path = cache_dir.path().join("attempt_replay.bin");

        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(frame));
        app.init_resource::<TestCamera>();
        app.add_plugins(
            ReplayPlugin::new(config.with_cache_path(cache_path.clone()))
                .with_camera::<TestCamera>(),
        );
        // First update initializes the real clock without advancing it.
        app.update();

        Self {
            app,
            _cache_dir: cache_dir,
            cache_path,
        }
    }

    pub fn world(&self) -> &World {
        self.app.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn tick(&mut self) {
        self.app.update();
    }

    pub fn tick_n(&mut self, n: usize) {
        for _ in 0..n {
            self.app.update();
        }
    }

    pub fn cache_path(&self) -> &std::path::Path {
        &self.cache_path
    }

    /// Write a session straight into the cache slot.
    pub fn seed_cache(&self, data: &ReplayData) {
        ReplayCache::new(self.cache_path.clone())
            .write(data)
            .expect("seed cache");
    }
}
