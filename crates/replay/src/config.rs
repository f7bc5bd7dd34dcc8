use std::path::PathBuf;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Default sampling interval: one sample per 60 Hz frame.
pub const DEFAULT_SAMPLE_STEP: f32 = 1.0 / 60.0;

/// Length of the random short id assigned to each `ReplayIdentity`.
pub const SHORT_ID_LEN: usize = 8;

/// Separator between the hierarchical name path and the short id.
pub const ID_SEPARATOR: char = '#';

/// Separator between hierarchy levels in a name path.
pub const PATH_SEPARATOR: char = '/';

/// Path segment used for entities without a `Name`.
pub const UNNAMED_SEGMENT: &str = "?";

pub const DEFAULT_CACHE_FILE: &str = "attempt_replay.bin";

/// Sampling intervals must be finite and strictly positive.
pub fn is_valid_step(step: f32) -> bool {
    step.is_finite() && step > 0.0
}

/// Construction-time configuration for the replay engine.
///
/// Passed to `ReplayPlugin::new` and inserted as a resource. Every knob the
/// recorder, collector and player read lives here.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Sampling interval in seconds of real (unscaled) time. Must be > 0.
    pub step: f32,
    /// Entities whose `EntityTag` is one of these are recorded.
    pub tags: Vec<String>,
    /// Single-slot cache file holding the last kept recording.
    pub cache_path: PathBuf,
    /// `Name` given to placeholder entities spawned for unresolved tracks.
    pub ghost_name: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_SAMPLE_STEP,
            tags: vec!["Replayable".to_string()],
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            ghost_name: "ReplayGhost".to_string(),
        }
    }
}

impl ReplayConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("JSON decode error: {e}"))?;
        if !is_valid_step(config.step) {
            return Err(format!("step must be a positive number, got {}", config.step));
        }
        Ok(config)
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `tag` is one of the configured capture tags.
    pub fn is_capture_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = ReplayConfig::from_json_str(r#"{ "tags": ["Crate", "Ball"] }"#).unwrap();
        assert_eq!(config.tags, vec!["Crate".to_string(), "Ball".to_string()]);
        assert_eq!(config.step, DEFAULT_SAMPLE_STEP);
        assert_eq!(config.cache_path, PathBuf::from(DEFAULT_CACHE_FILE));
    }

    #[test]
    fn non_positive_step_rejected() {
        let err = ReplayConfig::from_json_str(r#"{ "step": 0.0 }"#).unwrap_err();
        assert!(err.contains("positive"), "got: {err}");
    }

    #[test]
    fn capture_tag_lookup() {
        let config = ReplayConfig::default().with_tags(["Crate"]);
        assert!(config.is_capture_tag("Crate"));
        assert!(!config.is_capture_tag("Replayable"));
    }
}
