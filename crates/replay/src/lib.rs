//! Attempt replay: records the motion of selected entities during a player
//! attempt and plays it back deterministically, across scene rebuilds and
//! independent of virtual-time pause.
//!
//! Data flow: `collector` → `recorder` → `codec` → cache file → `codec` →
//! `playback` → camera and physics collaborators.

mod atomic_write;
pub mod cache;
pub mod camera;
pub mod codec;
pub mod collector;
pub mod config;
pub mod identity;
pub mod interpolate;
pub mod operations;
pub mod physics;
pub mod playback;
pub mod plugin;
pub mod recorder;
pub mod replay_error;
pub mod sampler;
pub mod session;

#[cfg(test)]
mod codec_tests;
#[cfg(test)]
mod integration_tests;

pub use camera::{CameraHandoff, CameraTargets};
pub use config::ReplayConfig;
pub use identity::{ReplayGhost, ReplayIdentity, ResolvedTarget};
pub use operations::ReplayWorldExt;
pub use physics::{EntityTag, PhysicsBody2d, PlayerControlled, ReplayTarget};
pub use playback::{OnPlaybackFinished, PlaybackFinished, PlaybackState, ReplayPlayer};
pub use plugin::{
    AttemptOutcome, BeginRecordingRequest, EndRecordingRequest, PlayCachedRequest, ReplayPlugin,
};
pub use recorder::ReplayRecorder;
pub use replay_error::ReplayError;
pub use session::{Pose, ReplayData};
