//! Handoff contract between playback and the host camera.
//!
//! The engine never frames, zooms or eases the camera itself. During playback
//! it parks the camera on the primary track and hands it back afterwards.

use bevy::prelude::*;

/// Targets a camera was following before a takeover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraTargets {
    pub initial: Option<Entity>,
    pub follow: Option<Entity>,
}

/// Implemented by the host's camera resource.
pub trait CameraHandoff: Resource {
    /// Current initial and follow targets, captured before `take_over`.
    fn targets(&self) -> CameraTargets;

    /// Stop autonomous transitions and follow `follow` every frame.
    fn take_over(&mut self, follow: Entity);

    /// Restore `previous` targets and reset internal timers.
    fn release(&mut self, previous: CameraTargets);
}

/// Camera calls monomorphized at plugin build, so playback can drive any
/// `CameraHandoff` resource without being generic itself.
#[derive(Resource, Clone, Copy)]
pub(crate) struct CameraBridge {
    take_over: fn(&mut World, Entity) -> Option<CameraTargets>,
    release: fn(&mut World, CameraTargets),
}

impl CameraBridge {
    pub(crate) fn new<C: CameraHandoff>() -> Self {
        Self {
            take_over: take_over_with::<C>,
            release: release_with::<C>,
        }
    }

    /// Capture the camera's targets, then take it over. `None` if the camera
    /// resource does not exist.
    pub(crate) fn take_over(&self, world: &mut World, follow: Entity) -> Option<CameraTargets> {
        (self.take_over)(world, follow)
    }

    pub(crate) fn release(&self, world: &mut World, previous: CameraTargets) {
        (self.release)(world, previous);
    }
}

fn take_over_with<C: CameraHandoff>(world: &mut World, follow: Entity) -> Option<CameraTargets> {
    let mut camera = world.get_resource_mut::<C>()?;
    let previous = camera.targets();
    camera.take_over(follow);
    Some(previous)
}

fn release_with<C: CameraHandoff>(world: &mut World, previous: CameraTargets) {
    match world.get_resource_mut::<C>() {
        Some(mut camera) => camera.release(previous),
        None => warn!("Replay camera resource disappeared before release"),
    }
}
