//! Headless attempt-replay demo.
//!
//! Runs one scripted attempt: a player pushes two crates for two seconds while
//! the replay engine records. The attempt is reported as a success, the level
//! is torn down and rebuilt, and the cached recording is played back on the
//! rebuilt entities. The app exits when playback finishes.
//!
//! Set `REPLAY_DEMO_CONFIG=<file.json>` to override `ReplayConfig`.

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use replay::{
    AttemptOutcome, BeginRecordingRequest, CameraHandoff, CameraTargets, EntityTag,
    PhysicsBody2d, PlayCachedRequest, PlaybackFinished, PlayerControlled, ReplayConfig,
    ReplayIdentity, ReplayPlugin,
};

const ATTEMPT_FRAMES: u32 = 120;

fn main() {
    let mut app = App::new();

    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / 60.0,
        ))),
        LogPlugin::default(),
    ));

    let config = match std::env::var("REPLAY_DEMO_CONFIG") {
        Ok(path) => load_config(&path),
        Err(_) => ReplayConfig::default(),
    };

    app.init_resource::<DemoCamera>()
        .init_resource::<DemoStage>()
        .add_plugins(ReplayPlugin::new(config).with_camera::<DemoCamera>())
        .add_systems(Startup, (spawn_level, start_attempt).chain())
        .add_systems(
            Update,
            (
                drive_stage,
                (step_bodies, sync_bodies).chain(),
                follow_camera,
                exit_on_playback_finished,
            ),
        );

    app.run();
}

fn load_config(path: &str) -> ReplayConfig {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| ReplayConfig::from_json_str(&json));
    match parsed {
        Ok(config) => {
            info!("Loaded replay config from {path}");
            config
        }
        Err(e) => {
            warn!("Ignoring replay config {path}: {e}");
            ReplayConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

#[derive(Component)]
struct LevelRoot;

#[derive(Component, Clone, Copy)]
struct Velocity(Vec2);

/// Level spawner. Short ids are fixed so a rebuilt level rebinds by id.
/// Returns the player.
fn build_level(commands: &mut Commands) -> Entity {
    let mut player = Entity::PLACEHOLDER;
    commands
        .spawn((LevelRoot, Name::new("Level"), Transform::default()))
        .with_children(|level| {
            player = level.spawn((
                Name::new("Player"),
                PlayerControlled,
                ReplayIdentity::with_id("player01"),
                PhysicsBody2d::dynamic(Vec2::ZERO, 0.0),
                Velocity(Vec2::new(60.0, 0.0)),
                Transform::from_xyz(0.0, 0.0, 1.0),
            ))
            .id();
            for (i, id) in ["crate001", "crate002"].into_iter().enumerate() {
                let x = 100.0 + 40.0 * i as f32;
                level.spawn((
                    Name::new("Crate"),
                    EntityTag::new("Replayable"),
                    ReplayIdentity::with_id(id),
                    PhysicsBody2d::dynamic(Vec2::new(x, 0.0), 0.0),
                    Velocity(Vec2::new(20.0, 15.0 * (i as f32 + 1.0))),
                    Transform::from_xyz(x, 0.0, 0.0),
                ));
            }
        });
    player
}

fn spawn_level(mut commands: Commands, mut camera: ResMut<DemoCamera>) {
    let player = build_level(&mut commands);
    camera.targets = CameraTargets {
        initial: Some(player),
        follow: Some(player),
    };
}

/// Toy integrator standing in for the host physics.
fn step_bodies(time: Res<Time>, mut bodies: Query<(&mut PhysicsBody2d, &Velocity)>) {
    let dt = time.delta_secs();
    for (mut body, velocity) in &mut bodies {
        if body.kinematic || !body.simulated {
            continue;
        }
        body.position += velocity.0 * dt;
        body.rotation = (body.rotation + 45.0 * dt) % 360.0;
    }
}

fn sync_bodies(mut bodies: Query<(&PhysicsBody2d, &mut Transform)>) {
    for (body, mut transform) in &mut bodies {
        if !body.simulated {
            continue;
        }
        transform.translation.x = body.position.x;
        transform.translation.y = body.position.y;
        transform.rotation = Quat::from_rotation_z(body.rotation.to_radians());
    }
}

// ---------------------------------------------------------------------------
// Stage rules
// ---------------------------------------------------------------------------

#[derive(Resource, Default, Debug)]
enum DemoStage {
    #[default]
    Attempt,
    Rebuild,
    RequestPlayback,
    Watching,
}

fn start_attempt(mut begin: EventWriter<BeginRecordingRequest>) {
    begin.send(BeginRecordingRequest::default());
}

/// Ends the attempt after a fixed number of frames, then rebuilds the level
/// and asks for the replay one frame later so the rebuild has been applied.
fn drive_stage(
    mut commands: Commands,
    mut stage: ResMut<DemoStage>,
    mut camera: ResMut<DemoCamera>,
    mut frames: Local<u32>,
    levels: Query<Entity, With<LevelRoot>>,
    mut outcomes: EventWriter<AttemptOutcome>,
    mut play: EventWriter<PlayCachedRequest>,
) {
    match *stage {
        DemoStage::Attempt => {
            *frames += 1;
            if *frames >= ATTEMPT_FRAMES {
                info!("Attempt finished after {} frames", *frames);
                outcomes.send(AttemptOutcome::Succeeded);
                *stage = DemoStage::Rebuild;
            }
        }
        DemoStage::Rebuild => {
            for level in &levels {
                commands.entity(level).despawn_recursive();
            }
            let player = build_level(&mut commands);
            camera.targets = CameraTargets {
                initial: Some(player),
                follow: Some(player),
            };
            *stage = DemoStage::RequestPlayback;
        }
        DemoStage::RequestPlayback => {
            play.send(PlayCachedRequest);
            *stage = DemoStage::Watching;
        }
        DemoStage::Watching => {}
    }
}

fn exit_on_playback_finished(
    mut finished: EventReader<PlaybackFinished>,
    mut exit: EventWriter<AppExit>,
) {
    for event in finished.read() {
        info!(
            "Replay done: {} tracks, {} ghosts",
            event.tracks, event.ghosts
        );
        exit.send(AppExit::Success);
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Minimal follow camera. Outside a replay it eases towards `follow` with a
/// transition timer; during a replay it tracks `follow` directly.
#[derive(Resource, Default)]
struct DemoCamera {
    targets: CameraTargets,
    locked: bool,
    transition: f32,
    focus: Vec2,
}

impl CameraHandoff for DemoCamera {
    fn targets(&self) -> CameraTargets {
        self.targets
    }

    fn take_over(&mut self, follow: Entity) {
        self.locked = true;
        self.targets.follow = Some(follow);
    }

    fn release(&mut self, previous: CameraTargets) {
        self.locked = false;
        self.targets = previous;
        self.transition = 0.0;
    }
}

fn follow_camera(
    time: Res<Time<Real>>,
    mut camera: ResMut<DemoCamera>,
    transforms: Query<&Transform>,
) {
    let Some(target) = camera
        .targets
        .follow
        .and_then(|e| transforms.get(e).ok())
        .map(|t| t.translation.truncate())
    else {
        return;
    };
    if camera.locked {
        camera.focus = target;
        return;
    }
    camera.transition = (camera.transition + time.delta_secs()).min(1.0);
    let t = camera.transition;
    camera.focus = camera.focus.lerp(target, t);
}
