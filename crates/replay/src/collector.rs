//! Chooses which live entities become tracks for a capture session.

use std::collections::HashSet;

use bevy::prelude::*;

use crate::config::ReplayConfig;
use crate::identity::{push_subtree, scene_order};
use crate::physics::{EntityTag, PhysicsBody2d, PlayerControlled, ReplayTarget};

/// An entity selected for recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectedTarget {
    pub entity: Entity,
    pub has_body: bool,
}

/// Ordered, deduplicated capture list:
/// 1. `ReplayTarget` entities in scene order, each followed by its
///    descendants when `include_children` is set
/// 2. entities whose `EntityTag` is a configured capture tag, in scene order
/// 3. `extra_targets`, in the order given
/// 4. the first `PlayerControlled` entity, always
pub fn collect_targets(
    world: &mut World,
    config: &ReplayConfig,
    extra_targets: &[Entity],
) -> Vec<CollectedTarget> {
    let order = scene_order(world);
    let mut seen = HashSet::new();
    let mut picked = Vec::new();
    let mut push = |entity: Entity, picked: &mut Vec<Entity>| {
        if seen.insert(entity) {
            picked.push(entity);
        }
    };

    for &entity in &order {
        let Some(target) = world.get::<ReplayTarget>(entity) else {
            continue;
        };
        if target.include_children {
            let mut subtree = Vec::new();
            push_subtree(world, entity, &mut subtree);
            for e in subtree {
                push(e, &mut picked);
            }
        } else {
            push(entity, &mut picked);
        }
    }

    for &entity in &order {
        let tagged = world
            .get::<EntityTag>(entity)
            .is_some_and(|tag| config.is_capture_tag(&tag.0));
        if tagged {
            push(entity, &mut picked);
        }
    }

    for &entity in extra_targets {
        if world.entities().contains(entity) {
            push(entity, &mut picked);
        } else {
            warn!("Ignoring extra replay target {entity}: entity does not exist");
        }
    }

    let player = order
        .iter()
        .copied()
        .find(|e| world.get::<PlayerControlled>(*e).is_some());
    if let Some(player) = player {
        push(player, &mut picked);
    }

    picked
        .into_iter()
        .map(|entity| CollectedTarget {
            entity,
            has_body: world.get::<PhysicsBody2d>(entity).is_some(),
        })
        .collect()
}
