//! Stable per-entity identifiers that survive scene teardown and rebuild.
//!
//! A track is tagged `<name-path>#<short-id>` when recorded. On load the
//! identifier is resolved in three stages:
//!
//! 1. exact short-id match among live `ReplayIdentity` entities
//! 2. walk of the name path from the scene roots
//! 3. a freshly spawned, parentless ghost placeholder
//!
//! Short ids are random and only stable for the life of their component. Level
//! spawners that rebuild a scene should carry ids over with
//! `ReplayIdentity::with_id`. Two live entities sharing one id is accepted:
//! the lowest `Entity` (earliest spawned) wins and no error is raised.

use std::collections::HashMap;

use bevy::prelude::*;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::config::{ID_SEPARATOR, PATH_SEPARATOR, SHORT_ID_LEN, UNNAMED_SEGMENT};

/// Participates in identity resolution. The short id is assigned on first
/// access unless preset.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayIdentity {
    short_id: Option<String>,
}

impl ReplayIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            short_id: Some(id.into()),
        }
    }

    pub fn short_id(&self) -> Option<&str> {
        self.short_id.as_deref()
    }

    pub fn ensure_short_id(&mut self) -> &str {
        self.short_id.get_or_insert_with(generate_short_id)
    }
}

/// Placeholder spawned for a track that resolved to nothing. Lives for one
/// playback.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct ReplayGhost;

pub fn generate_short_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_ID_LEN)
        .map(char::from)
        .collect()
}

/// `Name`s from the root down to `entity`, joined by `/`.
pub fn name_path(world: &World, entity: Entity) -> String {
    let mut segments = Vec::new();
    let mut current = Some(entity);
    while let Some(e) = current {
        let segment = world
            .get::<Name>(e)
            .map(|n| n.as_str().to_string())
            .unwrap_or_else(|| UNNAMED_SEGMENT.to_string());
        segments.push(segment);
        current = world.get::<Parent>(e).map(Parent::get);
    }
    segments.reverse();
    segments.join(&PATH_SEPARATOR.to_string())
}

/// Full identifier for `entity`, giving it a `ReplayIdentity` (and short id)
/// if it has none yet.
pub fn identifier_for(world: &mut World, entity: Entity) -> String {
    let path = name_path(world, entity);
    let short_id = match world.get_mut::<ReplayIdentity>(entity) {
        Some(mut identity) => identity.ensure_short_id().to_string(),
        None => {
            let id = generate_short_id();
            world
                .entity_mut(entity)
                .insert(ReplayIdentity::with_id(id.clone()));
            id
        }
    };
    format!("{path}{ID_SEPARATOR}{short_id}")
}

/// Identifier split into its path and optional short id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedIdentifier<'a> {
    pub path: &'a str,
    pub short_id: Option<&'a str>,
}

pub fn parse_identifier(identifier: &str) -> ParsedIdentifier<'_> {
    match identifier.rsplit_once(ID_SEPARATOR) {
        Some((path, id)) if !id.is_empty() => ParsedIdentifier {
            path,
            short_id: Some(id),
        },
        Some((path, _)) => ParsedIdentifier {
            path,
            short_id: None,
        },
        None => ParsedIdentifier {
            path: identifier,
            short_id: None,
        },
    }
}

/// How a recorded identifier was bound to a live entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTarget {
    ById(Entity),
    ByPath(Entity),
    Ghost(Entity),
}

impl ResolvedTarget {
    pub fn entity(self) -> Entity {
        match self {
            ResolvedTarget::ById(e) | ResolvedTarget::ByPath(e) | ResolvedTarget::Ghost(e) => e,
        }
    }

    pub fn is_ghost(self) -> bool {
        matches!(self, ResolvedTarget::Ghost(_))
    }
}

/// Short id → entity lookup over every live identity, built once per bind.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    by_id: HashMap<String, Entity>,
}

impl IdentityIndex {
    pub fn build(world: &mut World) -> Self {
        let mut entries: Vec<(Entity, String)> = world
            .query::<(Entity, &ReplayIdentity)>()
            .iter(world)
            .filter_map(|(entity, identity)| {
                identity.short_id().map(|id| (entity, id.to_string()))
            })
            .collect();
        entries.sort_by_key(|(entity, _)| *entity);

        let mut by_id = HashMap::with_capacity(entries.len());
        for (entity, id) in entries {
            // Collisions: first registered wins.
            by_id.entry(id).or_insert(entity);
        }
        Self { by_id }
    }

    pub fn get(&self, short_id: &str) -> Option<Entity> {
        self.by_id.get(short_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Entities without a parent, in ascending `Entity` order.
pub(crate) fn scene_roots(world: &mut World) -> Vec<Entity> {
    let mut roots: Vec<Entity> = world
        .query_filtered::<Entity, Without<Parent>>()
        .iter(world)
        .collect();
    roots.sort();
    roots
}

/// Every entity in scene enumeration order: depth-first from each root,
/// children in `Children` order.
pub(crate) fn scene_order(world: &mut World) -> Vec<Entity> {
    let roots = scene_roots(world);
    let mut order = Vec::new();
    for root in roots {
        push_subtree(world, root, &mut order);
    }
    order
}

pub(crate) fn push_subtree(world: &World, entity: Entity, out: &mut Vec<Entity>) {
    let mut stack = vec![entity];
    while let Some(e) = stack.pop() {
        out.push(e);
        if let Some(children) = world.get::<Children>(e) {
            // Reverse so the first child is visited first.
            stack.extend(children.iter().rev().copied());
        }
    }
}

fn has_name(world: &World, entity: Entity, name: &str) -> bool {
    let actual = world.get::<Name>(entity).map(Name::as_str);
    match actual {
        Some(actual) => actual == name,
        None => name == UNNAMED_SEGMENT,
    }
}

/// Walk `path` from the scene roots, matching the first child by name at each
/// level. Every root with a matching name is tried in turn.
pub fn find_by_path(world: &mut World, path: &str) -> Option<Entity> {
    let mut segments = path.split(PATH_SEPARATOR);
    let first = segments.next()?;
    let rest: Vec<&str> = segments.collect();

    for root in scene_roots(world) {
        if world.get::<ReplayGhost>(root).is_some() || !has_name(world, root, first) {
            continue;
        }
        let mut current = root;
        let mut matched = true;
        for segment in &rest {
            let next = world.get::<Children>(current).and_then(|children| {
                children
                    .iter()
                    .copied()
                    .find(|child| has_name(world, *child, segment))
            });
            match next {
                Some(child) => current = child,
                None => {
                    matched = false;
                    break;
                }
            }
        }
        if matched {
            return Some(current);
        }
    }
    None
}

pub fn spawn_ghost(world: &mut World, name: &str) -> Entity {
    world
        .spawn((ReplayGhost, Name::new(name.to_string()), Transform::default()))
        .id()
}

/// Resolve one recorded identifier. Never fails: unresolvable identifiers get
/// a ghost.
pub fn resolve(
    world: &mut World,
    index: &IdentityIndex,
    identifier: &str,
    ghost_name: &str,
) -> ResolvedTarget {
    let parsed = parse_identifier(identifier);

    if let Some(entity) = parsed.short_id.and_then(|id| index.get(id)) {
        return ResolvedTarget::ById(entity);
    }
    if let Some(entity) = find_by_path(world, parsed.path) {
        debug!("Replay track '{identifier}' bound by path");
        return ResolvedTarget::ByPath(entity);
    }

    let ghost = spawn_ghost(world, ghost_name);
    info!("Replay track '{identifier}' is unresolved; playing it on a ghost");
    ResolvedTarget::Ghost(ghost)
}
