//! ECS components for host entities (players, mobs and dropped items).

use std::collections::HashMap;

use bevy_ecs::prelude::*;
use mc_rats_plugin_api::{EntityId, EntityKind, ItemStack, Location, Vec3};

/// Runtime identity handed to plugins.
#[derive(Component, Debug, Clone, Copy)]
pub struct RuntimeId(pub EntityId);

/// Position in a named world.
#[derive(Component, Debug, Clone)]
pub struct Position(pub Location);

/// Velocity in blocks per tick.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Velocity(pub Vec3);

/// Health points.
#[derive(Component, Debug, Clone, Copy)]
pub struct Health {
    pub current: f64,
    pub max: f64,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Kind(pub EntityKind);

/// String metadata written by plugins.
#[derive(Component, Debug, Clone, Default)]
pub struct Tags(pub HashMap<String, String>);

/// Stack carried by a dropped-item entity.
#[derive(Component, Debug, Clone, Copy)]
pub struct ItemStackComp(pub ItemStack);

#[derive(Component, Debug, Clone)]
pub struct CustomName {
    pub name: String,
    pub visible: bool,
}

/// Survives chunk unloads and restarts.
#[derive(Component, Debug, Clone, Copy)]
pub struct Persistent(pub bool);

/// Base movement speed in blocks/tick.
#[derive(Component, Debug, Clone, Copy)]
pub struct MovementSpeed(pub f64);

/// Marker and name for player entities.
#[derive(Component, Debug, Clone)]
pub struct PlayerName(pub String);
