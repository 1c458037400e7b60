//! Plugin API: traits, events, and server API for plugin authors.
//!
//! This crate defines the boundary between a host server and the plugins it
//! runs. It has no dependency on any host implementation.

pub mod vocab;

pub use vocab::{Biome, EntityKind, Material, Sound, UnknownName};

use std::collections::HashMap;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Runtime identifier the host assigns to an entity on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A direction or velocity in blocks per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len <= f64::EPSILON {
            return Vec3::ZERO;
        }
        self.scale(1.0 / len)
    }

    pub fn scale(self, factor: f64) -> Self {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

/// A point inside a named world.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// The block this location falls into.
    pub fn block_pos(&self) -> BlockPos {
        BlockPos {
            x: self.x.floor() as i32,
            y: self.y.floor() as i32,
            z: self.z.floor() as i32,
        }
    }

    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Location::new(self.world.clone(), self.x + dx, self.y + dy, self.z + dz)
    }

    /// Vector from `other` to `self`, ignoring worlds.
    pub fn delta_from(&self, other: &Location) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Euclidean distance; infinite between different worlds.
    pub fn distance(&self, other: &Location) -> f64 {
        if self.world != other.world {
            return f64::INFINITY;
        }
        self.delta_from(other).length()
    }
}

/// Integer block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn up(self, dy: i32) -> Self {
        BlockPos::new(self.x, self.y + dy, self.z)
    }

    /// Horizontal centre of the block, `lift` above its floor.
    pub fn center(self, world: impl Into<String>, lift: f64) -> Location {
        Location::new(
            world,
            self.x as f64 + 0.5,
            self.y as f64 + lift,
            self.z as f64 + 0.5,
        )
    }
}

/// A stack of one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStack {
    pub material: Material,
    pub amount: u32,
}

impl ItemStack {
    pub fn new(material: Material, amount: u32) -> Self {
        Self { material, amount }
    }
}

/// Information about an online player, passed to plugins in events.
#[derive(Debug, Clone)]
pub struct PluginPlayer {
    pub name: String,
    pub runtime_id: EntityId,
    pub location: Location,
}

/// Read-only view of a host entity.
#[derive(Debug, Clone)]
pub struct PluginEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub location: Location,
    /// String metadata attached by plugins.
    pub tags: HashMap<String, String>,
    /// Stack carried by a dropped-item entity.
    pub item: Option<ItemStack>,
}

impl PluginEntity {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn is_player(&self) -> bool {
        self.kind.is_player()
    }
}

/// Log level for plugin logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

/// Result of dispatching an event to a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Continue normal handling.
    Continue,
    /// Event was cancelled by this plugin.
    Cancelled,
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// All events that plugins can listen to.
#[derive(Debug, Clone)]
pub enum PluginEvent {
    // --- Block events ---
    BlockBreak {
        player: PluginPlayer,
        /// Location of the broken block's corner.
        location: Location,
        material: Material,
    },

    // --- Entity events ---
    EntitySpawn {
        entity: PluginEntity,
    },
    EntityDeath {
        entity: PluginEntity,
        killer: Option<EntityId>,
    },
    /// An entity is about to pick `target` as its attack target.
    EntityTarget {
        entity: PluginEntity,
        target: PluginEntity,
    },
    EntityDamageByEntity {
        damager: PluginEntity,
        victim: PluginEntity,
        damage: f32,
    },

    // --- Server events ---
    ServerStarted,
    ServerStopping,
}

impl PluginEvent {
    /// Whether this event type can be cancelled by a plugin.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            PluginEvent::BlockBreak { .. }
                | PluginEvent::EntitySpawn { .. }
                | PluginEvent::EntityTarget { .. }
                | PluginEvent::EntityDamageByEntity { .. }
        )
    }
}

// ─── Plugin trait ────────────────────────────────────────────────────────────

/// Metadata about a plugin.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
}

/// The Plugin trait, implemented by every plugin the host loads.
pub trait Plugin: Send {
    /// Return plugin metadata.
    fn info(&self) -> PluginInfo;

    /// Called when the plugin is loaded. Use `api` to register commands, schedule tasks.
    fn on_enable(&mut self, api: &mut dyn ServerApi);

    /// Called when the plugin is unloaded.
    fn on_disable(&mut self, api: &mut dyn ServerApi) {
        let _ = api;
    }

    /// Called for every dispatched event. Return `Cancelled` to cancel cancellable events.
    fn on_event(&mut self, event: &PluginEvent, api: &mut dyn ServerApi) -> EventResult {
        let _ = (event, api);
        EventResult::Continue
    }

    /// Called when a scheduled task fires.
    fn on_task(&mut self, task_id: u32, api: &mut dyn ServerApi) {
        let _ = (task_id, api);
    }

    /// Called when a plugin-registered command is executed. Return a response message.
    fn on_command(
        &mut self,
        command: &str,
        args: &[String],
        sender: &str,
        api: &mut dyn ServerApi,
    ) -> Option<String> {
        let _ = (command, args, sender, api);
        None
    }

    /// Suggestions for the last argument of a plugin-registered command.
    fn on_tab_complete(&self, command: &str, args: &[String]) -> Vec<String> {
        let _ = (command, args);
        Vec::new()
    }

    /// Return a default config as JSON. If `Some`, the plugin gets a config file.
    fn default_config(&self) -> Option<serde_json::Value> {
        None
    }

    /// Called with the loaded config (from `plugins/<name>/config.json`).
    fn load_config(&mut self, _config: serde_json::Value) {}
}

// ─── Server API ──────────────────────────────────────────────────────────────

/// Safe read/write access to server state, passed to plugins during callbacks.
///
/// Read methods return data immediately. Write methods are deferred (applied
/// after the plugin callback returns). `spawn_entity` is the one exception:
/// the id is allocated right away so the plugin can address the new entity
/// in the same callback.
pub trait ServerApi {
    // --- Players ---
    fn online_players(&self) -> Vec<PluginPlayer>;
    fn get_player(&self, name: &str) -> Option<PluginPlayer>;
    fn has_permission(&self, player_name: &str, node: &str) -> bool;
    fn send_message(&mut self, player_name: &str, message: &str);

    // --- Worlds ---
    fn world_names(&self) -> Vec<String>;
    fn world_exists(&self, world: &str) -> bool;
    fn players_in_world(&self, world: &str) -> Vec<PluginPlayer>;
    /// Y of the highest solid block in a column, `None` if the world is unknown
    /// or the column is empty.
    fn highest_block_y(&self, world: &str, x: i32, z: i32) -> Option<i32>;
    fn block_at(&self, world: &str, pos: BlockPos) -> Option<Material>;
    fn biome_at(&self, world: &str, pos: BlockPos) -> Option<Biome>;
    fn light_level_at(&self, world: &str, pos: BlockPos) -> Option<u8>;

    // --- Entities ---
    fn entity(&self, id: EntityId) -> Option<PluginEntity>;
    /// Every living entity across all worlds carrying `key`.
    fn entities_with_tag(&self, key: &str) -> Vec<PluginEntity>;
    /// Entities (other than `center` itself) within `dx`/`dy`/`dz` blocks of it on each axis.
    fn nearby_entities(&self, center: EntityId, dx: f64, dy: f64, dz: f64) -> Vec<PluginEntity>;
    /// Create an entity. Returns `None` if the world is not loaded.
    fn spawn_entity(&mut self, kind: EntityKind, location: &Location) -> Option<EntityId>;
    fn remove_entity(&mut self, id: EntityId);
    fn set_velocity(&mut self, id: EntityId, velocity: Vec3);
    fn set_tag(&mut self, id: EntityId, key: &str, value: &str);
    /// Sets both maximum and current health.
    fn set_max_health(&mut self, id: EntityId, health: f64);
    fn set_movement_speed(&mut self, id: EntityId, speed: f64);
    fn set_custom_name(&mut self, id: EntityId, name: &str, visible: bool);
    fn set_persistent(&mut self, id: EntityId, persistent: bool);
    /// Resize a dropped item's stack. Zero removes the entity.
    fn set_item_amount(&mut self, id: EntityId, amount: u32);
    fn drop_item(&mut self, location: &Location, item: ItemStack);

    // --- Effects ---
    fn play_sound(&mut self, location: &Location, sound: Sound, volume: f32, pitch: f32);

    // --- Current event ---
    /// Replace the damage amount of the event being dispatched.
    fn set_event_damage(&mut self, damage: f32);
    /// Replace the drop list of the death event being dispatched.
    fn set_event_drops(&mut self, drops: Vec<ItemStack>);

    // --- Server ---
    fn get_tick(&self) -> u64;
    fn log(&self, level: LogLevel, message: &str);
    /// Re-read `plugins/<name>/config.json`, if present and valid JSON.
    fn read_plugin_config(&self, plugin_name: &str) -> Option<serde_json::Value>;

    // --- Scheduler ---
    fn schedule_repeating(
        &mut self,
        plugin_name: &str,
        delay_ticks: u64,
        interval_ticks: u64,
        task_id: u32,
    );
    fn cancel_task(&mut self, plugin_name: &str, task_id: u32);

    // --- Commands ---
    fn register_command(&mut self, name: &str, description: &str, plugin_name: &str);
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: EntityKind) -> PluginEntity {
        PluginEntity {
            id: EntityId(7),
            kind,
            location: Location::new("world", 0.5, 64.0, 0.5),
            tags: HashMap::new(),
            item: None,
        }
    }

    fn test_player() -> PluginPlayer {
        PluginPlayer {
            name: "TestPlayer".into(),
            runtime_id: EntityId(1),
            location: Location::new("world", 0.5, 65.62, 0.5),
        }
    }

    #[test]
    fn normalize_keeps_direction() {
        let v = Vec3::new(3.0, 0.0, 4.0).normalize();
        assert!((v.length() - 1.0).abs() < 1e-9);
        assert!((v.x - 0.6).abs() < 1e-9);
        assert!((v.z - 0.8).abs() < 1e-9);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
    }

    #[test]
    fn distance_across_worlds_is_infinite() {
        let a = Location::new("world", 0.0, 0.0, 0.0);
        let b = Location::new("world_nether", 0.0, 0.0, 0.0);
        assert!(a.distance(&b).is_infinite());
        assert_eq!(a.distance(&a.offset(3.0, 4.0, 0.0)), 5.0);
    }

    #[test]
    fn block_pos_floors_negative_coordinates() {
        let loc = Location::new("world", -0.5, 64.9, 3.2);
        assert_eq!(loc.block_pos(), BlockPos::new(-1, 64, 3));
        let centre = BlockPos::new(-1, 64, 3).center("world", 0.1);
        assert_eq!(centre, Location::new("world", -0.5, 64.1, 3.5));
    }

    #[test]
    fn tags_are_readable() {
        let mut e = entity(EntityKind::Silverfish);
        e.tags.insert("rat_color".into(), "Grey".into());
        assert_eq!(e.tag("rat_color"), Some("Grey"));
        assert_eq!(e.tag("missing"), None);
        assert!(!e.is_player());
    }

    #[test]
    fn event_cancellable_flags() {
        assert!(PluginEvent::BlockBreak {
            player: test_player(),
            location: Location::new("world", 0.0, 0.0, 0.0),
            material: Material::HayBlock,
        }
        .is_cancellable());
        assert!(PluginEvent::EntityTarget {
            entity: entity(EntityKind::Silverfish),
            target: entity(EntityKind::Player),
        }
        .is_cancellable());
        assert!(PluginEvent::EntityDamageByEntity {
            damager: entity(EntityKind::Silverfish),
            victim: entity(EntityKind::Cow),
            damage: 1.0,
        }
        .is_cancellable());
        assert!(!PluginEvent::EntityDeath {
            entity: entity(EntityKind::Silverfish),
            killer: None,
        }
        .is_cancellable());
        assert!(!PluginEvent::ServerStarted.is_cancellable());
        assert!(!PluginEvent::ServerStopping.is_cancellable());
    }
}
