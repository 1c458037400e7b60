//! In-memory `ServerApi` used by the unit tests.
//!
//! Writes apply immediately; the interesting ones are also recorded so tests
//! can assert on what the plugin asked the host to do.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, HashSet};

use mc_rats_plugin_api::*;

/// A flat world: solid ground up to `ground_y`, air above.
pub struct MockWorld {
    pub ground_y: Option<i32>,
    pub ground: Material,
    pub biome: Biome,
    pub light: u8,
    pub blocks: HashMap<BlockPos, Material>,
}

impl MockWorld {
    pub fn flat(ground_y: i32) -> Self {
        Self {
            ground_y: Some(ground_y),
            ground: Material::Stone,
            biome: Biome::Plains,
            light: 4,
            blocks: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub task_id: u32,
    pub delay: u64,
    pub interval: u64,
}

pub struct MockApi {
    pub worlds: BTreeMap<String, MockWorld>,
    pub players: Vec<PluginPlayer>,
    pub permissions: HashSet<(String, String)>,
    pub entities: BTreeMap<EntityId, PluginEntity>,
    next_id: u64,
    pub tick: u64,
    pub config_on_disk: Option<serde_json::Value>,

    pub highest_block_queries: Cell<usize>,
    pub spawned: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    pub velocities: Vec<(EntityId, Vec3)>,
    pub sounds: Vec<(Sound, f32, f32)>,
    pub dropped: Vec<(Location, ItemStack)>,
    pub names: HashMap<EntityId, String>,
    pub health: HashMap<EntityId, f64>,
    pub messages: Vec<(String, String)>,
    pub commands: Vec<String>,
    pub tasks: Vec<ScheduledTask>,
    pub event_damage: Option<f32>,
    pub event_drops: Option<Vec<ItemStack>>,
}

impl MockApi {
    pub fn new() -> Self {
        let mut worlds = BTreeMap::new();
        worlds.insert("world".to_string(), MockWorld::flat(63));
        Self {
            worlds,
            players: Vec::new(),
            permissions: HashSet::new(),
            entities: BTreeMap::new(),
            next_id: 100,
            tick: 0,
            config_on_disk: None,
            highest_block_queries: Cell::new(0),
            spawned: Vec::new(),
            removed: Vec::new(),
            velocities: Vec::new(),
            sounds: Vec::new(),
            dropped: Vec::new(),
            names: HashMap::new(),
            health: HashMap::new(),
            messages: Vec::new(),
            commands: Vec::new(),
            tasks: Vec::new(),
            event_damage: None,
            event_drops: None,
        }
    }

    pub fn world_mut(&mut self, name: &str) -> &mut MockWorld {
        self.worlds
            .entry(name.to_string())
            .or_insert_with(|| MockWorld::flat(63))
    }

    pub fn add_player(&mut self, name: &str, location: Location) -> EntityId {
        let id = self.add_entity(EntityKind::Player, location.clone());
        self.players.push(PluginPlayer {
            name: name.to_string(),
            runtime_id: id,
            location,
        });
        id
    }

    pub fn grant(&mut self, player: &str, node: &str) {
        self.permissions.insert((player.to_string(), node.to_string()));
    }

    pub fn add_entity(&mut self, kind: EntityKind, location: Location) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.insert(
            id,
            PluginEntity {
                id,
                kind,
                location,
                tags: HashMap::new(),
                item: None,
            },
        );
        id
    }

    pub fn add_item(&mut self, location: Location, stack: ItemStack) -> EntityId {
        let id = self.add_entity(EntityKind::Item, location);
        if let Some(e) = self.entities.get_mut(&id) {
            e.item = Some(stack);
        }
        id
    }

    pub fn get(&self, id: EntityId) -> &PluginEntity {
        &self.entities[&id]
    }

    pub fn active_tasks(&self, task_id: u32) -> usize {
        self.tasks.iter().filter(|t| t.task_id == task_id).count()
    }

    fn block(&self, world: &str, pos: BlockPos) -> Option<Material> {
        let w = self.worlds.get(world)?;
        if let Some(m) = w.blocks.get(&pos) {
            return Some(*m);
        }
        match w.ground_y {
            Some(g) if pos.y <= g => Some(w.ground),
            _ => Some(Material::Air),
        }
    }
}

impl ServerApi for MockApi {
    fn online_players(&self) -> Vec<PluginPlayer> {
        self.players.clone()
    }
    fn get_player(&self, name: &str) -> Option<PluginPlayer> {
        self.players.iter().find(|p| p.name == name).cloned()
    }
    fn has_permission(&self, player_name: &str, node: &str) -> bool {
        self.permissions
            .contains(&(player_name.to_string(), node.to_string()))
    }
    fn send_message(&mut self, player_name: &str, message: &str) {
        self.messages
            .push((player_name.to_string(), message.to_string()));
    }
    fn world_names(&self) -> Vec<String> {
        self.worlds.keys().cloned().collect()
    }
    fn world_exists(&self, world: &str) -> bool {
        self.worlds.contains_key(world)
    }
    fn players_in_world(&self, world: &str) -> Vec<PluginPlayer> {
        self.players
            .iter()
            .filter(|p| p.location.world == world)
            .cloned()
            .collect()
    }
    fn highest_block_y(&self, world: &str, x: i32, z: i32) -> Option<i32> {
        self.highest_block_queries
            .set(self.highest_block_queries.get() + 1);
        let w = self.worlds.get(world)?;
        let placed = w
            .blocks
            .iter()
            .filter(|(p, m)| p.x == x && p.z == z && m.is_solid())
            .map(|(p, _)| p.y)
            .max();
        match (placed, w.ground_y) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
    fn block_at(&self, world: &str, pos: BlockPos) -> Option<Material> {
        self.block(world, pos)
    }
    fn biome_at(&self, world: &str, _pos: BlockPos) -> Option<Biome> {
        self.worlds.get(world).map(|w| w.biome)
    }
    fn light_level_at(&self, world: &str, _pos: BlockPos) -> Option<u8> {
        self.worlds.get(world).map(|w| w.light)
    }
    fn entity(&self, id: EntityId) -> Option<PluginEntity> {
        self.entities.get(&id).cloned()
    }
    fn entities_with_tag(&self, key: &str) -> Vec<PluginEntity> {
        self.entities
            .values()
            .filter(|e| e.tags.contains_key(key))
            .cloned()
            .collect()
    }
    fn nearby_entities(&self, center: EntityId, dx: f64, dy: f64, dz: f64) -> Vec<PluginEntity> {
        let Some(c) = self.entities.get(&center) else {
            return Vec::new();
        };
        self.entities
            .values()
            .filter(|e| e.id != center && e.location.world == c.location.world)
            .filter(|e| {
                (e.location.x - c.location.x).abs() <= dx
                    && (e.location.y - c.location.y).abs() <= dy
                    && (e.location.z - c.location.z).abs() <= dz
            })
            .cloned()
            .collect()
    }
    fn spawn_entity(&mut self, kind: EntityKind, location: &Location) -> Option<EntityId> {
        if !self.worlds.contains_key(&location.world) {
            return None;
        }
        let id = self.add_entity(kind, location.clone());
        self.spawned.push(id);
        Some(id)
    }
    fn remove_entity(&mut self, id: EntityId) {
        self.entities.remove(&id);
        self.removed.push(id);
    }
    fn set_velocity(&mut self, id: EntityId, velocity: Vec3) {
        self.velocities.push((id, velocity));
    }
    fn set_tag(&mut self, id: EntityId, key: &str, value: &str) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.tags.insert(key.to_string(), value.to_string());
        }
    }
    fn set_max_health(&mut self, id: EntityId, health: f64) {
        self.health.insert(id, health);
    }
    fn set_movement_speed(&mut self, _id: EntityId, _speed: f64) {}
    fn set_custom_name(&mut self, id: EntityId, name: &str, _visible: bool) {
        self.names.insert(id, name.to_string());
    }
    fn set_persistent(&mut self, _id: EntityId, _persistent: bool) {}
    fn set_item_amount(&mut self, id: EntityId, amount: u32) {
        if amount == 0 {
            self.remove_entity(id);
        } else if let Some(stack) = self.entities.get_mut(&id).and_then(|e| e.item.as_mut()) {
            stack.amount = amount;
        }
    }
    fn drop_item(&mut self, location: &Location, item: ItemStack) {
        self.dropped.push((location.clone(), item));
    }
    fn play_sound(&mut self, _location: &Location, sound: Sound, volume: f32, pitch: f32) {
        self.sounds.push((sound, volume, pitch));
    }
    fn set_event_damage(&mut self, damage: f32) {
        self.event_damage = Some(damage);
    }
    fn set_event_drops(&mut self, drops: Vec<ItemStack>) {
        self.event_drops = Some(drops);
    }
    fn get_tick(&self) -> u64 {
        self.tick
    }
    fn log(&self, _level: LogLevel, _message: &str) {}
    fn read_plugin_config(&self, _plugin_name: &str) -> Option<serde_json::Value> {
        self.config_on_disk.clone()
    }
    fn schedule_repeating(
        &mut self,
        _plugin_name: &str,
        delay_ticks: u64,
        interval_ticks: u64,
        task_id: u32,
    ) {
        self.tasks.push(ScheduledTask {
            task_id,
            delay: delay_ticks,
            interval: interval_ticks,
        });
    }
    fn cancel_task(&mut self, _plugin_name: &str, task_id: u32) {
        self.tasks.retain(|t| t.task_id != task_id);
    }
    fn register_command(&mut self, name: &str, _description: &str, _plugin_name: &str) {
        self.commands.push(name.to_string());
    }
}
