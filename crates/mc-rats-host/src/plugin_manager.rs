//! Plugin manager: loads, enables, and dispatches events to plugins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mc_rats_plugin_api::{
    BlockPos, Biome, EntityId, EntityKind, EventResult, ItemStack, Location, LogLevel, Material,
    Plugin, PluginEntity, PluginEvent, PluginPlayer, ServerApi, Sound, Vec3,
};
use tracing::{debug, error, info, warn};

use crate::world::HostWorld;

// ─── Types ───────────────────────────────────────────────────────────────────

/// A scheduled task owned by a plugin.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub plugin_name: String,
    pub task_id: u32,
    pub remaining_ticks: u64,
    /// `None` = one-shot, `Some(n)` = repeating every `n` ticks.
    pub interval: Option<u64>,
}

/// Deferred side-effect requested by a plugin during a callback.
#[derive(Debug, Clone)]
pub enum PendingAction {
    SendMessage {
        player_name: String,
        message: String,
    },
    SpawnEntity {
        id: EntityId,
        kind: EntityKind,
        location: Location,
    },
    RemoveEntity {
        id: EntityId,
    },
    SetVelocity {
        id: EntityId,
        velocity: Vec3,
    },
    SetTag {
        id: EntityId,
        key: String,
        value: String,
    },
    SetMaxHealth {
        id: EntityId,
        health: f64,
    },
    SetMovementSpeed {
        id: EntityId,
        speed: f64,
    },
    SetCustomName {
        id: EntityId,
        name: String,
        visible: bool,
    },
    SetPersistent {
        id: EntityId,
        persistent: bool,
    },
    SetItemAmount {
        id: EntityId,
        amount: u32,
    },
    DropItem {
        location: Location,
        item: ItemStack,
    },
    PlaySound {
        location: Location,
        sound: Sound,
        volume: f32,
        pitch: f32,
    },
    SetEventDamage {
        damage: f32,
    },
    SetEventDrops {
        drops: Vec<ItemStack>,
    },
    RegisterCommand {
        name: String,
        description: String,
        plugin_name: String,
    },
    ScheduleTask {
        task: ScheduledTask,
    },
    CancelTask {
        plugin_name: String,
        task_id: u32,
    },
}

/// Event changes requested by plugins, applied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventOverrides {
    pub damage: Option<f32>,
    pub drops: Option<Vec<ItemStack>>,
}

impl EventOverrides {
    fn merge(&mut self, later: EventOverrides) {
        if later.damage.is_some() {
            self.damage = later.damage;
        }
        if later.drops.is_some() {
            self.drops = later.drops;
        }
    }
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub result: EventResult,
    pub overrides: EventOverrides,
}

// ─── ServerApiImpl ───────────────────────────────────────────────────────────

/// Implements `ServerApi` by reading the world directly and accumulating PendingActions for writes.
struct ServerApiImpl<'a> {
    world: &'a HostWorld,
    config_dir: &'a Path,
    actions: Vec<PendingAction>,
}

impl<'a> ServerApiImpl<'a> {
    fn new(world: &'a HostWorld, config_dir: &'a Path) -> Self {
        Self {
            world,
            config_dir,
            actions: Vec::new(),
        }
    }

    fn take_actions(self) -> Vec<PendingAction> {
        self.actions
    }
}

impl ServerApi for ServerApiImpl<'_> {
    fn online_players(&self) -> Vec<PluginPlayer> {
        self.world.players()
    }

    fn get_player(&self, name: &str) -> Option<PluginPlayer> {
        self.world.player(name)
    }

    fn has_permission(&self, player_name: &str, node: &str) -> bool {
        self.world.has_permission(player_name, node)
    }

    fn send_message(&mut self, player_name: &str, message: &str) {
        self.actions.push(PendingAction::SendMessage {
            player_name: player_name.to_string(),
            message: message.to_string(),
        });
    }

    fn world_names(&self) -> Vec<String> {
        self.world.world_names()
    }

    fn world_exists(&self, world: &str) -> bool {
        self.world.world_exists(world)
    }

    fn players_in_world(&self, world: &str) -> Vec<PluginPlayer> {
        self.world
            .players()
            .into_iter()
            .filter(|p| p.location.world == world)
            .collect()
    }

    fn highest_block_y(&self, world: &str, x: i32, z: i32) -> Option<i32> {
        self.world.highest_block_y(world, x, z)
    }

    fn block_at(&self, world: &str, pos: BlockPos) -> Option<Material> {
        self.world.block_at(world, pos)
    }

    fn biome_at(&self, world: &str, pos: BlockPos) -> Option<Biome> {
        self.world.biome_at(world, pos)
    }

    fn light_level_at(&self, world: &str, pos: BlockPos) -> Option<u8> {
        self.world.light_level_at(world, pos)
    }

    fn entity(&self, id: EntityId) -> Option<PluginEntity> {
        self.world.entity(id)
    }

    fn entities_with_tag(&self, key: &str) -> Vec<PluginEntity> {
        self.world.entities_with_tag(key)
    }

    fn nearby_entities(&self, center: EntityId, dx: f64, dy: f64, dz: f64) -> Vec<PluginEntity> {
        self.world.nearby(center, dx, dy, dz)
    }

    fn spawn_entity(&mut self, kind: EntityKind, location: &Location) -> Option<EntityId> {
        if !self.world.world_exists(&location.world) {
            return None;
        }
        let id = self.world.allocate_id();
        self.actions.push(PendingAction::SpawnEntity {
            id,
            kind,
            location: location.clone(),
        });
        Some(id)
    }

    fn remove_entity(&mut self, id: EntityId) {
        self.actions.push(PendingAction::RemoveEntity { id });
    }

    fn set_velocity(&mut self, id: EntityId, velocity: Vec3) {
        self.actions.push(PendingAction::SetVelocity { id, velocity });
    }

    fn set_tag(&mut self, id: EntityId, key: &str, value: &str) {
        self.actions.push(PendingAction::SetTag {
            id,
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    fn set_max_health(&mut self, id: EntityId, health: f64) {
        self.actions.push(PendingAction::SetMaxHealth { id, health });
    }

    fn set_movement_speed(&mut self, id: EntityId, speed: f64) {
        self.actions.push(PendingAction::SetMovementSpeed { id, speed });
    }

    fn set_custom_name(&mut self, id: EntityId, name: &str, visible: bool) {
        self.actions.push(PendingAction::SetCustomName {
            id,
            name: name.to_string(),
            visible,
        });
    }

    fn set_persistent(&mut self, id: EntityId, persistent: bool) {
        self.actions
            .push(PendingAction::SetPersistent { id, persistent });
    }

    fn set_item_amount(&mut self, id: EntityId, amount: u32) {
        self.actions.push(PendingAction::SetItemAmount { id, amount });
    }

    fn drop_item(&mut self, location: &Location, item: ItemStack) {
        self.actions.push(PendingAction::DropItem {
            location: location.clone(),
            item,
        });
    }

    fn play_sound(&mut self, location: &Location, sound: Sound, volume: f32, pitch: f32) {
        self.actions.push(PendingAction::PlaySound {
            location: location.clone(),
            sound,
            volume,
            pitch,
        });
    }

    fn set_event_damage(&mut self, damage: f32) {
        self.actions.push(PendingAction::SetEventDamage { damage });
    }

    fn set_event_drops(&mut self, drops: Vec<ItemStack>) {
        self.actions.push(PendingAction::SetEventDrops { drops });
    }

    fn get_tick(&self) -> u64 {
        self.world.current_tick()
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => info!("[plugin] {message}"),
            LogLevel::Warn => warn!("[plugin] {message}"),
            LogLevel::Error => error!("[plugin] {message}"),
            LogLevel::Debug => debug!("[plugin] {message}"),
        }
    }

    fn read_plugin_config(&self, plugin_name: &str) -> Option<serde_json::Value> {
        let path = config_path(self.config_dir, plugin_name);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Failed to parse {}: {e}", path.display());
                None
            }
        }
    }

    fn schedule_repeating(
        &mut self,
        plugin_name: &str,
        delay_ticks: u64,
        interval_ticks: u64,
        task_id: u32,
    ) {
        self.actions.push(PendingAction::ScheduleTask {
            task: ScheduledTask {
                plugin_name: plugin_name.to_string(),
                task_id,
                remaining_ticks: delay_ticks,
                interval: Some(interval_ticks),
            },
        });
    }

    fn cancel_task(&mut self, plugin_name: &str, task_id: u32) {
        self.actions.push(PendingAction::CancelTask {
            plugin_name: plugin_name.to_string(),
            task_id,
        });
    }

    fn register_command(&mut self, name: &str, description: &str, plugin_name: &str) {
        self.actions.push(PendingAction::RegisterCommand {
            name: name.to_string(),
            description: description.to_string(),
            plugin_name: plugin_name.to_string(),
        });
    }
}

fn config_path(config_dir: &Path, plugin_name: &str) -> PathBuf {
    config_dir.join(plugin_name).join("config.json")
}

// ─── PluginManager ───────────────────────────────────────────────────────────

/// Manages all loaded plugins, their scheduled tasks, and command registrations.
pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
    tasks: Vec<ScheduledTask>,
    /// Commands registered by plugins: command_name → plugin_name.
    pub plugin_commands: HashMap<String, String>,
    config_dir: PathBuf,
}

impl PluginManager {
    /// `config_dir` holds one `<plugin>/config.json` per plugin.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins: Vec::new(),
            tasks: Vec::new(),
            plugin_commands: HashMap::new(),
            config_dir: config_dir.into(),
        }
    }

    /// Register a plugin (call before enable_all).
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        info!("Registered plugin: {}", plugin.info().name);
        self.plugins.push(plugin);
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Live tasks owned by `plugin_name` with `task_id`.
    pub fn task_count(&self, plugin_name: &str, task_id: u32) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.plugin_name == plugin_name && t.task_id == task_id)
            .count()
    }

    /// Load configs for all plugins from disk, writing defaults where missing.
    pub fn load_configs(&mut self) {
        for plugin in &mut self.plugins {
            let info = plugin.info();
            let Some(default_config) = plugin.default_config() else {
                continue;
            };
            let config_path = config_path(&self.config_dir, &info.name);

            let config = if config_path.exists() {
                match std::fs::read_to_string(&config_path) {
                    Ok(data) => match serde_json::from_str(&data) {
                        Ok(v) => v,
                        Err(e) => {
                            warn!("Failed to parse config for {}: {e}", info.name);
                            default_config
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read config for {}: {e}", info.name);
                        default_config
                    }
                }
            } else {
                if let Some(dir) = config_path.parent() {
                    if let Err(e) = std::fs::create_dir_all(dir) {
                        warn!("Failed to create {}: {e}", dir.display());
                    }
                }
                match serde_json::to_string_pretty(&default_config) {
                    Ok(json) => {
                        if let Err(e) = std::fs::write(&config_path, json) {
                            warn!("Failed to write default config for {}: {e}", info.name);
                        }
                    }
                    Err(e) => warn!("Failed to serialize default config for {}: {e}", info.name),
                }
                default_config
            };

            plugin.load_config(config);
        }
    }

    /// Enable all registered plugins.
    pub fn enable_all(&mut self, world: &mut HostWorld) {
        for i in 0..self.plugins.len() {
            let mut api = ServerApiImpl::new(world, &self.config_dir);
            self.plugins[i].on_enable(&mut api);
            let actions = api.take_actions();
            self.apply_actions(world, actions);
        }
    }

    /// Disable all registered plugins.
    pub fn disable_all(&mut self, world: &mut HostWorld) {
        for i in 0..self.plugins.len() {
            let mut api = ServerApiImpl::new(world, &self.config_dir);
            self.plugins[i].on_disable(&mut api);
            let actions = api.take_actions();
            self.apply_actions(world, actions);
        }
    }

    /// Dispatch an event to all plugins in registration order.
    pub fn dispatch(&mut self, event: &PluginEvent, world: &mut HostWorld) -> Dispatched {
        let cancellable = event.is_cancellable();
        let mut result = EventResult::Continue;
        let mut overrides = EventOverrides::default();

        for i in 0..self.plugins.len() {
            let mut api = ServerApiImpl::new(world, &self.config_dir);
            let outcome = self.plugins[i].on_event(event, &mut api);
            let actions = api.take_actions();
            overrides.merge(self.apply_actions(world, actions));

            if cancellable && outcome == EventResult::Cancelled {
                result = EventResult::Cancelled;
                break; // Stop propagation
            }
        }

        Dispatched { result, overrides }
    }

    /// Tick the scheduler and run every task that fires.
    pub fn tick_scheduler(&mut self, world: &mut HostWorld) {
        let mut fired: Vec<(String, u32, bool)> = Vec::new();

        // Decrement and collect fired tasks
        for task in &mut self.tasks {
            if task.remaining_ticks > 0 {
                task.remaining_ticks -= 1;
            }
            if task.remaining_ticks == 0 {
                fired.push((task.plugin_name.clone(), task.task_id, task.interval.is_some()));
                if let Some(interval) = task.interval {
                    task.remaining_ticks = interval.max(1);
                }
            }
        }

        // Remove one-shot tasks that fired
        self.tasks
            .retain(|t| t.remaining_ticks > 0 || t.interval.is_some());

        for (plugin_name, task_id, repeating) in fired {
            // An earlier callback this tick may have cancelled a repeating task.
            if repeating && self.task_count(&plugin_name, task_id) == 0 {
                continue;
            }
            let Some(i) = self.plugin_index(&plugin_name) else {
                continue;
            };
            let mut api = ServerApiImpl::new(world, &self.config_dir);
            self.plugins[i].on_task(task_id, &mut api);
            let actions = api.take_actions();
            self.apply_actions(world, actions);
        }
    }

    /// Handle a plugin-registered command.
    pub fn handle_command(
        &mut self,
        command: &str,
        args: &[String],
        sender: &str,
        world: &mut HostWorld,
    ) -> Option<String> {
        let plugin_name = self.plugin_commands.get(command)?.clone();
        let i = self.plugin_index(&plugin_name)?;
        let mut api = ServerApiImpl::new(world, &self.config_dir);
        let response = self.plugins[i].on_command(command, args, sender, &mut api);
        let actions = api.take_actions();
        self.apply_actions(world, actions);
        response
    }

    /// Tab completion for a plugin-registered command.
    pub fn tab_complete(&self, command: &str, args: &[String]) -> Vec<String> {
        self.plugin_commands
            .get(command)
            .and_then(|name| self.plugin_index(name))
            .map(|i| self.plugins[i].on_tab_complete(command, args))
            .unwrap_or_default()
    }

    fn plugin_index(&self, plugin_name: &str) -> Option<usize> {
        self.plugins
            .iter()
            .position(|p| p.info().name == plugin_name)
    }

    /// Apply one callback's actions in order. Event overrides are handed back.
    fn apply_actions(&mut self, world: &mut HostWorld, actions: Vec<PendingAction>) -> EventOverrides {
        let mut overrides = EventOverrides::default();
        for action in actions {
            match action {
                PendingAction::SendMessage {
                    player_name,
                    message,
                } => info!("[to {player_name}] {message}"),
                PendingAction::SpawnEntity { id, kind, location } => {
                    if world.world_exists(&location.world) {
                        world.insert_entity(id, kind, location);
                    }
                }
                PendingAction::RemoveEntity { id } => {
                    world.remove(id);
                }
                PendingAction::SetVelocity { id, velocity } => {
                    world.set_velocity(id, velocity);
                }
                PendingAction::SetTag { id, key, value } => {
                    world.set_tag(id, &key, &value);
                }
                PendingAction::SetMaxHealth { id, health } => {
                    world.set_max_health(id, health);
                }
                PendingAction::SetMovementSpeed { id, speed } => {
                    world.set_movement_speed(id, speed);
                }
                PendingAction::SetCustomName { id, name, visible } => {
                    world.set_custom_name(id, &name, visible);
                }
                PendingAction::SetPersistent { id, persistent } => {
                    world.set_persistent(id, persistent);
                }
                PendingAction::SetItemAmount { id, amount } => {
                    world.set_item_amount(id, amount);
                }
                PendingAction::DropItem { location, item } => {
                    world.spawn_item(location, item);
                }
                PendingAction::PlaySound {
                    location,
                    sound,
                    volume,
                    pitch,
                } => debug!(
                    "Sound {sound} at {} ({:.1}, {:.1}, {:.1}) volume {volume} pitch {pitch}",
                    location.world, location.x, location.y, location.z
                ),
                PendingAction::SetEventDamage { damage } => overrides.damage = Some(damage),
                PendingAction::SetEventDrops { drops } => overrides.drops = Some(drops),
                PendingAction::RegisterCommand {
                    name, plugin_name, ..
                } => {
                    self.plugin_commands.insert(name, plugin_name);
                }
                PendingAction::ScheduleTask { task } => {
                    self.tasks.push(task);
                }
                PendingAction::CancelTask {
                    plugin_name,
                    task_id,
                } => {
                    self.tasks
                        .retain(|t| !(t.plugin_name == plugin_name && t.task_id == task_id));
                }
            }
        }
        overrides
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
