//! The host loop's entry points: world changes that raise plugin events.

use mc_rats_plugin_api::{
    BlockPos, EntityId, EntityKind, EventResult, ItemStack, Location, Material, Plugin,
    PluginEvent,
};
use tracing::{debug, info};

use crate::config::{HostConfig, HostConfigError};
use crate::plugin_manager::PluginManager;
use crate::world::HostWorld;

/// What an entity drops when no plugin overrides it.
pub fn default_drops(kind: EntityKind) -> Vec<ItemStack> {
    match kind {
        EntityKind::Cow => vec![ItemStack::new(Material::Leather, 1)],
        EntityKind::Zombie => vec![ItemStack::new(Material::RottenFlesh, 1)],
        EntityKind::Skeleton => vec![ItemStack::new(Material::Bone, 1)],
        EntityKind::Spider => vec![ItemStack::new(Material::String, 1)],
        _ => Vec::new(),
    }
}

/// A world plus the plugins observing it.
pub struct Host {
    pub world: HostWorld,
    pub plugins: PluginManager,
}

impl Host {
    pub fn new(world: HostWorld, plugins: PluginManager) -> Self {
        Self { world, plugins }
    }

    pub fn from_config(config: &HostConfig) -> Result<Self, HostConfigError> {
        let world = config.build_world()?;
        let plugins = PluginManager::new(&config.host.plugin_dir);
        Ok(Self::new(world, plugins))
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.register(plugin);
    }

    /// Load configs, enable every plugin, then announce the server start.
    pub fn start(&mut self) {
        self.plugins.load_configs();
        self.plugins.enable_all(&mut self.world);
        self.plugins
            .dispatch(&PluginEvent::ServerStarted, &mut self.world);
        info!(
            "Host started: {} worlds, {} plugins",
            self.world.world_names().len(),
            self.plugins.plugin_count()
        );
    }

    /// One game tick: physics, then plugin tasks.
    pub fn tick(&mut self) {
        self.world.tick();
        self.plugins.tick_scheduler(&mut self.world);
    }

    /// A player breaks the block at `pos` in their world. Returns whether it broke.
    pub fn break_block(&mut self, player_name: &str, pos: BlockPos) -> bool {
        let Some(player) = self.world.player(player_name) else {
            return false;
        };
        let world_name = player.location.world.clone();
        let Some(material) = self.world.block_at(&world_name, pos) else {
            return false;
        };
        if !material.is_solid() {
            return false;
        }
        let event = PluginEvent::BlockBreak {
            player,
            location: Location::new(
                world_name.clone(),
                f64::from(pos.x),
                f64::from(pos.y),
                f64::from(pos.z),
            ),
            material,
        };
        if self.plugins.dispatch(&event, &mut self.world).result == EventResult::Cancelled {
            return false;
        }
        if let Some(terrain) = self.world.terrain_mut(&world_name) {
            terrain.set_block(pos, Material::Air);
        }
        true
    }

    /// Spawn an entity the way natural spawning would. Cancelled spawns are undone.
    pub fn spawn(&mut self, kind: EntityKind, location: Location) -> Option<EntityId> {
        let id = self.world.spawn(kind, location)?;
        let entity = self.world.entity(id)?;
        let event = PluginEvent::EntitySpawn { entity };
        if self.plugins.dispatch(&event, &mut self.world).result == EventResult::Cancelled {
            self.world.remove(id);
            return None;
        }
        Some(id)
    }

    /// `damager` hits `victim`. Returns the damage dealt, or `None` if the hit was cancelled.
    pub fn attack(&mut self, damager: EntityId, victim: EntityId, damage: f32) -> Option<f32> {
        let event = PluginEvent::EntityDamageByEntity {
            damager: self.world.entity(damager)?,
            victim: self.world.entity(victim)?,
            damage,
        };
        let outcome = self.plugins.dispatch(&event, &mut self.world);
        if outcome.result == EventResult::Cancelled {
            return None;
        }
        // The victim may not survive plugin callbacks.
        self.world.entity(victim)?;
        let dealt = outcome.overrides.damage.unwrap_or(damage);
        let left = self.world.damage(victim, f64::from(dealt))?;
        if left <= 0.0 {
            self.kill(victim, Some(damager));
        }
        Some(dealt)
    }

    /// An entity dies. Drops are spawned as item entities and returned.
    pub fn kill(&mut self, id: EntityId, killer: Option<EntityId>) -> Vec<ItemStack> {
        let Some(entity) = self.world.entity(id) else {
            return Vec::new();
        };
        let location = entity.location.clone();
        let defaults = default_drops(entity.kind);
        let event = PluginEvent::EntityDeath { entity, killer };
        let outcome = self.plugins.dispatch(&event, &mut self.world);
        self.world.remove(id);

        let drops = outcome.overrides.drops.unwrap_or(defaults);
        for stack in &drops {
            self.world.spawn_item(location.clone(), *stack);
        }
        debug!("Entity {id} died, dropped {} stacks", drops.len());
        drops
    }

    /// `entity` tries to target `target`. Returns whether it may.
    pub fn target(&mut self, entity: EntityId, target: EntityId) -> bool {
        let (Some(entity), Some(target)) = (self.world.entity(entity), self.world.entity(target))
        else {
            return false;
        };
        let event = PluginEvent::EntityTarget { entity, target };
        self.plugins.dispatch(&event, &mut self.world).result == EventResult::Continue
    }

    /// Run a command line (leading `/` optional). `None` if no plugin owns the command.
    pub fn run_command(&mut self, sender: &str, line: &str) -> Option<String> {
        let (command, args) = split_command(line)?;
        self.plugins
            .handle_command(&command, &args, sender, &mut self.world)
    }

    /// Completions for the last word of `line`. A trailing space starts a new word.
    pub fn complete(&self, line: &str) -> Vec<String> {
        let Some((command, mut args)) = split_command(line) else {
            return Vec::new();
        };
        if line.ends_with(char::is_whitespace) {
            args.push(String::new());
        }
        self.plugins.tab_complete(&command, &args)
    }

    /// Announce the stop, then disable every plugin.
    pub fn stop(&mut self) {
        self.plugins
            .dispatch(&PluginEvent::ServerStopping, &mut self.world);
        self.plugins.disable_all(&mut self.world);
        info!("Host stopped at tick {}", self.world.current_tick());
    }
}

fn split_command(line: &str) -> Option<(String, Vec<String>)> {
    let mut parts = line.trim().trim_start_matches('/').split_whitespace();
    let command = parts.next()?.to_lowercase();
    Some((command, parts.map(str::to_string).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Terrain;
    use mc_rats_plugin_api::{Biome, PluginInfo, ServerApi};

    /// Cancels every spawn of a pig and turns cow deaths into emeralds.
    struct Picky;

    impl Plugin for Picky {
        fn info(&self) -> PluginInfo {
            PluginInfo {
                name: "Picky".into(),
                version: "0.1.0".into(),
                description: "Test".into(),
                author: "Test".into(),
            }
        }

        fn on_enable(&mut self, api: &mut dyn ServerApi) {
            api.register_command("picky", "Test", "Picky");
        }

        fn on_event(&mut self, event: &PluginEvent, api: &mut dyn ServerApi) -> EventResult {
            match event {
                PluginEvent::EntitySpawn { entity } if entity.kind == EntityKind::Pig => {
                    EventResult::Cancelled
                }
                PluginEvent::EntityDeath { entity, .. } if entity.kind == EntityKind::Cow => {
                    api.set_event_drops(vec![ItemStack::new(Material::Emerald, 2)]);
                    EventResult::Continue
                }
                PluginEvent::BlockBreak { material, .. } if *material == Material::Chest => {
                    EventResult::Cancelled
                }
                _ => EventResult::Continue,
            }
        }

        fn on_command(
            &mut self,
            _command: &str,
            args: &[String],
            sender: &str,
            _api: &mut dyn ServerApi,
        ) -> Option<String> {
            Some(format!("{sender}: {}", args.join(",")))
        }

        fn on_tab_complete(&self, _command: &str, args: &[String]) -> Vec<String> {
            vec![format!("{}", args.len())]
        }
    }

    fn host() -> (Host, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut world = HostWorld::new(1);
        world.add_terrain(
            "world",
            Terrain::flat(63, Material::GrassBlock, Biome::Plains, 15),
        );
        world.spawn_player("Alice", Location::new("world", 0.5, 64.0, 0.5));
        let mut host = Host::new(world, PluginManager::new(dir.path()));
        host.register(Box::new(Picky));
        host.start();
        (host, dir)
    }

    #[test]
    fn cancelled_spawn_is_undone() {
        let (mut host, _dir) = host();
        let before = host.world.entity_count();
        assert!(host
            .spawn(EntityKind::Pig, Location::new("world", 2.0, 64.0, 2.0))
            .is_none());
        assert_eq!(host.world.entity_count(), before);
        assert!(host
            .spawn(EntityKind::Cow, Location::new("world", 2.0, 64.0, 2.0))
            .is_some());
    }

    #[test]
    fn death_drops_follow_overrides() {
        let (mut host, _dir) = host();
        let cow = host
            .spawn(EntityKind::Cow, Location::new("world", 2.0, 64.0, 2.0))
            .unwrap();
        let drops = host.kill(cow, None);
        assert_eq!(drops, vec![ItemStack::new(Material::Emerald, 2)]);
        assert!(host.world.entity(cow).is_none());
        let items: Vec<_> = host
            .world
            .entities()
            .into_iter()
            .filter(|e| e.kind == EntityKind::Item)
            .collect();
        assert_eq!(items.len(), 1);

        let zombie = host
            .spawn(EntityKind::Zombie, Location::new("world", 3.0, 64.0, 3.0))
            .unwrap();
        assert_eq!(
            host.kill(zombie, None),
            vec![ItemStack::new(Material::RottenFlesh, 1)]
        );
    }

    #[test]
    fn lethal_attack_kills() {
        let (mut host, _dir) = host();
        let zombie = host
            .spawn(EntityKind::Zombie, Location::new("world", 2.0, 64.0, 2.0))
            .unwrap();
        let cow = host
            .spawn(EntityKind::Cow, Location::new("world", 3.0, 64.0, 2.0))
            .unwrap();
        assert_eq!(host.attack(zombie, cow, 4.0), Some(4.0));
        assert!(host.world.entity(cow).is_some());
        host.attack(zombie, cow, 6.0);
        assert!(host.world.entity(cow).is_none());
    }

    #[test]
    fn block_break_respects_cancel() {
        let (mut host, _dir) = host();
        let grass = BlockPos::new(0, 63, 0);
        assert!(host.break_block("Alice", grass));
        assert_eq!(host.world.block_at("world", grass), Some(Material::Air));
        assert!(!host.break_block("Alice", grass));

        let chest = BlockPos::new(4, 64, 4);
        host.world
            .terrain_mut("world")
            .unwrap()
            .set_block(chest, Material::Chest);
        assert!(!host.break_block("Alice", chest));
        assert_eq!(host.world.block_at("world", chest), Some(Material::Chest));
        assert!(!host.break_block("Nobody", chest));
    }

    #[test]
    fn commands_route_with_optional_slash() {
        let (mut host, _dir) = host();
        assert_eq!(
            host.run_command("Alice", "/picky a b"),
            Some("Alice: a,b".into())
        );
        assert_eq!(host.run_command("Alice", "PICKY"), Some("Alice: ".into()));
        assert!(host.run_command("Alice", "nope").is_none());
        assert!(host.run_command("Alice", "   ").is_none());
    }

    #[test]
    fn completion_counts_trailing_word() {
        let (host, _dir) = host();
        assert_eq!(host.complete("picky"), vec!["0".to_string()]);
        assert_eq!(host.complete("picky "), vec!["1".to_string()]);
        assert_eq!(host.complete("picky sp"), vec!["1".to_string()]);
        assert!(host.complete("").is_empty());
    }
}
