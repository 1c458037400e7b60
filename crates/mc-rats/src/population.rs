//! Population manager: tracked rats, nests, spawn-site search and spawning.
//!
//! The tracked set is a cache of what the host knows. It drives the population
//! cap and nest bookkeeping, but bulk removal always enumerates the host by
//! species tag, since rats can die from causes the plugin never sees.

use std::collections::HashMap;

use mc_rats_plugin_api::{EntityId, EntityKind, Location, Material, PluginEntity, ServerApi};
use rand::Rng;
use tracing::{debug, info};

use crate::config::Settings;
use crate::reward;

/// Species marker written on every rat.
pub const SPECIES_TAG: &str = "minecraftrats";
pub const SPECIES_VALUE: &str = "rat";
pub const COLOR_TAG: &str = "rat_color";
pub const ITEMS_TAG: &str = "rat_items";

/// Host entity type rats are built on.
pub const RAT_KIND: EntityKind = EntityKind::Silverfish;

/// Attempts per spawn-site search.
pub const SITE_ATTEMPTS: usize = 10;
/// Per-axis offset range from the anchor, in blocks.
const SITE_MIN_OFFSET: i32 = 16;
const SITE_MAX_OFFSET: i32 = 32;
/// Height above a broken block's floor for triggered spawns.
const TRIGGER_LIFT: f64 = 0.1;

/// Bookkeeping for one tracked rat.
#[derive(Debug, Clone, PartialEq)]
pub struct RatRecord {
    pub color: String,
    /// Items stolen so far.
    pub carried: u32,
}

impl RatRecord {
    fn new(color: String) -> Self {
        Self { color, carried: 0 }
    }
}

/// Whether an entity carries the rat species tag.
pub fn is_tagged_rat(entity: &PluginEntity) -> bool {
    entity.tag(SPECIES_TAG) == Some(SPECIES_VALUE)
}

/// Carried-item count recorded on the host.
pub fn carried_from_tags(entity: &PluginEntity) -> u32 {
    entity
        .tag(ITEMS_TAG)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Live rat ids and their nests.
#[derive(Debug, Default)]
pub struct Population {
    rats: HashMap<EntityId, RatRecord>,
    nests: HashMap<EntityId, Location>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rats.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.rats.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.rats.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn record(&self, id: EntityId) -> Option<&RatRecord> {
        self.rats.get(&id)
    }

    pub fn record_mut(&mut self, id: EntityId) -> Option<&mut RatRecord> {
        self.rats.get_mut(&id)
    }

    pub fn nest_of(&self, id: EntityId) -> Option<&Location> {
        self.nests.get(&id)
    }

    pub fn nest_count(&self) -> usize {
        self.nests.len()
    }

    pub fn is_full(&self, settings: &Settings) -> bool {
        self.rats.len() >= settings.spawning.max_rats
    }

    /// Drop a rat from the tracked set. Its nest, if any, stays registered.
    pub fn forget(&mut self, id: EntityId) -> Option<RatRecord> {
        self.rats.remove(&id)
    }

    /// Start tracking a tagged rat the host already has (e.g. after a restart).
    /// Returns `false` if it is already tracked, untagged, or the cap is reached.
    pub fn adopt(&mut self, entity: &PluginEntity, settings: &Settings) -> bool {
        if !is_tagged_rat(entity) || self.contains(entity.id) || self.is_full(settings) {
            return false;
        }
        let color = entity
            .tag(COLOR_TAG)
            .unwrap_or(reward::DEFAULT_COLOR)
            .to_string();
        let mut record = RatRecord::new(color);
        record.carried = carried_from_tags(entity);
        self.rats.insert(entity.id, record);
        true
    }

    /// Spawn one rat at `location`. `None` if the world cannot be resolved.
    pub fn spawn_at(
        &mut self,
        location: &Location,
        settings: &Settings,
        api: &mut dyn ServerApi,
        rng: &mut impl Rng,
    ) -> Option<EntityId> {
        if !api.world_exists(&location.world) {
            debug!("Cannot spawn a rat in unknown world {}", location.world);
            return None;
        }
        let id = api.spawn_entity(RAT_KIND, location)?;

        let color = reward::pick_color(settings, rng);
        api.set_custom_name(id, &format!("§7{color} Rat"), true);
        api.set_tag(id, SPECIES_TAG, SPECIES_VALUE);
        api.set_tag(id, COLOR_TAG, &color);
        api.set_max_health(id, settings.rat.health);
        api.set_movement_speed(id, settings.rat.speed);
        api.set_persistent(id, true);

        self.rats.insert(id, RatRecord::new(color));

        if settings.debug {
            info!(
                "Spawned a rat at {} ({:.1}, {:.1}, {:.1})",
                location.world, location.x, location.y, location.z
            );
        }

        if self.nest_allowed(location, settings, api) && rng.gen_bool(settings.nests.chance) {
            self.nests.insert(id, location.clone());
            if settings.debug {
                info!(
                    "Created a rat nest at {} ({:.1}, {:.1}, {:.1})",
                    location.world, location.x, location.y, location.z
                );
            }
        }

        Some(id)
    }

    fn nest_allowed(&self, location: &Location, settings: &Settings, api: &dyn ServerApi) -> bool {
        let nests = &settings.nests;
        if !nests.enabled || self.nests.len() >= nests.max_nests {
            return false;
        }
        if nests.materials.is_empty() {
            return true;
        }
        let below = location.block_pos().up(-1);
        api.block_at(&location.world, below)
            .is_some_and(|m| nests.materials.contains(&m))
    }

    /// Spawn up to `count` rats at one spot, stopping at the population cap.
    pub fn spawn_burst(
        &mut self,
        location: &Location,
        count: usize,
        settings: &Settings,
        api: &mut dyn ServerApi,
        rng: &mut impl Rng,
    ) -> usize {
        let mut spawned = 0;
        for _ in 0..count {
            if self.is_full(settings) {
                break;
            }
            if self.spawn_at(location, settings, api, rng).is_some() {
                spawned += 1;
            }
        }
        spawned
    }

    /// Look for a valid surface spot 16..=32 blocks from `anchor` on each axis.
    pub fn find_spawn_site(
        anchor: &Location,
        settings: &Settings,
        api: &dyn ServerApi,
        rng: &mut impl Rng,
    ) -> Option<Location> {
        for _ in 0..SITE_ATTEMPTS {
            let dx = random_offset(rng);
            let dz = random_offset(rng);
            let mut candidate = anchor.offset(dx as f64, 0.0, dz as f64);
            let column = candidate.block_pos();
            let Some(surface) = api.highest_block_y(&candidate.world, column.x, column.z) else {
                continue;
            };
            candidate.y = (surface + 1) as f64;
            if is_valid_spawn_site(&candidate, settings, api) {
                return Some(candidate);
            }
        }
        None
    }

    /// One ambient-spawn pass over every enabled world with players in it.
    /// Returns the number of rats spawned.
    pub fn ambient_sweep(
        &mut self,
        settings: &Settings,
        api: &mut dyn ServerApi,
        rng: &mut impl Rng,
    ) -> usize {
        if !settings.spawning.natural || self.is_full(settings) {
            return 0;
        }

        let mut spawned = 0;
        for world in &settings.spawning.enabled_worlds {
            if !api.world_exists(world) {
                continue;
            }
            for player in api.players_in_world(world) {
                if !rng.gen_bool(settings.spawning.chance) {
                    continue;
                }
                if self.is_full(settings) {
                    return spawned;
                }
                let Some(site) = Self::find_spawn_site(&player.location, settings, api, rng) else {
                    continue;
                };
                if self.spawn_at(&site, settings, api, rng).is_some() {
                    spawned += 1;
                }
            }
        }
        spawned
    }

    /// Block-break trigger. `block` is the broken block's corner location.
    pub fn triggered_spawn(
        &mut self,
        block: &Location,
        material: Material,
        settings: &Settings,
        api: &mut dyn ServerApi,
        rng: &mut impl Rng,
    ) -> Option<EntityId> {
        let trigger = &settings.block_spawning;
        if !trigger.enabled
            || !settings.spawning.world_enabled(&block.world)
            || self.is_full(settings)
            || !trigger.blocks.contains(&material)
            || !rng.gen_bool(trigger.chance)
        {
            return None;
        }

        let site = block.block_pos().center(block.world.clone(), TRIGGER_LIFT);
        let id = self.spawn_at(&site, settings, api, rng)?;
        if settings.debug {
            info!(
                "Spawned a rat from broken {} at {} ({}, {}, {})",
                material,
                site.world,
                site.x.floor(),
                site.y.floor(),
                site.z.floor()
            );
        }
        Some(id)
    }

    /// Remove every host entity tagged as a rat, then clear all bookkeeping.
    pub fn remove_all(&mut self, api: &mut dyn ServerApi) -> usize {
        let rats = api.entities_with_tag(SPECIES_TAG);
        let count = rats.len();
        for rat in rats {
            api.remove_entity(rat.id);
        }
        self.rats.clear();
        self.nests.clear();
        count
    }
}

fn random_offset(rng: &mut impl Rng) -> i32 {
    let magnitude = rng.gen_range(SITE_MIN_OFFSET..=SITE_MAX_OFFSET);
    if rng.gen_bool(0.5) {
        magnitude
    } else {
        -magnitude
    }
}

/// All five spawn conditions: enabled world, solid footing, two blocks of
/// headroom, biome not disabled, light inside the configured band.
pub fn is_valid_spawn_site(location: &Location, settings: &Settings, api: &dyn ServerApi) -> bool {
    let spawning = &settings.spawning;
    if !spawning.world_enabled(&location.world) {
        return false;
    }

    let world = location.world.as_str();
    let pos = location.block_pos();
    let solid = |p| api.block_at(world, p).is_some_and(Material::is_solid);

    if !solid(pos.up(-1)) || solid(pos) || solid(pos.up(1)) {
        return false;
    }

    match api.biome_at(world, pos) {
        Some(biome) if !spawning.disabled_biomes.contains(&biome) => {}
        _ => return false,
    }

    api.light_level_at(world, pos)
        .is_some_and(|light| (spawning.min_light..=spawning.max_light).contains(&light))
}
