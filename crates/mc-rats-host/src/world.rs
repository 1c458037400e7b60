//! Host world: named flat terrains plus a bevy_ecs entity store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use bevy_ecs::prelude::*;
use mc_rats_plugin_api::{
    Biome, BlockPos, EntityId, EntityKind, ItemStack, Location, Material, PluginEntity,
    PluginPlayer, Vec3,
};

use crate::components::*;

/// Sender name used for console commands. It holds every permission.
pub const CONSOLE: &str = "CONSOLE";

/// How far below the flat surface a column scan looks for solid ground.
const COLUMN_DEPTH: i32 = 64;
const DRAG: f64 = 0.91;
const REST_SPEED: f64 = 0.003;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Global tick counter (incremented every 50 ms).
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

/// Thread-safe entity id allocator.
#[derive(Resource)]
pub struct EntityIdAllocator {
    next: AtomicU64,
}

impl EntityIdAllocator {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    pub fn allocate(&self) -> EntityId {
        EntityId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Runtime id → ECS entity.
#[derive(Resource, Default)]
pub struct EntityIndex(pub HashMap<EntityId, Entity>);

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// A flat world with sparse block and biome overrides.
#[derive(Debug, Clone)]
pub struct Terrain {
    /// Top of the flat fill; `None` for a void world.
    pub surface_y: Option<i32>,
    pub surface: Material,
    pub ground: Material,
    pub biome: Biome,
    /// Light level in open air. Anything under a solid block is dark.
    pub sky_light: u8,
    blocks: HashMap<BlockPos, Material>,
    biomes: HashMap<(i32, i32), Biome>,
}

impl Terrain {
    pub fn flat(surface_y: i32, surface: Material, biome: Biome, sky_light: u8) -> Self {
        Self {
            surface_y: Some(surface_y),
            surface,
            ground: Material::Stone,
            biome,
            sky_light,
            blocks: HashMap::new(),
            biomes: HashMap::new(),
        }
    }

    pub fn block(&self, pos: BlockPos) -> Material {
        if let Some(m) = self.blocks.get(&pos) {
            return *m;
        }
        match self.surface_y {
            Some(s) if pos.y == s => self.surface,
            Some(s) if pos.y < s => self.ground,
            _ => Material::Air,
        }
    }

    /// Place a block, returning what was there.
    pub fn set_block(&mut self, pos: BlockPos, material: Material) -> Material {
        let previous = self.block(pos);
        self.blocks.insert(pos, material);
        previous
    }

    pub fn biome(&self, x: i32, z: i32) -> Biome {
        self.biomes.get(&(x, z)).copied().unwrap_or(self.biome)
    }

    pub fn set_biome(&mut self, x: i32, z: i32, biome: Biome) {
        self.biomes.insert((x, z), biome);
    }

    pub fn highest_solid(&self, x: i32, z: i32) -> Option<i32> {
        let placed = self
            .blocks
            .iter()
            .filter(|(p, m)| p.x == x && p.z == z && m.is_solid())
            .map(|(p, _)| p.y)
            .max();
        let natural = self.surface_y.and_then(|s| {
            (s - COLUMN_DEPTH..=s)
                .rev()
                .find(|&y| self.block(BlockPos::new(x, y, z)).is_solid())
        });
        placed.max(natural)
    }

    pub fn light(&self, pos: BlockPos) -> u8 {
        match self.highest_solid(pos.x, pos.z) {
            Some(top) if pos.y <= top => 0,
            _ => self.sky_light,
        }
    }
}

// ---------------------------------------------------------------------------
// HostWorld
// ---------------------------------------------------------------------------

/// Terrains, entities and permissions of the reference host.
pub struct HostWorld {
    pub ecs: World,
    terrains: BTreeMap<String, Terrain>,
    permissions: HashMap<String, HashSet<String>>,
}

impl HostWorld {
    pub fn new(starting_entity_id: u64) -> Self {
        let mut ecs = World::new();
        ecs.insert_resource(TickCounter::default());
        ecs.insert_resource(EntityIdAllocator::new(starting_entity_id));
        ecs.insert_resource(EntityIndex::default());
        Self {
            ecs,
            terrains: BTreeMap::new(),
            permissions: HashMap::new(),
        }
    }

    /// Advance one tick: counter, then movement.
    pub fn tick(&mut self) {
        self.ecs.resource_mut::<TickCounter>().0 += 1;
        system_movement(&mut self.ecs, &self.terrains);
    }

    pub fn current_tick(&self) -> u64 {
        self.ecs.resource::<TickCounter>().0
    }

    pub fn allocate_id(&self) -> EntityId {
        self.ecs.resource::<EntityIdAllocator>().allocate()
    }

    // --- Terrain ---

    pub fn add_terrain(&mut self, name: impl Into<String>, terrain: Terrain) {
        self.terrains.insert(name.into(), terrain);
    }

    pub fn terrain(&self, world: &str) -> Option<&Terrain> {
        self.terrains.get(world)
    }

    pub fn terrain_mut(&mut self, world: &str) -> Option<&mut Terrain> {
        self.terrains.get_mut(world)
    }

    pub fn world_names(&self) -> Vec<String> {
        self.terrains.keys().cloned().collect()
    }

    pub fn world_exists(&self, world: &str) -> bool {
        self.terrains.contains_key(world)
    }

    pub fn block_at(&self, world: &str, pos: BlockPos) -> Option<Material> {
        self.terrain(world).map(|t| t.block(pos))
    }

    pub fn highest_block_y(&self, world: &str, x: i32, z: i32) -> Option<i32> {
        self.terrain(world)?.highest_solid(x, z)
    }

    pub fn biome_at(&self, world: &str, pos: BlockPos) -> Option<Biome> {
        self.terrain(world).map(|t| t.biome(pos.x, pos.z))
    }

    pub fn light_level_at(&self, world: &str, pos: BlockPos) -> Option<u8> {
        self.terrain(world).map(|t| t.light(pos))
    }

    // --- Permissions ---

    pub fn grant(&mut self, player: &str, node: &str) {
        self.permissions
            .entry(player.to_string())
            .or_default()
            .insert(node.to_string());
    }

    pub fn has_permission(&self, player: &str, node: &str) -> bool {
        player == CONSOLE
            || self
                .permissions
                .get(player)
                .is_some_and(|nodes| nodes.contains(node))
    }

    // --- Entities ---

    fn find(&self, id: EntityId) -> Option<Entity> {
        self.ecs.resource::<EntityIndex>().0.get(&id).copied()
    }

    /// Create an entity under an id that was already allocated.
    pub fn insert_entity(&mut self, id: EntityId, kind: EntityKind, location: Location) -> Entity {
        let max = if kind.is_player() { 20.0 } else { 10.0 };
        let entity = self
            .ecs
            .spawn((
                RuntimeId(id),
                Position(location),
                Velocity::default(),
                Health { current: max, max },
                Kind(kind),
                Tags::default(),
                Persistent(false),
                MovementSpeed(0.25),
            ))
            .id();
        self.ecs.resource_mut::<EntityIndex>().0.insert(id, entity);
        entity
    }

    /// Spawn an entity. `None` if the world does not exist.
    pub fn spawn(&mut self, kind: EntityKind, location: Location) -> Option<EntityId> {
        if !self.world_exists(&location.world) {
            return None;
        }
        let id = self.allocate_id();
        self.insert_entity(id, kind, location);
        Some(id)
    }

    pub fn spawn_player(&mut self, name: &str, location: Location) -> Option<EntityId> {
        let id = self.spawn(EntityKind::Player, location)?;
        let entity = self.find(id)?;
        self.ecs
            .entity_mut(entity)
            .insert(PlayerName(name.to_string()));
        Some(id)
    }

    pub fn spawn_item(&mut self, location: Location, stack: ItemStack) -> Option<EntityId> {
        let id = self.spawn(EntityKind::Item, location)?;
        let entity = self.find(id)?;
        self.ecs.entity_mut(entity).insert(ItemStackComp(stack));
        Some(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<PluginEntity> {
        let e = self.find(id)?;
        Some(PluginEntity {
            id,
            kind: self.ecs.get::<Kind>(e)?.0,
            location: self.ecs.get::<Position>(e)?.0.clone(),
            tags: self
                .ecs
                .get::<Tags>(e)
                .map(|t| t.0.clone())
                .unwrap_or_default(),
            item: self.ecs.get::<ItemStackComp>(e).map(|s| s.0),
        })
    }

    /// Every entity, ordered by id.
    pub fn entities(&self) -> Vec<PluginEntity> {
        let mut ids: Vec<EntityId> = self.ecs.resource::<EntityIndex>().0.keys().copied().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.entity(id)).collect()
    }

    pub fn entity_count(&self) -> usize {
        self.ecs.resource::<EntityIndex>().0.len()
    }

    /// Living (non-item) entities carrying `key`.
    pub fn entities_with_tag(&self, key: &str) -> Vec<PluginEntity> {
        self.entities()
            .into_iter()
            .filter(|e| e.kind != EntityKind::Item && e.tags.contains_key(key))
            .collect()
    }

    pub fn nearby(&self, center: EntityId, dx: f64, dy: f64, dz: f64) -> Vec<PluginEntity> {
        let Some(c) = self.entity(center) else {
            return Vec::new();
        };
        self.entities()
            .into_iter()
            .filter(|e| e.id != center && e.location.world == c.location.world)
            .filter(|e| {
                let d = e.location.delta_from(&c.location);
                d.x.abs() <= dx && d.y.abs() <= dy && d.z.abs() <= dz
            })
            .collect()
    }

    pub fn players(&self) -> Vec<PluginPlayer> {
        let mut ids: Vec<EntityId> = self.ecs.resource::<EntityIndex>().0.keys().copied().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| {
                let e = self.find(id)?;
                let name = self.ecs.get::<PlayerName>(e)?;
                let pos = self.ecs.get::<Position>(e)?;
                Some(PluginPlayer {
                    name: name.0.clone(),
                    runtime_id: id,
                    location: pos.0.clone(),
                })
            })
            .collect()
    }

    pub fn player(&self, name: &str) -> Option<PluginPlayer> {
        self.players().into_iter().find(|p| p.name == name)
    }

    /// Despawn an entity, returning its last state.
    pub fn remove(&mut self, id: EntityId) -> Option<PluginEntity> {
        let view = self.entity(id)?;
        let entity = self.ecs.resource_mut::<EntityIndex>().0.remove(&id)?;
        self.ecs.despawn(entity);
        Some(view)
    }

    fn update<T: Component>(&mut self, id: EntityId, f: impl FnOnce(&mut T)) -> bool {
        let Some(entity) = self.find(id) else {
            return false;
        };
        match self.ecs.get_mut::<T>(entity) {
            Some(mut component) => {
                f(&mut *component);
                true
            }
            None => false,
        }
    }

    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec3) -> bool {
        self.update::<Velocity>(id, |v| v.0 = velocity)
    }

    pub fn velocity(&self, id: EntityId) -> Option<Vec3> {
        self.ecs.get::<Velocity>(self.find(id)?).map(|v| v.0)
    }

    pub fn teleport(&mut self, id: EntityId, location: Location) -> bool {
        self.update::<Position>(id, |p| p.0 = location)
    }

    pub fn set_tag(&mut self, id: EntityId, key: &str, value: &str) -> bool {
        self.update::<Tags>(id, |t| {
            t.0.insert(key.to_string(), value.to_string());
        })
    }

    pub fn set_max_health(&mut self, id: EntityId, health: f64) -> bool {
        self.update::<Health>(id, |h| {
            h.max = health;
            h.current = health;
        })
    }

    pub fn health(&self, id: EntityId) -> Option<Health> {
        self.ecs.get::<Health>(self.find(id)?).copied()
    }

    /// Subtract health. Returns what is left, `None` if the entity is unknown.
    pub fn damage(&mut self, id: EntityId, amount: f64) -> Option<f64> {
        let mut left = None;
        self.update::<Health>(id, |h| {
            h.current = (h.current - amount).max(0.0);
            left = Some(h.current);
        });
        left
    }

    pub fn set_movement_speed(&mut self, id: EntityId, speed: f64) -> bool {
        self.update::<MovementSpeed>(id, |s| s.0 = speed)
    }

    pub fn set_custom_name(&mut self, id: EntityId, name: &str, visible: bool) -> bool {
        let Some(entity) = self.find(id) else {
            return false;
        };
        self.ecs.entity_mut(entity).insert(CustomName {
            name: name.to_string(),
            visible,
        });
        true
    }

    pub fn custom_name(&self, id: EntityId) -> Option<String> {
        self.ecs
            .get::<CustomName>(self.find(id)?)
            .map(|n| n.name.clone())
    }

    pub fn set_persistent(&mut self, id: EntityId, persistent: bool) -> bool {
        self.update::<Persistent>(id, |p| p.0 = persistent)
    }

    /// Resize a dropped item's stack; zero removes the item.
    pub fn set_item_amount(&mut self, id: EntityId, amount: u32) -> bool {
        if amount == 0 {
            return self.remove(id).is_some();
        }
        self.update::<ItemStackComp>(id, |s| s.0.amount = amount)
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Apply velocities horizontally, keep movers on the ground, and bleed off speed.
fn system_movement(ecs: &mut World, terrains: &BTreeMap<String, Terrain>) {
    let mut query = ecs.query::<(&mut Position, &mut Velocity)>();
    for (mut pos, mut vel) in query.iter_mut(ecs) {
        if vel.0 == Vec3::ZERO {
            continue;
        }
        let step = vel.0;
        let loc = &mut pos.0;
        loc.x += step.x;
        loc.z += step.z;
        let column = loc.block_pos();
        if let Some(top) = terrains
            .get(&loc.world)
            .and_then(|t| t.highest_solid(column.x, column.z))
        {
            loc.y = (top + 1) as f64;
        }

        let slowed = Vec3::new(step.x * DRAG, 0.0, step.z * DRAG);
        vel.0 = if slowed.length() < REST_SPEED {
            Vec3::ZERO
        } else {
            slowed
        };
    }
}
