//! Plugin configuration: the raw JSON document and its validated snapshot.
//!
//! The host stores the document as `plugins/MinecraftRats/config.json`. Every
//! key has a default, so a partial document is fine. Names that do not
//! resolve (entity types, biomes, materials, sounds) never fail the load: list
//! entries are dropped and scalar values fall back to their default, each with
//! a warning.

use mc_rats_plugin_api::{Biome, EntityKind, Material, Sound, UnknownName};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A document that could not be read as a configuration at all.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A recoverable defect found while validating a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigWarning {
    #[error("invalid entry in {setting}: {source}")]
    UnknownEntry {
        setting: &'static str,
        source: UnknownName,
    },
    #[error("invalid sound {value}, using {fallback}")]
    UnknownSound { value: String, fallback: Sound },
    #[error("invalid drop format: {0}")]
    MalformedDrop(String),
    #[error("invalid weight for color {0}")]
    MalformedColor(String),
    #[error("light band {min}..{max} is inverted, swapping")]
    InvertedLightBand { min: u8, max: u8 },
    #[error("{setting} must be at least 1")]
    ZeroInterval { setting: &'static str },
    #[error("{setting} = {value} is outside 0..1, clamping")]
    ChanceOutOfRange { setting: &'static str, value: f64 },
}

// ─── Raw document ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RawConfig {
    pub general: GeneralSection,
    pub rat: RatSection,
    pub spawning: SpawningSection,
    pub block_spawning: BlockSpawningSection,
    pub drops: DropsSection,
    pub nests: NestsSection,
    pub colors: ColorsSection,
    pub messages: MessagesSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GeneralSection {
    pub enabled: bool,
    pub debug: bool,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RatSection {
    pub health: f64,
    pub speed: f64,
    pub damage: f64,
    pub attack_players: bool,
    pub attack_mobs: bool,
    pub scared_of: Vec<String>,
    pub steal_items: bool,
    pub max_items: u32,
    pub sound: String,
    pub sound_interval: u32,
    /// Ticks between behaviour pulses for every tracked rat.
    pub behavior_interval: u64,
}

impl Default for RatSection {
    fn default() -> Self {
        Self {
            health: 10.0,
            speed: 0.25,
            damage: 2.0,
            attack_players: true,
            attack_mobs: false,
            scared_of: vec!["cat".into(), "ocelot".into()],
            steal_items: true,
            max_items: 3,
            sound: "entity_bat_ambient".into(),
            sound_interval: 100,
            behavior_interval: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SpawningSection {
    pub natural_spawning: bool,
    pub max_rats: usize,
    pub min_light_level: u8,
    pub max_light_level: u8,
    pub chance: f64,
    pub initial_delay: u64,
    pub interval: u64,
    pub enabled_worlds: Vec<String>,
    pub preferred_biomes: Vec<String>,
    pub disabled_biomes: Vec<String>,
}

impl Default for SpawningSection {
    fn default() -> Self {
        Self {
            natural_spawning: true,
            max_rats: 50,
            min_light_level: 0,
            max_light_level: 7,
            chance: 0.05,
            initial_delay: 200,
            interval: 600,
            enabled_worlds: vec!["world".into()],
            preferred_biomes: Vec::new(),
            disabled_biomes: vec!["ocean".into(), "deep_ocean".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BlockSpawningSection {
    pub enabled: bool,
    pub chance: f64,
    pub blocks: Vec<String>,
}

impl Default for BlockSpawningSection {
    fn default() -> Self {
        Self {
            enabled: true,
            chance: 0.05,
            blocks: vec!["hay_block".into(), "oak_log".into(), "cobweb".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DropsSection {
    pub enabled: bool,
    /// `MATERIAL:amount:chance` lines.
    pub items: Vec<String>,
}

impl Default for DropsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            items: vec![
                "string:1:0.5".into(),
                "leather:1:0.25".into(),
                "bone:1:0.3".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NestsSection {
    pub enabled: bool,
    pub chance: f64,
    pub materials: Vec<String>,
    pub max_nests: usize,
    pub wander_distance: f64,
}

impl Default for NestsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            chance: 0.3,
            materials: Vec::new(),
            max_nests: 15,
            wander_distance: 16.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ColorsSection {
    pub enabled: bool,
    /// Colour name → relative weight, in document order.
    pub list: Map<String, Value>,
}

impl Default for ColorsSection {
    fn default() -> Self {
        let mut list = Map::new();
        list.insert("brown".into(), Value::from(0.5));
        list.insert("grey".into(), Value::from(0.3));
        list.insert("black".into(), Value::from(0.15));
        list.insert("white".into(), Value::from(0.05));
        Self {
            enabled: true,
            list,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MessagesSection {
    pub prefix: String,
    pub reload: String,
    pub spawn: String,
    pub kill: String,
    pub no_permission: String,
    pub player_only: String,
    pub invalid_amount: String,
}

impl Default for MessagesSection {
    fn default() -> Self {
        Self {
            prefix: "&7[&eMinecraftRats&7] ".into(),
            reload: "&aConfiguration reloaded successfully!".into(),
            spawn: "&aSpawned %amount% rats!".into(),
            kill: "&cKilled %amount% rats!".into(),
            no_permission: "&cYou don't have permission to use this command!".into(),
            player_only: "&cThis command can only be executed by a player.".into(),
            invalid_amount: "&cInvalid number format. Usage: /rats spawn [amount]".into(),
        }
    }
}

// ─── Validated snapshot ──────────────────────────────────────────────────────

/// Immutable, validated configuration. Shared as `Arc<Settings>` and replaced
/// wholesale on reload.
#[derive(Debug, Clone)]
pub struct Settings {
    pub enabled: bool,
    pub debug: bool,
    pub rat: RatSettings,
    pub spawning: SpawnSettings,
    pub block_spawning: BlockSpawnSettings,
    pub drops: DropSettings,
    pub nests: NestSettings,
    pub colors: ColorSettings,
    pub messages: MessagesSection,
}

#[derive(Debug, Clone)]
pub struct RatSettings {
    pub health: f64,
    pub speed: f64,
    pub damage: f32,
    pub attack_players: bool,
    pub attack_mobs: bool,
    pub scared_of: Vec<EntityKind>,
    pub steal_items: bool,
    pub max_items: u32,
    pub sound: Sound,
    pub sound_interval: u32,
    pub behavior_interval: u64,
}

#[derive(Debug, Clone)]
pub struct SpawnSettings {
    pub natural: bool,
    pub max_rats: usize,
    pub min_light: u8,
    pub max_light: u8,
    pub chance: f64,
    pub initial_delay: u64,
    pub interval: u64,
    pub enabled_worlds: Vec<String>,
    pub preferred_biomes: Vec<Biome>,
    pub disabled_biomes: Vec<Biome>,
}

impl SpawnSettings {
    pub fn world_enabled(&self, world: &str) -> bool {
        self.enabled_worlds.iter().any(|w| w == world)
    }
}

#[derive(Debug, Clone)]
pub struct BlockSpawnSettings {
    pub enabled: bool,
    pub chance: f64,
    pub blocks: Vec<Material>,
}

/// One loot-table row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootEntry {
    pub material: Material,
    pub amount: u32,
    pub chance: f64,
}

#[derive(Debug, Clone)]
pub struct DropSettings {
    pub enabled: bool,
    pub table: Vec<LootEntry>,
}

#[derive(Debug, Clone)]
pub struct NestSettings {
    pub enabled: bool,
    pub chance: f64,
    pub materials: Vec<Material>,
    pub max_nests: usize,
    pub wander_distance: f64,
}

#[derive(Debug, Clone)]
pub struct ColorSettings {
    pub enabled: bool,
    /// Capitalized colour name and weight, in document order.
    pub weights: Vec<(String, f64)>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::validate(RawConfig::default()).0
    }
}

impl Settings {
    /// Deserialize and validate a document, logging every warning.
    pub fn load(value: Value) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_value(value)?;
        let (settings, warnings) = Settings::validate(raw);
        for warning in &warnings {
            warn!("{warning}");
        }
        debug!(
            "Loaded rat settings: {} worlds, {} loot entries, {} colors, preferred biomes {:?}",
            settings.spawning.enabled_worlds.len(),
            settings.drops.table.len(),
            settings.colors.weights.len(),
            settings.spawning.preferred_biomes
        );
        Ok(settings)
    }

    /// Turn a raw document into a snapshot. Never fails; defects come back as warnings.
    pub fn validate(raw: RawConfig) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        let sound = match raw.rat.sound.parse::<Sound>() {
            Ok(s) => s,
            Err(_) => {
                warnings.push(ConfigWarning::UnknownSound {
                    value: raw.rat.sound.clone(),
                    fallback: Sound::EntityBatAmbient,
                });
                Sound::EntityBatAmbient
            }
        };

        let sound_interval = if raw.rat.sound_interval == 0 {
            warnings.push(ConfigWarning::ZeroInterval {
                setting: "rat.sound-interval",
            });
            1
        } else {
            raw.rat.sound_interval
        };

        let behavior_interval = if raw.rat.behavior_interval == 0 {
            warnings.push(ConfigWarning::ZeroInterval {
                setting: "rat.behavior-interval",
            });
            1
        } else {
            raw.rat.behavior_interval
        };

        let interval = if raw.spawning.interval == 0 {
            warnings.push(ConfigWarning::ZeroInterval {
                setting: "spawning.interval",
            });
            1
        } else {
            raw.spawning.interval
        };

        let (mut min_light, mut max_light) =
            (raw.spawning.min_light_level, raw.spawning.max_light_level);
        if min_light > max_light {
            warnings.push(ConfigWarning::InvertedLightBand {
                min: min_light,
                max: max_light,
            });
            std::mem::swap(&mut min_light, &mut max_light);
        }

        let rat = RatSettings {
            health: raw.rat.health,
            speed: raw.rat.speed,
            damage: raw.rat.damage as f32,
            attack_players: raw.rat.attack_players,
            attack_mobs: raw.rat.attack_mobs,
            scared_of: parse_names(&raw.rat.scared_of, "rat.scared-of", &mut warnings),
            steal_items: raw.rat.steal_items,
            max_items: raw.rat.max_items,
            sound,
            sound_interval,
            behavior_interval,
        };

        let spawning = SpawnSettings {
            natural: raw.spawning.natural_spawning,
            max_rats: raw.spawning.max_rats,
            min_light,
            max_light,
            chance: clamp_chance(raw.spawning.chance, "spawning.chance", &mut warnings),
            initial_delay: raw.spawning.initial_delay,
            interval,
            enabled_worlds: raw.spawning.enabled_worlds,
            preferred_biomes: parse_names(
                &raw.spawning.preferred_biomes,
                "spawning.preferred-biomes",
                &mut warnings,
            ),
            disabled_biomes: parse_names(
                &raw.spawning.disabled_biomes,
                "spawning.disabled-biomes",
                &mut warnings,
            ),
        };

        let block_spawning = BlockSpawnSettings {
            enabled: raw.block_spawning.enabled,
            chance: clamp_chance(
                raw.block_spawning.chance,
                "block-spawning.chance",
                &mut warnings,
            ),
            blocks: parse_names(&raw.block_spawning.blocks, "block-spawning.blocks", &mut warnings),
        };

        let drops = DropSettings {
            enabled: raw.drops.enabled,
            table: parse_loot_table(&raw.drops.items, &mut warnings),
        };

        let nests = NestSettings {
            enabled: raw.nests.enabled,
            chance: clamp_chance(raw.nests.chance, "nests.chance", &mut warnings),
            materials: parse_names(&raw.nests.materials, "nests.materials", &mut warnings),
            max_nests: raw.nests.max_nests,
            wander_distance: raw.nests.wander_distance,
        };

        let mut weights = Vec::with_capacity(raw.colors.list.len());
        for (name, weight) in &raw.colors.list {
            match weight.as_f64() {
                Some(w) => weights.push((capitalize(name), w)),
                None => warnings.push(ConfigWarning::MalformedColor(name.clone())),
            }
        }
        let colors = ColorSettings {
            enabled: raw.colors.enabled,
            weights,
        };

        let settings = Settings {
            enabled: raw.general.enabled,
            debug: raw.general.debug,
            rat,
            spawning,
            block_spawning,
            drops,
            nests,
            colors,
            messages: raw.messages,
        };
        (settings, warnings)
    }
}

/// Default document, as written to disk on first start.
pub fn default_document() -> Value {
    serde_json::to_value(RawConfig::default()).unwrap_or(Value::Null)
}

fn parse_names<T>(raw: &[String], setting: &'static str, warnings: &mut Vec<ConfigWarning>) -> Vec<T>
where
    T: std::str::FromStr<Err = UnknownName> + PartialEq,
{
    let mut out = Vec::with_capacity(raw.len());
    for name in raw {
        match name.parse::<T>() {
            Ok(v) if !out.contains(&v) => out.push(v),
            Ok(_) => {}
            Err(source) => warnings.push(ConfigWarning::UnknownEntry { setting, source }),
        }
    }
    out
}

/// Parse `MATERIAL:amount:chance` lines. A later line for the same material
/// replaces the earlier one.
fn parse_loot_table(lines: &[String], warnings: &mut Vec<ConfigWarning>) -> Vec<LootEntry> {
    let mut table: Vec<LootEntry> = Vec::new();
    for line in lines {
        let Some(entry) = parse_loot_line(line, warnings) else {
            continue;
        };
        match table.iter_mut().find(|e| e.material == entry.material) {
            Some(existing) => *existing = entry,
            None => table.push(entry),
        }
    }
    table
}

fn parse_loot_line(line: &str, warnings: &mut Vec<ConfigWarning>) -> Option<LootEntry> {
    // rsplitn keeps a `minecraft:` namespace attached to the material.
    let mut parts = line.rsplitn(3, ':');
    let (Some(chance), Some(amount), Some(material)) = (parts.next(), parts.next(), parts.next())
    else {
        warnings.push(ConfigWarning::MalformedDrop(line.to_string()));
        return None;
    };
    let (Ok(amount), Ok(chance)) = (amount.trim().parse::<u32>(), chance.trim().parse::<f64>())
    else {
        warnings.push(ConfigWarning::MalformedDrop(line.to_string()));
        return None;
    };
    match material.parse::<Material>() {
        Ok(material) => Some(LootEntry {
            material,
            amount,
            chance,
        }),
        Err(source) => {
            warnings.push(ConfigWarning::UnknownEntry {
                setting: "drops.items",
                source,
            });
            None
        }
    }
}

fn clamp_chance(value: f64, setting: &'static str, warnings: &mut Vec<ConfigWarning>) -> f64 {
    if (0.0..=1.0).contains(&value) {
        return value;
    }
    warnings.push(ConfigWarning::ChanceOutOfRange { setting, value });
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn capitalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
