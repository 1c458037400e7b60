use serde::Deserialize;
use std::path::Path;

use mc_rats_plugin_api::{Biome, Location, Material, UnknownName};
use thiserror::Error;

use crate::world::{HostWorld, Terrain};

#[derive(Debug, Error)]
pub enum HostConfigError {
    #[error("failed to read host config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse host config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    UnknownName(#[from] UnknownName),
    #[error("player {player} is in unknown world {world}")]
    UnknownWorld { player: String, world: String },
}

#[derive(Debug, Deserialize)]
pub struct HostConfig {
    pub logging: LoggingSection,
    #[serde(default)]
    pub host: HostSection,
    #[serde(default = "default_worlds")]
    pub worlds: Vec<WorldSection>,
    #[serde(default)]
    pub players: Vec<PlayerSection>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize)]
pub struct HostSection {
    /// Directory holding `<plugin>/config.json`.
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: String,
    /// Ticks per second. Default: 20.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// First runtime id handed out.
    #[serde(default = "default_first_entity_id")]
    pub first_entity_id: u64,
}

fn default_plugin_dir() -> String {
    "plugins".into()
}

fn default_tick_rate() -> u32 {
    20
}

fn default_first_entity_id() -> u64 {
    1
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            plugin_dir: default_plugin_dir(),
            tick_rate: default_tick_rate(),
            first_entity_id: default_first_entity_id(),
        }
    }
}

/// A flat world: stone up to `surface_y`, capped with `surface`.
#[derive(Debug, Deserialize)]
pub struct WorldSection {
    pub name: String,
    #[serde(default = "default_surface_y")]
    pub surface_y: i32,
    #[serde(default = "default_surface")]
    pub surface: String,
    #[serde(default = "default_biome")]
    pub biome: String,
    #[serde(default = "default_sky_light")]
    pub sky_light: u8,
}

fn default_surface_y() -> i32 {
    63
}

fn default_surface() -> String {
    "grass_block".into()
}

fn default_biome() -> String {
    "plains".into()
}

fn default_sky_light() -> u8 {
    15
}

fn default_worlds() -> Vec<WorldSection> {
    vec![WorldSection {
        name: "world".into(),
        surface_y: default_surface_y(),
        surface: default_surface(),
        biome: default_biome(),
        sky_light: default_sky_light(),
    }]
}

#[derive(Debug, Deserialize)]
pub struct PlayerSection {
    pub name: String,
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl HostConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HostConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, HostConfigError> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }

    /// Build the world: terrains first, then players with their permissions.
    pub fn build_world(&self) -> Result<HostWorld, HostConfigError> {
        let mut world = HostWorld::new(self.host.first_entity_id);
        for section in &self.worlds {
            let surface: Material = section.surface.parse()?;
            let biome: Biome = section.biome.parse()?;
            world.add_terrain(
                section.name.clone(),
                Terrain::flat(section.surface_y, surface, biome, section.sky_light),
            );
        }
        for player in &self.players {
            let location = Location::new(player.world.clone(), player.x, player.y, player.z);
            if world.spawn_player(&player.name, location).is_none() {
                return Err(HostConfigError::UnknownWorld {
                    player: player.name.clone(),
                    world: player.world.clone(),
                });
            }
            for node in &player.permissions {
                world.grant(&player.name, node);
            }
        }
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_rats_plugin_api::BlockPos;

    #[test]
    fn parse_minimal_config() {
        let config = HostConfig::parse(
            r#"
            [logging]
            level = "debug"
        "#,
        )
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        // host section defaults when absent
        assert_eq!(config.host.plugin_dir, "plugins");
        assert_eq!(config.host.tick_rate, 20);
        assert_eq!(config.host.first_entity_id, 1);
        // one default world, no players
        assert_eq!(config.worlds.len(), 1);
        assert_eq!(config.worlds[0].name, "world");
        assert!(config.players.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let config = HostConfig::parse(
            r#"
            [logging]
            level = "info"

            [host]
            plugin_dir = "data"
            tick_rate = 10

            [[worlds]]
            name = "caves"
            surface_y = 40
            surface = "stone"
            biome = "lush_caves"
            sky_light = 0

            [[players]]
            name = "Alice"
            world = "caves"
            x = 0.5
            y = 41.0
            z = 0.5
            permissions = ["minecraftrats.spawn"]
        "#,
        )
        .unwrap();
        assert_eq!(config.host.plugin_dir, "data");
        assert_eq!(config.host.tick_rate, 10);

        let world = config.build_world().unwrap();
        assert_eq!(world.world_names(), vec!["caves".to_string()]);
        assert_eq!(world.highest_block_y("caves", 3, 3), Some(40));
        assert_eq!(world.biome_at("caves", BlockPos::new(0, 41, 0)), Some(Biome::LushCaves));
        assert_eq!(world.light_level_at("caves", BlockPos::new(0, 41, 0)), Some(0));
        assert!(world.player("Alice").is_some());
        assert!(world.has_permission("Alice", "minecraftrats.spawn"));
        assert!(!world.has_permission("Alice", "minecraftrats.kill"));
    }

    #[test]
    fn unknown_material_is_rejected() {
        let config = HostConfig::parse(
            r#"
            [logging]
            level = "info"

            [[worlds]]
            name = "world"
            surface = "cheese"
        "#,
        )
        .unwrap();
        assert!(matches!(
            config.build_world(),
            Err(HostConfigError::UnknownName(_))
        ));
    }

    #[test]
    fn player_in_missing_world_is_rejected() {
        let config = HostConfig::parse(
            r#"
            [logging]
            level = "info"

            [[players]]
            name = "Bob"
            world = "nether"
            x = 0.0
            y = 64.0
            z = 0.0
        "#,
        )
        .unwrap();
        assert!(matches!(
            config.build_world(),
            Err(HostConfigError::UnknownWorld { .. })
        ));
    }

    #[test]
    fn missing_logging_section_fails() {
        assert!(matches!(
            HostConfig::parse("[host]\ntick_rate = 20\n"),
            Err(HostConfigError::Toml(_))
        ));
    }
}
