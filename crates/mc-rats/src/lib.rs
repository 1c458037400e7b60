//! Rats: ambient and block-triggered spawning, a per-rat behaviour chain,
//! nests, item theft and loot, packaged as a host plugin.

pub mod behavior;
pub mod command;
pub mod config;
pub mod plugin;
pub mod population;
pub mod reward;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use config::Settings;
pub use plugin::RatsPlugin;

/// Name the plugin registers under; also its config directory.
pub const PLUGIN_NAME: &str = "MinecraftRats";
