//! Reference host for rat plugins: flat worlds, a bevy_ecs entity store,
//! a tick-driven scheduler and the plugin manager that bridges them.

pub mod components;
pub mod config;
pub mod console;
pub mod host;
pub mod plugin_manager;
pub mod world;

pub use config::HostConfig;
pub use host::Host;
pub use plugin_manager::PluginManager;
pub use world::{HostWorld, Terrain, CONSOLE};
