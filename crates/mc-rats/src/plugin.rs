//! `RatsPlugin`: routes host events, timers and commands into the core.

use std::sync::Arc;

use mc_rats_plugin_api::{
    EventResult, Plugin, PluginEntity, PluginEvent, PluginInfo, ServerApi,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::behavior::{self, BehaviorOutcome};
use crate::command::{self, RatsCommand};
use crate::config::{self, Settings};
use crate::population::{self, carried_from_tags, is_tagged_rat, Population};
use crate::reward;
use crate::scheduler::{Scheduler, PULSE_TASK, SWEEP_TASK};
use crate::PLUGIN_NAME;

pub struct RatsPlugin {
    settings: Arc<Settings>,
    population: Population,
    scheduler: Scheduler,
    rng: StdRng,
}

impl Default for RatsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl RatsPlugin {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic randomness, for tests and reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            settings: Arc::new(Settings::default()),
            population: Population::new(),
            scheduler: Scheduler::new(),
            rng,
        }
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Re-read the config from the host, swap the snapshot and resync timers.
    /// A missing or unreadable document keeps the current snapshot.
    pub fn reload(&mut self, api: &mut dyn ServerApi) {
        match api.read_plugin_config(PLUGIN_NAME) {
            Some(value) => match Settings::load(value) {
                Ok(settings) => self.settings = Arc::new(settings),
                Err(e) => warn!("Keeping previous rat settings: {e}"),
            },
            None => warn!("No config for {PLUGIN_NAME} found, keeping previous settings"),
        }
        let settings = Arc::clone(&self.settings);
        self.scheduler.sync(&settings, api);
        info!(
            "Rat settings reloaded (natural spawning {})",
            if settings.spawning.natural { "on" } else { "off" }
        );
    }

    /// Track rats the host already has, up to the cap.
    fn adopt_existing(&mut self, api: &mut dyn ServerApi) -> usize {
        let settings = Arc::clone(&self.settings);
        api.entities_with_tag(population::SPECIES_TAG)
            .iter()
            .filter(|e| self.population.adopt(e, &settings))
            .count()
    }

    fn run_behavior(&mut self, rat: &PluginEntity, api: &mut dyn ServerApi) -> BehaviorOutcome {
        let settings = Arc::clone(&self.settings);
        behavior::tick(rat, &settings, &mut self.population, api, &mut self.rng)
    }

    /// Behaviour pulse: every tracked rat gets one invocation. Ids the host no
    /// longer knows are pruned.
    fn pulse(&mut self, api: &mut dyn ServerApi) {
        for id in self.population.ids() {
            match api.entity(id) {
                Some(rat) => {
                    self.run_behavior(&rat, api);
                }
                None => {
                    self.population.forget(id);
                    debug!("Pruned vanished rat {id}");
                }
            }
        }
    }

    fn on_rat_death(&mut self, rat: &PluginEntity, api: &mut dyn ServerApi) {
        let settings = Arc::clone(&self.settings);
        let carried = self
            .population
            .forget(rat.id)
            .map(|r| r.carried)
            .unwrap_or_else(|| carried_from_tags(rat));

        api.set_event_drops(reward::roll_loot(&settings, &mut self.rng));
        if settings.drops.enabled {
            for stack in reward::stolen_item_drops(carried) {
                api.drop_item(&rat.location, stack);
            }
        }

        if settings.debug {
            info!("Rat {} died carrying {carried} items", rat.id);
        }
    }

    fn shutdown(&mut self, api: &mut dyn ServerApi) {
        self.scheduler.stop_all(api);
        let removed = self.population.remove_all(api);
        info!("Removed {removed} rats");
    }

    fn execute(&mut self, cmd: RatsCommand, sender: &str, api: &mut dyn ServerApi) -> String {
        let settings = Arc::clone(&self.settings);
        let messages = &settings.messages;

        if let Some(node) = cmd.permission() {
            if !api.has_permission(sender, node) {
                return command::render(messages, &messages.no_permission, None);
            }
        }

        match cmd {
            RatsCommand::Help => command::help(),
            RatsCommand::Spawn(amount) => {
                let Some(player) = api.get_player(sender) else {
                    return command::render(messages, &messages.player_only, None);
                };
                let Some(amount) = amount else {
                    return command::render(messages, &messages.invalid_amount, None);
                };
                let spawned = self.population.spawn_burst(
                    &player.location,
                    amount,
                    &settings,
                    api,
                    &mut self.rng,
                );
                info!("{sender} spawned {spawned} rats");
                command::render(messages, &messages.spawn, Some(spawned))
            }
            RatsCommand::Kill => {
                let removed = self.population.remove_all(api);
                info!("{sender} removed {removed} rats");
                command::render(messages, &messages.kill, Some(removed))
            }
            RatsCommand::Reload => {
                self.reload(api);
                let settings = Arc::clone(&self.settings);
                command::render(&settings.messages, &settings.messages.reload, None)
            }
        }
    }
}

impl Plugin for RatsPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: PLUGIN_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: "Adds rats that scurry, steal and nest".into(),
            author: "MinecraftRats".into(),
        }
    }

    fn on_enable(&mut self, api: &mut dyn ServerApi) {
        api.register_command(command::COMMAND_NAME, command::COMMAND_DESCRIPTION, PLUGIN_NAME);
        let adopted = self.adopt_existing(api);
        let settings = Arc::clone(&self.settings);
        self.scheduler.sync(&settings, api);
        info!(
            "{PLUGIN_NAME} enabled: {} worlds, cap {}, {adopted} rats adopted",
            settings.spawning.enabled_worlds.len(),
            settings.spawning.max_rats
        );
    }

    fn on_disable(&mut self, api: &mut dyn ServerApi) {
        self.shutdown(api);
        info!("{PLUGIN_NAME} disabled");
    }

    fn on_event(&mut self, event: &PluginEvent, api: &mut dyn ServerApi) -> EventResult {
        let settings = Arc::clone(&self.settings);

        if !settings.enabled {
            // Keep bookkeeping honest even while switched off.
            if let PluginEvent::EntityDeath { entity, .. } = event {
                self.population.forget(entity.id);
            }
            return EventResult::Continue;
        }

        match event {
            PluginEvent::BlockBreak {
                location, material, ..
            } => {
                self.population.triggered_spawn(
                    location,
                    *material,
                    &settings,
                    api,
                    &mut self.rng,
                );
            }
            PluginEvent::EntitySpawn { entity } if is_tagged_rat(entity) => {
                if self.population.contains(entity.id) || self.population.adopt(entity, &settings)
                {
                    self.run_behavior(entity, api);
                }
            }
            PluginEvent::EntityTarget { entity, target } if is_tagged_rat(entity) => {
                if !behavior::may_target(&settings, target) {
                    return EventResult::Cancelled;
                }
                self.run_behavior(entity, api);
            }
            PluginEvent::EntityDamageByEntity {
                damager, victim, ..
            } => {
                if is_tagged_rat(damager) {
                    api.set_event_damage(settings.rat.damage);
                    if !behavior::may_target(&settings, victim) {
                        return EventResult::Cancelled;
                    }
                }
                if is_tagged_rat(victim) {
                    self.run_behavior(victim, api);
                }
            }
            PluginEvent::EntityDeath { entity, .. } if is_tagged_rat(entity) => {
                self.on_rat_death(entity, api);
            }
            PluginEvent::ServerStarted => {
                let adopted = self.adopt_existing(api);
                debug!("Adopted {adopted} rats on startup");
            }
            PluginEvent::ServerStopping => self.shutdown(api),
            _ => {}
        }
        EventResult::Continue
    }

    fn on_task(&mut self, task_id: u32, api: &mut dyn ServerApi) {
        let settings = Arc::clone(&self.settings);
        if !settings.enabled {
            return;
        }
        match task_id {
            SWEEP_TASK => {
                let spawned = self
                    .population
                    .ambient_sweep(&settings, api, &mut self.rng);
                if spawned > 0 {
                    debug!(
                        "Ambient sweep spawned {spawned} rats ({} tracked)",
                        self.population.len()
                    );
                }
            }
            PULSE_TASK => self.pulse(api),
            other => debug!("Ignoring unknown task {other}"),
        }
    }

    fn on_command(
        &mut self,
        command: &str,
        args: &[String],
        sender: &str,
        api: &mut dyn ServerApi,
    ) -> Option<String> {
        if command != command::COMMAND_NAME {
            return None;
        }
        Some(self.execute(RatsCommand::parse(args), sender, api))
    }

    fn on_tab_complete(&self, command: &str, args: &[String]) -> Vec<String> {
        if command != command::COMMAND_NAME {
            return Vec::new();
        }
        command::complete(args)
    }

    fn default_config(&self) -> Option<serde_json::Value> {
        Some(config::default_document())
    }

    fn load_config(&mut self, config: serde_json::Value) {
        match Settings::load(config) {
            Ok(settings) => self.settings = Arc::new(settings),
            Err(e) => warn!("Using default rat settings: {e}"),
        }
    }
}
