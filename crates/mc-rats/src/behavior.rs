//! Rat behaviour: a priority-ordered rule chain run once per opportunity.
//!
//! The ambient sound is rolled first and never consumes the action slot. After
//! it, the first rule that fires ends the invocation:
//! flee > forage > return-to-nest > wander.

use mc_rats_plugin_api::{EntityKind, PluginEntity, ServerApi, Sound, Vec3};
use rand::Rng;
use tracing::{debug, info};

use crate::config::Settings;
use crate::population::{carried_from_tags, Population, ITEMS_TAG};
use crate::reward;

/// Half-extent of the box scanned for feared entities.
pub const FLEE_RADIUS: f64 = 8.0;
pub const FLEE_SPEED: f64 = 0.5;
/// Half-extent of the box scanned for loose items.
pub const FORAGE_RADIUS: f64 = 2.0;
pub const THEFT_CHANCE: f64 = 0.1;
/// One in this many invocations considers heading home.
pub const NEST_RETURN_ODDS: u32 = 200;
pub const NEST_SPEED: f64 = 0.3;
/// One in this many invocations wanders.
pub const WANDER_ODDS: u32 = 20;
/// Per-axis bound of a wander step.
pub const WANDER_SPEED: f64 = 0.1;

const AMBIENT_VOLUME: f32 = 0.5;
const AMBIENT_PITCH: f32 = 1.2;
const THEFT_SOUND: Sound = Sound::EntitySilverfishAmbient;
const THEFT_VOLUME: f32 = 0.5;
const THEFT_PITCH: f32 = 1.0;

/// The movement or state rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fled,
    Stole,
    ReturnedToNest,
    Wandered,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BehaviorOutcome {
    pub action: Action,
    /// Whether the ambient sound played this invocation.
    pub chirped: bool,
}

/// Whether a rat may pick `target` as its attack target.
pub fn may_target(settings: &Settings, target: &PluginEntity) -> bool {
    if target.is_player() {
        settings.rat.attack_players
    } else {
        settings.rat.attack_mobs
    }
}

/// Run the rule chain for one rat.
pub fn tick(
    rat: &PluginEntity,
    settings: &Settings,
    population: &mut Population,
    api: &mut dyn ServerApi,
    rng: &mut impl Rng,
) -> BehaviorOutcome {
    let chirped = ambient_sound(rat, settings, api, rng);

    let action = if flee(rat, settings, api) {
        Action::Fled
    } else if forage(rat, settings, population, api, rng) {
        Action::Stole
    } else if return_to_nest(rat, settings, population, api, rng) {
        Action::ReturnedToNest
    } else if wander(rat, api, rng) {
        Action::Wandered
    } else {
        Action::Idle
    };

    BehaviorOutcome { action, chirped }
}

// ---------------------------------------------------------------------------
// Ambient sound, 1 in `sound-interval`
// ---------------------------------------------------------------------------

fn ambient_sound(
    rat: &PluginEntity,
    settings: &Settings,
    api: &mut dyn ServerApi,
    rng: &mut impl Rng,
) -> bool {
    if rng.gen_range(0..settings.rat.sound_interval.max(1)) != 0 {
        return false;
    }
    api.play_sound(&rat.location, settings.rat.sound, AMBIENT_VOLUME, AMBIENT_PITCH);
    true
}

// ---------------------------------------------------------------------------
// Flee: run directly away from the nearest feared entity
// ---------------------------------------------------------------------------

fn flee(rat: &PluginEntity, settings: &Settings, api: &mut dyn ServerApi) -> bool {
    let feared: &[EntityKind] = &settings.rat.scared_of;
    if feared.is_empty() {
        return false;
    }

    let threat = api
        .nearby_entities(rat.id, FLEE_RADIUS, FLEE_RADIUS, FLEE_RADIUS)
        .into_iter()
        .filter(|e| feared.contains(&e.kind))
        .min_by(|a, b| {
            let da = rat.location.distance(&a.location);
            let db = rat.location.distance(&b.location);
            da.total_cmp(&db)
        });
    let Some(threat) = threat else {
        return false;
    };

    let away = rat.location.delta_from(&threat.location).normalize();
    // Standing on the threat gives no direction; bolt along +x.
    let away = if away == Vec3::ZERO {
        Vec3::new(1.0, 0.0, 0.0)
    } else {
        away
    };
    api.set_velocity(rat.id, away.scale(FLEE_SPEED));
    debug!("Rat {} flees from {} {}", rat.id, threat.kind, threat.id);
    true
}

// ---------------------------------------------------------------------------
// Forage: take one item from a nearby dropped stack
// ---------------------------------------------------------------------------

fn forage(
    rat: &PluginEntity,
    settings: &Settings,
    population: &mut Population,
    api: &mut dyn ServerApi,
    rng: &mut impl Rng,
) -> bool {
    if !settings.rat.steal_items || rng.gen::<f64>() >= THEFT_CHANCE {
        return false;
    }
    let carried = population
        .record(rat.id)
        .map(|r| r.carried)
        .unwrap_or_else(|| carried_from_tags(rat));
    if !reward::can_steal(settings, carried) {
        return false;
    }

    let loose: Vec<PluginEntity> = api
        .nearby_entities(rat.id, FORAGE_RADIUS, FORAGE_RADIUS, FORAGE_RADIUS)
        .into_iter()
        .filter(|e| e.kind == EntityKind::Item && e.item.is_some_and(|s| s.amount > 0))
        .collect();
    if loose.is_empty() {
        return false;
    }
    let target = &loose[rng.gen_range(0..loose.len())];
    let Some(stack) = target.item else {
        return false;
    };

    api.set_item_amount(target.id, stack.amount - 1);
    let carried = carried + 1;
    if let Some(record) = population.record_mut(rat.id) {
        record.carried = carried;
    }
    api.set_tag(rat.id, ITEMS_TAG, &carried.to_string());
    api.play_sound(&rat.location, THEFT_SOUND, THEFT_VOLUME, THEFT_PITCH);

    if settings.debug {
        info!("Rat {} stole one {} ({carried} carried)", rat.id, stack.material);
    }
    true
}

// ---------------------------------------------------------------------------
// Return to nest: head home while still within wander distance
// ---------------------------------------------------------------------------

fn return_to_nest(
    rat: &PluginEntity,
    settings: &Settings,
    population: &Population,
    api: &mut dyn ServerApi,
    rng: &mut impl Rng,
) -> bool {
    let nests = &settings.nests;
    if !nests.enabled || rng.gen_range(0..NEST_RETURN_ODDS) != 0 {
        return false;
    }
    let Some(nest) = population.nest_of(rat.id) else {
        return false;
    };
    if rat.location.distance(nest) >= nests.wander_distance {
        return false;
    }

    let home = nest.delta_from(&rat.location).normalize().scale(NEST_SPEED);
    api.set_velocity(rat.id, home);
    true
}

// ---------------------------------------------------------------------------
// Wander: a small random horizontal nudge
// ---------------------------------------------------------------------------

fn wander(rat: &PluginEntity, api: &mut dyn ServerApi, rng: &mut impl Rng) -> bool {
    if rng.gen_range(0..WANDER_ODDS) != 0 {
        return false;
    }
    let step = Vec3::new(
        rng.gen_range(-WANDER_SPEED..=WANDER_SPEED),
        0.0,
        rng.gen_range(-WANDER_SPEED..=WANDER_SPEED),
    );
    api.set_velocity(rat.id, step);
    true
}
