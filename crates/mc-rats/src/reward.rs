//! Reward model: colour assignment, loot rolls and item-theft rules.

use mc_rats_plugin_api::{ItemStack, Material};
use rand::Rng;

use crate::config::Settings;

/// Colour used when custom colours are off or unusable.
pub const DEFAULT_COLOR: &str = "Brown";

/// What a stolen item turns back into when its thief dies.
pub const STOLEN_ITEM_PLACEHOLDER: Material = Material::GoldNugget;

/// Weighted pick from `colors.list`, walking entries in document order.
pub fn pick_color(settings: &Settings, rng: &mut impl Rng) -> String {
    let colors = &settings.colors;
    if !colors.enabled || colors.weights.is_empty() {
        return DEFAULT_COLOR.to_string();
    }

    let total: f64 = colors.weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 || !total.is_finite() {
        return DEFAULT_COLOR.to_string();
    }

    let draw = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (name, weight) in &colors.weights {
        cumulative += weight;
        if cumulative >= draw {
            return name.clone();
        }
    }
    DEFAULT_COLOR.to_string()
}

/// Roll every loot-table row independently.
pub fn roll_loot(settings: &Settings, rng: &mut impl Rng) -> Vec<ItemStack> {
    if !settings.drops.enabled {
        return Vec::new();
    }
    settings
        .drops
        .table
        .iter()
        .filter(|entry| entry.chance > 0.0 && rng.gen::<f64>() <= entry.chance)
        .map(|entry| ItemStack::new(entry.material, entry.amount))
        .collect()
}

/// Whether a rat carrying `carried` items may take another one.
pub fn can_steal(settings: &Settings, carried: u32) -> bool {
    settings.rat.steal_items && carried < settings.rat.max_items
}

/// One placeholder item per stolen item.
pub fn stolen_item_drops(carried: u32) -> Vec<ItemStack> {
    (0..carried)
        .map(|_| ItemStack::new(STOLEN_ITEM_PLACEHOLDER, 1))
        .collect()
}
