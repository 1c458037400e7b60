//! Closed name sets the host understands: materials, biomes, entity kinds, sounds.
//!
//! Names parse case-insensitively and accept an optional `minecraft:` prefix,
//! so `STONE`, `stone` and `minecraft:stone` all resolve to [`Material::Stone`].

use thiserror::Error;

/// A name that is not part of a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {name}")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

fn normalize(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    match lower.strip_prefix("minecraft:") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $id:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every member, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Lowercase identifier without namespace.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $id),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let key = normalize(s);
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == key)
                    .ok_or_else(|| UnknownName {
                        kind: $label,
                        name: s.to_string(),
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

vocabulary! {
    /// Blocks and items.
    Material, "material" {
        Air => "air",
        CaveAir => "cave_air",
        Stone => "stone",
        Cobblestone => "cobblestone",
        Deepslate => "deepslate",
        Dirt => "dirt",
        GrassBlock => "grass_block",
        Gravel => "gravel",
        Sand => "sand",
        Sandstone => "sandstone",
        Bedrock => "bedrock",
        CoalOre => "coal_ore",
        IronOre => "iron_ore",
        OakLog => "oak_log",
        OakPlanks => "oak_planks",
        OakLeaves => "oak_leaves",
        HayBlock => "hay_block",
        Chest => "chest",
        Barrel => "barrel",
        Composter => "composter",
        Glass => "glass",
        Cobweb => "cobweb",
        Torch => "torch",
        ShortGrass => "short_grass",
        Wheat => "wheat",
        Snow => "snow",
        Water => "water",
        Lava => "lava",
        GoldNugget => "gold_nugget",
        IronNugget => "iron_nugget",
        Bone => "bone",
        String => "string",
        Leather => "leather",
        RottenFlesh => "rotten_flesh",
        Bread => "bread",
        WheatSeeds => "wheat_seeds",
        Emerald => "emerald",
        GoldIngot => "gold_ingot",
    }
}

impl Material {
    /// Whether this material can be placed as a block.
    pub fn is_block(self) -> bool {
        !matches!(
            self,
            Material::GoldNugget
                | Material::IronNugget
                | Material::Bone
                | Material::String
                | Material::Leather
                | Material::RottenFlesh
                | Material::Bread
                | Material::WheatSeeds
                | Material::Emerald
                | Material::GoldIngot
        )
    }

    /// Whether the block has a full collision box (entities stand on it).
    pub fn is_solid(self) -> bool {
        self.is_block()
            && !matches!(
                self,
                Material::Air
                    | Material::CaveAir
                    | Material::Cobweb
                    | Material::Torch
                    | Material::ShortGrass
                    | Material::Wheat
                    | Material::Snow
                    | Material::Water
                    | Material::Lava
            )
    }
}

vocabulary! {
    Biome, "biome" {
        Plains => "plains",
        Forest => "forest",
        BirchForest => "birch_forest",
        DarkForest => "dark_forest",
        Taiga => "taiga",
        SnowyPlains => "snowy_plains",
        Desert => "desert",
        Savanna => "savanna",
        Jungle => "jungle",
        Swamp => "swamp",
        River => "river",
        Beach => "beach",
        Ocean => "ocean",
        DeepOcean => "deep_ocean",
        MushroomFields => "mushroom_fields",
        Badlands => "badlands",
        DripstoneCaves => "dripstone_caves",
        LushCaves => "lush_caves",
        DeepDark => "deep_dark",
        NetherWastes => "nether_wastes",
        TheEnd => "the_end",
    }
}

vocabulary! {
    /// Entity types, including players and dropped items.
    EntityKind, "entity type" {
        Player => "player",
        Item => "item",
        Silverfish => "silverfish",
        Cat => "cat",
        Ocelot => "ocelot",
        Wolf => "wolf",
        Fox => "fox",
        Zombie => "zombie",
        Skeleton => "skeleton",
        Creeper => "creeper",
        Spider => "spider",
        Cow => "cow",
        Pig => "pig",
        Sheep => "sheep",
        Chicken => "chicken",
        Villager => "villager",
        IronGolem => "iron_golem",
    }
}

impl EntityKind {
    pub fn is_player(self) -> bool {
        self == EntityKind::Player
    }
}

vocabulary! {
    Sound, "sound" {
        EntityBatAmbient => "entity_bat_ambient",
        EntitySilverfishAmbient => "entity_silverfish_ambient",
        EntitySilverfishHurt => "entity_silverfish_hurt",
        EntityRabbitAmbient => "entity_rabbit_ambient",
        EntityParrotAmbient => "entity_parrot_ambient",
        BlockGrassStep => "block_grass_step",
    }
}
