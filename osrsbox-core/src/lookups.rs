//! Fixed lookup tables shared by the field cleaners.
//!
//! Everything here is read-only and initialised once per process.

use crate::models::DropRequirement;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Weight-reducing equipment: item id -> equipped weight in kg.
    pub static ref WEIGHT_OVERRIDES: HashMap<i64, f64> = HashMap::from([
        (88, -4.5),    // Boots of lightness
        (89, -4.5),    // Boots of lightness (inventory)
        (10069, -2.2), // Spotted cape
        (10070, -2.2),
        (10071, -4.5), // Spottier cape
        (10072, -4.5),
        (10553, -5.0), // Penance gloves
        (11850, -3.0), // Graceful hood
        (11852, -4.0), // Graceful cape
        (11854, -5.0), // Graceful top
        (11856, -6.0), // Graceful legs
        (11858, -3.0), // Graceful gloves
        (11860, -4.0), // Graceful boots
    ]);

    /// Items the wiki marks as quest items that are not.
    pub static ref QUEST_ITEM_OVERRIDES: HashMap<i64, bool> = HashMap::from([
        (2528, false), // Lamp
        (4155, false), // Enchanted gem
    ]);

    /// Named rarity tiers and the fraction each stands for.
    pub static ref RARITY_KEYWORDS: HashMap<&'static str, &'static str> = HashMap::from([
        ("always", "1/1"),
        ("common", "1/8"),
        ("uncommon", "1/32"),
        ("rare", "1/128"),
        ("veryrare", "1/512"),
    ]);
}

/// Quest name accepted as a plain-text quest flag.
pub const SINGULAR_QUEST_NAME: &str = "tears of guthix";

/// Monster attribute vocabulary, in output order.
pub const ATTRIBUTES: &[&str] = &[
    "demon", "dragon", "fiery", "kalphite", "leafy", "penance", "shade", "undead", "vampyre",
    "xerician",
];

/// Drop restriction markers, tested in order; the first hit wins.
pub const DROP_REQUIREMENT_MARKERS: &[(&str, DropRequirement)] = &[
    ("wilderness only", DropRequirement::WildernessOnly),
    ("in the wilderness", DropRequirement::WildernessOnly),
    ("konar", DropRequirement::KonarTaskOnly),
    ("catacombs", DropRequirement::CatacombsOnly),
    ("wilderness slayer", DropRequirement::WildernessSlayer),
    ("treasure trail", DropRequirement::TreasureTrailsOnly),
    ("clue scroll", DropRequirement::TreasureTrailsOnly),
    ("iorwerth", DropRequirement::IorwerthDungeonOnly),
    ("forthos", DropRequirement::ForthosDungeonOnly),
    ("revenant", DropRequirement::RevenantsOnly),
];

/// Item families sharing one canonical examine text, matched on lower-case name.
pub const EXAMINE_OVERRIDES: &[(&str, &str)] = &[
    ("clue scroll", "A clue!"),
    ("clue bottle", "A clue!"),
    ("clue nest", "A clue!"),
];

/// Plural category names and their singular form.
pub const CATEGORY_SINGULARS: &[(&str, &str)] = &[
    ("abyssal demons", "abyssal demon"),
    ("bloodvelds", "bloodveld"),
    ("black demons", "black demon"),
    ("dagannoths", "dagannoth"),
    ("demons", "demon"),
    ("dragons", "dragon"),
    ("gargoyles", "gargoyle"),
    ("goblins", "goblin"),
    ("hellhounds", "hellhound"),
    ("kalphites", "kalphite"),
    ("nechryaels", "nechryael"),
    ("spiders", "spider"),
    ("trolls", "troll"),
    ("wolves", "wolf"),
];

pub const WIKI_URL_PREFIX: &str = "https://oldschool.runescape.wiki/w/";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boots_of_lightness_override() {
        assert_eq!(WEIGHT_OVERRIDES.get(&89), Some(&-4.5));
    }

    #[test]
    fn test_rarity_keywords_cover_all_tiers() {
        for keyword in ["always", "common", "uncommon", "rare", "veryrare"] {
            assert!(RARITY_KEYWORDS.contains_key(keyword), "{keyword}");
        }
    }
}
