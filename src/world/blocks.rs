//! Block vocabulary: name normalization, aliases, ore families and drops

pub const AIR: &str = "air";

/// Block names the world understands
pub const KNOWN_BLOCKS: &[&str] = &[
    "air",
    "stone",
    "cobblestone",
    "deepslate",
    "dirt",
    "grass_block",
    "sand",
    "gravel",
    "bedrock",
    "water",
    "lava",
    "short_grass",
    "tall_grass",
    "snow",
    "oak_log",
    "birch_log",
    "spruce_log",
    "oak_planks",
    "birch_planks",
    "spruce_planks",
    "oak_leaves",
    "glass",
    "glass_pane",
    "oak_door",
    "oak_stairs",
    "cobblestone_stairs",
    "cobblestone_slab",
    "stone_bricks",
    "bricks",
    "torch",
    "crafting_table",
    "furnace",
    "chest",
    "coal_ore",
    "iron_ore",
    "gold_ore",
    "copper_ore",
    "diamond_ore",
    "redstone_ore",
    "lapis_ore",
    "emerald_ore",
    "deepslate_coal_ore",
    "deepslate_iron_ore",
    "deepslate_gold_ore",
    "deepslate_copper_ore",
    "deepslate_diamond_ore",
    "deepslate_redstone_ore",
    "deepslate_lapis_ore",
    "deepslate_emerald_ore",
];

const RESOURCE_ALIASES: &[(&str, &str)] = &[
    ("iron", "iron_ore"),
    ("diamond", "diamond_ore"),
    ("diamonds", "diamond_ore"),
    ("coal", "coal_ore"),
    ("gold", "gold_ore"),
    ("copper", "copper_ore"),
    ("redstone", "redstone_ore"),
    ("lapis", "lapis_ore"),
    ("emerald", "emerald_ore"),
    ("log", "oak_log"),
    ("logs", "oak_log"),
    ("wood", "oak_log"),
    ("tree", "oak_log"),
    ("trees", "oak_log"),
    ("plank", "oak_planks"),
    ("planks", "oak_planks"),
    ("grass", "grass_block"),
    ("rock", "stone"),
];

const DEEP_ORES: &[&str] = &[
    "diamond_ore",
    "redstone_ore",
    "lapis_ore",
    "gold_ore",
    "iron_ore",
    "copper_ore",
];

/// Lowercase, underscore spaces, strip the `minecraft:` namespace
pub fn normalize(name: &str) -> String {
    let name = name.trim().to_lowercase().replace(' ', "_");
    match name.strip_prefix("minecraft:") {
        Some(rest) => rest.to_string(),
        None => name,
    }
}

pub fn is_known(name: &str) -> bool {
    KNOWN_BLOCKS.contains(&name)
}

/// Resolve a free-form block or resource name to a known block
///
/// Returns `None` for names that do not resolve to a real, non-air block.
pub fn resolve(name: &str) -> Option<String> {
    let name = normalize(name);
    if name.is_empty() || name == AIR {
        return None;
    }
    if let Some((_, block)) = RESOURCE_ALIASES.iter().find(|(alias, _)| *alias == name) {
        return Some((*block).to_string());
    }
    if is_known(&name) {
        return Some(name);
    }
    // "birch_wood" -> "birch_log"
    if let Some(stem) = name.strip_suffix("wood") {
        let log = format!("{}log", stem);
        if is_known(&log) {
            return Some(log);
        }
    }
    None
}

/// Strip a deepslate prefix so both ore variants compare equal
fn ore_family(name: &str) -> &str {
    match name.strip_prefix("deepslate_") {
        Some(rest) if rest.ends_with("_ore") => rest,
        _ => name,
    }
}

pub fn is_same_ore(a: &str, b: &str) -> bool {
    a == b || ore_family(a) == ore_family(b)
}

pub fn is_deep_ore(name: &str) -> bool {
    DEEP_ORES.contains(&ore_family(name))
}

pub fn is_log(name: &str) -> bool {
    name.ends_with("_log")
}

/// Item handed over after mining a block
pub fn drop_for(name: &str) -> String {
    let drop = match ore_family(name) {
        "diamond_ore" => "diamond",
        "iron_ore" => "raw_iron",
        "gold_ore" => "raw_gold",
        "copper_ore" => "raw_copper",
        "coal_ore" => "coal",
        "emerald_ore" => "emerald",
        "lapis_ore" => "lapis_lazuli",
        "redstone_ore" => "redstone",
        "stone" => "cobblestone",
        "grass_block" => "dirt",
        other => other,
    };
    drop.to_string()
}

/// Blocks an entity can stand on or collide with
pub fn is_solid(name: &str) -> bool {
    !matches!(
        name,
        "air" | "water" | "lava" | "short_grass" | "tall_grass" | "snow" | "torch"
    )
}

/// Blocks a placement may overwrite
pub fn is_replaceable(name: &str) -> bool {
    matches!(
        name,
        "air" | "water" | "lava" | "short_grass" | "tall_grass" | "snow"
    )
}

pub fn is_unbreakable(name: &str) -> bool {
    matches!(name, "bedrock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_namespace() {
        assert_eq!(normalize("minecraft:Oak Planks"), "oak_planks");
        assert_eq!(normalize("  STONE "), "stone");
    }

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(resolve("iron").as_deref(), Some("iron_ore"));
        assert_eq!(resolve("wood").as_deref(), Some("oak_log"));
        assert_eq!(resolve("minecraft:cobblestone").as_deref(), Some("cobblestone"));
        assert_eq!(resolve("birch wood").as_deref(), Some("birch_log"));
    }

    #[test]
    fn test_resolve_rejects_unknown_and_air() {
        assert!(resolve("unobtainium").is_none());
        assert!(resolve("air").is_none());
        assert!(resolve("").is_none());
    }

    #[test]
    fn test_deepslate_variants_match() {
        assert!(is_same_ore("iron_ore", "deepslate_iron_ore"));
        assert!(is_same_ore("deepslate_diamond_ore", "diamond_ore"));
        assert!(!is_same_ore("iron_ore", "gold_ore"));
        assert!(!is_same_ore("deepslate", "stone"));
    }

    #[test]
    fn test_deep_ores() {
        assert!(is_deep_ore("diamond_ore"));
        assert!(is_deep_ore("deepslate_iron_ore"));
        assert!(!is_deep_ore("coal_ore"));
        assert!(!is_deep_ore("oak_log"));
    }

    #[test]
    fn test_drops() {
        assert_eq!(drop_for("deepslate_diamond_ore"), "diamond");
        assert_eq!(drop_for("oak_log"), "oak_log");
        assert_eq!(drop_for("stone"), "cobblestone");
    }
}
