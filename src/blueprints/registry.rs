//! Structure registry loaded from TOML
//!
//! The built-in file ships with the binary; custom files can be loaded at
//! runtime with [`StructureRegistry::load`].

use super::schema::{Shape, StructureDef, StructureFile};
use super::Placement;
use crate::core::error::{AgentError, Result};
use crate::core::types::BlockPos;
use crate::world::blocks;
use ahash::AHashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::error;

const BUILTIN_STRUCTURES: &str = include_str!("../../data/structures.toml");

/// Named structures indexed by name and alias
#[derive(Debug, Default)]
pub struct StructureRegistry {
    structures: Vec<StructureDef>,
    by_name: AHashMap<String, usize>,
}

impl StructureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a structures file
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: StructureFile = toml::from_str(content)?;
        let mut registry = Self::new();
        for def in file.structures {
            registry.register(def)?;
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Add a structure after checking its block names
    pub fn register(&mut self, def: StructureDef) -> Result<()> {
        let names = std::iter::once(&def.material)
            .chain(def.parts.iter().filter_map(|p| p.block.as_ref()));
        for name in names {
            if blocks::resolve(name).is_none() {
                return Err(AgentError::ConfigError(format!(
                    "Structure '{}' uses unknown block '{}'",
                    def.name, name
                )));
            }
        }

        let index = self.structures.len();
        for key in std::iter::once(&def.name).chain(def.aliases.iter()) {
            let key = key.to_lowercase();
            if self.by_name.insert(key.clone(), index).is_some() {
                return Err(AgentError::ConfigError(format!(
                    "Duplicate structure name '{}'",
                    key
                )));
            }
        }
        self.structures.push(def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&StructureDef> {
        let key = name.trim().to_lowercase();
        self.by_name.get(&key).map(|&i| &self.structures[i])
    }

    pub fn names(&self) -> Vec<&str> {
        self.structures.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Expand a structure into relative placements
    ///
    /// `material` replaces the structure's default material when it names a
    /// real block. Later parts overwrite earlier ones cell by cell.
    pub fn expand(&self, name: &str, material: Option<&str>) -> Option<Vec<Placement>> {
        let def = self.get(name)?;
        let material = material
            .and_then(blocks::resolve)
            .or_else(|| blocks::resolve(&def.material))?;

        let mut placements: Vec<Placement> = Vec::new();
        for part in &def.parts {
            let block = part
                .block
                .as_deref()
                .and_then(blocks::resolve)
                .unwrap_or_else(|| material.clone());
            for [x, y, z] in part.cells() {
                let offset = BlockPos::new(x, y, z);
                placements.retain(|p| p.offset != offset);
                if part.shape != Shape::Clear {
                    placements.push(Placement {
                        offset,
                        block: block.clone(),
                    });
                }
            }
        }
        Some(placements)
    }
}

/// Registry built from the structures shipped with the crate
pub fn builtin() -> &'static StructureRegistry {
    static BUILTIN: OnceLock<StructureRegistry> = OnceLock::new();
    BUILTIN.get_or_init(|| {
        StructureRegistry::from_toml_str(BUILTIN_STRUCTURES).unwrap_or_else(|e| {
            error!("Built-in structures failed to load: {}", e);
            StructureRegistry::new()
        })
    })
}
