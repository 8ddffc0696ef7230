//! Block blueprints and the named-structure library
//!
//! A blueprint is a list of block placements relative to a build origin.
//! Planners either spell one out (`blocks`) or name a structure from the
//! registry (`structure`).

pub mod registry;
pub mod schema;

use crate::core::types::BlockPos;
use crate::task::ParamValue;
use crate::world::blocks;
use serde::{Deserialize, Serialize};

pub use registry::{builtin, StructureRegistry};
pub use schema::{PartDef, Shape, StructureDef};

/// One block of a blueprint, relative to the build origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub offset: BlockPos,
    pub block: String,
}

impl Placement {
    /// Read a `{x, y, z, name}` map (`block` is accepted for `name`)
    ///
    /// Returns `None` for entries with missing coordinates or a block name
    /// that does not resolve.
    pub fn from_param(value: &ParamValue) -> Option<Self> {
        let map = value.as_map()?;
        let coord = |key: &str| map.get(key).and_then(ParamValue::as_i32);
        let name = map
            .get("name")
            .or_else(|| map.get("block"))
            .and_then(ParamValue::as_str)?;
        Some(Self {
            offset: BlockPos::new(coord("x")?, coord("y")?, coord("z")?),
            block: blocks::resolve(name)?,
        })
    }
}
