//! Structure schema types for TOML deserialization.

use serde::{Deserialize, Serialize};

/// Root of a structures file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructureFile {
    #[serde(default, rename = "structure")]
    pub structures: Vec<StructureDef>,
}

/// One named structure
#[derive(Debug, Clone, Deserialize)]
pub struct StructureDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Block used by parts that do not name one
    pub material: String,
    pub parts: Vec<PartDef>,
}

/// How a part's box is turned into cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Every cell of the box
    Fill,
    /// Outer ring of each horizontal layer
    Walls,
    /// Remove earlier placements inside the box
    Clear,
}

/// A box of cells, inclusive on both corners
#[derive(Debug, Clone, Deserialize)]
pub struct PartDef {
    pub shape: Shape,
    pub from: [i32; 3],
    pub to: [i32; 3],
    #[serde(default)]
    pub block: Option<String>,
}

impl PartDef {
    /// Cells covered by this part, in x, y, z order
    pub fn cells(&self) -> Vec<[i32; 3]> {
        let lo = [
            self.from[0].min(self.to[0]),
            self.from[1].min(self.to[1]),
            self.from[2].min(self.to[2]),
        ];
        let hi = [
            self.from[0].max(self.to[0]),
            self.from[1].max(self.to[1]),
            self.from[2].max(self.to[2]),
        ];
        let mut cells = Vec::new();
        for y in lo[1]..=hi[1] {
            for x in lo[0]..=hi[0] {
                for z in lo[2]..=hi[2] {
                    let on_ring = x == lo[0] || x == hi[0] || z == lo[2] || z == hi[2];
                    if self.shape != Shape::Walls || on_ring {
                        cells.push([x, y, z]);
                    }
                }
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(shape: Shape, from: [i32; 3], to: [i32; 3]) -> PartDef {
        PartDef {
            shape,
            from,
            to,
            block: None,
        }
    }

    #[test]
    fn test_fill_counts_every_cell() {
        assert_eq!(part(Shape::Fill, [0, 0, 0], [2, 1, 2]).cells().len(), 18);
    }

    #[test]
    fn test_walls_are_hollow() {
        let cells = part(Shape::Walls, [0, 0, 0], [2, 0, 2]).cells();
        assert_eq!(cells.len(), 8);
        assert!(!cells.contains(&[1, 0, 1]));
    }

    #[test]
    fn test_corners_in_any_order() {
        let a = part(Shape::Fill, [3, 0, 3], [0, 0, 0]).cells();
        let b = part(Shape::Fill, [0, 0, 0], [3, 0, 3]).cells();
        assert_eq!(a, b);
    }
}
