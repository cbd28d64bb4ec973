//! Tile and cell coordinates.
//!
//! A tile is the fixed-size square column of cells that the host loads and
//! unloads as one unit (a "chunk"). Cell coordinates are absolute world
//! coordinates; tile coordinates index tiles on the horizontal plane.

use serde::{Deserialize, Serialize};

/// Edge length of a tile in cells along both horizontal axes.
pub const TILE_SIZE: i32 = 16;

/// Coordinate of a tile on the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TilePos {
    /// Tile index along the X axis.
    pub x: i32,
    /// Tile index along the Z axis.
    pub z: i32,
}

impl TilePos {
    /// Create a tile coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Return the tile that contains the given absolute cell column.
    pub const fn containing(cell_x: i32, cell_z: i32) -> Self {
        Self {
            x: cell_x.div_euclid(TILE_SIZE),
            z: cell_z.div_euclid(TILE_SIZE),
        }
    }

    /// Smallest absolute X cell coordinate inside this tile.
    pub const fn min_cell_x(self) -> i32 {
        self.x.saturating_mul(TILE_SIZE)
    }

    /// Smallest absolute Z cell coordinate inside this tile.
    pub const fn min_cell_z(self) -> i32 {
        self.z.saturating_mul(TILE_SIZE)
    }

    /// Return the tile displaced by `(dx, dz)` tiles, saturating at the
    /// edges of the coordinate space.
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            z: self.z.saturating_add(dz),
        }
    }
}

impl core::fmt::Display for TilePos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Absolute coordinate of a single cell in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellPos {
    /// Absolute X coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// Absolute Z coordinate.
    pub z: i32,
}

impl CellPos {
    /// Create a cell coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Return the tile containing this cell.
    pub const fn tile(self) -> TilePos {
        TilePos::containing(self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors_negative_coordinates() {
        assert_eq!(TilePos::containing(0, 0), TilePos::new(0, 0));
        assert_eq!(TilePos::containing(15, 15), TilePos::new(0, 0));
        assert_eq!(TilePos::containing(16, -1), TilePos::new(1, -1));
        assert_eq!(TilePos::containing(-16, -17), TilePos::new(-1, -2));
    }

    #[test]
    fn min_cell_coordinates() {
        let tile = TilePos::new(-2, 3);
        assert_eq!(tile.min_cell_x(), -32);
        assert_eq!(tile.min_cell_z(), 48);
    }

    #[test]
    fn cell_reports_its_tile() {
        assert_eq!(CellPos::new(17, 64, -3).tile(), TilePos::new(1, -1));
    }
}
