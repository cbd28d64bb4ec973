//! Error types for the `fallow-world` crate.
//!
//! All fallible grid operations in this crate return [`WorldError`].

use fallow_types::{CellPos, TilePos, WorldId};

/// Errors that can occur during grid operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The world is not known to the host.
    #[error("world not found: {0}")]
    WorldNotFound(WorldId),

    /// The tile is not currently resident in memory.
    #[error("tile {tile} of world {world} is not resident")]
    TileNotResident {
        /// The world that was queried.
        world: WorldId,
        /// The tile that was requested.
        tile: TilePos,
    },

    /// A cell coordinate lies outside the tile it was addressed through.
    #[error("cell ({}, {}, {}) is outside tile {tile}", pos.x, pos.y, pos.z)]
    CellOutOfBounds {
        /// The offending cell.
        pos: CellPos,
        /// The tile that rejected it.
        tile: TilePos,
    },

    /// The vertical extent of a tile is empty or too large.
    #[error("invalid tile height range {min_y}..{max_y}")]
    InvalidHeight {
        /// Lowest cell layer (inclusive).
        min_y: i32,
        /// Highest cell layer (exclusive).
        max_y: i32,
    },

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in grid calculation")]
    ArithmeticOverflow,
}
