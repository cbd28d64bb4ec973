//! The contract between the growth engine and the host world.
//!
//! The host owns all grid storage and decides which tiles are resident.
//! The growth engine only ever borrows a tile for the duration of a single
//! call and never keeps a handle across ticks.

use fallow_types::{ActorId, BlockState, CellPos, TilePos, WorldId};

use crate::error::WorldError;

/// Read/write access to one resident tile.
pub trait TileAccess {
    /// Coordinate of this tile.
    fn pos(&self) -> TilePos;

    /// Lowest cell layer of the tile (inclusive).
    fn min_y(&self) -> i32;

    /// Highest cell layer of the tile (exclusive).
    fn max_y(&self) -> i32;

    /// First empty layer above the highest non-empty cell of the column at
    /// absolute `(x, z)`. Returns [`min_y`](Self::min_y) for an empty
    /// column.
    fn surface_y(&self, x: i32, z: i32) -> i32;

    /// Read the cell at `pos`. Cells outside the tile read as air.
    fn read_cell(&self, pos: CellPos) -> BlockState;

    /// Replace the cell at `pos` and notify anything depending on it.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CellOutOfBounds`] if `pos` is not inside this
    /// tile.
    fn write_cell(&mut self, pos: CellPos, state: BlockState) -> Result<(), WorldError>;
}

/// Something that happened in the host since the last poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// A tile was loaded (or generated) and is now resident.
    TileResident {
        /// World the tile belongs to.
        world: WorldId,
        /// The tile that became resident.
        tile: TilePos,
    },
    /// An actor joined a world.
    ActorAdmitted {
        /// World the actor joined.
        world: WorldId,
        /// The actor.
        actor: ActorId,
        /// Where the actor stood when admitted.
        position: CellPos,
    },
}

/// The host simulation as seen by the growth engine.
pub trait WorldHost {
    /// Worlds currently known to the host.
    fn world_ids(&self) -> Vec<WorldId>;

    /// Whether the tile is resident in memory right now.
    fn is_resident(&self, world: WorldId, tile: TilePos) -> bool;

    /// Borrow a resident tile. Returns `None` for non-resident tiles; the
    /// host must never load a tile to satisfy this call.
    fn resident_tile(&mut self, world: WorldId, tile: TilePos) -> Option<&mut dyn TileAccess>;

    /// Actors currently in the world with their positions.
    fn actors(&self, world: WorldId) -> Vec<(ActorId, CellPos)>;

    /// Drain lifecycle events raised since the previous poll, oldest first.
    fn poll_events(&mut self) -> Vec<HostEvent>;

    /// Propagate cell writes made since the previous flush and return how
    /// many there were. Hosts that push writes out immediately keep the
    /// default.
    fn flush_updates(&mut self) -> usize {
        0
    }
}
