//! In-memory tile storage used by [`GridWorld`](crate::grid::GridWorld).
//!
//! A [`Tile`] stores a dense `TILE_SIZE x height x TILE_SIZE` block of
//! [`BlockState`] values, layer by layer. Every write made through the
//! [`TileAccess`] contract is recorded as a pending update so the host can
//! propagate it to dependents.

use fallow_types::{BlockState, CellPos, TILE_SIZE, TilePos};

use crate::error::WorldError;
use crate::host::TileAccess;

/// Maximum number of layers a tile may hold.
pub const MAX_TILE_HEIGHT: u32 = 4096;

/// Number of cells in one horizontal layer.
const LAYER_CELLS: usize = 256;

/// One tile worth of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pos: TilePos,
    min_y: i32,
    height: u32,
    cells: Vec<BlockState>,
    updates: Vec<CellPos>,
}

impl Tile {
    /// Create a tile filled with air spanning `min_y .. min_y + height`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidHeight`] if `height` is zero, exceeds
    /// [`MAX_TILE_HEIGHT`], or would overflow the vertical axis.
    pub fn new(pos: TilePos, min_y: i32, height: u32) -> Result<Self, WorldError> {
        let height_i32 = i32::try_from(height).map_err(|_err| WorldError::ArithmeticOverflow)?;
        let max_y = min_y
            .checked_add(height_i32)
            .ok_or(WorldError::ArithmeticOverflow)?;
        if height == 0 || height > MAX_TILE_HEIGHT {
            return Err(WorldError::InvalidHeight { min_y, max_y });
        }

        let layers = usize::try_from(height).map_err(|_err| WorldError::ArithmeticOverflow)?;
        let len = layers
            .checked_mul(LAYER_CELLS)
            .ok_or(WorldError::ArithmeticOverflow)?;

        Ok(Self {
            pos,
            min_y,
            height,
            cells: vec![BlockState::AIR; len],
            updates: Vec::new(),
        })
    }

    /// Number of layers in the tile.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Set a cell without recording an update. Used while building terrain.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CellOutOfBounds`] if `pos` is not inside this
    /// tile.
    pub fn set_cell(&mut self, pos: CellPos, state: BlockState) -> Result<(), WorldError> {
        let index = self.index_of(pos).ok_or(WorldError::CellOutOfBounds {
            pos,
            tile: self.pos,
        })?;
        let slot = self.cells.get_mut(index).ok_or(WorldError::CellOutOfBounds {
            pos,
            tile: self.pos,
        })?;
        *slot = state;
        Ok(())
    }

    /// Take the list of cells written through [`TileAccess::write_cell`]
    /// since the previous call.
    pub fn take_updates(&mut self) -> Vec<CellPos> {
        std::mem::take(&mut self.updates)
    }

    /// Iterate over every non-air cell with its absolute position.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (CellPos, BlockState)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, state)| !state.kind.is_air())
            .filter_map(|(index, state)| self.pos_of(index).map(|pos| (pos, *state)))
    }

    /// Flat index of `pos`, or `None` if it lies outside the tile.
    fn index_of(&self, pos: CellPos) -> Option<usize> {
        if pos.tile() != self.pos {
            return None;
        }
        let local_y = pos.y.checked_sub(self.min_y)?;
        let local_y = usize::try_from(local_y).ok()?;
        if local_y >= usize::try_from(self.height).ok()? {
            return None;
        }
        let local_x = usize::try_from(pos.x.rem_euclid(TILE_SIZE)).ok()?;
        let local_z = usize::try_from(pos.z.rem_euclid(TILE_SIZE)).ok()?;
        let edge = usize::try_from(TILE_SIZE).ok()?;

        local_y
            .checked_mul(LAYER_CELLS)?
            .checked_add(local_z.checked_mul(edge)?)?
            .checked_add(local_x)
    }

    /// Absolute position of the cell stored at `index`.
    fn pos_of(&self, index: usize) -> Option<CellPos> {
        let edge = usize::try_from(TILE_SIZE).ok()?;
        let local_y = index.checked_div(LAYER_CELLS)?;
        let within = index.checked_rem(LAYER_CELLS)?;
        let local_z = within.checked_div(edge)?;
        let local_x = within.checked_rem(edge)?;

        let y = self.min_y.checked_add(i32::try_from(local_y).ok()?)?;
        let x = self.pos.min_cell_x().checked_add(i32::try_from(local_x).ok()?)?;
        let z = self.pos.min_cell_z().checked_add(i32::try_from(local_z).ok()?)?;
        Some(CellPos::new(x, y, z))
    }
}

impl TileAccess for Tile {
    fn pos(&self) -> TilePos {
        self.pos
    }

    fn min_y(&self) -> i32 {
        self.min_y
    }

    fn max_y(&self) -> i32 {
        let height = i32::try_from(self.height).unwrap_or(i32::MAX);
        self.min_y.saturating_add(height)
    }

    fn surface_y(&self, x: i32, z: i32) -> i32 {
        let top = self.max_y();
        for y in (self.min_y..top).rev() {
            if !self.read_cell(CellPos::new(x, y, z)).kind.is_air() {
                return y.saturating_add(1);
            }
        }
        self.min_y
    }

    fn read_cell(&self, pos: CellPos) -> BlockState {
        self.index_of(pos)
            .and_then(|index| self.cells.get(index))
            .copied()
            .unwrap_or(BlockState::AIR)
    }

    fn write_cell(&mut self, pos: CellPos, state: BlockState) -> Result<(), WorldError> {
        self.set_cell(pos, state)?;
        self.updates.push(pos);
        Ok(())
    }
}
