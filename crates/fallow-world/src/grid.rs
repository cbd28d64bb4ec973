//! In-memory reference host: a set of worlds made of loadable tiles.
//!
//! [`GridWorld`] implements [`WorldHost`] over plain maps. Each world keeps
//! its resident tiles separately from its stored (unloaded) tiles, so
//! residency can be toggled the way a real host pages chunks in and out.
//! Loading a tile or admitting an actor raises a [`HostEvent`] that the
//! runner polls once per tick.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, VecDeque};

use fallow_types::{ActorId, BlockState, CellPos, TilePos, WorldId};
use tracing::debug;

use crate::error::WorldError;
use crate::host::{HostEvent, TileAccess, WorldHost};
use crate::tile::Tile;

/// One world of the grid.
#[derive(Debug, Clone)]
struct WorldGrid {
    name: String,
    min_y: i32,
    height: u32,
    resident: BTreeMap<TilePos, Tile>,
    stored: BTreeMap<TilePos, Tile>,
    actors: BTreeMap<ActorId, CellPos>,
}

impl WorldGrid {
    fn blank_tile(&self, pos: TilePos) -> Result<Tile, WorldError> {
        Tile::new(pos, self.min_y, self.height)
    }
}

/// In-memory multi-world host.
#[derive(Debug, Clone, Default)]
pub struct GridWorld {
    worlds: BTreeMap<WorldId, WorldGrid>,
    events: VecDeque<HostEvent>,
}

impl GridWorld {
    /// Create a host with no worlds.
    pub const fn new() -> Self {
        Self {
            worlds: BTreeMap::new(),
            events: VecDeque::new(),
        }
    }

    /// Register a world with the given id and vertical extent.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidHeight`] if the extent cannot hold a
    /// tile.
    pub fn add_world_with_id(
        &mut self,
        id: WorldId,
        name: &str,
        min_y: i32,
        height: u32,
    ) -> Result<WorldId, WorldError> {
        // Validate the extent once up front.
        let _extent_check = Tile::new(TilePos::new(0, 0), min_y, height)?;
        self.worlds.insert(
            id,
            WorldGrid {
                name: name.to_owned(),
                min_y,
                height,
                resident: BTreeMap::new(),
                stored: BTreeMap::new(),
                actors: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    /// Register a world with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidHeight`] if the extent cannot hold a
    /// tile.
    pub fn add_world(&mut self, name: &str, min_y: i32, height: u32) -> Result<WorldId, WorldError> {
        self.add_world_with_id(WorldId::new(), name, min_y, height)
    }

    /// Human-readable name of a world.
    pub fn world_name(&self, world: WorldId) -> Option<&str> {
        self.worlds.get(&world).map(|w| w.name.as_str())
    }

    // -------------------------------------------------------------------
    // Residency
    // -------------------------------------------------------------------

    /// Make a tile resident, generating a blank one if it was never stored.
    ///
    /// Returns `true` if the tile was not resident before. A
    /// [`HostEvent::TileResident`] is raised only in that case.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WorldNotFound`] for an unknown world.
    pub fn load_tile(&mut self, world: WorldId, pos: TilePos) -> Result<bool, WorldError> {
        let grid = self.worlds.get_mut(&world).ok_or(WorldError::WorldNotFound(world))?;
        if grid.resident.contains_key(&pos) {
            return Ok(false);
        }
        let tile = match grid.stored.remove(&pos) {
            Some(tile) => tile,
            None => grid.blank_tile(pos)?,
        };
        grid.resident.insert(pos, tile);
        self.events.push_back(HostEvent::TileResident { world, tile: pos });
        debug!(%world, tile = %pos, "Tile loaded");
        Ok(true)
    }

    /// Load every tile within `radius` tiles of `center`.
    ///
    /// Returns the number of tiles that became resident.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WorldNotFound`] for an unknown world.
    pub fn load_square(
        &mut self,
        world: WorldId,
        center: TilePos,
        radius: u32,
    ) -> Result<u32, WorldError> {
        let r = i32::try_from(radius).map_err(|_err| WorldError::ArithmeticOverflow)?;
        let mut loaded: u32 = 0;
        for dx in r.saturating_neg()..=r {
            for dz in r.saturating_neg()..=r {
                if self.load_tile(world, center.offset(dx, dz))? {
                    loaded = loaded.saturating_add(1);
                }
            }
        }
        Ok(loaded)
    }

    /// Move a resident tile back to storage. Returns `true` if it was
    /// resident.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WorldNotFound`] for an unknown world.
    pub fn unload_tile(&mut self, world: WorldId, pos: TilePos) -> Result<bool, WorldError> {
        let grid = self.worlds.get_mut(&world).ok_or(WorldError::WorldNotFound(world))?;
        match grid.resident.remove(&pos) {
            Some(tile) => {
                grid.stored.insert(pos, tile);
                debug!(%world, tile = %pos, "Tile unloaded");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of resident tiles in a world.
    pub fn resident_count(&self, world: WorldId) -> usize {
        self.worlds.get(&world).map_or(0, |w| w.resident.len())
    }

    // -------------------------------------------------------------------
    // Cells
    // -------------------------------------------------------------------

    /// Set a cell, resident or stored, without raising updates. Creates a
    /// stored tile when the position has never been touched.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WorldNotFound`] for an unknown world or
    /// [`WorldError::CellOutOfBounds`] if `pos.y` is outside the world.
    pub fn place(&mut self, world: WorldId, pos: CellPos, state: BlockState) -> Result<(), WorldError> {
        let grid = self.worlds.get_mut(&world).ok_or(WorldError::WorldNotFound(world))?;
        let tile_pos = pos.tile();
        if let Some(tile) = grid.resident.get_mut(&tile_pos) {
            return tile.set_cell(pos, state);
        }
        let (min_y, height) = (grid.min_y, grid.height);
        let tile = match grid.stored.entry(tile_pos) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(Tile::new(tile_pos, min_y, height)?),
        };
        tile.set_cell(pos, state)
    }

    /// Read a cell whether or not its tile is resident. Unknown cells read
    /// as air.
    pub fn cell(&self, world: WorldId, pos: CellPos) -> BlockState {
        let Some(grid) = self.worlds.get(&world) else {
            return BlockState::AIR;
        };
        let tile_pos = pos.tile();
        grid.resident
            .get(&tile_pos)
            .or_else(|| grid.stored.get(&tile_pos))
            .map_or(BlockState::AIR, |tile| tile.read_cell(pos))
    }

    /// Iterate over every non-air cell of a world, resident or stored.
    pub fn cells(&self, world: WorldId) -> Vec<(CellPos, BlockState)> {
        self.worlds.get(&world).map_or_else(Vec::new, |grid| {
            grid.resident
                .values()
                .chain(grid.stored.values())
                .flat_map(Tile::occupied_cells)
                .collect()
        })
    }

    /// Drain cell updates recorded by resident tiles of a world.
    pub fn take_updates(&mut self, world: WorldId) -> Vec<CellPos> {
        self.worlds.get_mut(&world).map_or_else(Vec::new, |grid| {
            grid.resident.values_mut().flat_map(Tile::take_updates).collect()
        })
    }

    // -------------------------------------------------------------------
    // Actors
    // -------------------------------------------------------------------

    /// Admit an actor at `position` and raise [`HostEvent::ActorAdmitted`].
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::WorldNotFound`] for an unknown world.
    pub fn admit_actor(
        &mut self,
        world: WorldId,
        actor: ActorId,
        position: CellPos,
    ) -> Result<(), WorldError> {
        let grid = self.worlds.get_mut(&world).ok_or(WorldError::WorldNotFound(world))?;
        grid.actors.insert(actor, position);
        self.events.push_back(HostEvent::ActorAdmitted {
            world,
            actor,
            position,
        });
        Ok(())
    }

    /// Current position of an actor.
    pub fn actor_position(&self, world: WorldId, actor: ActorId) -> Option<CellPos> {
        self.worlds.get(&world)?.actors.get(&actor).copied()
    }
}

impl WorldHost for GridWorld {
    fn world_ids(&self) -> Vec<WorldId> {
        self.worlds.keys().copied().collect()
    }

    fn is_resident(&self, world: WorldId, tile: TilePos) -> bool {
        self.worlds
            .get(&world)
            .is_some_and(|grid| grid.resident.contains_key(&tile))
    }

    fn resident_tile(&mut self, world: WorldId, tile: TilePos) -> Option<&mut dyn TileAccess> {
        self.worlds
            .get_mut(&world)?
            .resident
            .get_mut(&tile)
            .map(|t| t as &mut dyn TileAccess)
    }

    fn actors(&self, world: WorldId) -> Vec<(ActorId, CellPos)> {
        self.worlds.get(&world).map_or_else(Vec::new, |grid| {
            grid.actors.iter().map(|(id, pos)| (*id, *pos)).collect()
        })
    }

    fn poll_events(&mut self) -> Vec<HostEvent> {
        self.events.drain(..).collect()
    }

    /// No client watches the in-memory grid, so pending updates are
    /// discarded.
    fn flush_updates(&mut self) -> usize {
        self.worlds
            .values_mut()
            .flat_map(|grid| grid.resident.values_mut())
            .fold(0_usize, |count, tile| count.saturating_add(tile.take_updates().len()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fallow_types::BlockKind;

    use super::*;

    #[test]
    fn load_raises_one_event_per_tile() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("overworld", 0, 16).unwrap();
        assert!(grid.load_tile(world, TilePos::new(0, 0)).unwrap());
        assert!(!grid.load_tile(world, TilePos::new(0, 0)).unwrap());
        assert_eq!(
            grid.poll_events(),
            vec![HostEvent::TileResident {
                world,
                tile: TilePos::new(0, 0)
            }]
        );
        assert!(grid.poll_events().is_empty());
    }

    #[test]
    fn unloaded_tiles_keep_their_cells() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("overworld", 0, 16).unwrap();
        let pos = CellPos::new(1, 2, 3);
        grid.place(world, pos, BlockState::crop(BlockKind::Wheat, 4))
            .unwrap();
        assert!(!grid.is_resident(world, pos.tile()));

        grid.load_tile(world, pos.tile()).unwrap();
        assert!(grid.is_resident(world, pos.tile()));
        assert!(grid.resident_tile(world, pos.tile()).is_some());

        grid.unload_tile(world, pos.tile()).unwrap();
        assert!(grid.resident_tile(world, pos.tile()).is_none());
        assert_eq!(grid.cell(world, pos).age, 4);
    }

    #[test]
    fn load_square_counts_new_tiles() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("overworld", 0, 8).unwrap();
        grid.load_tile(world, TilePos::new(0, 0)).unwrap();
        assert_eq!(grid.load_square(world, TilePos::new(0, 0), 1).unwrap(), 8);
        assert_eq!(grid.resident_count(world), 9);
    }

    #[test]
    fn unknown_world_is_an_error() {
        let mut grid = GridWorld::new();
        let result = grid.load_tile(WorldId::new(), TilePos::new(0, 0));
        assert!(matches!(result, Err(WorldError::WorldNotFound(_))));
    }

    #[test]
    fn flush_drops_pending_writes_but_keeps_cells() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("overworld", 0, 16).unwrap();
        let pos = CellPos::new(1, 2, 3);
        grid.load_tile(world, pos.tile()).unwrap();
        grid.resident_tile(world, pos.tile())
            .unwrap()
            .write_cell(pos, BlockState::crop(BlockKind::Wheat, 1))
            .unwrap();

        assert_eq!(grid.flush_updates(), 1);
        assert_eq!(grid.flush_updates(), 0);
        assert!(grid.take_updates(world).is_empty());
        assert_eq!(grid.cell(world, pos).age, 1);
    }

    #[test]
    fn admitting_an_actor_raises_an_event() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("overworld", 0, 8).unwrap();
        let actor = ActorId::new();
        grid.admit_actor(world, actor, CellPos::new(40, 3, -2)).unwrap();
        assert_eq!(grid.actor_position(world, actor), Some(CellPos::new(40, 3, -2)));
        assert!(matches!(
            grid.poll_events().as_slice(),
            [HostEvent::ActorAdmitted { .. }]
        ));
    }
}
