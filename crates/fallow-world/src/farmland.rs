//! Seeded demo terrain: flat fields of planted crops.
//!
//! Used by the engine binary and by integration tests to get a world with
//! a realistic mix of ageable and inert cells. Layout is deterministic for
//! a given RNG seed.

use fallow_types::{BlockKind, BlockState, CellPos, TILE_SIZE, TilePos, WorldId};
use rand::Rng;
use tracing::info;

use crate::error::WorldError;
use crate::grid::GridWorld;

/// Crops planted on farmland, weighted equally.
const FARMLAND_CROPS: [BlockKind; 6] = [
    BlockKind::Wheat,
    BlockKind::Carrots,
    BlockKind::Potatoes,
    BlockKind::Beetroots,
    BlockKind::MelonStem,
    BlockKind::PumpkinStem,
];

/// Shape of a generated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Tile at the center of the field.
    pub center: TilePos,
    /// Field radius in tiles; the field covers a `(2r+1)^2` square.
    pub radius: u32,
    /// Layer of the farmland surface.
    pub ground_y: i32,
    /// One column in `water_every` is irrigation water instead of a crop.
    pub water_every: u32,
    /// One planted column in `wart_every` is nether wart on soul sand.
    pub wart_every: u32,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            center: TilePos::new(0, 0),
            radius: 2,
            ground_y: 4,
            water_every: 9,
            wart_every: 13,
        }
    }
}

/// Totals for a generated field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSummary {
    /// Columns visited.
    pub columns: u32,
    /// Crops planted.
    pub crops: u32,
    /// Water cells placed.
    pub water: u32,
}

/// Plant a field of crops with random starting ages into `world`.
///
/// Tiles are written to storage without being made resident.
///
/// # Errors
///
/// Returns [`WorldError`] if the world is unknown or the layout does not
/// fit its vertical extent.
pub fn plant_field(
    grid: &mut GridWorld,
    world: WorldId,
    layout: &FieldLayout,
    rng: &mut impl Rng,
) -> Result<FieldSummary, WorldError> {
    let radius = i32::try_from(layout.radius).map_err(|_err| WorldError::ArithmeticOverflow)?;
    let span = radius
        .checked_mul(TILE_SIZE)
        .ok_or(WorldError::ArithmeticOverflow)?;
    let origin_x = layout.center.min_cell_x();
    let origin_z = layout.center.min_cell_z();
    let mut summary = FieldSummary::default();

    for x in origin_x.saturating_sub(span)..origin_x.saturating_add(span).saturating_add(TILE_SIZE) {
        for z in origin_z.saturating_sub(span)..origin_z.saturating_add(span).saturating_add(TILE_SIZE) {
            plant_column(grid, world, layout, rng, x, z, &mut summary)?;
        }
    }

    info!(
        %world,
        columns = summary.columns,
        crops = summary.crops,
        water = summary.water,
        "Planted demo field"
    );
    Ok(summary)
}

fn plant_column(
    grid: &mut GridWorld,
    world: WorldId,
    layout: &FieldLayout,
    rng: &mut impl Rng,
    x: i32,
    z: i32,
    summary: &mut FieldSummary,
) -> Result<(), WorldError> {
    let ground = layout.ground_y;
    summary.columns = summary.columns.saturating_add(1);

    grid.place(world, CellPos::new(x, ground.saturating_sub(2), z), BlockState::of(BlockKind::Stone))?;
    grid.place(world, CellPos::new(x, ground.saturating_sub(1), z), BlockState::of(BlockKind::Dirt))?;

    if layout.water_every > 0 && rng.random_range(0..layout.water_every) == 0 {
        grid.place(world, CellPos::new(x, ground, z), BlockState::of(BlockKind::Water))?;
        summary.water = summary.water.saturating_add(1);
        return Ok(());
    }

    let above = ground.saturating_add(1);
    let (soil, kind) = if layout.wart_every > 0 && rng.random_range(0..layout.wart_every) == 0 {
        (BlockKind::SoulSand, BlockKind::NetherWart)
    } else {
        let pick = rng.random_range(0..FARMLAND_CROPS.len());
        let kind = FARMLAND_CROPS.get(pick).copied().unwrap_or(BlockKind::Wheat);
        (BlockKind::Farmland, kind)
    };
    let ceiling = kind.age_ceiling().unwrap_or(0);
    let age = rng.random_range(0..=ceiling);

    grid.place(world, CellPos::new(x, ground, z), BlockState::of(soil))?;
    grid.place(world, CellPos::new(x, above, z), BlockState::crop(kind, age))?;
    summary.crops = summary.crops.saturating_add(1);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn layout() -> FieldLayout {
        FieldLayout {
            radius: 0,
            ..FieldLayout::default()
        }
    }

    #[test]
    fn field_covers_one_tile_per_column() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("farm", 0, 16).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let summary = plant_field(&mut grid, world, &layout(), &mut rng).unwrap();
        assert_eq!(summary.columns, 256);
        assert_eq!(summary.crops + summary.water, 256);
        assert_eq!(grid.resident_count(world), 0);
    }

    #[test]
    fn same_seed_same_field() {
        let mut a = GridWorld::new();
        let mut b = GridWorld::new();
        let id = WorldId::new();
        a.add_world_with_id(id, "farm", 0, 16).unwrap();
        b.add_world_with_id(id, "farm", 0, 16).unwrap();
        plant_field(&mut a, id, &layout(), &mut SmallRng::seed_from_u64(7)).unwrap();
        plant_field(&mut b, id, &layout(), &mut SmallRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.cells(id), b.cells(id));
    }

    #[test]
    fn planted_ages_respect_ceilings() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("farm", 0, 16).unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        plant_field(&mut grid, world, &layout(), &mut rng).unwrap();
        for (_, state) in grid.cells(world) {
            if let Some(age) = state.bounded_age() {
                assert!(age.value <= age.ceiling);
            }
        }
    }
}
