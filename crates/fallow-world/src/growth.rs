//! Stage application: advancing ageable cells of a resident tile.
//!
//! [`GrowthMutator::apply_stages`] walks every column of a tile, scans a
//! bounded band below the column's surface, and advances each cell that
//! exposes a bounded age attribute by up to `stages`, capped at the kind's
//! ceiling. Changes go through [`TileAccess::write_cell`] so the host can
//! notify dependents.
//!
//! Application is monotonic (ages never decrease) and applying zero stages
//! never touches a cell.

use std::collections::BTreeSet;

use fallow_types::{BlockKind, CellPos, TILE_SIZE};
use tracing::{debug, warn};

use crate::host::TileAccess;

/// Default depth, in cells, scanned below each column's surface.
pub const DEFAULT_SCAN_DEPTH: u32 = 48;

// ---------------------------------------------------------------------------
// CropFilter
// ---------------------------------------------------------------------------

/// Per-kind gating of which ageable kinds may be advanced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CropFilter {
    disabled: BTreeSet<BlockKind>,
}

impl CropFilter {
    /// A filter that lets every ageable kind grow.
    pub const fn allow_all() -> Self {
        Self {
            disabled: BTreeSet::new(),
        }
    }

    /// A filter excluding the given kinds.
    pub fn excluding(kinds: impl IntoIterator<Item = BlockKind>) -> Self {
        Self {
            disabled: kinds.into_iter().collect(),
        }
    }

    /// Whether cells of `kind` may be advanced.
    pub fn allows(&self, kind: BlockKind) -> bool {
        !self.disabled.contains(&kind)
    }
}

// ---------------------------------------------------------------------------
// GrowthReport
// ---------------------------------------------------------------------------

/// Outcome of applying stages to one tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrowthReport {
    /// Ageable cells inspected.
    pub ageable: u32,
    /// Cells whose age was changed.
    pub changed: u32,
    /// Ageable cells skipped because their kind is disabled.
    pub skipped_disabled: u32,
}

// ---------------------------------------------------------------------------
// GrowthMutator
// ---------------------------------------------------------------------------

/// Applies stage counts to resident tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowthMutator {
    filter: CropFilter,
    scan_depth: u32,
}

impl Default for GrowthMutator {
    fn default() -> Self {
        Self::new(CropFilter::allow_all(), DEFAULT_SCAN_DEPTH)
    }
}

impl GrowthMutator {
    /// Create a mutator. A `scan_depth` of zero scans the full height of
    /// every column.
    pub const fn new(filter: CropFilter, scan_depth: u32) -> Self {
        Self { filter, scan_depth }
    }

    /// Advance every eligible cell of `tile` by up to `stages`.
    pub fn apply_stages(&self, tile: &mut dyn TileAccess, stages: u32) -> GrowthReport {
        let mut report = GrowthReport::default();
        if stages == 0 {
            return report;
        }

        let origin = tile.pos();
        let base_x = origin.min_cell_x();
        let base_z = origin.min_cell_z();
        let min_y = tile.min_y();

        for dx in 0..TILE_SIZE {
            for dz in 0..TILE_SIZE {
                let x = base_x.saturating_add(dx);
                let z = base_z.saturating_add(dz);
                let top = tile.surface_y(x, z).min(tile.max_y());
                let bottom = self.scan_floor(top, min_y);

                for y in (bottom..top).rev() {
                    self.advance_cell(tile, CellPos::new(x, y, z), stages, &mut report);
                }
            }
        }

        debug!(
            tile = %origin,
            stages,
            ageable = report.ageable,
            changed = report.changed,
            skipped_disabled = report.skipped_disabled,
            "Applied stages to tile"
        );
        report
    }

    /// Lowest layer scanned for a column whose surface is at `top`.
    fn scan_floor(&self, top: i32, min_y: i32) -> i32 {
        if self.scan_depth == 0 {
            return min_y;
        }
        let depth = i32::try_from(self.scan_depth).unwrap_or(i32::MAX);
        top.saturating_sub(depth).max(min_y)
    }

    fn advance_cell(
        &self,
        tile: &mut dyn TileAccess,
        pos: CellPos,
        stages: u32,
        report: &mut GrowthReport,
    ) {
        let state = tile.read_cell(pos);
        let Some(age) = state.bounded_age() else {
            return;
        };
        report.ageable = report.ageable.saturating_add(1);

        if !self.filter.allows(state.kind) {
            report.skipped_disabled = report.skipped_disabled.saturating_add(1);
            return;
        }

        let next = age.advanced_by(stages);
        if next == age.value {
            return;
        }

        match tile.write_cell(pos, state.with_age(next)) {
            Ok(()) => report.changed = report.changed.saturating_add(1),
            Err(e) => warn!(error = %e, "Host rejected growth write"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
