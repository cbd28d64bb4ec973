//! Per-world FIFO of tiles awaiting stage application.
//!
//! Duplicates are tolerated; the scheduler skips tiles that were already
//! handled this session.

use std::collections::VecDeque;

use fallow_types::TilePos;

/// Ordered collection of pending tiles for one world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkQueue {
    pending: VecDeque<TilePos>,
}

impl WorkQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Append a tile.
    pub fn push(&mut self, tile: TilePos) {
        self.pending.push_back(tile);
    }

    /// Remove and return the oldest tile.
    pub fn pop(&mut self) -> Option<TilePos> {
        self.pending.pop_front()
    }

    /// Number of queued entries, duplicates included.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queued tiles, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TilePos> {
        self.pending.iter()
    }
}

/// Tiles of the `(2r+1)^2` square around `center`: the center first, then
/// the rest in row order (ascending `x`, then ascending `z`).
pub fn square_around(center: TilePos, radius: u32) -> Vec<TilePos> {
    let r = i32::try_from(radius).unwrap_or(i32::MAX);
    let side = usize::try_from(radius)
        .ok()
        .and_then(|r| r.checked_mul(2))
        .and_then(|d| d.checked_add(1))
        .unwrap_or(1);
    let mut tiles = Vec::with_capacity(side.saturating_mul(side));
    tiles.push(center);
    for dx in r.saturating_neg()..=r {
        for dz in r.saturating_neg()..=r {
            if dx != 0 || dz != 0 {
                tiles.push(center.offset(dx, dz));
            }
        }
    }
    tiles
}
