//! Tick-counted deferred actions.
//!
//! Each entry waits a number of ticks and then fires on the tick that
//! brings its counter to zero. Entries fire in insertion order.

use fallow_types::TilePos;

/// Something to do once a delay expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Seed the square of the given radius around a tile.
    SeedRegion {
        /// Center tile.
        center: TilePos,
        /// Radius in tiles.
        radius: u32,
    },
}

/// Per-world list of `(remaining_ticks, action)` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeferredTasks {
    entries: Vec<(u32, DeferredAction)>,
}

impl DeferredTasks {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Schedule `action` to fire after `delay_ticks` ticks. A delay of zero
    /// fires on the next tick.
    pub fn schedule(&mut self, delay_ticks: u32, action: DeferredAction) {
        self.entries.push((delay_ticks, action));
    }

    /// Advance every entry by one tick and return the ones that are due,
    /// in insertion order.
    pub fn tick(&mut self) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        self.entries.retain_mut(|(remaining, action)| {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                due.push(*action);
                false
            } else {
                true
            }
        });
        due
    }

    /// Number of entries still waiting.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(x: i32) -> DeferredAction {
        DeferredAction::SeedRegion {
            center: TilePos::new(x, 0),
            radius: 1,
        }
    }

    #[test]
    fn fires_after_exact_delay() {
        let mut tasks = DeferredTasks::new();
        tasks.schedule(3, seed(0));
        assert!(tasks.tick().is_empty());
        assert!(tasks.tick().is_empty());
        assert_eq!(tasks.tick(), vec![seed(0)]);
        assert!(tasks.is_empty());
    }

    #[test]
    fn zero_delay_fires_next_tick() {
        let mut tasks = DeferredTasks::new();
        tasks.schedule(0, seed(1));
        assert_eq!(tasks.tick(), vec![seed(1)]);
    }

    #[test]
    fn due_entries_keep_insertion_order() {
        let mut tasks = DeferredTasks::new();
        tasks.schedule(2, seed(1));
        tasks.schedule(1, seed(2));
        tasks.schedule(2, seed(3));
        assert_eq!(tasks.tick(), vec![seed(2)]);
        assert_eq!(tasks.tick(), vec![seed(1), seed(3)]);
    }
}
