//! Per-world catch-up session.
//!
//! A [`WorldSession`] is created when a world starts and dropped when it
//! stops. It owns everything the scheduler needs for that world: the stage
//! budget, the work queue, deferred seeding, and the set of tiles already
//! handled under the current budget.
//!
//! # State machine
//!
//! ```text
//! Idle --arm(n > 0)--> Armed --enqueue--> Draining --queue empty--> Idle
//!                                            |
//!                                            +--queue empty, seed waiting--> Armed
//! ```
//!
//! The budget is consumed exactly once, on the tick that leaves `Draining`
//! with an empty queue and no deferred seeding left. Re-arming requires a
//! new trigger.

use std::collections::BTreeSet;

use fallow_types::{
    ArmTrigger, SessionClock, SessionPhase, StageBudget, TilePos, WorldId,
};
use fallow_world::{GrowthMutator, WorldHost};
use serde::Serialize;
use tracing::{debug, info};

use crate::deferred::{DeferredAction, DeferredTasks};
use crate::queue::{WorkQueue, square_around};

/// Running totals for one armed budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Tiles the mutator ran on.
    pub tiles_applied: u64,
    /// Queue entries dropped because the tile was not resident.
    pub tiles_dropped: u64,
    /// Queue entries skipped because the tile was already handled.
    pub tiles_skipped: u64,
    /// Cells whose age changed.
    pub cells_changed: u64,
}

/// Outcome of one world's share of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries popped from the queue.
    pub popped: u32,
    /// Tiles the mutator ran on.
    pub applied: u32,
    /// Entries dropped as non-resident.
    pub dropped: u32,
    /// Entries skipped as already handled.
    pub skipped: u32,
    /// Cells whose age changed.
    pub cells_changed: u32,
    /// Tiles enqueued by deferred seeding this tick.
    pub seeded: u32,
    /// Whether the budget was consumed at the end of this tick.
    pub consumed: bool,
}

/// Catch-up state of one running world.
#[derive(Debug, Clone)]
pub struct WorldSession {
    world: WorldId,
    clock: SessionClock,
    budget: StageBudget,
    phase: SessionPhase,
    trigger: Option<ArmTrigger>,
    queue: WorkQueue,
    deferred: DeferredTasks,
    applied: BTreeSet<TilePos>,
    stats: SessionStats,
}

impl WorldSession {
    /// An idle session for `world` whose persisted clock is `clock`.
    pub const fn new(world: WorldId, clock: SessionClock) -> Self {
        Self {
            world,
            clock,
            budget: StageBudget::empty(),
            phase: SessionPhase::Idle,
            trigger: None,
            queue: WorkQueue::new(),
            deferred: DeferredTasks::new(),
            applied: BTreeSet::new(),
            stats: SessionStats {
                tiles_applied: 0,
                tiles_dropped: 0,
                tiles_skipped: 0,
                cells_changed: 0,
            },
        }
    }

    /// The world this session belongs to.
    pub const fn world(&self) -> WorldId {
        self.world
    }

    /// The in-memory copy of the persisted clock.
    pub const fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Mutable access to the clock, for the tracker to stamp.
    pub const fn clock_mut(&mut self) -> &mut SessionClock {
        &mut self.clock
    }

    /// Stages still pending.
    pub const fn pending(&self) -> u32 {
        self.budget.pending()
    }

    /// Current phase.
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// What armed the current budget, if anything has.
    pub const fn trigger(&self) -> Option<ArmTrigger> {
        self.trigger
    }

    /// The work queue.
    pub const fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Number of deferred actions waiting.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Totals since the budget was last armed.
    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Whether `tile` was already handled under the current budget.
    pub fn was_applied(&self, tile: TilePos) -> bool {
        self.applied.contains(&tile)
    }

    /// Set a fresh budget. A zero budget leaves the session idle.
    ///
    /// Tiles handled under a previous budget become eligible again.
    pub fn arm(&mut self, stages: u32, trigger: ArmTrigger) {
        self.budget.arm(stages);
        self.trigger = Some(trigger);
        self.applied.clear();
        self.stats = SessionStats::default();
        self.phase = if stages == 0 {
            SessionPhase::Idle
        } else if self.queue.is_empty() {
            SessionPhase::Armed
        } else {
            SessionPhase::Draining
        };
        info!(
            world = %self.world,
            stages,
            trigger = ?trigger,
            phase = ?self.phase,
            "Session budget armed"
        );
    }

    /// Queue a tile that just became resident. Ignored while idle.
    ///
    /// Returns `true` if the tile was queued.
    pub fn enqueue(&mut self, tile: TilePos) -> bool {
        if self.phase == SessionPhase::Idle {
            return false;
        }
        self.queue.push(tile);
        self.phase = SessionPhase::Draining;
        true
    }

    /// Queue every resident tile of the square around `center`, center
    /// first. Ignored while idle.
    ///
    /// Returns the number of tiles queued.
    pub fn seed_region(&mut self, host: &dyn WorldHost, center: TilePos, radius: u32) -> u32 {
        if self.phase == SessionPhase::Idle {
            return 0;
        }
        let mut seeded: u32 = 0;
        for tile in square_around(center, radius) {
            if host.is_resident(self.world, tile) && self.enqueue(tile) {
                seeded = seeded.saturating_add(1);
            }
        }
        debug!(world = %self.world, center = %center, radius, seeded, "Seeded region");
        seeded
    }

    /// Schedule seeding around `center` after `delay_ticks`. Ignored while
    /// idle.
    pub fn defer_seed(&mut self, delay_ticks: u32, center: TilePos, radius: u32) -> bool {
        if self.phase == SessionPhase::Idle {
            return false;
        }
        self.deferred
            .schedule(delay_ticks, DeferredAction::SeedRegion { center, radius });
        true
    }

    /// Run this world's share of one tick: fire due deferred actions, pop
    /// up to `budget` queue entries, and apply the pending stages to each
    /// resident tile not yet handled.
    pub fn drain(
        &mut self,
        host: &mut dyn WorldHost,
        mutator: &GrowthMutator,
        budget: u32,
    ) -> DrainReport {
        let mut report = DrainReport::default();

        for action in self.deferred.tick() {
            match action {
                DeferredAction::SeedRegion { center, radius } => {
                    let seeded = self.seed_region(host, center, radius);
                    report.seeded = report.seeded.saturating_add(seeded);
                }
            }
        }

        let stages = self.budget.pending();
        if stages == 0 || self.phase != SessionPhase::Draining {
            return report;
        }

        for _ in 0..budget.max(1) {
            let Some(tile) = self.queue.pop() else {
                break;
            };
            report.popped = report.popped.saturating_add(1);

            if self.applied.contains(&tile) {
                report.skipped = report.skipped.saturating_add(1);
                continue;
            }
            let Some(access) = host.resident_tile(self.world, tile) else {
                report.dropped = report.dropped.saturating_add(1);
                continue;
            };

            let growth = mutator.apply_stages(access, stages);
            self.applied.insert(tile);
            report.applied = report.applied.saturating_add(1);
            report.cells_changed = report.cells_changed.saturating_add(growth.changed);
        }

        self.stats.tiles_applied = self.stats.tiles_applied.saturating_add(u64::from(report.applied));
        self.stats.tiles_dropped = self.stats.tiles_dropped.saturating_add(u64::from(report.dropped));
        self.stats.tiles_skipped = self.stats.tiles_skipped.saturating_add(u64::from(report.skipped));
        self.stats.cells_changed = self
            .stats
            .cells_changed
            .saturating_add(u64::from(report.cells_changed));

        if self.queue.is_empty() && !self.deferred.is_empty() {
            // A join seed is still waiting; keep the budget for it.
            self.phase = SessionPhase::Armed;
            debug!(world = %self.world, deferred = self.deferred.len(), "Queue empty, awaiting deferred seeding");
        } else if self.queue.is_empty() {
            let consumed = self.budget.consume();
            self.phase = SessionPhase::Idle;
            report.consumed = true;
            info!(
                world = %self.world,
                stages = consumed,
                tiles_applied = self.stats.tiles_applied,
                cells_changed = self.stats.cells_changed,
                "Session budget consumed"
            );
        }

        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fallow_types::{BlockKind, BlockState, CellPos};
    use fallow_world::GridWorld;

    use super::*;

    fn world_with_crop(tile: TilePos) -> (GridWorld, WorldId, CellPos) {
        let mut grid = GridWorld::new();
        let world = grid.add_world("test", 0, 16).unwrap();
        let pos = CellPos::new(tile.min_cell_x() + 2, 5, tile.min_cell_z() + 3);
        grid.place(world, CellPos::new(pos.x, 4, pos.z), BlockState::of(BlockKind::Farmland))
            .unwrap();
        grid.place(world, pos, BlockState::crop(BlockKind::Wheat, 1))
            .unwrap();
        (grid, world, pos)
    }

    #[test]
    fn idle_session_ignores_residency() {
        let mut session = WorldSession::new(WorldId::new(), SessionClock::default());
        assert!(!session.enqueue(TilePos::new(0, 0)));
        assert!(session.queue().is_empty());
    }

    #[test]
    fn zero_budget_stays_idle() {
        let mut session = WorldSession::new(WorldId::new(), SessionClock::default());
        session.arm(0, ArmTrigger::WorldStart);
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn full_lifecycle() {
        let tile = TilePos::new(0, 0);
        let (mut grid, world, pos) = world_with_crop(tile);
        grid.load_tile(world, tile).unwrap();
        let mutator = GrowthMutator::default();

        let mut session = WorldSession::new(world, SessionClock::default());
        session.arm(3, ArmTrigger::WorldStart);
        assert_eq!(session.phase(), SessionPhase::Armed);

        // Armed with an empty queue: nothing to do, budget kept.
        let report = session.drain(&mut grid, &mutator, 3);
        assert!(!report.consumed);
        assert_eq!(session.pending(), 3);

        assert!(session.enqueue(tile));
        assert_eq!(session.phase(), SessionPhase::Draining);

        let report = session.drain(&mut grid, &mutator, 3);
        assert_eq!(report.applied, 1);
        assert_eq!(report.cells_changed, 1);
        assert!(report.consumed);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.pending(), 0);
        assert_eq!(grid.cell(world, pos).age, 4);
    }

    #[test]
    fn duplicate_entries_apply_once() {
        let tile = TilePos::new(0, 0);
        let (mut grid, world, pos) = world_with_crop(tile);
        grid.load_tile(world, tile).unwrap();

        let mut session = WorldSession::new(world, SessionClock::default());
        session.arm(2, ArmTrigger::WorldStart);
        session.enqueue(tile);
        session.enqueue(tile);
        let report = session.drain(&mut grid, &GrowthMutator::default(), 3);
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(grid.cell(world, pos).age, 3);
    }

    #[test]
    fn non_resident_entries_are_dropped() {
        let tile = TilePos::new(0, 0);
        let (mut grid, world, pos) = world_with_crop(tile);

        let mut session = WorldSession::new(world, SessionClock::default());
        session.arm(2, ArmTrigger::WorldStart);
        session.enqueue(tile);
        let report = session.drain(&mut grid, &GrowthMutator::default(), 3);
        assert_eq!(report.dropped, 1);
        assert_eq!(grid.resident_count(world), 0);
        assert_eq!(grid.cell(world, pos).age, 1);
    }

    #[test]
    fn pops_at_most_budget_per_tick() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("test", 0, 8).unwrap();
        grid.load_square(world, TilePos::new(0, 0), 1).unwrap();

        let mut session = WorldSession::new(world, SessionClock::default());
        session.arm(1, ArmTrigger::WorldStart);
        assert_eq!(session.seed_region(&grid, TilePos::new(0, 0), 1), 9);

        let mutator = GrowthMutator::default();
        let mut ticks = 0;
        while session.phase() == SessionPhase::Draining {
            let report = session.drain(&mut grid, &mutator, 2);
            assert!(report.popped <= 2);
            ticks += 1;
        }
        assert_eq!(ticks, 5);
        assert_eq!(session.stats().tiles_applied, 9);
    }

    #[test]
    fn seeding_skips_non_resident_tiles() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("test", 0, 8).unwrap();
        grid.load_tile(world, TilePos::new(5, 5)).unwrap();

        let mut session = WorldSession::new(world, SessionClock::default());
        session.arm(1, ArmTrigger::SimulateCommand);
        assert_eq!(session.seed_region(&grid, TilePos::new(5, 5), 2), 1);
        assert_eq!(session.queue().iter().next(), Some(&TilePos::new(5, 5)));
    }

    #[test]
    fn deferred_seed_fires_after_delay() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("test", 0, 8).unwrap();
        grid.load_tile(world, TilePos::new(0, 0)).unwrap();
        let mutator = GrowthMutator::default();

        let mut session = WorldSession::new(world, SessionClock::default());
        session.arm(1, ArmTrigger::WorldStart);
        assert!(session.defer_seed(2, TilePos::new(0, 0), 0));
        assert_eq!(session.drain(&mut grid, &mutator, 3).seeded, 0);
        let report = session.drain(&mut grid, &mutator, 3);
        assert_eq!(report.seeded, 1);
        assert_eq!(report.applied, 1);
        assert!(report.consumed);
    }

    #[test]
    fn waiting_seed_holds_the_budget_past_an_empty_queue() {
        let mut grid = GridWorld::new();
        let world = grid.add_world("test", 0, 8).unwrap();
        grid.load_tile(world, TilePos::new(0, 0)).unwrap();
        grid.load_tile(world, TilePos::new(9, 9)).unwrap();
        let mutator = GrowthMutator::default();

        let mut session = WorldSession::new(world, SessionClock::default());
        session.arm(2, ArmTrigger::WorldStart);
        session.defer_seed(3, TilePos::new(9, 9), 0);
        session.enqueue(TilePos::new(0, 0));

        let report = session.drain(&mut grid, &mutator, 3);
        assert_eq!(report.applied, 1);
        assert!(!report.consumed);
        assert_eq!(session.phase(), SessionPhase::Armed);
        assert_eq!(session.pending(), 2);

        assert_eq!(session.drain(&mut grid, &mutator, 3).seeded, 0);
        let report = session.drain(&mut grid, &mutator, 3);
        assert_eq!(report.seeded, 1);
        assert_eq!(report.applied, 1);
        assert!(report.consumed);
        assert_eq!(session.phase(), SessionPhase::Idle);
    }
}
