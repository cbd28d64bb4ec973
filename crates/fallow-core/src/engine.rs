//! The growth engine: world lifecycle, host events, and the per-tick drain.
//!
//! [`GrowthEngine`] owns one [`WorldSession`] per running world. Hosts call
//! into it from their tick thread only:
//!
//! 1. [`on_world_start`](GrowthEngine::on_world_start) reads the elapsed
//!    interval, converts it to stages, and arms the session.
//! 2. [`handle_event`](GrowthEngine::handle_event) feeds residency and actor
//!    admission events into the work queue.
//! 3. [`run_tick`](GrowthEngine::run_tick) drains each world's queue under
//!    the per-tick budget.
//! 4. [`on_world_stop`](GrowthEngine::on_world_stop) records the last-seen
//!    time and drops the session.

use std::collections::BTreeMap;
use std::sync::Arc;

use fallow_store::RecordStore;
use fallow_types::{ActorId, ArmTrigger, CellPos, SessionPhase, TilePos, WorldId};
use fallow_world::{GrowthMutator, HostEvent, WorldHost};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{ElapsedTracker, WallClock};
use crate::config::{FallowConfig, SchedulerConfig};
use crate::convert::{ConversionParams, convert};
use crate::session::{SessionStats, WorldSession};

/// Milliseconds in one minute.
const MILLIS_PER_MINUTE: u64 = 60_000;

/// Errors returned by operator-facing engine operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrowthError {
    /// The world has not been started.
    #[error("world {0} is not running")]
    WorldNotRunning(WorldId),

    /// No world is running to receive the command.
    #[error("no world is running")]
    NoRunningWorld,

    /// The simulated interval must be at least one minute.
    #[error("minutes must be at least 1, got {0}")]
    InvalidMinutes(u32),
}

/// Stages armed by a world start or simulate command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmOutcome {
    /// World that was armed.
    pub world: WorldId,
    /// Interval converted, in milliseconds.
    pub elapsed_ms: u64,
    /// Whole stages armed.
    pub stages: u32,
    /// Remainder persisted for the next conversion.
    pub remainder: f64,
    /// Whether no prior record existed.
    pub first_run: bool,
    /// Tiles queued immediately.
    pub seeded: u32,
}

/// Aggregate outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    /// Tick number that just ran (1-based).
    pub tick: u64,
    /// Worlds that were draining at the start of the tick.
    pub worlds_draining: u32,
    /// Queue entries popped.
    pub tiles_popped: u32,
    /// Tiles the mutator ran on.
    pub tiles_applied: u32,
    /// Entries dropped as non-resident.
    pub tiles_dropped: u32,
    /// Cells whose age changed.
    pub cells_changed: u32,
    /// Sessions whose budget was consumed this tick.
    pub sessions_consumed: u32,
}

/// Snapshot of one world's session for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldStatus {
    /// World id.
    pub world: WorldId,
    /// Current phase.
    pub phase: SessionPhase,
    /// Stages pending.
    pub pending: u32,
    /// What armed the current budget.
    pub trigger: Option<ArmTrigger>,
    /// Queue length, duplicates included.
    pub queued: usize,
    /// Deferred actions waiting.
    pub deferred: usize,
    /// Persisted last-seen time.
    pub last_seen_epoch_ms: i64,
    /// Persisted remainder.
    pub stage_remainder: f64,
    /// Totals since the budget was last armed.
    pub stats: SessionStats,
}

/// Offline catch-up engine for every running world of one host.
#[derive(Debug)]
pub struct GrowthEngine {
    params: ConversionParams,
    scheduler: SchedulerConfig,
    mutator: GrowthMutator,
    tracker: ElapsedTracker,
    sessions: BTreeMap<WorldId, WorldSession>,
    tick: u64,
}

impl GrowthEngine {
    /// Build an engine from configuration, a record store, and a clock.
    pub fn new(config: &FallowConfig, store: Box<dyn RecordStore>, clock: Arc<dyn WallClock>) -> Self {
        let mut scheduler = config.scheduler.clone();
        scheduler.chunks_per_tick = scheduler.chunks_per_tick.max(1);
        Self {
            params: ConversionParams::from_config(&config.growth),
            mutator: GrowthMutator::new(config.crops.filter(), scheduler.scan_depth),
            scheduler,
            tracker: ElapsedTracker::new(store, clock),
            sessions: BTreeMap::new(),
            tick: 0,
        }
    }

    /// Conversion parameters in effect.
    pub const fn params(&self) -> &ConversionParams {
        &self.params
    }

    /// Number of ticks run so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The session of a running world.
    pub fn session(&self, world: WorldId) -> Option<&WorldSession> {
        self.sessions.get(&world)
    }

    /// Ids of running worlds.
    pub fn running_worlds(&self) -> Vec<WorldId> {
        self.sessions.keys().copied().collect()
    }

    /// Status of every running world.
    pub fn status(&self) -> Vec<WorldStatus> {
        self.sessions
            .values()
            .map(|s| WorldStatus {
                world: s.world(),
                phase: s.phase(),
                pending: s.pending(),
                trigger: s.trigger(),
                queued: s.queue().len(),
                deferred: s.deferred_len(),
                last_seen_epoch_ms: s.clock().last_seen_epoch_ms,
                stage_remainder: s.clock().stage_remainder,
                stats: s.stats(),
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start a world: measure the offline interval, convert it, persist the
    /// new remainder, and arm a fresh session.
    ///
    /// Starting a world that is already running replaces its session.
    pub fn on_world_start(&mut self, world: WorldId) -> ArmOutcome {
        let reading = self.tracker.on_world_start(world);
        let mut session = WorldSession::new(world, reading.clock);

        let (stages, remainder) = if reading.first_run {
            (0, reading.prior_remainder)
        } else {
            let conversion = convert(reading.elapsed_ms, &self.params, reading.prior_remainder);
            self.tracker
                .record_remainder(world, session.clock_mut(), conversion.remainder);
            (conversion.stages, conversion.remainder)
        };

        session.arm(stages, ArmTrigger::WorldStart);
        self.sessions.insert(world, session);

        info!(
            %world,
            elapsed_ms = reading.elapsed_ms,
            stages,
            remainder,
            "World started"
        );
        ArmOutcome {
            world,
            elapsed_ms: reading.elapsed_ms,
            stages,
            remainder,
            first_run: reading.first_run,
            seeded: 0,
        }
    }

    /// Stop a world: persist the last-seen time and drop its session.
    ///
    /// Returns `false` if the world was not running.
    pub fn on_world_stop(&mut self, world: WorldId) -> bool {
        let Some(mut session) = self.sessions.remove(&world) else {
            return false;
        };
        self.tracker.on_world_stop(world, session.clock_mut());
        true
    }

    /// Stop every running world.
    pub fn stop_all(&mut self) {
        for world in self.running_worlds() {
            self.on_world_stop(world);
        }
    }

    // -----------------------------------------------------------------------
    // Host events
    // -----------------------------------------------------------------------

    /// Route one host event.
    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::TileResident { world, tile } => {
                self.on_tile_resident(world, tile);
            }
            HostEvent::ActorAdmitted {
                world,
                actor,
                position,
            } => {
                self.on_actor_admitted(world, actor, position);
            }
        }
    }

    /// Queue a tile that just became resident. Returns `true` if queued.
    pub fn on_tile_resident(&mut self, world: WorldId, tile: TilePos) -> bool {
        self.sessions
            .get_mut(&world)
            .is_some_and(|session| session.enqueue(tile))
    }

    /// Schedule seeding around an admitted actor after the join delay.
    /// Returns `true` if seeding was scheduled.
    pub fn on_actor_admitted(&mut self, world: WorldId, actor: ActorId, position: CellPos) -> bool {
        let delay = self.scheduler.join_delay_ticks;
        let radius = self.scheduler.seed_radius;
        let scheduled = self
            .sessions
            .get_mut(&world)
            .is_some_and(|session| session.defer_seed(delay, position.tile(), radius));
        debug!(%world, %actor, tile = %position.tile(), scheduled, "Actor admitted");
        scheduled
    }

    // -----------------------------------------------------------------------
    // Operator command
    // -----------------------------------------------------------------------

    /// Treat `minutes` as time spent offline: convert it exactly as a
    /// restart would, re-arm the session, persist the clock, and seed
    /// immediately around `center` (or around every actor in the world
    /// when no center is given).
    ///
    /// When `world` is `None` the first running world is used.
    ///
    /// # Errors
    ///
    /// Returns [`GrowthError::InvalidMinutes`] for zero minutes and
    /// [`GrowthError::WorldNotRunning`] / [`GrowthError::NoRunningWorld`]
    /// when there is no session to arm.
    pub fn simulate_offline(
        &mut self,
        host: &dyn WorldHost,
        world: Option<WorldId>,
        minutes: u32,
        center: Option<TilePos>,
    ) -> Result<ArmOutcome, GrowthError> {
        if minutes == 0 {
            return Err(GrowthError::InvalidMinutes(minutes));
        }
        let world = match world {
            Some(id) => id,
            None => *self.sessions.keys().next().ok_or(GrowthError::NoRunningWorld)?,
        };
        let session = self
            .sessions
            .get_mut(&world)
            .ok_or(GrowthError::WorldNotRunning(world))?;

        let elapsed_ms = u64::from(minutes).saturating_mul(MILLIS_PER_MINUTE);
        let conversion = convert(elapsed_ms, &self.params, session.clock().stage_remainder);

        session.clock_mut().stage_remainder = conversion.remainder;
        self.tracker.touch(world, session.clock_mut());
        session.arm(conversion.stages, ArmTrigger::SimulateCommand);

        let radius = self.scheduler.seed_radius;
        let centers: Vec<TilePos> = center.map_or_else(
            || host.actors(world).into_iter().map(|(_, pos)| pos.tile()).collect(),
            |tile| vec![tile],
        );
        let mut seeded: u32 = 0;
        for tile in centers {
            seeded = seeded.saturating_add(session.seed_region(host, tile, radius));
        }

        info!(
            %world,
            minutes,
            stages = conversion.stages,
            remainder = conversion.remainder,
            seeded,
            "Simulated offline interval"
        );
        Ok(ArmOutcome {
            world,
            elapsed_ms,
            stages: conversion.stages,
            remainder: conversion.remainder,
            first_run: false,
            seeded,
        })
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one scheduler tick across every running world.
    ///
    /// Never blocks and never loads tiles: non-resident queue entries are
    /// dropped.
    pub fn run_tick(&mut self, host: &mut dyn WorldHost) -> TickSummary {
        self.tick = self.tick.saturating_add(1);
        let mut summary = TickSummary {
            tick: self.tick,
            ..TickSummary::default()
        };
        let budget = self.scheduler.chunks_per_tick;

        for session in self.sessions.values_mut() {
            if session.phase() == SessionPhase::Draining {
                summary.worlds_draining = summary.worlds_draining.saturating_add(1);
            }
            let report = session.drain(host, &self.mutator, budget);
            summary.tiles_popped = summary.tiles_popped.saturating_add(report.popped);
            summary.tiles_applied = summary.tiles_applied.saturating_add(report.applied);
            summary.tiles_dropped = summary.tiles_dropped.saturating_add(report.dropped);
            summary.cells_changed = summary.cells_changed.saturating_add(report.cells_changed);
            if report.consumed {
                summary.sessions_consumed = summary.sessions_consumed.saturating_add(1);
            }
        }

        if summary.tiles_popped > 0 {
            debug!(
                tick = summary.tick,
                popped = summary.tiles_popped,
                applied = summary.tiles_applied,
                dropped = summary.tiles_dropped,
                cells_changed = summary.cells_changed,
                "Tick drained work"
            );
        }
        summary
    }
}
