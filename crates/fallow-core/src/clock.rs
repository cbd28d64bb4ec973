//! Wall-clock sources and the per-world elapsed-time tracker.
//!
//! The tracker is the only component that reads or writes session records.
//! It stamps the record immediately on world start, so a crash later in the
//! session still leaves a checkpoint, and it never lets a storage failure
//! escape: a failed read is treated as a first run and a failed write is
//! logged and ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use fallow_store::RecordStore;
use fallow_types::{SessionClock, WorldId};
use tracing::{info, warn};

use crate::convert::sanitize_remainder;

// ---------------------------------------------------------------------------
// Wall clocks
// ---------------------------------------------------------------------------

/// Source of wall-clock time in Unix epoch milliseconds.
pub trait WallClock: Send + Sync {
    /// Current time in Unix epoch milliseconds.
    fn now_epoch_ms(&self) -> i64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `now_ms`.
    pub const fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Set the current time.
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::Release);
    }

    /// Move the clock forward (or backward, for a negative delta).
    pub fn advance(&self, delta_ms: i64) {
        let now = self.now_ms.load(Ordering::Acquire);
        self.now_ms.store(now.saturating_add(delta_ms), Ordering::Release);
    }
}

impl WallClock for ManualClock {
    fn now_epoch_ms(&self) -> i64 {
        self.now_ms.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// ElapsedTracker
// ---------------------------------------------------------------------------

/// What the tracker found when a world started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartReading {
    /// Milliseconds since the world was last seen; zero on a first run or
    /// when the clock went backwards.
    pub elapsed_ms: u64,
    /// Remainder carried from the previous conversion.
    pub prior_remainder: f64,
    /// Whether no usable record existed.
    pub first_run: bool,
    /// The record as stamped and persisted at start.
    pub clock: SessionClock,
}

/// Reads and writes per-world [`SessionClock`] records.
pub struct ElapsedTracker {
    store: Box<dyn RecordStore>,
    clock: Arc<dyn WallClock>,
}

impl std::fmt::Debug for ElapsedTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElapsedTracker").finish_non_exhaustive()
    }
}

impl ElapsedTracker {
    /// Create a tracker over a record store and a wall clock.
    pub fn new(store: Box<dyn RecordStore>, clock: Arc<dyn WallClock>) -> Self {
        Self { store, clock }
    }

    /// Current wall-clock time.
    pub fn now(&self) -> i64 {
        self.clock.now_epoch_ms()
    }

    /// Read the record, stamp it with the current time, and persist it
    /// before returning.
    pub fn on_world_start(&mut self, world: WorldId) -> StartReading {
        let now = self.now();
        let stored = match self.store.load(world) {
            Ok(record) => record,
            Err(e) => {
                warn!(%world, error = %e, "Failed reading session record; treating as first run");
                None
            }
        };

        let prior = stored.unwrap_or_default();
        let prior_remainder = sanitize_remainder(prior.stage_remainder);
        let first_run = !prior.has_been_seen();
        let elapsed_ms = if first_run {
            0
        } else {
            let delta = now.saturating_sub(prior.last_seen_epoch_ms).max(0);
            u64::try_from(delta).unwrap_or(0)
        };

        let clock = SessionClock {
            last_seen_epoch_ms: now,
            stage_remainder: prior_remainder,
        };
        self.persist(world, &clock);

        if first_run {
            info!(%world, "First run detected; timestamp set, no offline growth this session");
        } else {
            info!(
                %world,
                last_seen_epoch_ms = prior.last_seen_epoch_ms,
                elapsed_ms,
                prior_remainder,
                "World start"
            );
        }

        StartReading {
            elapsed_ms,
            prior_remainder,
            first_run,
            clock,
        }
    }

    /// Persist a new remainder after a conversion.
    pub fn record_remainder(&mut self, world: WorldId, clock: &mut SessionClock, remainder: f64) {
        clock.stage_remainder = sanitize_remainder(remainder);
        self.persist(world, clock);
    }

    /// Stamp the clock with the current time and persist it.
    pub fn touch(&mut self, world: WorldId, clock: &mut SessionClock) {
        clock.last_seen_epoch_ms = self.now();
        self.persist(world, clock);
    }

    /// Persist the current time as the world's last-seen time.
    pub fn on_world_stop(&mut self, world: WorldId, clock: &mut SessionClock) {
        self.touch(world, clock);
        info!(%world, last_seen_epoch_ms = clock.last_seen_epoch_ms, "World stop recorded");
    }

    fn persist(&mut self, world: WorldId, clock: &SessionClock) {
        if let Err(e) = self.store.save(world, clock) {
            warn!(%world, error = %e, "Failed writing session record");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fallow_store::{MemoryStore, StoreError};
    use serde_json::json;

    use super::*;

    const T0: i64 = 1_760_000_000_000;
    const HOUR_MS: i64 = 3_600_000;

    fn tracker(store: &MemoryStore, clock: &Arc<ManualClock>) -> ElapsedTracker {
        ElapsedTracker::new(Box::new(store.clone()), Arc::clone(clock) as Arc<dyn WallClock>)
    }

    #[test]
    fn first_run_stamps_and_reports_zero() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let world = WorldId::new();

        let reading = tracker(&store, &clock).on_world_start(world);
        assert!(reading.first_run);
        assert_eq!(reading.elapsed_ms, 0);
        assert_eq!(store.load(world).unwrap().unwrap().last_seen_epoch_ms, T0);
    }

    #[test]
    fn restart_reports_elapsed_since_last_start() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let world = WorldId::new();
        let _ = tracker(&store, &clock).on_world_start(world);

        // Crash: no stop recorded.
        clock.advance(2 * HOUR_MS);
        let reading = tracker(&store, &clock).on_world_start(world);
        assert!(!reading.first_run);
        assert_eq!(reading.elapsed_ms, 7_200_000);
    }

    #[test]
    fn stop_then_start_measures_only_downtime() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let world = WorldId::new();
        let mut t = tracker(&store, &clock);
        let mut session = t.on_world_start(world).clock;

        clock.advance(5 * HOUR_MS);
        t.on_world_stop(world, &mut session);
        clock.advance(HOUR_MS);

        assert_eq!(t.on_world_start(world).elapsed_ms, 3_600_000);
    }

    #[test]
    fn clock_skew_clamps_to_zero() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(T0));
        let world = WorldId::new();
        let _ = tracker(&store, &clock).on_world_start(world);
        clock.advance(-HOUR_MS);
        assert_eq!(tracker(&store, &clock).on_world_start(world).elapsed_ms, 0);
    }

    #[test]
    fn malformed_remainder_reads_as_zero() {
        let store = MemoryStore::new();
        let world = WorldId::new();
        store
            .insert_raw(world, json!({ "last_seen_epoch_ms": T0, "stage_remainder": 4.5 }))
            .unwrap();
        let clock = Arc::new(ManualClock::new(T0 + HOUR_MS));
        let reading = tracker(&store, &clock).on_world_start(world);
        assert!(reading.prior_remainder.abs() < f64::EPSILON);
        assert_eq!(reading.elapsed_ms, 3_600_000);
    }

    struct FailingStore;

    impl RecordStore for FailingStore {
        fn load(&self, _world: WorldId) -> Result<Option<SessionClock>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn save(&mut self, _world: WorldId, _clock: &SessionClock) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn storage_failures_degrade_to_first_run() {
        let clock: Arc<dyn WallClock> = Arc::new(ManualClock::new(T0));
        let mut t = ElapsedTracker::new(Box::new(FailingStore), clock);
        let world = WorldId::new();
        let mut reading = t.on_world_start(world);
        assert!(reading.first_run);
        assert_eq!(reading.elapsed_ms, 0);
        t.record_remainder(world, &mut reading.clock, 0.5);
        t.on_world_stop(world, &mut reading.clock);
    }
}
