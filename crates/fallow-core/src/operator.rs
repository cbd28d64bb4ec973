//! Operator control state for runtime engine management.
//!
//! Shared between the tick loop and the operator REST API. The operator
//! can pause/resume, change tick speed, ask for an offline interval to be
//! simulated, and trigger a clean shutdown without stopping the process.
//!
//! # Architecture
//!
//! Control flags are atomics so the tick loop reads them without locks.
//! Simulate requests go through a [`tokio::sync::Mutex`]-guarded queue
//! that the tick loop drains before each tick; the engine itself is only
//! ever touched from the tick task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use fallow_types::{TilePos, WorldId};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify, oneshot};

use crate::engine::{ArmOutcome, GrowthError};

/// Shortest tick interval the operator may set, in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Reason why the tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// Channel on which the tick loop answers a simulate request.
pub type SimulateReply = oneshot::Sender<Result<ArmOutcome, GrowthError>>;

/// An operator request to treat an interval as time spent offline.
#[derive(Debug)]
pub struct SimulateRequest {
    /// Target world; the first running world when `None`.
    pub world: Option<WorldId>,
    /// Minutes to simulate (at least 1).
    pub minutes: u32,
    /// Tile to seed around; every actor's tile when `None`.
    pub center: Option<TilePos>,
    /// Where to send the outcome, if the caller waits for it.
    pub reply: Option<SimulateReply>,
}

/// Shared operator control state.
///
/// Wrapped in [`Arc`](std::sync::Arc) and shared between the tick loop
/// and the operator API handlers.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether the tick loop is paused.
    paused: AtomicBool,

    /// Notification used to wake the tick loop when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Ticks completed so far.
    ticks_completed: AtomicU64,

    /// Wall-clock time when the loop started.
    started_at: DateTime<Utc>,

    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,

    /// Simulate requests awaiting the next tick.
    simulate_requests: Mutex<Vec<SimulateRequest>>,

    /// Reason the loop ended, if it has.
    end_reason: Mutex<Option<RunEndReason>>,

    /// Wakes everything waiting for the loop to end.
    ended: Notify,
}

impl OperatorState {
    /// Create operator state with the given tick interval and tick limit.
    pub fn new(tick_interval_ms: u64, max_ticks: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            ticks_completed: AtomicU64::new(0),
            started_at: Utc::now(),
            max_ticks,
            simulate_requests: Mutex::new(Vec::new()),
            end_reason: Mutex::new(None),
            ended: Notify::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the loop is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the loop. It will sleep until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the loop and wake it.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the loop is no longer paused.
    pub async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::Acquire) {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop. Also wakes a paused loop so it can exit.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        if self.is_paused() {
            self.resume();
        }
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the loop ended and wake every
    /// [`wait_until_ended`](Self::wait_until_ended) caller.
    pub async fn set_end_reason(&self, reason: RunEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
        drop(guard);
        self.ended.notify_waiters();
    }

    /// Wait until the loop has ended and every world has been stopped.
    pub async fn wait_until_ended(&self) -> RunEndReason {
        loop {
            let mut notified = std::pin::pin!(self.ended.notified());
            notified.as_mut().enable();
            if let Some(reason) = self.end_reason().await {
                return reason;
            }
            notified.await;
        }
    }

    /// The reason the loop ended, if it has.
    pub async fn end_reason(&self) -> Option<RunEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval. Returns the previous interval, or `None` if
    /// the value is below [`MIN_TICK_INTERVAL_MS`].
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        Some(self.tick_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    /// Record that a tick completed.
    pub fn record_tick(&self, tick: u64) {
        self.ticks_completed.store(tick, Ordering::Release);
    }

    /// Ticks completed so far.
    pub fn ticks_completed(&self) -> u64 {
        self.ticks_completed.load(Ordering::Acquire)
    }

    /// Whether `max_ticks > 0` and `current_tick >= max_ticks`.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// Configured max ticks.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    // -----------------------------------------------------------------------
    // Simulate requests
    // -----------------------------------------------------------------------

    /// Queue a simulate request for the next tick.
    pub async fn request_simulate(&self, request: SimulateRequest) {
        let mut queue = self.simulate_requests.lock().await;
        queue.push(request);
    }

    /// Drain all queued simulate requests, oldest first.
    pub async fn drain_simulate_requests(&self) -> Vec<SimulateRequest> {
        let mut queue = self.simulate_requests.lock().await;
        std::mem::take(&mut *queue)
    }

    /// Build the status snapshot served by the operator API.
    pub async fn status(&self) -> RunStatus {
        RunStatus {
            tick: self.ticks_completed(),
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            tick_interval_ms: self.tick_interval_ms(),
            elapsed_seconds: self.elapsed_seconds(),
            max_ticks: self.max_ticks,
            end_reason: self.end_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// JSON-serializable loop status for the operator API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    /// Ticks completed.
    pub tick: u64,
    /// Whether the loop is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Seconds since start.
    pub elapsed_seconds: u64,
    /// Configured maximum ticks (0 = unlimited).
    pub max_ticks: u64,
    /// The reason the loop ended, if applicable.
    pub end_reason: Option<RunEndReason>,
    /// ISO 8601 timestamp of when the loop started.
    pub started_at: String,
}
