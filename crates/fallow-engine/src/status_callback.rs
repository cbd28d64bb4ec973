//! Tick callback that refreshes the API snapshot.

use std::sync::Arc;

use fallow_core::engine::{GrowthEngine, TickSummary};
use fallow_core::runner::TickCallback;
use fallow_observer::state::AppState;
use tracing::debug;

/// Callback that copies engine status into the API state after each tick.
pub struct StatusCallback {
    state: Arc<AppState>,
}

impl StatusCallback {
    /// Create a callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl TickCallback for StatusCallback {
    fn on_tick(&mut self, summary: &TickSummary, engine: &GrowthEngine) {
        // Skip the update if a handler holds the read lock; the next tick
        // catches up.
        if let Ok(mut snap) = self.state.snapshot.try_write() {
            snap.tick = summary.tick;
            snap.worlds = engine.status();
            snap.last_summary = Some(*summary);
        } else {
            debug!(tick = summary.tick, "Snapshot busy, skipped update");
        }
    }
}
