//! Tick loop runner with operator controls.
//!
//! [`run_simulation`] drives a [`GrowthEngine`] against a host with:
//!
//! - **Lifecycle**: every host world is started before the first tick and
//!   stopped after the last one, so the last-seen time is always recorded
//! - **Bounded runs**: stop after `max_ticks`
//! - **Pause/resume** and **variable tick speed** from the operator
//! - **Simulate requests**: queued by the operator API, executed on the
//!   tick task before the tick runs
//!
//! Each iteration applies operator requests, polls host events, runs one
//! engine tick, flushes the host's cell updates, then sleeps for the tick
//! interval.

use std::sync::Arc;

use fallow_world::WorldHost;
use tracing::{debug, info, warn};

use crate::engine::{GrowthEngine, TickSummary};
use crate::operator::{OperatorState, RunEndReason};

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The host reported no worlds to run.
    #[error("host reports no worlds")]
    NoWorlds,
}

/// Result of a run.
#[derive(Debug)]
pub struct RunResult {
    /// Why the loop ended.
    pub end_reason: RunEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called after a tick completes.
    fn on_tick(&mut self, summary: &TickSummary, engine: &GrowthEngine);
}

/// A no-op tick callback.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _engine: &GrowthEngine) {}
}

/// Run the tick loop until the tick limit or an operator stop.
///
/// # Errors
///
/// Returns [`RunnerError::NoWorlds`] if the host has no worlds to start.
pub async fn run_simulation(
    engine: &mut GrowthEngine,
    host: &mut dyn WorldHost,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
) -> Result<RunResult, RunnerError> {
    let worlds = host.world_ids();
    if worlds.is_empty() {
        return Err(RunnerError::NoWorlds);
    }

    info!(
        worlds = worlds.len(),
        max_ticks = operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Growth loop starting"
    );
    for world in worlds {
        let _ = engine.on_world_start(world);
    }

    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    let end_reason = loop {
        // --- Check pause ---
        if operator.is_paused() {
            info!("Loop paused, waiting for resume...");
            operator.wait_if_paused().await;
            info!("Loop resumed");
        }

        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            break RunEndReason::OperatorStop;
        }

        // --- Operator simulate requests ---
        for request in operator.drain_simulate_requests().await {
            if request
                .reply
                .as_ref()
                .is_some_and(tokio::sync::oneshot::Sender::is_closed)
            {
                info!(minutes = request.minutes, "Simulate request abandoned by its caller, skipped");
                continue;
            }
            let outcome =
                engine.simulate_offline(host, request.world, request.minutes, request.center);
            if let Err(ref e) = outcome {
                warn!(error = %e, minutes = request.minutes, "Simulate request rejected");
            }
            if let Some(reply) = request.reply {
                // The requester may have gone away; the outcome is logged
                // either way.
                let _ = reply.send(outcome);
            }
        }

        // --- Host events ---
        for event in host.poll_events() {
            engine.handle_event(event);
        }

        // --- Execute tick ---
        let summary = engine.run_tick(host);
        let flushed = host.flush_updates();
        if flushed > 0 {
            debug!(tick = summary.tick, flushed, "Cell updates flushed");
        }
        total_ticks = total_ticks.saturating_add(1);
        operator.record_tick(summary.tick);

        // --- Notify callback ---
        callback.on_tick(&summary, engine);

        // --- Check tick limit (after tick) ---
        if operator.tick_limit_reached(summary.tick) {
            info!(
                tick = summary.tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            last_summary = Some(summary);
            break RunEndReason::MaxTicksReached;
        }

        last_summary = Some(summary);

        // --- Sleep for tick interval ---
        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    };

    engine.stop_all();
    operator.set_end_reason(end_reason).await;

    Ok(RunResult {
        end_reason,
        final_summary: last_summary,
        total_ticks,
    })
}

/// Log the end of a run.
pub fn log_run_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Growth loop ended"
    );
    if result.final_summary.is_none() {
        warn!("Growth loop ended with no ticks executed");
    }
}
