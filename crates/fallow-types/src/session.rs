//! Per-world session records: the persisted clock and the stage budget.

use serde::{Deserialize, Serialize};

/// Durable per-world time accounting.
///
/// Written at world start (immediately after load, so an unclean exit still
/// leaves a recent checkpoint), after each stage conversion, and at world
/// stop. A `last_seen_epoch_ms` of zero or less means "never seen".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionClock {
    /// Wall-clock time the world was last observed running, in Unix epoch
    /// milliseconds.
    #[serde(default)]
    pub last_seen_epoch_ms: i64,
    /// Fractional stage progress carried to the next conversion. Always in
    /// `[0, 1)` once written by the converter.
    #[serde(default)]
    pub stage_remainder: f64,
}

impl SessionClock {
    /// Whether the clock has ever been stamped.
    pub const fn has_been_seen(&self) -> bool {
        self.last_seen_epoch_ms > 0
    }
}

/// Stages computed for the current session, drained by the scheduler.
///
/// Armed once per legitimate trigger and consumed once; there is no way to
/// re-derive it from elapsed time mid-session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBudget {
    pending: u32,
}

impl StageBudget {
    /// An empty budget.
    pub const fn empty() -> Self {
        Self { pending: 0 }
    }

    /// Stages still waiting to be applied.
    pub const fn pending(&self) -> u32 {
        self.pending
    }

    /// Replace the pending value for a new trigger.
    pub const fn arm(&mut self, stages: u32) {
        self.pending = stages;
    }

    /// Consume the budget, returning what was pending.
    pub const fn consume(&mut self) -> u32 {
        let pending = self.pending;
        self.pending = 0;
        pending
    }
}

/// Lifecycle of a world session's catch-up work.
///
/// `Idle -> Armed` on a trigger with a non-zero budget, `Armed -> Draining`
/// once the queue has work, `Draining -> Idle` when the queue runs dry and
/// the budget is consumed. A queue that runs dry while deferred seeding is
/// still waiting goes back to `Armed` instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Nothing pending.
    #[default]
    Idle,
    /// Budget set, waiting for resident tiles to be queued.
    Armed,
    /// Queue is being drained under the per-tick budget.
    Draining,
}

/// What armed the current budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmTrigger {
    /// The world started and found a persisted clock.
    WorldStart,
    /// An operator asked to simulate an offline interval.
    SimulateCommand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_consumed_once() {
        let mut budget = StageBudget::empty();
        assert_eq!(budget.pending(), 0);
        budget.arm(4);
        assert_eq!(budget.pending(), 4);
        assert_eq!(budget.consume(), 4);
        assert_eq!(budget.pending(), 0);
        assert_eq!(budget.consume(), 0);
    }

    #[test]
    fn fresh_clock_has_not_been_seen() {
        assert!(!SessionClock::default().has_been_seen());
        let clock = SessionClock {
            last_seen_epoch_ms: 1_700_000_000_000,
            stage_remainder: 0.0,
        };
        assert!(clock.has_been_seen());
    }

    #[test]
    fn clock_fields_default_when_missing() {
        let clock: SessionClock =
            serde_json::from_str(r#"{"last_seen_epoch_ms": 42}"#).unwrap_or_default();
        assert_eq!(clock.last_seen_epoch_ms, 42);
        assert!(clock.stage_remainder.abs() < f64::EPSILON);
    }
}
