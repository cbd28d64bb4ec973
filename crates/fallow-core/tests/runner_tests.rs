//! Tick loop tests: bounded runs, operator controls, and simulate requests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]

use std::sync::Arc;

use fallow_core::clock::{ManualClock, WallClock};
use fallow_core::config::FallowConfig;
use fallow_core::engine::{GrowthEngine, TickSummary};
use fallow_core::operator::{OperatorState, RunEndReason, SimulateRequest};
use fallow_core::runner::{NoOpCallback, RunnerError, TickCallback, run_simulation};
use fallow_store::{MemoryStore, RecordStore};
use fallow_types::{BlockKind, BlockState, CellPos, TilePos, WorldId};
use fallow_world::GridWorld;
use tokio::sync::oneshot;

const T0: i64 = 1_760_000_000_000;

fn setup() -> (GrowthEngine, GridWorld, WorldId, MemoryStore, Arc<ManualClock>) {
    let mut grid = GridWorld::new();
    let world = grid.add_world("overworld", 0, 32).unwrap();
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::new(T0));
    let wall: Arc<dyn WallClock> = Arc::clone(&clock) as Arc<dyn WallClock>;
    let engine = GrowthEngine::new(&FallowConfig::default(), Box::new(store.clone()), wall);
    (engine, grid, world, store, clock)
}

/// Records every summary it sees and stops the loop after `stop_after`.
struct Recorder {
    ticks: Vec<u64>,
    operator: Arc<OperatorState>,
    stop_after: u64,
}

impl TickCallback for Recorder {
    fn on_tick(&mut self, summary: &TickSummary, _engine: &GrowthEngine) {
        self.ticks.push(summary.tick);
        if summary.tick >= self.stop_after {
            self.operator.request_stop();
        }
    }
}

#[tokio::test]
async fn run_stops_at_max_ticks() {
    let (mut engine, mut grid, world, store, _clock) = setup();
    let operator = Arc::new(OperatorState::new(0, 5));

    let result = run_simulation(&mut engine, &mut grid, &operator, &mut NoOpCallback)
        .await
        .unwrap();

    assert_eq!(result.end_reason, RunEndReason::MaxTicksReached);
    assert_eq!(result.total_ticks, 5);
    assert_eq!(result.final_summary.unwrap().tick, 5);
    assert_eq!(operator.ticks_completed(), 5);
    assert_eq!(operator.end_reason().await, Some(RunEndReason::MaxTicksReached));
    // Every world is stopped at the end of the run.
    assert!(engine.running_worlds().is_empty());
    assert!(store.load(world).unwrap().is_some());
}

#[tokio::test]
async fn operator_stop_ends_the_run() {
    let (mut engine, mut grid, _world, _store, _clock) = setup();
    let operator = Arc::new(OperatorState::new(0, 0));
    let mut recorder = Recorder {
        ticks: Vec::new(),
        operator: Arc::clone(&operator),
        stop_after: 3,
    };

    let result = run_simulation(&mut engine, &mut grid, &operator, &mut recorder)
        .await
        .unwrap();

    assert_eq!(result.end_reason, RunEndReason::OperatorStop);
    assert_eq!(result.total_ticks, 3);
    assert_eq!(recorder.ticks, vec![1, 2, 3]);
}

#[tokio::test]
async fn stop_requested_before_start_runs_no_ticks() {
    let (mut engine, mut grid, _world, _store, _clock) = setup();
    let operator = Arc::new(OperatorState::new(0, 0));
    operator.request_stop();

    let result = run_simulation(&mut engine, &mut grid, &operator, &mut NoOpCallback)
        .await
        .unwrap();

    assert_eq!(result.total_ticks, 0);
    assert!(result.final_summary.is_none());
}

#[tokio::test]
async fn host_without_worlds_is_rejected() {
    let mut grid = GridWorld::new();
    let clock: Arc<dyn WallClock> = Arc::new(ManualClock::new(T0));
    let mut engine =
        GrowthEngine::new(&FallowConfig::default(), Box::new(MemoryStore::new()), clock);
    let operator = Arc::new(OperatorState::new(0, 1));

    let result = run_simulation(&mut engine, &mut grid, &operator, &mut NoOpCallback).await;
    assert!(matches!(result, Err(RunnerError::NoWorlds)));
}

#[tokio::test]
async fn simulate_request_is_answered_and_applied() {
    let (mut engine, mut grid, world, _store, _clock) = setup();
    grid.place(world, CellPos::new(4, 10, 4), BlockState::of(BlockKind::Farmland))
        .unwrap();
    let crop = CellPos::new(4, 11, 4);
    grid.place(world, crop, BlockState::crop(BlockKind::Wheat, 0))
        .unwrap();
    grid.load_square(world, TilePos::new(0, 0), 1).unwrap();

    let operator = Arc::new(OperatorState::new(0, 10));
    let (tx, rx) = oneshot::channel();
    operator
        .request_simulate(SimulateRequest {
            world: None,
            minutes: 30,
            center: Some(TilePos::new(0, 0)),
            reply: Some(tx),
        })
        .await;

    let result = run_simulation(&mut engine, &mut grid, &operator, &mut NoOpCallback)
        .await
        .unwrap();
    assert_eq!(result.total_ticks, 10);

    let outcome = rx.await.unwrap().unwrap();
    assert_eq!(outcome.world, world);
    assert_eq!(outcome.stages, 3);
    assert_eq!(outcome.seeded, 9);
    assert_eq!(grid.cell(world, crop).age, 3);
    // The loop flushes the growth writes every tick.
    assert!(grid.take_updates(world).is_empty());
}

#[tokio::test]
async fn abandoned_simulate_request_is_not_applied() {
    let (mut engine, mut grid, world, _store, _clock) = setup();
    grid.place(world, CellPos::new(4, 10, 4), BlockState::of(BlockKind::Farmland))
        .unwrap();
    let crop = CellPos::new(4, 11, 4);
    grid.place(world, crop, BlockState::crop(BlockKind::Wheat, 0))
        .unwrap();
    grid.load_square(world, TilePos::new(0, 0), 1).unwrap();

    let operator = Arc::new(OperatorState::new(0, 5));
    let (tx, rx) = oneshot::channel();
    operator
        .request_simulate(SimulateRequest {
            world: None,
            minutes: 30,
            center: Some(TilePos::new(0, 0)),
            reply: Some(tx),
        })
        .await;
    // The caller gave up waiting before the loop got to the request.
    drop(rx);

    run_simulation(&mut engine, &mut grid, &operator, &mut NoOpCallback)
        .await
        .unwrap();
    assert_eq!(grid.cell(world, crop).age, 0);
}

#[tokio::test]
async fn rejected_simulate_request_reports_the_error() {
    let (mut engine, mut grid, _world, _store, _clock) = setup();
    let operator = Arc::new(OperatorState::new(0, 1));
    let (tx, rx) = oneshot::channel();
    operator
        .request_simulate(SimulateRequest {
            world: Some(WorldId::new()),
            minutes: 30,
            center: None,
            reply: Some(tx),
        })
        .await;

    run_simulation(&mut engine, &mut grid, &operator, &mut NoOpCallback)
        .await
        .unwrap();
    assert!(rx.await.unwrap().is_err());
}
