//! Engine binary for the Fallow offline growth engine.
//!
//! Wires a demo host world to the growth engine, persists session records
//! on disk, serves the operator API, and runs the tick loop. Run it, stop
//! it, wait, and run it again: the field catches up on the growth it
//! missed while the process was down.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `fallow-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the demo world and plant its field
//! 4. Open the record store
//! 5. Start the operator API server
//! 6. Run the tick loop
//! 7. Wait for the API to shut down and log the result

mod error;
mod status_callback;

use std::path::Path;
use std::sync::Arc;

use fallow_core::clock::{SystemClock, WallClock};
use fallow_core::config::FallowConfig;
use fallow_core::engine::GrowthEngine;
use fallow_core::operator::OperatorState;
use fallow_core::runner;
use fallow_observer::{AppState, ServerConfig};
use fallow_store::JsonFileStore;
use fallow_types::{ActorId, CellPos, WorldId};
use fallow_world::{FieldLayout, GridWorld, plant_field};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::error::EngineError;
use crate::status_callback::StatusCallback;

/// Config file looked up in the working directory.
const CONFIG_FILE: &str = "fallow-config.yaml";

/// Id of the demo world when `engine.world_id` is not set.
const DEFAULT_WORLD_ID: Uuid = Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0001);

/// Vertical extent of the demo world.
const WORLD_MIN_Y: i32 = 0;
const WORLD_HEIGHT: u32 = 64;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the tick loop fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        from_file,
        stages_per_hour = config.growth.effective_stages_per_hour(),
        max_offline_hours = config.growth.max_offline_hours,
        max_stages_per_application = config.growth.max_stages_per_application,
        chunks_per_tick = config.scheduler.chunks_per_tick,
        tick_interval_ms = config.engine.tick_interval_ms,
        "fallow-engine starting"
    );

    // 3. Demo world.
    let (mut grid, world) = build_demo_world(&config)?;

    // 4. Record store.
    let store = JsonFileStore::open(&config.storage.data_dir)?;
    info!(data_dir = %store.dir().display(), "Record store opened");

    let clock: Arc<dyn WallClock> = Arc::new(SystemClock);
    let mut engine = GrowthEngine::new(&config, Box::new(store), clock);

    // 5. Operator API.
    let operator = Arc::new(OperatorState::new(
        config.engine.tick_interval_ms,
        config.engine.max_ticks,
    ));
    let app_state = Arc::new(AppState::with_operator(Arc::clone(&operator)));
    let server = if config.operator.api_enabled {
        let server_config = ServerConfig::from(&config.operator);
        let server_state = Arc::clone(&app_state);
        Some(tokio::spawn(async move {
            if let Err(e) = fallow_observer::start_server(&server_config, server_state).await {
                error!(error = %e, "Operator API stopped");
            }
        }))
    } else {
        info!("Operator API disabled");
        None
    };

    // 6. Tick loop.
    let mut callback = StatusCallback::new(app_state);
    info!(%world, "Entering tick loop");
    let result = runner::run_simulation(&mut engine, &mut grid, &operator, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 7. Let the API finish in-flight requests, then log results.
    if let Some(server) = server
        && let Err(e) = server.await
    {
        error!(error = %e, "Operator API task failed");
    }
    runner::log_run_end(&result);
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "fallow-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from [`CONFIG_FILE`], falling back to defaults.
///
/// Returns the configuration and whether it came from the file.
fn load_config() -> Result<(FallowConfig, bool), EngineError> {
    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        Ok((FallowConfig::from_file(path)?, true))
    } else {
        Ok((FallowConfig::parse("")?, false))
    }
}

/// Build the demo world: one overworld with a planted field, the field's
/// tiles made resident, and one actor standing in its middle.
fn build_demo_world(config: &FallowConfig) -> Result<(GridWorld, WorldId), EngineError> {
    let world_id = match &config.engine.world_id {
        Some(raw) => raw
            .parse::<Uuid>()
            .map(WorldId::from)
            .map_err(|source| EngineError::WorldId {
                value: raw.clone(),
                source,
            })?,
        None => WorldId::from(DEFAULT_WORLD_ID),
    };

    let mut grid = GridWorld::new();
    let world = grid.add_world_with_id(world_id, "overworld", WORLD_MIN_Y, WORLD_HEIGHT)?;

    let layout = FieldLayout {
        radius: config.engine.field_radius,
        ..FieldLayout::default()
    };
    let mut rng = SmallRng::seed_from_u64(config.engine.seed);
    let field = plant_field(&mut grid, world, &layout, &mut rng)?;
    let loaded = grid.load_square(world, layout.center, layout.radius)?;

    let center = CellPos::new(
        layout.center.min_cell_x(),
        layout.ground_y.saturating_add(2),
        layout.center.min_cell_z(),
    );
    grid.admit_actor(world, ActorId::new(), center)?;

    info!(
        %world,
        name = grid.world_name(world).unwrap_or_default(),
        crops = field.crops,
        water = field.water,
        tiles_resident = loaded,
        "Demo world built"
    );
    Ok((grid, world))
}
