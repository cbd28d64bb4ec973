//! Status and operator API server for the Fallow growth engine.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Status endpoints** for the latest tick and every running world's
//!   session (phase, pending stages, queue length, persisted clock)
//! - **Operator endpoints** for runtime control (pause, resume, speed,
//!   stop) and the simulate command, which treats a number of minutes as
//!   time spent offline
//! - **Minimal HTML page** (`GET /`) with the current tick and links
//!
//! # Architecture
//!
//! Reads are served from an in-memory [`EngineSnapshot`] that the engine
//! binary refreshes after each tick, so the API never touches the engine
//! itself. The simulate command is queued on the shared
//! [`OperatorState`](fallow_core::operator::OperatorState) and answered by
//! the tick loop over a oneshot channel.
//!
//! [`EngineSnapshot`]: state::EngineSnapshot

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod state;

pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve, start_server};
pub use state::{AppState, EngineSnapshot};
