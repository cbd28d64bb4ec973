//! Offline stage conversion, budgeted tick scheduling, and orchestration
//! for the Fallow offline growth engine.
//!
//! When a world has been offline, this crate works out how many growth
//! stages should have happened and applies them once the world is running
//! again, a few tiles per tick, so the host's tick loop never stalls.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `fallow-config.yaml` into
//!   strongly-typed structs.
//! - [`clock`] -- Wall clocks and the [`ElapsedTracker`] that reads and
//!   stamps per-world session records.
//! - [`convert`] -- The pure interval-to-stage [`convert`](convert::convert)
//!   function.
//! - [`queue`] -- Per-world FIFO of pending tiles and square seeding.
//! - [`deferred`] -- Tick-counted deferred actions.
//! - [`session`] -- [`WorldSession`]: budget, queue, and state machine of
//!   one running world.
//! - [`engine`] -- [`GrowthEngine`]: lifecycle, host events, simulate
//!   command, and the per-tick drain.
//! - [`operator`] -- Shared operator control state.
//! - [`runner`] -- The async tick loop.
//!
//! [`ElapsedTracker`]: clock::ElapsedTracker
//! [`WorldSession`]: session::WorldSession
//! [`GrowthEngine`]: engine::GrowthEngine

pub mod clock;
pub mod config;
pub mod convert;
pub mod deferred;
pub mod engine;
pub mod operator;
pub mod queue;
pub mod runner;
pub mod session;
