//! Shared type definitions for the Fallow offline growth engine.
//!
//! This crate is the single source of truth for the identifiers, grid
//! coordinates, cell contents, and session records used across the
//! workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for worlds and actors
//! - [`geometry`] -- Tile and cell coordinates
//! - [`block`] -- Cell contents and the bounded age capability
//! - [`session`] -- Persisted session clock, stage budget, and session phase

pub mod block;
pub mod geometry;
pub mod ids;
pub mod session;

// Re-export all public types at crate root for convenience.
pub use block::{AgeAttribute, BlockKind, BlockState};
pub use geometry::{CellPos, TILE_SIZE, TilePos};
pub use ids::{ActorId, WorldId};
pub use session::{ArmTrigger, SessionClock, SessionPhase, StageBudget};
