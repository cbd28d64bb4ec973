//! Host world contract and stage application for the Fallow offline growth
//! engine.
//!
//! The engine never owns grid storage. It sees the host through the
//! [`WorldHost`] and [`TileAccess`] traits, borrowing one resident tile at a
//! time. This crate also ships [`GridWorld`], an in-memory host used by the
//! engine binary and by tests.
//!
//! # Modules
//!
//! - [`host`] -- The [`WorldHost`] / [`TileAccess`] contract and
//!   [`HostEvent`] lifecycle notifications.
//! - [`growth`] -- [`GrowthMutator`]: advances bounded age attributes of a
//!   resident tile by a stage count, gated by a [`CropFilter`].
//! - [`tile`] -- Dense in-memory tile storage.
//! - [`grid`] -- [`GridWorld`]: multi-world host with tile residency.
//! - [`farmland`] -- Seeded demo terrain generation.
//! - [`error`] -- Error types for grid operations.

pub mod error;
pub mod farmland;
pub mod grid;
pub mod growth;
pub mod host;
pub mod tile;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use farmland::{FieldLayout, FieldSummary, plant_field};
pub use grid::GridWorld;
pub use growth::{CropFilter, DEFAULT_SCAN_DEPTH, GrowthMutator, GrowthReport};
pub use host::{HostEvent, TileAccess, WorldHost};
pub use tile::{MAX_TILE_HEIGHT, Tile};
