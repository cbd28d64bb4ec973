//! Durable per-world session records for the Fallow offline growth engine.
//!
//! Each world owns one [`SessionClock`] record: the last wall-clock time the
//! world was observed running and the fractional stage remainder carried
//! between conversions. Records are read at world start and rewritten
//! immediately, so an unclean exit never loses more than one session.
//!
//! # Modules
//!
//! - [`record`] -- The [`RecordStore`] trait and lenient record decoding
//! - [`file_store`] -- [`JsonFileStore`], one JSON document per world
//! - [`memory_store`] -- [`MemoryStore`], shared in-memory records
//! - [`error`] -- Shared error types
//!
//! [`SessionClock`]: fallow_types::SessionClock

pub mod error;
pub mod file_store;
pub mod memory_store;
pub mod record;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use file_store::JsonFileStore;
pub use memory_store::MemoryStore;
pub use record::{RecordStore, decode_record, encode_record};
