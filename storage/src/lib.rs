//! Store backends for the study-abroad portal.
//!
//! Two interchangeable implementations of the `portal_core` store traits:
//! - [`memory::MemoryBackend`] for tests and embedded use
//! - [`postgres::PostgresBackend`] for production

pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;
