//! Shared test fixtures for the portal workspace.
//!
//! Provides a single PostgreSQL testcontainer shared across all test files,
//! lazily started once per test process, plus builders for the domain
//! entities tests keep constructing (students, templates).

mod builders;
mod fixtures;

pub use builders::*;
pub use fixtures::*;
