//! Database layer for the Orb node.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization
//! and embedded SQL migrations for every table the node owns: pending
//! (unpublished) operations, credential status events, the DID-to-anchor
//! index and the anchored-transaction log.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
