//! SQLite persistence layer for voxlead.
//!
//! Provides the connection pool (`r2d2`, WAL mode, foreign keys, busy
//! timeout) and the embedded, versioned schema migrations. Every table used by
//! the call store, the directory, leads and dataset ingestion is created here.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
