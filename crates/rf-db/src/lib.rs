//! rf-db: persistence of generated-video records.
//!
//! SQLite storage with r2d2 connection pooling, embedded migrations, typed
//! models and query functions that take a plain `&Connection`.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use models::{NewVideo, Video};
pub use pool::{get_conn, init_memory_pool, init_pool, DbPool, PooledConnection};
