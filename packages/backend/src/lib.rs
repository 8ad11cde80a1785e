//! SQLite persistence and terminal driver for `deckcycle-engine` sessions

pub mod cli;
pub mod config;
pub mod db;
pub mod logging;
pub mod session_store;
pub mod workers;

pub use config::{Config, WriterConfig};
pub use db::{init_pool, StoreError};
pub use session_store::SessionStore;
pub use workers::{StatSender, StatWriter, StatWriterHandle};
