pub mod operations;
pub mod schema;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

pub use operations::{
    apply_stat_update, create_deck, delete_deck, find_deck, get_deck_stats, get_pairs,
    import_pairs, insert_pair, list_decks, parse_pairs, rename_deck, replace_pairs, reset_stats,
    DeckSummary,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("deck not found: {0}")]
    DeckNotFound(String),

    #[error("deck already exists: {0}")]
    DeckExists(String),

    #[error("line {line}: expected `front<TAB>back`")]
    InvalidLine { line: usize },
}

/// Opens (creating if needed) the deck database and applies the schema.
pub async fn init_pool(db_path: &Path) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    schema::run_migrations(&pool).await?;

    tracing::info!(path = %db_path.display(), "deck database ready");
    Ok(pool)
}
