//! Database module
//!
//! This module provides all persistence functionality including:
//! - Schema and migrations
//! - Model definitions
//! - The store traits the reminder engine consumes
//! - SQLite and in-memory implementations of those traits

pub mod memory;
pub mod models;
pub mod repository;
pub mod schema;
pub mod store;

pub use memory::InMemoryStore;
pub use models::*;
pub use repository::Repository;
pub use schema::initialize_database;
pub use store::{NoteStore, ReminderStore};

use crate::config::DATABASE_MAX_CONNECTIONS;
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Options for every connection to the reminder database: WAL journal,
/// enforced foreign keys so deleting a note drops its reminders.
fn connect_options(db_path: &Path) -> std::result::Result<SqliteConnectOptions, sqlx::Error> {
    SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display())).map(
        |opts| {
            opts.create_if_missing(true)
                .busy_timeout(Duration::from_secs(5))
                .journal_mode(SqliteJournalMode::Wal)
                .foreign_keys(true)
        },
    )
}

/// Create and initialize a database connection pool.
///
/// Migrations run on a dedicated single-connection pool that is closed
/// before the application pool is created, so every pooled connection
/// sees the migrated schema.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Creating database connection pool at: {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let migration_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(db_path)?)
        .await?;

    initialize_database(&migration_pool).await?;
    migration_pool.close().await;

    let pool = SqlitePoolOptions::new()
        .max_connections(DATABASE_MAX_CONNECTIONS)
        .connect_with(connect_options(db_path)?)
        .await?;

    tracing::info!("Reminder database ready at {:?}", db_path);

    Ok(pool)
}
