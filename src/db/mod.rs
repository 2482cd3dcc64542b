pub mod models;
pub mod store;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::Result;

pub use store::ValuationStore;

/// Open (creating if missing) the SQLite database and apply migrations.
/// `":memory:"` gives a private in-process database on a single pinned connection.
pub async fn connect(db_path: &str) -> Result<SqlitePool> {
    let options =
        SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);

    let pool_options = if db_path == ":memory:" {
        // Each connection to :memory: is its own database.
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
