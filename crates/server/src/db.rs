use std::time::Duration;

use anyhow::Context;
use probmark_migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

pub async fn connect_and_migrate(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    // Each connection to an in-memory SQLite database is a separate database.
    if database_url.contains(":memory:") {
        options.max_connections(1);
    }

    let db = Database::connect(options)
        .await
        .with_context(|| format!("failed to connect to database: {database_url}"))?;

    Migrator::up(&db, None)
        .await
        .context("failed to run database migrations")?;
    info!("database migrations applied");

    Ok(db)
}
