//! Top-level migration driver: one database at a time, fail-fast.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Configuration;
use crate::migrator::{migrate_database, MigrationError};
use crate::pool::ConnectionPool;

/// Migrates every configured database from the source endpoint to the
/// destination endpoint.
///
/// The first database-level error aborts the run; databases after the
/// failing one are not attempted.
pub async fn migrate(
    cancel: &CancellationToken,
    configuration: &Configuration,
) -> Result<(), MigrationError> {
    info!(
        source = %configuration.source.addr(),
        destination = %configuration.destination.addr(),
        databases = configuration.databases.len(),
        "starting migration"
    );

    // Each database migration establishes its own connection pools, so
    // the ceiling is additionally bounded by the database count.
    let workers = configuration
        .workers
        .max(1)
        .min(configuration.databases.len());
    info!(workers, "migrating with concurrent workers");

    for &database in &configuration.databases {
        let source_pool = Arc::new(ConnectionPool::new(
            configuration.source.clone(),
            database,
            workers,
        ));
        let destination_pool = Arc::new(ConnectionPool::new(
            configuration.destination.clone(),
            database,
            workers,
        ));

        migrate_database(
            cancel,
            &source_pool,
            &destination_pool,
            database,
            workers,
            configuration.clear_destination,
            &configuration.key_pattern,
        )
        .await?;

        info!(db = database, "database migrated");
    }

    Ok(())
}
