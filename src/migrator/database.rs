//! Per-database orchestration: optional destination wipe, key
//! enumeration, one runner job per key, error aggregation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::migrator::{migrate_key, MigrationError};
use crate::pool::ConnectionPool;
use crate::runner::WorkerPool;

/// Migrates every matching key of one source database into the
/// destination database.
///
/// Key-level failures are logged and folded into a single aggregate
/// error; they do not stop the remaining keys of the same database.
/// Failing to wipe the destination or to enumerate the source aborts
/// immediately.
pub async fn migrate_database(
    cancel: &CancellationToken,
    source_pool: &Arc<ConnectionPool>,
    destination_pool: &Arc<ConnectionPool>,
    database: u32,
    workers: usize,
    clear_destination: bool,
    key_pattern: &str,
) -> Result<(), MigrationError> {
    if clear_destination {
        clear_database(destination_pool, database).await?;
        info!(db = database, "cleared destination database");
    }

    let keys = list_keys(source_pool, database, key_pattern).await?;
    if keys.is_empty() {
        info!(db = database, "no keys to migrate");
        return Ok(());
    }
    info!(db = database, keys = keys.len(), "migrating keys");

    let mut runner = WorkerPool::new(workers);
    for key in &keys {
        let key = key.clone();
        let source_pool = Arc::clone(source_pool);
        let destination_pool = Arc::clone(destination_pool);

        runner.add_job(async move {
            migrate_one(&source_pool, &destination_pool, database, key).await
        });
    }

    let results = runner
        .run(cancel)
        .await
        .map_err(|source| MigrationError::Runner {
            db: database,
            source,
        })?;

    // results[i] belongs to keys[i]; fold the ordered sequence instead
    // of accumulating state inside the concurrent region.
    let failed = keys
        .iter()
        .zip(&results)
        .filter(|(key, result)| {
            if let Some(err) = result {
                error!(db = database, key = %key, error = %err, "failed to migrate key");
                true
            } else {
                false
            }
        })
        .count();

    if failed > 0 {
        return Err(MigrationError::Database {
            db: database,
            failed,
            total: keys.len(),
        });
    }

    Ok(())
}

/// Migrates a single key over a fresh connection pair drawn from the
/// pools. Healthy connections go back afterwards; connections that hit
/// an I/O or framing fault are dropped.
async fn migrate_one(
    source_pool: &ConnectionPool,
    destination_pool: &ConnectionPool,
    database: u32,
    key: String,
) -> Result<(), MigrationError> {
    let mut source = source_pool
        .acquire()
        .await
        .map_err(|source| MigrationError::ConnectionAcquireFailed {
            key: key.clone(),
            source,
        })?;
    let mut destination = destination_pool.acquire().await.map_err(|source| {
        MigrationError::ConnectionAcquireFailed {
            key: key.clone(),
            source,
        }
    })?;

    let result = migrate_key(&mut source, &mut destination, &key).await;

    let connection_fault = result
        .as_ref()
        .err()
        .is_some_and(MigrationError::is_connection_fault);
    if !connection_fault {
        source_pool.release(source).await;
        destination_pool.release(destination).await;
    }

    if result.is_ok() {
        debug!(db = database, key = %key, "migrated key");
    }

    result
}

async fn clear_database(
    destination_pool: &ConnectionPool,
    database: u32,
) -> Result<(), MigrationError> {
    let clear_failed = |source| MigrationError::ClearFailed {
        db: database,
        source,
    };

    let mut connection = destination_pool.acquire().await.map_err(clear_failed)?;
    connection.flush_database().await.map_err(clear_failed)?;
    destination_pool.release(connection).await;

    Ok(())
}

async fn list_keys(
    source_pool: &ConnectionPool,
    database: u32,
    key_pattern: &str,
) -> Result<Vec<String>, MigrationError> {
    let listing_failed = |source| MigrationError::KeyListingFailed {
        db: database,
        source,
    };

    let mut connection = source_pool.acquire().await.map_err(listing_failed)?;
    let keys = connection.keys(key_pattern).await.map_err(listing_failed)?;
    source_pool.release(connection).await;

    Ok(keys)
}
