//! Per-key migration pipeline: type lookup, full read, rebuild.
//!
//! A key's value is always read in full from the source before the
//! first destination write, so per-key memory is bounded by the
//! largest value being copied.

use tracing::debug;

use crate::connection::{ConnectionError, RedisConnection};
use crate::migrator::MigrationError;

/// The value types the pipeline knows how to rebuild, resolved once
/// per key from the source's TYPE reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    String,
    Hash,
    List,
    Set,
    SortedSet,
    Unsupported(String),
}

impl From<&str> for KeyType {
    fn from(wire: &str) -> Self {
        match wire {
            "string" => KeyType::String,
            "hash" => KeyType::Hash,
            "list" => KeyType::List,
            "set" => KeyType::Set,
            "zset" => KeyType::SortedSet,
            other => KeyType::Unsupported(other.to_string()),
        }
    }
}

/// Copies one key from the source connection to the destination
/// connection.
///
/// Unsupported types are a hard per-key error, never a silent skip. A
/// key that disappears between the type lookup and the read is treated
/// as a no-op. Errors are local to the key; sibling migrations are
/// unaffected.
pub async fn migrate_key(
    source: &mut RedisConnection,
    destination: &mut RedisConnection,
    key: &str,
) -> Result<(), MigrationError> {
    let type_name = source
        .key_type(key)
        .await
        .map_err(|source| MigrationError::TypeLookupFailed {
            key: key.to_string(),
            source,
        })?;

    match KeyType::from(type_name.as_str()) {
        KeyType::String => migrate_string(source, destination, key).await,
        KeyType::Hash => migrate_hash(source, destination, key).await,
        KeyType::List => migrate_list(source, destination, key).await,
        KeyType::Set => migrate_set(source, destination, key).await,
        KeyType::SortedSet => migrate_sorted_set(source, destination, key).await,
        KeyType::Unsupported(key_type) => Err(MigrationError::UnsupportedType {
            key: key.to_string(),
            key_type,
        }),
    }
}

async fn migrate_string(
    source: &mut RedisConnection,
    destination: &mut RedisConnection,
    key: &str,
) -> Result<(), MigrationError> {
    let Some(value) = source.get(key).await.map_err(read_failed(key))? else {
        return Ok(());
    };

    destination
        .set(key, &value)
        .await
        .map_err(write_failed(key))?;

    debug!(key, "migrated string key");
    Ok(())
}

async fn migrate_hash(
    source: &mut RedisConnection,
    destination: &mut RedisConnection,
    key: &str,
) -> Result<(), MigrationError> {
    let fields = source.hash_get_all(key).await.map_err(read_failed(key))?;
    if fields.is_empty() {
        return Ok(());
    }

    destination
        .hash_set_many(key, &fields)
        .await
        .map_err(write_failed(key))?;

    debug!(key, fields = fields.len(), "migrated hash key");
    Ok(())
}

async fn migrate_list(
    source: &mut RedisConnection,
    destination: &mut RedisConnection,
    key: &str,
) -> Result<(), MigrationError> {
    let mut values = source
        .list_range(key, 0, -1)
        .await
        .map_err(read_failed(key))?;
    if values.is_empty() {
        return Ok(());
    }

    // A prepend-many insert reverses the order of its arguments, so
    // the values go out tail-first for the destination list to match
    // the source head-to-tail.
    values.reverse();
    destination
        .list_prepend_many(key, &values)
        .await
        .map_err(write_failed(key))?;

    debug!(key, values = values.len(), "migrated list key");
    Ok(())
}

async fn migrate_set(
    source: &mut RedisConnection,
    destination: &mut RedisConnection,
    key: &str,
) -> Result<(), MigrationError> {
    let members = source.set_members(key).await.map_err(read_failed(key))?;
    if members.is_empty() {
        return Ok(());
    }

    for member in &members {
        destination.queue_set_add(key, member);
    }
    destination
        .flush_queued()
        .await
        .map_err(write_failed(key))?;

    debug!(key, members = members.len(), "migrated set key");
    Ok(())
}

async fn migrate_sorted_set(
    source: &mut RedisConnection,
    destination: &mut RedisConnection,
    key: &str,
) -> Result<(), MigrationError> {
    let pairs = source
        .sorted_set_range_with_scores(key)
        .await
        .map_err(read_failed(key))?;
    if pairs.is_empty() {
        return Ok(());
    }

    // Scores are passed through in their wire representation; the
    // destination re-sorts by score on its own.
    for (member, score) in &pairs {
        destination.queue_sorted_set_add(key, score, member);
    }
    destination
        .flush_queued()
        .await
        .map_err(write_failed(key))?;

    debug!(key, members = pairs.len(), "migrated sorted set key");
    Ok(())
}

fn read_failed(key: &str) -> impl FnOnce(ConnectionError) -> MigrationError + '_ {
    move |source| MigrationError::ReadFailed {
        key: key.to_string(),
        source,
    }
}

fn write_failed(key: &str) -> impl FnOnce(ConnectionError) -> MigrationError + '_ {
    move |source| MigrationError::WriteFailed {
        key: key.to_string(),
        source,
    }
}
