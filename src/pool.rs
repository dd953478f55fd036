//! Connection pooling for one endpoint and database.
//!
//! Every migration job checks out its own source and destination
//! connection, so the pools only need a simple idle list: `acquire`
//! reuses an idle connection or dials a new one, `release` keeps
//! healthy connections around up to capacity. Connections that hit an
//! I/O or framing error are dropped instead of being returned.

use tokio::sync::Mutex;

use crate::config::Endpoint;
use crate::connection::{ConnectionError, RedisConnection};

pub struct ConnectionPool {
    endpoint: Endpoint,
    database: u32,
    capacity: usize,
    idle: Mutex<Vec<RedisConnection>>,
}

impl ConnectionPool {
    /// Creates a pool for one (endpoint, database) pair.
    ///
    /// Capacity should be at least the worker ceiling of the database
    /// migration using the pool, otherwise released connections get
    /// dropped and re-dialed for no reason.
    pub fn new(endpoint: Endpoint, database: u32, capacity: usize) -> Self {
        Self {
            endpoint,
            database,
            capacity: capacity.max(1),
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Checks out a connection, dialing a new one if no idle
    /// connection is available.
    pub async fn acquire(&self) -> Result<RedisConnection, ConnectionError> {
        if let Some(connection) = self.idle.lock().await.pop() {
            return Ok(connection);
        }

        RedisConnection::connect(&self.endpoint, self.database).await
    }

    /// Returns a connection to the idle list.
    ///
    /// Connections beyond capacity are closed by dropping them.
    pub async fn release(&self, connection: RedisConnection) {
        let mut idle = self.idle.lock().await;
        if idle.len() < self.capacity {
            idle.push(connection);
        }
    }
}
