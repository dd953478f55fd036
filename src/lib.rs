//! A Redis-to-Redis data migration tool.
//!
//! This crate copies all keys from a source Redis instance to a
//! destination instance, database by database, preserving each key's
//! type-specific semantics:
//!
//! - Strings, hashes, lists, sets, and sorted sets are rebuilt with
//!   the appropriate reconstruction commands
//! - Keys migrate concurrently under a configurable worker ceiling
//! - Key-level failures are isolated and aggregated per database
//! - Databases migrate in order and the run fails fast on the first
//!   database-level error
//!
//! The client speaks the Redis Serialization Protocol (RESP) directly
//! over TCP using async/await with Tokio.

pub mod config;
pub mod connection;
pub mod migrator;
pub mod pool;
pub mod resp;
pub mod runner;
