//! Client connection to a single Redis endpoint and database.
//!
//! Each connection owns its TCP stream and buffers. Commands are
//! written either one round trip at a time (`command`) or queued and
//! flushed as a pipeline (`queue_command` + `flush_queued`) so that
//! member-wise rebuilds of large sets and sorted sets cost one socket
//! flush instead of one per member.

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::Endpoint;
use crate::resp::{RespError, RespValue};

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection closed by server")]
    ConnectionClosed,
    #[error("RESP protocol error")]
    Resp(#[from] RespError),
    #[error("server error: {0}")]
    Server(String),
    #[error("unexpected reply: {0:?}")]
    UnexpectedReply(RespValue),
}

impl ConnectionError {
    /// Whether the connection itself is unusable after this error.
    ///
    /// Server errors and unexpected replies leave the stream in a
    /// usable state; I/O and framing errors do not.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            ConnectionError::Io(_) | ConnectionError::ConnectionClosed | ConnectionError::Resp(_)
        )
    }
}

pub struct RedisConnection {
    stream: TcpStream,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    queued: usize,
}

impl RedisConnection {
    /// Connects to the endpoint, authenticates if a password is
    /// configured, and selects the given database.
    pub async fn connect(endpoint: &Endpoint, database: u32) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(endpoint.addr()).await?;

        let mut connection = Self {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::new(),
            queued: 0,
        };

        if let Some(password) = &endpoint.password {
            connection.command(&["AUTH", password]).await?;
        }
        connection
            .command(&["SELECT", &database.to_string()])
            .await?;

        Ok(connection)
    }

    /// Sends one command and reads its reply.
    ///
    /// A server `-ERR ...` reply is returned as
    /// `ConnectionError::Server`, not as a value.
    pub async fn command(&mut self, args: &[&str]) -> Result<RespValue, ConnectionError> {
        self.stream
            .write_all(RespValue::command(args).encode().as_bytes())
            .await?;
        self.stream.flush().await?;

        match self.read_reply().await? {
            RespValue::Error(message) => Err(ConnectionError::Server(message)),
            reply => Ok(reply),
        }
    }

    /// Appends one command to the write buffer without sending it.
    pub fn queue_command(&mut self, args: &[&str]) {
        self.write_buffer
            .extend_from_slice(RespValue::command(args).encode().as_bytes());
        self.queued += 1;
    }

    /// Flushes every queued command and reads all of their replies.
    ///
    /// All replies are drained off the wire even when one of them is an
    /// error, so the connection stays usable; the first server error is
    /// then reported.
    pub async fn flush_queued(&mut self) -> Result<(), ConnectionError> {
        if self.queued == 0 {
            return Ok(());
        }

        let expected = self.queued;
        self.queued = 0;

        let buffered = self.write_buffer.split();
        self.stream.write_all(&buffered).await?;
        self.stream.flush().await?;

        let mut first_error: Option<String> = None;
        for _ in 0..expected {
            if let RespValue::Error(message) = self.read_reply().await? {
                first_error.get_or_insert(message);
            }
        }

        match first_error {
            Some(message) => Err(ConnectionError::Server(message)),
            None => Ok(()),
        }
    }

    async fn read_reply(&mut self) -> Result<RespValue, ConnectionError> {
        loop {
            if let Some(reply) = RespValue::parse_one(&mut self.read_buffer)? {
                return Ok(reply);
            }

            let number_of_bytes = self.stream.read_buf(&mut self.read_buffer).await?;
            if number_of_bytes == 0 {
                return Err(ConnectionError::ConnectionClosed);
            }
        }
    }

    /// Returns the type name the server reports for a key
    /// (`string`, `hash`, `list`, `set`, `zset`, or `none`).
    pub async fn key_type(&mut self, key: &str) -> Result<String, ConnectionError> {
        let reply = self.command(&["TYPE", key]).await?;
        string_reply(reply)
    }

    /// Enumerates all keys matching the pattern.
    pub async fn keys(&mut self, pattern: &str) -> Result<Vec<String>, ConnectionError> {
        let reply = self.command(&["KEYS", pattern]).await?;
        string_array_reply(reply)
    }

    /// Reads a string key; `None` if the key no longer exists.
    pub async fn get(&mut self, key: &str) -> Result<Option<String>, ConnectionError> {
        match self.command(&["GET", key]).await? {
            RespValue::Null => Ok(None),
            reply => string_reply(reply).map(Some),
        }
    }

    /// Reads the full field-to-value mapping of a hash key.
    pub async fn hash_get_all(
        &mut self,
        key: &str,
    ) -> Result<Vec<(String, String)>, ConnectionError> {
        let reply = self.command(&["HGETALL", key]).await?;
        pair_array_reply(reply)
    }

    /// Reads a list slice in head-to-tail order.
    pub async fn list_range(
        &mut self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>, ConnectionError> {
        let reply = self
            .command(&["LRANGE", key, &start.to_string(), &stop.to_string()])
            .await?;
        string_array_reply(reply)
    }

    /// Reads all members of a set key.
    pub async fn set_members(&mut self, key: &str) -> Result<Vec<String>, ConnectionError> {
        let reply = self.command(&["SMEMBERS", key]).await?;
        string_array_reply(reply)
    }

    /// Reads all (member, score) pairs of a sorted set, ascending by
    /// score. Scores stay in their wire representation.
    pub async fn sorted_set_range_with_scores(
        &mut self,
        key: &str,
    ) -> Result<Vec<(String, String)>, ConnectionError> {
        let reply = self
            .command(&["ZRANGE", key, "0", "-1", "WITHSCORES"])
            .await?;
        pair_array_reply(reply)
    }

    /// Unconditionally sets a string key.
    pub async fn set(&mut self, key: &str, value: &str) -> Result<(), ConnectionError> {
        self.command(&["SET", key, value]).await?;
        Ok(())
    }

    /// Writes a full hash in one bulk field-set command.
    pub async fn hash_set_many(
        &mut self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), ConnectionError> {
        let mut args = vec!["HSET", key];
        for (field, value) in fields {
            args.push(field);
            args.push(value);
        }

        self.command(&args).await?;
        Ok(())
    }

    /// Prepends all values to a list in one command.
    ///
    /// The prepend reverses insertion order by construction; callers
    /// that need to preserve an existing order must pass the values
    /// already reversed.
    pub async fn list_prepend_many(
        &mut self,
        key: &str,
        values: &[String],
    ) -> Result<(), ConnectionError> {
        let mut args = vec!["LPUSH", key];
        for value in values {
            args.push(value);
        }

        self.command(&args).await?;
        Ok(())
    }

    /// Queues the insertion of one set member.
    pub fn queue_set_add(&mut self, key: &str, member: &str) {
        self.queue_command(&["SADD", key, member]);
    }

    /// Queues the insertion of one sorted-set member with its score.
    pub fn queue_sorted_set_add(&mut self, key: &str, score: &str, member: &str) {
        self.queue_command(&["ZADD", key, score, member]);
    }

    /// Wipes every key in the currently selected database.
    pub async fn flush_database(&mut self) -> Result<(), ConnectionError> {
        self.command(&["FLUSHDB"]).await?;
        Ok(())
    }
}

fn string_reply(reply: RespValue) -> Result<String, ConnectionError> {
    match reply {
        RespValue::SimpleString(s) | RespValue::BulkString(s) => Ok(s),
        other => Err(ConnectionError::UnexpectedReply(other)),
    }
}

fn string_array_reply(reply: RespValue) -> Result<Vec<String>, ConnectionError> {
    let RespValue::Array(elements) = reply else {
        return Err(ConnectionError::UnexpectedReply(reply));
    };

    elements.into_iter().map(string_reply).collect()
}

fn pair_array_reply(reply: RespValue) -> Result<Vec<(String, String)>, ConnectionError> {
    let flat = string_array_reply(reply)?;

    if flat.len() % 2 != 0 {
        return Err(ConnectionError::UnexpectedReply(RespValue::Integer(
            flat.len() as i64,
        )));
    }

    let mut pairs = Vec::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(first), Some(second)) = (iter.next(), iter.next()) {
        pairs.push((first, second));
    }

    Ok(pairs)
}
