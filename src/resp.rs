//! RESP (Redis Serialization Protocol) encoding and decoding.
//!
//! The migration client talks plain RESP2 to both endpoints. Replies
//! arrive over TCP in arbitrary chunks, so parsing works on a
//! `BytesMut` cursor and only consumes input once a complete value is
//! available; partial values stay in the buffer for the next read.

use bytes::BytesMut;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("unknown RESP type")]
    UnknownRespType,
    #[error("failed to parse integer")]
    FailedToParseInteger,
    #[error("invalid bulk string")]
    InvalidBulkString,
    #[error("invalid array")]
    InvalidArray,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    Null,
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Encodes this value into its RESP wire representation.
    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{}\r\n", s),
            RespValue::Error(s) => format!("-{}\r\n", s),
            RespValue::Integer(i) => format!(":{}\r\n", i),
            RespValue::BulkString(s) => format!("${}\r\n{}\r\n", s.len(), s),
            RespValue::Null => "$-1\r\n".to_string(),
            RespValue::Array(elements) => {
                let mut encoded = format!("*{}\r\n", elements.len());
                for element in elements {
                    encoded.push_str(&element.encode());
                }
                encoded
            }
        }
    }

    /// Builds the RESP array of bulk strings that encodes a command.
    pub fn command(args: &[&str]) -> RespValue {
        RespValue::Array(
            args.iter()
                .map(|arg| RespValue::BulkString(arg.to_string()))
                .collect(),
        )
    }

    /// Parses every complete value currently in the buffer.
    ///
    /// Consumed bytes are removed from the buffer; an incomplete
    /// trailing value is left untouched.
    pub fn parse(bytes: &mut BytesMut) -> Result<Vec<RespValue>, RespError> {
        let mut values = Vec::new();

        while let Some(value) = Self::parse_one(bytes)? {
            values.push(value);
        }

        Ok(values)
    }

    /// Parses a single value, or returns `None` if the buffer does not
    /// yet hold a complete one.
    pub fn parse_one(bytes: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        let mut pos = 0;

        match Self::decode_at(bytes, &mut pos)? {
            Some(value) => {
                let _ = bytes.split_to(pos);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn decode_at(bytes: &[u8], pos: &mut usize) -> Result<Option<RespValue>, RespError> {
        let Some(line) = Self::next_line(bytes, pos) else {
            return Ok(None);
        };
        let data = str::from_utf8(line).map_err(|_| RespError::InvalidUtf8)?;

        if let Some(content) = data.strip_prefix('+') {
            Ok(Some(RespValue::SimpleString(content.to_string())))
        } else if let Some(content) = data.strip_prefix('-') {
            Ok(Some(RespValue::Error(content.to_string())))
        } else if let Some(content) = data.strip_prefix(':') {
            let value = content
                .parse::<i64>()
                .map_err(|_| RespError::FailedToParseInteger)?;
            Ok(Some(RespValue::Integer(value)))
        } else if let Some(bulk_string_info) = data.strip_prefix('$') {
            let bulk_string_length = bulk_string_info
                .parse::<i64>()
                .map_err(|_| RespError::InvalidBulkString)?;

            if bulk_string_length == -1 {
                return Ok(Some(RespValue::Null));
            }

            let bulk_string_length =
                usize::try_from(bulk_string_length).map_err(|_| RespError::InvalidBulkString)?;

            // Content plus its trailing CRLF must be fully buffered.
            if bytes.len() < *pos + bulk_string_length + 2 {
                return Ok(None);
            }

            let content = &bytes[*pos..*pos + bulk_string_length];
            if &bytes[*pos + bulk_string_length..*pos + bulk_string_length + 2] != b"\r\n" {
                return Err(RespError::InvalidBulkString);
            }
            *pos += bulk_string_length + 2;

            let bulk_string = str::from_utf8(content).map_err(|_| RespError::InvalidUtf8)?;
            Ok(Some(RespValue::BulkString(bulk_string.to_string())))
        } else if let Some(array_info) = data.strip_prefix('*') {
            let array_length = array_info
                .parse::<i64>()
                .map_err(|_| RespError::FailedToParseInteger)?;

            if array_length == -1 {
                return Ok(Some(RespValue::Null));
            }

            let array_length =
                usize::try_from(array_length).map_err(|_| RespError::InvalidArray)?;
            let mut array_elements: Vec<RespValue> = Vec::with_capacity(array_length);

            while array_elements.len() < array_length {
                match Self::decode_at(bytes, pos)? {
                    Some(element) => array_elements.push(element),
                    None => return Ok(None),
                }
            }

            Ok(Some(RespValue::Array(array_elements)))
        } else {
            Err(RespError::UnknownRespType)
        }
    }

    fn next_line<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
        let remaining = &bytes[*pos..];
        let end = remaining.windows(2).position(|window| window == b"\r\n")?;
        *pos += end + 2;

        Some(&remaining[..end])
    }
}
