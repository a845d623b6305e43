//! Command definitions
//!
//! A command is one store operation expressed as a value, so front ends
//! (the CLI) can build it from user input and hand it to
//! [`Store::execute`](crate::Store::execute).

use crate::store::Record;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    CreateBucket,
    DeleteBucket,
    Buckets,
    Set,
    Get,
    Delete,
    Seek,
}

impl CommandType {
    /// Whether the command needs the write lock
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            CommandType::CreateBucket
                | CommandType::DeleteBucket
                | CommandType::Set
                | CommandType::Delete
        )
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a bucket
    CreateBucket { bucket: String },

    /// Drop a bucket with all its records
    DeleteBucket { bucket: String },

    /// List bucket names
    Buckets,

    /// Write already-encoded bytes under a key
    Set {
        bucket: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Read the raw bytes under a key
    Get { bucket: String, key: Vec<u8> },

    /// Remove a key
    Delete { bucket: String, key: Vec<u8> },

    /// Collect every record whose key starts with a prefix
    Seek { bucket: String, prefix: Vec<u8> },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::CreateBucket { .. } => CommandType::CreateBucket,
            Command::DeleteBucket { .. } => CommandType::DeleteBucket,
            Command::Buckets => CommandType::Buckets,
            Command::Set { .. } => CommandType::Set,
            Command::Get { .. } => CommandType::Get,
            Command::Delete { .. } => CommandType::Delete,
            Command::Seek { .. } => CommandType::Seek,
        }
    }
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Write commands produce nothing
    Done,

    /// Raw value bytes
    Value(Vec<u8>),

    /// Seek results, in ascending key order
    Records(Vec<Record>),

    /// Bucket names, in ascending order
    Buckets(Vec<String>),
}
