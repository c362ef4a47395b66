//! Error catalog
//!
//! Fixed messages keyed by a small integer code.

use thiserror::Error;

/// Errors reported to the caller as a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Invalid Input")]
    InvalidInput,

    #[error("Invalid parameters - SET key value [expiration EX seconds|PX milliseconds]")]
    InvalidSet,

    #[error("Invalid parameters - GET key")]
    InvalidGet,

    #[error("Invalid parameters - DEL key [key ...]")]
    InvalidDel,

    #[error("Invalid parameters - TTL key")]
    InvalidTtl,

    #[error("Invalid parameters - EXPIRE key seconds")]
    InvalidExpire,

    #[error("Invalid parameters - ZADD key score member [score member ...]")]
    InvalidZAdd,

    #[error("Invalid parameters - ZRANGE key start stop [WITHSCORES]")]
    InvalidZRange,

    #[error("Invalid parameters - ZRANK key member")]
    InvalidZRank,

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
}

impl CommandError {
    /// Catalog code of this error
    pub fn code(self) -> u8 {
        match self {
            CommandError::InvalidInput => 0,
            CommandError::InvalidSet => 1,
            CommandError::InvalidGet => 2,
            CommandError::InvalidDel => 3,
            CommandError::InvalidTtl => 4,
            CommandError::InvalidExpire => 5,
            CommandError::InvalidZAdd => 6,
            CommandError::InvalidZRange => 7,
            CommandError::InvalidZRank => 8,
            CommandError::WrongType => 9,
        }
    }

    /// Look up an error by catalog code
    pub fn from_code(code: u8) -> Option<Self> {
        let error = match code {
            0 => CommandError::InvalidInput,
            1 => CommandError::InvalidSet,
            2 => CommandError::InvalidGet,
            3 => CommandError::InvalidDel,
            4 => CommandError::InvalidTtl,
            5 => CommandError::InvalidExpire,
            6 => CommandError::InvalidZAdd,
            7 => CommandError::InvalidZRange,
            8 => CommandError::InvalidZRank,
            9 => CommandError::WrongType,
            _ => return None,
        };
        Some(error)
    }
}
