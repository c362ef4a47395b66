//! Response definitions
//!
//! Represents replies to callers.

use std::fmt;

use super::CommandError;

/// A reply to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The write succeeded (`ok`)
    Ok,

    /// The key does not exist (`(nil)`)
    Nil,

    /// An integer result (DEL flag, TTL, rank)
    Integer(i64),

    /// A string value
    Bulk(String),

    /// A list of strings (ZRANGE)
    Array(Vec<String>),

    /// A catalog error
    Error(CommandError),
}

impl Reply {
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl From<CommandError> for Reply {
    fn from(e: CommandError) -> Self {
        Reply::Error(e)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => write!(f, "ok"),
            Reply::Nil => write!(f, "(nil)"),
            Reply::Integer(n) => write!(f, "{}", n),
            Reply::Bulk(value) => write!(f, "{}", value),
            Reply::Array(items) if items.is_empty() => write!(f, "(empty list or set)"),
            Reply::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
            Reply::Error(e) => write!(f, "{}", e),
        }
    }
}
