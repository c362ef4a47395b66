//! Command definitions
//!
//! Represents validated commands from callers.

use crate::sortedset::Score;
use crate::ttl::Expiry;

use super::CommandError;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Set,
    Get,
    Del,
    Ttl,
    Expire,
    ZAdd,
    ZRange,
    ZRank,
}

impl CommandType {
    /// True for verbs that never mutate the store
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            CommandType::Get | CommandType::Ttl | CommandType::ZRange | CommandType::ZRank
        )
    }

    /// Upper-case verb name
    pub fn name(self) -> &'static str {
        match self {
            CommandType::Set => "SET",
            CommandType::Get => "GET",
            CommandType::Del => "DEL",
            CommandType::Ttl => "TTL",
            CommandType::Expire => "EXPIRE",
            CommandType::ZAdd => "ZADD",
            CommandType::ZRange => "ZRANGE",
            CommandType::ZRank => "ZRANK",
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a string, optionally with an expiry
    Set {
        key: String,
        value: String,
        expiry: Option<Expiry>,
    },

    /// Read a string
    Get { key: String },

    /// Delete keys of any kind
    Del { keys: Vec<String> },

    /// Remaining time to live
    Ttl { key: String },

    /// Start a countdown in seconds, or move a running one in its own unit
    Expire { key: String, seconds: i64 },

    /// Add or update sorted set members
    ZAdd {
        key: String,
        entries: Vec<(Score, String)>,
    },

    /// Members in a 1-based rank window
    ZRange {
        key: String,
        start: i64,
        stop: i64,
        with_scores: bool,
    },

    /// 1-based rank of a member
    ZRank { key: String, member: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Set { .. } => CommandType::Set,
            Command::Get { .. } => CommandType::Get,
            Command::Del { .. } => CommandType::Del,
            Command::Ttl { .. } => CommandType::Ttl,
            Command::Expire { .. } => CommandType::Expire,
            Command::ZAdd { .. } => CommandType::ZAdd,
            Command::ZRange { .. } => CommandType::ZRange,
            Command::ZRank { .. } => CommandType::ZRank,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.command_type().is_read_only()
    }

    /// Validate a tokenized command (verb first)
    pub fn parse(tokens: &[&str]) -> Result<Self, CommandError> {
        let Some(verb) = tokens.first() else {
            return Err(CommandError::InvalidInput);
        };
        let args = &tokens[1..];

        match verb.to_ascii_lowercase().as_str() {
            "set" => parse_set(args),
            "get" => match args {
                [key] => Ok(Command::Get { key: key.to_string() }),
                _ => Err(CommandError::InvalidGet),
            },
            "del" => {
                if args.is_empty() {
                    return Err(CommandError::InvalidDel);
                }
                Ok(Command::Del {
                    keys: args.iter().map(|k| k.to_string()).collect(),
                })
            }
            "ttl" => match args {
                [key] => Ok(Command::Ttl { key: key.to_string() }),
                _ => Err(CommandError::InvalidTtl),
            },
            "expire" => match args {
                [key, seconds] => {
                    let seconds = seconds.parse().map_err(|_| CommandError::InvalidExpire)?;
                    Ok(Command::Expire {
                        key: key.to_string(),
                        seconds,
                    })
                }
                _ => Err(CommandError::InvalidExpire),
            },
            "zadd" => parse_zadd(args),
            "zrange" => parse_zrange(args),
            "zrank" => match args {
                [key, member] => Ok(Command::ZRank {
                    key: key.to_string(),
                    member: member.to_string(),
                }),
                _ => Err(CommandError::InvalidZRank),
            },
            _ => Err(CommandError::InvalidInput),
        }
    }
}

/// Split a line on whitespace and parse it
pub fn parse_line(line: &str) -> Result<Command, CommandError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    Command::parse(&tokens)
}

fn parse_set(args: &[&str]) -> Result<Command, CommandError> {
    let (key, value, expiry) = match args {
        [key, value] => (key, value, None),
        [key, value, option, amount] => {
            let ticks = amount
                .parse::<u64>()
                .ok()
                .filter(|&t| t > 0)
                .ok_or(CommandError::InvalidSet)?;
            let expiry = if option.eq_ignore_ascii_case("ex") {
                Expiry::seconds(ticks)
            } else if option.eq_ignore_ascii_case("px") {
                Expiry::millis(ticks)
            } else {
                return Err(CommandError::InvalidSet);
            };
            (key, value, Some(expiry))
        }
        _ => return Err(CommandError::InvalidSet),
    };

    Ok(Command::Set {
        key: key.to_string(),
        value: value.to_string(),
        expiry,
    })
}

fn parse_zadd(args: &[&str]) -> Result<Command, CommandError> {
    let Some((key, pairs)) = args.split_first() else {
        return Err(CommandError::InvalidZAdd);
    };
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(CommandError::InvalidZAdd);
    }

    let entries = pairs
        .chunks_exact(2)
        .map(|pair| {
            let score = pair[0].parse::<Score>().map_err(|_| CommandError::InvalidZAdd)?;
            Ok((score, pair[1].to_string()))
        })
        .collect::<Result<Vec<_>, CommandError>>()?;

    Ok(Command::ZAdd {
        key: key.to_string(),
        entries,
    })
}

fn parse_zrange(args: &[&str]) -> Result<Command, CommandError> {
    let (key, start, stop, with_scores) = match args {
        [key, start, stop] => (key, start, stop, false),
        [key, start, stop, flag] if flag.eq_ignore_ascii_case("withscores") => {
            (key, start, stop, true)
        }
        _ => return Err(CommandError::InvalidZRange),
    };

    let start = start.parse().map_err(|_| CommandError::InvalidZRange)?;
    let stop = stop.parse().map_err(|_| CommandError::InvalidZRange)?;

    Ok(Command::ZRange {
        key: key.to_string(),
        start,
        stop,
        with_scores,
    })
}
